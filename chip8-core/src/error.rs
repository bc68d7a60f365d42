/*
Copyright 2020 Anish Jewalikar

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::error;
use std::fmt;

/// Error kinds the core can surface to a host application.
///
/// Every variant here corresponds to one of the failure modes laid
/// out for the Loader and Executor: a ROM that cannot be loaded, or a
/// program that drives the call stack past its bounds or an address
/// past addressable memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// The ROM image supplied to [`Interpreter::load`](crate::Interpreter::load)
    /// exceeded the 3584-byte program area.
    RomTooLarge { len: usize, max: usize },
    /// The host adapter could not deliver the ROM bytes it promised.
    IoFailure,
    /// `2NNN` was executed with the call stack already at its 16-entry limit.
    StackOverflow,
    /// `00EE` was executed with an empty call stack.
    StackUnderflow,
    /// A memory-indexing opcode referenced an address past 0xFFF while
    /// running in strict mode (the default wraps instead of failing).
    OutOfBoundsMemoryAccess { address: u32 },
    /// The opcode at `pc` did not match any recognized instruction,
    /// while running in strict mode (the default logs and advances
    /// instead of failing).
    UnknownOpcode(u16),
}

impl error::Error for CoreError {}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::RomTooLarge { len, max } => {
                write!(f, "ROM is {} bytes, which exceeds the {}-byte program area", len, max)
            }
            CoreError::IoFailure => write!(f, "host adapter failed to deliver ROM bytes"),
            CoreError::StackOverflow => {
                write!(f, "call stack is full (16 entries); CALL has no room to push a return address")
            }
            CoreError::StackUnderflow => {
                write!(f, "call stack is empty; RET has no return address to pop")
            }
            CoreError::OutOfBoundsMemoryAccess { address } => {
                write!(f, "address {:#06X} is outside the addressable 4 KiB", address)
            }
            CoreError::UnknownOpcode(opcode) => {
                write!(f, "opcode {:#06X} does not match any recognized instruction", opcode)
            }
        }
    }
}
