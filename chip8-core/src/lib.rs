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

//! A faithful CHIP-8 interpreter backend.
//!
//! This crate implements only the interpreter: the fetch-decode-execute
//! loop, the 60 Hz timer domain, and the handful of documented quirks
//! where historic CHIP-8 variants disagree. It does not open a window,
//! play a tone, or read a ROM off disk - those are a host's job. See
//! [`Interpreter`] for the entry point.

mod error;
mod execute;
mod font;
mod instruction;
mod interpreter;
mod quirks;

pub use error::CoreError;
pub use interpreter::{Interpreter, StateSnapshot, StepEvent, TraceHook};
pub use quirks::Quirks;

/// Width of the framebuffer, in pixels.
pub const DISPLAY_WIDTH: usize = 64;
/// Height of the framebuffer, in pixels.
pub const DISPLAY_HEIGHT: usize = 32;
/// Total number of framebuffer cells (`DISPLAY_WIDTH * DISPLAY_HEIGHT`).
pub const DISPLAY_SIZE: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;
/// Size of addressable memory, in bytes.
pub const MEMORY_SIZE: usize = 0x1000;
/// Address at which ROM bytes are copied by the loader.
pub const PROGRAM_START: u16 = 0x200;
/// Largest ROM the program area can hold (`MEMORY_SIZE - PROGRAM_START`).
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;
/// Number of call-stack levels.
pub const STACK_SIZE: usize = 16;
/// Number of keys on the hex keypad.
pub const KEYPAD_SIZE: usize = 16;
