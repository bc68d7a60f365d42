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

use crate::error::CoreError;
use crate::font::{FONT_GLYPH_SIZE, FONT_SPRITES};
use crate::instruction::Instruction;
use crate::quirks::Quirks;
use crate::{DISPLAY_SIZE, KEYPAD_SIZE, MAX_ROM_SIZE, MEMORY_SIZE, PROGRAM_START, STACK_SIZE};

/// The outcome of a single [`Interpreter::step`] call.
///
/// The common case (`Continue`) carries no data; a host that only
/// cares about presenting frames can ignore the return value of
/// `step` entirely and instead poll [`Interpreter::consume_draw_flag`]
/// and [`Interpreter::beep_active`] once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// The instruction executed normally.
    Continue,
    /// The interpreter is blocked on `FX0A`; `pc` did not advance.
    AwaitingKey,
    /// The sound timer transitioned across zero as a side effect of
    /// this instruction; call [`Interpreter::beep_active`] for the new
    /// state.
    BeepChanged,
    /// The opcode at `pc` did not match any recognized instruction.
    /// Execution advances past it regardless, to avoid a live-lock.
    UnknownOpcode(u16),
    /// `CALL` overflowed the 16-level stack, or `RET` was executed
    /// with an empty stack. The interpreter halts: further calls to
    /// `step` return this same event without mutating state.
    StackFault(CoreError),
}

/// A point-in-time copy of the externally visible registers, handed
/// to a [`TraceHook`] after each instruction.
///
/// Deliberately small and `Copy` so installing a hook costs nothing
/// beyond the callback invocation itself - no snapshot of memory or
/// the framebuffer is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSnapshot {
    pub pc: u16,
    pub i: u16,
    pub sp: u8,
    pub v: [u8; 16],
    pub dt: u8,
    pub st: u8,
}

/// A callback invoked after every executed instruction with the
/// program counter and opcode that just ran, plus a snapshot of the
/// state that resulted.
///
/// Exists for golden-trace testing against reference interpreters
/// without coupling a host to the core's control flow; the core never
/// calls it for its own purposes.
pub type TraceHook = Box<dyn FnMut(u16, u16, StateSnapshot)>;

/// A CHIP-8 virtual machine: memory, registers, stack, framebuffer,
/// timers, and keypad state, plus the fetch-decode-execute step
/// function that advances them.
///
/// `Interpreter` owns no thread and performs no I/O. A host drives it
/// by calling [`step`](Self::step) at a CPU-like rate (500-1000 Hz is
/// typical) and [`tick_timers`](Self::tick_timers) at a fixed 60 Hz,
/// draining [`framebuffer`](Self::framebuffer) whenever
/// [`consume_draw_flag`](Self::consume_draw_flag) reports dirty state.
pub struct Interpreter {
    /// Working memory. 0x000-0x1FF is reserved (font at 0x000-0x04F);
    /// the program area runs from 0x200 to 0xFFF.
    memory: Box<[u8; MEMORY_SIZE]>,

    /// Call-stack return addresses. `sp` is the number of valid entries.
    stack: Box<[u16; STACK_SIZE]>,

    /// General-purpose registers V0-VF. VF doubles as the flag
    /// register written by arithmetic, shift, and draw operations.
    v: Box<[u8; 16]>,

    /// Program counter.
    pc: u16,

    /// Stack pointer; the count of valid stack entries.
    sp: u8,

    /// Index register. Only the low 12 bits are meaningful as an
    /// address, but the full 16 bits are kept so overflow in `FX1E`
    /// can be observed before masking.
    i: u16,

    /// Delay timer, decremented at 60 Hz toward zero.
    dt: u8,

    /// Sound timer, decremented at 60 Hz toward zero. A beep should
    /// sound while this is non-zero.
    st: u8,

    /// 64x32 monochrome framebuffer, row-major.
    gfx: Box<[u8; DISPLAY_SIZE]>,

    /// Current key-press state, indexed 0x0-0xF. Written by the host
    /// via [`set_key`](Self::set_key), read by `EX9E`/`EXA1`/`FX0A`.
    keypad: Box<[bool; KEYPAD_SIZE]>,

    /// Set by any operation that mutates `gfx`; cleared by the host
    /// via [`consume_draw_flag`](Self::consume_draw_flag).
    draw_flag: bool,

    /// Set while blocked on `FX0A`; holds the destination register.
    waiting_for_key: Option<usize>,

    /// Seed for the `CXNN` pseudo-random byte generator. A xorshift32
    /// generator rather than a call into `rand` on every instruction,
    /// so the seed is an inspectable, loggable, and overridable piece
    /// of interpreter state.
    rng_state: u32,

    /// Quirk configuration; see [`Quirks`] for the individual switches.
    pub quirks: Quirks,

    /// When set, [`try_step`](Self::try_step) rejects an unknown opcode
    /// or an out-of-bounds memory reference as an error instead of the
    /// default log-and-advance / wrap-and-continue policy. Does not
    /// affect [`step`](Self::step), which always runs the lenient policy.
    strict_mode: bool,

    /// Set once a `StackFault` halts the interpreter. While set,
    /// `step` keeps returning the same fault without further mutation.
    halted: Option<CoreError>,

    /// Optional per-instruction trace callback. See [`TraceHook`].
    trace_hook: Option<TraceHook>,
}

impl Interpreter {
    /// Creates an interpreter with default [`Quirks`] and no ROM loaded.
    ///
    /// The RNG is seeded from the host's entropy source (via the
    /// `rand` crate's thread-local generator), so two interpreters
    /// created back to back do not produce identical `CXNN` sequences.
    /// Use [`with_seed`](Self::with_seed) for a reproducible sequence.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Creates an interpreter with default [`Quirks`] and a caller-supplied
    /// RNG seed, for reproducible `CXNN` sequences in tests.
    pub fn with_seed(seed: u32) -> Self {
        let mut memory = Box::new([0u8; MEMORY_SIZE]);
        memory[0..FONT_SPRITES.len()].copy_from_slice(&FONT_SPRITES);

        Self {
            memory,
            stack: Box::new([0u16; STACK_SIZE]),
            v: Box::new([0u8; 16]),
            pc: PROGRAM_START,
            sp: 0,
            i: 0,
            dt: 0,
            st: 0,
            gfx: Box::new([0u8; DISPLAY_SIZE]),
            keypad: Box::new([false; KEYPAD_SIZE]),
            draw_flag: true,
            waiting_for_key: None,
            rng_state: if seed == 0 { 0xA5A5_A5A5 } else { seed },
            quirks: Quirks::default(),
            strict_mode: false,
            halted: None,
            trace_hook: None,
        }
    }

    /// Creates an interpreter with the given [`Quirks`] instead of the
    /// defaults.
    pub fn with_quirks(quirks: Quirks) -> Self {
        let mut cpu = Self::new();
        cpu.quirks = quirks;
        cpu
    }

    /// Installs (or removes, with `None`) a per-instruction trace hook.
    /// See [`TraceHook`].
    pub fn set_trace_hook(&mut self, hook: Option<TraceHook>) {
        self.trace_hook = hook;
    }

    /// Enables or disables strict mode: see [`try_step`](Self::try_step)
    /// and [`strict_mode_enabled`](Self::strict_mode_enabled).
    pub fn set_strict_mode(&mut self, strict: bool) {
        self.strict_mode = strict;
    }

    /// Whether strict mode is currently enabled.
    pub fn strict_mode_enabled(&self) -> bool {
        self.strict_mode
    }

    /// Loads a ROM image and resets all other state, including the
    /// font, stack, registers, framebuffer, timers, and keypad. The
    /// `quirks` configuration is preserved across a load.
    ///
    /// Fails with [`CoreError::RomTooLarge`] if `rom` exceeds
    /// [`MAX_ROM_SIZE`](crate::MAX_ROM_SIZE) (3584) bytes.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), CoreError> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(CoreError::RomTooLarge {
                len: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }

        self.memory.iter_mut().for_each(|b| *b = 0);
        self.memory[0..FONT_SPRITES.len()].copy_from_slice(&FONT_SPRITES);
        self.memory[PROGRAM_START as usize..PROGRAM_START as usize + rom.len()]
            .copy_from_slice(rom);

        self.stack.iter_mut().for_each(|s| *s = 0);
        self.v.iter_mut().for_each(|r| *r = 0);
        self.gfx.iter_mut().for_each(|p| *p = 0);
        self.keypad.iter_mut().for_each(|k| *k = false);

        self.pc = PROGRAM_START;
        self.sp = 0;
        self.i = 0;
        self.dt = 0;
        self.st = 0;
        self.draw_flag = true;
        self.waiting_for_key = None;
        self.halted = None;

        Ok(())
    }

    /// Executes exactly one fetch-decode-execute cycle.
    ///
    /// A host typically calls this several hundred times per simulated
    /// second; see the module documentation for the recommended frame
    /// loop. Does nothing and returns the prior fault if the
    /// interpreter has halted on a [`StepEvent::StackFault`].
    pub fn step(&mut self) -> StepEvent {
        if let Some(fault) = self.halted {
            return StepEvent::StackFault(fault);
        }

        self.run_one_instruction()
    }

    /// Executes exactly one fetch-decode-execute cycle, applying the
    /// strict-mode error policy on top of [`step`](Self::step): an
    /// unknown opcode or an out-of-bounds memory reference becomes an
    /// `Err` instead of being logged-and-advanced or wrapped, when
    /// [`strict_mode_enabled`](Self::strict_mode_enabled) is `true`.
    /// With strict mode off, this is equivalent to `Ok(self.step())`.
    pub fn try_step(&mut self) -> Result<StepEvent, CoreError> {
        let event = self.step();

        if self.strict_mode {
            if let StepEvent::UnknownOpcode(opcode) = event {
                let fault = CoreError::UnknownOpcode(opcode);
                self.halted = Some(fault);
                return Err(fault);
            }
        }

        match event {
            StepEvent::StackFault(fault) => Err(fault),
            other => Ok(other),
        }
    }

    /// Fetches, decodes, and executes the instruction at `pc`.
    fn run_one_instruction(&mut self) -> StepEvent {
        let pc_before = self.pc;
        let opcode = self.fetch_opcode();
        self.pc = self.pc.wrapping_add(2);

        let instruction = Instruction::decode(opcode);
        let st_before = self.st;

        let event = match self.execute(instruction, opcode) {
            Ok(Some(event)) => event,
            Ok(None) => StepEvent::Continue,
            Err(fault) => {
                log::warn!("chip8-core: {} at pc={:#06X}", fault, pc_before);
                self.halted = Some(fault);
                StepEvent::StackFault(fault)
            }
        };

        let event = if event == StepEvent::Continue && (st_before == 0) != (self.st == 0) {
            StepEvent::BeepChanged
        } else {
            event
        };

        if let Some(mut hook) = self.trace_hook.take() {
            hook(pc_before, opcode, self.snapshot());
            self.trace_hook = Some(hook);
        }

        event
    }

    /// If any key is currently pressed, stores its index in `Vx` and
    /// returns it; otherwise leaves state untouched and returns `None`.
    pub(crate) fn latch_key_press(&mut self, x: usize) -> Option<u8> {
        for (index, pressed) in self.keypad.iter().enumerate() {
            if *pressed {
                self.v[x] = index as u8;
                self.waiting_for_key = None;
                return Some(index as u8);
            }
        }
        None
    }

    fn fetch_opcode(&self) -> u16 {
        let pc = self.pc as usize;
        let hi = self.memory[pc % MEMORY_SIZE];
        let lo = self.memory[(pc.wrapping_add(1)) % MEMORY_SIZE];
        u16::from_be_bytes([hi, lo])
    }

    fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            pc: self.pc,
            i: self.i,
            sp: self.sp,
            v: *self.v,
            dt: self.dt,
            st: self.st,
        }
    }

    /// Decrements the delay and sound timers by one, saturating at
    /// zero. Call at a fixed 60 Hz, independent of [`step`](Self::step)'s
    /// cadence - coupling the two makes games run at the wrong speed.
    /// A no-op when both timers already read zero.
    pub fn tick_timers(&mut self) {
        self.dt = self.dt.saturating_sub(1);
        self.st = self.st.saturating_sub(1);
    }

    /// Records whether the key at `index` (0x0-0xF) is currently
    /// pressed. Indices outside the keypad are ignored, since this is
    /// the boundary where untrusted host input enters the core.
    pub fn set_key(&mut self, index: usize, pressed: bool) {
        if let Some(slot) = self.keypad.get_mut(index) {
            *slot = pressed;
        }
    }

    /// Clears every key to "not pressed".
    pub fn reset_keys(&mut self) {
        self.keypad.iter_mut().for_each(|k| *k = false);
    }

    /// The sixteen general-purpose registers V0-VF, for debug/inspection
    /// overlays (a memory/register viewer, golden-trace comparison) that
    /// want more than the framebuffer and beep flag.
    pub fn registers(&self) -> &[u8; 16] {
        &self.v
    }

    /// The current value of the delay timer.
    pub fn delay_timer(&self) -> u8 {
        self.dt
    }

    /// The current value of the sound timer. See also
    /// [`beep_active`](Self::beep_active).
    pub fn sound_timer(&self) -> u8 {
        self.st
    }

    /// The current value of the index register `I`.
    pub fn index_register(&self) -> u16 {
        self.i
    }

    /// The current program counter.
    pub fn program_counter(&self) -> u16 {
        self.pc
    }

    /// The current stack pointer (number of valid call-stack entries).
    pub fn stack_pointer(&self) -> u8 {
        self.sp
    }

    /// A read-only snapshot of the 64x32 framebuffer, row-major
    /// (`pixel(x, y)` is at `y * 64 + x`). Each cell is 0 or 1.
    pub fn framebuffer(&self) -> &[u8; DISPLAY_SIZE] {
        &self.gfx
    }

    /// Returns whether the framebuffer has changed since the last
    /// call, and clears the flag. A host should present a frame
    /// whenever this returns `true`.
    pub fn consume_draw_flag(&mut self) -> bool {
        std::mem::replace(&mut self.draw_flag, false)
    }

    /// Whether a beep should currently be audible (`sound_timer > 0`).
    pub fn beep_active(&self) -> bool {
        self.st > 0
    }

    /// The fault that halted the interpreter, if any.
    pub fn fault(&self) -> Option<CoreError> {
        self.halted
    }

    /// Whether the interpreter is blocked waiting for a key press
    /// (`FX0A`).
    pub fn is_awaiting_key(&self) -> bool {
        self.waiting_for_key.is_some()
    }

    pub(crate) fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    pub(crate) fn memory_mut(&mut self) -> &mut [u8; MEMORY_SIZE] {
        &mut self.memory
    }

    pub(crate) fn v(&self) -> &[u8; 16] {
        &self.v
    }

    pub(crate) fn v_mut(&mut self) -> &mut [u8; 16] {
        &mut self.v
    }

    pub(crate) fn pc(&self) -> u16 {
        self.pc
    }

    pub(crate) fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    pub(crate) fn skip_next(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    pub(crate) fn i_reg(&self) -> u16 {
        self.i
    }

    pub(crate) fn set_i(&mut self, value: u16) {
        self.i = value;
    }

    pub(crate) fn dt(&self) -> u8 {
        self.dt
    }

    pub(crate) fn set_dt(&mut self, value: u8) {
        self.dt = value;
    }

    pub(crate) fn set_st(&mut self, value: u8) {
        self.st = value;
    }

    pub(crate) fn sp(&self) -> u8 {
        self.sp
    }

    pub(crate) fn push_stack(&mut self, value: u16) -> Result<(), CoreError> {
        if self.sp as usize >= STACK_SIZE {
            return Err(CoreError::StackOverflow);
        }
        self.stack[self.sp as usize] = value;
        self.sp += 1;
        Ok(())
    }

    pub(crate) fn pop_stack(&mut self) -> Result<u16, CoreError> {
        if self.sp == 0 {
            return Err(CoreError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp as usize])
    }

    pub(crate) fn key_pressed(&self, index: usize) -> bool {
        self.keypad.get(index).copied().unwrap_or(false)
    }

    pub(crate) fn gfx_mut(&mut self) -> &mut [u8; DISPLAY_SIZE] {
        &mut self.gfx
    }

    pub(crate) fn mark_drawn(&mut self) {
        self.draw_flag = true;
    }

    pub(crate) fn begin_key_wait(&mut self, x: usize) {
        self.waiting_for_key = Some(x);
    }

    /// Advances the xorshift32 generator and returns the low byte,
    /// the source of `CXNN`'s "random byte".
    pub(crate) fn next_random_byte(&mut self) -> u8 {
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng_state = x;
        (x & 0xFF) as u8
    }

    pub(crate) fn font_glyph_address(digit: u8) -> u16 {
        (digit as u16 & 0xF) * FONT_GLYPH_SIZE
    }

    /// Resolves a 16-bit address for a memory-indexing opcode. In
    /// strict mode an address past `0xFFF` is rejected; otherwise it is
    /// masked to 12 bits (the default wrap policy).
    pub(crate) fn resolve_memory_address(&self, addr: u16) -> Result<usize, CoreError> {
        if addr > 0x0FFF {
            if self.strict_mode {
                return Err(CoreError::OutOfBoundsMemoryAccess { address: addr as u32 });
            }
            Ok((addr & 0x0FFF) as usize)
        } else {
            Ok(addr as usize)
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_interpreter_starts_at_program_start() {
        let cpu = Interpreter::new();
        assert_eq!(cpu.pc(), PROGRAM_START);
        assert_eq!(cpu.sp(), 0);
        assert!(cpu.framebuffer().iter().all(|&p| p == 0));
    }

    #[test]
    fn font_is_installed_at_boot() {
        let cpu = Interpreter::new();
        assert_eq!(&cpu.memory()[0..5], &FONT_SPRITES[0..5]);
    }

    #[test]
    fn rom_too_large_is_rejected() {
        let mut cpu = Interpreter::new();
        let rom = vec![0u8; MAX_ROM_SIZE + 1];
        assert_eq!(
            cpu.load(&rom),
            Err(CoreError::RomTooLarge {
                len: MAX_ROM_SIZE + 1,
                max: MAX_ROM_SIZE
            })
        );
    }

    #[test]
    fn load_resets_timers_and_sets_draw_flag() {
        let mut cpu = Interpreter::new();
        cpu.set_dt(42);
        cpu.load(&[0x00, 0xE0]).unwrap();
        assert_eq!(cpu.dt(), 0);
        assert!(cpu.consume_draw_flag());
    }

    #[test]
    fn tick_timers_saturates_at_zero() {
        let mut cpu = Interpreter::new();
        cpu.tick_timers();
        assert_eq!(cpu.dt(), 0);
    }

    #[test]
    fn set_key_ignores_out_of_range_index() {
        let mut cpu = Interpreter::new();
        cpu.set_key(100, true);
        assert!(!cpu.key_pressed(100));
    }

    #[test]
    fn same_seed_yields_same_random_sequence() {
        let mut a = Interpreter::with_seed(12345);
        let mut b = Interpreter::with_seed(12345);
        for _ in 0..8 {
            assert_eq!(a.next_random_byte(), b.next_random_byte());
        }
    }
}
