//! End-to-end scenarios exercising the public API only, covering the
//! boundary cases and worked examples for the opcode semantics.

use chip8_core::{CoreError, Interpreter, StepEvent};

#[test]
fn cls_clears_the_screen_and_sets_draw_flag() {
    let mut cpu = Interpreter::new();
    cpu.load(&[0x00, 0xE0]).unwrap();
    cpu.consume_draw_flag(); // clear the load-time draw flag first

    assert_eq!(cpu.step(), StepEvent::Continue);

    assert!(cpu.framebuffer().iter().all(|&p| p == 0));
    assert!(cpu.consume_draw_flag());
}

#[test]
fn register_immediate_and_add_without_carry() {
    // V0 = 5; V1 = 7; V0 += V1
    let mut cpu = Interpreter::new();
    cpu.load(&[0x60, 0x05, 0x61, 0x07, 0x80, 0x14]).unwrap();

    for _ in 0..3 {
        cpu.step();
    }

    assert_eq!(cpu.registers()[0], 0x0C);
    assert_eq!(cpu.registers()[1], 0x07);
    assert_eq!(cpu.registers()[0xF], 0);
    assert_eq!(cpu.program_counter(), 0x206);
    assert_eq!(cpu.fault(), None);
}

#[test]
fn draw_sets_single_pixel_from_sprite_row() {
    let mut rom = vec![
        0xA2, 0x0A, // I = 0x20A
        0x60, 0x00, // V0 = 0
        0x61, 0x00, // V1 = 0
        0xD0, 0x11, // DRW V0, V1, 1
        0x12, 0x08, // JP 0x208 (self-loop)
    ];
    rom.push(0x80); // sprite byte at 0x20A: top bit set

    let mut cpu = Interpreter::new();
    cpu.load(&rom).unwrap();

    for _ in 0..4 {
        cpu.step();
    }

    assert_eq!(cpu.framebuffer()[0], 1);
    assert_eq!(cpu.registers()[0xF], 0);
    assert!(cpu.consume_draw_flag());

    // Fifth step onward is the self-loop; pc settles on 0x208.
    cpu.step();
    assert_eq!(cpu.program_counter(), 0x208);
    cpu.step();
    assert_eq!(cpu.program_counter(), 0x208);
}

#[test]
fn call_then_return_restores_pc_and_stack_pointer() {
    // CALL 0x204; JP 0x202 (trap); RET
    let mut cpu = Interpreter::new();
    cpu.load(&[0x22, 0x04, 0x12, 0x02, 0x00, 0xEE]).unwrap();

    cpu.step(); // CALL: pc -> 0x204, sp -> 1
    assert_eq!(cpu.program_counter(), 0x204);
    assert_eq!(cpu.stack_pointer(), 1);

    cpu.step(); // RET: pc -> 0x202, sp -> 0
    assert_eq!(cpu.program_counter(), 0x202);
    assert_eq!(cpu.stack_pointer(), 0);
    assert_eq!(cpu.fault(), None);
}

#[test]
fn fx0a_blocks_until_a_key_is_pressed() {
    let mut cpu = Interpreter::new();
    cpu.load(&[0xF0, 0x0A]).unwrap();

    assert_eq!(cpu.step(), StepEvent::AwaitingKey);
    assert_eq!(cpu.step(), StepEvent::AwaitingKey);
    assert!(cpu.is_awaiting_key());

    cpu.set_key(0x7, true);
    assert_eq!(cpu.step(), StepEvent::Continue);
    assert!(!cpu.is_awaiting_key());
    assert_eq!(cpu.registers()[0], 0x7);
    assert_eq!(cpu.program_counter(), 0x202);
}

#[test]
fn sixty_timer_ticks_drain_a_sixty_tick_delay() {
    let mut cpu = Interpreter::new();
    // V0 = 60; DT = V0
    cpu.load(&[0x60, 60, 0xF0, 0x15]).unwrap();
    cpu.step();
    cpu.step();
    assert_eq!(cpu.delay_timer(), 60);

    for _ in 0..59 {
        cpu.tick_timers();
    }
    assert_eq!(cpu.delay_timer(), 1);

    cpu.tick_timers();
    assert_eq!(cpu.delay_timer(), 0);

    // A further tick on an already-zero timer is a no-op.
    cpu.tick_timers();
    assert_eq!(cpu.delay_timer(), 0);
}

#[test]
fn unknown_opcode_advances_and_is_reported() {
    let mut cpu = Interpreter::new();
    cpu.load(&[0x50, 0x01]).unwrap(); // 5XY1 is not a recognized 5-family opcode

    assert_eq!(cpu.step(), StepEvent::UnknownOpcode(0x5001));
}

#[test]
fn stack_underflow_on_bare_return_halts_the_interpreter() {
    let mut cpu = Interpreter::new();
    cpu.load(&[0x00, 0xEE]).unwrap();

    assert_eq!(
        cpu.step(),
        StepEvent::StackFault(CoreError::StackUnderflow)
    );
    // Halted: a further step reports the same fault without mutating.
    assert_eq!(
        cpu.step(),
        StepEvent::StackFault(CoreError::StackUnderflow)
    );
}

/// Builds a ROM of `depth` nested subroutines, each `CALL next; RET`
/// (4 bytes), followed by one base-case subroutine that is just `RET`
/// (2 bytes). Calling subroutine 0 therefore drives the call stack to
/// exactly `depth` before the base case's `RET` executes, then each
/// subsequent `RET` unwinds exactly one level (it lands back on the
/// calling subroutine's own `RET`, never back on another `CALL`).
fn nested_call_rom(depth: u16) -> Vec<u8> {
    let mut rom = Vec::new();
    for i in 0..depth {
        let target = 0x200 + 4 * (i + 1);
        rom.push((0x20 | (target >> 8)) as u8);
        rom.push((target & 0xFF) as u8);
        rom.push(0x00);
        rom.push(0xEE); // RET
    }
    rom.push(0x00);
    rom.push(0xEE); // base case: RET with nothing further to call
    rom
}

#[test]
fn sixteen_nested_calls_then_sixteen_returns_drains_the_stack() {
    let mut cpu = Interpreter::new();
    cpu.load(&nested_call_rom(16)).unwrap();

    // Step through all 16 nested calls; sp grows by one each time.
    for depth in 1..=16 {
        cpu.step();
        assert_eq!(cpu.stack_pointer(), depth);
    }
    assert_eq!(cpu.fault(), None);

    // Step through 16 returns, one per nested level, fully unwinding.
    for depth in (0..16).rev() {
        cpu.step();
        assert_eq!(cpu.stack_pointer(), depth);
    }

    assert_eq!(cpu.stack_pointer(), 0);
    assert_eq!(cpu.program_counter(), 0x202);
    assert_eq!(cpu.fault(), None);
}

#[test]
fn a_seventeenth_call_overflows_the_sixteen_level_stack() {
    let mut cpu = Interpreter::new();
    cpu.load(&nested_call_rom(17)).unwrap();

    for _ in 0..16 {
        cpu.step();
    }
    assert_eq!(cpu.stack_pointer(), 16);
    assert_eq!(cpu.fault(), None);

    assert_eq!(
        cpu.step(),
        StepEvent::StackFault(CoreError::StackOverflow)
    );
    assert_eq!(cpu.fault(), Some(CoreError::StackOverflow));

    // Halted: a further step reports the same fault without mutating.
    assert_eq!(
        cpu.step(),
        StepEvent::StackFault(CoreError::StackOverflow)
    );
    assert_eq!(cpu.stack_pointer(), 16);
}

#[test]
fn rom_too_large_is_rejected_without_mutating_loaded_state() {
    let mut cpu = Interpreter::new();
    let oversized = vec![0u8; 3585];

    assert_eq!(
        cpu.load(&oversized),
        Err(CoreError::RomTooLarge { len: 3585, max: 3584 })
    );
}

#[test]
fn non_strict_step_logs_and_advances_past_an_unknown_opcode() {
    let mut cpu = Interpreter::new();
    cpu.load(&[0x50, 0x01]).unwrap(); // 5XY1 is not a recognized 5-family opcode

    assert_eq!(cpu.try_step(), Ok(StepEvent::UnknownOpcode(0x5001)));
    assert_eq!(cpu.program_counter(), 0x202);
    assert_eq!(cpu.fault(), None);
}

#[test]
fn strict_mode_rejects_an_unknown_opcode_and_halts() {
    let mut cpu = Interpreter::new();
    cpu.set_strict_mode(true);
    cpu.load(&[0x50, 0x01]).unwrap();

    assert_eq!(cpu.try_step(), Err(CoreError::UnknownOpcode(0x5001)));
    assert_eq!(cpu.fault(), Some(CoreError::UnknownOpcode(0x5001)));

    // Halted: a further step reports the same fault without mutating.
    assert_eq!(cpu.try_step(), Err(CoreError::UnknownOpcode(0x5001)));
    assert_eq!(cpu.program_counter(), 0x202);
}

#[test]
fn strict_mode_rejects_an_out_of_bounds_bcd_store() {
    // I = 0xFFE; FX33 would need to write I, I+1, I+2, and I+2 = 0x1000
    // is past the addressable 4 KiB.
    let mut cpu = Interpreter::new();
    cpu.set_strict_mode(true);
    cpu.load(&[0xAF, 0xFE, 0xF0, 0x33]).unwrap();
    cpu.step(); // LD I, 0xFFE

    assert_eq!(
        cpu.try_step(),
        Err(CoreError::OutOfBoundsMemoryAccess { address: 0x1000 })
    );
}

#[test]
fn non_strict_mode_wraps_the_same_out_of_bounds_bcd_store() {
    let mut cpu = Interpreter::new();
    cpu.load(&[0xAF, 0xFE, 0xF0, 0x33]).unwrap();
    cpu.step(); // LD I, 0xFFE

    assert_eq!(cpu.step(), StepEvent::Continue);
    assert_eq!(cpu.fault(), None);
}

#[test]
fn beep_changed_fires_only_on_a_zero_crossing() {
    let mut cpu = Interpreter::new();
    // V0 = 5; ST = V0 (0 -> 5, a zero crossing)
    cpu.load(&[0x60, 0x05, 0xF0, 0x18, 0x60, 0x0A, 0xF0, 0x18]).unwrap();
    cpu.step(); // V0 = 5

    assert_eq!(cpu.try_step(), Ok(StepEvent::BeepChanged));
    assert!(cpu.beep_active());

    cpu.step(); // V0 = 10
    // ST goes from 5 to 10: already audible, still audible, no zero
    // crossing, so this must NOT report BeepChanged.
    assert_eq!(cpu.try_step(), Ok(StepEvent::Continue));
    assert!(cpu.beep_active());
}
