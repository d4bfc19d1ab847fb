//! End-to-end decode-execute scenarios against a small program image

use r65816::cpu::Status;
use r65816::device::{Addr24, Device};
use r65816::error::{ConfigError, StepError, Violation};
use r65816::instr::Step;
use r65816::timing::RunExit;

/// A device with 8KB of work RAM, the program at 00:8000 and the
/// emulation-mode reset vector pointing at it
fn device_with_program(program: &[u8]) -> Device {
    let mut dev = Device::new().unwrap();
    dev.memory_mut()
        .install_ram(Addr24::new(0, 0), 0x2000)
        .unwrap();
    let mut rom = vec![0u8; 0x8000];
    rom[..program.len()].copy_from_slice(program);
    rom[0x7ffc] = 0x00;
    rom[0x7ffd] = 0x80;
    dev.memory_mut()
        .install_rom(Addr24::new(0, 0x8000), &rom)
        .unwrap();
    dev.reset().unwrap();
    dev
}

#[test]
fn reset_reads_the_vector() {
    let dev = device_with_program(&[0xea]);
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8000));
    assert!(dev.cpu.regs.is_emulation);
}

#[test]
fn reset_without_a_vector_is_fatal() {
    let mut dev = Device::new().unwrap();
    dev.memory_mut()
        .install_ram(Addr24::new(0, 0x8000), 0x8000)
        .unwrap();
    assert_eq!(dev.reset(), Err(ConfigError::MissingResetVector));
}

#[test]
fn load_then_store_to_direct_page() {
    // LDA #$42 ; STA $10
    let mut dev = device_with_program(&[0xa9, 0x42, 0x85, 0x10]);
    assert_eq!(dev.step(), Ok(Step::Complete(2)));
    assert!(!dev.cpu.regs.status.has(Status::ZERO));
    assert!(!dev.cpu.regs.status.has(Status::NEGATIVE));
    assert_eq!(dev.step(), Ok(Step::Complete(3)));
    assert_eq!(dev.memory().peek(Addr24::new(0, 0x10)), Some(0x42));
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8004));
}

#[test]
fn compare_with_16_bit_accumulator() {
    // CLC ; XCE ; REP #$30 ; LDA #$1234 ; CMP #$1234
    let mut dev = device_with_program(&[0x18, 0xfb, 0xc2, 0x30, 0xa9, 0x34, 0x12, 0xc9, 0x34, 0x12]);
    for _ in 0..3 {
        dev.step().unwrap();
    }
    assert!(!dev.cpu.regs.is_emulation);
    assert!(!dev.cpu.is_reg8());
    assert_eq!(dev.step(), Ok(Step::Complete(3)));
    assert_eq!(dev.cpu.regs.a, 0x1234);
    assert_eq!(dev.step(), Ok(Step::Complete(3)));
    assert!(dev.cpu.regs.status.has(Status::CARRY));
    assert!(dev.cpu.regs.status.has(Status::ZERO));
    assert!(!dev.cpu.regs.status.has(Status::NEGATIVE));
}

#[test]
fn block_move_reenters_until_the_counter_runs_out() {
    // MVN $00,$00
    let mut dev = device_with_program(&[0x54, 0x00, 0x00]);
    for (i, byte) in [1u8, 2, 3].iter().enumerate() {
        dev.memory_mut().poke(Addr24::new(0, i as u16), *byte);
    }
    dev.cpu.regs.a = 2;
    dev.cpu.regs.x = 0x00;
    dev.cpu.regs.y = 0x10;
    assert_eq!(dev.step(), Ok(Step::Repeat));
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8000));
    assert_eq!(dev.step(), Ok(Step::Repeat));
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8000));
    assert_eq!(dev.step(), Ok(Step::Complete(7)));
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8003));
    for (i, byte) in [1u8, 2, 3].iter().enumerate() {
        assert_eq!(dev.memory().peek(Addr24::new(0, 0x10 + i as u16)), Some(*byte));
    }
    // source and destination moved upwards, the counter underflowed
    assert_eq!(dev.cpu.regs.x, 0x03);
    assert_eq!(dev.cpu.regs.y, 0x13);
    assert_eq!(dev.cpu.regs.a, 0xffff);
    // 7 cycles were billed for each of the three bytes
    assert_eq!(dev.master_cycles, 21);
}

#[test]
fn block_move_positive_walks_downwards() {
    // MVP $00,$00
    let mut dev = device_with_program(&[0x44, 0x00, 0x00]);
    for (i, byte) in [1u8, 2, 3].iter().enumerate() {
        dev.memory_mut().poke(Addr24::new(0, i as u16), *byte);
    }
    dev.cpu.regs.a = 2;
    dev.cpu.regs.x = 0x02;
    dev.cpu.regs.y = 0x12;
    while dev.step() == Ok(Step::Repeat) {}
    for (i, byte) in [1u8, 2, 3].iter().enumerate() {
        assert_eq!(dev.memory().peek(Addr24::new(0, 0x10 + i as u16)), Some(*byte));
    }
    assert_eq!(dev.cpu.regs.x, 0xff);
    assert_eq!(dev.cpu.regs.y, 0x0f);
}

#[test]
fn access_violation_rolls_the_program_counter_back() {
    // LDA $4242 reads an unmapped cell
    let mut dev = device_with_program(&[0xad, 0x42, 0x42]);
    let err = dev.step().unwrap_err();
    assert_eq!(
        err,
        StepError::Access(Violation::ReadInvalid(Addr24::new(0, 0x4242)))
    );
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8000));
    // the run loop converts the fault into an inspectable exit
    assert_eq!(dev.run(1000), RunExit::Fault(err));
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8000));
}

#[test]
fn write_to_program_memory_is_a_violation() {
    // STA $8000
    let mut dev = device_with_program(&[0x8d, 0x00, 0x80]);
    assert_eq!(
        dev.step(),
        Err(StepError::Access(Violation::WriteReadOnly(Addr24::new(
            0, 0x8000
        ))))
    );
}

#[test]
fn stores_through_an_alias_are_visible_everywhere() {
    // LDA #$42 ; STA $800010 ; LDA $10
    let mut dev = device_with_program(&[0xa9, 0x42, 0x8f, 0x10, 0x00, 0x80, 0xa5, 0x10]);
    dev.memory_mut()
        .map_mirror(Addr24::new(0x80, 0), Addr24::new(0, 0), 0x2000)
        .unwrap();
    dev.step().unwrap();
    dev.step().unwrap();
    dev.cpu.regs.a = 0;
    dev.step().unwrap();
    assert_eq!(dev.cpu.regs.a8(), 0x42);
}

#[test]
fn subroutine_call_and_return() {
    // JSR $8010 ... at $8010: LDA #$07 ; RTS
    let mut program = vec![0x20, 0x10, 0x80, 0xea];
    program.resize(0x10, 0xea);
    program.extend_from_slice(&[0xa9, 0x07, 0x60]);
    let mut dev = device_with_program(&program);
    assert_eq!(dev.step(), Ok(Step::Complete(6)));
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8010));
    dev.step().unwrap();
    assert_eq!(dev.step(), Ok(Step::Complete(6)));
    // RTS resumes after the call
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8003));
    assert_eq!(dev.cpu.regs.a8(), 0x07);
}

#[test]
fn run_stops_on_any_byte_of_a_breakpointed_instruction() {
    // NOP ; LDA #$42 ; NOP
    let mut dev = device_with_program(&[0xea, 0xa9, 0x42, 0xea]);
    // breakpoint on the operand byte of the LDA
    dev.add_breakpoint(Addr24::new(0, 0x8002));
    assert_eq!(dev.run(1000), RunExit::Breakpoint(Addr24::new(0, 0x8002)));
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8001));
    // a single step moves off the breakpoint, then the run continues
    dev.step().unwrap();
    assert_eq!(dev.cpu.regs.a8(), 0x42);
    assert_eq!(dev.run(1000), RunExit::BudgetExhausted);
}

#[test]
fn pending_instruction_is_exposed_for_display() {
    let dev = device_with_program(&[0xa9, 0x42, 0x85, 0x10]);
    let pending = dev.peek_instruction().unwrap();
    assert_eq!(pending.opcode, 0xa9);
    assert_eq!(pending.mnemonic, "LDA");
    assert_eq!(pending.size, 2);
    assert_eq!(
        dev.disassemble(Addr24::new(0, 0x8000)).unwrap(),
        "LDA #$42"
    );
    assert_eq!(
        dev.disassemble(Addr24::new(0, 0x8002)).unwrap(),
        "STA $10"
    );
}

#[test]
fn stack_relative_addressing_reads_past_the_stack_pointer() {
    // LDA $01,S in emulation mode
    let mut dev = device_with_program(&[0xa3, 0x01]);
    let sp = dev.cpu.regs.sp;
    dev.memory_mut()
        .poke(Addr24::new(0, sp.wrapping_add(1)), 0x99);
    assert_eq!(dev.step(), Ok(Step::Complete(4)));
    assert_eq!(dev.cpu.regs.a8(), 0x99);
}

#[test]
fn decimal_mode_addition_is_bcd_for_8_bit() {
    // SED ; CLC ; LDA #$19 ; ADC #$28
    let mut dev = device_with_program(&[0xf8, 0x18, 0xa9, 0x19, 0x69, 0x28]);
    for _ in 0..4 {
        dev.step().unwrap();
    }
    assert_eq!(dev.cpu.regs.a8(), 0x47);
    assert!(!dev.cpu.regs.status.has(Status::CARRY));
}
