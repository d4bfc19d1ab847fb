//! Cycle-cost accounting, including the conditional remark rules

use r65816::cpu::Status;
use r65816::device::{Addr24, Device};
use r65816::instr::Step;

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

/// Switch a freshly reset device to native mode with 16-bit registers
fn to_native16(dev: &mut Device) {
    dev.cpu.regs.is_emulation = false;
    dev.cpu.regs.status &= !(Status::ACCUMULATION | Status::INDEX_REGISTER_SIZE);
    dev.cpu.update_status();
}

#[test]
fn direct_page_penalty_follows_the_low_byte() {
    // LDA $10
    let mut dev = device_with_program(&[0xa5, 0x10]);
    for dp in 0..=255u16 {
        dev.cpu.regs.dp = dp;
        dev.cpu.regs.pc = Addr24::new(0, 0x8000);
        let expected = 3 + (dp & 0xff != 0) as u32;
        assert_eq!(dev.step(), Ok(Step::Complete(expected)), "dp={dp:#x}");
    }
    // only the low byte matters
    dev.cpu.regs.dp = 0x0100;
    dev.cpu.regs.pc = Addr24::new(0, 0x8000);
    assert_eq!(dev.step(), Ok(Step::Complete(3)));
}

#[test]
fn indexed_page_crossing_costs_one_cycle() {
    // LDA $80f0,X
    let mut dev = device_with_program(&[0xbd, 0xf0, 0x80]);
    dev.cpu.regs.x = 0x05;
    assert_eq!(dev.step(), Ok(Step::Complete(4)));
    dev.cpu.regs.pc = Addr24::new(0, 0x8000);
    dev.cpu.regs.x = 0x20;
    assert_eq!(dev.step(), Ok(Step::Complete(5)));
}

#[test]
fn indexed_store_never_pays_the_crossing_penalty() {
    // STA $00f0,X with a crossing index
    let mut dev = device_with_program(&[0x9d, 0xf0, 0x00]);
    dev.cpu.regs.x = 0x20;
    assert_eq!(dev.step(), Ok(Step::Complete(5)));
}

#[test]
fn branch_cycles_depend_on_outcome_and_page() {
    // BNE +2 with the zero flag set: not taken
    let mut dev = device_with_program(&[0xd0, 0x02]);
    dev.cpu.regs.status |= Status::ZERO;
    assert_eq!(dev.step(), Ok(Step::Complete(2)));

    // taken within the page
    let mut dev = device_with_program(&[0xd0, 0x02]);
    dev.cpu.regs.status &= !Status::ZERO;
    assert_eq!(dev.step(), Ok(Step::Complete(3)));
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8004));

    // taken across a page in emulation mode
    let mut program = vec![0xea; 0xfd];
    program.extend_from_slice(&[0xd0, 0x10]);
    let mut dev = device_with_program(&program);
    dev.cpu.regs.status &= !Status::ZERO;
    dev.cpu.regs.pc = Addr24::new(0, 0x80fd);
    assert_eq!(dev.step(), Ok(Step::Complete(4)));
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x810f));
}

#[test]
fn branch_always_owns_no_taken_penalty() {
    // BRA +2 stays at its base cost
    let mut dev = device_with_program(&[0x80, 0x02]);
    assert_eq!(dev.step(), Ok(Step::Complete(3)));
}

#[test]
fn accumulator_mode_rebate_cancels_the_rmw_extra() {
    // INC A costs two cycles at either accumulator width
    let mut dev = device_with_program(&[0x1a]);
    assert_eq!(dev.step(), Ok(Step::Complete(2)));

    let mut dev = device_with_program(&[0x1a]);
    to_native16(&mut dev);
    assert_eq!(dev.step(), Ok(Step::Complete(2)));
    assert_eq!(dev.cpu.regs.a, 1);
}

#[test]
fn sixteen_bit_widths_add_their_cycles() {
    // LDA #$1234 ; INC $0010 ; PHA
    let mut dev = device_with_program(&[0xa9, 0x34, 0x12, 0xee, 0x10, 0x00, 0x48]);
    to_native16(&mut dev);
    assert_eq!(dev.step(), Ok(Step::Complete(3)));
    assert_eq!(dev.step(), Ok(Step::Complete(8)));
    assert_eq!(dev.step(), Ok(Step::Complete(4)));
}

#[test]
fn the_master_counter_accumulates_every_step(){
    // NOP ; NOP ; LDA #$42
    let mut dev = device_with_program(&[0xea, 0xea, 0xa9, 0x42]);
    dev.step().unwrap();
    dev.step().unwrap();
    dev.step().unwrap();
    assert_eq!(dev.master_cycles, 2 + 2 + 2);
}
