//! Software and hardware interrupt entry, return, and the halt states

use r65816::cpu::{Halt, Status};
use r65816::device::{Addr24, Device};
use r65816::instr::Step;
use r65816::timing::RunExit;

/// Program at 00:8000, an interrupt handler at 00:9000, and all
/// emulation-mode vectors pointing at the handler
fn device_with_handler(program: &[u8], handler: &[u8]) -> Device {
    let mut dev = Device::new().unwrap();
    dev.memory_mut()
        .install_ram(Addr24::new(0, 0), 0x2000)
        .unwrap();
    let mut rom = vec![0u8; 0x8000];
    rom[..program.len()].copy_from_slice(program);
    rom[0x1000..0x1000 + handler.len()].copy_from_slice(handler);
    for vector in [0x7fe4, 0x7fe6, 0x7fea, 0x7fee, 0x7ff4, 0x7ff6, 0x7ffa, 0x7ffe] {
        rom[vector] = 0x00;
        rom[vector + 1] = 0x90;
    }
    rom[0x7ffc] = 0x00;
    rom[0x7ffd] = 0x80;
    dev.memory_mut()
        .install_rom(Addr24::new(0, 0x8000), &rom)
        .unwrap();
    dev.reset().unwrap();
    dev
}

#[test]
fn brk_vectors_into_the_handler_and_rti_returns() {
    // BRK (with its signature byte) ; handler is a bare RTI
    let mut dev = device_with_handler(&[0x00, 0x00, 0xa9, 0x42], &[0x40]);
    assert_eq!(dev.step(), Ok(Step::Complete(7)));
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x9000));
    assert!(dev.cpu.regs.status.has(Status::IRQ_DISABLE));
    assert!(!dev.cpu.regs.status.has(Status::DECIMAL));
    assert_eq!(dev.step(), Ok(Step::Complete(6)));
    // execution resumes past the break signature byte
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8002));
    dev.step().unwrap();
    assert_eq!(dev.cpu.regs.a8(), 0x42);
}

#[test]
fn brk_costs_one_more_cycle_in_native_mode() {
    let mut dev = device_with_handler(&[0x00, 0x00], &[0x40]);
    dev.cpu.regs.is_emulation = false;
    dev.cpu.update_status();
    assert_eq!(dev.step(), Ok(Step::Complete(8)));
    // native mode also banks the return address
    assert_eq!(dev.step(), Ok(Step::Complete(7)));
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8002));
}

#[test]
fn nmi_is_taken_between_instructions() {
    let mut dev = device_with_handler(&[0xea, 0xea], &[0x40]);
    dev.step().unwrap();
    dev.nmi().unwrap();
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x9000));
    // RTI resumes at the interrupted boundary
    dev.step().unwrap();
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8001));
}

#[test]
fn irq_respects_the_disable_flag() {
    let mut dev = device_with_handler(&[0x58, 0xea], &[0x40]);
    // interrupts are disabled after reset
    assert_eq!(dev.irq().unwrap(), None);
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x8000));
    // CLI, then the request is honored
    dev.step().unwrap();
    assert!(dev.irq().unwrap().is_some());
    assert_eq!(dev.cpu.regs.pc, Addr24::new(0, 0x9000));
}

#[test]
fn stp_halts_until_reset() {
    let mut dev = device_with_handler(&[0xdb, 0xea], &[0x40]);
    assert_eq!(dev.step(), Ok(Step::Complete(3)));
    assert_eq!(dev.cpu.halt, Halt::Stopped);
    assert_eq!(dev.step(), Ok(Step::Halted(Halt::Stopped)));
    assert_eq!(dev.run(1000), RunExit::Halted(Halt::Stopped));
    // only reset brings the processor back
    dev.reset().unwrap();
    assert_eq!(dev.cpu.halt, Halt::Running);
}

#[test]
fn wai_sleeps_until_the_next_interrupt() {
    let mut dev = device_with_handler(&[0xcb, 0xa9, 0x42], &[0x40]);
    assert_eq!(dev.step(), Ok(Step::Complete(3)));
    assert_eq!(dev.step(), Ok(Step::Halted(Halt::WaitingForInterrupt)));
    dev.nmi().unwrap();
    assert_eq!(dev.cpu.halt, Halt::Running);
    // the handler returns to the instruction after the WAI
    dev.step().unwrap();
    dev.step().unwrap();
    assert_eq!(dev.cpu.regs.a8(), 0x42);
}
