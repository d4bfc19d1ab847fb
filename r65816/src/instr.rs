//! Instruction table and decode-execute step
//!
//! The table is built once from a declarative description of all 256
//! opcodes. Opcodes whose size depends on the width flags get alternate
//! bindings selected at dispatch time. Conditional cycle rules are the
//! numbered remarks; at construction every remark of an instruction must
//! be claimed by exactly one side (addressing mode or operator).

use crate::{
    addr::{AddressMode, Operand},
    cpu::{Cpu, Halt, Index, Status},
    device::{Addr24, Device},
    error::{ConfigError, StepError},
    op::{Cond, Operator},
    timing::Cycles,
};

/// A set of numbered cycle-modifier remarks (bit n = remark n)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemarkSet(pub u32);

impl RemarkSet {
    pub const EMPTY: Self = Self(0);

    pub const fn has(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl core::ops::BitOr for RemarkSet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// The remark catalogue. Numbers follow the chip documentation.
pub mod remark {
    use super::RemarkSet;

    /// §1: +1 cycle with a 16-bit accumulator
    pub const ACC_EXTRA: RemarkSet = RemarkSet(1 << 1);
    /// §2: +1 cycle if the direct page register's low byte is non-zero
    pub const DP_NONZERO: RemarkSet = RemarkSet(1 << 2);
    /// §3: +1 cycle if the index addition crosses a 256-byte page
    pub const PAGE_CROSS: RemarkSet = RemarkSet(1 << 3);
    /// §5: +2 cycles with a 16-bit accumulator (read-modify-write)
    pub const RMW_EXTRA: RemarkSet = RemarkSet(1 << 5);
    /// §7: +1 cycle if the branch is taken
    pub const BRANCH_TAKEN: RemarkSet = RemarkSet(1 << 7);
    /// §8: +1 cycle if a taken branch crosses a page in emulation mode
    pub const BRANCH_PAGE: RemarkSet = RemarkSet(1 << 8);
    /// §9: +1 cycle in native mode
    pub const NATIVE_EXTRA: RemarkSet = RemarkSet(1 << 9);
    /// §10: +1 cycle with 16-bit index registers
    pub const IDX_EXTRA: RemarkSet = RemarkSet(1 << 10);
    /// §13: 7 cycles per byte moved
    pub const PER_BYTE_MOVED: RemarkSet = RemarkSet(1 << 13);
    /// §14: fixed cost of shutting the processor down (STP)
    pub const STOP_COST: RemarkSet = RemarkSet(1 << 14);
    /// §15: fixed cost of waiting for an interrupt (WAI)
    pub const WAIT_COST: RemarkSet = RemarkSet(1 << 15);
    /// §16: reserved opcode, byte and cycle counts subject to change
    pub const RESERVED: RemarkSet = RemarkSet(1 << 16);
    /// §17: one extra instruction byte with a 16-bit accumulator
    pub const WIDE_ACC_IMMEDIATE: RemarkSet = RemarkSet(1 << 17);
    /// §19: one extra instruction byte with 16-bit index registers
    pub const WIDE_IDX_IMMEDIATE: RemarkSet = RemarkSet(1 << 19);
    /// §20: the mode's usual conditional penalty does not apply
    pub const MODE_OVERRIDE: RemarkSet = RemarkSet(1 << 20);
    /// §21: −2 cycles for the accumulator addressing mode
    pub const ACCUMULATOR_REBATE: RemarkSet = RemarkSet(1 << 21);

    /// Remarks consumed by the table builder itself (size variants)
    pub const BUILDER: RemarkSet =
        RemarkSet(WIDE_ACC_IMMEDIATE.0 | WIDE_IDX_IMMEDIATE.0);
}

/// One immutable opcode binding
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub mode: AddressMode,
    pub op: Operator,
    /// instruction byte count, opcode included
    pub size: u8,
    /// base cycle count before remark adjustments
    pub cycles: u8,
    pub remarks: RemarkSet,
}

struct Desc {
    opcode: u8,
    mnemonic: &'static str,
    mode: AddressMode,
    op: Operator,
    cycles: u8,
    remarks: RemarkSet,
}

macro_rules! rm {
    () => { RemarkSet::EMPTY };
    ($($r:ident)|+) => { RemarkSet($(remark::$r.0)|+) };
}

macro_rules! desc {
    ($opcode:literal, $mn:literal, $mode:expr, $op:expr, $cycles:literal, $remarks:expr) => {
        Desc {
            opcode: $opcode,
            mnemonic: $mn,
            mode: $mode,
            op: $op,
            cycles: $cycles,
            remarks: $remarks,
        }
    };
}

use AddressMode as M;
use Index::{X, Y};
use Operator as O;

/// The static description the table is built from, in opcode order
#[rustfmt::skip]
static DESCRIPTION: [Desc; 256] = [
    desc!(0x00, "BRK", M::Immediate, O::Brk, 7, rm!(NATIVE_EXTRA)),
    desc!(0x01, "ORA", M::DirectPageIndexedIndirectX, O::Ora, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x02, "COP", M::Immediate, O::Cop, 7, rm!(NATIVE_EXTRA)),
    desc!(0x03, "ORA", M::StackRelative, O::Ora, 4, rm!(ACC_EXTRA)),
    desc!(0x04, "TSB", M::DirectPage, O::Tsb, 5, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0x05, "ORA", M::DirectPage, O::Ora, 3, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x06, "ASL", M::DirectPage, O::Asl, 5, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0x07, "ORA", M::DirectPageIndirectLong, O::Ora, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x08, "PHP", M::Implied, O::Php, 3, rm!()),
    desc!(0x09, "ORA", M::Immediate, O::Ora, 2, rm!(ACC_EXTRA | WIDE_ACC_IMMEDIATE)),
    desc!(0x0a, "ASL", M::Accumulator, O::Asl, 2, rm!(RMW_EXTRA | ACCUMULATOR_REBATE)),
    desc!(0x0b, "PHD", M::Implied, O::Phd, 4, rm!()),
    desc!(0x0c, "TSB", M::Absolute, O::Tsb, 6, rm!(RMW_EXTRA)),
    desc!(0x0d, "ORA", M::Absolute, O::Ora, 4, rm!(ACC_EXTRA)),
    desc!(0x0e, "ASL", M::Absolute, O::Asl, 6, rm!(RMW_EXTRA)),
    desc!(0x0f, "ORA", M::AbsoluteLong, O::Ora, 5, rm!(ACC_EXTRA)),
    desc!(0x10, "BPL", M::Relative, O::Branch(Cond::Plus), 2, rm!(BRANCH_TAKEN | BRANCH_PAGE)),
    desc!(0x11, "ORA", M::DirectPageIndirectIndexedY, O::Ora, 5, rm!(ACC_EXTRA | DP_NONZERO | PAGE_CROSS)),
    desc!(0x12, "ORA", M::DirectPageIndirect, O::Ora, 5, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x13, "ORA", M::StackRelativeIndirectIndexedY, O::Ora, 7, rm!(ACC_EXTRA)),
    desc!(0x14, "TRB", M::DirectPage, O::Trb, 5, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0x15, "ORA", M::DirectPageIndexed(X), O::Ora, 4, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x16, "ASL", M::DirectPageIndexed(X), O::Asl, 6, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0x17, "ORA", M::DirectPageIndirectLongIndexedY, O::Ora, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x18, "CLC", M::Implied, O::SetFlag { flag: Status::CARRY, value: false }, 2, rm!()),
    desc!(0x19, "ORA", M::AbsoluteIndexed(Y), O::Ora, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0x1a, "INC", M::Accumulator, O::Inc, 2, rm!(RMW_EXTRA | ACCUMULATOR_REBATE)),
    desc!(0x1b, "TCS", M::Implied, O::Tcs, 2, rm!()),
    desc!(0x1c, "TRB", M::Absolute, O::Trb, 6, rm!(RMW_EXTRA)),
    desc!(0x1d, "ORA", M::AbsoluteIndexed(X), O::Ora, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0x1e, "ASL", M::AbsoluteIndexed(X), O::Asl, 7, rm!(RMW_EXTRA)),
    desc!(0x1f, "ORA", M::AbsoluteLongIndexedX, O::Ora, 5, rm!(ACC_EXTRA)),
    desc!(0x20, "JSR", M::AbsoluteTarget, O::Jsr, 6, rm!()),
    desc!(0x21, "AND", M::DirectPageIndexedIndirectX, O::And, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x22, "JSL", M::AbsoluteLongTarget, O::Jsl, 8, rm!()),
    desc!(0x23, "AND", M::StackRelative, O::And, 4, rm!(ACC_EXTRA)),
    desc!(0x24, "BIT", M::DirectPage, O::Bit, 3, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x25, "AND", M::DirectPage, O::And, 3, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x26, "ROL", M::DirectPage, O::Rol, 5, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0x27, "AND", M::DirectPageIndirectLong, O::And, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x28, "PLP", M::Implied, O::Plp, 4, rm!()),
    desc!(0x29, "AND", M::Immediate, O::And, 2, rm!(ACC_EXTRA | WIDE_ACC_IMMEDIATE)),
    desc!(0x2a, "ROL", M::Accumulator, O::Rol, 2, rm!(RMW_EXTRA | ACCUMULATOR_REBATE)),
    desc!(0x2b, "PLD", M::Implied, O::Pld, 5, rm!()),
    desc!(0x2c, "BIT", M::Absolute, O::Bit, 4, rm!(ACC_EXTRA)),
    desc!(0x2d, "AND", M::Absolute, O::And, 4, rm!(ACC_EXTRA)),
    desc!(0x2e, "ROL", M::Absolute, O::Rol, 6, rm!(RMW_EXTRA)),
    desc!(0x2f, "AND", M::AbsoluteLong, O::And, 5, rm!(ACC_EXTRA)),
    desc!(0x30, "BMI", M::Relative, O::Branch(Cond::Minus), 2, rm!(BRANCH_TAKEN | BRANCH_PAGE)),
    desc!(0x31, "AND", M::DirectPageIndirectIndexedY, O::And, 5, rm!(ACC_EXTRA | DP_NONZERO | PAGE_CROSS)),
    desc!(0x32, "AND", M::DirectPageIndirect, O::And, 5, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x33, "AND", M::StackRelativeIndirectIndexedY, O::And, 7, rm!(ACC_EXTRA)),
    desc!(0x34, "BIT", M::DirectPageIndexed(X), O::Bit, 4, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x35, "AND", M::DirectPageIndexed(X), O::And, 4, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x36, "ROL", M::DirectPageIndexed(X), O::Rol, 6, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0x37, "AND", M::DirectPageIndirectLongIndexedY, O::And, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x38, "SEC", M::Implied, O::SetFlag { flag: Status::CARRY, value: true }, 2, rm!()),
    desc!(0x39, "AND", M::AbsoluteIndexed(Y), O::And, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0x3a, "DEC", M::Accumulator, O::Dec, 2, rm!(RMW_EXTRA | ACCUMULATOR_REBATE)),
    desc!(0x3b, "TSC", M::Implied, O::Tsc, 2, rm!()),
    desc!(0x3c, "BIT", M::AbsoluteIndexed(X), O::Bit, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0x3d, "AND", M::AbsoluteIndexed(X), O::And, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0x3e, "ROL", M::AbsoluteIndexed(X), O::Rol, 7, rm!(RMW_EXTRA)),
    desc!(0x3f, "AND", M::AbsoluteLongIndexedX, O::And, 5, rm!(ACC_EXTRA)),
    desc!(0x40, "RTI", M::Implied, O::Rti, 6, rm!(NATIVE_EXTRA)),
    desc!(0x41, "EOR", M::DirectPageIndexedIndirectX, O::Eor, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x42, "WDM", M::Immediate, O::Wdm, 2, rm!(RESERVED)),
    desc!(0x43, "EOR", M::StackRelative, O::Eor, 4, rm!(ACC_EXTRA)),
    desc!(0x44, "MVP", M::BlockMove, O::Mvp, 7, rm!(PER_BYTE_MOVED)),
    desc!(0x45, "EOR", M::DirectPage, O::Eor, 3, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x46, "LSR", M::DirectPage, O::Lsr, 5, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0x47, "EOR", M::DirectPageIndirectLong, O::Eor, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x48, "PHA", M::Implied, O::Pha, 3, rm!(ACC_EXTRA)),
    desc!(0x49, "EOR", M::Immediate, O::Eor, 2, rm!(ACC_EXTRA | WIDE_ACC_IMMEDIATE)),
    desc!(0x4a, "LSR", M::Accumulator, O::Lsr, 2, rm!(RMW_EXTRA | ACCUMULATOR_REBATE)),
    desc!(0x4b, "PHK", M::Implied, O::Phk, 3, rm!()),
    desc!(0x4c, "JMP", M::AbsoluteTarget, O::Jmp, 3, rm!()),
    desc!(0x4d, "EOR", M::Absolute, O::Eor, 4, rm!(ACC_EXTRA)),
    desc!(0x4e, "LSR", M::Absolute, O::Lsr, 6, rm!(RMW_EXTRA)),
    desc!(0x4f, "EOR", M::AbsoluteLong, O::Eor, 5, rm!(ACC_EXTRA)),
    desc!(0x50, "BVC", M::Relative, O::Branch(Cond::OverflowClear), 2, rm!(BRANCH_TAKEN | BRANCH_PAGE)),
    desc!(0x51, "EOR", M::DirectPageIndirectIndexedY, O::Eor, 5, rm!(ACC_EXTRA | DP_NONZERO | PAGE_CROSS)),
    desc!(0x52, "EOR", M::DirectPageIndirect, O::Eor, 5, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x53, "EOR", M::StackRelativeIndirectIndexedY, O::Eor, 7, rm!(ACC_EXTRA)),
    desc!(0x54, "MVN", M::BlockMove, O::Mvn, 7, rm!(PER_BYTE_MOVED)),
    desc!(0x55, "EOR", M::DirectPageIndexed(X), O::Eor, 4, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x56, "LSR", M::DirectPageIndexed(X), O::Lsr, 6, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0x57, "EOR", M::DirectPageIndirectLongIndexedY, O::Eor, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x58, "CLI", M::Implied, O::SetFlag { flag: Status::IRQ_DISABLE, value: false }, 2, rm!()),
    desc!(0x59, "EOR", M::AbsoluteIndexed(Y), O::Eor, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0x5a, "PHY", M::Implied, O::PhIndex(Y), 3, rm!(IDX_EXTRA)),
    desc!(0x5b, "TCD", M::Implied, O::Tcd, 2, rm!()),
    desc!(0x5c, "JML", M::AbsoluteLongTarget, O::Jml, 4, rm!()),
    desc!(0x5d, "EOR", M::AbsoluteIndexed(X), O::Eor, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0x5e, "LSR", M::AbsoluteIndexed(X), O::Lsr, 7, rm!(RMW_EXTRA)),
    desc!(0x5f, "EOR", M::AbsoluteLongIndexedX, O::Eor, 5, rm!(ACC_EXTRA)),
    desc!(0x60, "RTS", M::Implied, O::Rts, 6, rm!()),
    desc!(0x61, "ADC", M::DirectPageIndexedIndirectX, O::Adc, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x62, "PER", M::RelativeLong, O::Per, 6, rm!()),
    desc!(0x63, "ADC", M::StackRelative, O::Adc, 4, rm!(ACC_EXTRA)),
    desc!(0x64, "STZ", M::DirectPage, O::Stz, 3, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x65, "ADC", M::DirectPage, O::Adc, 3, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x66, "ROR", M::DirectPage, O::Ror, 5, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0x67, "ADC", M::DirectPageIndirectLong, O::Adc, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x68, "PLA", M::Implied, O::Pla, 4, rm!(ACC_EXTRA)),
    desc!(0x69, "ADC", M::Immediate, O::Adc, 2, rm!(ACC_EXTRA | WIDE_ACC_IMMEDIATE)),
    desc!(0x6a, "ROR", M::Accumulator, O::Ror, 2, rm!(RMW_EXTRA | ACCUMULATOR_REBATE)),
    desc!(0x6b, "RTL", M::Implied, O::Rtl, 6, rm!()),
    desc!(0x6c, "JMP", M::AbsoluteIndirect, O::Jmp, 5, rm!()),
    desc!(0x6d, "ADC", M::Absolute, O::Adc, 4, rm!(ACC_EXTRA)),
    desc!(0x6e, "ROR", M::Absolute, O::Ror, 6, rm!(RMW_EXTRA)),
    desc!(0x6f, "ADC", M::AbsoluteLong, O::Adc, 5, rm!(ACC_EXTRA)),
    desc!(0x70, "BVS", M::Relative, O::Branch(Cond::OverflowSet), 2, rm!(BRANCH_TAKEN | BRANCH_PAGE)),
    desc!(0x71, "ADC", M::DirectPageIndirectIndexedY, O::Adc, 5, rm!(ACC_EXTRA | DP_NONZERO | PAGE_CROSS)),
    desc!(0x72, "ADC", M::DirectPageIndirect, O::Adc, 5, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x73, "ADC", M::StackRelativeIndirectIndexedY, O::Adc, 7, rm!(ACC_EXTRA)),
    desc!(0x74, "STZ", M::DirectPageIndexed(X), O::Stz, 4, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x75, "ADC", M::DirectPageIndexed(X), O::Adc, 4, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x76, "ROR", M::DirectPageIndexed(X), O::Ror, 6, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0x77, "ADC", M::DirectPageIndirectLongIndexedY, O::Adc, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x78, "SEI", M::Implied, O::SetFlag { flag: Status::IRQ_DISABLE, value: true }, 2, rm!()),
    desc!(0x79, "ADC", M::AbsoluteIndexed(Y), O::Adc, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0x7a, "PLY", M::Implied, O::PlIndex(Y), 4, rm!(IDX_EXTRA)),
    desc!(0x7b, "TDC", M::Implied, O::Tdc, 2, rm!()),
    desc!(0x7c, "JMP", M::AbsoluteIndexedIndirect, O::Jmp, 6, rm!()),
    desc!(0x7d, "ADC", M::AbsoluteIndexed(X), O::Adc, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0x7e, "ROR", M::AbsoluteIndexed(X), O::Ror, 7, rm!(RMW_EXTRA)),
    desc!(0x7f, "ADC", M::AbsoluteLongIndexedX, O::Adc, 5, rm!(ACC_EXTRA)),
    desc!(0x80, "BRA", M::Relative, O::Branch(Cond::Always), 3, rm!(BRANCH_PAGE)),
    desc!(0x81, "STA", M::DirectPageIndexedIndirectX, O::Sta, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x82, "BRL", M::RelativeLong, O::Branch(Cond::Always), 4, rm!()),
    desc!(0x83, "STA", M::StackRelative, O::Sta, 4, rm!(ACC_EXTRA)),
    desc!(0x84, "STY", M::DirectPage, O::StIndex(Y), 3, rm!(IDX_EXTRA | DP_NONZERO)),
    desc!(0x85, "STA", M::DirectPage, O::Sta, 3, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x86, "STX", M::DirectPage, O::StIndex(X), 3, rm!(IDX_EXTRA | DP_NONZERO)),
    desc!(0x87, "STA", M::DirectPageIndirectLong, O::Sta, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x88, "DEY", M::Implied, O::DecIndex(Y), 2, rm!()),
    desc!(0x89, "BIT", M::Immediate, O::Bit, 2, rm!(ACC_EXTRA | WIDE_ACC_IMMEDIATE)),
    desc!(0x8a, "TXA", M::Implied, O::TIndexA(X), 2, rm!()),
    desc!(0x8b, "PHB", M::Implied, O::Phb, 3, rm!()),
    desc!(0x8c, "STY", M::Absolute, O::StIndex(Y), 4, rm!(IDX_EXTRA)),
    desc!(0x8d, "STA", M::Absolute, O::Sta, 4, rm!(ACC_EXTRA)),
    desc!(0x8e, "STX", M::Absolute, O::StIndex(X), 4, rm!(IDX_EXTRA)),
    desc!(0x8f, "STA", M::AbsoluteLong, O::Sta, 5, rm!(ACC_EXTRA)),
    desc!(0x90, "BCC", M::Relative, O::Branch(Cond::CarryClear), 2, rm!(BRANCH_TAKEN | BRANCH_PAGE)),
    desc!(0x91, "STA", M::DirectPageIndirectIndexedY, O::Sta, 6, rm!(ACC_EXTRA | DP_NONZERO | MODE_OVERRIDE)),
    desc!(0x92, "STA", M::DirectPageIndirect, O::Sta, 5, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x93, "STA", M::StackRelativeIndirectIndexedY, O::Sta, 7, rm!(ACC_EXTRA)),
    desc!(0x94, "STY", M::DirectPageIndexed(X), O::StIndex(Y), 4, rm!(IDX_EXTRA | DP_NONZERO)),
    desc!(0x95, "STA", M::DirectPageIndexed(X), O::Sta, 4, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x96, "STX", M::DirectPageIndexed(Y), O::StIndex(X), 4, rm!(IDX_EXTRA | DP_NONZERO)),
    desc!(0x97, "STA", M::DirectPageIndirectLongIndexedY, O::Sta, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0x98, "TYA", M::Implied, O::TIndexA(Y), 2, rm!()),
    desc!(0x99, "STA", M::AbsoluteIndexed(Y), O::Sta, 5, rm!(ACC_EXTRA)),
    desc!(0x9a, "TXS", M::Implied, O::Txs, 2, rm!()),
    desc!(0x9b, "TXY", M::Implied, O::TIndexIndex { from: X, to: Y }, 2, rm!()),
    desc!(0x9c, "STZ", M::Absolute, O::Stz, 4, rm!(ACC_EXTRA)),
    desc!(0x9d, "STA", M::AbsoluteIndexed(X), O::Sta, 5, rm!(ACC_EXTRA)),
    desc!(0x9e, "STZ", M::AbsoluteIndexed(X), O::Stz, 5, rm!(ACC_EXTRA)),
    desc!(0x9f, "STA", M::AbsoluteLongIndexedX, O::Sta, 5, rm!(ACC_EXTRA)),
    desc!(0xa0, "LDY", M::Immediate, O::LdIndex(Y), 2, rm!(IDX_EXTRA | WIDE_IDX_IMMEDIATE)),
    desc!(0xa1, "LDA", M::DirectPageIndexedIndirectX, O::Lda, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xa2, "LDX", M::Immediate, O::LdIndex(X), 2, rm!(IDX_EXTRA | WIDE_IDX_IMMEDIATE)),
    desc!(0xa3, "LDA", M::StackRelative, O::Lda, 4, rm!(ACC_EXTRA)),
    desc!(0xa4, "LDY", M::DirectPage, O::LdIndex(Y), 3, rm!(IDX_EXTRA | DP_NONZERO)),
    desc!(0xa5, "LDA", M::DirectPage, O::Lda, 3, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xa6, "LDX", M::DirectPage, O::LdIndex(X), 3, rm!(IDX_EXTRA | DP_NONZERO)),
    desc!(0xa7, "LDA", M::DirectPageIndirectLong, O::Lda, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xa8, "TAY", M::Implied, O::TaIndex(Y), 2, rm!()),
    desc!(0xa9, "LDA", M::Immediate, O::Lda, 2, rm!(ACC_EXTRA | WIDE_ACC_IMMEDIATE)),
    desc!(0xaa, "TAX", M::Implied, O::TaIndex(X), 2, rm!()),
    desc!(0xab, "PLB", M::Implied, O::Plb, 4, rm!()),
    desc!(0xac, "LDY", M::Absolute, O::LdIndex(Y), 4, rm!(IDX_EXTRA)),
    desc!(0xad, "LDA", M::Absolute, O::Lda, 4, rm!(ACC_EXTRA)),
    desc!(0xae, "LDX", M::Absolute, O::LdIndex(X), 4, rm!(IDX_EXTRA)),
    desc!(0xaf, "LDA", M::AbsoluteLong, O::Lda, 5, rm!(ACC_EXTRA)),
    desc!(0xb0, "BCS", M::Relative, O::Branch(Cond::CarrySet), 2, rm!(BRANCH_TAKEN | BRANCH_PAGE)),
    desc!(0xb1, "LDA", M::DirectPageIndirectIndexedY, O::Lda, 5, rm!(ACC_EXTRA | DP_NONZERO | PAGE_CROSS)),
    desc!(0xb2, "LDA", M::DirectPageIndirect, O::Lda, 5, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xb3, "LDA", M::StackRelativeIndirectIndexedY, O::Lda, 7, rm!(ACC_EXTRA)),
    desc!(0xb4, "LDY", M::DirectPageIndexed(X), O::LdIndex(Y), 4, rm!(IDX_EXTRA | DP_NONZERO)),
    desc!(0xb5, "LDA", M::DirectPageIndexed(X), O::Lda, 4, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xb6, "LDX", M::DirectPageIndexed(Y), O::LdIndex(X), 4, rm!(IDX_EXTRA | DP_NONZERO)),
    desc!(0xb7, "LDA", M::DirectPageIndirectLongIndexedY, O::Lda, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xb8, "CLV", M::Implied, O::SetFlag { flag: Status::OVERFLOW, value: false }, 2, rm!()),
    desc!(0xb9, "LDA", M::AbsoluteIndexed(Y), O::Lda, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0xba, "TSX", M::Implied, O::Tsx, 2, rm!()),
    desc!(0xbb, "TYX", M::Implied, O::TIndexIndex { from: Y, to: X }, 2, rm!()),
    desc!(0xbc, "LDY", M::AbsoluteIndexed(X), O::LdIndex(Y), 4, rm!(IDX_EXTRA | PAGE_CROSS)),
    desc!(0xbd, "LDA", M::AbsoluteIndexed(X), O::Lda, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0xbe, "LDX", M::AbsoluteIndexed(Y), O::LdIndex(X), 4, rm!(IDX_EXTRA | PAGE_CROSS)),
    desc!(0xbf, "LDA", M::AbsoluteLongIndexedX, O::Lda, 5, rm!(ACC_EXTRA)),
    desc!(0xc0, "CPY", M::Immediate, O::CmpIndex(Y), 2, rm!(IDX_EXTRA | WIDE_IDX_IMMEDIATE)),
    desc!(0xc1, "CMP", M::DirectPageIndexedIndirectX, O::Cmp, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xc2, "REP", M::Immediate, O::Rep, 3, rm!()),
    desc!(0xc3, "CMP", M::StackRelative, O::Cmp, 4, rm!(ACC_EXTRA)),
    desc!(0xc4, "CPY", M::DirectPage, O::CmpIndex(Y), 3, rm!(IDX_EXTRA | DP_NONZERO)),
    desc!(0xc5, "CMP", M::DirectPage, O::Cmp, 3, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xc6, "DEC", M::DirectPage, O::Dec, 5, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0xc7, "CMP", M::DirectPageIndirectLong, O::Cmp, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xc8, "INY", M::Implied, O::IncIndex(Y), 2, rm!()),
    desc!(0xc9, "CMP", M::Immediate, O::Cmp, 2, rm!(ACC_EXTRA | WIDE_ACC_IMMEDIATE)),
    desc!(0xca, "DEX", M::Implied, O::DecIndex(X), 2, rm!()),
    desc!(0xcb, "WAI", M::Implied, O::Wai, 3, rm!(WAIT_COST)),
    desc!(0xcc, "CPY", M::Absolute, O::CmpIndex(Y), 4, rm!(IDX_EXTRA)),
    desc!(0xcd, "CMP", M::Absolute, O::Cmp, 4, rm!(ACC_EXTRA)),
    desc!(0xce, "DEC", M::Absolute, O::Dec, 6, rm!(RMW_EXTRA)),
    desc!(0xcf, "CMP", M::AbsoluteLong, O::Cmp, 5, rm!(ACC_EXTRA)),
    desc!(0xd0, "BNE", M::Relative, O::Branch(Cond::NotEqual), 2, rm!(BRANCH_TAKEN | BRANCH_PAGE)),
    desc!(0xd1, "CMP", M::DirectPageIndirectIndexedY, O::Cmp, 5, rm!(ACC_EXTRA | DP_NONZERO | PAGE_CROSS)),
    desc!(0xd2, "CMP", M::DirectPageIndirect, O::Cmp, 5, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xd3, "CMP", M::StackRelativeIndirectIndexedY, O::Cmp, 7, rm!(ACC_EXTRA)),
    desc!(0xd4, "PEI", M::DirectPageIndirectTarget, O::Pea, 6, rm!(DP_NONZERO)),
    desc!(0xd5, "CMP", M::DirectPageIndexed(X), O::Cmp, 4, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xd6, "DEC", M::DirectPageIndexed(X), O::Dec, 6, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0xd7, "CMP", M::DirectPageIndirectLongIndexedY, O::Cmp, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xd8, "CLD", M::Implied, O::SetFlag { flag: Status::DECIMAL, value: false }, 2, rm!()),
    desc!(0xd9, "CMP", M::AbsoluteIndexed(Y), O::Cmp, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0xda, "PHX", M::Implied, O::PhIndex(X), 3, rm!(IDX_EXTRA)),
    desc!(0xdb, "STP", M::Implied, O::Stp, 3, rm!(STOP_COST)),
    desc!(0xdc, "JML", M::AbsoluteIndirectLong, O::Jml, 6, rm!()),
    desc!(0xdd, "CMP", M::AbsoluteIndexed(X), O::Cmp, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0xde, "DEC", M::AbsoluteIndexed(X), O::Dec, 7, rm!(RMW_EXTRA)),
    desc!(0xdf, "CMP", M::AbsoluteLongIndexedX, O::Cmp, 5, rm!(ACC_EXTRA)),
    desc!(0xe0, "CPX", M::Immediate, O::CmpIndex(X), 2, rm!(IDX_EXTRA | WIDE_IDX_IMMEDIATE)),
    desc!(0xe1, "SBC", M::DirectPageIndexedIndirectX, O::Sbc, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xe2, "SEP", M::Immediate, O::Sep, 3, rm!()),
    desc!(0xe3, "SBC", M::StackRelative, O::Sbc, 4, rm!(ACC_EXTRA)),
    desc!(0xe4, "CPX", M::DirectPage, O::CmpIndex(X), 3, rm!(IDX_EXTRA | DP_NONZERO)),
    desc!(0xe5, "SBC", M::DirectPage, O::Sbc, 3, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xe6, "INC", M::DirectPage, O::Inc, 5, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0xe7, "SBC", M::DirectPageIndirectLong, O::Sbc, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xe8, "INX", M::Implied, O::IncIndex(X), 2, rm!()),
    desc!(0xe9, "SBC", M::Immediate, O::Sbc, 2, rm!(ACC_EXTRA | WIDE_ACC_IMMEDIATE)),
    desc!(0xea, "NOP", M::Implied, O::Nop, 2, rm!()),
    desc!(0xeb, "XBA", M::Implied, O::Xba, 3, rm!()),
    desc!(0xec, "CPX", M::Absolute, O::CmpIndex(X), 4, rm!(IDX_EXTRA)),
    desc!(0xed, "SBC", M::Absolute, O::Sbc, 4, rm!(ACC_EXTRA)),
    desc!(0xee, "INC", M::Absolute, O::Inc, 6, rm!(RMW_EXTRA)),
    desc!(0xef, "SBC", M::AbsoluteLong, O::Sbc, 5, rm!(ACC_EXTRA)),
    desc!(0xf0, "BEQ", M::Relative, O::Branch(Cond::Equal), 2, rm!(BRANCH_TAKEN | BRANCH_PAGE)),
    desc!(0xf1, "SBC", M::DirectPageIndirectIndexedY, O::Sbc, 5, rm!(ACC_EXTRA | DP_NONZERO | PAGE_CROSS)),
    desc!(0xf2, "SBC", M::DirectPageIndirect, O::Sbc, 5, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xf3, "SBC", M::StackRelativeIndirectIndexedY, O::Sbc, 7, rm!(ACC_EXTRA)),
    desc!(0xf4, "PEA", M::AbsoluteTarget, O::Pea, 5, rm!()),
    desc!(0xf5, "SBC", M::DirectPageIndexed(X), O::Sbc, 4, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xf6, "INC", M::DirectPageIndexed(X), O::Inc, 6, rm!(RMW_EXTRA | DP_NONZERO)),
    desc!(0xf7, "SBC", M::DirectPageIndirectLongIndexedY, O::Sbc, 6, rm!(ACC_EXTRA | DP_NONZERO)),
    desc!(0xf8, "SED", M::Implied, O::SetFlag { flag: Status::DECIMAL, value: true }, 2, rm!()),
    desc!(0xf9, "SBC", M::AbsoluteIndexed(Y), O::Sbc, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0xfa, "PLX", M::Implied, O::PlIndex(X), 4, rm!(IDX_EXTRA)),
    desc!(0xfb, "XCE", M::Implied, O::Xce, 2, rm!()),
    desc!(0xfc, "JSR", M::AbsoluteIndexedIndirect, O::Jsr, 8, rm!()),
    desc!(0xfd, "SBC", M::AbsoluteIndexed(X), O::Sbc, 4, rm!(ACC_EXTRA | PAGE_CROSS)),
    desc!(0xfe, "INC", M::AbsoluteIndexed(X), O::Inc, 7, rm!(RMW_EXTRA)),
    desc!(0xff, "SBC", M::AbsoluteLongIndexedX, O::Sbc, 5, rm!(ACC_EXTRA)),
];

/// The built instruction table: 256 default bindings plus the
/// width-dependent alternates
#[derive(Debug, Clone)]
pub struct InstructionSet {
    default: [Instruction; 256],
    acc16: [Option<Instruction>; 256],
    idx16: [Option<Instruction>; 256],
}

fn validate(desc: &Desc) -> Result<(), ConfigError> {
    for bit in 0u8..32 {
        let r = RemarkSet(1u32 << bit);
        if !desc.remarks.has(r) || remark::BUILDER.has(r) {
            continue;
        }
        match (desc.mode.claims(r), desc.op.claims(r)) {
            (true, true) => {
                return Err(ConfigError::RemarkConflict {
                    opcode: desc.opcode,
                    remark: bit,
                })
            }
            (false, false) => {
                return Err(ConfigError::RemarkUnclaimed {
                    opcode: desc.opcode,
                    remark: bit,
                })
            }
            _ => (),
        }
    }
    Ok(())
}

impl InstructionSet {
    /// Build and validate the table from the static description
    pub fn build() -> Result<Self, ConfigError> {
        const PLACEHOLDER: Instruction = Instruction {
            opcode: 0,
            mnemonic: "",
            mode: AddressMode::Implied,
            op: Operator::Nop,
            size: 0,
            cycles: 0,
            remarks: RemarkSet::EMPTY,
        };
        let mut set = Self {
            default: [PLACEHOLDER; 256],
            acc16: [None; 256],
            idx16: [None; 256],
        };
        for desc in DESCRIPTION.iter() {
            let i = desc.opcode as usize;
            if set.default[i].size != 0 {
                return Err(ConfigError::DuplicateOpcode {
                    opcode: desc.opcode,
                });
            }
            validate(desc)?;
            let instr = Instruction {
                opcode: desc.opcode,
                mnemonic: desc.mnemonic,
                mode: desc.mode,
                op: desc.op,
                size: desc.mode.size(),
                cycles: desc.cycles,
                remarks: desc.remarks,
            };
            set.default[i] = instr;
            if desc.remarks.has(remark::WIDE_ACC_IMMEDIATE) {
                set.acc16[i] = Some(Instruction {
                    mode: AddressMode::Immediate16,
                    size: AddressMode::Immediate16.size(),
                    ..instr
                });
            }
            if desc.remarks.has(remark::WIDE_IDX_IMMEDIATE) {
                set.idx16[i] = Some(Instruction {
                    mode: AddressMode::Immediate16,
                    size: AddressMode::Immediate16.size(),
                    ..instr
                });
            }
        }
        if let Some(missing) = set.default.iter().position(|i| i.size == 0) {
            return Err(ConfigError::MissingOpcode {
                opcode: missing as u8,
            });
        }
        Ok(set)
    }

    /// Select the binding for an opcode under the current flag state
    pub fn lookup(&self, opcode: u8, cpu: &Cpu) -> Instruction {
        let i = opcode as usize;
        if !cpu.is_reg8() {
            if let Some(instr) = self.acc16[i] {
                return instr;
            }
        }
        if !cpu.is_idx8() {
            if let Some(instr) = self.idx16[i] {
                return instr;
            }
        }
        self.default[i]
    }

    #[cfg(test)]
    fn variant_counts(&self) -> (usize, usize) {
        (
            self.acc16.iter().flatten().count(),
            self.idx16.iter().flatten().count(),
        )
    }
}

/// Outcome of one decode-execute step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// the instruction finished; its total cycle cost for this step
    Complete(Cycles),
    /// a self-repeating instruction wants to run again; the program
    /// counter is back at the instruction start
    Repeat,
    /// the processor is halted; nothing was executed
    Halted(Halt),
}

/// A decoded view of the instruction about to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingInstruction {
    pub addr: Addr24,
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub size: u8,
}

impl Device {
    /// Execute one instruction. On failure the program counter is rolled
    /// back to the instruction start and state is left inspectable.
    pub fn step(&mut self) -> Result<Step, StepError> {
        if self.cpu.halt != Halt::Running {
            return Ok(Step::Halted(self.cpu.halt));
        }
        let start = self.cpu.regs.pc;
        self.execute_from(start).map_err(|err| {
            self.cpu.regs.pc = start;
            err
        })
    }

    fn execute_from(&mut self, start: Addr24) -> Result<Step, StepError> {
        let opcode = self.fetch::<u8>()?;
        let instr = self.instructions.lookup(opcode, &self.cpu);
        log::trace!("executing {:02x} ({}) @ {}", opcode, instr.mnemonic, start);
        let (operand, mode_cycles) = self.resolve(instr.mode, instr.remarks)?;
        if let Operand::Move { src_bank, dst_bank } = operand {
            // every pass bills the per-byte base cost; the program
            // counter only moves on once the counter in C ran out
            let repeat = self.block_move_step(instr.op, src_bank, dst_bank)?;
            self.master_cycles += instr.cycles as Cycles;
            if repeat {
                self.cpu.regs.pc = start;
                return Ok(Step::Repeat);
            }
            return Ok(Step::Complete(instr.cycles as Cycles));
        }
        let op_cycles = self.run_operator(instr.op, operand, instr.remarks)?;
        let total = instr.cycles as i32 + mode_cycles + op_cycles;
        debug_assert!(total > 0, "instruction cycle count must stay positive");
        let total = total.max(1) as Cycles;
        self.master_cycles += total;
        Ok(Step::Complete(total))
    }

    /// Decode the instruction at the program counter without executing
    pub fn peek_instruction(&self) -> Option<PendingInstruction> {
        let addr = self.cpu.regs.pc;
        let opcode = self.mem.peek(addr)?;
        let instr = self.instructions.lookup(opcode, &self.cpu);
        Some(PendingInstruction {
            addr,
            opcode,
            mnemonic: instr.mnemonic,
            size: instr.size,
        })
    }

    /// Render the instruction at `addr` as mnemonic + operand text
    pub fn disassemble(&self, addr: Addr24) -> Option<String> {
        let opcode = self.mem.peek(addr)?;
        let instr = self.instructions.lookup(opcode, &self.cpu);
        let mut bytes = [0u8; 3];
        for (i, byte) in bytes.iter_mut().enumerate().take(instr.size as usize - 1) {
            *byte = self
                .mem
                .peek(Addr24::new(
                    addr.bank,
                    addr.addr.wrapping_add(i as u16 + 1),
                ))
                .unwrap_or(0);
        }
        let next = Addr24::new(addr.bank, addr.addr.wrapping_add(instr.size as u16));
        let operand = instr.mode.format(&bytes[..instr.size as usize - 1], next);
        if operand.is_empty() {
            Some(instr.mnemonic.to_string())
        } else {
            Some(format!("{} {}", instr.mnemonic, operand))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_complete() {
        let set = InstructionSet::build().unwrap();
        for opcode in 0..=255u8 {
            let instr = set.default[opcode as usize];
            assert_eq!(instr.opcode, opcode);
            assert!((1..=4).contains(&instr.size), "opcode {opcode:#04x}");
            assert!(instr.cycles >= 1, "opcode {opcode:#04x}");
        }
        // eight immediates widen with the accumulator, four with the
        // index registers
        assert_eq!(set.variant_counts(), (8, 4));
    }

    #[test]
    fn dispatch_prefers_width_variants() {
        let set = InstructionSet::build().unwrap();
        let mut cpu = Cpu::new();
        assert_eq!(set.lookup(0xa9, &cpu).size, 2);
        cpu.regs.is_emulation = false;
        cpu.regs.status &= !(Status::ACCUMULATION | Status::INDEX_REGISTER_SIZE);
        assert_eq!(set.lookup(0xa9, &cpu).size, 3);
        assert_eq!(set.lookup(0xa2, &cpu).size, 3);
        // width variants only exist for the immediates
        assert_eq!(set.lookup(0xad, &cpu).size, 3);
        assert_eq!(set.lookup(0xad, &cpu).mode, AddressMode::Absolute);
    }

    #[test]
    fn every_remark_has_exactly_one_owner() {
        for desc in DESCRIPTION.iter() {
            validate(desc).unwrap();
        }
    }

    #[test]
    fn unclaimed_remarks_are_rejected() {
        let bad = Desc {
            opcode: 0xea,
            mnemonic: "NOP",
            mode: AddressMode::Implied,
            op: Operator::Nop,
            cycles: 2,
            remarks: remark::DP_NONZERO,
        };
        assert_eq!(
            validate(&bad),
            Err(ConfigError::RemarkUnclaimed {
                opcode: 0xea,
                remark: 2
            })
        );
    }
}
