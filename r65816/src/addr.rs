//! Addressing mode strategies
//!
//! Every mode resolves its trailing instruction bytes into an
//! [`Operand`] and reports the cycle adjustment it owns (direct-page
//! penalty, indexed page crossing, the accumulator rebate). Control-flow
//! operators receive a resolved target instead of a memory operand.

use crate::{
    cpu::Index,
    device::{Addr24, Device},
    error::StepError,
    instr::{remark, RemarkSet},
    mem::Wrap,
};

/// What an addressing mode hands to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Accumulator,
    /// literal trailing byte(s), read-only
    Immediate(u16),
    /// a resolved memory location with its word-wrap domain
    Memory { addr: Addr24, wrap: Wrap },
    /// a control-flow destination
    Target(Addr24),
    /// a signed program-counter displacement
    Relative(i16),
    /// source and destination banks of a block move
    Move { src_bank: u8, dst_bank: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Absolute,
    /// Absolute resolving a jump/call destination
    AbsoluteTarget,
    AbsoluteIndexed(Index),
    AbsoluteIndexedIndirect,
    AbsoluteIndirect,
    AbsoluteIndirectLong,
    AbsoluteLong,
    /// Absolute long resolving a jump/call destination
    AbsoluteLongTarget,
    AbsoluteLongIndexedX,
    Accumulator,
    BlockMove,
    DirectPage,
    DirectPageIndexed(Index),
    DirectPageIndexedIndirectX,
    DirectPageIndirect,
    /// Direct page indirect resolving a pushable address (PEI)
    DirectPageIndirectTarget,
    DirectPageIndirectIndexedY,
    DirectPageIndirectLong,
    DirectPageIndirectLongIndexedY,
    Immediate,
    Immediate16,
    Implied,
    Relative,
    RelativeLong,
    StackRelative,
    StackRelativeIndirectIndexedY,
}

impl AddressMode {
    /// Instruction byte count, opcode included
    pub const fn size(self) -> u8 {
        use AddressMode as M;
        match self {
            M::Accumulator | M::Implied => 1,
            M::DirectPage
            | M::DirectPageIndexed(_)
            | M::DirectPageIndexedIndirectX
            | M::DirectPageIndirect
            | M::DirectPageIndirectTarget
            | M::DirectPageIndirectIndexedY
            | M::DirectPageIndirectLong
            | M::DirectPageIndirectLongIndexedY
            | M::Immediate
            | M::Relative
            | M::StackRelative
            | M::StackRelativeIndirectIndexedY => 2,
            M::Absolute
            | M::AbsoluteTarget
            | M::AbsoluteIndexed(_)
            | M::AbsoluteIndexedIndirect
            | M::AbsoluteIndirect
            | M::AbsoluteIndirectLong
            | M::BlockMove
            | M::Immediate16
            | M::RelativeLong => 3,
            M::AbsoluteLong | M::AbsoluteLongTarget | M::AbsoluteLongIndexedX => 4,
        }
    }

    /// The conditional cycle remarks this mode owns
    pub fn claims(self, bit: RemarkSet) -> bool {
        use AddressMode as M;
        let claimed = match self {
            M::DirectPage
            | M::DirectPageIndexed(_)
            | M::DirectPageIndexedIndirectX
            | M::DirectPageIndirect
            | M::DirectPageIndirectTarget
            | M::DirectPageIndirectLong
            | M::DirectPageIndirectLongIndexedY => remark::DP_NONZERO,
            M::DirectPageIndirectIndexedY => {
                remark::DP_NONZERO | remark::PAGE_CROSS | remark::MODE_OVERRIDE
            }
            M::AbsoluteIndexed(_) => remark::PAGE_CROSS | remark::MODE_OVERRIDE,
            M::Accumulator => remark::ACCUMULATOR_REBATE,
            _ => RemarkSet::EMPTY,
        };
        claimed.has(bit)
    }

    /// Operand text for disassembly; `bytes` are the trailing bytes and
    /// `next` is the address following the instruction (relative modes)
    pub(crate) fn format(self, bytes: &[u8], next: Addr24) -> String {
        use AddressMode as M;
        let b = |i: usize| bytes.get(i).copied().unwrap_or(0);
        let word = u16::from_le_bytes([b(0), b(1)]);
        match self {
            M::Implied => String::new(),
            M::Accumulator => "A".into(),
            M::Immediate => format!("#${:02x}", b(0)),
            M::Immediate16 => format!("#${:04x}", word),
            M::Absolute | M::AbsoluteTarget => format!("${:04x}", word),
            M::AbsoluteIndexed(idx) => format!("${:04x},{}", word, idx.name()),
            M::AbsoluteIndexedIndirect => format!("(${:04x},X)", word),
            M::AbsoluteIndirect => format!("(${:04x})", word),
            M::AbsoluteIndirectLong => format!("[${:04x}]", word),
            M::AbsoluteLong | M::AbsoluteLongTarget => format!("${:02x}{:04x}", b(2), word),
            M::AbsoluteLongIndexedX => format!("${:02x}{:04x},X", b(2), word),
            M::BlockMove => format!("${:02x},${:02x}", b(1), b(0)),
            M::DirectPage => format!("${:02x}", b(0)),
            M::DirectPageIndexed(idx) => format!("${:02x},{}", b(0), idx.name()),
            M::DirectPageIndexedIndirectX => format!("(${:02x},X)", b(0)),
            M::DirectPageIndirect | M::DirectPageIndirectTarget => format!("(${:02x})", b(0)),
            M::DirectPageIndirectIndexedY => format!("(${:02x}),Y", b(0)),
            M::DirectPageIndirectLong => format!("[${:02x}]", b(0)),
            M::DirectPageIndirectLongIndexedY => format!("[${:02x}],Y", b(0)),
            M::Relative => {
                let dest = next.addr.wrapping_add(b(0) as i8 as i16 as u16);
                format!("${:04x}", dest)
            }
            M::RelativeLong => format!("${:04x}", next.addr.wrapping_add(word)),
            M::StackRelative => format!("${:02x},S", b(0)),
            M::StackRelativeIndirectIndexedY => format!("(${:02x},S),Y", b(0)),
        }
    }
}

const fn crosses_page(base: Addr24, indexed: Addr24) -> bool {
    base.to_linear() >> 8 != indexed.to_linear() >> 8
}

impl Device {
    /// +1 cycle if the low byte of the direct page register is non-zero
    fn dp_penalty(&self) -> i32 {
        (self.cpu.regs.dp & 0xff != 0) as i32
    }

    /// Effective direct-page address of `low + offset`. With the direct
    /// page aligned in emulation mode the sum stays inside the page,
    /// otherwise it wraps within bank zero.
    fn direct_addr(&self, low: u8, offset: u16) -> (Addr24, Wrap) {
        let regs = &self.cpu.regs;
        if regs.is_emulation && regs.dp & 0xff == 0 {
            let addr = (regs.dp & 0xff00) | low.wrapping_add(offset as u8) as u16;
            (Addr24::new(0, addr), Wrap::Page)
        } else {
            let addr = regs.dp.wrapping_add(low as u16).wrapping_add(offset);
            (Addr24::new(0, addr), Wrap::Bank)
        }
    }

    /// Resolve an operand from the trailing instruction bytes, advancing
    /// the program counter past them. Returns the operand and the cycle
    /// adjustment owned by the addressing mode.
    pub(crate) fn resolve(
        &mut self,
        mode: AddressMode,
        remarks: RemarkSet,
    ) -> Result<(Operand, i32), StepError> {
        use AddressMode as M;
        let mut cycles = 0i32;
        let operand = match mode {
            M::Implied => Operand::None,
            M::Accumulator => {
                if !self.cpu.is_reg8() {
                    cycles -= 2;
                }
                Operand::Accumulator
            }
            M::Immediate => Operand::Immediate(self.fetch::<u8>()? as u16),
            M::Immediate16 => Operand::Immediate(self.fetch::<u16>()?),
            M::Relative => Operand::Relative(self.fetch::<u8>()? as i8 as i16),
            M::RelativeLong => Operand::Relative(self.fetch::<u16>()? as i16),
            M::Absolute => {
                let addr = self.fetch::<u16>()?;
                Operand::Memory {
                    addr: self.cpu.get_data_addr(addr),
                    wrap: Wrap::Full,
                }
            }
            M::AbsoluteTarget => {
                let addr = self.fetch::<u16>()?;
                Operand::Target(Addr24::new(self.cpu.regs.pc.bank, addr))
            }
            M::AbsoluteIndexed(idx) => {
                let base = self.fetch::<u16>()?;
                let base = self.cpu.get_data_addr(base);
                let indexed = base.wrapping_add24(self.cpu.regs.index(idx));
                if remarks.has(remark::PAGE_CROSS) && crosses_page(base, indexed) {
                    cycles += 1;
                }
                Operand::Memory {
                    addr: indexed,
                    wrap: Wrap::Full,
                }
            }
            M::AbsoluteIndexedIndirect => {
                let base = self.fetch::<u16>()?;
                let ptr = Addr24::new(
                    self.cpu.regs.pc.bank,
                    base.wrapping_add(self.cpu.regs.x),
                );
                let target = self.mem.read_word(ptr, Wrap::Bank)?;
                Operand::Target(Addr24::new(self.cpu.regs.pc.bank, target))
            }
            M::AbsoluteIndirect => {
                let ptr = self.fetch::<u16>()?;
                let target = self.mem.read_word(self.cpu.get_data_addr(ptr), Wrap::Full)?;
                Operand::Target(Addr24::new(self.cpu.regs.pc.bank, target))
            }
            M::AbsoluteIndirectLong => {
                let ptr = self.fetch::<u16>()?;
                Operand::Target(self.mem.read_long(self.cpu.get_data_addr(ptr), Wrap::Full)?)
            }
            M::AbsoluteLong => Operand::Memory {
                addr: self.fetch::<Addr24>()?,
                wrap: Wrap::Full,
            },
            M::AbsoluteLongTarget => Operand::Target(self.fetch::<Addr24>()?),
            M::AbsoluteLongIndexedX => {
                let base = self.fetch::<Addr24>()?;
                Operand::Memory {
                    addr: base.wrapping_add24(self.cpu.regs.x),
                    wrap: Wrap::Full,
                }
            }
            M::BlockMove => {
                let [dst_bank, src_bank] = self.fetch::<u16>()?.to_le_bytes();
                Operand::Move { src_bank, dst_bank }
            }
            M::DirectPage => {
                let low = self.fetch::<u8>()?;
                cycles += self.dp_penalty();
                let (addr, wrap) = self.direct_addr(low, 0);
                Operand::Memory { addr, wrap }
            }
            M::DirectPageIndexed(idx) => {
                let low = self.fetch::<u8>()?;
                cycles += self.dp_penalty();
                let (addr, wrap) = self.direct_addr(low, self.cpu.regs.index(idx));
                Operand::Memory { addr, wrap }
            }
            M::DirectPageIndexedIndirectX => {
                let low = self.fetch::<u8>()?;
                cycles += self.dp_penalty();
                let (ptr, wrap) = self.direct_addr(low, self.cpu.regs.x);
                let target = self.mem.read_word(ptr, wrap)?;
                Operand::Memory {
                    addr: self.cpu.get_data_addr(target),
                    wrap: Wrap::Full,
                }
            }
            M::DirectPageIndirect => {
                let low = self.fetch::<u8>()?;
                cycles += self.dp_penalty();
                let (ptr, wrap) = self.direct_addr(low, 0);
                let target = self.mem.read_word(ptr, wrap)?;
                Operand::Memory {
                    addr: self.cpu.get_data_addr(target),
                    wrap: Wrap::Full,
                }
            }
            M::DirectPageIndirectTarget => {
                let low = self.fetch::<u8>()?;
                cycles += self.dp_penalty();
                let (ptr, wrap) = self.direct_addr(low, 0);
                let target = self.mem.read_word(ptr, wrap)?;
                Operand::Target(Addr24::new(self.cpu.regs.pc.bank, target))
            }
            M::DirectPageIndirectIndexedY => {
                let low = self.fetch::<u8>()?;
                cycles += self.dp_penalty();
                let (ptr, wrap) = self.direct_addr(low, 0);
                let base = self.cpu.get_data_addr(self.mem.read_word(ptr, wrap)?);
                let indexed = base.wrapping_add24(self.cpu.regs.y);
                if remarks.has(remark::PAGE_CROSS) && crosses_page(base, indexed) {
                    cycles += 1;
                }
                Operand::Memory {
                    addr: indexed,
                    wrap: Wrap::Full,
                }
            }
            M::DirectPageIndirectLong => {
                let low = self.fetch::<u8>()?;
                cycles += self.dp_penalty();
                let (ptr, wrap) = self.direct_addr(low, 0);
                Operand::Memory {
                    addr: self.mem.read_long(ptr, wrap)?,
                    wrap: Wrap::Full,
                }
            }
            M::DirectPageIndirectLongIndexedY => {
                let low = self.fetch::<u8>()?;
                cycles += self.dp_penalty();
                let (ptr, wrap) = self.direct_addr(low, 0);
                let base = self.mem.read_long(ptr, wrap)?;
                Operand::Memory {
                    addr: base.wrapping_add24(self.cpu.regs.y),
                    wrap: Wrap::Full,
                }
            }
            M::StackRelative => {
                let low = self.fetch::<u8>()?;
                Operand::Memory {
                    addr: Addr24::new(0, self.cpu.regs.sp.wrapping_add(low as u16)),
                    wrap: Wrap::Bank,
                }
            }
            M::StackRelativeIndirectIndexedY => {
                let low = self.fetch::<u8>()?;
                let ptr = Addr24::new(0, self.cpu.regs.sp.wrapping_add(low as u16));
                let base = self.cpu.get_data_addr(self.mem.read_word(ptr, Wrap::Bank)?);
                Operand::Memory {
                    addr: base.wrapping_add24(self.cpu.regs.y),
                    wrap: Wrap::Full,
                }
            }
        };
        Ok((operand, cycles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_the_catalogue() {
        assert_eq!(AddressMode::Implied.size(), 1);
        assert_eq!(AddressMode::Accumulator.size(), 1);
        assert_eq!(AddressMode::DirectPage.size(), 2);
        assert_eq!(AddressMode::Immediate.size(), 2);
        assert_eq!(AddressMode::Absolute.size(), 3);
        assert_eq!(AddressMode::BlockMove.size(), 3);
        assert_eq!(AddressMode::Immediate16.size(), 3);
        assert_eq!(AddressMode::AbsoluteLong.size(), 4);
        assert_eq!(AddressMode::AbsoluteLongIndexedX.size(), 4);
    }

    #[test]
    fn page_cross_detection_spans_banks() {
        let base = Addr24::new(0x12, 0xffff);
        let indexed = base.wrapping_add24(1);
        assert_eq!(indexed, Addr24::new(0x13, 0x0000));
        assert!(crosses_page(base, indexed));
        assert!(!crosses_page(
            Addr24::new(0x12, 0x1000),
            Addr24::new(0x12, 0x10ff)
        ));
    }
}
