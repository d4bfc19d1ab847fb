//! Operator strategies
//!
//! Each operator performs its documented side effect on the processor
//! state and reports the extra cycles it owns (the 16-bit width
//! penalties, branch-taken cost, native-mode interrupt cost). Operators
//! without a complete implementation report an unimplemented-feature
//! failure instead of computing a wrong result.

use crate::{
    cpu::{binary_add16, binary_add8, decimal_add8, decimal_sub8, Halt, Index, Status},
    device::{Addr24, Device, VectorKind},
    error::{StepError, Violation},
    instr::{remark, RemarkSet},
    addr::Operand,
};

/// Branch condition of the program-counter-relative operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Always,
    CarryClear,
    CarrySet,
    Equal,
    NotEqual,
    Minus,
    Plus,
    OverflowClear,
    OverflowSet,
}

impl Cond {
    fn eval(self, status: Status) -> bool {
        match self {
            Cond::Always => true,
            Cond::CarryClear => !status.has(Status::CARRY),
            Cond::CarrySet => status.has(Status::CARRY),
            Cond::Equal => status.has(Status::ZERO),
            Cond::NotEqual => !status.has(Status::ZERO),
            Cond::Minus => status.has(Status::NEGATIVE),
            Cond::Plus => !status.has(Status::NEGATIVE),
            Cond::OverflowClear => !status.has(Status::OVERFLOW),
            Cond::OverflowSet => status.has(Status::OVERFLOW),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Adc,
    And,
    Asl,
    Bit,
    Branch(Cond),
    Brk,
    Cop,
    Cmp,
    CmpIndex(Index),
    Dec,
    DecIndex(Index),
    Eor,
    Inc,
    IncIndex(Index),
    Jmp,
    Jml,
    Jsr,
    Jsl,
    Lda,
    LdIndex(Index),
    Lsr,
    Mvn,
    Mvp,
    Nop,
    Ora,
    Pea,
    Per,
    Pha,
    Phb,
    Phd,
    Phk,
    Php,
    PhIndex(Index),
    Pla,
    Plb,
    Pld,
    Plp,
    PlIndex(Index),
    Rep,
    Rol,
    Ror,
    Rti,
    Rtl,
    Rts,
    Sbc,
    Sep,
    SetFlag { flag: Status, value: bool },
    Sta,
    StIndex(Index),
    Stz,
    Stp,
    TaIndex(Index),
    Tcd,
    Tcs,
    Tdc,
    TIndexA(Index),
    TIndexIndex { from: Index, to: Index },
    Trb,
    Tsb,
    Tsc,
    Tsx,
    Txs,
    Wai,
    Wdm,
    Xba,
    Xce,
}

impl Operator {
    /// The conditional cycle remarks this operator owns
    pub fn claims(self, bit: RemarkSet) -> bool {
        use Operator as O;
        let claimed = match self {
            O::Adc | O::And | O::Bit | O::Cmp | O::Eor | O::Lda | O::Ora | O::Sbc | O::Sta
            | O::Stz | O::Pha | O::Pla => remark::ACC_EXTRA,
            O::Asl | O::Dec | O::Inc | O::Lsr | O::Rol | O::Ror | O::Trb | O::Tsb => {
                remark::RMW_EXTRA
            }
            O::Branch(_) => remark::BRANCH_TAKEN | remark::BRANCH_PAGE,
            O::Brk | O::Cop | O::Rti => remark::NATIVE_EXTRA,
            O::CmpIndex(_) | O::LdIndex(_) | O::StIndex(_) | O::PhIndex(_) | O::PlIndex(_) => {
                remark::IDX_EXTRA
            }
            O::Mvn | O::Mvp => remark::PER_BYTE_MOVED,
            O::Stp => remark::STOP_COST,
            O::Wai => remark::WAIT_COST,
            O::Wdm => remark::RESERVED,
            _ => RemarkSet::EMPTY,
        };
        claimed.has(bit)
    }
}

impl Device {
    fn operand_read8(&mut self, operand: Operand) -> Result<u8, StepError> {
        match operand {
            Operand::Accumulator => Ok(self.cpu.regs.a8()),
            Operand::Immediate(value) => Ok(value as u8),
            Operand::Memory { addr, .. } => Ok(self.mem.read(addr)?),
            _ => Err(StepError::Unimplemented(format!(
                "byte read from operand {operand:?}"
            ))),
        }
    }

    fn operand_read16(&mut self, operand: Operand) -> Result<u16, StepError> {
        match operand {
            Operand::Accumulator => Ok(self.cpu.regs.a),
            Operand::Immediate(value) => Ok(value),
            Operand::Memory { addr, wrap } => Ok(self.mem.read_word(addr, wrap)?),
            _ => Err(StepError::Unimplemented(format!(
                "word read from operand {operand:?}"
            ))),
        }
    }

    fn operand_write8(&mut self, operand: Operand, value: u8) -> Result<(), StepError> {
        match operand {
            Operand::Accumulator => Ok(self.cpu.regs.set_a8(value)),
            Operand::Immediate(_) => Err(Violation::WriteImmediate.into()),
            Operand::Memory { addr, .. } => Ok(self.mem.write(addr, value)?),
            _ => Err(StepError::Unimplemented(format!(
                "byte write to operand {operand:?}"
            ))),
        }
    }

    fn operand_write16(&mut self, operand: Operand, value: u16) -> Result<(), StepError> {
        match operand {
            Operand::Accumulator => Ok(self.cpu.regs.a = value),
            Operand::Immediate(_) => Err(Violation::WriteImmediate.into()),
            Operand::Memory { addr, wrap } => Ok(self.mem.write_word(addr, value, wrap)?),
            _ => Err(StepError::Unimplemented(format!(
                "word write to operand {operand:?}"
            ))),
        }
    }

    fn target(&self, operand: Operand) -> Result<Addr24, StepError> {
        match operand {
            Operand::Target(addr) => Ok(addr),
            _ => Err(StepError::Unimplemented(format!(
                "control-flow target from operand {operand:?}"
            ))),
        }
    }

    fn displacement(&self, operand: Operand) -> Result<i16, StepError> {
        match operand {
            Operand::Relative(offset) => Ok(offset),
            _ => Err(StepError::Unimplemented(format!(
                "displacement from operand {operand:?}"
            ))),
        }
    }

    fn add_carry8(&mut self, value: u8) -> Result<(), StepError> {
        let carry = self.cpu.regs.status.has(Status::CARRY);
        let (sum, carry, overflow) = if self.cpu.regs.status.has(Status::DECIMAL) {
            decimal_add8(self.cpu.regs.a8(), value, carry)
        } else {
            binary_add8(self.cpu.regs.a8(), value, carry)
        };
        self.cpu.regs.status.set_if(Status::CARRY, carry);
        self.cpu.regs.status.set_if(Status::OVERFLOW, overflow);
        self.cpu.update_nz8(sum);
        self.cpu.regs.set_a8(sum);
        Ok(())
    }

    fn add_carry16(&mut self, value: u16) -> Result<(), StepError> {
        if self.cpu.regs.status.has(Status::DECIMAL) {
            return Err(StepError::Unimplemented(
                "16-bit decimal arithmetic".into(),
            ));
        }
        let carry = self.cpu.regs.status.has(Status::CARRY);
        let (sum, carry, overflow) = binary_add16(self.cpu.regs.a, value, carry);
        self.cpu.regs.status.set_if(Status::CARRY, carry);
        self.cpu.regs.status.set_if(Status::OVERFLOW, overflow);
        self.cpu.update_nz16(sum);
        self.cpu.regs.a = sum;
        Ok(())
    }

    fn sub_carry8(&mut self, value: u8) -> Result<(), StepError> {
        if self.cpu.regs.status.has(Status::DECIMAL) {
            let carry = self.cpu.regs.status.has(Status::CARRY);
            let (diff, carry, overflow) = decimal_sub8(self.cpu.regs.a8(), value, carry);
            self.cpu.regs.status.set_if(Status::CARRY, carry);
            self.cpu.regs.status.set_if(Status::OVERFLOW, overflow);
            self.cpu.update_nz8(diff);
            self.cpu.regs.set_a8(diff);
            Ok(())
        } else {
            self.add_carry8(!value)
        }
    }

    fn branch(&mut self, cond: Cond, offset: i16, remarks: RemarkSet) -> i32 {
        if !cond.eval(self.cpu.regs.status) {
            return 0;
        }
        let mut cycles = remarks.has(remark::BRANCH_TAKEN) as i32;
        let old = self.cpu.regs.pc.addr;
        let new = old.wrapping_add(offset as u16);
        self.cpu.regs.pc.addr = new;
        if remarks.has(remark::BRANCH_PAGE)
            && self.cpu.regs.is_emulation
            && old & 0xff00 != new & 0xff00
        {
            cycles += 1;
        }
        cycles
    }

    /// Move one byte of a block move and step the index registers in the
    /// operator's direction. Returns whether the instruction wants to be
    /// re-invoked (the byte counter in C had not run out yet).
    pub(crate) fn block_move_step(
        &mut self,
        op: Operator,
        src_bank: u8,
        dst_bank: u8,
    ) -> Result<bool, StepError> {
        let count = self.cpu.regs.a;
        let (x, y) = if self.cpu.is_idx8() {
            (self.cpu.regs.x & 0xff, self.cpu.regs.y & 0xff)
        } else {
            (self.cpu.regs.x, self.cpu.regs.y)
        };
        let value = self.mem.read(Addr24::new(src_bank, x))?;
        self.mem.write(Addr24::new(dst_bank, y), value)?;
        let step: u16 = match op {
            Operator::Mvn => 1,
            _ => 0xffff,
        };
        if self.cpu.is_idx8() {
            self.cpu.regs.x = (x.wrapping_add(step)) & 0xff;
            self.cpu.regs.y = (y.wrapping_add(step)) & 0xff;
        } else {
            self.cpu.regs.x = x.wrapping_add(step);
            self.cpu.regs.y = y.wrapping_add(step);
        }
        self.cpu.regs.a = count.wrapping_sub(1);
        Ok(count != 0)
    }

    /// Execute an operator against a resolved operand, returning the
    /// extra cycles the operator owns
    pub(crate) fn run_operator(
        &mut self,
        op: Operator,
        operand: Operand,
        remarks: RemarkSet,
    ) -> Result<i32, StepError> {
        use Operator as O;
        let mut cycles = 0i32;
        match op {
            O::Adc => {
                if self.cpu.is_reg8() {
                    let value = self.operand_read8(operand)?;
                    self.add_carry8(value)?;
                } else {
                    let value = self.operand_read16(operand)?;
                    self.add_carry16(value)?;
                    cycles += 1;
                }
            }
            O::Sbc => {
                if self.cpu.is_reg8() {
                    let value = self.operand_read8(operand)?;
                    self.sub_carry8(value)?;
                } else {
                    let value = self.operand_read16(operand)?;
                    self.add_carry16(!value)?;
                    cycles += 1;
                }
            }
            O::And | O::Eor | O::Ora => {
                if self.cpu.is_reg8() {
                    let value = self.operand_read8(operand)?;
                    let result = match op {
                        O::And => self.cpu.regs.a8() & value,
                        O::Eor => self.cpu.regs.a8() ^ value,
                        _ => self.cpu.regs.a8() | value,
                    };
                    self.cpu.regs.set_a8(result);
                    self.cpu.update_nz8(result);
                } else {
                    let value = self.operand_read16(operand)?;
                    let result = match op {
                        O::And => self.cpu.regs.a & value,
                        O::Eor => self.cpu.regs.a ^ value,
                        _ => self.cpu.regs.a | value,
                    };
                    self.cpu.regs.a = result;
                    self.cpu.update_nz16(result);
                    cycles += 1;
                }
            }
            O::Asl | O::Lsr | O::Rol | O::Ror => {
                let carry_in = self.cpu.regs.status.has(Status::CARRY);
                if self.cpu.is_reg8() {
                    let value = self.operand_read8(operand)?;
                    let (result, carry) = match op {
                        O::Asl => (value << 1, value & 0x80 != 0),
                        O::Lsr => (value >> 1, value & 1 != 0),
                        O::Rol => (value << 1 | carry_in as u8, value & 0x80 != 0),
                        _ => (value >> 1 | (carry_in as u8) << 7, value & 1 != 0),
                    };
                    self.cpu.regs.status.set_if(Status::CARRY, carry);
                    self.cpu.update_nz8(result);
                    self.operand_write8(operand, result)?;
                } else {
                    let value = self.operand_read16(operand)?;
                    let (result, carry) = match op {
                        O::Asl => (value << 1, value & 0x8000 != 0),
                        O::Lsr => (value >> 1, value & 1 != 0),
                        O::Rol => (value << 1 | carry_in as u16, value & 0x8000 != 0),
                        _ => (value >> 1 | (carry_in as u16) << 15, value & 1 != 0),
                    };
                    self.cpu.regs.status.set_if(Status::CARRY, carry);
                    self.cpu.update_nz16(result);
                    self.operand_write16(operand, result)?;
                    cycles += 2;
                }
            }
            O::Bit => {
                let immediate = matches!(operand, Operand::Immediate(_));
                if self.cpu.is_reg8() {
                    let value = self.operand_read8(operand)?;
                    if !immediate {
                        self.cpu.regs.status.set_if(Status::NEGATIVE, value & 0x80 != 0);
                        self.cpu.regs.status.set_if(Status::OVERFLOW, value & 0x40 != 0);
                    }
                    self.cpu
                        .regs
                        .status
                        .set_if(Status::ZERO, self.cpu.regs.a8() & value == 0);
                } else {
                    let value = self.operand_read16(operand)?;
                    if !immediate {
                        self.cpu
                            .regs
                            .status
                            .set_if(Status::NEGATIVE, value & 0x8000 != 0);
                        self.cpu
                            .regs
                            .status
                            .set_if(Status::OVERFLOW, value & 0x4000 != 0);
                    }
                    self.cpu
                        .regs
                        .status
                        .set_if(Status::ZERO, self.cpu.regs.a & value == 0);
                    cycles += 1;
                }
            }
            O::Branch(cond) => {
                let offset = self.displacement(operand)?;
                cycles += self.branch(cond, offset, remarks);
            }
            O::Brk => {
                if !self.cpu.regs.is_emulation {
                    cycles += 1;
                }
                self.interrupt(VectorKind::Brk)?;
            }
            O::Cop => {
                if !self.cpu.regs.is_emulation {
                    cycles += 1;
                }
                self.interrupt(VectorKind::Cop)?;
            }
            O::Cmp => {
                if self.cpu.is_reg8() {
                    let value = self.operand_read8(operand)?;
                    let a = self.cpu.regs.a8();
                    self.cpu.regs.status.set_if(Status::CARRY, a >= value);
                    self.cpu.update_nz8(a.wrapping_sub(value));
                } else {
                    let value = self.operand_read16(operand)?;
                    let a = self.cpu.regs.a;
                    self.cpu.regs.status.set_if(Status::CARRY, a >= value);
                    self.cpu.update_nz16(a.wrapping_sub(value));
                    cycles += 1;
                }
            }
            O::CmpIndex(idx) => {
                let reg = self.cpu.regs.index(idx);
                if self.cpu.is_idx8() {
                    let value = self.operand_read8(operand)?;
                    let reg = (reg & 0xff) as u8;
                    self.cpu.regs.status.set_if(Status::CARRY, reg >= value);
                    self.cpu.update_nz8(reg.wrapping_sub(value));
                } else {
                    let value = self.operand_read16(operand)?;
                    self.cpu.regs.status.set_if(Status::CARRY, reg >= value);
                    self.cpu.update_nz16(reg.wrapping_sub(value));
                    cycles += 1;
                }
            }
            O::Dec | O::Inc => {
                let delta: u16 = if matches!(op, O::Inc) { 1 } else { 0xffff };
                if self.cpu.is_reg8() {
                    let value = self.operand_read8(operand)?.wrapping_add(delta as u8);
                    self.operand_write8(operand, value)?;
                    self.cpu.update_nz8(value);
                } else {
                    let value = self.operand_read16(operand)?.wrapping_add(delta);
                    self.operand_write16(operand, value)?;
                    self.cpu.update_nz16(value);
                    cycles += 2;
                }
            }
            O::DecIndex(idx) | O::IncIndex(idx) => {
                let delta: u16 = if matches!(op, O::IncIndex(_)) { 1 } else { 0xffff };
                let value = self.cpu.regs.index(idx).wrapping_add(delta);
                self.cpu.set_index(idx, value);
            }
            O::Jmp | O::Jml => {
                let target = self.target(operand)?;
                if matches!(op, O::Jml) {
                    self.cpu.regs.pc = target;
                } else {
                    self.cpu.regs.pc.addr = target.addr;
                }
            }
            O::Jsr => {
                let target = self.target(operand)?;
                self.push16(self.cpu.regs.pc.addr.wrapping_sub(1))?;
                self.cpu.regs.pc.addr = target.addr;
            }
            O::Jsl => {
                let target = self.target(operand)?;
                self.push8(self.cpu.regs.pc.bank)?;
                self.push16(self.cpu.regs.pc.addr.wrapping_sub(1))?;
                self.cpu.regs.pc = target;
            }
            O::Lda => {
                if self.cpu.is_reg8() {
                    let value = self.operand_read8(operand)?;
                    self.cpu.regs.set_a8(value);
                    self.cpu.update_nz8(value);
                } else {
                    let value = self.operand_read16(operand)?;
                    self.cpu.regs.a = value;
                    self.cpu.update_nz16(value);
                    cycles += 1;
                }
            }
            O::LdIndex(idx) => {
                if self.cpu.is_idx8() {
                    let value = self.operand_read8(operand)?;
                    self.cpu.set_index(idx, value as u16);
                } else {
                    let value = self.operand_read16(operand)?;
                    self.cpu.set_index(idx, value);
                    cycles += 1;
                }
            }
            O::Mvn | O::Mvp => {
                // reached only through the block-move step path
                return Err(StepError::Unimplemented(
                    "block move outside its addressing mode".into(),
                ));
            }
            O::Nop => {}
            O::Pea => {
                let target = self.target(operand)?;
                self.push16(target.addr)?;
            }
            O::Per => {
                let offset = self.displacement(operand)?;
                self.push16(self.cpu.regs.pc.addr.wrapping_add(offset as u16))?;
            }
            O::Pha => {
                if self.cpu.is_reg8() {
                    self.push8(self.cpu.regs.a8())?;
                } else {
                    self.push16(self.cpu.regs.a)?;
                    cycles += 1;
                }
            }
            O::Phb => self.push8(self.cpu.regs.db)?,
            O::Phd => self.push16(self.cpu.regs.dp)?,
            O::Phk => self.push8(self.cpu.regs.pc.bank)?,
            O::Php => self.push8(self.cpu.regs.status.0)?,
            O::PhIndex(idx) => {
                let value = self.cpu.regs.index(idx);
                if self.cpu.is_idx8() {
                    self.push8((value & 0xff) as u8)?;
                } else {
                    self.push16(value)?;
                    cycles += 1;
                }
            }
            O::Pla => {
                if self.cpu.is_reg8() {
                    let value = self.pull8()?;
                    self.cpu.regs.set_a8(value);
                    self.cpu.update_nz8(value);
                } else {
                    let value = self.pull16()?;
                    self.cpu.regs.a = value;
                    self.cpu.update_nz16(value);
                    cycles += 1;
                }
            }
            O::Plb => {
                let value = self.pull8()?;
                self.cpu.regs.db = value;
                self.cpu.update_nz8(value);
            }
            O::Pld => {
                let value = self.pull16()?;
                self.cpu.regs.dp = value;
                self.cpu.update_nz16(value);
            }
            O::Plp => {
                let value = self.pull8()?;
                self.cpu.set_flags(value);
            }
            O::PlIndex(idx) => {
                if self.cpu.is_idx8() {
                    let value = self.pull8()?;
                    self.cpu.set_index(idx, value as u16);
                } else {
                    let value = self.pull16()?;
                    self.cpu.set_index(idx, value);
                    cycles += 1;
                }
            }
            O::Rep => {
                let mask = self.operand_read8(operand)?;
                self.cpu.regs.status &= Status(!mask);
                self.cpu.update_status();
            }
            O::Sep => {
                let mask = self.operand_read8(operand)?;
                self.cpu.regs.status |= Status(mask);
                self.cpu.update_status();
            }
            O::Rti => {
                if !self.cpu.regs.is_emulation {
                    cycles += 1;
                }
                let flags = self.pull8()?;
                let native = !self.cpu.regs.is_emulation;
                self.cpu.set_flags(flags);
                self.cpu.regs.pc.addr = self.pull16()?;
                if native {
                    self.cpu.regs.pc.bank = self.pull8()?;
                }
                self.cpu.in_interrupt = false;
            }
            O::Rtl => {
                self.cpu.regs.pc.addr = self.pull16()?.wrapping_add(1);
                self.cpu.regs.pc.bank = self.pull8()?;
            }
            O::Rts => {
                self.cpu.regs.pc.addr = self.pull16()?.wrapping_add(1);
            }
            O::SetFlag { flag, value } => {
                self.cpu.regs.status.set_if(flag, value);
                self.cpu.update_status();
            }
            O::Sta => {
                if self.cpu.is_reg8() {
                    self.operand_write8(operand, self.cpu.regs.a8())?;
                } else {
                    self.operand_write16(operand, self.cpu.regs.a)?;
                    cycles += 1;
                }
            }
            O::StIndex(idx) => {
                let value = self.cpu.regs.index(idx);
                if self.cpu.is_idx8() {
                    self.operand_write8(operand, (value & 0xff) as u8)?;
                } else {
                    self.operand_write16(operand, value)?;
                    cycles += 1;
                }
            }
            O::Stz => {
                if self.cpu.is_reg8() {
                    self.operand_write8(operand, 0)?;
                } else {
                    self.operand_write16(operand, 0)?;
                    cycles += 1;
                }
            }
            O::Stp => self.cpu.halt = Halt::Stopped,
            O::Wai => self.cpu.halt = Halt::WaitingForInterrupt,
            O::Wdm => {
                return Err(StepError::Unimplemented("WDM (reserved opcode)".into()));
            }
            O::TaIndex(idx) => {
                if self.cpu.is_idx8() {
                    self.cpu.set_index(idx, self.cpu.regs.a8() as u16);
                } else {
                    self.cpu.set_index(idx, self.cpu.regs.a);
                }
            }
            O::Tcd => {
                self.cpu.regs.dp = self.cpu.regs.a;
                self.cpu.update_nz16(self.cpu.regs.a);
            }
            O::Tcs => {
                self.cpu.regs.sp = self.cpu.regs.a;
                self.cpu.update_status();
            }
            O::Tdc => {
                self.cpu.regs.a = self.cpu.regs.dp;
                self.cpu.update_nz16(self.cpu.regs.a);
            }
            O::Tsc => {
                self.cpu.regs.a = self.cpu.regs.sp;
                self.cpu.update_nz16(self.cpu.regs.a);
            }
            O::Tsx => {
                self.cpu.set_index(Index::X, self.cpu.regs.sp);
            }
            O::Txs => {
                self.cpu.regs.sp = self.cpu.regs.x;
                self.cpu.update_status();
            }
            O::TIndexA(idx) => {
                let value = self.cpu.regs.index(idx);
                if self.cpu.is_reg8() {
                    self.cpu.regs.set_a8((value & 0xff) as u8);
                    self.cpu.update_nz8((value & 0xff) as u8);
                } else {
                    self.cpu.regs.a = value;
                    self.cpu.update_nz16(value);
                }
            }
            O::TIndexIndex { from, to } => {
                self.cpu.set_index(to, self.cpu.regs.index(from));
            }
            O::Trb | O::Tsb => {
                if self.cpu.is_reg8() {
                    let value = self.operand_read8(operand)?;
                    let a = self.cpu.regs.a8();
                    self.cpu.regs.status.set_if(Status::ZERO, value & a == 0);
                    let result = if matches!(op, O::Trb) { value & !a } else { value | a };
                    self.operand_write8(operand, result)?;
                } else {
                    let value = self.operand_read16(operand)?;
                    let a = self.cpu.regs.a;
                    self.cpu.regs.status.set_if(Status::ZERO, value & a == 0);
                    let result = if matches!(op, O::Trb) { value & !a } else { value | a };
                    self.operand_write16(operand, result)?;
                    cycles += 2;
                }
            }
            O::Xba => {
                self.cpu.regs.a = self.cpu.regs.a.swap_bytes();
                self.cpu.update_nz8(self.cpu.regs.a8());
            }
            O::Xce => self.cpu.exchange_carry_emulation(),
        }
        Ok(cycles)
    }
}
