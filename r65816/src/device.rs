//! The emulated device: CPU state, owned address space, interrupt
//! vectors, breakpoints and the master cycle counter

use crate::{
    cpu::{Cpu, Halt, Status},
    error::{ConfigError, StepError, Violation},
    instr::InstructionSet,
    mem::Memory,
    timing::Cycles,
};
use std::collections::BTreeSet;

/// The 24-bit address type used
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Addr24 {
    pub bank: u8,
    pub addr: u16,
}

impl Addr24 {
    pub const fn new(bank: u8, addr: u16) -> Self {
        Self { bank, addr }
    }

    pub const fn to_linear(self) -> u32 {
        ((self.bank as u32) << 16) | self.addr as u32
    }

    pub const fn from_linear(linear: u32) -> Self {
        Self::new((linear >> 16) as u8, (linear & 0xffff) as u16)
    }

    /// Add an offset over the full 24-bit space (a carry out of the
    /// 16-bit address moves into the bank)
    pub const fn wrapping_add24(self, offset: u16) -> Self {
        Self::from_linear((self.to_linear().wrapping_add(offset as u32)) & 0xff_ffff)
    }
}

impl std::fmt::Display for Addr24 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:02x}:{:04x}", self.bank, self.addr)
    }
}

/// Values that can be fetched from the program stream
pub trait Data: std::fmt::Debug + Sized + Default + Clone + Copy {
    const SIZE: u16;
    fn from_bytes(bytes: &[u8]) -> Self;
}

impl Data for u8 {
    const SIZE: u16 = 1;
    fn from_bytes(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl Data for u16 {
    const SIZE: u16 = 2;
    fn from_bytes(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl Data for Addr24 {
    const SIZE: u16 = 3;
    fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(bytes[2], u16::from_le_bytes([bytes[0], bytes[1]]))
    }
}

/// The six interrupt/reset vectors of one processor personality
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Vectors {
    pub cop: u16,
    pub brk: u16,
    pub abort: u16,
    pub nmi: u16,
    pub reset: u16,
    pub irq: u16,
}

const NATIVE_VECTOR_BASE: u16 = 0xffe4;
const EMULATION_VECTOR_BASE: u16 = 0xfff4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VectorKind {
    Cop,
    Brk,
    Nmi,
    Irq,
}

/// Structure for emulating the 65816 based device
#[derive(Debug)]
pub struct Device {
    pub cpu: Cpu,
    pub(crate) mem: Memory,
    pub(crate) instructions: InstructionSet,
    pub(crate) native_vectors: Vectors,
    pub(crate) emulation_vectors: Vectors,
    pub(crate) breakpoints: BTreeSet<Addr24>,
    pub master_cycles: Cycles,
}

impl Device {
    /// Create a device with an empty address space.
    ///
    /// Fails only on an instruction-table construction defect.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            cpu: Cpu::new(),
            mem: Memory::new(),
            instructions: InstructionSet::build()?,
            native_vectors: Vectors::default(),
            emulation_vectors: Vectors::default(),
            breakpoints: BTreeSet::new(),
            master_cycles: 0,
        })
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    /// Extract the interrupt/reset vectors from the top page of bank
    /// zero and initialize the processor from the reset vector
    pub fn reset(&mut self) -> Result<(), ConfigError> {
        self.native_vectors = self.peek_vectors(NATIVE_VECTOR_BASE);
        self.emulation_vectors = self.peek_vectors(EMULATION_VECTOR_BASE);
        let reset = self.emulation_vectors.reset;
        if reset == 0x0000 || reset == 0xffff {
            return Err(ConfigError::MissingResetVector);
        }
        self.cpu = Cpu::new();
        self.cpu.regs.pc = Addr24::new(0, reset);
        self.master_cycles = 0;
        log::debug!("reset into 00:{:04x}", reset);
        Ok(())
    }

    fn peek_vectors(&self, base: u16) -> Vectors {
        let word = |offset: u16| {
            let low = self.mem.peek(Addr24::new(0, base + offset)).unwrap_or(0);
            let high = self
                .mem
                .peek(Addr24::new(0, base + offset + 1))
                .unwrap_or(0);
            u16::from_le_bytes([low, high])
        };
        Vectors {
            cop: word(0),
            brk: word(2),
            abort: word(4),
            nmi: word(6),
            reset: word(8),
            irq: word(10),
        }
    }

    pub(crate) const fn vectors(&self) -> &Vectors {
        if self.cpu.regs.is_emulation {
            &self.emulation_vectors
        } else {
            &self.native_vectors
        }
    }

    /// Fetch a value from the program counter memory region
    pub(crate) fn fetch<D: Data>(&mut self) -> Result<D, Violation> {
        let mut bytes = [0; 3];
        for byte in bytes.iter_mut().take(D::SIZE as usize) {
            *byte = self.mem.read(self.cpu.regs.pc)?;
            // yes, an overflow on addr does not carry the bank
            self.cpu.regs.pc.addr = self.cpu.regs.pc.addr.wrapping_add(1);
        }
        Ok(D::from_bytes(&bytes[..D::SIZE as usize]))
    }

    /// Push a byte on the stack
    pub(crate) fn push8(&mut self, val: u8) -> Result<(), Violation> {
        self.mem.write(Addr24::new(0, self.cpu.regs.sp), val)?;
        self.cpu.regs.sp = self.cpu.regs.sp.wrapping_sub(1);
        if self.cpu.regs.is_emulation {
            self.cpu.regs.sp = (self.cpu.regs.sp & 0xff) | 0x100
        }
        Ok(())
    }

    pub(crate) fn push16(&mut self, val: u16) -> Result<(), Violation> {
        let [low, high] = val.to_le_bytes();
        self.push8(high)?;
        self.push8(low)
    }

    /// Pull a byte from the stack
    pub(crate) fn pull8(&mut self) -> Result<u8, Violation> {
        self.cpu.regs.sp = self.cpu.regs.sp.wrapping_add(1);
        if self.cpu.regs.is_emulation {
            self.cpu.regs.sp = (self.cpu.regs.sp & 0xff) | 0x100
        }
        self.mem.read(Addr24::new(0, self.cpu.regs.sp))
    }

    pub(crate) fn pull16(&mut self) -> Result<u16, Violation> {
        let low = self.pull8()?;
        let high = self.pull8()?;
        Ok(u16::from_le_bytes([low, high]))
    }

    /// Enter an interrupt: push the return state and load the vector of
    /// the active personality
    pub(crate) fn interrupt(&mut self, kind: VectorKind) -> Result<(), StepError> {
        if !self.cpu.regs.is_emulation {
            self.push8(self.cpu.regs.pc.bank)?;
        }
        self.push16(self.cpu.regs.pc.addr)?;
        let mut flags = self.cpu.regs.status.0;
        if self.cpu.regs.is_emulation && kind == VectorKind::Brk {
            flags |= Status::BREAK.0;
        }
        self.push8(flags)?;
        self.cpu.regs.status |= Status::IRQ_DISABLE;
        self.cpu.regs.status &= !Status::DECIMAL;
        let vectors = self.vectors();
        let target = match kind {
            VectorKind::Cop => vectors.cop,
            VectorKind::Brk => vectors.brk,
            VectorKind::Nmi => vectors.nmi,
            VectorKind::Irq => vectors.irq,
        };
        self.cpu.in_interrupt = true;
        self.cpu.regs.pc = Addr24::new(0, target);
        log::trace!("interrupting into 00:{:04x}", target);
        Ok(())
    }

    /// Raise a non-maskable interrupt at an instruction boundary.
    /// Returns the cycles consumed by the interrupt sequence.
    pub fn nmi(&mut self) -> Result<Cycles, StepError> {
        if self.cpu.halt == Halt::WaitingForInterrupt {
            self.cpu.halt = Halt::Running;
        }
        self.interrupt(VectorKind::Nmi)?;
        let cycles = 8 - self.cpu.regs.is_emulation as Cycles;
        self.master_cycles += cycles;
        Ok(cycles)
    }

    /// Raise an interrupt request at an instruction boundary. Returns
    /// `None` when the interrupt-disable flag masks the request; a
    /// waiting processor still resumes in that case.
    pub fn irq(&mut self) -> Result<Option<Cycles>, StepError> {
        if self.cpu.halt == Halt::WaitingForInterrupt {
            self.cpu.halt = Halt::Running;
        }
        if self.cpu.regs.status.has(Status::IRQ_DISABLE) {
            return Ok(None);
        }
        self.interrupt(VectorKind::Irq)?;
        let cycles = 8 - self.cpu.regs.is_emulation as Cycles;
        self.master_cycles += cycles;
        Ok(Some(cycles))
    }

    pub fn add_breakpoint(&mut self, addr: Addr24) {
        self.breakpoints.insert(addr);
    }

    pub fn remove_breakpoint(&mut self, addr: Addr24) -> bool {
        self.breakpoints.remove(&addr)
    }

    pub fn clear_breakpoints(&mut self) {
        self.breakpoints.clear();
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = Addr24> + '_ {
        self.breakpoints.iter().copied()
    }

    /// The breakpoint hit by an instruction occupying `size` bytes from
    /// `start`. With `any_byte` false only the start address counts.
    pub(crate) fn hit_breakpoint(&self, start: Addr24, size: u8, any_byte: bool) -> Option<Addr24> {
        if self.breakpoints.is_empty() {
            return None;
        }
        let count = if any_byte { size as u16 } else { 1 };
        (0..count)
            .map(|i| Addr24::new(start.bank, start.addr.wrapping_add(i)))
            .find(|addr| self.breakpoints.contains(addr))
    }
}
