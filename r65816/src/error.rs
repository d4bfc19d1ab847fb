//! Failure taxonomy of the core
//!
//! Instruction-level failures ([`StepError`]) are recoverable: the step
//! loop rolls the program counter back to the instruction start and the
//! caller may inspect or correct state. Configuration failures
//! ([`ConfigError`]) are fatal to the session.

use crate::device::Addr24;
use thiserror::Error;

/// A memory access that violates a cell's protection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("read from invalid cell at {0}")]
    ReadInvalid(Addr24),
    #[error("read from write-only cell at {0}")]
    ReadWriteOnly(Addr24),
    #[error("write to invalid cell at {0}")]
    WriteInvalid(Addr24),
    #[error("write to read-only cell at {0}")]
    WriteReadOnly(Addr24),
    #[error("write to an immediate operand")]
    WriteImmediate,
}

/// Failure of a single decode-execute step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// The opcode, addressing mode or operator has no complete
    /// implementation. State may carry idempotent-safe partial effects;
    /// the program counter is rolled back to the instruction start.
    #[error("not implemented: {0}")]
    Unimplemented(String),
    #[error(transparent)]
    Access(#[from] Violation),
}

/// Fatal configuration failure, aborting the session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("program image of {len} bytes at {addr} exceeds the address space")]
    ImageOverflow { addr: Addr24, len: usize },
    #[error("missing reset vector")]
    MissingResetVector,
    #[error("cell at {0} is already mapped")]
    AlreadyMapped(Addr24),
    #[error("register already installed at {0}")]
    RegisterOverlap(Addr24),
    #[error("mirror origin at {0} is unmapped")]
    MirrorUnmapped(Addr24),
    #[error("opcode {opcode:#04x} is bound twice in the instruction table")]
    DuplicateOpcode { opcode: u8 },
    #[error("opcode {opcode:#04x} is missing from the instruction table")]
    MissingOpcode { opcode: u8 },
    #[error("opcode {opcode:#04x}: remark {remark} claimed by both the addressing mode and the operator")]
    RemarkConflict { opcode: u8, remark: u8 },
    #[error("opcode {opcode:#04x}: remark {remark} claimed by neither the addressing mode nor the operator")]
    RemarkUnclaimed { opcode: u8, remark: u8 },
}
