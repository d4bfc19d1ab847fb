//! A 65816/65C816 CPU core: decode, dispatch, execute, and cycle
//! accounting, with the memory cell model the chip's bus protection
//! semantics need.
//!
//! # Literature
//!
//! - the [super famicom wiki page](https://wiki.superfamicom.org/65816-reference)
//! - <https://www.westerndesigncenter.com/wdc/documentation/w65c816s.pdf>

pub mod addr;
pub mod cpu;
pub mod device;
pub mod error;
pub mod instr;
pub mod mem;
pub mod op;
pub mod timing;
