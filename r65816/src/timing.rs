//! Cycle bookkeeping and the outer run loop
//!
//! The run loop is cooperative and strictly sequential: instructions
//! never suspend mid-execution, and breakpoints and failures are only
//! observed at instruction boundaries. A failure converts into an
//! inspectable [`RunExit::Fault`] after at most one aborted instruction.

use crate::{
    cpu::Halt,
    device::{Addr24, Device},
    error::StepError,
    instr::Step,
};

pub type Cycles = u32;

/// Why [`Device::run`] returned control to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunExit {
    /// the next instruction would touch this breakpoint address
    Breakpoint(Addr24),
    /// an instruction failed; the program counter points back at it
    Fault(StepError),
    /// the processor shut itself down (STP/WAI)
    Halted(Halt),
    /// the cycle budget ran out
    BudgetExhausted,
}

/// A secondary clock domain advanced against the shared master cycle
/// counter at a fixed integer ratio (domain rate / master rate =
/// `num / den`). Domains run cooperatively: whichever is due first gets
/// the execution context next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockDomain {
    num: Cycles,
    den: Cycles,
    pub cycles: u64,
}

impl ClockDomain {
    pub const fn new(num: Cycles, den: Cycles) -> Self {
        Self {
            num,
            den,
            cycles: 0,
        }
    }

    /// Whether this domain has fallen behind the master counter and is
    /// due to run
    pub const fn is_due(&self, master_cycles: Cycles) -> bool {
        self.cycles * (self.den as u64) < master_cycles as u64 * self.num as u64
    }

    pub fn advance(&mut self, cycles: u64) {
        self.cycles += cycles;
    }
}

impl Device {
    /// Run instructions until a breakpoint, a fault, a halt, or the
    /// exhaustion of `budget` cycles.
    ///
    /// An instruction is stopped *before* execution when any byte it
    /// occupies lies on a breakpoint; use [`Device::step`] to move off a
    /// breakpoint.
    pub fn run(&mut self, budget: Cycles) -> RunExit {
        let limit = self.master_cycles.saturating_add(budget);
        loop {
            if self.cpu.halt != Halt::Running {
                return RunExit::Halted(self.cpu.halt);
            }
            if let Some(pending) = self.peek_instruction() {
                if let Some(bp) = self.hit_breakpoint(pending.addr, pending.size, true) {
                    return RunExit::Breakpoint(bp);
                }
            }
            match self.step() {
                Ok(Step::Complete(_)) | Ok(Step::Repeat) => (),
                Ok(Step::Halted(halt)) => return RunExit::Halted(halt),
                Err(err) => {
                    log::debug!("entering inspect mode: {err}");
                    return RunExit::Fault(err);
                }
            }
            if self.master_cycles >= limit {
                return RunExit::BudgetExhausted;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_domain_catches_up_at_its_ratio() {
        // one domain cycle for every three master cycles
        let mut domain = ClockDomain::new(1, 3);
        assert!(!domain.is_due(0));
        assert!(domain.is_due(1));
        domain.advance(1);
        assert!(!domain.is_due(3));
        assert!(domain.is_due(4));
        domain.advance(1);
        assert!(!domain.is_due(6));
        assert!(domain.is_due(7));
    }
}
