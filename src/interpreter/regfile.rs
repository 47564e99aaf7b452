use crate::ast::{NUM_ARG_REGS, NUM_GENERAL_REGS, Operand, Reg};

use super::Fault;
use super::memory::STACK_TOP;

/// A register value and the activation-relative time it becomes readable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Slot {
    value: u64,
    ready_at: f64,
}

/// Register state of the running activation.
///
/// Saved and restored around calls by plain cloning. Argument registers beyond `nargs` are
/// not part of the activation and fault on access.
#[derive(Debug, Clone, PartialEq)]
pub struct RegFile {
    general: [Slot; NUM_GENERAL_REGS],
    args: [Slot; NUM_ARG_REGS],
    sp: Slot,
    nargs: usize,
}

impl Default for RegFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegFile {
    pub fn new() -> Self {
        RegFile {
            general: [Slot::default(); NUM_GENERAL_REGS],
            args: [Slot::default(); NUM_ARG_REGS],
            sp: Slot { value: STACK_TOP, ready_at: 0.0 },
            nargs: 0,
        }
    }

    pub fn nargs(&self) -> usize {
        self.nargs
    }

    /// Prepare a fresh view for a callee taking `nargs` arguments.
    ///
    /// `sp` carries over. Its ready time is moved from the caller's clock, which reads `now`
    /// at the call, onto the callee's clock, which starts at 0.
    pub fn set_nargs(&mut self, nargs: usize, now: f64) {
        self.general = [Slot::default(); NUM_GENERAL_REGS];
        self.args = [Slot::default(); NUM_ARG_REGS];
        self.sp.ready_at = (self.sp.ready_at - now).max(0.0);
        self.nargs = nargs.min(NUM_ARG_REGS);
    }

    fn slot(&self, reg: Reg) -> Result<&Slot, Fault> {
        match reg {
            Reg::General(i) => Ok(&self.general[i as usize - 1]),
            Reg::Arg(i) if (i as usize) <= self.nargs => Ok(&self.args[i as usize - 1]),
            Reg::Arg(i) => Err(Fault::InvalidArgRegister { index: i, nargs: self.nargs }),
            Reg::Sp => Ok(&self.sp),
        }
    }

    fn slot_mut(&mut self, reg: Reg) -> Result<&mut Slot, Fault> {
        match reg {
            Reg::General(i) => Ok(&mut self.general[i as usize - 1]),
            Reg::Arg(i) if (i as usize) <= self.nargs => Ok(&mut self.args[i as usize - 1]),
            Reg::Arg(i) => Err(Fault::InvalidArgRegister { index: i, nargs: self.nargs }),
            Reg::Sp => Ok(&mut self.sp),
        }
    }

    /// Read a register at time `now`, returning its value and how long the reader stalls.
    pub fn read(&self, reg: Reg, now: f64) -> Result<(u64, f64), Fault> {
        let slot = self.slot(reg)?;
        Ok((slot.value, (slot.ready_at - now).max(0.0)))
    }

    pub fn write(&mut self, reg: Reg, value: u64) -> Result<(), Fault> {
        self.write_at(reg, value, 0.0)
    }

    /// Write a value that only becomes readable at `ready_at`.
    pub fn write_at(&mut self, reg: Reg, value: u64, ready_at: f64) -> Result<(), Fault> {
        *self.slot_mut(reg)? = Slot { value, ready_at };
        Ok(())
    }

    pub fn operand(&self, op: Operand, now: f64) -> Result<(u64, f64), Fault> {
        match op {
            Operand::Const(c) => Ok((c, 0.0)),
            Operand::Reg(r) => self.read(r, now),
        }
    }

    /// Read a fixed set of operands. The stall is the longest wait among them.
    pub fn operands<const N: usize>(&self, ops: [Operand; N], now: f64) -> Result<([u64; N], f64), Fault> {
        let mut values = [0u64; N];
        let mut stall = 0.0f64;
        for (slot, op) in values.iter_mut().zip(ops) {
            let (v, s) = self.operand(op, now)?;
            *slot = v;
            stall = stall.max(s);
        }
        Ok((values, stall))
    }

    pub fn operand_list(&self, ops: &[Operand], now: f64) -> Result<(Vec<u64>, f64), Fault> {
        let mut stall = 0.0f64;
        let values = ops
            .iter()
            .map(|&op| {
                let (v, s) = self.operand(op, now)?;
                stall = stall.max(s);
                Ok(v)
            })
            .collect::<Result<Vec<_>, Fault>>()?;
        Ok((values, stall))
    }
}
