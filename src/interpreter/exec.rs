//! Effects and costs of the non-control-flow instructions.

use crate::ast::{BopKind, InstrKind, UopKind, Width};
use crate::config::CostModel;

use super::Fault;
use super::console::Console;
use super::memory::{Memory, Region};
use super::regfile::RegFile;

/// Machine state an instruction may touch.
pub(crate) struct Machine<'a> {
    pub regs: &'a mut RegFile,
    pub memory: &'a mut Memory,
    pub console: &'a mut Console,
    pub costs: &'a CostModel,
}

/// Execute one generic instruction at activation time `now`.
/// Returns `(base_cost, stall_cost)`.
pub(crate) fn exec(kind: &InstrKind, now: f64, m: Machine<'_>) -> Result<(f64, f64), Fault> {
    let costs = m.costs;
    match kind {
        InstrKind::Malloc { dest, size } => {
            let (size, stall) = m.regs.operand(*size, now)?;
            let addr = m.memory.malloc(size)?;
            m.regs.write(*dest, addr)?;
            Ok((costs.malloc, stall))
        }
        InstrKind::Free { ptr } => {
            let (ptr, stall) = m.regs.operand(*ptr, now)?;
            m.memory.free(ptr)?;
            Ok((costs.free, stall))
        }
        InstrKind::Load { dest, size, ptr, asynchronous } => {
            let (addr, stall) = m.regs.operand(*ptr, now)?;
            let (value, region) = m.memory.load(addr, *size)?;
            if *asynchronous {
                let wait = match region {
                    Region::Stack => costs.wait_stack,
                    Region::Heap => costs.wait_heap,
                };
                m.regs.write_at(*dest, value, now + stall + costs.aload + wait)?;
                Ok((costs.aload, stall))
            } else {
                m.regs.write(*dest, value)?;
                Ok((region_cost(costs, region), stall))
            }
        }
        InstrKind::Store { size, value, ptr } => {
            let ([value, addr], stall) = m.regs.operands([*value, *ptr], now)?;
            let region = m.memory.store(addr, *size, value)?;
            Ok((region_cost(costs, region), stall))
        }
        InstrKind::Bop { dest, op, lhs, rhs, width } => {
            let ([a, b], stall) = m.regs.operands([*lhs, *rhs], now)?;
            m.regs.write(*dest, eval_bop(*op, a, b, *width)?)?;
            Ok((bop_cost(costs, *op), stall))
        }
        InstrKind::Sum { dest, operands, width } => {
            let (values, stall) = m.regs.operand_list(operands, now)?;
            let total = values.iter().fold(0u64, |acc, v| acc.wrapping_add(v & width.mask()));
            m.regs.write(*dest, total & width.mask())?;
            Ok((costs.sum, stall))
        }
        InstrKind::Uop { dest, op, operand, width } => {
            let (v, stall) = m.regs.operand(*operand, now)?;
            let v = v & width.mask();
            let result = match op {
                UopKind::Incr => v.wrapping_add(1),
                UopKind::Decr => v.wrapping_sub(1),
            };
            m.regs.write(*dest, result & width.mask())?;
            Ok((costs.uop, stall))
        }
        InstrKind::Select { dest, cond, if_true, if_false } => {
            let ([c, t, f], stall) = m.regs.operands([*cond, *if_true, *if_false], now)?;
            m.regs.write(*dest, if c != 0 { t } else { f })?;
            Ok((costs.ternary, stall))
        }
        InstrKind::Assert { lhs, rhs } => {
            let ([a, b], stall) = m.regs.operands([*lhs, *rhs], now)?;
            if a != b {
                return Err(Fault::AssertionFailed { lhs: a, rhs: b });
            }
            Ok((costs.assert, stall))
        }
        InstrKind::Read { dest } => {
            let value = m.console.read_u64()?;
            m.regs.write(*dest, value)?;
            Ok((costs.read, 0.0))
        }
        InstrKind::Write { value } => {
            let (v, stall) = m.regs.operand(*value, now)?;
            m.console.write_u64(v)?;
            Ok((costs.write, stall))
        }
        InstrKind::Ret { .. }
        | InstrKind::BrUncond { .. }
        | InstrKind::BrCond { .. }
        | InstrKind::Switch { .. }
        | InstrKind::Call { .. } => Err(Fault::NotGeneric { opcode: kind.opcode().name() }),
    }
}

fn region_cost(costs: &CostModel, region: Region) -> f64 {
    match region {
        Region::Stack => costs.stack,
        Region::Heap => costs.heap,
    }
}

pub(crate) fn bop_cost(costs: &CostModel, op: BopKind) -> f64 {
    use BopKind::*;
    match op {
        Udiv | Sdiv | Urem | Srem | Mul => costs.muldiv,
        Shl | Lshr | Ashr | And | Or | Xor => costs.logical,
        Add | Sub => costs.addsub,
        Eq | Ne | Ugt | Uge | Ult | Ule | Sgt | Sge | Slt | Sle => costs.comp,
    }
}

/// Sign-extend the low `bits` of `v`.
fn sext(v: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((v << shift) as i64) >> shift
}

/// Evaluate a binary operation on `width`-bit operands. Comparisons yield 0 or 1.
pub(crate) fn eval_bop(op: BopKind, a: u64, b: u64, width: Width) -> Result<u64, Fault> {
    use BopKind::*;
    let mask = width.mask();
    let bits = width.bits();
    let (a, b) = (a & mask, b & mask);
    let (sa, sb) = (sext(a, bits), sext(b, bits));
    let value = match op {
        Udiv | Urem | Sdiv | Srem if b == 0 => return Err(Fault::DivisionByZero),
        Udiv => a / b,
        Urem => a % b,
        Sdiv => sa.wrapping_div(sb) as u64,
        Srem => sa.wrapping_rem(sb) as u64,
        Mul => a.wrapping_mul(b),
        Shl if b >= bits as u64 => 0,
        Shl => a << b,
        Lshr if b >= bits as u64 => 0,
        Lshr => a >> b,
        Ashr => (sa >> b.min(bits as u64 - 1)) as u64,
        And => a & b,
        Or => a | b,
        Xor => a ^ b,
        Add => a.wrapping_add(b),
        Sub => a.wrapping_sub(b),
        Eq => return Ok((a == b) as u64),
        Ne => return Ok((a != b) as u64),
        Ugt => return Ok((a > b) as u64),
        Uge => return Ok((a >= b) as u64),
        Ult => return Ok((a < b) as u64),
        Ule => return Ok((a <= b) as u64),
        Sgt => return Ok((sa > sb) as u64),
        Sge => return Ok((sa >= sb) as u64),
        Slt => return Ok((sa < sb) as u64),
        Sle => return Ok((sa <= sb) as u64),
    };
    Ok(value & mask)
}
