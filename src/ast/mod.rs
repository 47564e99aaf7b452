use std::collections::HashMap;

use serde::Serialize;

pub mod source_map;
pub use source_map::SourceMap;

// ---- Span infrastructure ----

/// Byte range within source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const UNKNOWN: Span = Span { start: 0, end: 0 };
}

// ---- Registers and operands ----

pub const NUM_GENERAL_REGS: usize = 32;
pub const NUM_ARG_REGS: usize = 16;

/// A virtual register: `r1`..`r32`, `arg1`..`arg16` or `sp`. Indices are 1-based like the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Reg {
    General(u8),
    Arg(u8),
    Sp,
}

impl Reg {
    /// Parse a register name, rejecting out-of-range indices.
    pub fn parse(name: &str) -> Option<Reg> {
        if name == "sp" {
            return Some(Reg::Sp);
        }
        let (digits, max, make): (&str, usize, fn(u8) -> Reg) =
            if let Some(d) = name.strip_prefix("arg") {
                (d, NUM_ARG_REGS, Reg::Arg)
            } else if let Some(d) = name.strip_prefix('r') {
                (d, NUM_GENERAL_REGS, Reg::General)
            } else {
                return None;
            };
        if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let idx: usize = digits.parse().ok()?;
        (1..=max).contains(&idx).then(|| make(idx as u8))
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reg::General(i) => write!(f, "r{i}"),
            Reg::Arg(i) => write!(f, "arg{i}"),
            Reg::Sp => write!(f, "sp"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operand {
    Reg(Reg),
    Const(u64),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{r}"),
            Operand::Const(c) => write!(f, "{c}"),
        }
    }
}

/// Byte size of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessSize {
    B1 = 1,
    B2 = 2,
    B4 = 4,
    B8 = 8,
}

impl AccessSize {
    pub fn from_bytes(n: u64) -> Option<AccessSize> {
        match n {
            1 => Some(AccessSize::B1),
            2 => Some(AccessSize::B2),
            4 => Some(AccessSize::B4),
            8 => Some(AccessSize::B8),
            _ => None,
        }
    }

    pub fn bytes(self) -> u64 {
        self as u64
    }
}

/// Bit width of an arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Width {
    W1 = 1,
    W8 = 8,
    W16 = 16,
    W32 = 32,
    W64 = 64,
}

impl Width {
    pub fn from_bits(n: u64) -> Option<Width> {
        match n {
            1 => Some(Width::W1),
            8 => Some(Width::W8),
            16 => Some(Width::W16),
            32 => Some(Width::W32),
            64 => Some(Width::W64),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        self as u32
    }

    pub fn mask(self) -> u64 {
        match self {
            Width::W64 => u64::MAX,
            w => (1u64 << w.bits()) - 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BopKind {
    // arithmetic
    Udiv,
    Sdiv,
    Urem,
    Srem,
    Mul,
    // logical
    Shl,
    Lshr,
    Ashr,
    And,
    Or,
    Xor,
    Add,
    Sub,
    // comparisons
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl BopKind {
    pub fn from_name(name: &str) -> Option<BopKind> {
        use BopKind::*;
        Some(match name {
            "udiv" => Udiv,
            "sdiv" => Sdiv,
            "urem" => Urem,
            "srem" => Srem,
            "mul" => Mul,
            "shl" => Shl,
            "lshr" => Lshr,
            "ashr" => Ashr,
            "and" => And,
            "or" => Or,
            "xor" => Xor,
            "add" => Add,
            "sub" => Sub,
            "eq" => Eq,
            "ne" => Ne,
            "ugt" => Ugt,
            "uge" => Uge,
            "ult" => Ult,
            "ule" => Ule,
            "sgt" => Sgt,
            "sge" => Sge,
            "slt" => Slt,
            "sle" => Sle,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UopKind {
    Incr,
    Decr,
}

// ---- Instructions ----

/// Opcode tags. The discriminant doubles as the instruction log index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Opcode {
    // terminators
    Ret,
    BrUncond,
    BrCond,
    Switch,
    // memory
    Malloc,
    Free,
    Load,
    Store,
    // arithmetic
    Bop,
    Sum,
    Uop,
    Select,
    // other
    Call,
    Assert,
    Read,
    Write,
}

impl Opcode {
    pub const COUNT: usize = 16;

    pub const ALL: [Opcode; Opcode::COUNT] = [
        Opcode::Ret,
        Opcode::BrUncond,
        Opcode::BrCond,
        Opcode::Switch,
        Opcode::Malloc,
        Opcode::Free,
        Opcode::Load,
        Opcode::Store,
        Opcode::Bop,
        Opcode::Sum,
        Opcode::Uop,
        Opcode::Select,
        Opcode::Call,
        Opcode::Assert,
        Opcode::Read,
        Opcode::Write,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Row label used in the instruction table.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Ret => "Ret",
            Opcode::BrUncond => "BrUncond",
            Opcode::BrCond => "BrCond",
            Opcode::Switch => "Switch",
            Opcode::Malloc => "Malloc",
            Opcode::Free => "Free",
            Opcode::Load => "Load",
            Opcode::Store => "Store",
            Opcode::Bop => "BinaryOp",
            Opcode::Sum => "Sum",
            Opcode::Uop => "UnaryOp",
            Opcode::Select => "Select",
            Opcode::Call => "Call",
            Opcode::Assert => "Assert",
            Opcode::Read => "Read",
            Opcode::Write => "Write",
        }
    }

    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Ret | Opcode::BrUncond | Opcode::BrCond | Opcode::Switch)
    }
}

/// One instruction form per variant, carrying only what that form needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InstrKind {
    /// `ret [val]`
    Ret { value: Option<Operand> },
    /// `br .label`
    BrUncond { target: String },
    /// `br cond .t .f`
    BrCond { cond: Operand, if_true: String, if_false: String },
    /// `switch sel v1 .l1 v2 .l2 ... .default`
    Switch { selector: Operand, cases: Vec<(u64, String)>, default: String },
    /// `r = malloc size`
    Malloc { dest: Reg, size: Operand },
    /// `free ptr`
    Free { ptr: Operand },
    /// `r = load size ptr` or `r = aload size ptr`
    Load { dest: Reg, size: AccessSize, ptr: Operand, asynchronous: bool },
    /// `store size val ptr`
    Store { size: AccessSize, value: Operand, ptr: Operand },
    /// `r = <bop> a b width`
    Bop { dest: Reg, op: BopKind, lhs: Operand, rhs: Operand, width: Width },
    /// `r = sum a b ... width`
    Sum { dest: Reg, operands: Vec<Operand>, width: Width },
    /// `r = incr a width` / `r = decr a width`
    Uop { dest: Reg, op: UopKind, operand: Operand, width: Width },
    /// `r = select cond a b`
    Select { dest: Reg, cond: Operand, if_true: Operand, if_false: Operand },
    /// `[r =] call f args...`
    Call { dest: Option<Reg>, callee: String, args: Vec<Operand> },
    /// `assert_eq a b`
    Assert { lhs: Operand, rhs: Operand },
    /// `r = read`
    Read { dest: Reg },
    /// `write val`
    Write { value: Operand },
}

impl InstrKind {
    pub fn opcode(&self) -> Opcode {
        match self {
            InstrKind::Ret { .. } => Opcode::Ret,
            InstrKind::BrUncond { .. } => Opcode::BrUncond,
            InstrKind::BrCond { .. } => Opcode::BrCond,
            InstrKind::Switch { .. } => Opcode::Switch,
            InstrKind::Malloc { .. } => Opcode::Malloc,
            InstrKind::Free { .. } => Opcode::Free,
            InstrKind::Load { .. } => Opcode::Load,
            InstrKind::Store { .. } => Opcode::Store,
            InstrKind::Bop { .. } => Opcode::Bop,
            InstrKind::Sum { .. } => Opcode::Sum,
            InstrKind::Uop { .. } => Opcode::Uop,
            InstrKind::Select { .. } => Opcode::Select,
            InstrKind::Call { .. } => Opcode::Call,
            InstrKind::Assert { .. } => Opcode::Assert,
            InstrKind::Read { .. } => Opcode::Read,
            InstrKind::Write { .. } => Opcode::Write,
        }
    }

    /// Destination register, where the form has one.
    pub fn lhs(&self) -> Option<Reg> {
        match self {
            InstrKind::Malloc { dest, .. }
            | InstrKind::Load { dest, .. }
            | InstrKind::Bop { dest, .. }
            | InstrKind::Sum { dest, .. }
            | InstrKind::Uop { dest, .. }
            | InstrKind::Select { dest, .. }
            | InstrKind::Read { dest } => Some(*dest),
            InstrKind::Call { dest, .. } => *dest,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instr {
    pub kind: InstrKind,
    /// 1-based source line.
    pub line: usize,
}

impl Instr {
    pub fn new(kind: InstrKind, line: usize) -> Self {
        Instr { kind, line }
    }

    pub fn opcode(&self) -> Opcode {
        self.kind.opcode()
    }
}

// ---- Program graph ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicBlock {
    pub label: String,
    pub instrs: Vec<Instr>,
}

/// Position of an instruction inside a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub block: usize,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub name: String,
    pub nargs: usize,
    pub blocks: Vec<BasicBlock>,
    #[serde(skip)]
    labels: HashMap<String, usize>,
}

impl Function {
    pub fn new(name: impl Into<String>, nargs: usize) -> Self {
        Function { name: name.into(), nargs, blocks: Vec::new(), labels: HashMap::new() }
    }

    /// Append a block. Returns false if the label is already taken.
    pub fn push_block(&mut self, block: BasicBlock) -> bool {
        if self.labels.contains_key(&block.label) {
            return false;
        }
        self.labels.insert(block.label.clone(), self.blocks.len());
        self.blocks.push(block);
        true
    }

    pub fn first_block(&self) -> Option<Cursor> {
        self.blocks
            .first()
            .filter(|b| !b.instrs.is_empty())
            .map(|_| Cursor { block: 0, index: 0 })
    }

    pub fn block(&self, label: &str) -> Option<Cursor> {
        let block = *self.labels.get(label)?;
        (!self.blocks[block].instrs.is_empty()).then_some(Cursor { block, index: 0 })
    }

    pub fn instr(&self, at: Cursor) -> Option<&Instr> {
        self.blocks.get(at.block)?.instrs.get(at.index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Program {
    pub functions: Vec<Function>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Program {
    /// Add a function. Returns false if the name is already taken.
    pub fn push_function(&mut self, function: Function) -> bool {
        if self.index.contains_key(&function.name) {
            return false;
        }
        self.index.insert(function.name.clone(), self.functions.len());
        self.functions.push(function);
        true
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.index.get(name).map(|&i| &self.functions[i])
    }
}
