use std::ops::Range;

use crate::ast::*;
use crate::lexer::Token;

#[derive(Debug, thiserror::Error)]
#[error("Parse error at line {line}: {message}")]
pub struct ParseError {
    pub code: &'static str,
    pub line: usize,
    pub message: String,
}

type Result<T> = std::result::Result<T, ParseError>;

/// One source line worth of tokens.
struct Line {
    number: usize,
    tokens: Vec<Token>,
}

pub struct Parser {
    lines: Vec<Line>,
    pos: usize,
}

impl Parser {
    pub fn new(source: &str, tokens: Vec<(Token, Range<usize>)>) -> Self {
        let map = SourceMap::new(source);
        let mut lines = Vec::new();
        let mut current: Option<Line> = None;
        for (tok, range) in tokens {
            if tok == Token::Newline {
                lines.extend(current.take());
                continue;
            }
            current
                .get_or_insert_with(|| Line { number: map.line_of(range.start), tokens: Vec::new() })
                .tokens
                .push(tok);
        }
        lines.extend(current);
        Parser { lines, pos: 0 }
    }

    fn next_line(&mut self) -> Option<&Line> {
        let line = self.lines.get(self.pos);
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    // ---- Top-level parsing ----

    pub fn parse_program(&mut self) -> Result<Program> {
        let mut program = Program::default();
        while let Some(line) = self.next_line() {
            let header_line = line.number;
            let (name, nargs) = parse_header(line)?;
            let function = self.parse_function(name, nargs, header_line)?;
            let name = function.name.clone();
            if !program.push_function(function) {
                return Err(error("ASM-P008", header_line, format!("function '{name}' is defined twice")));
            }
        }
        Ok(program)
    }

    fn parse_function(&mut self, name: String, nargs: usize, header_line: usize) -> Result<Function> {
        let mut function = Function::new(name, nargs);
        let mut block: Option<(BasicBlock, usize)> = None;

        loop {
            let Some(line) = self.next_line() else {
                return Err(error(
                    "ASM-P009",
                    header_line,
                    format!("function '{}' is missing 'end {}'", function.name, function.name),
                ));
            };
            let number = line.number;
            match line.tokens.as_slice() {
                [Token::Ident(kw), Token::Ident(end_name)] if kw == "end" => {
                    if *end_name != function.name {
                        return Err(error(
                            "ASM-P010",
                            number,
                            format!("'end {end_name}' closes function '{}'", function.name),
                        ));
                    }
                    close_block(&mut function, block.take())?;
                    return Ok(function);
                }
                [Token::Label(label), Token::Colon] => {
                    let label = label.clone();
                    close_block(&mut function, block.take())?;
                    block = Some((BasicBlock { label, instrs: Vec::new() }, number));
                }
                tokens => {
                    let instr = parse_instr(tokens, number)?;
                    match block.as_mut() {
                        Some((b, _)) => b.instrs.push(instr),
                        None => {
                            return Err(error(
                                "ASM-P011",
                                number,
                                "instruction outside of a basic block".into(),
                            ));
                        }
                    }
                }
            }
        }
    }
}

/// Parse a whole program from its token stream.
pub fn parse(source: &str, tokens: Vec<(Token, Range<usize>)>) -> Result<Program> {
    Parser::new(source, tokens).parse_program()
}

fn error(code: &'static str, line: usize, message: String) -> ParseError {
    ParseError { code, line, message }
}

fn parse_header(line: &Line) -> Result<(String, usize)> {
    match line.tokens.as_slice() {
        [Token::Ident(kw), Token::Ident(name), Token::Int(n), Token::Colon] if kw == "start" => {
            let nargs = *n as usize;
            if *n > NUM_ARG_REGS as u64 {
                return Err(error(
                    "ASM-P002",
                    line.number,
                    format!("function '{name}' declares {n} arguments, at most {NUM_ARG_REGS} are supported"),
                ));
            }
            Ok((name.clone(), nargs))
        }
        _ => Err(error(
            "ASM-P001",
            line.number,
            "expected function header 'start <name> <nargs>:'".into(),
        )),
    }
}

fn close_block(function: &mut Function, block: Option<(BasicBlock, usize)>) -> Result<()> {
    let Some((block, label_line)) = block else {
        return Ok(());
    };
    match block.instrs.last() {
        None => {
            return Err(error("ASM-P012", label_line, format!("basic block '.{}' is empty", block.label)));
        }
        Some(last) if !last.opcode().is_terminator() => {
            return Err(error(
                "ASM-P013",
                last.line,
                format!("basic block '.{}' does not end with ret, br or switch", block.label),
            ));
        }
        Some(_) => {}
    }
    let label = block.label.clone();
    if !function.push_block(block) {
        return Err(error(
            "ASM-P014",
            label_line,
            format!("label '.{label}' is defined twice in function '{}'", function.name),
        ));
    }
    Ok(())
}

// ---- Instructions ----

fn parse_instr(tokens: &[Token], line: usize) -> Result<Instr> {
    let (dest, rest) = match tokens {
        [Token::Ident(reg), Token::Assign, rest @ ..] => {
            let reg = Reg::parse(reg)
                .ok_or_else(|| error("ASM-P003", line, format!("unknown register '{reg}'")))?;
            (Some(reg), rest)
        }
        _ => (None, tokens),
    };
    let Some((Token::Ident(mnemonic), operands)) = rest.split_first() else {
        return Err(error("ASM-P004", line, "expected an instruction".into()));
    };
    let mut ops = Operands { toks: operands, pos: 0, line, mnemonic };

    let needs_dest = || {
        dest.ok_or_else(|| error("ASM-P005", line, format!("'{mnemonic}' needs a destination register")))
    };
    let no_dest = || match dest {
        Some(_) => Err(error("ASM-P006", line, format!("'{mnemonic}' does not produce a value"))),
        None => Ok(()),
    };

    let kind = match mnemonic.as_str() {
        "ret" => {
            no_dest()?;
            let value = if ops.at_end() { None } else { Some(ops.operand()?) };
            InstrKind::Ret { value }
        }
        "br" => {
            no_dest()?;
            if ops.remaining() == 1 {
                InstrKind::BrUncond { target: ops.label()? }
            } else {
                InstrKind::BrCond { cond: ops.operand()?, if_true: ops.label()?, if_false: ops.label()? }
            }
        }
        "switch" => {
            no_dest()?;
            let selector = ops.operand()?;
            let mut cases = Vec::new();
            while ops.remaining() > 1 {
                let value = ops.int()?;
                cases.push((value, ops.label()?));
            }
            InstrKind::Switch { selector, cases, default: ops.label()? }
        }
        "malloc" => InstrKind::Malloc { dest: needs_dest()?, size: ops.operand()? },
        "free" => {
            no_dest()?;
            InstrKind::Free { ptr: ops.operand()? }
        }
        "load" | "aload" => InstrKind::Load {
            dest: needs_dest()?,
            size: ops.size()?,
            ptr: ops.operand()?,
            asynchronous: mnemonic == "aload",
        },
        "store" => {
            no_dest()?;
            InstrKind::Store { size: ops.size()?, value: ops.operand()?, ptr: ops.operand()? }
        }
        "sum" => {
            let dest = needs_dest()?;
            let mut operands = Vec::new();
            while ops.remaining() > 1 {
                operands.push(ops.operand()?);
            }
            if operands.is_empty() {
                return Err(error("ASM-P007", line, "'sum' needs at least one operand".into()));
            }
            InstrKind::Sum { dest, operands, width: ops.width()? }
        }
        "incr" | "decr" => InstrKind::Uop {
            dest: needs_dest()?,
            op: if mnemonic == "incr" { UopKind::Incr } else { UopKind::Decr },
            operand: ops.operand()?,
            width: ops.width()?,
        },
        "select" => InstrKind::Select {
            dest: needs_dest()?,
            cond: ops.operand()?,
            if_true: ops.operand()?,
            if_false: ops.operand()?,
        },
        "call" => {
            let callee = ops.ident()?;
            let mut args = Vec::new();
            while !ops.at_end() {
                args.push(ops.operand()?);
            }
            InstrKind::Call { dest, callee, args }
        }
        "assert_eq" => {
            no_dest()?;
            InstrKind::Assert { lhs: ops.operand()?, rhs: ops.operand()? }
        }
        "read" => InstrKind::Read { dest: needs_dest()? },
        "write" => {
            no_dest()?;
            InstrKind::Write { value: ops.operand()? }
        }
        other => match BopKind::from_name(other) {
            Some(op) => InstrKind::Bop {
                dest: needs_dest()?,
                op,
                lhs: ops.operand()?,
                rhs: ops.operand()?,
                width: ops.width()?,
            },
            None => return Err(error("ASM-P015", line, format!("unknown instruction '{other}'"))),
        },
    };
    ops.finish()?;
    Ok(Instr::new(kind, line))
}

/// Cursor over an instruction's operand tokens.
struct Operands<'a> {
    toks: &'a [Token],
    pos: usize,
    line: usize,
    mnemonic: &'a str,
}

impl Operands<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.toks.len()
    }

    fn remaining(&self) -> usize {
        self.toks.len().saturating_sub(self.pos)
    }

    fn next(&mut self, what: &str) -> Result<&Token> {
        let tok = self.toks.get(self.pos).ok_or_else(|| {
            error("ASM-P016", self.line, format!("'{}' expects {what}, got end of line", self.mnemonic))
        })?;
        self.pos += 1;
        Ok(tok)
    }

    fn unexpected(&self, what: &str, got: &Token) -> ParseError {
        error("ASM-P017", self.line, format!("'{}' expects {what}, got {got:?}", self.mnemonic))
    }

    fn operand(&mut self) -> Result<Operand> {
        let line = self.line;
        match self.next("an operand")?.clone() {
            Token::Int(c) => Ok(Operand::Const(c)),
            Token::Ident(name) => Reg::parse(&name)
                .map(Operand::Reg)
                .ok_or_else(|| error("ASM-P003", line, format!("unknown register '{name}'"))),
            other => Err(self.unexpected("an operand", &other)),
        }
    }

    fn label(&mut self) -> Result<String> {
        match self.next("a label")?.clone() {
            Token::Label(l) => Ok(l),
            other => Err(self.unexpected("a label", &other)),
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.next("a function name")?.clone() {
            Token::Ident(name) => Ok(name),
            other => Err(self.unexpected("a function name", &other)),
        }
    }

    fn int(&mut self) -> Result<u64> {
        match self.next("an integer")?.clone() {
            Token::Int(c) => Ok(c),
            other => Err(self.unexpected("an integer", &other)),
        }
    }

    fn size(&mut self) -> Result<AccessSize> {
        let n = self.int()?;
        AccessSize::from_bytes(n).ok_or_else(|| {
            error("ASM-P018", self.line, format!("invalid access size {n}, expected 1, 2, 4 or 8"))
        })
    }

    fn width(&mut self) -> Result<Width> {
        let n = self.int()?;
        Width::from_bits(n).ok_or_else(|| {
            error("ASM-P019", self.line, format!("invalid bit width {n}, expected 1, 8, 16, 32 or 64"))
        })
    }

    fn finish(&self) -> Result<()> {
        match self.toks.get(self.pos) {
            None => Ok(()),
            Some(tok) => Err(error(
                "ASM-P020",
                self.line,
                format!("unexpected {tok:?} after '{}' instruction", self.mnemonic),
            )),
        }
    }
}
