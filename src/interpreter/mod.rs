//! The cost-annotated execution engine.
//!
//! [`State::run`] walks the program from `main`, dispatching one instruction at a time. Each
//! function activation gets its own [`CostNode`]; a call recurses into [`State::execute`] with
//! the caller's node as parent, so the host call stack mirrors the interpreted one. Deeply
//! recursive programs can exhaust the host stack.
//!
//! Every failure is fatal: the first [`RuntimeError`] unwinds to the caller of `run` and no
//! partial results are reported.

pub mod console;
pub mod cost;
pub(crate) mod exec;
pub mod memory;
pub mod regfile;

use crate::ast::{Cursor, Function, InstrKind, Opcode, Program, Reg};
use crate::config::CostModel;
use crate::report::Report;

pub use console::Console;
pub use cost::{CostNode, InstLog, InstRow};
pub use memory::{Memory, MemoryFault};
pub use regfile::RegFile;

/// Why a run stopped. The Display text is the error message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Fault {
    #[error("missing main function")]
    MissingMain,
    #[error("missing first basic block")]
    MissingEntryBlock,
    #[error("branching to an undefined basic block '.{label}'")]
    UndefinedBlock { label: String },
    #[error("calling an undefined function '{name}'")]
    UndefinedFunction { name: String },
    #[error("calling with incorrect number of arguments: '{callee}' takes {expected}, got {got}")]
    ArityMismatch { callee: String, expected: usize, got: usize },
    #[error("reached the end of a basic block without a terminator")]
    MissingTerminator,
    #[error("accessing an invalid argument register arg{index} (function takes {nargs})")]
    InvalidArgRegister { index: u8, nargs: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("assertion failed: {lhs} != {rhs}")]
    AssertionFailed { lhs: u64, rhs: u64 },
    #[error("read past the end of input")]
    InputExhausted,
    #[error("malformed input '{token}'")]
    MalformedInput { token: String },
    #[error("i/o error: {0}")]
    Io(String),
    #[error("{opcode} is not a generic instruction")]
    NotGeneric { opcode: &'static str },
    #[error(transparent)]
    Memory(#[from] MemoryFault),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Runtime error at line {line}: {fault}")]
pub struct RuntimeError {
    /// Source line of the instruction being executed, 0 if none was.
    pub line: usize,
    pub fault: Fault,
}

impl RuntimeError {
    pub fn new(line: usize, fault: Fault) -> Self {
        RuntimeError { line, fault }
    }

    /// Adapter for `map_err`.
    fn at(line: usize) -> impl Fn(Fault) -> RuntimeError {
        move |fault| RuntimeError { line, fault }
    }
}

type Result<T> = std::result::Result<T, RuntimeError>;

/// Whole-run execution state: one register file, one memory and one instruction log shared
/// by every activation.
#[derive(Debug)]
pub struct State<'p> {
    program: &'p Program,
    costs: CostModel,
    regfile: RegFile,
    memory: Memory,
    console: Console,
    inst_log: InstLog,
    total_wait_cost: f64,
    call_tree: Option<CostNode>,
    error_line: usize,
    depth: usize,
}

impl<'p> State<'p> {
    pub fn new(program: &'p Program) -> Self {
        State {
            program,
            costs: CostModel::default(),
            regfile: RegFile::new(),
            memory: Memory::new(),
            console: Console::null(),
            inst_log: InstLog::default(),
            total_wait_cost: 0.0,
            call_tree: None,
            error_line: 0,
            depth: 0,
        }
    }

    pub fn with_costs(mut self, costs: CostModel) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    /// Execute `main` and return its result.
    pub fn run(&mut self) -> Result<u64> {
        let program = self.program;
        let main = program
            .get_function("main")
            .ok_or_else(|| RuntimeError::new(0, Fault::MissingMain))?;
        let result = self.execute(None, main)?;
        self.console.flush().map_err(RuntimeError::at(self.error_line))?;
        tracing::debug!(
            result,
            cost = self.cost(),
            instructions = self.inst_log.total_count(),
            "program finished"
        );
        Ok(result)
    }

    /// Total simulated cost of the run, 0 before `main` returns.
    pub fn cost(&self) -> f64 {
        self.call_tree.as_ref().map_or(0.0, CostNode::cost)
    }

    pub fn call_tree(&self) -> Option<&CostNode> {
        self.call_tree.as_ref()
    }

    pub fn inst_log(&self) -> &InstLog {
        &self.inst_log
    }

    pub fn total_wait_cost(&self) -> f64 {
        self.total_wait_cost
    }

    pub fn max_alloced_size(&self) -> u64 {
        self.memory.max_alloced_size()
    }

    pub fn regfile(&self) -> &RegFile {
        &self.regfile
    }

    /// Package the finished run. `None` until `run` has succeeded.
    pub fn report(&self, result: u64) -> Option<Report> {
        let call_tree = self.call_tree.clone()?;
        Some(Report {
            result,
            cost: call_tree.cost(),
            total_wait_cost: self.total_wait_cost,
            max_alloced_size: self.max_alloced_size(),
            call_tree,
            instructions: self.inst_log.rows(),
        })
    }

    fn update_cost_log(&mut self, opcode: Opcode, inst_cost: f64, wait_cost: f64) {
        self.inst_log.record(opcode, inst_cost);
        self.total_wait_cost += wait_cost;
    }

    fn resolve(function: &Function, label: &str, line: usize) -> Result<Cursor> {
        function
            .block(label)
            .ok_or_else(|| RuntimeError::new(line, Fault::UndefinedBlock { label: label.to_string() }))
    }

    /// Run one activation of `function` to completion.
    ///
    /// The activation's cost node becomes the run's call tree when `parent` is `None`;
    /// otherwise its total is added to `parent` and the node is appended to its callees.
    pub fn execute(&mut self, parent: Option<&mut CostNode>, function: &'p Function) -> Result<u64> {
        let program = self.program;
        let mut cost = CostNode::new(function.name.as_str());
        let mut at = function
            .first_block()
            .ok_or_else(|| RuntimeError::new(self.error_line, Fault::MissingEntryBlock))?;

        tracing::debug!(function = %function.name, depth = self.depth, "enter");

        loop {
            let instr = function
                .instr(at)
                .ok_or_else(|| RuntimeError::new(self.error_line, Fault::MissingTerminator))?;
            let line = instr.line;
            self.error_line = line;
            tracing::trace!(line, opcode = instr.opcode().name(), cost = cost.cost(), "dispatch");

            match &instr.kind {
                InstrKind::Ret { value } => {
                    let (ret, wait_cost) = match value {
                        Some(op) => self.regfile.operand(*op, cost.cost()).map_err(RuntimeError::at(line))?,
                        None => (0, 0.0),
                    };
                    cost.add_cost(self.costs.ret + wait_cost);
                    self.update_cost_log(Opcode::Ret, self.costs.ret, wait_cost);
                    tracing::debug!(function = %function.name, cost = cost.cost(), ret, "return");
                    match parent {
                        Some(parent) => {
                            parent.add_cost(cost.cost());
                            parent.set_callee(cost);
                        }
                        None => self.call_tree = Some(cost),
                    }
                    return Ok(ret);
                }
                InstrKind::BrUncond { target } => {
                    at = Self::resolve(function, target, line)?;
                    cost.add_cost(self.costs.br_uncond);
                    self.update_cost_log(Opcode::BrUncond, self.costs.br_uncond, 0.0);
                }
                InstrKind::BrCond { cond, if_true, if_false } => {
                    let (value, wait_cost) = self.regfile.operand(*cond, cost.cost()).map_err(RuntimeError::at(line))?;
                    let taken = value != 0;
                    at = Self::resolve(function, if taken { if_true.as_str() } else { if_false.as_str() }, line)?;
                    let inst_cost = if taken { self.costs.br_cond_true } else { self.costs.br_cond_false };
                    cost.add_cost(inst_cost + wait_cost);
                    self.update_cost_log(Opcode::BrCond, inst_cost, wait_cost);
                }
                InstrKind::Switch { selector, cases, default } => {
                    let (value, wait_cost) =
                        self.regfile.operand(*selector, cost.cost()).map_err(RuntimeError::at(line))?;
                    let target = cases
                        .iter()
                        .find(|(case, _)| *case == value)
                        .map_or(default, |(_, label)| label);
                    at = Self::resolve(function, target, line)?;
                    cost.add_cost(self.costs.switch + wait_cost);
                    self.update_cost_log(Opcode::Switch, self.costs.switch, wait_cost);
                }
                InstrKind::Call { dest, callee, args } => {
                    let target = program
                        .get_function(callee)
                        .ok_or_else(|| RuntimeError::new(line, Fault::UndefinedFunction { name: callee.clone() }))?;
                    let nargs = target.nargs;
                    if nargs != args.len() {
                        return Err(RuntimeError::new(
                            line,
                            Fault::ArityMismatch { callee: callee.clone(), expected: nargs, got: args.len() },
                        ));
                    }

                    let (values, wait_cost) =
                        self.regfile.operand_list(args, cost.cost()).map_err(RuntimeError::at(line))?;
                    let inst_cost = self.costs.call + nargs as f64 * self.costs.per_arg;
                    cost.add_cost(inst_cost + wait_cost);
                    self.update_cost_log(Opcode::Call, inst_cost, wait_cost);

                    let saved = self.regfile.clone();
                    self.regfile.set_nargs(nargs, cost.cost());
                    for (i, value) in values.into_iter().enumerate() {
                        self.regfile.write(Reg::Arg(i as u8 + 1), value).map_err(RuntimeError::at(line))?;
                    }

                    self.depth += 1;
                    let ret = self.execute(Some(&mut cost), target)?;
                    self.depth -= 1;

                    self.regfile = saved;
                    if let Some(dest) = dest {
                        self.regfile.write(*dest, ret).map_err(RuntimeError::at(line))?;
                    }
                    at.index += 1;
                }
                generic => {
                    let machine = exec::Machine {
                        regs: &mut self.regfile,
                        memory: &mut self.memory,
                        console: &mut self.console,
                        costs: &self.costs,
                    };
                    let (inst_cost, wait_cost) =
                        exec::exec(generic, cost.cost(), machine).map_err(RuntimeError::at(line))?;
                    cost.add_cost(inst_cost + wait_cost);
                    self.update_cost_log(generic.opcode(), inst_cost, wait_cost);
                    at.index += 1;
                }
            }
        }
    }
}

/// Run `program` from `main` with the given cost table and I/O channel.
pub fn run(program: &Program, costs: CostModel, console: Console) -> Result<Report> {
    let mut state = State::new(program).with_costs(costs).with_console(console);
    let result = state.run()?;
    // run() only succeeds once main has returned and recorded its node.
    state
        .report(result)
        .ok_or_else(|| RuntimeError::new(0, Fault::MissingMain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BasicBlock, Instr, Operand};
    use crate::interpreter::console::tests::SharedBuf;
    use std::io::Cursor;

    fn parse_program(source: &str) -> Program {
        crate::load(source).expect("program should parse")
    }

    fn run_str(source: &str) -> Report {
        let prog = parse_program(source);
        run(&prog, CostModel::default(), Console::null()).expect("program should run")
    }

    fn run_err(source: &str) -> RuntimeError {
        let prog = parse_program(source);
        run(&prog, CostModel::default(), Console::null()).expect_err("program should fail")
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn lone_return_costs_ret() {
        let report = run_str("start main 0:\n.entry:\n  ret 7\nend main\n");
        assert_eq!(report.result, 7);
        assert_close(report.cost, 1.0);
        assert!(report.call_tree.callees().is_empty());
        assert_eq!(report.total_wait_cost, 0.0);
    }

    #[test]
    fn register_return_has_no_stall() {
        let report = run_str("start main 0:\n.entry:\n  r1 = add 2 3 64\n  ret r1\nend main");
        assert_eq!(report.result, 5);
        assert_close(report.cost, 5.0 + 1.0);
    }

    #[test]
    fn call_with_two_arguments() {
        let src = "\
start f 2:
.entry:
  ret 5
end f

start main 0:
.entry:
  r1 = call f 1 2
  ret r1
end main
";
        let report = run_str(src);
        assert_eq!(report.result, 5);
        let callees = report.call_tree.callees();
        assert_eq!(callees.len(), 1);
        assert_eq!(callees[0].name(), "f");
        assert_close(callees[0].cost(), 1.0);
        // CALL + 2*PER_ARG, f's own ret, main's ret
        assert_close(report.cost, 2.0 + 2.0 + 1.0 + 1.0);
        assert_eq!(report.instructions[Opcode::Call.index()].count, 1);
        assert_close(report.instructions[Opcode::Call.index()].cost, 4.0);
    }

    #[test]
    fn arguments_land_in_arg_registers() {
        let src = "\
start sub 2:
.entry:
  r1 = sub arg1 arg2 64
  ret r1
end sub

start main 0:
.entry:
  r1 = call sub 10 3
  ret r1
end main
";
        assert_eq!(run_str(src).result, 7);
    }

    #[test]
    fn caller_registers_survive_call() {
        let src = "\
start clobber 0:
.entry:
  r1 = add 100 0 64
  r2 = add 200 0 64
  ret r2
end clobber

start main 0:
.entry:
  r1 = add 1 0 64
  r3 = call clobber
  r4 = add r1 r3 64
  ret r4
end main
";
        assert_eq!(run_str(src).result, 201);
    }

    #[test]
    fn call_only_touches_destination_register() {
        let prog = parse_program(
            "start f 0:\n.e:\n  r5 = add 9 9 64\n  ret 3\nend f\nstart main 0:\n.e:\n  r1 = add 1 0 64\n  r2 = call f\n  ret r1\nend main",
        );
        let f = prog.get_function("main").unwrap();
        let mut state = State::new(&prog);
        let mut before = RegFile::new();
        before.write(Reg::General(1), 1).unwrap();
        assert_eq!(state.execute(None, f).unwrap(), 1);
        before.write(Reg::General(2), 3).unwrap();
        assert_eq!(state.regfile(), &before);
    }

    #[test]
    fn loop_accumulates_branch_costs() {
        // Two trips through the loop body, then exit.
        let looped = "\
start main 0:
.entry:
  r1 = add 0 0 64
  br .body
.body:
  r1 = incr r1 64
  r2 = ult r1 2 64
  br r2 .again .exit
.again:
  br .body
.exit:
  ret r1
end main
";
        let report = run_str(looped);
        assert_eq!(report.result, 2);
        let body = 1.0 + 1.0; // incr + ult
        let expected = 5.0 + 1.0 // add, br .body
            + body + 6.0 + 1.0 // first trip: taken, br .body
            + body + 1.0 // second trip: not taken
            + 1.0; // ret
        assert_close(report.cost, expected);
        assert_eq!(report.instructions[Opcode::BrUncond.index()].count, 2);
        assert_close(report.instructions[Opcode::BrUncond.index()].cost, 2.0);
        assert_eq!(report.instructions[Opcode::BrCond.index()].count, 2);
        assert_close(report.instructions[Opcode::BrCond.index()].cost, 7.0);
    }

    #[test]
    fn switch_picks_case_or_default() {
        let src = "\
start pick 1:
.entry:
  switch arg1 1 .one 2 .two .other
.one:
  ret 10
.two:
  ret 20
.other:
  ret 99
end pick

start main 0:
.entry:
  r1 = call pick 2
  r2 = call pick 7
  r3 = add r1 r2 64
  ret r3
end main
";
        let report = run_str(src);
        assert_eq!(report.result, 119);
        assert_eq!(report.call_tree.callees().len(), 2);
        assert_close(report.call_tree.callees()[0].cost(), 1.2 + 1.0);
        assert_eq!(report.instructions[Opcode::Switch.index()].count, 2);
    }

    #[test]
    fn root_cost_is_sum_of_executed_costs() {
        let src = "\
start leaf 1:
.entry:
  r1 = mul arg1 2 64
  ret r1
end leaf

start mid 1:
.entry:
  r1 = call leaf arg1
  r2 = call leaf r1
  ret r2
end mid

start main 0:
.entry:
  r1 = call mid 3
  ret r1
end main
";
        let report = run_str(src);
        assert_eq!(report.result, 12);
        let leaf = 1.0 + 1.0;
        let mid = 2.0 * (3.0 + leaf) + 1.0;
        let main = 3.0 + mid + 1.0;
        assert_close(report.cost, main);
        let logged: f64 = report.instructions.iter().map(|r| r.cost).sum::<f64>() + report.total_wait_cost;
        assert_close(logged, report.cost);
        let mid_node = &report.call_tree.callees()[0];
        assert_close(mid_node.cost(), mid);
        assert_eq!(mid_node.callees().len(), 2);
        assert!(mid_node.callees().iter().all(|n| n.name() == "leaf" && n.callees().is_empty()));
    }

    #[test]
    fn stall_is_charged_and_logged_as_wait() {
        let src = "\
start main 0:
.entry:
  r1 = malloc 8
  store 8 5 r1
  r2 = aload 8 r1
  r3 = add r2 1 64
  ret r3
end main
";
        let report = run_str(src);
        assert_eq!(report.result, 6);
        // aload issued at 28, ready at 28 + 1 + 16 = 45, add reads at 29
        assert_close(report.total_wait_cost, 16.0);
        assert_close(report.cost, 16.0 + 12.0 + 1.0 + (5.0 + 16.0) + 1.0);
        assert_eq!(report.max_alloced_size, 8);
    }

    #[test]
    fn call_argument_setup_stalls() {
        let src = "\
start id 1:
.entry:
  ret arg1
end id

start main 0:
.entry:
  r1 = aload 8 0
  r2 = call id r1
  ret r2
end main
";
        let report = run_str(src);
        // aload at 0 is ready at 11, the call starts at 1
        assert_close(report.total_wait_cost, 10.0);
        assert_close(report.cost, 1.0 + (3.0 + 10.0) + 1.0 + 1.0);
    }

    // `r1 = aload 8 0` costs 1 and is ready at 11, so a reader at time 1 stalls for 10.
    #[test]
    fn conditional_branch_stalls_on_pending_load() {
        let src = "\
start main 0:
.entry:
  r1 = aload 8 0
  br r1 .a .b
.a:
  ret 1
.b:
  ret 2
end main
";
        let report = run_str(src);
        assert_eq!(report.result, 2);
        assert_close(report.cost, 13.0);
        assert_close(report.total_wait_cost, 10.0);
        assert_close(report.instructions[Opcode::BrCond.index()].cost, 1.0);
    }

    #[test]
    fn switch_stalls_on_pending_load() {
        let src = "\
start main 0:
.entry:
  r1 = aload 8 0
  switch r1 0 .a .b
.a:
  ret 1
.b:
  ret 2
end main
";
        let report = run_str(src);
        assert_eq!(report.result, 1);
        assert_close(report.cost, 13.2);
        assert_close(report.total_wait_cost, 10.0);
        assert_close(report.instructions[Opcode::Switch.index()].cost, 1.2);
    }

    #[test]
    fn return_stalls_on_pending_load() {
        let report = run_str("start main 0:\n.entry:\n  r1 = aload 8 0\n  ret r1\nend main\n");
        assert_eq!(report.result, 0);
        assert_close(report.cost, 12.0);
        assert_close(report.total_wait_cost, 10.0);
        assert_close(report.instructions[Opcode::Ret.index()].cost, 1.0);
    }

    #[test]
    fn callee_waits_only_for_remaining_sp_latency() {
        let src = "\
start f 0:
.entry:
  r1 = add sp 0 64
  ret r1
end f

start main 0:
.entry:
  sp = aload 8 0
  r1 = call f
  ret r1
end main
";
        let report = run_str(src);
        // sp is ready at 11 on main's clock; f starts at 3, so 8 units remain
        let f = &report.call_tree.callees()[0];
        assert_close(f.cost(), 5.0 + 8.0 + 1.0);
        assert_close(report.total_wait_cost, 8.0);
        assert_close(report.cost, 1.0 + 2.0 + 14.0 + 1.0);
    }

    #[test]
    fn rerun_is_identical() {
        let src = "start f 1:\n.e:\n  r1 = sdiv arg1 2 64\n  ret r1\nend f\nstart main 0:\n.e:\n  r1 = call f 9\n  ret r1\nend main";
        assert_eq!(run_str(src), run_str(src));
    }

    #[test]
    fn undefined_branch_target() {
        let err = run_err("start main 0:\n.entry:\n  r1 = add 1 1 64\n  br .nowhere\nend main");
        assert_eq!(err.line, 4);
        assert_eq!(err.fault, Fault::UndefinedBlock { label: "nowhere".into() });
        assert!(err.to_string().contains("branching to an undefined basic block"));
    }

    #[test]
    fn undefined_conditional_and_switch_targets() {
        let err = run_err("start main 0:\n.e:\n  br 1 .gone .e\nend main");
        assert_eq!(err.fault, Fault::UndefinedBlock { label: "gone".into() });
        let err = run_err("start main 0:\n.e:\n  switch 4 4 .gone .e\nend main");
        assert_eq!(err.fault, Fault::UndefinedBlock { label: "gone".into() });
        assert_eq!(err.line, 3);
    }

    #[test]
    fn undefined_function() {
        let err = run_err("start main 0:\n.e:\n  r1 = call nope\n  ret r1\nend main");
        assert_eq!(err.fault, Fault::UndefinedFunction { name: "nope".into() });
        assert_eq!(err.line, 3);
    }

    #[test]
    fn arity_mismatch_has_no_side_effects() {
        let prog = parse_program(
            "start f 2:\n.e:\n  ret 0\nend f\nstart main 0:\n.e:\n  r1 = add 4 0 64\n  r2 = call f 1 2 3\n  ret 0\nend main",
        );
        let mut state = State::new(&prog);
        let err = state.run().unwrap_err();
        assert_eq!(err.fault, Fault::ArityMismatch { callee: "f".into(), expected: 2, got: 3 });
        assert!(err.to_string().contains("calling with incorrect number of arguments"));
        assert_eq!(err.line, 8);
        assert_eq!(state.inst_log().count(Opcode::Call), 0);
        assert_eq!(state.regfile().read(Reg::General(1), 0.0).unwrap().0, 4);
        assert_eq!(state.regfile().nargs(), 0);
        assert!(state.call_tree().is_none());
    }

    #[test]
    fn missing_main() {
        let err = run_err("start f 0:\n.e:\n  ret 0\nend f");
        assert_eq!(err, RuntimeError::new(0, Fault::MissingMain));
    }

    #[test]
    fn missing_entry_block_points_at_call_site() {
        let err = run_err("start empty 0:\nend empty\nstart main 0:\n.e:\n  call empty\n  ret 0\nend main");
        assert_eq!(err.fault, Fault::MissingEntryBlock);
        assert_eq!(err.line, 5);
    }

    #[test]
    fn running_off_a_block_is_fatal() {
        let mut f = Function::new("main", 0);
        f.push_block(BasicBlock {
            label: "entry".into(),
            instrs: vec![Instr::new(InstrKind::Write { value: Operand::Const(1) }, 2)],
        });
        let mut prog = Program::default();
        prog.push_function(f);
        let err = run(&prog, CostModel::default(), Console::null()).unwrap_err();
        assert_eq!(err, RuntimeError::new(2, Fault::MissingTerminator));
    }

    #[test]
    fn invalid_argument_register() {
        let err = run_err("start f 1:\n.e:\n  ret arg2\nend f\nstart main 0:\n.e:\n  r1 = call f 1\n  ret r1\nend main");
        assert_eq!(err.fault, Fault::InvalidArgRegister { index: 2, nargs: 1 });
        assert_eq!(err.line, 3);
    }

    #[test]
    fn memory_faults_are_fatal() {
        let err = run_err("start main 0:\n.e:\n  r1 = malloc 8\n  free r1\n  free r1\n  ret 0\nend main");
        assert_eq!(err.line, 5);
        assert!(matches!(err.fault, Fault::Memory(MemoryFault::DoubleFree { .. })));
        let err = run_err("start main 0:\n.e:\n  r1 = malloc 8\n  free r1\n  r2 = load 8 r1\n  ret 0\nend main");
        assert!(matches!(err.fault, Fault::Memory(MemoryFault::UseAfterFree { .. })));
    }

    #[test]
    fn recursion_builds_nested_tree() {
        let src = "\
start fact 1:
.entry:
  r1 = ule arg1 1 64
  br r1 .base .rec
.base:
  ret 1
.rec:
  r2 = decr arg1 64
  r3 = call fact r2
  r4 = mul arg1 r3 64
  ret r4
end fact

start main 0:
.entry:
  r1 = call fact 5
  ret r1
end main
";
        let report = run_str(src);
        assert_eq!(report.result, 120);
        let mut depth = 0;
        let mut node = &report.call_tree;
        while let Some(child) = node.callees().first() {
            assert_eq!(child.name(), "fact");
            depth += 1;
            node = child;
        }
        assert_eq!(depth, 5);
    }

    #[test]
    fn io_round_trip() {
        let src = "start main 0:\n.e:\n  r1 = read\n  r2 = read\n  r3 = add r1 r2 64\n  write r3\n  ret r3\nend main";
        let prog = parse_program(src);
        let out = SharedBuf::default();
        let console = Console::new(Cursor::new("4 5"), out.clone());
        let report = run(&prog, CostModel::default(), console).unwrap();
        assert_eq!(report.result, 9);
        assert_eq!(out.text(), "9\n");
    }

    #[test]
    fn custom_cost_table() {
        let costs = CostModel { ret: 3.0, call: 10.0, per_arg: 0.0, ..CostModel::default() };
        let prog = parse_program("start f 1:\n.e:\n  ret 0\nend f\nstart main 0:\n.e:\n  call f 1\n  ret 0\nend main");
        let report = run(&prog, costs, Console::null()).unwrap();
        assert_close(report.cost, 10.0 + 3.0 + 3.0);
    }
}
