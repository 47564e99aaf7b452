use serde::Serialize;

use crate::ast::Opcode;

/// Cost accumulated by one function activation, with its callees in call order.
///
/// `cost` already includes each callee's total: a returning callee adds its own total into
/// the caller. The callee list exists only for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostNode {
    name: String,
    cost: f64,
    callees: Vec<CostNode>,
}

impl CostNode {
    pub fn new(name: impl Into<String>) -> Self {
        CostNode { name: name.into(), cost: 0.0, callees: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn callees(&self) -> &[CostNode] {
        &self.callees
    }

    pub fn add_cost(&mut self, cost: f64) {
        self.cost += cost;
    }

    pub fn set_callee(&mut self, callee: CostNode) {
        self.callees.push(callee);
    }

    /// Depth-first rendering, one `name: cost` line per activation.
    pub fn render(&self, indent: &str) -> String {
        let mut out = String::new();
        self.render_into(&mut out, indent);
        out
    }

    fn render_into(&self, out: &mut String, indent: &str) {
        out.push_str(&format!("{indent}{}: {:.4}\n", self.name, self.cost));
        let nested = format!("{indent}| ");
        for callee in &self.callees {
            callee.render_into(out, &nested);
        }
    }
}

impl std::fmt::Display for CostNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(""))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstRow {
    pub name: &'static str,
    pub count: u64,
    pub cost: f64,
}

/// Per-opcode invocation counts and summed base costs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstLog {
    counts: [u64; Opcode::COUNT],
    costs: [f64; Opcode::COUNT],
}

impl InstLog {
    pub fn record(&mut self, opcode: Opcode, base_cost: f64) {
        self.counts[opcode.index()] += 1;
        self.costs[opcode.index()] += base_cost;
    }

    pub fn count(&self, opcode: Opcode) -> u64 {
        self.counts[opcode.index()]
    }

    pub fn cost(&self, opcode: Opcode) -> f64 {
        self.costs[opcode.index()]
    }

    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn rows(&self) -> Vec<InstRow> {
        Opcode::ALL
            .iter()
            .map(|&op| InstRow { name: op.name(), count: self.count(op), cost: self.cost(op) })
            .collect()
    }

    pub fn to_table(&self) -> String {
        render_table(&self.rows())
    }
}

/// Tab-separated instruction table, costs to four decimals.
pub fn render_table(rows: &[InstRow]) -> String {
    let mut out = String::from("Instruction\tCount\tCost\n");
    for row in rows {
        out.push_str(&format!("{}\t{}\t{:.4}\n", row.name, row.count, row.cost));
    }
    out
}
