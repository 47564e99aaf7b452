use serde::Serialize;

use crate::interpreter::cost::render_table;
use crate::interpreter::{CostNode, InstRow};

/// Everything a finished run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub result: u64,
    /// Total simulated cost, the root activation's total.
    pub cost: f64,
    pub total_wait_cost: f64,
    pub max_alloced_size: u64,
    pub call_tree: CostNode,
    pub instructions: Vec<InstRow>,
}

impl Report {
    pub fn summary(&self) -> String {
        format!(
            "Returned: {}\nCost: {:.4}\nTotal wait cost: {:.4}\nMax alloced memory: {} bytes\n",
            self.result, self.cost, self.total_wait_cost, self.max_alloced_size
        )
    }

    pub fn instruction_table(&self) -> String {
        render_table(&self.instructions)
    }

    pub fn to_text(&self) -> String {
        format!(
            "{}\n== Call tree ==\n{}\n== Instructions ==\n{}",
            self.summary(),
            self.call_tree.render(""),
            self.instruction_table()
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
