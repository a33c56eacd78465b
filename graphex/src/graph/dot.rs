use crate::Graph;
use petgraph::dot;
use petgraph::dot::Dot;
use petgraph::visit::EdgeRef;
use std::fmt::Debug;

impl<T: Debug> Graph<T> {
    /// DOT rendering of the graph for debugging.
    pub fn dot(&self) -> String {
        format!(
            "{:?}",
            Dot::with_attr_getters(
                &self.graph,
                &[dot::Config::EdgeNoLabel, dot::Config::NodeNoLabel],
                &|_, edge| {
                    let label = edge.weight().to_string();
                    format!("label = \"{}\"", label.escape_debug())
                },
                &|_, (key, payload)| {
                    let dbg_attr_format = format!("{payload:?}");
                    let dbg_attr_replaced = dbg_attr_format.escape_debug();
                    format!("label = \"{}|{dbg_attr_replaced}\"", key.index())
                }
            )
        )
    }
}

pub struct DotCollector {
    dot: String,
}

impl DotCollector {
    pub fn new() -> Self {
        DotCollector { dot: String::new() }
    }

    pub fn collect<T: Debug>(&mut self, graph: &Graph<T>) {
        if !self.dot.is_empty() {
            self.dot.push_str("\n---\n");
        }
        self.dot.push_str(&graph.dot());
    }

    pub fn finalize(&self) -> String {
        self.dot.clone()
    }
}

impl Default for DotCollector {
    fn default() -> Self {
        Self::new()
    }
}
