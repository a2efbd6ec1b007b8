//! Plan trees: scans, binary equi-joins, and their output schemas.
//!
//! A plan is a directed acyclic tree over `nodes`, rooted at `root`. Scan
//! nodes reference an input table by index; join nodes reference two child
//! nodes, the join attribute on each side, and a build-side flag. Every node
//! declares `output_attrs`: the ordered `(source_column, type)` pairs that
//! shape its output. For a join node a source column below the left child's
//! width refers to the left output; anything else refers to column
//! `index - left_width` of the right output.
//!
//! The node structure round-trips through serde; input tables are runtime
//! state and are skipped.

use serde::{Deserialize, Serialize};

use crate::exec::column::ColumnarTable;
use crate::exec::types::DataType;

/// One projected output column: `(source column index, declared type)`.
pub type OutputAttr = (usize, DataType);

/// Leaf node: project columns out of one input table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanNode {
    /// Index into [`Plan::inputs`].
    pub base_table_id: usize,
}

/// Inner node: hash-join the outputs of two child nodes on one attribute
/// from each side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinNode {
    /// Left child node id.
    pub left: usize,
    /// Right child node id.
    pub right: usize,
    /// Join attribute in the left child's output.
    pub left_attr: usize,
    /// Join attribute in the right child's output.
    pub right_attr: usize,
    /// Build the hash table from the left child (probe the right) when set.
    pub build_left: bool,
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Scan(ScanNode),
    Join(JoinNode),
}

/// A plan node with its output schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanNode {
    pub kind: NodeKind,
    /// Output schema: `(source_column, type)` in output order.
    pub output_attrs: Vec<OutputAttr>,
}

/// A complete executable plan: input tables, node list, and root node id.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Materialized input tables, referenced by scan nodes. Runtime state;
    /// not part of the serialized plan schema.
    #[serde(skip)]
    pub inputs: Vec<ColumnarTable>,
    /// All nodes; children precede parents by convention but any DAG-tree
    /// shape referencing valid ids executes.
    pub nodes: Vec<PlanNode>,
    /// Node id whose output is the query result.
    pub root: usize,
}

impl Plan {
    pub fn new() -> Self {
        Plan::default()
    }

    /// Append a scan node; returns its node id.
    pub fn add_scan(&mut self, base_table_id: usize, output_attrs: Vec<OutputAttr>) -> usize {
        self.nodes.push(PlanNode {
            kind: NodeKind::Scan(ScanNode { base_table_id }),
            output_attrs,
        });
        self.nodes.len() - 1
    }

    /// Append a join node; returns its node id.
    pub fn add_join(
        &mut self,
        build_left: bool,
        left: usize,
        right: usize,
        left_attr: usize,
        right_attr: usize,
        output_attrs: Vec<OutputAttr>,
    ) -> usize {
        self.nodes.push(PlanNode {
            kind: NodeKind::Join(JoinNode {
                left,
                right,
                left_attr,
                right_attr,
                build_left,
            }),
            output_attrs,
        });
        self.nodes.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_assigns_sequential_ids() {
        let mut plan = Plan::new();
        let a = plan.add_scan(0, vec![(0, DataType::Int32)]);
        let b = plan.add_scan(1, vec![(0, DataType::Int32)]);
        let j = plan.add_join(
            true,
            a,
            b,
            0,
            0,
            vec![(0, DataType::Int32), (1, DataType::Int32)],
        );
        assert_eq!((a, b, j), (0, 1, 2));
        plan.root = j;
        assert!(matches!(plan.nodes[j].kind, NodeKind::Join(_)));
    }

    #[test]
    fn test_plan_schema_serde_roundtrip() {
        let mut plan = Plan::new();
        let a = plan.add_scan(0, vec![(0, DataType::Int64), (2, DataType::Varchar)]);
        let b = plan.add_scan(1, vec![(1, DataType::Int64)]);
        plan.root = plan.add_join(
            false,
            a,
            b,
            0,
            0,
            vec![(0, DataType::Int64), (2, DataType::Int64)],
        );

        let json = serde_json::to_string(&plan).unwrap();
        let back: Plan = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes, plan.nodes);
        assert_eq!(back.root, plan.root);
        assert!(back.inputs.is_empty());
    }
}
