//! Recursive plan evaluation.
//!
//! The evaluator is single-threaded across the plan tree: a join's children
//! are evaluated sequentially before its own build/probe runs. Inside one
//! join node the configured [`JoinStrategy`] decides between the
//! single-threaded map join, the unchained-table join, and the partitioned
//! parallel join. Scan nodes copy the referenced columns of their input
//! table; join nodes materialize output columns from the oriented match
//! list.

use rayon::prelude::*;
use tracing::debug;

use crate::exec::column::{Column, ColumnarTable, FixedColumnBuilder, StringColumnBuilder};
use crate::exec::error::{ExecError, JoinError, PlanError, SchemaError};
use crate::exec::hash::FloatKey;
use crate::exec::join::{self, MatchList};
use crate::exec::partitioned;
use crate::exec::plan::{JoinNode, NodeKind, OutputAttr, Plan, ScanNode};
use crate::exec::reader::{extract, FromValue};
use crate::exec::types::DataType;

/// How join nodes are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinStrategy {
    /// Single-threaded chaining hash map.
    Simple,
    /// Single-threaded unchained table with per-slot Bloom filters.
    Unchained,
    /// Sharded build/probe across worker threads.
    #[default]
    Partitioned,
}

/// Execution context: join strategy and worker pool sizing.
///
/// Construct with [`Context::new`] (or `Default`); dropping it releases
/// whatever the implementation holds.
#[derive(Debug, Clone)]
pub struct Context {
    /// Strategy for every join node in the plan.
    pub strategy: JoinStrategy,
    /// Worker threads per partitioned join phase.
    pub workers: usize,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// A single-threaded context using the given strategy.
    pub fn sequential(strategy: JoinStrategy) -> Self {
        Context {
            strategy,
            workers: 1,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context {
            strategy: JoinStrategy::Partitioned,
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// Evaluate `plan` to its root's output table.
///
/// Errors surface immediately; no partial result is returned.
pub fn execute(plan: &Plan, ctx: &Context) -> Result<ColumnarTable, ExecError> {
    let result = execute_node(plan, plan.root, ctx)?;
    debug!(
        rows = result.num_rows,
        columns = result.columns.len(),
        "plan executed"
    );
    Ok(result)
}

fn node(plan: &Plan, id: usize) -> Result<&crate::exec::plan::PlanNode, PlanError> {
    plan.nodes.get(id).ok_or(PlanError::OutOfRange {
        kind: "node",
        index: id,
        len: plan.nodes.len(),
    })
}

fn execute_node(plan: &Plan, id: usize, ctx: &Context) -> Result<ColumnarTable, ExecError> {
    let node = node(plan, id)?;
    match &node.kind {
        NodeKind::Scan(scan) => execute_scan(plan, scan, &node.output_attrs),
        NodeKind::Join(join) => execute_join(plan, join, &node.output_attrs, ctx),
    }
}

/// Copy the projected columns of the referenced input table.
fn execute_scan(
    plan: &Plan,
    scan: &ScanNode,
    output_attrs: &[OutputAttr],
) -> Result<ColumnarTable, ExecError> {
    let input = plan
        .inputs
        .get(scan.base_table_id)
        .ok_or(PlanError::OutOfRange {
            kind: "input",
            index: scan.base_table_id,
            len: plan.inputs.len(),
        })?;

    let mut columns = Vec::with_capacity(output_attrs.len());
    for &(source, dtype) in output_attrs {
        let source_column = input.columns.get(source).ok_or(SchemaError::ColumnMismatch {
            column: source,
            width: input.columns.len(),
        })?;
        let mut column = Column::new(dtype);
        column.pages = source_column.pages.clone();
        columns.push(column);
    }
    Ok(ColumnarTable {
        num_rows: input.num_rows,
        columns,
    })
}

fn execute_join(
    plan: &Plan,
    join: &JoinNode,
    output_attrs: &[OutputAttr],
    ctx: &Context,
) -> Result<ColumnarTable, ExecError> {
    // The build side's declared key type drives the dispatch; the probe side
    // is assumed to match.
    let build_child = if join.build_left { join.left } else { join.right };
    let build_attr = if join.build_left {
        join.left_attr
    } else {
        join.right_attr
    };
    let build_attrs = &node(plan, build_child)?.output_attrs;
    let &(_, key_type) = build_attrs
        .get(build_attr)
        .ok_or(SchemaError::ColumnMismatch {
            column: build_attr,
            width: build_attrs.len(),
        })?;

    let left = execute_node(plan, join.left, ctx)?;
    let right = execute_node(plan, join.right, ctx)?;

    let (build, probe, probe_attr) = if join.build_left {
        (&left, &right, join.right_attr)
    } else {
        (&right, &left, join.left_attr)
    };
    let build_column = build
        .columns
        .get(build_attr)
        .ok_or(SchemaError::ColumnMismatch {
            column: build_attr,
            width: build.columns.len(),
        })?;
    let probe_column = probe
        .columns
        .get(probe_attr)
        .ok_or(SchemaError::ColumnMismatch {
            column: probe_attr,
            width: probe.columns.len(),
        })?;

    let matches = match key_type {
        DataType::Int32 => join_matches::<i32>(build_column, probe_column, build.num_rows, ctx)?,
        DataType::Int64 => join_matches::<i64>(build_column, probe_column, build.num_rows, ctx)?,
        DataType::Float64 => {
            join_matches::<FloatKey>(build_column, probe_column, build.num_rows, ctx)?
        }
        DataType::Varchar => {
            return Err(JoinError::UnsupportedKeyType(DataType::Varchar).into());
        }
    };
    debug!(
        build_rows = build.num_rows,
        probe_rows = probe.num_rows,
        matches = matches.len(),
        strategy = ?ctx.strategy,
        "hash join"
    );
    let matches = join::orient(matches, join.build_left);

    materialize(
        &matches,
        output_attrs,
        &left,
        &right,
        ctx.strategy == JoinStrategy::Partitioned,
    )
}

fn join_matches<K: crate::exec::hash::FixedKey>(
    build: &Column,
    probe: &Column,
    build_rows: usize,
    ctx: &Context,
) -> Result<MatchList, ExecError> {
    let matches = match ctx.strategy {
        JoinStrategy::Simple => join::simple_join::<K>(build, probe)?,
        JoinStrategy::Unchained => join::unchained_join::<K>(build, probe, build_rows)?,
        JoinStrategy::Partitioned => {
            partitioned::partitioned_join::<K>(build, probe, ctx.workers)?
        }
    };
    Ok(matches)
}

/// Build one output column per attribute from the oriented match list.
///
/// Output columns are independent, so the partitioned path materializes them
/// in parallel.
fn materialize(
    matches: &MatchList,
    output_attrs: &[OutputAttr],
    left: &ColumnarTable,
    right: &ColumnarTable,
    parallel: bool,
) -> Result<ColumnarTable, ExecError> {
    let build_column = |&(index, dtype): &OutputAttr| -> Result<Column, ExecError> {
        let left_width = left.columns.len();
        let (source, source_index, from_left) = if index < left_width {
            (left, index, true)
        } else {
            (right, index - left_width, false)
        };
        let source_column =
            source
                .columns
                .get(source_index)
                .ok_or(SchemaError::ColumnMismatch {
                    column: index,
                    width: left_width + right.columns.len(),
                })?;
        match dtype {
            DataType::Int32 => fill_fixed::<i32>(source_column, source.num_rows, matches, from_left),
            DataType::Int64 => fill_fixed::<i64>(source_column, source.num_rows, matches, from_left),
            DataType::Float64 => {
                fill_fixed::<f64>(source_column, source.num_rows, matches, from_left)
            }
            DataType::Varchar => {
                let values = extract::<String>(source_column, source.num_rows)?;
                let mut builder = StringColumnBuilder::new();
                for &(left_row, right_row) in matches {
                    let row = if from_left { left_row } else { right_row };
                    builder.push(values.get(row).and_then(|v| v.as_deref()));
                }
                Ok(builder.finish())
            }
        }
    };

    let columns: Result<Vec<Column>, ExecError> = if parallel {
        output_attrs.par_iter().map(build_column).collect()
    } else {
        output_attrs.iter().map(build_column).collect()
    };
    Ok(ColumnarTable {
        num_rows: matches.len(),
        columns: columns?,
    })
}

fn fill_fixed<T>(
    source: &Column,
    source_rows: usize,
    matches: &MatchList,
    from_left: bool,
) -> Result<Column, ExecError>
where
    T: crate::exec::types::FixedScalar + FromValue,
{
    let values = extract::<T>(source, source_rows)?;
    let mut builder = FixedColumnBuilder::<T>::new();
    for &(left_row, right_row) in matches {
        let row = if from_left { left_row } else { right_row };
        builder.push(values.get(row).copied().flatten());
    }
    Ok(builder.finish())
}
