//! Randomized invariant tests.
//!
//! Seeded generators keep every run reproducible. The interesting inputs are
//! large enough to force multi-page columns, so the partitioned join's
//! page-range splits are real.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use colex::exec::column::{FixedColumnBuilder, StringColumnBuilder};
use colex::exec::executor::{execute, Context, JoinStrategy};
use colex::exec::plan::Plan;
use colex::exec::reader::extract;
use colex::exec::table::Table;
use colex::exec::types::{DataType, Value};

fn random_keys(rng: &mut StdRng, len: usize, domain: i32, null_rate: f64) -> Vec<Option<i32>> {
    (0..len)
        .map(|_| {
            if rng.random_bool(null_rate) {
                None
            } else {
                Some(rng.random_range(0..domain))
            }
        })
        .collect()
}

fn int_table(values: &[Option<i32>]) -> Table {
    Table::new(
        values.iter().map(|v| vec![v.map(Value::Int32)]).collect(),
        vec![DataType::Int32],
    )
}

fn join_plan(build: &[Option<i32>], probe: &[Option<i32>], build_left: bool) -> Plan {
    let mut plan = Plan::new();
    plan.inputs.push(int_table(build).to_columnar().unwrap());
    plan.inputs.push(int_table(probe).to_columnar().unwrap());
    let left = plan.add_scan(0, vec![(0, DataType::Int32)]);
    let right = plan.add_scan(1, vec![(0, DataType::Int32)]);
    plan.root = plan.add_join(
        build_left,
        left,
        right,
        0,
        0,
        vec![(0, DataType::Int32), (1, DataType::Int32)],
    );
    plan
}

#[test]
fn prop_int_columns_roundtrip() {
    let mut rng = StdRng::seed_from_u64(0xC01E_57A1);
    for _ in 0..8 {
        let values: Vec<Option<i64>> = (0..3000)
            .map(|_| {
                if rng.random_bool(0.2) {
                    None
                } else {
                    Some(rng.random::<i64>())
                }
            })
            .collect();
        let mut builder = FixedColumnBuilder::<i64>::new();
        for v in &values {
            builder.push(*v);
        }
        let column = builder.finish();
        assert!(column.pages.len() > 1);
        assert_eq!(extract::<i64>(&column, values.len()).unwrap(), values);
    }
}

#[test]
fn prop_string_columns_roundtrip() {
    let mut rng = StdRng::seed_from_u64(0x5EED_0002);
    for _ in 0..4 {
        let values: Vec<Option<String>> = (0..400)
            .map(|_| {
                if rng.random_bool(0.15) {
                    return None;
                }
                // Mostly short strings, occasionally one spilling across
                // multiple pages.
                let len = if rng.random_bool(0.02) {
                    rng.random_range(4090..12000)
                } else {
                    rng.random_range(0..40)
                };
                let s: String = (0..len)
                    .map(|_| char::from(rng.random_range(b'a'..=b'z')))
                    .collect();
                Some(s)
            })
            .collect();
        let mut builder = StringColumnBuilder::new();
        for v in &values {
            builder.push(v.as_deref());
        }
        let column = builder.finish();
        assert_eq!(extract::<String>(&column, values.len()).unwrap(), values);
    }
}

#[test]
fn prop_join_cardinality() {
    let mut rng = StdRng::seed_from_u64(0x0DDB_A115);
    let build = random_keys(&mut rng, 2500, 400, 0.1);
    let probe = random_keys(&mut rng, 3100, 400, 0.1);

    let mut build_counts: HashMap<i32, usize> = HashMap::new();
    for key in build.iter().flatten() {
        *build_counts.entry(*key).or_default() += 1;
    }
    let expected: usize = probe
        .iter()
        .flatten()
        .map(|key| build_counts.get(key).copied().unwrap_or(0))
        .sum();

    let plan = join_plan(&build, &probe, true);
    for ctx in [
        Context::sequential(JoinStrategy::Simple),
        Context::sequential(JoinStrategy::Unchained),
        Context {
            strategy: JoinStrategy::Partitioned,
            workers: 4,
        },
    ] {
        let result = execute(&plan, &ctx).unwrap();
        assert_eq!(result.num_rows, expected, "strategy {:?}", ctx.strategy);
    }
}

#[test]
fn prop_null_keys_never_match() {
    let mut rng = StdRng::seed_from_u64(0x0BAD_5EED);
    let build = random_keys(&mut rng, 1500, 50, 0.4);
    let probe = random_keys(&mut rng, 1500, 50, 0.4);
    let plan = join_plan(&build, &probe, false);
    let result = execute(&plan, &Context::new()).unwrap();

    // Both output columns are the join keys; a null anywhere would mean a
    // null key produced a match.
    let table = Table::from_columnar(&result).unwrap();
    for row in table.rows() {
        assert_eq!(row[0], row[1]);
        assert!(row[0].is_some());
    }
}

#[test]
fn prop_strategies_agree() {
    let mut rng = StdRng::seed_from_u64(0x7E57_0003);
    for round in 0..4 {
        let build = random_keys(&mut rng, 2000, 150, 0.15);
        let probe = random_keys(&mut rng, 2000, 150, 0.15);
        let plan = join_plan(&build, &probe, round % 2 == 0);

        let mut reference: Option<Vec<Vec<Option<Value>>>> = None;
        for ctx in [
            Context::sequential(JoinStrategy::Simple),
            Context::sequential(JoinStrategy::Unchained),
            Context {
                strategy: JoinStrategy::Partitioned,
                workers: 3,
            },
            Context {
                strategy: JoinStrategy::Partitioned,
                workers: 8,
            },
        ] {
            let mut table = Table::from_columnar(&execute(&plan, &ctx).unwrap()).unwrap();
            table.sort();
            match &reference {
                None => reference = Some(table.rows().to_vec()),
                Some(expected) => {
                    assert_eq!(table.rows(), &expected[..], "round {}", round)
                }
            }
        }
    }
}

#[test]
fn prop_build_side_symmetry() {
    let mut rng = StdRng::seed_from_u64(0x5_1DE5);
    let build = random_keys(&mut rng, 1200, 80, 0.2);
    let probe = random_keys(&mut rng, 1700, 80, 0.2);

    let ctx = Context::new();
    let mut left_build = Table::from_columnar(
        &execute(&join_plan(&build, &probe, true), &ctx).unwrap(),
    )
    .unwrap();
    let mut right_build = Table::from_columnar(
        &execute(&join_plan(&build, &probe, false), &ctx).unwrap(),
    )
    .unwrap();
    left_build.sort();
    right_build.sort();
    assert_eq!(left_build.rows(), right_build.rows());
}
