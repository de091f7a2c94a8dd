use std::collections::BTreeSet;
use std::sync::Arc;

use logutil::{configure_global_logger, LogFormat};
use relmeta_planner::expr::comparison_expr::ComparisonOperator;
use relmeta_planner::expr::Expression;
use relmeta_planner::logical::logical_join::LogicalJoin;
use relmeta_planner::logical::operator::{JoinType, LogicalOperator};
use relmeta_planner::logical::table::TableDescriptor;
use relmeta_planner::metadata::unique_keys::UniqueKey;
use relmeta_planner::metadata::MetadataQuery;
use relmeta_planner::statistics::{StatisticsSnapshot, TableStatistics};
use relmeta_planner::testutil::*;
use relmeta_types::datatype::DataType;
use relmeta_types::field::Field;
use tracing::Level;

fn init() {
    configure_global_logger(Level::ERROR, LogFormat::HumanReadable);
}

fn two_column_table(name: &str) -> Arc<TableDescriptor> {
    Arc::new(TableDescriptor::new(
        name,
        [
            Field::new("A", DataType::Int32, true),
            Field::new("B", DataType::Int32, true),
        ],
    ))
}

#[test]
fn dimension_filter_reduces_fact_rows() {
    init();
    let stats = test_statistics();
    let mq = MetadataQuery::new(&stats);

    // emps e join depts d on e.deptno = d.deptno where d.dname = 'foo', with
    // the dimension filter also applied to emps through a semijoin.
    let depts = filter(scan(&depts_table()), eq(1, "foo"));
    assert_approx_eq(1.0, mq.row_count(&depts).unwrap());

    let emps = semi_join(scan(&emps_table()), depts.clone(), vec![0], vec![0]);
    assert_approx_eq(EMPS_ROWS / DEPTS_ROWS, mq.row_count(&emps).unwrap());

    let plan = inner_join(emps, depts, Some(columns_eq(0, 3)));
    assert_approx_eq(EMPS_ROWS / DEPTS_ROWS, mq.row_count(&plan).unwrap());
}

#[test]
fn join_without_column_statistics() {
    init();
    let t1 = two_column_table("T1");
    let t2 = two_column_table("T2");
    let stats = StatisticsSnapshot::new([
        ("T1".to_string(), TableStatistics::with_row_count(1000.0)),
        ("T2".to_string(), TableStatistics::with_row_count(20.0)),
    ]);
    let mq = MetadataQuery::new(&stats);

    let t2_filtered = filter(scan(&t2), eq(1, 1));
    assert_approx_eq(2.0, mq.row_count(&t2_filtered).unwrap());
    assert_approx_eq(0.1, mq.percentage_original_rows(&t2_filtered).unwrap());

    // Semijoin selectivity falls back to the fraction of T2 that remains.
    let t1_reduced = semi_join(scan(&t1), t2_filtered.clone(), vec![0], vec![0]);
    assert_approx_eq(0.1, mq.semijoin_selectivity(&t2_filtered, &[0]));
    assert_approx_eq(100.0, mq.row_count(&t1_reduced).unwrap());

    // T1 is the fact table since it started out larger, so the join keeps
    // its rows.
    let plan = inner_join(t1_reduced, t2_filtered, Some(columns_eq(0, 2)));
    assert_eq!(None, mq.distinct_row_count(&plan, &[0], None));
    assert_approx_eq(100.0, mq.row_count(&plan).unwrap());
}

#[test]
fn non_equi_join() {
    init();
    let stats = test_statistics();
    let mq = MetadataQuery::new(&stats);

    let cond = Expression::compare(
        ComparisonOperator::Gt,
        Expression::column(0),
        Expression::column(3),
    );
    let plan = inner_join(scan(&emps_table()), scan(&depts_table()), Some(cond));
    assert_approx_eq(EMPS_ROWS * DEPTS_ROWS * 0.5, mq.row_count(&plan).unwrap());
}

#[test]
fn cross_join() {
    init();
    let stats = test_statistics();
    let mq = MetadataQuery::new(&stats);

    let plan = inner_join(scan(&emps_table()), scan(&depts_table()), None);
    assert_approx_eq(EMPS_ROWS * DEPTS_ROWS, mq.row_count(&plan).unwrap());
    assert_approx_eq(1.0, mq.selectivity(&plan, None).unwrap());
}

#[test]
fn selectivity_through_join() {
    init();
    let stats = test_statistics();
    let mq = MetadataQuery::new(&stats);

    let join = inner_join(scan(&emps_table()), scan(&depts_table()), Some(columns_eq(0, 3)));
    assert_approx_eq(EMPS_ROWS, mq.row_count(&join).unwrap());

    // name = 'foo' can't be estimated from the join's inputs so it's guessed.
    let plan = project(
        filter(join, eq(1, "foo")),
        vec![Expression::column(1), Expression::column(4)],
    );
    assert_approx_eq(0.15, mq.selectivity(&plan, None).unwrap());
}

#[test]
fn self_join_on_unique_key() {
    init();
    let stats = test_statistics();
    let mq = MetadataQuery::new(&stats);
    let sales = sales_emps_table();

    let plan = inner_join(scan(&sales), scan(&sales), Some(columns_eq(0, 3)));
    assert_approx_eq(SALES_EMPS_ROWS, mq.row_count(&plan).unwrap());

    // Keys of both sides survive since each side's join column is unique.
    assert_eq!(Some(true), mq.are_columns_unique(&plan, &[0]));
    assert_eq!(Some(true), mq.are_columns_unique(&plan, &[3]));
    assert_eq!(Some(false), mq.are_columns_unique(&plan, &[1, 4]));
}

#[test]
fn outer_join_keys() {
    init();
    let stats = test_statistics();
    let mq = MetadataQuery::new(&stats);
    let sales = sales_emps_table();

    let plan = LogicalOperator::join(
        LogicalJoin {
            join_type: JoinType::Left,
            condition: Some(columns_eq(0, 3)),
        },
        scan(&sales),
        scan(&sales),
    );

    // The right side's key may be null for unmatched rows.
    assert_eq!(Some(true), mq.are_columns_unique(&plan, &[0]));
    assert_eq!(Some(false), mq.are_columns_unique(&plan, &[3]));

    // Left outer joins keep at least every row of the left side.
    assert!(mq.row_count(&plan).unwrap() >= SALES_EMPS_ROWS);
}

#[test]
fn row_id_keys_dropped_by_join() {
    init();
    let stats = test_statistics();
    let mq = MetadataQuery::new(&stats);
    let table = Arc::new(
        TableDescriptor::new("R", [Field::new("A", DataType::Int32, true)]).with_row_id(),
    );

    let rows = projected_scan(&table, [0, 1]);
    let expected: BTreeSet<_> = [UniqueKey::new([1])].into();
    assert_eq!(expected, mq.unique_keys(&rows).unwrap());

    // Joined to a unique column, so the left key would otherwise survive.
    let plan = inner_join(rows, scan(&sales_emps_table()), Some(columns_eq(0, 2)));
    assert_eq!(Some(true), mq.are_columns_unique(&plan.children()[1], &[0]));
    assert_eq!(BTreeSet::new(), mq.unique_keys(&plan).unwrap());
    assert_eq!(Some(false), mq.are_columns_unique(&plan, &[1]));
}

#[test]
fn distinct_through_join() {
    init();
    let stats = test_statistics();
    let mq = MetadataQuery::new(&stats);

    let plan = inner_join(scan(&emps_table()), scan(&depts_table()), Some(columns_eq(0, 3)));
    let left = mq.distinct_row_count(&scan(&emps_table()), &[1], None).unwrap();
    let right = mq.distinct_row_count(&scan(&depts_table()), &[1], None).unwrap();

    let got = mq.distinct_row_count(&plan, &[1, 4], None).unwrap();
    let expected = relmeta_planner::metadata::util::num_distinct_vals(left * right, EMPS_ROWS);
    assert_approx_eq(expected, got);
}

#[test]
fn column_origins_through_join() {
    init();
    let stats = test_statistics();
    let mq = MetadataQuery::new(&stats);
    let emps = emps_table();
    let depts = depts_table();

    let plan = project(
        inner_join(scan(&emps), scan(&depts), Some(columns_eq(0, 3))),
        vec![Expression::column(4), upper(Expression::column(1))],
    );

    let origins: Vec<_> = mq
        .column_origins(&plan, 0)
        .unwrap()
        .into_iter()
        .map(|o| o.to_string())
        .collect();
    assert_eq!(vec!["DEPTS.DNAME"], origins);

    let origins: Vec<_> = mq
        .column_origins(&plan, 1)
        .unwrap()
        .into_iter()
        .map(|o| o.to_string())
        .collect();
    assert_eq!(vec!["EMPS.NAME (derived)"], origins);
}

#[test]
fn percentage_of_join() {
    init();
    let stats = test_statistics();
    let mq = MetadataQuery::new(&stats);

    let emps = filter(scan(&emps_table()), eq(0, 10));
    let depts = scan(&depts_table());
    let plan = inner_join(emps, depts, Some(columns_eq(0, 3)));

    assert_approx_eq(0.01, mq.percentage_original_rows(&plan).unwrap());
}
