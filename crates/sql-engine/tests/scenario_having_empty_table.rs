//! §8 scenario 5: `HAVING` over an empty table with no aggregate
//! column in the SELECT list yields no rows — no row is injected
//! because `id` is a `column_ref`, not a function/literal/sub-query.

mod common;
use common::exec;

use sql_engine::column::{Column, ColumnKind, IntWidth};
use sql_engine::engine::Engine;
use sql_engine::storage::Table;

#[test]
fn having_over_empty_table_with_bare_column_yields_no_rows() {
    let mut engine = Engine::with_default_database("mydb");
    let id = Column {
        name: String::from("id"),
        kind: ColumnKind::Integer {
            width: IntWidth::Int,
            unsigned: false,
            auto_increment: false,
        },
        nullable: false,
        default_expr: None,
    };
    engine.server_mut().create_table(None, "t", Table::new(vec![id])).unwrap();

    let result = exec(&mut engine, "SELECT id FROM t HAVING id > 0");
    assert!(result.rows().unwrap().is_empty());
}

#[test]
fn select_function_over_empty_from_still_yields_one_row() {
    let mut engine = Engine::with_default_database("mydb");
    let result = exec(&mut engine, "SELECT database() AS db");
    assert_eq!(result.rows().unwrap().len(), 1);
}
