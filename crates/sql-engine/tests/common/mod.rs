#![allow(dead_code)]

use std::collections::HashMap;

use sql_ast::Parser;
use sql_engine::engine::Engine;
use sql_engine::storage::Table;
use sql_engine::value::Value;
use sql_engine::ExecutionResult;

/// Executes one SQL statement against `engine`, panicking with the SQL
/// text on a parse or execution failure.
pub fn exec(engine: &mut Engine, sql: &str) -> ExecutionResult {
    let stmt = Parser::new(sql)
        .parse_statement()
        .unwrap_or_else(|e| panic!("failed to parse {sql:?}: {e:?}"));
    engine
        .execute(&stmt, &[])
        .unwrap_or_else(|e| panic!("failed to execute {sql:?}: {e}"))
}

/// Executes one SQL statement, expecting it to fail, and returns the
/// error's `Display` text.
pub fn exec_err(engine: &mut Engine, sql: &str) -> String {
    let stmt = Parser::new(sql)
        .parse_statement()
        .unwrap_or_else(|e| panic!("failed to parse {sql:?}: {e:?}"));
    engine
        .execute(&stmt, &[])
        .expect_err(&format!("expected {sql:?} to fail"))
        .to_string()
}

/// Convenience row builder: `row(&[("id", Value::Integer(1))])`.
pub fn row(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
}

/// Seeds `table_name` directly into `engine`'s current database,
/// bypassing `CREATE TABLE`/`INSERT` parsing — used when a test wants
/// to start from pre-populated rows rather than build them via SQL.
pub fn seed_table(engine: &mut Engine, table_name: &str, mut table: Table, rows: Vec<HashMap<String, Value>>) {
    for r in rows {
        table.insert_row(r);
    }
    engine.server_mut().create_table(None, table_name, table).unwrap();
}
