//! The Insert Processor (§4.6): row materialization, default/
//! auto-increment resolution, and per-column cast.

use std::collections::HashMap;

use tracing::debug;

use crate::column::Column;
use crate::error::{EngineError, ProcessorError};
use crate::evaluator::Evaluator;
use crate::expr::Expr;
use crate::query::InsertQuery;
use crate::row::{Row, Scope, ScopeEntry};
use crate::storage::Server;
use crate::value::Value;

/// The outcome of a successful INSERT: how many rows were affected and
/// the last auto-increment value assigned (`0` if none).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertResult {
    /// Number of rows inserted.
    pub affected_rows: usize,
    /// The last auto-increment value assigned, or `0` if the table has
    /// no auto-increment column or no row triggered one.
    pub insert_id: i64,
}

/// Runs `query` against `server`, per §4.6.
///
/// # Errors
///
/// Returns [`EngineError`] on column-count mismatch, an evaluator
/// failure while computing a value/default expression, a NULL into a
/// non-nullable column, or an out-of-range/incorrect-type cast — the
/// latter two rewritten with the failing row's 1-based index.
pub fn run_insert(server: &mut Server, query: &InsertQuery) -> Result<InsertResult, EngineError> {
    let table_name = query.table.clone();
    let schema = query.schema.clone();

    let table_columns: Vec<Column> = server
        .table(schema.as_deref(), &table_name)?
        .columns()
        .to_vec();

    let column_names: Vec<String> = if query.columns.is_empty() {
        table_columns.iter().map(|c| c.name.clone()).collect()
    } else {
        query.columns.clone()
    };

    // Evaluator scope for value-list expressions: the target table's
    // own columns, qualified by its own name, so a value expression
    // referencing another column of the row being built would resolve
    // (the dialect's scenarios never do this, but nothing in §4.6
    // rules it out).
    let mut scope = Scope::new();
    for column in &table_columns {
        scope.push(ScopeEntry::table_column(&table_name, &column.name));
    }

    let mut affected_rows = 0usize;
    let mut insert_id = 0i64;

    for (row_index, values) in query.rows.iter().enumerate() {
        if values.len() != column_names.len() {
            return Err(ProcessorError::new(format!(
                "Column count doesn't match value count at row {}",
                row_index + 1
            ))
            .into());
        }

        let provided = evaluate_provided_values(server, &scope, &column_names, values)?;

        let (final_row, row_insert_id) = build_final_row(
            server,
            schema.as_deref(),
            &table_name,
            &table_columns,
            &provided,
            row_index,
        )?;

        if let Some(id) = row_insert_id {
            insert_id = id;
        }

        debug!(table = %table_name, row = row_index + 1, "insert row cast");
        server.insert_row(schema.as_deref(), &table_name, final_row)?;
        affected_rows += 1;
    }

    Ok(InsertResult {
        affected_rows,
        insert_id,
    })
}

/// Evaluates each value-list expression for one row, per §4.6 step 2's
/// `rawRow` construction (before defaults are resolved).
fn evaluate_provided_values(
    server: &Server,
    scope: &Scope,
    column_names: &[String],
    values: &[Expr],
) -> Result<HashMap<String, Value>, EngineError> {
    let eval = Evaluator::new(server, scope);
    let empty_row = Row::new();
    column_names
        .iter()
        .zip(values)
        .map(|(name, expr)| {
            let value = if matches!(expr, Expr::Default) {
                Value::Default
            } else {
                eval.evaluate(expr, &empty_row, None)
                    .map_err(|e| ProcessorError::from_evaluator(e, "field list"))?
            };
            Ok((name.clone(), value))
        })
        .collect()
}

/// Builds the fully-cast row for one INSERT value list, per §4.6 step
/// 3, resolving defaults/auto-increment per §4.6 step 2 along the way.
/// Returns the cast row and the auto-increment value assigned, if any.
fn build_final_row(
    server: &mut Server,
    schema: Option<&str>,
    table_name: &str,
    table_columns: &[Column],
    provided: &HashMap<String, Value>,
    row_index: usize,
) -> Result<(HashMap<String, Value>, Option<i64>), EngineError> {
    let mut final_row = HashMap::new();
    let mut bare_so_far: Row = Row::new();
    let mut row_insert_id = None;

    for column in table_columns {
        let value = match provided.get(&column.name) {
            Some(Value::Default) | None => {
                evaluate_default(server, schema, table_name, column, &bare_so_far, &mut row_insert_id)?
            }
            Some(other) => other.clone(),
        };

        bare_so_far.insert(column.name.clone(), value.clone());

        let cast = column
            .cast(&value)
            .map_err(|e| EngineError::Cast(e.at_row(row_index + 1)))?;
        final_row.insert(column.name.clone(), cast);
    }

    Ok((final_row, row_insert_id))
}

/// `evaluateDefaultValue` of §4.6 step 2: auto-increment first, then
/// the column's declared `DEFAULT` expression (evaluated against the
/// row built so far), then NULL.
fn evaluate_default(
    server: &mut Server,
    schema: Option<&str>,
    table_name: &str,
    column: &Column,
    bare_so_far: &Row,
    row_insert_id: &mut Option<i64>,
) -> Result<Value, EngineError> {
    if column.has_auto_increment() {
        let value = server
            .database_mut(schema)?
            .table_mut(table_name)
            .ok_or_else(|| ProcessorError::new(format!("Table '{table_name}' doesn't exist")))?
            .next_auto_increment_value();
        *row_insert_id = Some(value);
        return Ok(Value::Integer(value));
    }

    if let Some(default_expr) = &column.default_expr {
        let scope = Scope::new();
        let eval = Evaluator::new(server, &scope);
        return eval
            .evaluate(default_expr, bare_so_far, None)
            .map_err(|e| ProcessorError::from_evaluator(e, "field list").into());
    }

    Ok(Value::Null)
}
