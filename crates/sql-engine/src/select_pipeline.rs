//! The six-stage `SELECT` executor: FROM/JOIN → WHERE → GROUP BY →
//! ORDER BY → SELECT/HAVING → LIMIT.

use std::collections::HashMap;

use crate::error::{EngineError, ProcessorError};
use crate::evaluator::Evaluator;
use crate::expr::Expr;
use crate::query::{FromSource, JoinKind, SelectQuery};
use crate::row::{alias_key, qualified_key, Row, Scope, ScopeEntry};
use crate::storage::Server;
use crate::value::Value;

/// Runs `query` against `server`, optionally correlated to an outer
/// row, and returns the output rows (bare-keyed, in final order).
///
/// # Errors
///
/// Returns [`EngineError`] from any stage: an unknown join kind, an
/// evaluator failure (clause-tagged), a missing derived-table alias,
/// or an ungrouped aggregate mismatch.
pub fn run_select(
    server: &Server,
    query: &SelectQuery,
    context: Option<&Row>,
) -> Result<Vec<Row>, EngineError> {
    let (mut rows, mut scope) = apply_from(server, query, context)?;
    apply_where(server, &scope, query, &mut rows, context)?;

    let grouped = apply_group_by(server, &scope, query, &rows)?;

    let (rows, grouped) = apply_order_by(server, &scope, query, rows, grouped, context)?;

    let (mut output, raw_with_aliases) =
        apply_select_and_having(server, &mut scope, query, &rows, grouped.as_ref(), context)?;
    let _ = raw_with_aliases;

    apply_limit(query, &mut output);

    Ok(output)
}

fn apply_from(
    server: &Server,
    query: &SelectQuery,
    context: Option<&Row>,
) -> Result<(Vec<Row>, Scope), EngineError> {
    let mut scope = Scope::new();
    // A FROM-less query (`SELECT database()`) starts from one empty
    // row rather than zero; this is what makes it produce exactly one
    // output row downstream instead of needing a separate
    // empty-row-injection step at the SELECT stage.
    let mut rows: Vec<Row> = vec![HashMap::new()];

    for source in &query.from {
        let (source_rows, qualifier, columns) = match source {
            FromSource::Table {
                schema, table, ..
            } => {
                let t = server.table(schema.as_deref(), table)?;
                let qualifier = source.qualifier().to_string();
                let columns: Vec<String> = t.columns().iter().map(|c| c.name.clone()).collect();
                let source_rows: Vec<Row> = t
                    .rows()
                    .iter()
                    .map(|row| {
                        columns
                            .iter()
                            .map(|c| (qualified_key(&qualifier, c), row.get(c).cloned().unwrap_or(Value::Null)))
                            .collect()
                    })
                    .collect();
                (source_rows, qualifier, columns)
            }
            FromSource::Derived { query: sub, alias, .. } => {
                let sub_rows = run_select(server, sub, context)?;
                let columns: Vec<String> = sub
                    .columns
                    .iter()
                    .map(|c| c.alias.clone().unwrap_or_else(|| display_expr(&c.expr)))
                    .collect();
                let source_rows: Vec<Row> = sub_rows
                    .into_iter()
                    .map(|row| {
                        row.into_iter()
                            .map(|(k, v)| (qualified_key(alias, &k), v))
                            .collect()
                    })
                    .collect();
                (source_rows, alias.clone(), columns)
            }
        };

        for c in &columns {
            scope.push(ScopeEntry::table_column(&qualifier, c));
        }

        rows = combine(server, &scope, source, rows, source_rows, &columns, &qualifier, context)?;
    }

    Ok((rows, scope))
}

#[allow(clippy::too_many_arguments)]
fn combine(
    server: &Server,
    scope: &Scope,
    source: &FromSource,
    left_rows: Vec<Row>,
    right_rows: Vec<Row>,
    right_columns: &[String],
    right_qualifier: &str,
    context: Option<&Row>,
) -> Result<Vec<Row>, EngineError> {
    let join = match source {
        FromSource::Table { join, .. } | FromSource::Derived { join, .. } => *join,
    };
    let on = match source {
        FromSource::Table { on, .. } | FromSource::Derived { on, .. } => on.as_ref(),
    };

    if matches!(join, JoinKind::None) {
        // First source: nothing to combine with.
        return Ok(right_rows);
    }

    let mut eval = Evaluator::new(server, scope);
    if let Some(ctx) = context {
        eval = eval.with_context(ctx);
    }
    let passes_on = |combined: &Row| -> Result<bool, EngineError> {
        match on {
            None => Ok(true),
            Some(expr) => Ok(eval
                .evaluate(expr, combined, None)
                .map_err(|e| ProcessorError::from_evaluator(e, "on clause"))?
                .is_truthy()),
        }
    };

    let mut out = Vec::new();
    for left in &left_rows {
        let mut matched = false;
        for right in &right_rows {
            let mut combined = left.clone();
            combined.extend(right.clone());
            if passes_on(&combined)? {
                matched = true;
                out.push(combined);
            }
        }
        if !matched && matches!(join, JoinKind::Left) {
            let mut combined = left.clone();
            for c in right_columns {
                combined.insert(qualified_key(right_qualifier, c), Value::Null);
            }
            out.push(combined);
        }
    }
    Ok(out)
}

fn apply_where(
    server: &Server,
    scope: &Scope,
    query: &SelectQuery,
    rows: &mut Vec<Row>,
    context: Option<&Row>,
) -> Result<(), EngineError> {
    let Some(predicate) = &query.where_clause else {
        return Ok(());
    };
    let mut eval = Evaluator::new(server, scope);
    if let Some(ctx) = context {
        eval = eval.with_context(ctx);
    }
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows.drain(..) {
        let truthy = eval
            .evaluate(predicate, &row, None)
            .map_err(|e| ProcessorError::from_evaluator(e, "where clause"))?
            .is_truthy();
        if truthy {
            kept.push(row);
        }
    }
    *rows = kept;
    Ok(())
}

fn select_has_aggregate(query: &SelectQuery) -> bool {
    query.columns.iter().any(|c| expr_has_aggregate(&c.expr))
}

fn expr_has_aggregate(expr: &Expr) -> bool {
    match expr {
        Expr::Function { name, args, .. } => {
            matches!(name.as_str(), "count" | "sum" | "avg" | "min" | "max")
                || args.iter().any(expr_has_aggregate)
        }
        Expr::Binary { left, right, .. } => expr_has_aggregate(left) || expr_has_aggregate(right),
        Expr::Case { when, or_else } => {
            when.iter().any(|(c, v)| expr_has_aggregate(c) || expr_has_aggregate(v))
                || or_else.as_deref().is_some_and(expr_has_aggregate)
        }
        Expr::Array(items) => items.iter().any(expr_has_aggregate),
        _ => false,
    }
}

/// True if any SELECT column is something other than a bare
/// `column_ref`/`star` — a function call, literal, CASE, sub-query, or
/// compound expression — per §4.5(5)'s empty-row injection rule.
fn select_needs_injected_row(query: &SelectQuery) -> bool {
    query
        .columns
        .iter()
        .any(|c| !matches!(c.expr, Expr::ColumnRef { .. } | Expr::Star { .. }))
}

fn select_has_nonaggregated_column(query: &SelectQuery) -> Option<usize> {
    query
        .columns
        .iter()
        .position(|c| expr_has_bare_column(&c.expr))
}

fn expr_has_bare_column(expr: &Expr) -> bool {
    match expr {
        Expr::ColumnRef { .. } | Expr::Star { .. } => true,
        Expr::Function { name, .. }
            if matches!(name.as_str(), "count" | "sum" | "avg" | "min" | "max") =>
        {
            false
        }
        Expr::Function { args, .. } => args.iter().any(expr_has_bare_column),
        Expr::Binary { left, right, .. } => {
            expr_has_bare_column(left) || expr_has_bare_column(right)
        }
        Expr::Case { when, or_else } => {
            when.iter().any(|(c, v)| expr_has_bare_column(c) || expr_has_bare_column(v))
                || or_else.as_deref().is_some_and(expr_has_bare_column)
        }
        Expr::Array(items) => items.iter().any(expr_has_bare_column),
        _ => false,
    }
}

/// `Some(groups)` once GROUP BY (explicit or implicit single-group
/// aggregation) fires; `None` means SELECT/HAVING iterate `rows`
/// directly, one output row per input row.
fn apply_group_by(
    _server: &Server,
    _scope: &Scope,
    query: &SelectQuery,
    rows: &[Row],
) -> Result<Option<Vec<Vec<Row>>>, EngineError> {
    if query.group_by.is_empty() {
        if !select_has_aggregate(query) {
            return Ok(None);
        }
        if let Some(i) = select_has_nonaggregated_column(query) {
            return Err(ProcessorError::new(format!(
                "In aggregated query without GROUP BY, expression #{} of SELECT list contains nonaggregated column",
                i + 1
            ))
            .into());
        }
        return Ok(Some(vec![rows.to_vec()]));
    }

    let eval = Evaluator::new(_server, _scope);
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<Row>> = HashMap::new();
    for row in rows {
        let key = query
            .group_by
            .iter()
            .map(|e| {
                eval.evaluate(e, row, None)
                    .map_err(|e| ProcessorError::from_evaluator(e, "group statement"))
                    .map(|v| v.to_string())
            })
            .collect::<Result<Vec<_>, ProcessorError>>()?
            .join("::");
        if !buckets.contains_key(&key) {
            order.push(key.clone());
        }
        buckets.entry(key).or_default().push(row.clone());
    }

    Ok(Some(
        order.into_iter().map(|k| buckets.remove(&k).unwrap_or_default()).collect(),
    ))
}

/// Orders rows (ungrouped mode) or whole groups (grouped mode) by the
/// `ORDER BY` terms, each evaluated with the group passed through so a
/// term may reference an aggregate (`ORDER BY COUNT(*)`). Returns the
/// possibly-reordered rows together with the possibly-reordered
/// groups, since downstream `apply_select_and_having` reads from
/// whichever of the two is populated.
fn apply_order_by(
    server: &Server,
    scope: &Scope,
    query: &SelectQuery,
    rows: Vec<Row>,
    grouped: Option<Vec<Vec<Row>>>,
    context: Option<&Row>,
) -> Result<(Vec<Row>, Option<Vec<Vec<Row>>>), EngineError> {
    if query.order_by.is_empty() {
        return Ok((rows, grouped));
    }

    let mut eval = Evaluator::new(server, scope);
    if let Some(ctx) = context {
        eval = eval.with_context(ctx);
    }

    if let Some(groups) = grouped {
        let mut keyed = Vec::with_capacity(groups.len());
        for group in groups {
            let representative = group.first().cloned().unwrap_or_default();
            let mut key = Vec::with_capacity(query.order_by.len());
            for term in &query.order_by {
                let v = eval
                    .evaluate(&term.expr, &representative, Some(&group))
                    .map_err(|e| ProcessorError::from_evaluator(e, "order clause"))?;
                key.push(v);
            }
            keyed.push((key, group));
        }
        sort_keyed(&mut keyed, &query.order_by);
        return Ok((rows, Some(keyed.into_iter().map(|(_, g)| g).collect())));
    }

    let mut keyed = Vec::with_capacity(rows.len());
    for row in rows {
        let mut key = Vec::with_capacity(query.order_by.len());
        for term in &query.order_by {
            let v = eval
                .evaluate(&term.expr, &row, None)
                .map_err(|e| ProcessorError::from_evaluator(e, "order clause"))?;
            key.push(v);
        }
        keyed.push((key, row));
    }
    sort_keyed(&mut keyed, &query.order_by);
    Ok((keyed.into_iter().map(|(_, row)| row).collect(), None))
}

fn sort_keyed<T>(keyed: &mut [(Vec<Value>, T)], order_by: &[crate::query::OrderByItem]) {
    keyed.sort_by(|(a, _), (b, _)| {
        for (i, term) in order_by.iter().enumerate() {
            let (av, bv) = (&a[i], &b[i]);
            let ord = match (av.is_null(), bv.is_null()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                (false, false) => av.compare(bv),
            };
            let ord = if term.descending { ord.reverse() } else { ord };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
}

#[allow(clippy::too_many_lines)]
fn apply_select_and_having(
    server: &Server,
    scope: &mut Scope,
    query: &SelectQuery,
    rows: &[Row],
    grouped: Option<&Vec<Vec<Row>>>,
    context: Option<&Row>,
) -> Result<(Vec<Row>, Vec<Row>), EngineError> {
    for col in &query.columns {
        if let Some(alias) = &col.alias {
            scope.push(ScopeEntry::alias(alias));
        }
    }

    let mut eval = Evaluator::new(server, scope);
    if let Some(ctx) = context {
        eval = eval.with_context(ctx);
    }

    let mut output = Vec::new();
    let mut raw_with_aliases = Vec::new();

    let emit = |raw_row: &Row, group: Option<&[Row]>| -> Result<Option<(Row, Row)>, EngineError> {
        let mut visible = HashMap::new();
        let mut aliased = raw_row.clone();

        for col in &query.columns {
            if matches!(col.expr, Expr::Star { .. }) {
                let Expr::Star { table } = &col.expr else {
                    unreachable!()
                };
                for (name, value) in eval
                    .evaluate_star(table.as_deref(), raw_row)
                    .map_err(|e| ProcessorError::from_evaluator(e, "field list"))?
                {
                    visible.insert(name, value);
                }
                continue;
            }

            let value = eval
                .evaluate(&col.expr, raw_row, group)
                .map_err(|e| ProcessorError::from_evaluator(e, "field list"))?;

            let output_name = col.alias.clone().unwrap_or_else(|| display_expr(&col.expr));
            visible.insert(output_name, value.clone());
            if let Some(alias) = &col.alias {
                aliased.insert(alias_key(alias), value);
            }
        }

        if let Some(having) = &query.having {
            let truthy = eval
                .evaluate(having, &aliased, group)
                .map_err(|e| ProcessorError::from_evaluator(e, "having clause"))?
                .is_truthy();
            if !truthy {
                return Ok(None);
            }
        }

        Ok(Some((visible, aliased)))
    };

    if let Some(groups) = grouped {
        for group in groups {
            let raw_row = group.first().cloned().unwrap_or_default();
            if let Some((visible, aliased)) = emit(&raw_row, Some(group))? {
                output.push(visible);
                raw_with_aliases.push(aliased);
            }
        }
    } else if rows.is_empty() && select_needs_injected_row(query) {
        // §4.5(5): a function/literal/CASE/sub-query column projects a
        // value even with no source rows (`SELECT database()` over no
        // `FROM`, or over a `FROM` that matched nothing); a bare
        // column_ref/star has nothing to read and correctly yields no
        // rows instead.
        if let Some((visible, aliased)) = emit(&Row::new(), None)? {
            output.push(visible);
            raw_with_aliases.push(aliased);
        }
    } else {
        for row in rows {
            if let Some((visible, aliased)) = emit(row, None)? {
                output.push(visible);
                raw_with_aliases.push(aliased);
            }
        }
    }

    if query.distinct {
        let order: Vec<String> = query
            .columns
            .iter()
            .map(|c| c.alias.clone().unwrap_or_else(|| display_expr(&c.expr)))
            .collect();
        let mut seen = std::collections::HashSet::new();
        let mut deduped_output = Vec::new();
        let mut deduped_raw = Vec::new();
        for (visible, raw) in output.into_iter().zip(raw_with_aliases) {
            let key = order
                .iter()
                .map(|name| visible.get(name).map(ToString::to_string).unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\u{1}");
            if seen.insert(key) {
                deduped_output.push(visible);
                deduped_raw.push(raw);
            }
        }
        return Ok((deduped_output, deduped_raw));
    }

    Ok((output, raw_with_aliases))
}

fn apply_limit(query: &SelectQuery, rows: &mut Vec<Row>) {
    if query.offset > 0 {
        if query.offset >= rows.len() {
            rows.clear();
        } else {
            rows.drain(..query.offset);
        }
    }
    if query.limit > 0 && rows.len() > query.limit {
        rows.truncate(query.limit);
    }
}

pub(crate) fn display_expr(expr: &Expr) -> String {
    match expr {
        Expr::ColumnRef { table, column } => table
            .as_ref()
            .map_or_else(|| column.clone(), |t| format!("{t}.{column}")),
        // An unaliased function column is named after the function
        // itself (`SELECT database()` -> output column `database`),
        // matching the literal scenario outputs this engine is tested
        // against rather than MySQL's verbatim `name(args)` header.
        Expr::Function { name, .. } => name.clone(),
        Expr::Literal(v) => v.to_string(),
        _ => String::from("expr"),
    }
}
