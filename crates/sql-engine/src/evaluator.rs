//! The expression interpreter driving every pipeline stage.

use std::collections::HashSet;

use regex::Regex;

use crate::error::EvaluatorError;
use crate::expr::{BinaryOp, Expr};
use crate::row::{Row, Scope};
use crate::storage::Server;
use crate::value::Value;

/// A group of rows sharing a `GROUP BY` key (or the single synthetic
/// group used for an aggregate without `GROUP BY`).
pub type Group<'a> = &'a [Row];

/// The expression interpreter. Holds no per-row state: the same
/// `Evaluator` is reused across every row of a stage.
pub struct Evaluator<'a> {
    server: &'a Server,
    scope: &'a Scope,
    /// The outer row of a correlated scalar sub-query, if this
    /// evaluator belongs to one.
    context: Option<&'a Row>,
}

impl<'a> Evaluator<'a> {
    /// Builds an evaluator bound to `server` and `scope`, with no
    /// outer correlation context.
    #[must_use]
    pub const fn new(server: &'a Server, scope: &'a Scope) -> Self {
        Self {
            server,
            scope,
            context: None,
        }
    }

    /// Returns an evaluator identical to this one but carrying `row`
    /// as the outer context for a correlated sub-query.
    #[must_use]
    pub const fn with_context(mut self, row: &'a Row) -> Self {
        self.context = Some(row);
        self
    }

    /// Evaluates `expr` against `row`, consulting `group` for
    /// aggregate functions.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] for an unknown/ambiguous column, an
    /// aggregate used outside a group, or a scalar sub-query that
    /// returns more than one row.
    pub fn evaluate(
        &self,
        expr: &Expr,
        row: &Row,
        group: Option<Group<'_>>,
    ) -> Result<Value, EvaluatorError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Default => Ok(Value::Default),
            Expr::ColumnRef { table, column } => self.resolve_column(table.as_deref(), column, row),
            Expr::Star { .. } => Err(EvaluatorError::new(
                "wildcard may only appear in a SELECT column list",
            )),
            Expr::Array(items) => {
                // An `IN` list evaluated standalone (e.g. nested
                // inside another array) collapses to its first item;
                // `binary_expression{IN}` is the only caller that
                // interprets `Array` specially.
                items
                    .first()
                    .map_or(Ok(Value::Null), |e| self.evaluate(e, row, group))
            }
            Expr::Binary {
                op,
                negated,
                left,
                right,
            } => self.evaluate_binary(*op, *negated, left, right, row, group),
            Expr::Function {
                name,
                args,
                distinct,
            } => self.evaluate_function(name, args, *distinct, row, group),
            Expr::Case { when, or_else } => self.evaluate_case(when, or_else.as_deref(), row, group),
            Expr::Select(query) => self.evaluate_scalar_subquery(query, row),
        }
    }

    /// Evaluates a `star{table?}` projection against `row`, returning
    /// `(output_name, value)` pairs in scope order.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] if a scope entry's key is missing
    /// from `row` — this indicates an internal pipeline bug (the
    /// scope always describes the row it was built from).
    pub fn evaluate_star(
        &self,
        table: Option<&str>,
        row: &Row,
    ) -> Result<Vec<(String, Value)>, EvaluatorError> {
        self.scope
            .iter()
            .filter(|entry| {
                !entry.qualifier.is_empty()
                    && table.map_or(true, |t| t == entry.qualifier)
            })
            .map(|entry| {
                let key = entry.key();
                let value = row
                    .get(&key)
                    .ok_or_else(|| EvaluatorError::new(format!("Unknown column '{key}'")))?;
                Ok((entry.column.clone(), value.clone()))
            })
            .collect()
    }

    fn resolve_column(
        &self,
        table: Option<&str>,
        column: &str,
        row: &Row,
    ) -> Result<Value, EvaluatorError> {
        match self.scope.resolve(table, column) {
            Ok(key) => Ok(row.get(&key).cloned().unwrap_or(Value::Null)),
            // A correlated scalar sub-query may reference a column
            // from its outer query's row, which isn't in this
            // evaluator's own scope. Fall back to a direct key lookup
            // against the outer context row before giving up.
            Err(err) => self
                .context
                .and_then(|ctx| {
                    let suffix = format!("::{column}");
                    ctx.iter().find_map(|(k, v)| {
                        let matches = table.map_or_else(
                            || k.ends_with(&suffix),
                            |t| *k == crate::row::qualified_key(t, column),
                        );
                        matches.then(|| v.clone())
                    })
                })
                .ok_or(err),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_binary(
        &self,
        op: BinaryOp,
        negated: bool,
        left: &Expr,
        right: &Expr,
        row: &Row,
        group: Option<Group<'_>>,
    ) -> Result<Value, EvaluatorError> {
        let result = match op {
            BinaryOp::And | BinaryOp::Or => {
                return self.evaluate_logical(op, left, right, row, group);
            }
            // `Is`/`IsNot`/`Not` are self-contained: they fold whatever
            // `negated` distinction they need into the op itself at
            // lift time and return directly, so the generic
            // `negated`-flip below (meant for `NOT IN`/`NOT LIKE`)
            // never re-negates an already-resolved boolean.
            BinaryOp::Is => {
                let value = self.evaluate(left, row, group)?;
                return Ok(Value::Boolean(value.is_null()));
            }
            BinaryOp::IsNot => {
                let value = self.evaluate(left, row, group)?;
                return Ok(Value::Boolean(!value.is_null()));
            }
            BinaryOp::Not => {
                let value = self.evaluate(left, row, group)?;
                return if value.is_null() {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Boolean(!value.is_truthy()))
                };
            }
            BinaryOp::In => {
                let needle = self.evaluate(left, row, group)?;
                let Expr::Array(items) = right else {
                    return Err(EvaluatorError::new("IN requires a value list"));
                };
                let mut found = false;
                for item in items {
                    let candidate = self.evaluate(item, row, group)?;
                    if !needle.is_null()
                        && !candidate.is_null()
                        && needle.compare(&candidate) == std::cmp::Ordering::Equal
                    {
                        found = true;
                        break;
                    }
                }
                Value::Boolean(found)
            }
            BinaryOp::Like => {
                let haystack = self.evaluate(left, row, group)?;
                let pattern = self.evaluate(right, row, group)?;
                if haystack.is_null() || pattern.is_null() {
                    return Ok(Value::Null);
                }
                Value::Boolean(like_matches(&haystack.to_string(), &pattern.to_string()))
            }
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => {
                let lhs = self.evaluate(left, row, group)?;
                let rhs = self.evaluate(right, row, group)?;
                if lhs.is_null() || rhs.is_null() {
                    return Ok(Value::Null);
                }
                use std::cmp::Ordering;
                let ord = lhs.compare(&rhs);
                let truth = match op {
                    BinaryOp::Eq => ord == Ordering::Equal,
                    BinaryOp::NotEq => ord != Ordering::Equal,
                    BinaryOp::Lt => ord == Ordering::Less,
                    BinaryOp::LtEq => ord != Ordering::Greater,
                    BinaryOp::Gt => ord == Ordering::Greater,
                    BinaryOp::GtEq => ord != Ordering::Less,
                    _ => unreachable!(),
                };
                Value::Boolean(truth)
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let lhs = self.evaluate(left, row, group)?;
                let rhs = self.evaluate(right, row, group)?;
                match (lhs.as_number(), rhs.as_number()) {
                    (Some(a), Some(b)) => arithmetic(op, a, b),
                    _ => Value::Null,
                }
            }
        };

        Ok(if negated {
            Value::Boolean(!result.is_truthy())
        } else {
            result
        })
    }

    fn evaluate_logical(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        row: &Row,
        group: Option<Group<'_>>,
    ) -> Result<Value, EvaluatorError> {
        let lhs = self.evaluate(left, row, group)?;

        // MySQL three-valued logic: AND short-circuits on a known
        // false, OR short-circuits on a known true without evaluating
        // the other side; otherwise a NULL operand makes the result
        // NULL unless the other operand alone already determines it.
        let lhs_known_false = !lhs.is_null() && !lhs.is_truthy();
        let lhs_known_true = !lhs.is_null() && lhs.is_truthy();
        match op {
            BinaryOp::And if lhs_known_false => return Ok(Value::Boolean(false)),
            BinaryOp::Or if lhs_known_true => return Ok(Value::Boolean(true)),
            _ => {}
        }

        let rhs = self.evaluate(right, row, group)?;
        let rhs_known_false = !rhs.is_null() && !rhs.is_truthy();
        let rhs_known_true = !rhs.is_null() && rhs.is_truthy();

        Ok(match op {
            BinaryOp::And if rhs_known_false => Value::Boolean(false),
            BinaryOp::Or if rhs_known_true => Value::Boolean(true),
            _ if lhs.is_null() || rhs.is_null() => Value::Null,
            BinaryOp::And => Value::Boolean(lhs_known_true && rhs_known_true),
            BinaryOp::Or => Value::Boolean(lhs_known_true || rhs_known_true),
            _ => unreachable!(),
        })
    }

    fn evaluate_case(
        &self,
        when: &[(Expr, Expr)],
        or_else: Option<&Expr>,
        row: &Row,
        group: Option<Group<'_>>,
    ) -> Result<Value, EvaluatorError> {
        for (cond, value) in when {
            if self.evaluate(cond, row, group)?.is_truthy() {
                return self.evaluate(value, row, group);
            }
        }
        or_else.map_or(Ok(Value::Null), |e| self.evaluate(e, row, group))
    }

    fn evaluate_function(
        &self,
        name: &str,
        args: &[Expr],
        distinct: bool,
        row: &Row,
        group: Option<Group<'_>>,
    ) -> Result<Value, EvaluatorError> {
        match name {
            "database" => return Ok(self.server.current_database_value()),
            "count" | "sum" | "avg" | "min" | "max" => {
                let Some(group) = group else {
                    return Err(EvaluatorError::new(format!(
                        "aggregate function {name}() used without a group"
                    )));
                };
                return self.evaluate_aggregate(name, args, distinct, group);
            }
            _ => {}
        }
        Err(EvaluatorError::new(format!("unknown function '{name}'")))
    }

    fn evaluate_aggregate(
        &self,
        name: &str,
        args: &[Expr],
        distinct: bool,
        group: Group<'_>,
    ) -> Result<Value, EvaluatorError> {
        let is_star = matches!(args.first(), Some(Expr::Star { .. })) || args.is_empty();

        if name == "count" && is_star {
            return Ok(Value::Integer(group.len() as i64));
        }

        let arg = args.first().ok_or_else(|| {
            EvaluatorError::new(format!("{name}() requires exactly one argument"))
        })?;

        let mut values = Vec::new();
        for row in group {
            let v = self.evaluate(arg, row, Some(group))?;
            if !v.is_null() {
                values.push(v);
            }
        }

        if distinct {
            let mut seen = HashSet::new();
            values.retain(|v| seen.insert(v.to_string()));
        }

        Ok(match name {
            "count" => Value::Integer(values.len() as i64),
            "sum" => {
                if values.is_empty() {
                    Value::Null
                } else {
                    Value::Float(values.iter().filter_map(Value::as_number).sum())
                }
            }
            "avg" => {
                if values.is_empty() {
                    Value::Null
                } else {
                    let total: f64 = values.iter().filter_map(Value::as_number).sum();
                    Value::Float(total / values.len() as f64)
                }
            }
            "min" => values
                .into_iter()
                .min_by(Value::compare)
                .unwrap_or(Value::Null),
            "max" => values
                .into_iter()
                .max_by(Value::compare)
                .unwrap_or(Value::Null),
            _ => unreachable!(),
        })
    }

    fn evaluate_scalar_subquery(
        &self,
        query: &crate::query::SelectQuery,
        row: &Row,
    ) -> Result<Value, EvaluatorError> {
        let rows = crate::select_pipeline::run_select(self.server, query, Some(row))
            .map_err(|e| EvaluatorError::new(e.to_string()))?;

        if rows.len() > 1 {
            return Err(EvaluatorError::new("Subquery returns more than 1 row"));
        }

        Ok(rows
            .first()
            .and_then(|r| r.values().next())
            .cloned()
            .unwrap_or(Value::Null))
    }
}

fn arithmetic(op: BinaryOp, a: f64, b: f64) -> Value {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Value::Null;
            }
            a / b
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Value::Null;
            }
            a % b
        }
        _ => unreachable!(),
    };
    if result.fract() == 0.0 && result.abs() < i64::MAX as f64 {
        Value::Integer(result as i64)
    } else {
        Value::Float(result)
    }
}

/// Translates a SQL `LIKE` pattern (`%`, `_`, backslash escape) into a
/// compiled regex and matches `haystack` against it, case-insensitively
/// to match MySQL's default collation behavior for ASCII text.
fn like_matches(haystack: &str, pattern: &str) -> bool {
    let mut regex_pattern = String::from("(?is)^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    regex_pattern.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            '%' => regex_pattern.push_str(".*"),
            '_' => regex_pattern.push('.'),
            other => regex_pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex_pattern.push('$');

    Regex::new(&regex_pattern).is_ok_and(|re| re.is_match(haystack))
}
