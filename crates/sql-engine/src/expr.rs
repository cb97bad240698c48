//! The engine's own expression tree, lifted from `sql_ast::Expr`.
//!
//! Column references are carried through the lift with their qualifier
//! exactly as written (alias or base table name, or absent) — the
//! distinction only matters once the Evaluator resolves the reference
//! against a live [`crate::row::Scope`] (see [`crate::evaluator`]), so
//! no separate alias-rewriting pass runs here.

use sql_ast::ast::{self, BinaryOp as AstBinaryOp, Literal};

use crate::error::EngineError;
use crate::value::Value;

/// A binary operator, restricted to the set the Evaluator implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `=`
    Eq,
    /// `!=` / `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `IN` / `NOT IN` (negation carried by the caller)
    In,
    /// `LIKE`
    Like,
    /// `IS NULL` desugaring target: true iff `left` is NULL. Not
    /// negatable through the `negated` flag — `IS NOT NULL` lifts to
    /// [`Self::IsNot`] instead, so this op's result is never re-flipped.
    Is,
    /// `IS NOT NULL` desugaring target: true iff `left` is not NULL.
    /// Same non-negatable contract as [`Self::Is`].
    IsNot,
    /// Generic boolean negation: `NOT expr` and negated `BETWEEN`
    /// desugar here. Inverts `left`'s truthiness, propagating NULL
    /// (`NOT NULL` stays NULL) rather than negating a null-check.
    Not,
}

/// The engine-internal expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal number, string, boolean, or NULL.
    Literal(Value),
    /// `DEFAULT`, only legal inside an INSERT value list.
    Default,
    /// A (possibly still-aliased) column reference.
    ColumnRef {
        /// The qualifier as written by the user: a table name, an
        /// alias, or absent.
        table: Option<String>,
        /// The column name.
        column: String,
    },
    /// `*` or `t.*` in a SELECT list.
    Star {
        /// The qualifier as written by the user, if any.
        table: Option<String>,
    },
    /// The right-hand side of `IN`.
    Array(Vec<Expr>),
    /// A binary expression.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Whether the result is negated (`NOT IN`, `IS NOT`, `NOT
        /// BETWEEN` desugar to this).
        negated: bool,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// A scalar or aggregate function call.
    Function {
        /// The lower-cased function name.
        name: String,
        /// Arguments.
        args: Vec<Expr>,
        /// Whether `DISTINCT` was specified (aggregates only).
        distinct: bool,
    },
    /// A `CASE` expression.
    Case {
        /// `WHEN condition THEN value` pairs, in order.
        when: Vec<(Expr, Expr)>,
        /// The `ELSE` branch, if any.
        or_else: Option<Box<Expr>>,
    },
    /// A scalar sub-query.
    Select(Box<crate::query::SelectQuery>),
}

impl Expr {
    /// Lifts a parsed `sql_ast::Expr` into the engine's expression
    /// tree, substituting `params` for parameter placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the expression uses a construct the
    /// engine's pipeline does not support (currently: none — every
    /// `sql_ast::Expr` variant lowers to something).
    pub fn lift(expr: &ast::Expr, params: &[Value]) -> Result<Self, EngineError> {
        Ok(match expr {
            ast::Expr::Literal(lit) => Self::Literal(lift_literal(lit)),
            ast::Expr::Column { table, name, .. } => Self::ColumnRef {
                table: table.clone(),
                column: name.clone(),
            },
            ast::Expr::Wildcard { table } => Self::Star {
                table: table.clone(),
            },
            ast::Expr::Binary { left, op, right } => {
                let (op, negated) = lift_binary_op(*op)?;
                Self::Binary {
                    op,
                    negated,
                    left: Box::new(Self::lift(left, params)?),
                    right: Box::new(Self::lift(right, params)?),
                }
            }
            ast::Expr::Unary { op, operand } => lift_unary(*op, Self::lift(operand, params)?),
            ast::Expr::Function(call) => Self::Function {
                name: call.name.to_lowercase(),
                args: call
                    .args
                    .iter()
                    .map(|a| Self::lift(a, params))
                    .collect::<Result<_, _>>()?,
                distinct: call.distinct,
            },
            ast::Expr::Subquery(select) => {
                Self::Select(Box::new(crate::query::SelectQuery::lift(select, params)?))
            }
            ast::Expr::IsNull { expr, negated } => Self::Binary {
                op: if *negated { BinaryOp::IsNot } else { BinaryOp::Is },
                negated: false,
                left: Box::new(Self::lift(expr, params)?),
                right: Box::new(Self::Literal(Value::Null)),
            },
            ast::Expr::In {
                expr,
                list,
                negated,
            } => Self::Binary {
                op: BinaryOp::In,
                negated: *negated,
                left: Box::new(Self::lift(expr, params)?),
                right: Box::new(Self::Array(
                    list.iter()
                        .map(|e| Self::lift(e, params))
                        .collect::<Result<_, _>>()?,
                )),
            },
            ast::Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let value = Self::lift(expr, params)?;
                let ge_low = Self::Binary {
                    op: BinaryOp::GtEq,
                    negated: false,
                    left: Box::new(value.clone()),
                    right: Box::new(Self::lift(low, params)?),
                };
                let le_high = Self::Binary {
                    op: BinaryOp::LtEq,
                    negated: false,
                    left: Box::new(value),
                    right: Box::new(Self::lift(high, params)?),
                };
                let between = Self::Binary {
                    op: BinaryOp::And,
                    negated: false,
                    left: Box::new(ge_low),
                    right: Box::new(le_high),
                };
                if *negated {
                    Self::Binary {
                        op: BinaryOp::Not,
                        negated: false,
                        left: Box::new(between),
                        right: Box::new(Self::Literal(Value::Null)),
                    }
                } else {
                    between
                }
            }
            ast::Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => lift_case(operand.as_deref(), when_clauses, else_clause.as_deref(), params)?,
            ast::Expr::Cast { expr, .. } => Self::lift(expr, params)?,
            ast::Expr::Paren(inner) => Self::lift(inner, params)?,
            ast::Expr::Parameter { position, .. } => {
                let value = params.get(position.saturating_sub(1)).cloned();
                Self::Literal(value.unwrap_or(Value::Null))
            }
        })
    }
}

fn lift_literal(lit: &Literal) -> Value {
    match lit {
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Null => Value::Null,
        Literal::Blob(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

fn lift_binary_op(op: AstBinaryOp) -> Result<(BinaryOp, bool), EngineError> {
    Ok(match op {
        AstBinaryOp::Eq => (BinaryOp::Eq, false),
        AstBinaryOp::NotEq => (BinaryOp::NotEq, false),
        AstBinaryOp::Lt => (BinaryOp::Lt, false),
        AstBinaryOp::LtEq => (BinaryOp::LtEq, false),
        AstBinaryOp::Gt => (BinaryOp::Gt, false),
        AstBinaryOp::GtEq => (BinaryOp::GtEq, false),
        AstBinaryOp::Add => (BinaryOp::Add, false),
        AstBinaryOp::Sub => (BinaryOp::Sub, false),
        AstBinaryOp::Mul => (BinaryOp::Mul, false),
        AstBinaryOp::Div => (BinaryOp::Div, false),
        AstBinaryOp::Mod => (BinaryOp::Mod, false),
        AstBinaryOp::And => (BinaryOp::And, false),
        AstBinaryOp::Or => (BinaryOp::Or, false),
        AstBinaryOp::Like => (BinaryOp::Like, false),
        // Concatenation and bitwise operators fall outside the
        // declared operator set (§3); the parser accepts them for
        // dialects the scenarios never exercise against this engine.
        AstBinaryOp::Concat
        | AstBinaryOp::BitAnd
        | AstBinaryOp::BitOr
        | AstBinaryOp::LeftShift
        | AstBinaryOp::RightShift => {
            return Err(crate::error::ProcessorError::new(format!(
                "operator '{}' is not supported",
                op.as_str()
            ))
            .into());
        }
    })
}

fn lift_unary(op: ast::UnaryOp, operand: Expr) -> Expr {
    match op {
        ast::UnaryOp::Not => Expr::Binary {
            op: BinaryOp::Not,
            negated: false,
            left: Box::new(operand),
            right: Box::new(Expr::Literal(Value::Null)),
        },
        ast::UnaryOp::Neg => Expr::Binary {
            op: BinaryOp::Sub,
            negated: false,
            left: Box::new(Expr::Literal(Value::Integer(0))),
            right: Box::new(operand),
        },
        ast::UnaryOp::BitNot => operand,
    }
}

fn lift_case(
    operand: Option<&ast::Expr>,
    when_clauses: &[(ast::Expr, ast::Expr)],
    else_clause: Option<&ast::Expr>,
    params: &[Value],
) -> Result<Expr, EngineError> {
    let when = when_clauses
        .iter()
        .map(|(cond, value)| {
            let cond = if let Some(operand) = operand {
                Expr::Binary {
                    op: BinaryOp::Eq,
                    negated: false,
                    left: Box::new(Expr::lift(operand, params)?),
                    right: Box::new(Expr::lift(cond, params)?),
                }
            } else {
                Expr::lift(cond, params)?
            };
            Ok((cond, Expr::lift(value, params)?))
        })
        .collect::<Result<_, EngineError>>()?;
    let or_else = else_clause
        .map(|e| Expr::lift(e, params))
        .transpose()?
        .map(Box::new);
    Ok(Expr::Case { when, or_else })
}
