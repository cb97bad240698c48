//! Runtime scalar values and the errors raised while casting them into a
//! column's declared type.

use std::cmp::Ordering;
use std::fmt;

/// A runtime scalar value.
///
/// `Default` is a transient marker: it may only appear in the value
/// positions of an `INSERT ... VALUES` list and must never escape the
/// Insert Processor (see [`crate::insert`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A signed 64-bit integer. Column-level range checks happen at cast
    /// time, not here; this variant holds any in-range `i64`.
    Integer(i64),
    /// A double-precision float.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// A boolean.
    Boolean(bool),
    /// SQL NULL.
    Null,
    /// `DEFAULT` in an INSERT value list.
    Default,
}

impl Value {
    /// Returns true if this value is SQL NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// MySQL truthiness: non-zero numbers and non-empty, non-"0" strings
    /// are truthy; NULL is never truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null | Self::Default => false,
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::String(s) => !s.is_empty() && s != "0",
        }
    }

    /// Coerces to a number for arithmetic and aggregate functions. Returns
    /// `None` for values with no sensible numeric reading (NULL included;
    /// callers treat that as "skip" for aggregates and "null" for
    /// arithmetic).
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::String(s) => s.trim().parse::<f64>().ok(),
            Self::Null | Self::Default => None,
        }
    }

    /// Orders two values the way MySQL's `MIN`/`MAX`/`ORDER BY` do:
    /// dispatched on variant, not on whether the text happens to look
    /// numeric. Two strings always compare lexicographically — a
    /// `VARCHAR` column holding `"10"`/`"2"`/`"9"` sorts as text, not as
    /// numbers, even though every value parses as one. A numeric value
    /// against a string (e.g. `id = '2'`) still coerces the string to a
    /// number, matching MySQL's cross-type comparison rules. NULLs are
    /// handled by the caller (they sort first under ASC, per §4.5(4) of
    /// the design).
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a.cmp(b),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => self.to_string().cmp(&other.to_string()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Boolean(b) => write!(f, "{}", u8::from(*b)),
            Self::Null => write!(f, ""),
            Self::Default => write!(f, "DEFAULT"),
        }
    }
}

/// The machine-readable kind of a cast failure, used by the Insert
/// Processor to decide which errors get rewritten with a row index (see
/// §4.6 step 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastErrorKind {
    /// A value fell outside the column's declared range (integer width,
    /// `VARCHAR(n)` length, ...).
    OutOfRangeValue,
    /// A value could not be interpreted as an integer at all.
    IncorrectIntegerValue,
    /// A value could not be parsed as a `DATETIME`.
    IncorrectDatetimeValue,
    /// NULL was assigned to a non-nullable column with no default.
    BadNull,
}

/// An error raised by [`crate::column::Column::cast`].
#[derive(Debug, Clone, PartialEq)]
pub struct CastError {
    /// The error kind.
    pub kind: CastErrorKind,
    /// A human-readable, MySQL-flavored message.
    pub message: String,
}

impl CastError {
    /// Builds an out-of-range error for `column` given the offending value.
    #[must_use]
    pub fn out_of_range(column: &str, value: &Value) -> Self {
        Self {
            kind: CastErrorKind::OutOfRangeValue,
            message: format!("Out of range value for column '{column}' at row 1: '{value}'"),
        }
    }

    /// Builds an incorrect-integer error for `column` given the offending
    /// value.
    #[must_use]
    pub fn incorrect_integer(column: &str, value: &Value) -> Self {
        Self {
            kind: CastErrorKind::IncorrectIntegerValue,
            message: format!(
                "Incorrect integer value: '{value}' for column '{column}' at row 1"
            ),
        }
    }

    /// Builds an incorrect-datetime error for `column` given the offending
    /// value.
    #[must_use]
    pub fn incorrect_datetime(column: &str, value: &Value) -> Self {
        Self {
            kind: CastErrorKind::IncorrectDatetimeValue,
            message: format!(
                "Incorrect datetime value: '{value}' for column '{column}' at row 1"
            ),
        }
    }

    /// Builds the "doesn't have a default value" error MySQL raises for a
    /// NULL assigned to a `NOT NULL` column.
    #[must_use]
    pub fn bad_null(column: &str) -> Self {
        Self {
            kind: CastErrorKind::BadNull,
            message: format!("Field '{column}' doesn't have a default value"),
        }
    }

    /// Rewrites the trailing `at row 1` placeholder the message builders
    /// above use with the real row index, per §4.6 step 3. Only
    /// `OUT_OF_RANGE_VALUE` and `INCORRECT_INTEGER_VALUE` get rewritten —
    /// other kinds propagate untouched.
    #[must_use]
    pub fn at_row(mut self, row_index_one_based: usize) -> Self {
        if matches!(
            self.kind,
            CastErrorKind::OutOfRangeValue | CastErrorKind::IncorrectIntegerValue
        ) {
            if let Some(pos) = self.message.rfind("at row ") {
                self.message.truncate(pos);
                self.message.push_str(&format!("at row {row_index_one_based}"));
            }
        }
        self
    }
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CastError {}
