//! Column definitions and the per-kind `cast` rules of §4.1.

use chrono::NaiveDateTime;

use crate::expr::Expr;
use crate::value::{CastError, Value};

/// Integer storage width, mirroring MySQL's `TINYINT`/`SMALLINT`/
/// `MEDIUMINT`/`INT`/`BIGINT` family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    /// `TINYINT` (8-bit).
    Tiny,
    /// `SMALLINT` (16-bit).
    Small,
    /// `MEDIUMINT` (24-bit).
    Medium,
    /// `INT`/`INTEGER` (32-bit).
    Int,
    /// `BIGINT` (64-bit).
    Big,
}

impl IntWidth {
    /// Inclusive range for this width and signedness. `BIGINT UNSIGNED`'s
    /// true upper bound (`2^64-1`) does not fit in `i64`; this engine
    /// clamps it to `i64::MAX` since every other `Value::Integer` is
    /// stored as `i64` — documented as a simplification in DESIGN.md.
    #[must_use]
    pub const fn range(self, unsigned: bool) -> (i64, i64) {
        match (self, unsigned) {
            (Self::Tiny, false) => (i8::MIN as i64, i8::MAX as i64),
            (Self::Tiny, true) => (0, u8::MAX as i64),
            (Self::Small, false) => (i16::MIN as i64, i16::MAX as i64),
            (Self::Small, true) => (0, u16::MAX as i64),
            (Self::Medium, false) => (-(1 << 23), (1 << 23) - 1),
            (Self::Medium, true) => (0, (1 << 24) - 1),
            (Self::Int, false) => (i32::MIN as i64, i32::MAX as i64),
            (Self::Int, true) => (0, u32::MAX as i64),
            (Self::Big, false) => (i64::MIN, i64::MAX),
            (Self::Big, true) => (0, i64::MAX),
        }
    }
}

/// The tagged variant a column's type is represented as, per the design
/// note in §9 ("dynamic dispatch on Column... a tagged variant rather
/// than inheritance").
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// A fixed-width integer, optionally `UNSIGNED`, optionally
    /// `AUTO_INCREMENT`.
    Integer {
        /// Storage width.
        width: IntWidth,
        /// Whether the column is `UNSIGNED`.
        unsigned: bool,
        /// Whether the column is `AUTO_INCREMENT`. Only meaningful on
        /// `Integer` columns, per §9.
        auto_increment: bool,
    },
    /// A double-precision floating column (`FLOAT`/`DOUBLE`/`REAL`).
    Float,
    /// A bounded string (`VARCHAR(n)`/`CHAR(n)`).
    Varchar(u32),
    /// An unbounded string (`TEXT`).
    Text,
    /// A boolean column.
    Boolean,
    /// A timestamp column (`DATETIME`/`TIMESTAMP`/`DATE`).
    Datetime,
}

/// A column definition: name, type, nullability, and default/
/// auto-increment behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// The type-tagged variant.
    pub kind: ColumnKind,
    /// Whether NULL is a legal value.
    pub nullable: bool,
    /// The column's `DEFAULT` expression, if any.
    pub default_expr: Option<Expr>,
}

impl Column {
    /// Whether this is an `AUTO_INCREMENT` integer column.
    #[must_use]
    pub const fn has_auto_increment(&self) -> bool {
        matches!(
            self.kind,
            ColumnKind::Integer {
                auto_increment: true,
                ..
            }
        )
    }

    /// Applies this column's cast rules to `value`, per §4.1.
    ///
    /// # Errors
    ///
    /// Returns [`CastError`] when `value` cannot be represented in this
    /// column (wrong shape, out of range, or NULL into a non-nullable
    /// column).
    pub fn cast(&self, value: &Value) -> Result<Value, CastError> {
        if value.is_null() {
            return if self.nullable {
                Ok(Value::Null)
            } else {
                Err(CastError::bad_null(&self.name))
            };
        }

        match &self.kind {
            ColumnKind::Integer {
                width, unsigned, ..
            } => self.cast_integer(value, *width, *unsigned),
            ColumnKind::Float => Ok(Value::Float(value.as_number().ok_or_else(|| {
                CastError::incorrect_integer(&self.name, value)
            })?)),
            ColumnKind::Varchar(max_len) => self.cast_varchar(value, Some(*max_len)),
            ColumnKind::Text => self.cast_varchar(value, None),
            ColumnKind::Boolean => Ok(Value::Boolean(value.is_truthy())),
            ColumnKind::Datetime => self.cast_datetime(value),
        }
    }

    fn cast_integer(
        &self,
        value: &Value,
        width: IntWidth,
        unsigned: bool,
    ) -> Result<Value, CastError> {
        let parsed = match value {
            Value::Integer(i) => Some(*i),
            Value::Boolean(b) => Some(i64::from(*b)),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        let Some(parsed) = parsed else {
            return Err(CastError::incorrect_integer(&self.name, value));
        };

        let (min, max) = width.range(unsigned);
        if parsed < min || parsed > max {
            return Err(CastError::out_of_range(&self.name, value));
        }

        Ok(Value::Integer(parsed))
    }

    fn cast_varchar(&self, value: &Value, max_len: Option<u32>) -> Result<Value, CastError> {
        let s = value.to_string();
        if let Some(max_len) = max_len {
            if s.chars().count() > max_len as usize {
                return Err(CastError::out_of_range(&self.name, value));
            }
        }
        Ok(Value::String(s))
    }

    fn cast_datetime(&self, value: &Value) -> Result<Value, CastError> {
        let text = match value {
            Value::String(s) => s.clone(),
            _ => value.to_string(),
        };
        let parsed = NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| {
                chrono::NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                    .map(|d| d.and_hms_opt(0, 0, 0).expect("midnight is always valid"))
            })
            .map_err(|_| CastError::incorrect_datetime(&self.name, value))?;
        Ok(Value::String(parsed.format("%Y-%m-%d %H:%M:%S").to_string()))
    }
}
