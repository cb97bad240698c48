//! Runtime rows and the column scope that resolves references against
//! them.

use std::collections::HashMap;

use crate::error::EvaluatorError;
use crate::value::Value;

/// A runtime row: a mapping from qualified key to value.
///
/// Keys flowing between pipeline stages are always qualified, either
/// `table::column` or `::alias`; bare keys appear only in the final
/// output rows handed back to the caller.
pub type Row = HashMap<String, Value>;

/// Builds the `table::column` qualified key.
#[must_use]
pub fn qualified_key(table: &str, column: &str) -> String {
    format!("{table}::{column}")
}

/// Builds the `::alias` qualified key used for SELECT-projected
/// aliases visible to HAVING.
#[must_use]
pub fn alias_key(alias: &str) -> String {
    format!("::{alias}")
}

/// One entry of the ordered scope list: a qualifier (table/alias name,
/// or empty for an alias-scope entry) paired with the column name it
/// exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeEntry {
    /// The table or alias this column belongs to. Empty for `::alias`
    /// entries.
    pub qualifier: String,
    /// The column (or alias) name.
    pub column: String,
}

impl ScopeEntry {
    /// Builds a base-table scope entry.
    #[must_use]
    pub fn table_column(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            column: column.into(),
        }
    }

    /// Builds an alias-scope entry (`::alias`).
    #[must_use]
    pub fn alias(column: impl Into<String>) -> Self {
        Self {
            qualifier: String::new(),
            column: column.into(),
        }
    }

    /// The qualified key this entry addresses.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}::{}", self.qualifier, self.column)
    }
}

/// The ordered list of columns currently visible to the evaluator. New
/// entries are appended as `FROM` sources and `SELECT` aliases are
/// processed; entries are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope(Vec<ScopeEntry>);

impl Scope {
    /// An empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: ScopeEntry) {
        self.0.push(entry);
    }

    /// Iterates the scope in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ScopeEntry> {
        self.0.iter()
    }

    /// Resolves a (possibly qualified) column reference per §4.3:
    /// `T::c`, then `::c` (alias scope), and — only when `table` is
    /// absent — a single unqualified match.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluatorError`] when no source matches ("Unknown
    /// column") or, for an unqualified reference, when more than one
    /// source matches ("ambiguous").
    pub fn resolve(&self, table: Option<&str>, column: &str) -> Result<String, EvaluatorError> {
        if let Some(table) = table {
            let key = qualified_key(table, column);
            if self.0.iter().any(|e| e.key() == key) {
                return Ok(key);
            }
            let alias = alias_key(column);
            if table.is_empty() && self.0.iter().any(|e| e.key() == alias) {
                return Ok(alias);
            }
            return Err(EvaluatorError::new(format!("Unknown column '{table}.{column}'")));
        }

        let alias = alias_key(column);
        if self.0.iter().any(|e| e.key() == alias) {
            return Ok(alias);
        }

        let matches: Vec<_> = self
            .0
            .iter()
            .filter(|e| e.column == column && !e.qualifier.is_empty())
            .collect();

        match matches.as_slice() {
            [] => Err(EvaluatorError::new(format!("Unknown column '{column}'"))),
            [single] => Ok(single.key()),
            _ => Err(EvaluatorError::new(format!(
                "Column '{column}' in field list is ambiguous"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Scope {
        let mut s = Scope::new();
        s.push(ScopeEntry::table_column("u", "id"));
        s.push(ScopeEntry::table_column("p", "id"));
        s
    }

    #[test]
    fn resolves_qualified_reference_directly() {
        let s = scope();
        assert_eq!(s.resolve(Some("u"), "id").unwrap(), "u::id");
    }

    #[test]
    fn unqualified_ambiguous_reference_errors() {
        let s = scope();
        let err = s.resolve(None, "id").unwrap_err();
        assert!(err.message.contains("ambiguous"));
    }

    #[test]
    fn unqualified_unique_reference_resolves() {
        let mut s = scope();
        s.push(ScopeEntry::table_column("p", "body"));
        assert_eq!(s.resolve(None, "body").unwrap(), "p::body");
    }

    #[test]
    fn unknown_column_errors() {
        let s = scope();
        let err = s.resolve(None, "nope").unwrap_err();
        assert!(err.message.contains("Unknown column"));
    }

    #[test]
    fn alias_scope_entry_is_checked_before_ambiguity() {
        let mut s = scope();
        s.push(ScopeEntry::alias("total"));
        assert_eq!(s.resolve(None, "total").unwrap(), "::total");
    }
}
