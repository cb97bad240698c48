//! The `Server`/`Database`/`Table` facade the Select Pipeline and
//! Insert Processor run against.
//!
//! There is no separate storage crate in this workspace (§2), so
//! `sql-engine` carries a minimal in-memory implementation of the
//! interface described in §6 itself.

use std::collections::BTreeMap;

use tracing::debug;

use crate::column::Column;
use crate::error::{EngineError, ProcessorError};
use crate::row::Row;
use crate::value::Value;

/// A single table: its column definitions and its rows, in insertion
/// order.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Row>,
    next_auto_increment: i64,
}

impl Table {
    /// Creates an empty table with the given column definitions.
    #[must_use]
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            next_auto_increment: 1,
        }
    }

    /// The table's column definitions, in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The table's rows, in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Appends a fully-cast row.
    pub fn insert_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Returns the next auto-increment value and advances the
    /// counter.
    pub fn next_auto_increment_value(&mut self) -> i64 {
        let value = self.next_auto_increment;
        self.next_auto_increment += 1;
        value
    }
}

/// A named collection of tables.
#[derive(Debug, Clone, Default)]
pub struct Database {
    tables: BTreeMap<String, Table>,
}

impl Database {
    /// An empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table, replacing any existing table of the same
    /// name.
    pub fn create_table(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), table);
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Looks up a table by name, mutably.
    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }
}

/// Builder-style configuration for constructing a [`Server`], mirroring
/// the teacher corpus's builder-method idiom.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    default_database: String,
}

impl ServerConfig {
    /// Starts a config with `name` as the default (and, at
    /// construction, only) database.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            default_database: name.into(),
        }
    }

    /// Builds the `Server`.
    #[must_use]
    pub fn build(self) -> Server {
        let mut databases = BTreeMap::new();
        databases.insert(self.default_database.clone(), Database::new());
        Server {
            databases,
            current_database: self.default_database,
        }
    }
}

/// The root of the in-memory store: named databases plus a "current
/// database" used to resolve unqualified table references.
#[derive(Debug, Clone)]
pub struct Server {
    databases: BTreeMap<String, Database>,
    current_database: String,
}

impl Server {
    /// The name of the current database, used by `database()` and by
    /// unqualified table/schema resolution.
    #[must_use]
    pub fn current_database_name(&self) -> &str {
        &self.current_database
    }

    /// Resolves a database by name, falling back to the current
    /// database when `name` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the named database doesn't exist.
    pub fn database(&self, name: Option<&str>) -> Result<&Database, EngineError> {
        let name = name.unwrap_or(&self.current_database);
        self.databases
            .get(name)
            .ok_or_else(|| ProcessorError::new(format!("Unknown database '{name}'")).into())
    }

    /// Resolves a database by name mutably, falling back to the
    /// current database when `name` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the named database doesn't exist.
    pub fn database_mut(&mut self, name: Option<&str>) -> Result<&mut Database, EngineError> {
        let name = name.unwrap_or(&self.current_database).to_string();
        self.databases
            .get_mut(&name)
            .ok_or_else(|| ProcessorError::new(format!("Unknown database '{name}'")).into())
    }

    /// Resolves a table within `database` (or the current database),
    /// per §6.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the database or table doesn't exist.
    pub fn table(&self, database: Option<&str>, table: &str) -> Result<&Table, EngineError> {
        self.database(database)?
            .table(table)
            .ok_or_else(|| ProcessorError::new(format!("Table '{table}' doesn't exist")).into())
    }

    /// Inserts `row` into `table` within `database` (or the current
    /// database).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the database or table doesn't exist.
    pub fn insert_row(
        &mut self,
        database: Option<&str>,
        table: &str,
        row: Row,
    ) -> Result<(), EngineError> {
        let table_name = table.to_string();
        let db = self.database_mut(database)?;
        let t = db
            .table_mut(&table_name)
            .ok_or_else(|| ProcessorError::new(format!("Table '{table_name}' doesn't exist")))?;
        debug!(table = %table_name, "inserting row");
        t.insert_row(row);
        Ok(())
    }

    /// Creates a table in `database` (or the current database).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the database doesn't exist.
    pub fn create_table(
        &mut self,
        database: Option<&str>,
        name: &str,
        table: Table,
    ) -> Result<(), EngineError> {
        self.database_mut(database)?.create_table(name, table);
        Ok(())
    }

    /// Evaluates `database()`: the current database's name as a
    /// string value.
    #[must_use]
    pub fn current_database_value(&self) -> Value {
        Value::String(self.current_database.clone())
    }
}
