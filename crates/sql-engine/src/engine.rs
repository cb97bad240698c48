//! The engine's dispatcher: lifts a parsed `sql_ast::Statement` and
//! drives it through the right stage (§6, "Engine API (exposed)").

use tracing::info;

use crate::error::EngineError;
use crate::insert::{run_insert, InsertResult};
use crate::query::Query;
use crate::row::Row;
use crate::select_pipeline::run_select;
use crate::storage::{Server, ServerConfig, Table};
use crate::value::Value;

/// The result of `Engine::execute`: a row stream for `SELECT`, an
/// affected-rows/`insertId` summary for `INSERT`, or a bare
/// acknowledgment for `CREATE TABLE`/transaction statements.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// `SELECT` output rows, bare-keyed, in final order.
    Rows(Vec<Row>),
    /// `INSERT` summary.
    Insert(InsertResult),
    /// `CREATE TABLE` or a transaction-control statement: acknowledged,
    /// no result payload.
    Acknowledged,
}

impl ExecutionResult {
    /// Returns the row stream, if this is a `SELECT` result.
    #[must_use]
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Self::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Returns the INSERT summary, if this is an `INSERT` result.
    #[must_use]
    pub const fn insert(&self) -> Option<InsertResult> {
        match self {
            Self::Insert(r) => Some(*r),
            _ => None,
        }
    }
}

/// The engine: a `Server` plus the `execute` entry point.
///
/// Construct with [`ServerConfig`] for a server carrying a single
/// named default database, then run statements already parsed by
/// `sql_ast::Parser` against it.
#[derive(Debug, Clone)]
pub struct Engine {
    server: Server,
}

impl Engine {
    /// Wraps an already-built [`Server`].
    #[must_use]
    pub const fn new(server: Server) -> Self {
        Self { server }
    }

    /// Builds an engine with a single default database named `database`.
    #[must_use]
    pub fn with_default_database(database: impl Into<String>) -> Self {
        Self::new(ServerConfig::new(database).build())
    }

    /// The underlying storage facade.
    #[must_use]
    pub const fn server(&self) -> &Server {
        &self.server
    }

    /// The underlying storage facade, mutably — for host code that
    /// needs to seed tables directly rather than through `CREATE
    /// TABLE`/`INSERT` statements.
    pub fn server_mut(&mut self) -> &mut Server {
        &mut self.server
    }

    /// Executes one already-parsed statement, substituting `params`
    /// for any positional/named parameters it contains.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for any failure raised while lifting or
    /// running the statement — see §7 for the full taxonomy.
    pub fn execute(
        &mut self,
        statement: &sql_ast::ast::Statement,
        params: &[Value],
    ) -> Result<ExecutionResult, EngineError> {
        let query = Query::lift(statement, params)?;
        info!(?query, "executing query");
        self.execute_query(&query)
    }

    fn execute_query(&mut self, query: &Query) -> Result<ExecutionResult, EngineError> {
        match query {
            Query::Select(select) => {
                let rows = run_select(&self.server, select, None)?;
                Ok(ExecutionResult::Rows(rows))
            }
            Query::Insert(insert) => {
                let result = run_insert(&mut self.server, insert)?;
                Ok(ExecutionResult::Insert(result))
            }
            Query::CreateTable(create) => {
                let table = Table::new(create.columns.iter().map(|c| c.column.clone()).collect());
                self.server
                    .create_table(create.schema.as_deref(), &create.table, table)?;
                Ok(ExecutionResult::Acknowledged)
            }
            Query::Transaction(_) => Ok(ExecutionResult::Acknowledged),
        }
    }
}
