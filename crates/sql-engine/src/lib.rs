//! # sql-engine
//!
//! An in-process, single-node query execution engine for a MySQL-like
//! subset of SQL: given a parsed [`sql_ast::ast::Statement`], runs it
//! against an in-memory [`storage::Server`] and returns either a row
//! stream (`SELECT`) or an affected-rows/`insertId` summary
//! (`INSERT`).
//!
//! The core is the [`select_pipeline`]'s six-stage relational executor
//! (FROM/JOIN → WHERE → GROUP BY → ORDER BY → SELECT/HAVING → LIMIT),
//! driven throughout by the [`evaluator`]'s expression interpreter, and
//! the [`insert`] processor's row-materialization/cast pipeline.
//! [`engine::Engine`] is the single entry point a host embeds.
//!
//! ```rust
//! use sql_ast::Parser;
//! use sql_engine::engine::Engine;
//!
//! let mut engine = Engine::with_default_database("mydb");
//! let stmt = Parser::new("SELECT database()").parse_statement().unwrap();
//! let result = engine.execute(&stmt, &[]).unwrap();
//! assert_eq!(result.rows().unwrap().len(), 1);
//! ```

pub mod column;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod insert;
pub mod query;
pub mod row;
pub mod select_pipeline;
pub mod storage;
pub mod value;

pub use engine::{Engine, ExecutionResult};
pub use error::EngineError;
pub use value::Value;
