//! # sql-ast
//!
//! A hand-written SQL lexer, recursive-descent parser, and AST for a
//! MySQL-flavored dialect.
//!
//! This crate is the boundary between raw SQL text and the typed query
//! object the execution engine (see the `sql-engine` crate) consumes. It
//! does not execute anything: `Parser::parse_statement` turns source text
//! into a [`Statement`], and that is the entirety of its job.
//!
//! ```rust
//! use sql_ast::Parser;
//! use sql_ast::ast::Statement;
//!
//! let stmt = Parser::new("SELECT id, name FROM users WHERE id = 1").parse_statement().unwrap();
//! assert!(matches!(stmt, Statement::Select(_)));
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Expr, Statement};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, Parser};
