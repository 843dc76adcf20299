//! Embedded SQL surface for NogDB.
//!
//! A single string-in, result-out entry point: [`execute`] tokenizes and
//! parses one statement and runs it against the caller's transaction.
//! Grammar and semantics follow the engine's native operations; the SQL
//! layer adds no storage behaviour of its own.
//!
//! ```no_run
//! use nogdb_core::{Context, TxnMode};
//!
//! fn main() -> nogdb_core::Result<()> {
//!     let ctx = Context::open("books.nog")?;
//!     let mut txn = ctx.begin_txn(TxnMode::ReadWrite)?;
//!     nogdb_sql::execute(&mut txn, "CREATE CLASS books EXTENDS VERTEX")?;
//!     nogdb_sql::execute(&mut txn, "CREATE PROPERTY books.title TEXT")?;
//!     nogdb_sql::execute(&mut txn, "CREATE VERTEX books SET title='Dune'")?;
//!     let result = nogdb_sql::execute(&mut txn, "SELECT * FROM books")?;
//!     txn.commit()?;
//!     Ok(())
//! }
//! ```

pub mod ast;
mod executor;
mod lexer;
mod parser;

use nogdb_core::{Result, Txn};

pub use crate::executor::SqlResult;
pub use crate::parser::Parser;

/// Parses and executes one SQL statement on `txn`.
///
/// Lexical failures report `UnrecognizedToken`; grammar failures report
/// `SyntaxError`; everything else surfaces the engine's own error kinds.
pub fn execute(txn: &mut Txn<'_>, statement: &str) -> Result<SqlResult> {
    let parsed = Parser::parse(statement)?;
    executor::execute_statement(txn, parsed)
}
