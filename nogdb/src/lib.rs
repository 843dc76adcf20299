//! # NogDB
//!
//! An embedded graph database: a single-process library storing a typed
//! property graph on local disk under ACID transactions.
//!
//! Clients declare a schema of vertex and edge classes (optionally
//! inheriting from one another), attach typed properties, optionally
//! build secondary indexes, and then create, update, delete and query
//! records. Queries range from single-record fetch over filtered class
//! scans and index-assisted lookup to multi-hop traversal and shortest
//! path.
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use nogdb::{ClassType, Condition, Context, PropertyType, Record, Result, TxnMode};
//!
//! fn main() -> Result<()> {
//!     let ctx = Context::open("books.nog")?;
//!
//!     let mut txn = ctx.begin_txn(TxnMode::ReadWrite)?;
//!     txn.add_class("books", ClassType::Vertex)?;
//!     txn.add_property("books", "title", PropertyType::Text)?;
//!     txn.add_property("books", "pages", PropertyType::Integer)?;
//!     let dune = txn.add_vertex("books", Record::new().with("title", "Dune"))?;
//!     txn.commit()?;
//!
//!     let txn = ctx.begin_txn(TxnMode::ReadOnly)?;
//!     let rows = txn
//!         .find("books")
//!         .where_(Condition::prop("title").begin_with("D"))
//!         .get()?;
//!     assert_eq!(rows[0].descriptor, dune);
//!     txn.commit()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! Any number of read-only transactions run concurrently with at most
//! one read-write transaction; readers see the committed state at their
//! `begin`, the writer serialises behind the single writer slot. A
//! dropped transaction rolls back.
//!
//! ## SQL
//!
//! The [`sql`] module parses textual statements
//! (`CREATE CLASS ... EXTENDS VERTEX`, `SELECT ... FROM ... WHERE ...`,
//! `TRAVERSE out(...) FROM #1:1`, ...) into the same operations.

pub use nogdb_core::{
    ClassDescriptor, ClassId, ClassType, Comparator, Condition, ConditionProp, Context,
    ContextSettings, DbInfo, Direction, Error, FindBuilder, GraphFilter, IndexDescriptor, IndexId,
    PositionalId, PropertyDescriptor, PropertyId, PropertyType, Record, RecordDescriptor, RecordId,
    Result, ResultRow, ResultSet, ResultSetCursor, SYNTHETIC_CLASS_ID, ShortestPathBuilder,
    TraverseBuilder, TraverseStrategy, Txn, TxnMode, Value,
};

pub mod sql {
    //! Embedded SQL: `execute(&mut txn, "SELECT * FROM books")`.
    pub use nogdb_sql::{Parser, SqlResult, execute};
    pub use nogdb_sql::ast;
}
