//! NogDB engine: an embedded, transactional property-graph database.
//!
//! The engine stores a typed property graph in a redb key-value file:
//! per-class data tables, a schema catalog, the adjacency relation, and
//! per-index tables. All access goes through [`Txn`] handles created from
//! a [`Context`]; readers take MVCC snapshots, the single writer
//! serialises behind redb's write lock, and commits are atomic and
//! durable.

mod codec;
mod condition;
mod error;
mod find;
mod graph;
mod index;
mod record;
mod result;
mod schema;
mod shortest;
mod storage;
mod traverse;
mod txn;
mod value;

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

pub use crate::condition::{Comparator, Condition, ConditionProp};
pub use crate::error::{Error, Result};
pub use crate::find::FindBuilder;
pub use crate::graph::{Direction, GraphFilter};
pub use crate::result::{ResultRow, ResultSet, ResultSetCursor};
pub use crate::schema::{ClassMeta, PropertyMeta, SchemaSnapshot};
pub use crate::shortest::ShortestPathBuilder;
pub use crate::traverse::{TraverseBuilder, TraverseStrategy};
pub use crate::txn::{Txn, TxnMode};
pub use crate::value::{Record, Value};
pub use nogdb_api::{
    ClassDescriptor, ClassId, ClassType, DbInfo, IndexDescriptor, IndexId, PositionalId,
    PropertyDescriptor, PropertyId, PropertyType, RecordDescriptor, RecordId, SYNTHETIC_CLASS_ID,
};

use crate::storage::{
    META_ENABLE_VERSION, TABLE_ADJACENCY, TABLE_CLASSES, TABLE_ENDPOINTS, TABLE_INDEXES,
    TABLE_META, TABLE_PROPERTIES, TABLE_SEQUENCES,
};

/// Options applied when a database file is first created.
#[derive(Debug, Clone, Copy)]
pub struct ContextSettings {
    /// Store a per-record version counter. When off, `@version` is
    /// synthesised as 1. The choice is persisted with the database.
    pub enable_version: bool,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            enable_version: true,
        }
    }
}

/// An open database.
///
/// `Context` is safe to share across threads; mutations serialise behind
/// the single writer slot of the backing store.
pub struct Context {
    pub(crate) db: Database,
    pub(crate) schema_cache: RwLock<Arc<SchemaSnapshot>>,
    pub(crate) versioned: bool,
    path: PathBuf,
}

impl Context {
    /// Opens (creating if necessary) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, ContextSettings::default())
    }

    /// Opens the database, applying `settings` if the file is new. A
    /// database that already exists keeps the settings it was created
    /// with.
    pub fn open_with(path: impl AsRef<Path>, settings: ContextSettings) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path)?;

        let init = db.begin_write()?;
        let versioned;
        {
            init.open_table(TABLE_CLASSES)?;
            init.open_table(TABLE_PROPERTIES)?;
            init.open_table(TABLE_INDEXES)?;
            init.open_table(TABLE_ADJACENCY)?;
            init.open_table(TABLE_ENDPOINTS)?;
            init.open_table(TABLE_SEQUENCES)?;
            let mut meta = init.open_table(TABLE_META)?;
            let stored = meta.get(META_ENABLE_VERSION)?.map(|guard| guard.value());
            versioned = match stored {
                Some(bit) => bit != 0,
                None => {
                    meta.insert(META_ENABLE_VERSION, settings.enable_version as u64)?;
                    settings.enable_version
                }
            };
        }
        init.commit()?;

        let reader = db.begin_read()?;
        let snapshot = SchemaSnapshot::load(&reader)?;
        debug!(path = %path.display(), versioned, "database opened");

        Ok(Self {
            db,
            schema_cache: RwLock::new(Arc::new(snapshot)),
            versioned,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begins a transaction. `ReadWrite` blocks until the writer slot is
    /// free; `ReadOnly` never blocks and sees the state at this call.
    pub fn begin_txn(&self, mode: TxnMode) -> Result<Txn<'_>> {
        Txn::begin(self, mode)
    }
}
