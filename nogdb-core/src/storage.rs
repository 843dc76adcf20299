//! Table layout over the backing key-value store.
//!
//! The engine never touches pages or files directly; everything goes
//! through named redb tables. Fixed tables hold the schema catalog, the
//! graph relation and the id sequences; per-class data tables and
//! per-index tables are named at runtime.

use nogdb_api::{ClassId, IndexId, PositionalId, PropertyId, RecordId};
use redb::{ReadableTable, TableDefinition, TableError};

use crate::error::Result;

pub(crate) const TABLE_CLASSES: TableDefinition<ClassId, &[u8]> =
    TableDefinition::new("schema.classes");
pub(crate) const TABLE_PROPERTIES: TableDefinition<(ClassId, PropertyId), &[u8]> =
    TableDefinition::new("schema.properties");
pub(crate) const TABLE_INDEXES: TableDefinition<IndexId, &[u8]> =
    TableDefinition::new("schema.indexes");
pub(crate) const TABLE_ADJACENCY: TableDefinition<(ClassId, PositionalId), &[u8]> =
    TableDefinition::new("graph.adj");
pub(crate) const TABLE_ENDPOINTS: TableDefinition<(ClassId, PositionalId), &[u8]> =
    TableDefinition::new("graph.endpoints");
pub(crate) const TABLE_META: TableDefinition<&str, u64> = TableDefinition::new("meta");
pub(crate) const TABLE_SEQUENCES: TableDefinition<ClassId, u64> =
    TableDefinition::new("sequences");

pub(crate) const META_NEXT_CLASS_ID: &str = "next_class_id";
pub(crate) const META_NEXT_INDEX_ID: &str = "next_index_id";
pub(crate) const META_ENABLE_VERSION: &str = "enable_version";

pub(crate) fn data_table_name(class_id: ClassId) -> String {
    format!("data.{class_id}")
}

pub(crate) fn unique_index_table_name(index_id: IndexId) -> String {
    format!("index.{index_id}.unique")
}

pub(crate) fn multi_index_table_name(index_id: IndexId) -> String {
    format!("index.{index_id}.multi")
}

pub(crate) fn data_table(name: &str) -> TableDefinition<'_, PositionalId, &'static [u8]> {
    TableDefinition::new(name)
}

pub(crate) fn unique_index_table(
    name: &str,
) -> TableDefinition<'_, (ClassId, &'static [u8]), PositionalId> {
    TableDefinition::new(name)
}

pub(crate) fn multi_index_table(
    name: &str,
) -> TableDefinition<'_, (ClassId, &'static [u8], PositionalId), ()> {
    TableDefinition::new(name)
}

/// The live side of a transaction: a snapshot reader or the exclusive
/// writer. Readers opening a table that does not exist yet see it as
/// empty rather than failing.
pub(crate) enum TxnInner {
    ReadOnly(redb::ReadTransaction),
    ReadWrite(redb::WriteTransaction),
}

impl TxnInner {
    pub fn write(&self) -> Option<&redb::WriteTransaction> {
        match self {
            TxnInner::ReadWrite(txn) => Some(txn),
            TxnInner::ReadOnly(_) => None,
        }
    }

    /// Raw value of one record, version prefix included.
    pub fn data_get(&self, class_id: ClassId, position: PositionalId) -> Result<Option<Vec<u8>>> {
        fn go(
            table: &impl ReadableTable<PositionalId, &'static [u8]>,
            position: PositionalId,
        ) -> Result<Option<Vec<u8>>> {
            Ok(table.get(position)?.map(|guard| guard.value().to_vec()))
        }

        let name = data_table_name(class_id);
        let def = data_table(&name);
        match self {
            TxnInner::ReadOnly(txn) => match txn.open_table(def) {
                Ok(table) => go(&table, position),
                Err(TableError::TableDoesNotExist(_)) => Ok(None),
                Err(err) => Err(err.into()),
            },
            TxnInner::ReadWrite(txn) => go(&txn.open_table(def)?, position),
        }
    }

    /// Full scan of one class in ascending positional order.
    pub fn data_scan(&self, class_id: ClassId) -> Result<Vec<(PositionalId, Vec<u8>)>> {
        fn go(
            table: &impl ReadableTable<PositionalId, &'static [u8]>,
        ) -> Result<Vec<(PositionalId, Vec<u8>)>> {
            let mut rows = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                rows.push((key.value(), value.value().to_vec()));
            }
            Ok(rows)
        }

        let name = data_table_name(class_id);
        let def = data_table(&name);
        match self {
            TxnInner::ReadOnly(txn) => match txn.open_table(def) {
                Ok(table) => go(&table),
                Err(TableError::TableDoesNotExist(_)) => Ok(Vec::new()),
                Err(err) => Err(err.into()),
            },
            TxnInner::ReadWrite(txn) => go(&txn.open_table(def)?),
        }
    }

    pub fn adjacency_get(&self, rid: RecordId) -> Result<Option<Vec<u8>>> {
        fn go(
            table: &impl ReadableTable<(ClassId, PositionalId), &'static [u8]>,
            rid: RecordId,
        ) -> Result<Option<Vec<u8>>> {
            Ok(table
                .get((rid.class_id, rid.position))?
                .map(|guard| guard.value().to_vec()))
        }

        match self {
            TxnInner::ReadOnly(txn) => go(&txn.open_table(TABLE_ADJACENCY)?, rid),
            TxnInner::ReadWrite(txn) => go(&txn.open_table(TABLE_ADJACENCY)?, rid),
        }
    }

    pub fn endpoints_get(&self, rid: RecordId) -> Result<Option<Vec<u8>>> {
        fn go(
            table: &impl ReadableTable<(ClassId, PositionalId), &'static [u8]>,
            rid: RecordId,
        ) -> Result<Option<Vec<u8>>> {
            Ok(table
                .get((rid.class_id, rid.position))?
                .map(|guard| guard.value().to_vec()))
        }

        match self {
            TxnInner::ReadOnly(txn) => go(&txn.open_table(TABLE_ENDPOINTS)?, rid),
            TxnInner::ReadWrite(txn) => go(&txn.open_table(TABLE_ENDPOINTS)?, rid),
        }
    }

    /// Position holding `key` in a unique index partition, if any.
    pub fn unique_index_get(
        &self,
        index_id: IndexId,
        class_id: ClassId,
        key: &[u8],
    ) -> Result<Option<PositionalId>> {
        fn go(
            table: &impl ReadableTable<(ClassId, &'static [u8]), PositionalId>,
            class_id: ClassId,
            key: &[u8],
        ) -> Result<Option<PositionalId>> {
            Ok(table.get((class_id, key))?.map(|guard| guard.value()))
        }

        let name = unique_index_table_name(index_id);
        let def = unique_index_table(&name);
        match self {
            TxnInner::ReadOnly(txn) => match txn.open_table(def) {
                Ok(table) => go(&table, class_id, key),
                Err(TableError::TableDoesNotExist(_)) => Ok(None),
                Err(err) => Err(err.into()),
            },
            TxnInner::ReadWrite(txn) => go(&txn.open_table(def)?, class_id, key),
        }
    }

    /// All positions holding `key` in a non-unique index partition,
    /// ascending.
    pub fn multi_index_get(
        &self,
        index_id: IndexId,
        class_id: ClassId,
        key: &[u8],
    ) -> Result<Vec<PositionalId>> {
        fn go(
            table: &impl ReadableTable<(ClassId, &'static [u8], PositionalId), ()>,
            class_id: ClassId,
            key: &[u8],
        ) -> Result<Vec<PositionalId>> {
            let mut positions = Vec::new();
            let range = table
                .range((class_id, key, PositionalId::MIN)..=(class_id, key, PositionalId::MAX))?;
            for entry in range {
                let (found, _) = entry?;
                positions.push(found.value().2);
            }
            Ok(positions)
        }

        let name = multi_index_table_name(index_id);
        let def = multi_index_table(&name);
        match self {
            TxnInner::ReadOnly(txn) => match txn.open_table(def) {
                Ok(table) => go(&table, class_id, key),
                Err(TableError::TableDoesNotExist(_)) => Ok(Vec::new()),
                Err(err) => Err(err.into()),
            },
            TxnInner::ReadWrite(txn) => go(&txn.open_table(def)?, class_id, key),
        }
    }
}
