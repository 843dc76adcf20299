//! Secondary index engine.
//!
//! One index covers a `(class, property)` pair and is partitioned per
//! concrete class inside the key, so an index declared on a parent class
//! serves each subclass independently. Keys use an order-preserving
//! encoding; ascending key order is ascending value order with positional
//! tie-breaks.

use std::collections::HashSet;

use nogdb_api::{ClassId, IndexDescriptor, PositionalId, PropertyId, PropertyType, RecordId};
use redb::{ReadableTable, WriteTransaction};
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::SchemaSnapshot;
use crate::storage::{self, TxnInner};
use crate::value::Value;

/// Order-preserving key bytes for an indexed value.
///
/// Values reaching an index are already coerced to the declared property
/// type, so each partition only ever sees one encoding family.
pub(crate) fn ordered_key(value: &Value) -> Vec<u8> {
    match value {
        Value::TinyInt(v) => flip_signed(*v as i64),
        Value::SmallInt(v) => flip_signed(*v as i64),
        Value::Integer(v) => flip_signed(*v as i64),
        Value::BigInt(v) => flip_signed(*v),
        Value::UnsignedTinyInt(v) => (*v as u64).to_be_bytes().to_vec(),
        Value::UnsignedSmallInt(v) => (*v as u64).to_be_bytes().to_vec(),
        Value::UnsignedInteger(v) => (*v as u64).to_be_bytes().to_vec(),
        Value::UnsignedBigInt(v) => v.to_be_bytes().to_vec(),
        Value::Real(v) => {
            let bits = v.to_bits();
            let ordered = if bits & (1 << 63) != 0 {
                !bits
            } else {
                bits ^ (1 << 63)
            };
            ordered.to_be_bytes().to_vec()
        }
        Value::Text(s) => s.as_bytes().to_vec(),
        // Unreachable through the public surface (BLOB cannot be indexed).
        Value::Blob(b) => b.clone(),
    }
}

fn flip_signed(v: i64) -> Vec<u8> {
    ((v as u64) ^ (1 << 63)).to_be_bytes().to_vec()
}

pub(crate) fn indexable(ty: PropertyType) -> bool {
    ty != PropertyType::Blob
}

fn value_for(pairs: &[(PropertyId, Value)], property_id: PropertyId) -> Option<&Value> {
    pairs
        .iter()
        .find(|(id, _)| *id == property_id)
        .map(|(_, value)| value)
}

/// Verifies that inserting `pairs` for a record of `class_id` would not
/// violate any visible unique index. `exclude` skips the record's own
/// current entry during updates.
pub(crate) fn check_unique(
    inner: &TxnInner,
    schema: &SchemaSnapshot,
    class_id: ClassId,
    pairs: &[(PropertyId, Value)],
    exclude: Option<PositionalId>,
) -> Result<()> {
    for index in schema.indexes_for_class(class_id) {
        if !index.unique {
            continue;
        }
        let Some(value) = value_for(pairs, index.property_id) else {
            continue;
        };
        let key = ordered_key(value);
        if let Some(existing) = inner.unique_index_get(index.id, class_id, &key)? {
            if exclude != Some(existing) {
                let name = property_name(schema, &index);
                return Err(Error::UniqueConstraint(name));
            }
        }
    }
    Ok(())
}

fn property_name(schema: &SchemaSnapshot, index: &IndexDescriptor) -> String {
    schema
        .class_by_id(index.class_id)
        .and_then(|class| {
            schema
                .property_map(class.id)
                .get(&index.property_id)
                .map(|(name, _)| name.clone())
        })
        .unwrap_or_else(|| format!("property id {}", index.property_id))
}

/// Adds the entries of a freshly written record to every visible index.
/// Uniqueness must have been checked beforehand.
pub(crate) fn add_entries(
    txn: &WriteTransaction,
    schema: &SchemaSnapshot,
    class_id: ClassId,
    position: PositionalId,
    pairs: &[(PropertyId, Value)],
) -> Result<()> {
    for index in schema.indexes_for_class(class_id) {
        let Some(value) = value_for(pairs, index.property_id) else {
            continue;
        };
        let key = ordered_key(value);
        insert_entry(txn, &index, class_id, position, &key)?;
    }
    Ok(())
}

/// Removes the entries of a record that is being destroyed or rewritten.
pub(crate) fn remove_entries(
    txn: &WriteTransaction,
    schema: &SchemaSnapshot,
    class_id: ClassId,
    position: PositionalId,
    pairs: &[(PropertyId, Value)],
) -> Result<()> {
    for index in schema.indexes_for_class(class_id) {
        let Some(value) = value_for(pairs, index.property_id) else {
            continue;
        };
        let key = ordered_key(value);
        remove_entry(txn, &index, class_id, position, &key)?;
    }
    Ok(())
}

fn insert_entry(
    txn: &WriteTransaction,
    index: &IndexDescriptor,
    class_id: ClassId,
    position: PositionalId,
    key: &[u8],
) -> Result<()> {
    if index.unique {
        let name = storage::unique_index_table_name(index.id);
        let mut table = txn.open_table(storage::unique_index_table(&name))?;
        table.insert((class_id, key), position)?;
    } else {
        let name = storage::multi_index_table_name(index.id);
        let mut table = txn.open_table(storage::multi_index_table(&name))?;
        table.insert((class_id, key, position), ())?;
    }
    Ok(())
}

fn remove_entry(
    txn: &WriteTransaction,
    index: &IndexDescriptor,
    class_id: ClassId,
    position: PositionalId,
    key: &[u8],
) -> Result<()> {
    if index.unique {
        let name = storage::unique_index_table_name(index.id);
        let mut table = txn.open_table(storage::unique_index_table(&name))?;
        // Only remove the entry if it still points at this record.
        let stale = table
            .get((class_id, key))?
            .is_some_and(|guard| guard.value() == position);
        if stale {
            table.remove((class_id, key))?;
        }
    } else {
        let name = storage::multi_index_table_name(index.id);
        let mut table = txn.open_table(storage::multi_index_table(&name))?;
        table.remove((class_id, key, position))?;
    }
    Ok(())
}

/// Entries of one concrete-class partition collected during an index
/// build: `(key bytes, position)` per record with the property set.
type PartitionEntries = Vec<(Vec<u8>, PositionalId)>;

/// Builds the partitions of a new index over the declared class and all
/// of its descendants.
///
/// Every partition is validated before anything is written: a duplicate
/// under a unique index rejects the build as a whole with
/// `INVALID_INDEX_CONSTRAINT`, leaving the transaction untouched.
pub(crate) fn build_partitions(
    inner: &TxnInner,
    scan_classes: &[ClassId],
    unique: bool,
    decode_value: impl Fn(ClassId, &[u8]) -> Result<Option<Value>>,
) -> Result<Vec<(ClassId, PartitionEntries)>> {
    let mut partitions = Vec::new();
    for &class_id in scan_classes {
        let mut entries: PartitionEntries = Vec::new();
        let mut seen: HashSet<Vec<u8>> = HashSet::new();
        for (position, raw) in inner.data_scan(class_id)? {
            let Some(value) = decode_value(class_id, &raw)? else {
                continue;
            };
            let key = ordered_key(&value);
            if unique && !seen.insert(key.clone()) {
                return Err(Error::InvalidIndexConstraint);
            }
            entries.push((key, position));
        }
        partitions.push((class_id, entries));
    }
    Ok(partitions)
}

/// Writes pre-validated partitions into fresh index tables.
pub(crate) fn write_partitions(
    txn: &WriteTransaction,
    index: &IndexDescriptor,
    partitions: &[(ClassId, PartitionEntries)],
) -> Result<()> {
    // Ensure both tables exist even when empty, so readers see the index.
    let unique_name = storage::unique_index_table_name(index.id);
    let multi_name = storage::multi_index_table_name(index.id);
    if index.unique {
        let mut table = txn.open_table(storage::unique_index_table(&unique_name))?;
        for (class_id, entries) in partitions {
            for (key, position) in entries {
                table.insert((*class_id, key.as_slice()), *position)?;
            }
        }
    } else {
        let mut table = txn.open_table(storage::multi_index_table(&multi_name))?;
        for (class_id, entries) in partitions {
            for (key, position) in entries {
                table.insert((*class_id, key.as_slice(), *position), ())?;
            }
        }
    }
    let total: usize = partitions.iter().map(|(_, e)| e.len()).sum();
    debug!(index = index.id, entries = total, unique = index.unique, "index built");
    Ok(())
}

pub(crate) fn drop_tables(txn: &WriteTransaction, index: &IndexDescriptor) -> Result<()> {
    let unique_name = storage::unique_index_table_name(index.id);
    let multi_name = storage::multi_index_table_name(index.id);
    if index.unique {
        txn.delete_table(storage::unique_index_table(&unique_name))?;
    } else {
        txn.delete_table(storage::multi_index_table(&multi_name))?;
    }
    Ok(())
}

/// Equality lookup across the partitions of the classes being scanned,
/// in the caller's scan order.
pub(crate) fn lookup_eq(
    inner: &TxnInner,
    index: &IndexDescriptor,
    scan_classes: &[ClassId],
    value: &Value,
) -> Result<Vec<RecordId>> {
    let key = ordered_key(value);
    let mut rids = Vec::new();
    for &class_id in scan_classes {
        if index.unique {
            if let Some(position) = inner.unique_index_get(index.id, class_id, &key)? {
                rids.push(RecordId::new(class_id, position));
            }
        } else {
            for position in inner.multi_index_get(index.id, class_id, &key)? {
                rids.push(RecordId::new(class_id, position));
            }
        }
    }
    Ok(rids)
}
