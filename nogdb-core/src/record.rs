//! Record store: create, fetch, update and destroy of vertex and edge
//! records, wired through the adjacency and index engines so that every
//! mutation either wholly succeeds or leaves no trace.
//!
//! All constraint checks run before the first table write; a failed
//! operation therefore leaves the transaction in its prior state.

use nogdb_api::{ClassType, PositionalId, PropertyId, RecordDescriptor, RecordId};
use redb::WriteTransaction;
use tracing::trace;

use crate::codec::{self, Adjacency};
use crate::error::{Error, Result};
use crate::graph::{self, Direction, GraphFilter};
use crate::index;
use crate::schema::{self, ClassMeta, SchemaSnapshot};
use crate::storage::{self, TxnInner};
use crate::value::{Record, Value};

/// Read-side context shared by the record store functions.
#[derive(Clone, Copy)]
pub(crate) struct StoreView<'a> {
    pub inner: &'a TxnInner,
    pub schema: &'a SchemaSnapshot,
    pub versioned: bool,
}

impl<'a> StoreView<'a> {
    fn write(&self) -> Result<&'a WriteTransaction> {
        self.inner.write().ok_or(Error::TxnReadOnly)
    }
}

/// Resolves and coerces the caller's property map against the class,
/// in schema order. Unknown non-synthetic names fail; synthetic `@`
/// columns are skipped.
fn coerced_pairs(
    schema: &SchemaSnapshot,
    class: &ClassMeta,
    record: &Record,
) -> Result<Vec<(PropertyId, Value)>> {
    let mut pairs = Vec::with_capacity(record.len());
    for (name, value) in record.properties() {
        let meta = schema
            .resolve_property(class.id, name)
            .ok_or_else(|| Error::PropertyNotFound(name.to_owned()))?;
        pairs.push((meta.id, value.coerce_to(meta.property_type)?));
    }
    Ok(pairs)
}

fn encode_blob(
    pairs: &[(PropertyId, Value)],
    unknown: &[(PropertyId, Vec<u8>)],
    version: u64,
    versioned: bool,
) -> Vec<u8> {
    let mut known: Vec<(PropertyId, Vec<u8>)> = pairs
        .iter()
        .map(|(id, value)| (*id, codec::value_bytes(value)))
        .collect();
    let body = codec::encode_record(&mut known, unknown);
    if versioned {
        let mut out = Vec::with_capacity(8 + body.len());
        out.extend_from_slice(&version.to_le_bytes());
        out.extend_from_slice(&body);
        out
    } else {
        body
    }
}

/// Splits the stored value into `(version, codec blob)`. Databases that
/// do not store versions synthesise version 1.
fn split_version(raw: &[u8], versioned: bool) -> Result<(u64, &[u8])> {
    if !versioned {
        return Ok((1, raw));
    }
    if raw.len() < 8 {
        return Err(Error::Corrupted("record value shorter than its version"));
    }
    let version = u64::from_le_bytes(raw[..8].try_into().expect("checked length"));
    Ok((version, &raw[8..]))
}

fn write_blob(
    txn: &WriteTransaction,
    rid: RecordId,
    pairs: &[(PropertyId, Value)],
    unknown: &[(PropertyId, Vec<u8>)],
    version: u64,
    versioned: bool,
) -> Result<()> {
    let name = storage::data_table_name(rid.class_id);
    let mut table = txn.open_table(storage::data_table(&name))?;
    table.insert(
        rid.position,
        encode_blob(pairs, unknown, version, versioned).as_slice(),
    )?;
    Ok(())
}

fn remove_blob(txn: &WriteTransaction, rid: RecordId) -> Result<()> {
    let name = storage::data_table_name(rid.class_id);
    let mut table = txn.open_table(storage::data_table(&name))?;
    table.remove(rid.position)?;
    Ok(())
}

fn decode_blob(schema: &SchemaSnapshot, class: &ClassMeta, blob: &[u8]) -> Result<Record> {
    let map = schema.property_map(class.id);
    codec::decode_record(blob, |id| map.get(&id).cloned())
}

fn attach_synthetics(
    record: &mut Record,
    class: &ClassMeta,
    descriptor: &RecordDescriptor,
    version: u64,
    with_depth: bool,
) {
    record.set_synthetic("@recordId", Value::Text(descriptor.rid.to_string()));
    record.set_synthetic("@className", Value::Text(class.name.clone()));
    record.set_synthetic("@version", Value::UnsignedBigInt(version));
    if with_depth {
        record.set_synthetic("@depth", Value::UnsignedInteger(descriptor.depth));
    }
}

/// Fetches and decodes one record, synthetic columns attached.
pub(crate) fn fetch(
    view: StoreView<'_>,
    descriptor: &RecordDescriptor,
    with_depth: bool,
) -> Result<Record> {
    let class = view.schema.expect_class_id(descriptor.rid.class_id)?;
    let raw = view
        .inner
        .data_get(descriptor.rid.class_id, descriptor.rid.position)?
        .ok_or(Error::RecordNotFound(descriptor.rid))?;
    let (version, blob) = split_version(&raw, view.versioned)?;
    let mut record = decode_blob(view.schema, class, blob)?;
    attach_synthetics(&mut record, class, descriptor, version, with_depth);
    Ok(record)
}

/// Decodes one named property out of a raw data-table value. Used by
/// the index build scan.
pub(crate) fn decode_property(
    view: StoreView<'_>,
    class_id: nogdb_api::ClassId,
    raw: &[u8],
    name: &str,
) -> Result<Option<Value>> {
    let class = view.schema.expect_class_id(class_id)?;
    let (_, blob) = split_version(raw, view.versioned)?;
    let record = decode_blob(view.schema, class, blob)?;
    Ok(record.get(name).cloned())
}

/// Decodes a raw scan value without a second point lookup.
pub(crate) fn decode_row(
    view: StoreView<'_>,
    class: &ClassMeta,
    position: PositionalId,
    raw: &[u8],
    with_depth: bool,
) -> Result<(RecordDescriptor, Record)> {
    let descriptor = RecordDescriptor::new(class.id, position);
    let (version, blob) = split_version(raw, view.versioned)?;
    let mut record = decode_blob(view.schema, class, blob)?;
    attach_synthetics(&mut record, class, &descriptor, version, with_depth);
    Ok((descriptor, record))
}

pub(crate) fn create_vertex(
    view: StoreView<'_>,
    class_name: &str,
    record: &Record,
) -> Result<RecordDescriptor> {
    let txn = view.write()?;
    let class = view.schema.expect_class(class_name)?;
    if class.class_type != ClassType::Vertex {
        return Err(Error::ClassTypeMismatch(format!(
            "{class_name} is not a vertex class"
        )));
    }
    let pairs = coerced_pairs(view.schema, class, record)?;
    index::check_unique(view.inner, view.schema, class.id, &pairs, None)?;

    let position = schema::next_position(txn, class.id)?;
    let rid = RecordId::new(class.id, position);
    write_blob(txn, rid, &pairs, record.unknown_pairs(), 1, view.versioned)?;
    graph::put_adjacency(txn, rid, &Adjacency::default())?;
    index::add_entries(txn, view.schema, class.id, position, &pairs)?;
    trace!(%rid, class = class_name, "vertex created");
    Ok(RecordDescriptor::from(rid))
}

pub(crate) fn create_edge(
    view: StoreView<'_>,
    class_name: &str,
    src: &RecordDescriptor,
    dst: &RecordDescriptor,
    record: &Record,
) -> Result<RecordDescriptor> {
    let txn = view.write()?;
    let class = view.schema.expect_class(class_name)?;
    if class.class_type != ClassType::Edge {
        return Err(Error::ClassTypeMismatch(format!(
            "{class_name} is not an edge class"
        )));
    }
    ensure_vertex(view, src.rid, Endpoint::Source)?;
    ensure_vertex(view, dst.rid, Endpoint::Destination)?;

    let pairs = coerced_pairs(view.schema, class, record)?;
    index::check_unique(view.inner, view.schema, class.id, &pairs, None)?;

    let position = schema::next_position(txn, class.id)?;
    let rid = RecordId::new(class.id, position);
    write_blob(txn, rid, &pairs, record.unknown_pairs(), 1, view.versioned)?;
    graph::attach_edge(view.inner, rid, src.rid, dst.rid)?;
    index::add_entries(txn, view.schema, class.id, position, &pairs)?;
    trace!(%rid, class = class_name, src = %src.rid, dst = %dst.rid, "edge created");
    Ok(RecordDescriptor::from(rid))
}

enum Endpoint {
    Source,
    Destination,
}

/// Endpoint validation for `create_edge`: the class must be a vertex
/// class and the vertex must exist in the adjacency map.
fn ensure_vertex(view: StoreView<'_>, rid: RecordId, endpoint: Endpoint) -> Result<()> {
    let class = view.schema.expect_class_id(rid.class_id)?;
    if class.class_type != ClassType::Vertex {
        return Err(Error::ClassTypeMismatch(format!(
            "{} is not a vertex class",
            class.name
        )));
    }
    if graph::adjacency(view.inner, rid)?.is_none() {
        return Err(match endpoint {
            Endpoint::Source => Error::SourceNotFound(rid),
            Endpoint::Destination => Error::DestNotFound(rid),
        });
    }
    Ok(())
}

/// Replaces a record's property map. `@version` increments by one; the
/// graph relation is untouched.
pub(crate) fn update(
    view: StoreView<'_>,
    descriptor: &RecordDescriptor,
    record: &Record,
) -> Result<()> {
    let txn = view.write()?;
    let rid = descriptor.rid;
    let class = view.schema.expect_class_id(rid.class_id)?;
    let raw = view
        .inner
        .data_get(rid.class_id, rid.position)?
        .ok_or(Error::RecordNotFound(rid))?;
    let (version, blob) = split_version(&raw, view.versioned)?;
    let old = decode_blob(view.schema, class, blob)?;
    let old_pairs = coerced_pairs(view.schema, class, &old)?;

    let pairs = coerced_pairs(view.schema, class, record)?;
    index::check_unique(view.inner, view.schema, rid.class_id, &pairs, Some(rid.position))?;

    index::remove_entries(txn, view.schema, rid.class_id, rid.position, &old_pairs)?;
    index::add_entries(txn, view.schema, rid.class_id, rid.position, &pairs)?;
    write_blob(
        txn,
        rid,
        &pairs,
        record.unknown_pairs(),
        version + 1,
        view.versioned,
    )?;
    trace!(%rid, version = version + 1, "record updated");
    Ok(())
}

/// Destroys one record through the class-appropriate cascade path.
pub(crate) fn destroy(view: StoreView<'_>, descriptor: &RecordDescriptor) -> Result<()> {
    let rid = descriptor.rid;
    let class = view.schema.expect_class_id(rid.class_id)?;
    if view.inner.data_get(rid.class_id, rid.position)?.is_none() {
        return Err(Error::RecordNotFound(rid));
    }
    match class.class_type {
        ClassType::Vertex => destroy_vertex(view, rid),
        ClassType::Edge => destroy_edge(view, rid),
    }
}

/// Deletes every incident edge first, then the vertex's adjacency entry
/// and record.
fn destroy_vertex(view: StoreView<'_>, rid: RecordId) -> Result<()> {
    let txn = view.write()?;
    if let Some(adj) = graph::adjacency(view.inner, rid)? {
        let mut incident = adj.inbound;
        for edge in adj.outbound {
            if let Err(at) = incident.binary_search(&edge) {
                incident.insert(at, edge);
            }
        }
        for edge in incident {
            destroy_edge(view, edge)?;
        }
    }
    remove_record_entries(view, rid)?;
    remove_blob(txn, rid)?;
    graph::remove_adjacency(txn, rid)?;
    trace!(%rid, "vertex destroyed");
    Ok(())
}

fn destroy_edge(view: StoreView<'_>, rid: RecordId) -> Result<()> {
    let txn = view.write()?;
    if let Some((src, dst)) = graph::endpoints(view.inner, rid)? {
        graph::detach_edge(view.inner, rid, src, dst)?;
    }
    remove_record_entries(view, rid)?;
    remove_blob(txn, rid)?;
    trace!(%rid, "edge destroyed");
    Ok(())
}

/// Drops a record's index entries, if the record still exists.
fn remove_record_entries(view: StoreView<'_>, rid: RecordId) -> Result<()> {
    let txn = view.write()?;
    let Some(raw) = view.inner.data_get(rid.class_id, rid.position)? else {
        return Ok(());
    };
    let class = view.schema.expect_class_id(rid.class_id)?;
    let (_, blob) = split_version(&raw, view.versioned)?;
    let record = decode_blob(view.schema, class, blob)?;
    let pairs = coerced_pairs(view.schema, class, &record)?;
    index::remove_entries(txn, view.schema, rid.class_id, rid.position, &pairs)
}

/// Bulk destroy of every record of one class (subclasses excluded),
/// through the single-record cascade path. Returns the number of
/// destroyed records.
pub(crate) fn destroy_all(view: StoreView<'_>, class_name: &str) -> Result<u64> {
    let class = view.schema.expect_class(class_name)?;
    let rows = view.inner.data_scan(class.id)?;
    let mut destroyed = 0u64;
    for (position, _) in rows {
        let rid = RecordId::new(class.id, position);
        // A vertex cascade earlier in the scan may already have taken
        // this record with it.
        if view.inner.data_get(rid.class_id, rid.position)?.is_none() {
            continue;
        }
        match class.class_type {
            ClassType::Vertex => destroy_vertex(view, rid)?,
            ClassType::Edge => destroy_edge(view, rid)?,
        }
        destroyed += 1;
    }
    Ok(destroyed)
}

/// Edges incident to a vertex, class- and condition-filtered.
pub(crate) fn get_edges(
    view: StoreView<'_>,
    vertex: &RecordDescriptor,
    direction: Direction,
    filter: &GraphFilter,
) -> Result<Vec<RecordDescriptor>> {
    let class = view.schema.expect_class_id(vertex.rid.class_id)?;
    if class.class_type != ClassType::Vertex {
        return Err(Error::ClassTypeMismatch(format!(
            "{} is not a vertex class",
            class.name
        )));
    }
    let allowed = filter.resolve_classes(view.schema, ClassType::Edge)?;
    let mut out = Vec::new();
    for edge in graph::incident_edges(view.inner, vertex.rid, direction)? {
        if let Some(allowed) = &allowed {
            if !allowed.contains(&edge.class_id) {
                continue;
            }
        }
        let descriptor = RecordDescriptor::from(edge);
        if let Some(condition) = filter.condition() {
            let record = fetch(view, &descriptor, false)?;
            if !condition.eval(&record) {
                continue;
            }
        }
        out.push(descriptor);
    }
    Ok(out)
}

/// Source and destination of an edge record.
pub(crate) fn edge_endpoints(
    view: StoreView<'_>,
    edge: &RecordDescriptor,
) -> Result<(RecordDescriptor, RecordDescriptor)> {
    let class = view.schema.expect_class_id(edge.rid.class_id)?;
    if class.class_type != ClassType::Edge {
        return Err(Error::ClassTypeMismatch(format!(
            "{} is not an edge class",
            class.name
        )));
    }
    let (src, dst) =
        graph::endpoints(view.inner, edge.rid)?.ok_or(Error::RecordNotFound(edge.rid))?;
    Ok((RecordDescriptor::from(src), RecordDescriptor::from(dst)))
}
