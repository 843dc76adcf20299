//! Graph relation engine: per-vertex in/out edge sets and per-edge
//! endpoints, maintained as two disjoint maps keyed by record id.
//!
//! Cascades are pure functions of rids: destroying a vertex walks its
//! adjacency entry and destroys each incident edge through the endpoint
//! lookup; no object graph is ever materialised.

use std::collections::HashSet;

use nogdb_api::{ClassId, ClassType, RecordId};
use redb::WriteTransaction;

use crate::codec::{self, Adjacency};
use crate::condition::Condition;
use crate::error::{Error, Result};
use crate::schema::SchemaSnapshot;
use crate::storage::{TABLE_ADJACENCY, TABLE_ENDPOINTS, TxnInner};

/// Class-name and predicate filter applied to edges or vertices during
/// adjacency retrieval and traversal.
#[derive(Debug, Clone, Default)]
pub struct GraphFilter {
    classes: Vec<String>,
    condition: Option<Condition>,
}

impl GraphFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts matches to the named classes (and their subclasses).
    pub fn only<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes = classes.into_iter().map(Into::into).collect();
        self
    }

    /// Additionally requires the record to satisfy `condition`.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub(crate) fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Resolves the class-name filter to a set of concrete class ids,
    /// `None` when unrestricted. Unknown names and names of the wrong
    /// class kind fail.
    pub(crate) fn resolve_classes(
        &self,
        schema: &SchemaSnapshot,
        expected: ClassType,
    ) -> Result<Option<HashSet<ClassId>>> {
        if self.classes.is_empty() {
            return Ok(None);
        }
        let mut ids = HashSet::new();
        for name in &self.classes {
            let class = schema.expect_class(name)?;
            if class.class_type != expected {
                return Err(Error::ClassTypeMismatch(format!(
                    "{} is not a {} class",
                    class.name, expected
                )));
            }
            ids.extend(schema.self_and_descendants(class.id));
        }
        Ok(Some(ids))
    }
}

pub(crate) fn adjacency(inner: &TxnInner, rid: RecordId) -> Result<Option<Adjacency>> {
    match inner.adjacency_get(rid)? {
        Some(bytes) => Ok(Some(codec::decode_adjacency(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn endpoints(inner: &TxnInner, rid: RecordId) -> Result<Option<(RecordId, RecordId)>> {
    match inner.endpoints_get(rid)? {
        Some(bytes) => Ok(Some(codec::decode_endpoints(&bytes)?)),
        None => Ok(None),
    }
}

pub(crate) fn put_adjacency(txn: &WriteTransaction, rid: RecordId, adj: &Adjacency) -> Result<()> {
    let mut table = txn.open_table(TABLE_ADJACENCY)?;
    table.insert((rid.class_id, rid.position), codec::encode_adjacency(adj).as_slice())?;
    Ok(())
}

pub(crate) fn remove_adjacency(txn: &WriteTransaction, rid: RecordId) -> Result<()> {
    let mut table = txn.open_table(TABLE_ADJACENCY)?;
    table.remove((rid.class_id, rid.position))?;
    Ok(())
}

pub(crate) fn put_endpoints(
    txn: &WriteTransaction,
    edge: RecordId,
    src: RecordId,
    dst: RecordId,
) -> Result<()> {
    let mut table = txn.open_table(TABLE_ENDPOINTS)?;
    table.insert(
        (edge.class_id, edge.position),
        codec::encode_endpoints(src, dst).as_slice(),
    )?;
    Ok(())
}

pub(crate) fn remove_endpoints(txn: &WriteTransaction, edge: RecordId) -> Result<()> {
    let mut table = txn.open_table(TABLE_ENDPOINTS)?;
    table.remove((edge.class_id, edge.position))?;
    Ok(())
}

/// Links a new edge into both endpoint adjacency entries and records its
/// endpoints. The endpoints must already have adjacency entries.
pub(crate) fn attach_edge(
    inner: &TxnInner,
    edge: RecordId,
    src: RecordId,
    dst: RecordId,
) -> Result<()> {
    let txn = inner.write().ok_or(Error::TxnReadOnly)?;
    let mut src_adj = adjacency(inner, src)?.ok_or(Error::SourceNotFound(src))?;
    if adjacency(inner, dst)?.is_none() {
        return Err(Error::DestNotFound(dst));
    }

    src_adj.insert_outbound(edge);
    put_adjacency(txn, src, &src_adj)?;

    // A self-loop shares one adjacency entry; reread to pick up the
    // outbound edit before adding the inbound side.
    let mut dst_adj = adjacency(inner, dst)?.ok_or(Error::DestNotFound(dst))?;
    dst_adj.insert_inbound(edge);
    put_adjacency(txn, dst, &dst_adj)?;

    put_endpoints(txn, edge, src, dst)?;
    Ok(())
}

/// Unlinks an edge from both endpoint adjacency entries and drops its
/// endpoints row.
pub(crate) fn detach_edge(
    inner: &TxnInner,
    edge: RecordId,
    src: RecordId,
    dst: RecordId,
) -> Result<()> {
    let txn = inner.write().ok_or(Error::TxnReadOnly)?;
    if let Some(mut src_adj) = adjacency(inner, src)? {
        src_adj.remove_edge(edge);
        put_adjacency(txn, src, &src_adj)?;
    }
    if let Some(mut dst_adj) = adjacency(inner, dst)? {
        dst_adj.remove_edge(edge);
        put_adjacency(txn, dst, &dst_adj)?;
    }
    remove_endpoints(txn, edge)?;
    Ok(())
}

/// Which side(s) of a vertex's adjacency an operation looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    All,
}

/// The edges incident to `vertex` on the given side, deduplicated, in
/// adjacency order.
pub(crate) fn incident_edges(
    inner: &TxnInner,
    vertex: RecordId,
    direction: Direction,
) -> Result<Vec<RecordId>> {
    let adj = adjacency(inner, vertex)?.ok_or(Error::VertexNotFound(vertex))?;
    Ok(match direction {
        Direction::In => adj.inbound,
        Direction::Out => adj.outbound,
        Direction::All => {
            let mut all = adj.inbound;
            for edge in adj.outbound {
                if let Err(at) = all.binary_search(&edge) {
                    all.insert(at, edge);
                }
            }
            all
        }
    })
}
