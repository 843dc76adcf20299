//! Transaction manager.
//!
//! A [`Txn`] wraps either a snapshot reader or the exclusive writer of
//! the backing store and carries the schema view that matches it:
//! readers share the cached `Arc<SchemaSnapshot>` taken at begin, the
//! writer owns a scratch copy that DDL mutates and commit publishes.
//!
//! Committing or rolling back consumes the inner transaction; every
//! later operation fails `TxnCompleted`. Dropping a live transaction
//! rolls back.

use std::sync::Arc;

use nogdb_api::{
    ClassDescriptor, ClassType, DbInfo, IndexDescriptor, PropertyDescriptor, PropertyType,
    RecordDescriptor,
};
use redb::ReadableDatabase;
use tracing::debug;

use crate::Context;
use crate::error::{Error, Result};
use crate::find::FindBuilder;
use crate::graph::{Direction, GraphFilter};
use crate::index;
use crate::record::{self, StoreView};
use crate::schema::{self, SchemaSnapshot};
use crate::shortest::ShortestPathBuilder;
use crate::storage::TxnInner;
use crate::traverse::TraverseBuilder;
use crate::value::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnMode {
    ReadOnly,
    ReadWrite,
}

enum SchemaView {
    Shared(Arc<SchemaSnapshot>),
    Scratch(SchemaSnapshot),
}

pub(crate) struct TxnState {
    inner: TxnInner,
    schema: SchemaView,
}

impl TxnState {
    pub(crate) fn inner(&self) -> &TxnInner {
        &self.inner
    }

    pub(crate) fn schema(&self) -> &SchemaSnapshot {
        match &self.schema {
            SchemaView::Shared(snapshot) => snapshot,
            SchemaView::Scratch(snapshot) => snapshot,
        }
    }

    /// Writer-side split borrow: the KV handle plus the mutable scratch
    /// schema. Fails on read-only transactions.
    fn split_write(&mut self) -> Result<(&TxnInner, &mut SchemaSnapshot)> {
        match &mut self.schema {
            SchemaView::Scratch(snapshot) => Ok((&self.inner, snapshot)),
            SchemaView::Shared(_) => Err(Error::TxnReadOnly),
        }
    }
}

/// A unit of isolated work against the database.
pub struct Txn<'ctx> {
    ctx: &'ctx Context,
    mode: TxnMode,
    versioned: bool,
    state: Option<TxnState>,
    schema_dirty: bool,
}

impl<'ctx> Txn<'ctx> {
    pub(crate) fn begin(ctx: &'ctx Context, mode: TxnMode) -> Result<Self> {
        let state = match mode {
            TxnMode::ReadOnly => {
                // The cache read guard spans the snapshot open so the
                // schema view and the KV snapshot agree.
                let cache = ctx.schema_cache.read().unwrap();
                let inner = TxnInner::ReadOnly(ctx.db.begin_read()?);
                TxnState {
                    inner,
                    schema: SchemaView::Shared(cache.clone()),
                }
            }
            TxnMode::ReadWrite => {
                // Blocks until the writer slot frees up.
                let inner = TxnInner::ReadWrite(ctx.db.begin_write()?);
                let scratch = {
                    let cache = ctx.schema_cache.read().unwrap();
                    (**cache).clone()
                };
                TxnState {
                    inner,
                    schema: SchemaView::Scratch(scratch),
                }
            }
        };
        Ok(Self {
            ctx,
            mode,
            versioned: ctx.versioned,
            state: Some(state),
            schema_dirty: false,
        })
    }

    pub fn mode(&self) -> TxnMode {
        self.mode
    }

    pub(crate) fn state(&self) -> Result<&TxnState> {
        self.state.as_ref().ok_or(Error::TxnCompleted)
    }

    fn state_mut(&mut self) -> Result<&mut TxnState> {
        self.state.as_mut().ok_or(Error::TxnCompleted)
    }

    pub(crate) fn store_view(&self) -> Result<StoreView<'_>> {
        let state = self.state()?;
        Ok(StoreView {
            inner: state.inner(),
            schema: state.schema(),
            versioned: self.versioned,
        })
    }

    /// Commits the transaction, publishing its writes and any schema
    /// changes atomically.
    pub fn commit(mut self) -> Result<()> {
        let TxnState { inner, schema } = self.state.take().ok_or(Error::TxnCompleted)?;
        match inner {
            TxnInner::ReadOnly(_) => Ok(()),
            TxnInner::ReadWrite(txn) => {
                if self.schema_dirty {
                    // Hold the cache cell across the KV commit so no
                    // reader can pair the new data with the old schema.
                    let mut cache = self.ctx.schema_cache.write().unwrap();
                    txn.commit()?;
                    if let SchemaView::Scratch(scratch) = schema {
                        *cache = Arc::new(scratch);
                    }
                    debug!("commit published schema change");
                    Ok(())
                } else {
                    txn.commit()?;
                    Ok(())
                }
            }
        }
    }

    /// Discards all buffered writes. Always valid on a live transaction.
    pub fn rollback(mut self) -> Result<()> {
        let state = self.state.take().ok_or(Error::TxnCompleted)?;
        if let TxnInner::ReadWrite(txn) = state.inner {
            txn.abort()?;
        }
        Ok(())
    }

    // --- schema DDL ---

    pub fn add_class(&mut self, name: &str, class_type: ClassType) -> Result<ClassDescriptor> {
        let state = self.state_mut()?;
        let (inner, scratch) = state.split_write()?;
        let txn = inner.write().ok_or(Error::TxnReadOnly)?;
        let descriptor = schema::create_class(txn, scratch, name, class_type, None)?;
        self.schema_dirty = true;
        Ok(descriptor)
    }

    /// Creates a class extending `parent`; the new class inherits every
    /// ancestor property.
    pub fn add_sub_class_of(&mut self, parent: &str, name: &str) -> Result<ClassDescriptor> {
        let state = self.state_mut()?;
        let (inner, scratch) = state.split_write()?;
        let txn = inner.write().ok_or(Error::TxnReadOnly)?;
        let class_type = scratch.expect_class(parent)?.class_type;
        let descriptor = schema::create_class(txn, scratch, name, class_type, Some(parent))?;
        self.schema_dirty = true;
        Ok(descriptor)
    }

    /// Drops a class: destroys its records through the cascade path,
    /// removes its own indexes, and re-parents its children.
    pub fn drop_class(&mut self, name: &str) -> Result<()> {
        let versioned = self.versioned;
        let state = self.state_mut()?;
        let (inner, scratch) = state.split_write()?;
        let txn = inner.write().ok_or(Error::TxnReadOnly)?;
        let class_id = scratch.expect_class(name)?.id;

        let view = StoreView {
            inner,
            schema: &*scratch,
            versioned,
        };
        record::destroy_all(view, name)?;

        let own_indexes: Vec<IndexDescriptor> = scratch
            .indexes()
            .filter(|idx| idx.class_id == class_id)
            .copied()
            .collect();
        for idx in own_indexes {
            index::drop_tables(txn, &idx)?;
            schema::remove_index(txn, scratch, idx.id)?;
        }

        schema::remove_class(txn, scratch, class_id)?;
        self.schema_dirty = true;
        Ok(())
    }

    pub fn rename_class(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let state = self.state_mut()?;
        let (inner, scratch) = state.split_write()?;
        let txn = inner.write().ok_or(Error::TxnReadOnly)?;
        schema::rename_class(txn, scratch, old_name, new_name)?;
        self.schema_dirty = true;
        Ok(())
    }

    pub fn add_property(
        &mut self,
        class: &str,
        name: &str,
        property_type: PropertyType,
    ) -> Result<PropertyDescriptor> {
        let state = self.state_mut()?;
        let (inner, scratch) = state.split_write()?;
        let txn = inner.write().ok_or(Error::TxnReadOnly)?;
        let descriptor = schema::create_property(txn, scratch, class, name, property_type)?;
        self.schema_dirty = true;
        Ok(descriptor)
    }

    pub fn drop_property(&mut self, class: &str, name: &str) -> Result<()> {
        let state = self.state_mut()?;
        let (inner, scratch) = state.split_write()?;
        let txn = inner.write().ok_or(Error::TxnReadOnly)?;
        schema::remove_property(txn, scratch, class, name)?;
        self.schema_dirty = true;
        Ok(())
    }

    pub fn rename_property(&mut self, class: &str, old_name: &str, new_name: &str) -> Result<()> {
        let state = self.state_mut()?;
        let (inner, scratch) = state.split_write()?;
        let txn = inner.write().ok_or(Error::TxnReadOnly)?;
        schema::rename_property(txn, scratch, class, old_name, new_name)?;
        self.schema_dirty = true;
        Ok(())
    }

    /// Creates a secondary index on `(class, property)`, building one
    /// partition per concrete class in the subtree. On a unique index,
    /// existing duplicates reject the build before anything is written.
    pub fn add_index(&mut self, class: &str, property: &str, unique: bool) -> Result<IndexDescriptor> {
        let versioned = self.versioned;
        let state = self.state_mut()?;
        let (inner, scratch) = state.split_write()?;
        let txn = inner.write().ok_or(Error::TxnReadOnly)?;

        let (class_id, property_id) = {
            let schema: &SchemaSnapshot = scratch;
            let class_meta = schema.expect_class(class)?;
            let meta = schema
                .resolve_property(class_meta.id, property)
                .ok_or_else(|| Error::PropertyNotFound(property.to_owned()))?;
            if !index::indexable(meta.property_type) {
                return Err(Error::InvalidPropertyTypeForIndex(meta.property_type));
            }
            if schema.index_on(class_meta.id, meta.id).is_some() {
                return Err(Error::DuplicateIndex {
                    class: class.to_owned(),
                    property: property.to_owned(),
                });
            }
            (class_meta.id, meta.id)
        };

        let scan_classes = scratch.self_and_descendants(class_id);
        let partitions = {
            let view = StoreView {
                inner,
                schema: &*scratch,
                versioned,
            };
            index::build_partitions(inner, &scan_classes, unique, |cid, raw| {
                record::decode_property(view, cid, raw, property)
            })?
        };

        let descriptor = schema::insert_index(txn, scratch, class_id, property_id, unique)?;
        index::write_partitions(txn, &descriptor, &partitions)?;
        self.schema_dirty = true;
        Ok(descriptor)
    }

    pub fn drop_index(&mut self, class: &str, property: &str) -> Result<()> {
        let state = self.state_mut()?;
        let (inner, scratch) = state.split_write()?;
        let txn = inner.write().ok_or(Error::TxnReadOnly)?;

        let descriptor = {
            let schema: &SchemaSnapshot = scratch;
            let class_meta = schema.expect_class(class)?;
            let meta = schema
                .resolve_property(class_meta.id, property)
                .ok_or_else(|| Error::PropertyNotFound(property.to_owned()))?;
            schema
                .indexes()
                .find(|idx| idx.class_id == class_meta.id && idx.property_id == meta.id)
                .copied()
                .ok_or_else(|| Error::IndexNotFound {
                    class: class.to_owned(),
                    property: property.to_owned(),
                })?
        };

        index::drop_tables(txn, &descriptor)?;
        schema::remove_index(txn, scratch, descriptor.id)?;
        self.schema_dirty = true;
        Ok(())
    }

    // --- schema accessors ---

    pub fn get_class(&self, name: &str) -> Result<ClassDescriptor> {
        Ok(self.state()?.schema().expect_class(name)?.descriptor())
    }

    pub fn get_class_by_id(&self, id: nogdb_api::ClassId) -> Result<ClassDescriptor> {
        Ok(self.state()?.schema().expect_class_id(id)?.descriptor())
    }

    pub fn get_classes(&self) -> Result<Vec<ClassDescriptor>> {
        Ok(self
            .state()?
            .schema()
            .classes()
            .map(|class| class.descriptor())
            .collect())
    }

    /// Own plus inherited properties of a class.
    pub fn get_properties(&self, class: &str) -> Result<Vec<PropertyDescriptor>> {
        let schema = self.state()?.schema();
        let class_id = schema.expect_class(class)?.id;
        Ok(schema.property_descriptors(class_id))
    }

    pub fn get_index(&self, class: &str, property: &str) -> Result<IndexDescriptor> {
        let schema = self.state()?.schema();
        let class_meta = schema.expect_class(class)?;
        let meta = schema
            .resolve_property(class_meta.id, property)
            .ok_or_else(|| Error::PropertyNotFound(property.to_owned()))?;
        schema
            .index_on(class_meta.id, meta.id)
            .ok_or_else(|| Error::IndexNotFound {
                class: class.to_owned(),
                property: property.to_owned(),
            })
    }

    pub fn get_db_info(&self) -> Result<DbInfo> {
        Ok(self.state()?.schema().db_info())
    }

    // --- record CRUD ---

    /// Creates a vertex record and its empty adjacency entry.
    pub fn add_vertex(&mut self, class: &str, record: Record) -> Result<RecordDescriptor> {
        record::create_vertex(self.store_view()?, class, &record)
    }

    /// Creates an edge record pinned to two existing vertices.
    pub fn add_edge(
        &mut self,
        class: &str,
        src: &RecordDescriptor,
        dst: &RecordDescriptor,
        record: Record,
    ) -> Result<RecordDescriptor> {
        record::create_edge(self.store_view()?, class, src, dst, &record)
    }

    /// Replaces a record's properties; `@version` increments by one.
    pub fn update(&mut self, descriptor: &RecordDescriptor, record: Record) -> Result<()> {
        record::update(self.store_view()?, descriptor, &record)
    }

    /// Destroys one record. Destroying a vertex cascades to every
    /// incident edge.
    pub fn destroy(&mut self, descriptor: &RecordDescriptor) -> Result<()> {
        record::destroy(self.store_view()?, descriptor)
    }

    /// Destroys every record of `class` (subclasses excluded) through
    /// the single-record cascade path. Returns how many went away.
    pub fn destroy_all(&mut self, class: &str) -> Result<u64> {
        record::destroy_all(self.store_view()?, class)
    }

    /// Fetches one record with its synthetic columns attached.
    pub fn fetch_record(&self, descriptor: &RecordDescriptor) -> Result<Record> {
        record::fetch(self.store_view()?, descriptor, false)
    }

    pub(crate) fn fetch_record_at_depth(&self, descriptor: &RecordDescriptor) -> Result<Record> {
        record::fetch(self.store_view()?, descriptor, true)
    }

    // --- graph relation ---

    pub fn fetch_src(&self, edge: &RecordDescriptor) -> Result<RecordDescriptor> {
        record::edge_endpoints(self.store_view()?, edge).map(|(src, _)| src)
    }

    pub fn fetch_dst(&self, edge: &RecordDescriptor) -> Result<RecordDescriptor> {
        record::edge_endpoints(self.store_view()?, edge).map(|(_, dst)| dst)
    }

    pub fn fetch_src_dst(
        &self,
        edge: &RecordDescriptor,
    ) -> Result<(RecordDescriptor, RecordDescriptor)> {
        record::edge_endpoints(self.store_view()?, edge)
    }

    pub fn get_in_edges(
        &self,
        vertex: &RecordDescriptor,
        filter: &GraphFilter,
    ) -> Result<Vec<RecordDescriptor>> {
        record::get_edges(self.store_view()?, vertex, Direction::In, filter)
    }

    pub fn get_out_edges(
        &self,
        vertex: &RecordDescriptor,
        filter: &GraphFilter,
    ) -> Result<Vec<RecordDescriptor>> {
        record::get_edges(self.store_view()?, vertex, Direction::Out, filter)
    }

    pub fn get_all_edges(
        &self,
        vertex: &RecordDescriptor,
        filter: &GraphFilter,
    ) -> Result<Vec<RecordDescriptor>> {
        record::get_edges(self.store_view()?, vertex, Direction::All, filter)
    }

    // --- queries ---

    /// Scan of one class in positional order.
    pub fn find(&self, class: &str) -> FindBuilder<'_, 'ctx> {
        FindBuilder::new(self, class, false)
    }

    /// Scan of a class and all of its descendants, DFS pre-order.
    pub fn find_sub_class_of(&self, class: &str) -> FindBuilder<'_, 'ctx> {
        FindBuilder::new(self, class, true)
    }

    /// Multi-hop traversal over both edge directions.
    pub fn traverse(&self, source: &RecordDescriptor) -> TraverseBuilder<'_, 'ctx> {
        TraverseBuilder::new(self, *source, Direction::All)
    }

    /// Multi-hop traversal following in-edges.
    pub fn traverse_in(&self, source: &RecordDescriptor) -> TraverseBuilder<'_, 'ctx> {
        TraverseBuilder::new(self, *source, Direction::In)
    }

    /// Multi-hop traversal following out-edges.
    pub fn traverse_out(&self, source: &RecordDescriptor) -> TraverseBuilder<'_, 'ctx> {
        TraverseBuilder::new(self, *source, Direction::Out)
    }

    /// Single-source shortest path over out-edges.
    pub fn shortest_path(
        &self,
        src: &RecordDescriptor,
        dst: &RecordDescriptor,
    ) -> ShortestPathBuilder<'_, 'ctx> {
        ShortestPathBuilder::new(self, *src, *dst)
    }
}
