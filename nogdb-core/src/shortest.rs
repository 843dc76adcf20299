//! Single-source shortest path over out-edges (Dijkstra with lazy
//! decrease-key), parameterised by an edge-cost function.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use nogdb_api::{ClassType, RecordDescriptor, RecordId};

use crate::error::{Error, Result};
use crate::graph::{self, Direction, GraphFilter};
use crate::record::{self, StoreView};
use crate::result::{ResultRow, ResultSet};
use crate::txn::Txn;

/// Builder for `shortest_path(src, dst)`.
///
/// `get()` runs the unweighted case (every hop costs 1);
/// `get_with_cost` takes a custom cost over any ordered non-negative
/// type that adds. The vertex filter applies to every vertex a path
/// relaxes into; the edge filter prunes edges before their cost is even
/// computed.
pub struct ShortestPathBuilder<'t, 'ctx> {
    txn: &'t Txn<'ctx>,
    src: RecordDescriptor,
    dst: RecordDescriptor,
    edge_filter: GraphFilter,
    vertex_filter: GraphFilter,
}

/// Min-heap entry; the reversed ordering turns `BinaryHeap` into a
/// min-heap. Incomparable costs (never produced by a sane cost function)
/// tie.
struct HeapEntry<T> {
    cost: T,
    vertex: RecordId,
}

impl<T: PartialOrd> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: PartialOrd> Eq for HeapEntry<T> {}

impl<T: PartialOrd> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: PartialOrd> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl<'t, 'ctx> ShortestPathBuilder<'t, 'ctx> {
    pub(crate) fn new(txn: &'t Txn<'ctx>, src: RecordDescriptor, dst: RecordDescriptor) -> Self {
        Self {
            txn,
            src,
            dst,
            edge_filter: GraphFilter::new(),
            vertex_filter: GraphFilter::new(),
        }
    }

    pub fn where_edge(mut self, filter: GraphFilter) -> Self {
        self.edge_filter = filter;
        self
    }

    pub fn where_vertex(mut self, filter: GraphFilter) -> Self {
        self.vertex_filter = filter;
        self
    }

    /// Unweighted shortest path: hop count as the cost.
    pub fn get(self) -> Result<(u64, ResultSet)> {
        self.get_with_cost(|_, _| Ok(1u64))
    }

    /// Weighted shortest path. Returns the total cost and the path from
    /// source to destination with `@depth` set to each hop index, or
    /// `(T::default(), empty)` when no path exists.
    pub fn get_with_cost<T, F>(self, cost_fn: F) -> Result<(T, ResultSet)>
    where
        T: Clone + PartialOrd + Default + std::ops::Add<Output = T>,
        F: Fn(&Txn<'ctx>, &RecordDescriptor) -> Result<T>,
    {
        let txn = self.txn;
        let view = txn.store_view()?;

        ensure_vertex_class(view, self.src.rid)?;
        ensure_vertex_class(view, self.dst.rid)?;
        if graph::adjacency(view.inner, self.src.rid)?.is_none() {
            return Err(Error::SourceNotFound(self.src.rid));
        }
        if graph::adjacency(view.inner, self.dst.rid)?.is_none() {
            return Err(Error::DestNotFound(self.dst.rid));
        }

        let src = self.src.rid;
        let dst = self.dst.rid;
        if src == dst {
            let descriptor = RecordDescriptor::with_depth(src, 0);
            let record = txn.fetch_record_at_depth(&descriptor)?;
            return Ok((T::default(), vec![ResultRow { descriptor, record }]));
        }

        let edge_classes = self.edge_filter.resolve_classes(view.schema, ClassType::Edge)?;
        let vertex_classes = self
            .vertex_filter
            .resolve_classes(view.schema, ClassType::Vertex)?;

        let mut distance: HashMap<RecordId, T> = HashMap::new();
        let mut parent: HashMap<RecordId, RecordId> = HashMap::new();
        let mut heap: BinaryHeap<HeapEntry<T>> = BinaryHeap::new();

        distance.insert(src, T::default());
        heap.push(HeapEntry {
            cost: T::default(),
            vertex: src,
        });

        while let Some(HeapEntry { cost, vertex }) = heap.pop() {
            if vertex == dst {
                break;
            }
            // Lazy decrease-key: stale entries are simply skipped.
            if let Some(best) = distance.get(&vertex) {
                if cost.partial_cmp(best) == Some(Ordering::Greater) {
                    continue;
                }
            }

            for edge in graph::incident_edges(view.inner, vertex, Direction::Out)? {
                if let Some(allowed) = &edge_classes {
                    if !allowed.contains(&edge.class_id) {
                        continue;
                    }
                }
                let edge_descriptor = RecordDescriptor::from(edge);
                if let Some(condition) = self.edge_filter.condition() {
                    let record = record::fetch(view, &edge_descriptor, false)?;
                    if !condition.eval(&record) {
                        continue;
                    }
                }
                let (_, neighbor) = graph::endpoints(view.inner, edge)?
                    .ok_or(Error::Corrupted("edge has no endpoints entry"))?;
                if let Some(allowed) = &vertex_classes {
                    if !allowed.contains(&neighbor.class_id) {
                        continue;
                    }
                }
                if let Some(condition) = self.vertex_filter.condition() {
                    let record = record::fetch(view, &RecordDescriptor::from(neighbor), false)?;
                    if !condition.eval(&record) {
                        continue;
                    }
                }

                let next = cost.clone() + cost_fn(txn, &edge_descriptor)?;
                let better = match distance.get(&neighbor) {
                    Some(current) => next.partial_cmp(current) == Some(Ordering::Less),
                    None => true,
                };
                if better {
                    distance.insert(neighbor, next.clone());
                    parent.insert(neighbor, edge);
                    heap.push(HeapEntry {
                        cost: next,
                        vertex: neighbor,
                    });
                }
            }
        }

        let Some(total) = distance.get(&dst).cloned() else {
            return Ok((T::default(), Vec::new()));
        };

        // Walk parent edges back from the destination, then annotate
        // each hop with its index along the path.
        let mut path = vec![dst];
        let mut cursor = dst;
        while cursor != src {
            let edge = *parent
                .get(&cursor)
                .ok_or(Error::Corrupted("shortest-path parent chain broken"))?;
            let (from, _) = graph::endpoints(view.inner, edge)?
                .ok_or(Error::Corrupted("edge has no endpoints entry"))?;
            cursor = from;
            path.push(cursor);
        }
        path.reverse();

        let rows = path
            .into_iter()
            .enumerate()
            .map(|(hop, rid)| {
                let descriptor = RecordDescriptor::with_depth(rid, hop as u32);
                let record = txn.fetch_record_at_depth(&descriptor)?;
                Ok(ResultRow { descriptor, record })
            })
            .collect::<Result<ResultSet>>()?;
        Ok((total, rows))
    }
}

fn ensure_vertex_class(view: StoreView<'_>, rid: RecordId) -> Result<()> {
    let class = view.schema.expect_class_id(rid.class_id)?;
    if class.class_type != ClassType::Vertex {
        return Err(Error::ClassTypeMismatch(format!(
            "{} is not a vertex class",
            class.name
        )));
    }
    Ok(())
}
