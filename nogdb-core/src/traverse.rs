//! Multi-hop traversal: a shared skeleton over direction and strategy
//! with a depth window and per-edge / per-vertex filters.
//!
//! Semantics: every vertex is emitted at most once, at its discovery
//! depth. A vertex rejected by the vertex filter is skipped but not
//! marked visited, so another path may still reach it. Sources are
//! admitted at depth 0 and emitted only when the window opens at 0 and
//! the vertex filter passes.

use std::collections::{HashSet, VecDeque};

use nogdb_api::{ClassId, ClassType, RecordDescriptor, RecordId};

use crate::error::{Error, Result};
use crate::graph::{self, Direction, GraphFilter};
use crate::record::{self, StoreView};
use crate::result::{ResultRow, ResultSet, ResultSetCursor};
use crate::txn::Txn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraverseStrategy {
    BreadthFirst,
    DepthFirst,
}

/// Builder for BFS/DFS traversal from one or more source vertices.
pub struct TraverseBuilder<'t, 'ctx> {
    txn: &'t Txn<'ctx>,
    sources: Vec<RecordDescriptor>,
    direction: Direction,
    min_depth: u32,
    max_depth: u32,
    edge_filter: GraphFilter,
    vertex_filter: GraphFilter,
    strategy: TraverseStrategy,
}

impl<'t, 'ctx> TraverseBuilder<'t, 'ctx> {
    pub(crate) fn new(txn: &'t Txn<'ctx>, source: RecordDescriptor, direction: Direction) -> Self {
        Self {
            txn,
            sources: vec![source],
            direction,
            min_depth: 0,
            max_depth: u32::MAX,
            edge_filter: GraphFilter::new(),
            vertex_filter: GraphFilter::new(),
            strategy: TraverseStrategy::BreadthFirst,
        }
    }

    /// Adds another source vertex; discovery state is shared across
    /// sources.
    pub fn add_source(mut self, source: &RecordDescriptor) -> Self {
        self.sources.push(*source);
        self
    }

    /// Depth window `[min, max]`; `u32::MAX` leaves the far end open.
    pub fn depth(mut self, min: u32, max: u32) -> Self {
        self.min_depth = min;
        self.max_depth = max;
        self
    }

    pub fn where_edge(mut self, filter: GraphFilter) -> Self {
        self.edge_filter = filter;
        self
    }

    pub fn where_vertex(mut self, filter: GraphFilter) -> Self {
        self.vertex_filter = filter;
        self
    }

    pub fn strategy(mut self, strategy: TraverseStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn get(self) -> Result<ResultSet> {
        let txn = self.txn;
        let descriptors = self.execute()?;
        descriptors
            .into_iter()
            .map(|descriptor| {
                let record = txn.fetch_record_at_depth(&descriptor)?;
                Ok(ResultRow { descriptor, record })
            })
            .collect()
    }

    pub fn get_cursor(self) -> Result<ResultSetCursor<'t, 'ctx>> {
        let txn = self.txn;
        let descriptors = self.execute()?;
        Ok(ResultSetCursor::new(txn, descriptors, true))
    }

    fn execute(self) -> Result<Vec<RecordDescriptor>> {
        let view = self.txn.store_view()?;
        let walk = Walk::prepare(
            view,
            &self.sources,
            self.direction,
            &self.edge_filter,
            &self.vertex_filter,
        )?;

        let mut state = WalkState {
            visited: HashSet::new(),
            output: Vec::new(),
            min_depth: self.min_depth,
            max_depth: self.max_depth,
        };

        for source in &self.sources {
            state.visited.insert(source.rid);
        }
        for source in &self.sources {
            if self.min_depth == 0 && walk.vertex_passes(source.rid)? {
                state.output.push(RecordDescriptor::with_depth(source.rid, 0));
            }
        }

        match self.strategy {
            TraverseStrategy::BreadthFirst => {
                let mut queue: VecDeque<(RecordId, u32)> =
                    self.sources.iter().map(|s| (s.rid, 0)).collect();
                while let Some((vertex, depth)) = queue.pop_front() {
                    if depth >= state.max_depth {
                        continue;
                    }
                    for neighbor in walk.expand(&mut state, vertex, depth)? {
                        queue.push_back((neighbor, depth + 1));
                    }
                }
            }
            TraverseStrategy::DepthFirst => {
                for source in &self.sources {
                    walk.descend(&mut state, source.rid, 0)?;
                }
            }
        }

        Ok(state.output)
    }
}

struct WalkState {
    visited: HashSet<RecordId>,
    output: Vec<RecordDescriptor>,
    min_depth: u32,
    max_depth: u32,
}

/// Resolved traversal parameters shared by both strategies.
struct Walk<'a> {
    view: StoreView<'a>,
    direction: Direction,
    edge_classes: Option<HashSet<ClassId>>,
    vertex_classes: Option<HashSet<ClassId>>,
    edge_filter: &'a GraphFilter,
    vertex_filter: &'a GraphFilter,
}

impl<'a> Walk<'a> {
    fn prepare(
        view: StoreView<'a>,
        sources: &[RecordDescriptor],
        direction: Direction,
        edge_filter: &'a GraphFilter,
        vertex_filter: &'a GraphFilter,
    ) -> Result<Self> {
        for source in sources {
            let class = view.schema.expect_class_id(source.rid.class_id)?;
            if class.class_type != ClassType::Vertex {
                return Err(Error::ClassTypeMismatch(format!(
                    "{} is not a vertex class",
                    class.name
                )));
            }
            if graph::adjacency(view.inner, source.rid)?.is_none() {
                return Err(Error::VertexNotFound(source.rid));
            }
        }
        Ok(Self {
            view,
            direction,
            edge_classes: edge_filter.resolve_classes(view.schema, ClassType::Edge)?,
            vertex_classes: vertex_filter.resolve_classes(view.schema, ClassType::Vertex)?,
            edge_filter,
            vertex_filter,
        })
    }

    fn edge_passes(&self, edge: RecordId) -> Result<bool> {
        if let Some(allowed) = &self.edge_classes {
            if !allowed.contains(&edge.class_id) {
                return Ok(false);
            }
        }
        if let Some(condition) = self.edge_filter.condition() {
            let record = record::fetch(self.view, &RecordDescriptor::from(edge), false)?;
            if !condition.eval(&record) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn vertex_passes(&self, vertex: RecordId) -> Result<bool> {
        if let Some(allowed) = &self.vertex_classes {
            if !allowed.contains(&vertex.class_id) {
                return Ok(false);
            }
        }
        if let Some(condition) = self.vertex_filter.condition() {
            let record = record::fetch(self.view, &RecordDescriptor::from(vertex), false)?;
            if !condition.eval(&record) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// One step of expansion: filters the incident edges of `vertex`,
    /// admits the surviving neighbors, and returns them in discovery
    /// order for the caller's strategy to continue from.
    fn expand(
        &self,
        state: &mut WalkState,
        vertex: RecordId,
        depth: u32,
    ) -> Result<Vec<RecordId>> {
        let mut discovered = Vec::new();
        for edge in graph::incident_edges(self.view.inner, vertex, self.direction)? {
            if !self.edge_passes(edge)? {
                continue;
            }
            let (src, dst) = graph::endpoints(self.view.inner, edge)?
                .ok_or(Error::Corrupted("edge has no endpoints entry"))?;
            let neighbor = match self.direction {
                Direction::Out => dst,
                Direction::In => src,
                Direction::All => {
                    if src == vertex {
                        dst
                    } else {
                        src
                    }
                }
            };
            if state.visited.contains(&neighbor) {
                continue;
            }
            // Rejected vertices stay unvisited so an alternate path may
            // still reach them.
            if !self.vertex_passes(neighbor)? {
                continue;
            }
            state.visited.insert(neighbor);
            if depth + 1 >= state.min_depth {
                state
                    .output
                    .push(RecordDescriptor::with_depth(neighbor, depth + 1));
            }
            discovered.push(neighbor);
        }
        Ok(discovered)
    }

    /// Depth-first descent: each discovered neighbor is fully explored
    /// before its next sibling is considered.
    fn descend(&self, state: &mut WalkState, vertex: RecordId, depth: u32) -> Result<()> {
        if depth >= state.max_depth {
            return Ok(());
        }
        for edge in graph::incident_edges(self.view.inner, vertex, self.direction)? {
            if !self.edge_passes(edge)? {
                continue;
            }
            let (src, dst) = graph::endpoints(self.view.inner, edge)?
                .ok_or(Error::Corrupted("edge has no endpoints entry"))?;
            let neighbor = match self.direction {
                Direction::Out => dst,
                Direction::In => src,
                Direction::All => {
                    if src == vertex {
                        dst
                    } else {
                        src
                    }
                }
            };
            if state.visited.contains(&neighbor) {
                continue;
            }
            if !self.vertex_passes(neighbor)? {
                continue;
            }
            state.visited.insert(neighbor);
            if depth + 1 >= state.min_depth {
                state
                    .output
                    .push(RecordDescriptor::with_depth(neighbor, depth + 1));
            }
            self.descend(state, neighbor, depth + 1)?;
        }
        Ok(())
    }
}
