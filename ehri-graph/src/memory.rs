// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory property graph.
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use petgraph::Direction as EdgeDirection;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use serde_json::Value;
use tracing::trace;

use crate::{Direction, Edge, EdgeId, GraphError, GraphStore, Properties, Transaction, Vertex};

#[derive(Clone, Debug)]
struct StoredVertex {
    id: String,
    label: String,
    properties: Properties,
}

#[derive(Clone, Debug)]
struct StoredEdge {
    id: EdgeId,
    label: String,
}

/// Graph state guarded by the lock of a `MemoryGraph`.
#[derive(Clone, Debug, Default)]
struct InnerMemoryGraph {
    graph: StableDiGraph<StoredVertex, StoredEdge>,
    vertex_index: HashMap<String, NodeIndex>,
    edge_index: HashMap<EdgeId, EdgeIndex>,
    next_edge_id: u64,
}

impl InnerMemoryGraph {
    fn node(&self, id: &str) -> Result<NodeIndex, GraphError> {
        self.vertex_index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::VertexNotFound(id.to_owned()))
    }

    fn vertex(&self, node: NodeIndex) -> Option<Vertex> {
        self.graph.node_weight(node).map(|stored| Vertex {
            id: stored.id.clone(),
            label: stored.label.clone(),
            properties: stored.properties.clone(),
        })
    }

    fn edge(&self, index: EdgeIndex) -> Option<Edge> {
        let (from, to) = self.graph.edge_endpoints(index)?;
        let stored = self.graph.edge_weight(index)?;
        Some(Edge {
            id: stored.id,
            label: stored.label.clone(),
            from: self.graph.node_weight(from)?.id.clone(),
            to: self.graph.node_weight(to)?.id.clone(),
        })
    }

    fn stored_mut(&mut self, id: &str) -> Result<&mut StoredVertex, GraphError> {
        let node = self.node(id)?;
        self.graph
            .node_weight_mut(node)
            .ok_or_else(|| GraphError::VertexNotFound(id.to_owned()))
    }
}

/// An in-memory property graph.
///
/// `MemoryGraph` is a cheaply cloneable handle, all clones share the same underlying graph which
/// is wrapped with an `RwLock` and `Arc`. Transactions are implemented by taking a snapshot of
/// the whole graph on `begin` and restoring it on `rollback`.
#[derive(Clone, Debug, Default)]
pub struct MemoryGraph {
    inner: Arc<RwLock<InnerMemoryGraph>>,
}

impl MemoryGraph {
    /// Create a new, empty in-memory graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices currently stored.
    pub fn vertex_count(&self) -> usize {
        self.read_graph().graph.node_count()
    }

    /// Number of edges currently stored.
    pub fn edge_count(&self) -> usize {
        self.read_graph().graph.edge_count()
    }

    fn read_graph(&self) -> RwLockReadGuard<'_, InnerMemoryGraph> {
        self.inner
            .read()
            .expect("acquire shared read access on graph")
    }

    fn write_graph(&self) -> RwLockWriteGuard<'_, InnerMemoryGraph> {
        self.inner
            .write()
            .expect("acquire exclusive write access on graph")
    }
}

impl GraphStore for MemoryGraph {
    fn exists(&self, id: &str) -> Result<bool, GraphError> {
        Ok(self.read_graph().vertex_index.contains_key(id))
    }

    fn get_vertex(&self, id: &str) -> Result<Option<Vertex>, GraphError> {
        let inner = self.read_graph();
        Ok(inner
            .vertex_index
            .get(id)
            .and_then(|node| inner.vertex(*node)))
    }

    fn create_vertex(
        &self,
        id: &str,
        label: &str,
        properties: Properties,
    ) -> Result<Vertex, GraphError> {
        let mut inner = self.write_graph();
        if inner.vertex_index.contains_key(id) {
            return Err(GraphError::DuplicateId(id.to_owned()));
        }

        trace!(id, label, "create vertex");
        let vertex = Vertex {
            id: id.to_owned(),
            label: label.to_owned(),
            properties: properties.clone(),
        };
        let node = inner.graph.add_node(StoredVertex {
            id: id.to_owned(),
            label: label.to_owned(),
            properties,
        });
        inner.vertex_index.insert(id.to_owned(), node);
        Ok(vertex)
    }

    fn update_vertex(&self, id: &str, properties: Properties) -> Result<Vertex, GraphError> {
        let mut inner = self.write_graph();
        let stored = inner.stored_mut(id)?;
        stored.properties = properties;
        Ok(Vertex {
            id: stored.id.clone(),
            label: stored.label.clone(),
            properties: stored.properties.clone(),
        })
    }

    fn set_property(&self, id: &str, key: &str, value: Value) -> Result<(), GraphError> {
        let mut inner = self.write_graph();
        inner.stored_mut(id)?.properties.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove_property(&self, id: &str, key: &str) -> Result<Option<Value>, GraphError> {
        let mut inner = self.write_graph();
        Ok(inner.stored_mut(id)?.properties.remove(key))
    }

    fn delete_vertex(&self, id: &str) -> Result<(), GraphError> {
        let mut inner = self.write_graph();
        let node = inner.node(id)?;

        let incident: Vec<EdgeId> = inner
            .graph
            .edges_directed(node, EdgeDirection::Outgoing)
            .chain(inner.graph.edges_directed(node, EdgeDirection::Incoming))
            .map(|edge| edge.weight().id)
            .collect();
        for edge_id in incident {
            inner.edge_index.remove(&edge_id);
        }

        trace!(id, "delete vertex");
        inner.graph.remove_node(node);
        inner.vertex_index.remove(id);
        Ok(())
    }

    fn add_edge(&self, from: &str, label: &str, to: &str) -> Result<Edge, GraphError> {
        let mut inner = self.write_graph();
        let source = inner.node(from)?;
        let target = inner.node(to)?;

        let id = EdgeId(inner.next_edge_id);
        inner.next_edge_id += 1;

        let index = inner.graph.add_edge(
            source,
            target,
            StoredEdge {
                id,
                label: label.to_owned(),
            },
        );
        inner.edge_index.insert(id, index);

        Ok(Edge {
            id,
            label: label.to_owned(),
            from: from.to_owned(),
            to: to.to_owned(),
        })
    }

    fn remove_edge(&self, id: EdgeId) -> Result<(), GraphError> {
        let mut inner = self.write_graph();
        let index = inner
            .edge_index
            .remove(&id)
            .ok_or(GraphError::EdgeNotFound(id))?;
        inner.graph.remove_edge(index);
        Ok(())
    }

    fn edges(&self, id: &str, direction: Direction, label: &str) -> Result<Vec<Edge>, GraphError> {
        let inner = self.read_graph();
        let node = inner.node(id)?;
        let direction = match direction {
            Direction::Out => EdgeDirection::Outgoing,
            Direction::In => EdgeDirection::Incoming,
        };

        let mut edges: Vec<Edge> = inner
            .graph
            .edges_directed(node, direction)
            .filter(|edge| edge.weight().label == label)
            .filter_map(|edge| inner.edge(edge.id()))
            .collect();

        // Edge ids are handed out in ascending order.
        edges.sort_by_key(|edge| edge.id);
        Ok(edges)
    }

    fn vertices_by_label(&self, label: &str) -> Result<Vec<Vertex>, GraphError> {
        let inner = self.read_graph();
        let mut vertices: Vec<Vertex> = inner
            .graph
            .node_indices()
            .filter(|node| inner.graph[*node].label == label)
            .filter_map(|node| inner.vertex(node))
            .collect();
        vertices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(vertices)
    }

    fn vertices_by_property(
        &self,
        key: &str,
        value: &Value,
        label: Option<&str>,
    ) -> Result<Vec<Vertex>, GraphError> {
        let inner = self.read_graph();
        let mut vertices: Vec<Vertex> = inner
            .graph
            .node_indices()
            .filter(|node| {
                let stored = &inner.graph[*node];
                label.is_none_or(|label| stored.label == label)
                    && stored.properties.get(key) == Some(value)
            })
            .filter_map(|node| inner.vertex(node))
            .collect();
        vertices.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(vertices)
    }
}

/// Permit of a `MemoryGraph` transaction, holding the state to restore on rollback.
#[derive(Debug)]
pub struct MemoryPermit {
    snapshot: InnerMemoryGraph,
}

impl Transaction for MemoryGraph {
    type Permit = MemoryPermit;

    fn begin(&self) -> Result<Self::Permit, GraphError> {
        Ok(MemoryPermit {
            snapshot: self.read_graph().clone(),
        })
    }

    fn rollback(&self, permit: Self::Permit) -> Result<(), GraphError> {
        trace!("rollback transaction");
        *self.write_graph() = permit.snapshot;
        Ok(())
    }

    fn commit(&self, _permit: Self::Permit) -> Result<(), GraphError> {
        Ok(())
    }
}
