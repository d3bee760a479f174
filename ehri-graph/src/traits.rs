// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::GraphError;

/// Flat property map of a vertex.
pub type Properties = BTreeMap<String, Value>;

/// Identifier of an edge, unique within one store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Direction of an edge relative to the vertex it is looked up from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    Out,
    In,
}

impl Direction {
    pub fn reverse(&self) -> Self {
        match self {
            Direction::Out => Direction::In,
            Direction::In => Direction::Out,
        }
    }
}

/// Snapshot of a vertex read from the store.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vertex {
    pub id: String,
    pub label: String,
    pub properties: Properties,
}

impl Vertex {
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Returns the property as a string slice if it is set and holds a string.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn property_i64(&self, key: &str) -> Option<i64> {
        self.properties.get(key).and_then(Value::as_i64)
    }
}

/// Snapshot of a directed, labelled edge.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge {
    pub id: EdgeId,
    pub label: String,
    pub from: String,
    pub to: String,
}

impl Edge {
    /// Returns the id of the vertex on the other end of the edge, seen from `id`.
    pub fn other(&self, id: &str) -> &str {
        if self.from == id { &self.to } else { &self.from }
    }
}

/// Interface to a transactional property graph.
///
/// All methods take `&self`, implementations are expected to use interior mutability. Edge
/// lookups return edges in the order they were created.
pub trait GraphStore {
    /// Returns `true` if a vertex with this id exists.
    fn exists(&self, id: &str) -> Result<bool, GraphError>;

    fn get_vertex(&self, id: &str) -> Result<Option<Vertex>, GraphError>;

    /// Creates a vertex, failing with [`GraphError::DuplicateId`] if the id is already taken.
    fn create_vertex(
        &self,
        id: &str,
        label: &str,
        properties: Properties,
    ) -> Result<Vertex, GraphError>;

    /// Replaces the full property map of a vertex, keeping id and label.
    fn update_vertex(&self, id: &str, properties: Properties) -> Result<Vertex, GraphError>;

    fn set_property(&self, id: &str, key: &str, value: Value) -> Result<(), GraphError>;

    /// Removes a property, returning the previous value if there was one.
    fn remove_property(&self, id: &str, key: &str) -> Result<Option<Value>, GraphError>;

    /// Deletes a vertex together with all its incident edges.
    fn delete_vertex(&self, id: &str) -> Result<(), GraphError>;

    fn add_edge(&self, from: &str, label: &str, to: &str) -> Result<Edge, GraphError>;

    fn remove_edge(&self, id: EdgeId) -> Result<(), GraphError>;

    /// Returns all edges with the given label, going out of or coming into the vertex.
    fn edges(&self, id: &str, direction: Direction, label: &str) -> Result<Vec<Edge>, GraphError>;

    /// Returns all vertices carrying the given label.
    fn vertices_by_label(&self, label: &str) -> Result<Vec<Vertex>, GraphError>;

    /// Indexed lookup by property value, optionally restricted to one label.
    fn vertices_by_property(
        &self,
        key: &str,
        value: &Value,
        label: Option<&str>,
    ) -> Result<Vec<Vertex>, GraphError>;

    /// Returns the vertices adjacent to `id` over edges with the given label.
    fn vertices(
        &self,
        id: &str,
        direction: Direction,
        label: &str,
    ) -> Result<Vec<Vertex>, GraphError> {
        let mut vertices = Vec::new();
        for edge in self.edges(id, direction, label)? {
            let other = match direction {
                Direction::Out => &edge.to,
                Direction::In => &edge.from,
            };
            let vertex = self
                .get_vertex(other)?
                .ok_or_else(|| GraphError::VertexNotFound(other.clone()))?;
            vertices.push(vertex);
        }
        Ok(vertices)
    }

    /// Returns `true` if an edge `from -[label]-> to` exists.
    fn has_edge(&self, from: &str, label: &str, to: &str) -> Result<bool, GraphError> {
        Ok(self
            .edges(from, Direction::Out, label)?
            .iter()
            .any(|edge| edge.to == to))
    }

    fn count_edges(
        &self,
        id: &str,
        direction: Direction,
        label: &str,
    ) -> Result<usize, GraphError> {
        Ok(self.edges(id, direction, label)?.len())
    }
}

/// Transaction provider.
///
/// To guard against sharing transactions unknowingly across unrelated operations, a "permit" is
/// handed out on `begin` which needs to be given back on `commit` or `rollback`. It does not
/// protect from misuse but makes "holding" a transaction explicit.
pub trait Transaction {
    type Permit;

    /// Begins a transaction.
    fn begin(&self) -> Result<Self::Permit, GraphError>;

    /// Rolls back the transaction and with that all uncommitted changes.
    fn rollback(&self, permit: Self::Permit) -> Result<(), GraphError>;

    /// Commits the transaction.
    fn commit(&self, permit: Self::Permit) -> Result<(), GraphError>;
}

/// Runs `f` inside a transaction, committing on success and rolling back on error.
pub fn with_transaction<S, T, E, F>(store: &S, f: F) -> Result<T, E>
where
    S: Transaction,
    E: From<GraphError>,
    F: FnOnce() -> Result<T, E>,
{
    let permit = store.begin()?;
    match f() {
        Ok(value) => {
            store.commit(permit)?;
            Ok(value)
        }
        Err(err) => {
            store.rollback(permit)?;
            Err(err)
        }
    }
}
