// SPDX-License-Identifier: MIT OR Apache-2.0

use ehri_graph::GraphError;
use thiserror::Error;

use crate::persistence::{Bundle, ErrorSet};

/// A bundle did not pass validation.
///
/// Carries the offending bundle and an error set pinpointing every problem found in its tree.
#[derive(Debug, Error)]
#[error("validation failed for {} bundle: {errors}", .bundle.class())]
pub struct ValidationError {
    pub bundle: Box<Bundle>,
    pub errors: ErrorSet,
}

impl ValidationError {
    pub fn new(bundle: Bundle, errors: ErrorSet) -> Self {
        Self {
            bundle: Box::new(bundle),
            errors,
        }
    }
}

/// No item with the given id exists.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("item with id '{0}' not found")]
pub struct ItemNotFound(pub String);

/// An accessor attempted an action it is not allowed to perform.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("accessor '{accessor}' does not have permission to {action}")]
pub struct PermissionDenied {
    pub accessor: String,
    pub action: String,
}

impl PermissionDenied {
    pub fn new(accessor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            accessor: accessor.into(),
            action: action.into(),
        }
    }
}

/// Malformed bundle wire format.
#[derive(Debug, Error)]
pub enum DeserializationError {
    #[error("error decoding JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bundle data must be a map value")]
    NotAMap,

    #[error("bad or unknown type key: {0}")]
    UnknownType(String),

    #[error("id value must be a string, got {0}")]
    InvalidId(String),

    #[error("data value not a map type: {0}")]
    InvalidData(String),

    #[error("relationships value should be a map type")]
    InvalidRelations,
}

/// A vertex could not be turned into a bundle, or a bundle could not be encoded.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("unable to serialize vertex '{id}' with unknown type '{label}'")]
    UnknownType { id: String, label: String },

    #[error("error encoding data: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors returned by persistence operations on bundles, items and events.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    ItemNotFound(#[from] ItemNotFound),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Deserialization(#[from] DeserializationError),

    #[error(transparent)]
    Graph(GraphError),

    /// A duplicate id slipped through validation.
    ///
    /// Id collisions are normally reported as validation errors by the id generator. Reaching
    /// this means two generated ids collided between validation and write.
    #[error("unexpected id collision on '{0}' not caught by the id generator")]
    IdCollision(String),

    #[error("{0} bundle has no id")]
    MissingId(String),

    #[error("item '{id}' has unexpected type '{label}'")]
    UnexpectedType { id: String, label: String },

    #[error("invalid event timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("event root '{0}' not found, the graph might not be initialised")]
    MissingEventRoot(String),
}

impl From<GraphError> for PersistenceError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::VertexNotFound(id) => PersistenceError::ItemNotFound(ItemNotFound(id)),
            err => PersistenceError::Graph(err),
        }
    }
}
