// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

use crate::EdgeId;

/// Errors returned by graph store implementations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A vertex with the same id already exists.
    #[error("integrity error: vertex with id '{0}' already exists")]
    DuplicateId(String),

    /// No vertex with the given id is known.
    #[error("vertex with id '{0}' not found")]
    VertexNotFound(String),

    /// No edge with the given id is known.
    #[error("edge {0} not found")]
    EdgeNotFound(EdgeId),

    /// Error raised by a custom store implementation.
    #[error("{0}")]
    Custom(String),
}
