// SPDX-License-Identifier: MIT OR Apache-2.0

use ehri_core::models::{UnknownContentType, UnknownPermissionType};
use ehri_core::{ItemNotFound, PermissionDenied, PersistenceError};
use ehri_graph::GraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AclError {
    #[error(transparent)]
    PermissionDenied(#[from] PermissionDenied),

    /// Grants were requested for the admin group or the anonymous accessor.
    #[error("unable to grant or revoke permissions of system account '{0}'")]
    SystemAccount(String),

    #[error(transparent)]
    ItemNotFound(#[from] ItemNotFound),

    #[error(transparent)]
    UnknownContentType(#[from] UnknownContentType),

    #[error(transparent)]
    UnknownPermissionType(#[from] UnknownPermissionType),

    #[error("item '{id}' has unexpected type '{label}'")]
    UnexpectedType { id: String, label: String },

    #[error(transparent)]
    Graph(GraphError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl From<GraphError> for AclError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::VertexNotFound(id) => AclError::ItemNotFound(ItemNotFound(id)),
            err => AclError::Graph(err),
        }
    }
}
