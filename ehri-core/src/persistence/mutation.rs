// SPDX-License-Identifier: MIT OR Apache-2.0

use ehri_graph::Vertex;

use crate::persistence::Bundle;

/// Outcome of writing a bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationState {
    Created,
    Updated,
    Unchanged,
}

/// Result of an update or create-or-update operation.
///
/// Updates carry the state of the item before it was changed, so callers can record a version of
/// it.
#[derive(Clone, Debug)]
pub struct Mutation {
    vertex: Vertex,
    state: MutationState,
    prior: Option<Bundle>,
}

impl Mutation {
    pub fn created(vertex: Vertex) -> Self {
        Self {
            vertex,
            state: MutationState::Created,
            prior: None,
        }
    }

    pub fn updated(vertex: Vertex, prior: Bundle) -> Self {
        Self {
            vertex,
            state: MutationState::Updated,
            prior: Some(prior),
        }
    }

    pub fn unchanged(vertex: Vertex) -> Self {
        Self {
            vertex,
            state: MutationState::Unchanged,
            prior: None,
        }
    }

    pub fn vertex(&self) -> &Vertex {
        &self.vertex
    }

    pub fn into_vertex(self) -> Vertex {
        self.vertex
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    pub fn prior(&self) -> Option<&Bundle> {
        self.prior.as_ref()
    }

    pub fn created_new(&self) -> bool {
        self.state == MutationState::Created
    }

    pub fn has_changed(&self) -> bool {
        self.state != MutationState::Unchanged
    }
}
