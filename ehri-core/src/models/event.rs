// SPDX-License-Identifier: MIT OR Apache-2.0

//! Navigation from system events to the items they are attached to.
//!
//! Events are never linked to their actioner or subjects directly. Each stream holds an
//! `EventLink` vertex pointing at the event, and the owner of the stream is found by walking the
//! stream backwards until a vertex is reached which is not a link.
use std::collections::HashSet;

use ehri_graph::{Direction, GraphError, GraphStore, Vertex};

use crate::models::EntityClass;
use crate::models::ontology::{
    ACTION_HAS_EVENT, ACTIONER_HAS_LIFECYCLE_ACTION, ENTITY_HAS_EVENT, ENTITY_HAS_LIFECYCLE_EVENT,
    EVENT_HAS_SCOPE,
};

/// Accessor who initiated the event.
pub fn event_actioner<S: GraphStore>(store: &S, event: &str) -> Result<Option<Vertex>, GraphError> {
    match action_link(store, event)? {
        Some(link) => stream_owner(store, link, ACTIONER_HAS_LIFECYCLE_ACTION),
        None => Ok(None),
    }
}

/// The `EventLink` vertex connecting the event to its actioner's stream.
pub fn action_link<S: GraphStore>(store: &S, event: &str) -> Result<Option<Vertex>, GraphError> {
    Ok(store
        .vertices(event, Direction::In, ACTION_HAS_EVENT)?
        .into_iter()
        .next())
}

/// Items the event is about, in the order they were added.
pub fn event_subjects<S: GraphStore>(store: &S, event: &str) -> Result<Vec<Vertex>, GraphError> {
    let mut subjects = Vec::new();
    for link in store.vertices(event, Direction::In, ENTITY_HAS_EVENT)? {
        if let Some(subject) = stream_owner(store, link, ENTITY_HAS_LIFECYCLE_EVENT)? {
            subjects.push(subject);
        }
    }
    Ok(subjects)
}

pub fn event_first_subject<S: GraphStore>(
    store: &S,
    event: &str,
) -> Result<Option<Vertex>, GraphError> {
    match store
        .vertices(event, Direction::In, ENTITY_HAS_EVENT)?
        .into_iter()
        .next()
    {
        Some(link) => stream_owner(store, link, ENTITY_HAS_LIFECYCLE_EVENT),
        None => Ok(None),
    }
}

/// Scope the event happened in, `None` for system scope events.
pub fn event_scope<S: GraphStore>(store: &S, event: &str) -> Result<Option<Vertex>, GraphError> {
    Ok(store
        .vertices(event, Direction::Out, EVENT_HAS_SCOPE)?
        .into_iter()
        .next())
}

fn stream_owner<S: GraphStore>(
    store: &S,
    link: Vertex,
    label: &str,
) -> Result<Option<Vertex>, GraphError> {
    let link_label = EntityClass::EventLink.name();
    let mut visited = HashSet::new();
    let mut current = link;
    loop {
        if !visited.insert(current.id.clone()) {
            return Ok(None);
        }
        let Some(previous) = store
            .vertices(&current.id, Direction::In, label)?
            .into_iter()
            .next()
        else {
            return Ok(None);
        };
        if previous.label != link_label {
            return Ok(Some(previous));
        }
        current = previous;
    }
}
