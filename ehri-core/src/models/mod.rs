// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content model of the archival graph.
//!
//! Static tables describe every entity class, its relations and its constraints. Thin frames like
//! [`Accessor`] and [`PermissionScope`] wrap vertex ids and resolve their relations through a
//! [`GraphStore`](ehri_graph::GraphStore) on demand.
pub mod accessible;
mod accessor;
mod content_types;
mod entity_class;
pub mod event;
mod event_types;
pub mod ontology;
mod permission_type;
mod scope;

pub use accessor::{ADMIN_GROUP_IDENTIFIER, ANONYMOUS_IDENTIFIER, Accessor};
pub use content_types::{ContentTypes, UnknownContentType};
pub use entity_class::{
    EntityClass, EntityDescriptor, EnumProperty, Fetch, MetaCount, RelationDef, RelationSource,
    UnknownEntityClass,
};
pub use event_types::{EventTypes, UnknownEventType};
pub use permission_type::{PermissionType, UnknownPermissionType};
pub use scope::{PermissionScope, set_permission_scope};
