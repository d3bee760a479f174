// SPDX-License-Identifier: MIT OR Apache-2.0

//! Consistency checks over a whole graph.
//!
//! Ids of identifiable items are a pure function of their scope path and identifier, so they can
//! be recomputed and compared. Owner grants must never be scoped.
use std::fmt;

use ehri_graph::{Direction, GraphStore};

use crate::config::Config;
use crate::error::PersistenceError;
use crate::idgen::{IdGenerator, join_path};
use crate::models::ontology::{
    HAS_PERMISSION_SCOPE, IDENTIFIER_KEY, PERMISSION_GRANT_HAS_PERMISSION,
    PERMISSION_GRANT_HAS_SCOPE,
};
use crate::models::{
    ADMIN_GROUP_IDENTIFIER, ANONYMOUS_IDENTIFIER, ContentTypes, EntityClass, PermissionScope,
    PermissionType,
};

/// A problem found by [`check_graph`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckIssue {
    /// A vertex seeded on initialization does not exist.
    MissingVertex { id: String, class: EntityClass },

    /// The id of an item does not match the id generated from its scope and identifier.
    UnexpectedId { id: String, expected: String },

    /// An owner grant is bound to a scope.
    ScopedOwnerGrant { grant: String, scope: String },
}

impl fmt::Display for CheckIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckIssue::MissingVertex { id, class } => {
                write!(f, "missing {class} vertex '{id}'")
            }
            CheckIssue::UnexpectedId { id, expected } => {
                write!(f, "id '{id}' does not match generated id '{expected}'")
            }
            CheckIssue::ScopedOwnerGrant { grant, scope } => {
                write!(f, "owner grant '{grant}' has scope '{scope}'")
            }
        }
    }
}

/// Runs all checks and returns every issue found.
pub fn check_graph<S: GraphStore>(
    store: &S,
    config: &Config,
) -> Result<Vec<CheckIssue>, PersistenceError> {
    let mut issues = check_initialization(store, config)?;
    issues.extend(check_id_generation(store)?);
    issues.extend(check_owner_grants(store)?);
    Ok(issues)
}

pub fn check_initialization<S: GraphStore>(
    store: &S,
    config: &Config,
) -> Result<Vec<CheckIssue>, PersistenceError> {
    let mut expected = vec![
        (config.event_root.clone(), EntityClass::System),
        (ADMIN_GROUP_IDENTIFIER.to_owned(), EntityClass::Group),
        (ANONYMOUS_IDENTIFIER.to_owned(), EntityClass::Group),
    ];
    expected.extend(
        PermissionType::ALL
            .iter()
            .map(|permission| (permission.name().to_owned(), EntityClass::Permission)),
    );
    expected.extend(
        ContentTypes::ALL
            .iter()
            .map(|content_type| (content_type.name().to_owned(), EntityClass::ContentType)),
    );

    let mut issues = Vec::new();
    for (id, class) in expected {
        let found = store
            .get_vertex(&id)?
            .is_some_and(|vertex| vertex.label == class.name());
        if !found {
            issues.push(CheckIssue::MissingVertex { id, class });
        }
    }
    Ok(issues)
}

pub fn check_id_generation<S: GraphStore>(store: &S) -> Result<Vec<CheckIssue>, PersistenceError> {
    let mut issues = Vec::new();
    let classes = EntityClass::ALL
        .into_iter()
        .filter(|class| class.id_generator() == IdGenerator::IdentifiableEntity);
    for class in classes {
        for vertex in store.vertices_by_label(class.name())? {
            let Some(identifier) = vertex.property_str(IDENTIFIER_KEY) else {
                continue;
            };
            let scope = store
                .vertices(&vertex.id, Direction::Out, HAS_PERMISSION_SCOPE)?
                .into_iter()
                .next()
                .map(|scope| PermissionScope::Item(scope.id))
                .unwrap_or_default();
            let mut path = scope.id_path(store)?;
            path.push(identifier.to_owned());
            let expected = join_path(&path);
            if expected != vertex.id {
                issues.push(CheckIssue::UnexpectedId {
                    id: vertex.id.clone(),
                    expected,
                });
            }
        }
    }
    Ok(issues)
}

pub fn check_owner_grants<S: GraphStore>(store: &S) -> Result<Vec<CheckIssue>, PersistenceError> {
    let mut issues = Vec::new();
    for grant in store.vertices_by_label(EntityClass::PermissionGrant.name())? {
        let is_owner = store
            .vertices(&grant.id, Direction::Out, PERMISSION_GRANT_HAS_PERMISSION)?
            .iter()
            .any(|permission| permission.id == PermissionType::Owner.name());
        if !is_owner {
            continue;
        }
        for scope in store.vertices(&grant.id, Direction::Out, PERMISSION_GRANT_HAS_SCOPE)? {
            issues.push(CheckIssue::ScopedOwnerGrant {
                grant: grant.id.clone(),
                scope: scope.id,
            });
        }
    }
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use ehri_graph::{GraphStore, MemoryGraph, Properties};
    use serde_json::json;

    use crate::config::Config;
    use crate::init::GraphInitializer;
    use crate::models::{EntityClass, PermissionScope, set_permission_scope};

    use super::{CheckIssue, check_graph};

    fn add(store: &MemoryGraph, id: &str, label: &str, identifier: &str) {
        let mut properties = Properties::new();
        properties.insert("identifier".into(), json!(identifier));
        store.create_vertex(id, label, properties).unwrap();
    }

    #[test]
    fn uninitialized_graph() {
        let store = MemoryGraph::new();
        let issues = check_graph(&store, &Config::default()).unwrap();
        assert_eq!(issues.len(), 3 + 7 + 13);
        assert!(issues.contains(&CheckIssue::MissingVertex {
            id: "anonymous".into(),
            class: EntityClass::Group,
        }));
    }

    #[test]
    fn detects_bad_ids_and_scoped_owner_grants() {
        let store = MemoryGraph::new();
        GraphInitializer::new(store.clone()).initialize().unwrap();
        add(&store, "nl", "Country", "nl");
        add(&store, "nl-r1", "Repository", "r1");
        add(&store, "c1", "DocumentaryUnit", "c1");
        set_permission_scope(&store, "nl-r1", &PermissionScope::item("nl")).unwrap();
        set_permission_scope(&store, "c1", &PermissionScope::item("nl-r1")).unwrap();

        store
            .create_vertex("grant", "PermissionGrant", Properties::new())
            .unwrap();
        store.add_edge("grant", "hasPermission", "owner").unwrap();
        store.add_edge("grant", "hasScope", "nl").unwrap();

        let issues = check_graph(&store, &Config::default()).unwrap();
        assert_eq!(
            issues,
            vec![
                CheckIssue::UnexpectedId {
                    id: "c1".into(),
                    expected: "nl-r1-c1".into()
                },
                CheckIssue::ScopedOwnerGrant {
                    grant: "grant".into(),
                    scope: "nl".into()
                },
            ]
        );
    }
}
