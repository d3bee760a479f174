// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashSet;

use ehri_graph::{Direction, GraphError, GraphStore};

use crate::models::ontology::{HAS_PERMISSION_SCOPE, IDENTIFIER_KEY};

/// Namespace in which items are created and permissions are granted.
///
/// Any item can act as the scope of other items, e.g. a repository scoping its documentary units.
/// Scopes nest through `hasPermissionScope` edges. The system scope stands for "no scope".
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PermissionScope {
    #[default]
    System,
    Item(String),
}

impl PermissionScope {
    pub fn item(id: impl Into<String>) -> Self {
        PermissionScope::Item(id.into())
    }

    /// Id of the scope item, `None` for the system scope.
    pub fn id(&self) -> Option<&str> {
        match self {
            PermissionScope::System => None,
            PermissionScope::Item(id) => Some(id),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, PermissionScope::System)
    }

    /// Immediate parent scope, if the scope item has one.
    pub fn parent<S: GraphStore>(&self, store: &S) -> Result<Option<PermissionScope>, GraphError> {
        let Some(id) = self.id() else {
            return Ok(None);
        };
        Ok(store
            .vertices(id, Direction::Out, HAS_PERMISSION_SCOPE)?
            .into_iter()
            .next()
            .map(|vertex| PermissionScope::Item(vertex.id)))
    }

    /// Ancestor scopes of this scope, nearest first. The scope itself is not included.
    pub fn permission_scopes<S: GraphStore>(
        &self,
        store: &S,
    ) -> Result<Vec<PermissionScope>, GraphError> {
        let mut visited = HashSet::new();
        let mut scopes = Vec::new();
        let mut current = self.parent(store)?;
        while let Some(scope) = current {
            if !visited.insert(scope.clone()) {
                break;
            }
            current = scope.parent(store)?;
            scopes.push(scope);
        }
        Ok(scopes)
    }

    /// Identifiers of the scope chain from the root scope down to and including this scope.
    ///
    /// Scope items without an identifier contribute their id.
    pub fn id_path<S: GraphStore>(&self, store: &S) -> Result<Vec<String>, GraphError> {
        let mut chain = vec![self.clone()];
        chain.extend(self.permission_scopes(store)?);

        let mut path = Vec::with_capacity(chain.len());
        for scope in chain.iter().rev() {
            let Some(id) = scope.id() else {
                continue;
            };
            let vertex = store
                .get_vertex(id)?
                .ok_or_else(|| GraphError::VertexNotFound(id.to_owned()))?;
            let segment = vertex
                .property_str(IDENTIFIER_KEY)
                .map(str::to_owned)
                .unwrap_or(vertex.id);
            path.push(segment);
        }
        Ok(path)
    }
}

/// Places an item into a scope, replacing any previous scope. The system scope removes it.
pub fn set_permission_scope<S: GraphStore>(
    store: &S,
    item: &str,
    scope: &PermissionScope,
) -> Result<(), GraphError> {
    for edge in store.edges(item, Direction::Out, HAS_PERMISSION_SCOPE)? {
        store.remove_edge(edge.id)?;
    }
    if let Some(scope_id) = scope.id() {
        store.add_edge(item, HAS_PERMISSION_SCOPE, scope_id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ehri_graph::{GraphStore, MemoryGraph, Properties};
    use serde_json::json;

    use super::{PermissionScope, set_permission_scope};

    fn add(store: &MemoryGraph, id: &str, identifier: Option<&str>) {
        let mut properties = Properties::new();
        if let Some(identifier) = identifier {
            properties.insert("identifier".into(), json!(identifier));
        }
        store.create_vertex(id, "Repository", properties).unwrap();
    }

    #[test]
    fn scope_chain_and_id_path() {
        let store = MemoryGraph::new();
        add(&store, "nl", Some("nl"));
        add(&store, "nl-r1", Some("r1"));
        add(&store, "nl-r1-c1", None);
        set_permission_scope(&store, "nl-r1", &PermissionScope::item("nl")).unwrap();
        set_permission_scope(&store, "nl-r1-c1", &PermissionScope::item("nl-r1")).unwrap();

        let scope = PermissionScope::item("nl-r1-c1");
        assert_eq!(
            scope.permission_scopes(&store).unwrap(),
            vec![PermissionScope::item("nl-r1"), PermissionScope::item("nl")]
        );
        assert_eq!(scope.id_path(&store).unwrap(), vec!["nl", "r1", "nl-r1-c1"]);
        assert!(PermissionScope::System.id_path(&store).unwrap().is_empty());

        set_permission_scope(&store, "nl-r1", &PermissionScope::System).unwrap();
        assert_eq!(PermissionScope::item("nl-r1").id_path(&store).unwrap(), vec!["r1"]);
    }

    #[test]
    fn scope_cycles_terminate() {
        let store = MemoryGraph::new();
        add(&store, "a", Some("a"));
        add(&store, "b", Some("b"));
        set_permission_scope(&store, "a", &PermissionScope::item("b")).unwrap();
        set_permission_scope(&store, "b", &PermissionScope::item("a")).unwrap();

        let scopes = PermissionScope::item("a").permission_scopes(&store).unwrap();
        assert_eq!(scopes.len(), 2);
    }
}
