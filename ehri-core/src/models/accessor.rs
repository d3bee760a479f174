// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashSet;

use ehri_graph::{Direction, GraphError, GraphStore, Vertex};

use crate::error::{ItemNotFound, PersistenceError};
use crate::models::EntityClass;
use crate::models::ontology::{ACCESSOR_BELONGS_TO_GROUP, PERMISSION_GRANT_HAS_SUBJECT};

/// Id of the administrators group. Members of this group pass every permission check.
pub const ADMIN_GROUP_IDENTIFIER: &str = "admin";

/// Id of the accessor representing unauthenticated users.
pub const ANONYMOUS_IDENTIFIER: &str = "anonymous";

/// A user or group which can be granted permissions.
///
/// Accessors are identified by the id of their vertex. Group membership is stored as
/// `belongsTo` edges from the member to the group and may nest arbitrarily deep.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Accessor {
    id: String,
}

impl Accessor {
    /// Frame over an accessor id without checking the store.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn admin() -> Self {
        Self::new(ADMIN_GROUP_IDENTIFIER)
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_IDENTIFIER)
    }

    /// Loads an accessor, checking that the vertex exists and is a user or group.
    ///
    /// The anonymous accessor is always available.
    pub fn load<S: GraphStore>(store: &S, id: &str) -> Result<Self, PersistenceError> {
        if id == ANONYMOUS_IDENTIFIER {
            return Ok(Self::anonymous());
        }
        let vertex = store
            .get_vertex(id)?
            .ok_or_else(|| ItemNotFound(id.to_owned()))?;
        Self::from_vertex(&vertex)
    }

    pub fn from_vertex(vertex: &Vertex) -> Result<Self, PersistenceError> {
        match vertex.label.parse::<EntityClass>() {
            Ok(class) if class.is_accessor() => Ok(Self::new(vertex.id.clone())),
            _ => Err(PersistenceError::UnexpectedType {
                id: vertex.id.clone(),
                label: vertex.label.clone(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_admin(&self) -> bool {
        self.id == ADMIN_GROUP_IDENTIFIER
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == ANONYMOUS_IDENTIFIER
    }

    /// Groups this accessor is a direct member of.
    pub fn parents<S: GraphStore>(&self, store: &S) -> Result<Vec<Accessor>, GraphError> {
        if self.is_anonymous() && !store.exists(&self.id)? {
            return Ok(Vec::new());
        }
        Ok(store
            .vertices(&self.id, Direction::Out, ACCESSOR_BELONGS_TO_GROUP)?
            .into_iter()
            .map(|vertex| Accessor::new(vertex.id))
            .collect())
    }

    /// All groups this accessor is a direct or indirect member of, in depth-first order.
    ///
    /// Every group is returned once, membership cycles are not followed.
    pub fn all_parents<S: GraphStore>(&self, store: &S) -> Result<Vec<Accessor>, GraphError> {
        let mut visited = HashSet::from([self.id.clone()]);
        let mut parents = Vec::new();
        let mut stack = self.parents(store)?;
        stack.reverse();
        while let Some(parent) = stack.pop() {
            if !visited.insert(parent.id.clone()) {
                continue;
            }
            let mut grandparents = parent.parents(store)?;
            grandparents.reverse();
            parents.push(parent);
            stack.extend(grandparents);
        }
        Ok(parents)
    }

    /// Returns `true` if this accessor is the admin group or a direct or indirect member of it.
    pub fn belongs_to_admin<S: GraphStore>(&self, store: &S) -> Result<bool, GraphError> {
        if self.is_admin() {
            return Ok(true);
        }
        Ok(self.all_parents(store)?.iter().any(Accessor::is_admin))
    }

    /// Permission grant vertices held directly by this accessor.
    pub fn permission_grants<S: GraphStore>(&self, store: &S) -> Result<Vec<Vertex>, GraphError> {
        if !store.exists(&self.id)? {
            return Ok(Vec::new());
        }
        store.vertices(&self.id, Direction::In, PERMISSION_GRANT_HAS_SUBJECT)
    }

    pub fn add_to_group<S: GraphStore>(
        &self,
        store: &S,
        group: &Accessor,
    ) -> Result<(), GraphError> {
        if !store.has_edge(&self.id, ACCESSOR_BELONGS_TO_GROUP, &group.id)? {
            store.add_edge(&self.id, ACCESSOR_BELONGS_TO_GROUP, &group.id)?;
        }
        Ok(())
    }

    pub fn remove_from_group<S: GraphStore>(
        &self,
        store: &S,
        group: &Accessor,
    ) -> Result<(), GraphError> {
        for edge in store.edges(&self.id, Direction::Out, ACCESSOR_BELONGS_TO_GROUP)? {
            if edge.to == group.id {
                store.remove_edge(edge.id)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ehri_graph::{GraphStore, MemoryGraph, Properties};
    use serde_json::json;

    use crate::error::PersistenceError;

    use super::Accessor;

    fn add(store: &MemoryGraph, id: &str, label: &str) {
        let mut properties = Properties::new();
        properties.insert("identifier".into(), json!(id));
        store.create_vertex(id, label, properties).unwrap();
    }

    #[test]
    fn transitive_parents() {
        let store = MemoryGraph::new();
        add(&store, "admin", "Group");
        add(&store, "g1", "Group");
        add(&store, "g2", "Group");
        add(&store, "u1", "UserProfile");

        let user = Accessor::load(&store, "u1").unwrap();
        let g1 = Accessor::new("g1");
        let g2 = Accessor::new("g2");
        user.add_to_group(&store, &g2).unwrap();
        user.add_to_group(&store, &g2).unwrap();
        g2.add_to_group(&store, &g1).unwrap();

        assert_eq!(user.parents(&store).unwrap(), vec![g2.clone()]);
        assert_eq!(user.all_parents(&store).unwrap(), vec![g2.clone(), g1.clone()]);
        assert!(!user.belongs_to_admin(&store).unwrap());

        g1.add_to_group(&store, &Accessor::admin()).unwrap();
        assert!(user.belongs_to_admin(&store).unwrap());

        g2.remove_from_group(&store, &g1).unwrap();
        assert!(!user.belongs_to_admin(&store).unwrap());
    }

    #[test]
    fn membership_cycles_terminate() {
        let store = MemoryGraph::new();
        add(&store, "g1", "Group");
        add(&store, "g2", "Group");
        let g1 = Accessor::new("g1");
        let g2 = Accessor::new("g2");
        g1.add_to_group(&store, &g2).unwrap();
        g2.add_to_group(&store, &g1).unwrap();

        assert_eq!(g1.all_parents(&store).unwrap(), vec![g2]);
        assert!(!g1.belongs_to_admin(&store).unwrap());
    }

    #[test]
    fn load_checks_type() {
        let store = MemoryGraph::new();
        add(&store, "c1", "DocumentaryUnit");
        assert!(matches!(
            Accessor::load(&store, "c1"),
            Err(PersistenceError::UnexpectedType { .. })
        ));
        assert!(matches!(
            Accessor::load(&store, "nobody"),
            Err(PersistenceError::ItemNotFound(_))
        ));
        let anonymous = Accessor::load(&store, "anonymous").unwrap();
        assert!(anonymous.is_anonymous());
        assert!(anonymous.parents(&store).unwrap().is_empty());
        assert!(anonymous.permission_grants(&store).unwrap().is_empty());
    }
}
