// SPDX-License-Identifier: MIT OR Apache-2.0

//! Visibility restrictions and promotion of accessible items.
//!
//! An item without `access` edges is visible to everyone. Otherwise only the listed accessors and
//! their members can see it, unless the item was promoted more often than it was demoted.
use ehri_graph::{Direction, GraphError, GraphStore};

use crate::models::Accessor;
use crate::models::ontology::{DEMOTED_BY, IS_ACCESSIBLE_TO, PROMOTED_BY};

/// Accessors an item is explicitly visible to.
pub fn accessors<S: GraphStore>(store: &S, item: &str) -> Result<Vec<Accessor>, GraphError> {
    Ok(store
        .vertices(item, Direction::Out, IS_ACCESSIBLE_TO)?
        .into_iter()
        .map(|vertex| Accessor::new(vertex.id))
        .collect())
}

pub fn add_accessor<S: GraphStore>(
    store: &S,
    item: &str,
    accessor: &Accessor,
) -> Result<(), GraphError> {
    add_unique_edge(store, item, IS_ACCESSIBLE_TO, accessor.id())
}

pub fn remove_accessor<S: GraphStore>(
    store: &S,
    item: &str,
    accessor: &Accessor,
) -> Result<(), GraphError> {
    remove_edges_to(store, item, IS_ACCESSIBLE_TO, accessor.id())
}

/// Records a promotion of the item, replacing an earlier demotion by the same user.
pub fn promote<S: GraphStore>(store: &S, item: &str, user: &Accessor) -> Result<(), GraphError> {
    remove_edges_to(store, item, DEMOTED_BY, user.id())?;
    add_unique_edge(store, item, PROMOTED_BY, user.id())
}

pub fn remove_promotion<S: GraphStore>(
    store: &S,
    item: &str,
    user: &Accessor,
) -> Result<(), GraphError> {
    remove_edges_to(store, item, PROMOTED_BY, user.id())
}

/// Records a demotion of the item, replacing an earlier promotion by the same user.
pub fn demote<S: GraphStore>(store: &S, item: &str, user: &Accessor) -> Result<(), GraphError> {
    remove_edges_to(store, item, PROMOTED_BY, user.id())?;
    add_unique_edge(store, item, DEMOTED_BY, user.id())
}

pub fn remove_demotion<S: GraphStore>(
    store: &S,
    item: &str,
    user: &Accessor,
) -> Result<(), GraphError> {
    remove_edges_to(store, item, DEMOTED_BY, user.id())
}

/// Number of promotions minus number of demotions.
pub fn promotion_score<S: GraphStore>(store: &S, item: &str) -> Result<i64, GraphError> {
    let promotions = store.count_edges(item, Direction::Out, PROMOTED_BY)?;
    let demotions = store.count_edges(item, Direction::Out, DEMOTED_BY)?;
    Ok(promotions as i64 - demotions as i64)
}

/// Returns `true` if the item was promoted more often than demoted.
pub fn is_promoted<S: GraphStore>(store: &S, item: &str) -> Result<bool, GraphError> {
    Ok(promotion_score(store, item)? > 0)
}

fn add_unique_edge<S: GraphStore>(
    store: &S,
    from: &str,
    label: &str,
    to: &str,
) -> Result<(), GraphError> {
    if !store.has_edge(from, label, to)? {
        store.add_edge(from, label, to)?;
    }
    Ok(())
}

fn remove_edges_to<S: GraphStore>(
    store: &S,
    from: &str,
    label: &str,
    to: &str,
) -> Result<(), GraphError> {
    for edge in store.edges(from, Direction::Out, label)? {
        if edge.to == to {
            store.remove_edge(edge.id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ehri_graph::{GraphStore, MemoryGraph, Properties};

    use crate::models::Accessor;

    use super::*;

    fn setup() -> MemoryGraph {
        let store = MemoryGraph::new();
        for (id, label) in [
            ("c1", "DocumentaryUnit"),
            ("u1", "UserProfile"),
            ("u2", "UserProfile"),
        ] {
            store.create_vertex(id, label, Properties::new()).unwrap();
        }
        store
    }

    #[test]
    fn accessor_list() {
        let store = setup();
        let user = Accessor::new("u1");
        add_accessor(&store, "c1", &user).unwrap();
        add_accessor(&store, "c1", &user).unwrap();
        assert_eq!(accessors(&store, "c1").unwrap(), vec![user.clone()]);

        remove_accessor(&store, "c1", &user).unwrap();
        assert!(accessors(&store, "c1").unwrap().is_empty());
    }

    #[test]
    fn promotion_replaces_demotion() {
        let store = setup();
        let u1 = Accessor::new("u1");
        let u2 = Accessor::new("u2");

        promote(&store, "c1", &u1).unwrap();
        assert!(is_promoted(&store, "c1").unwrap());

        demote(&store, "c1", &u2).unwrap();
        assert_eq!(promotion_score(&store, "c1").unwrap(), 0);
        assert!(!is_promoted(&store, "c1").unwrap());

        demote(&store, "c1", &u1).unwrap();
        assert_eq!(promotion_score(&store, "c1").unwrap(), -2);

        remove_demotion(&store, "c1", &u1).unwrap();
        remove_demotion(&store, "c1", &u2).unwrap();
        promote(&store, "c1", &u2).unwrap();
        assert!(is_promoted(&store, "c1").unwrap());
        remove_promotion(&store, "c1", &u2).unwrap();
        assert_eq!(promotion_score(&store, "c1").unwrap(), 0);
    }
}
