// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::HashSet;

use ehri_graph::{Direction, GraphError, GraphStore, Vertex};
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::{ItemNotFound, PersistenceError};
use crate::models::RelationDef;
use crate::persistence::{Bundle, BundleValidator, MANAGED_PREFIX, Mutation, Serializer};

/// Writes bundle trees into the graph.
///
/// Only dependent relations of a bundle are written. They are created, updated and deleted
/// together with their parent, related items reached over other relations are never touched.
///
/// Every write validates the bundle first. The DAO does not open transactions, callers are
/// expected to wrap each operation into one.
#[derive(Clone, Debug)]
pub struct BundleDao<S> {
    store: S,
    scopes: Vec<String>,
    config: Config,
}

impl<S> BundleDao<S>
where
    S: GraphStore,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, Config::default())
    }

    pub fn with_config(store: S, config: Config) -> Self {
        Self {
            store,
            scopes: Vec::new(),
            config,
        }
    }

    /// Scope path under which ids of new items are generated.
    pub fn with_scope_ids(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scope_ids(&self) -> &[String] {
        &self.scopes
    }

    pub fn validator(&self) -> BundleValidator<'_, S> {
        BundleValidator::new(&self.store, &self.scopes)
    }

    /// Validates and creates a new item with all its dependents.
    pub fn create(&self, bundle: &Bundle) -> Result<Vertex, PersistenceError> {
        let bundle = self.validator().validate_for_create(bundle)?;
        self.create_inner(&bundle)
    }

    /// Validates and updates an existing item, reconciling its dependents.
    ///
    /// Returns an unchanged mutation without touching the store if the item already matches the
    /// bundle.
    pub fn update(&self, bundle: &Bundle) -> Result<Mutation, PersistenceError> {
        let bundle = self.validator().validate_for_update(bundle)?;
        let serializer = self.dependent_serializer();
        self.update_inner(&bundle, &serializer)
    }

    /// Creates the item if its id is not taken yet, updates it otherwise.
    pub fn create_or_update(&self, bundle: &Bundle) -> Result<Mutation, PersistenceError> {
        let bundle = self.validator().validate_for_update(bundle)?;
        let serializer = self.dependent_serializer();
        self.create_or_update_inner(&bundle, &serializer)
    }

    /// Deletes the item and all dependents contained in the bundle, depth first.
    ///
    /// Returns the number of deleted vertices.
    pub fn delete(&self, bundle: &Bundle) -> Result<usize, PersistenceError> {
        self.delete_inner(bundle)
    }

    fn dependent_serializer(&self) -> Serializer<'_, S> {
        Serializer::builder(&self.store)
            .with_config(&self.config)
            .dependent_only()
            .build()
    }

    fn create_inner(&self, bundle: &Bundle) -> Result<Vertex, PersistenceError> {
        let id = bundle_id(bundle)?;
        let vertex = match self
            .store
            .create_vertex(id, bundle.class().name(), bundle.data().clone())
        {
            Ok(vertex) => vertex,
            Err(GraphError::DuplicateId(id)) => return Err(PersistenceError::IdCollision(id)),
            Err(err) => return Err(err.into()),
        };
        trace!(id, class = %bundle.class(), "created vertex");

        for (name, children) in bundle.relations().iter() {
            let Some(relation) = bundle.class().dependent_relation(name) else {
                warn!(id, relation = %name, "ignoring non-dependent relation on create");
                continue;
            };
            for child in children {
                let child_vertex = self.create_inner(child)?;
                self.link(&vertex.id, &child_vertex.id, relation)?;
            }
        }
        Ok(vertex)
    }

    fn create_or_update_inner(
        &self,
        bundle: &Bundle,
        serializer: &Serializer<'_, S>,
    ) -> Result<Mutation, PersistenceError> {
        let id = bundle_id(bundle)?;
        if self.store.exists(id)? {
            self.update_inner(bundle, serializer)
        } else {
            Ok(Mutation::created(self.create_inner(bundle)?))
        }
    }

    fn update_inner(
        &self,
        bundle: &Bundle,
        serializer: &Serializer<'_, S>,
    ) -> Result<Mutation, PersistenceError> {
        let id = bundle_id(bundle)?;
        let vertex = self
            .store
            .get_vertex(id)?
            .ok_or_else(|| ItemNotFound(id.to_owned()))?;
        if vertex.label != bundle.class().name() {
            return Err(PersistenceError::UnexpectedType {
                id: vertex.id,
                label: vertex.label,
            });
        }

        let current = serializer.vertex_to_bundle(&vertex)?;
        if current == bundle.dependents_only() {
            debug!(id, "not updating equivalent bundle");
            return Ok(Mutation::unchanged(vertex));
        }

        let mut properties = bundle.data().clone();
        for (key, value) in vertex.properties.iter() {
            if key.starts_with(MANAGED_PREFIX) {
                properties.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        let updated = self.store.update_vertex(id, properties)?;
        self.update_dependents(&updated, bundle, serializer)?;
        trace!(id, "updated vertex");
        Ok(Mutation::updated(updated, current))
    }

    fn update_dependents(
        &self,
        vertex: &Vertex,
        bundle: &Bundle,
        serializer: &Serializer<'_, S>,
    ) -> Result<(), PersistenceError> {
        for name in bundle.relations().keys() {
            if bundle.class().dependent_relation(name).is_none() {
                warn!(
                    id = %vertex.id,
                    relation = %name,
                    "ignoring non-dependent relation on update"
                );
            }
        }

        for relation in bundle.class().dependent_relations() {
            let direction = relation.direction().unwrap_or(Direction::Out);
            let incoming = bundle.relations_named(relation.name);
            let incoming_ids: HashSet<&str> = incoming.iter().filter_map(Bundle::id).collect();

            for child in self.store.vertices(&vertex.id, direction, relation.name)? {
                if !incoming_ids.contains(child.id.as_str()) {
                    trace!(id = %child.id, relation = relation.name, "deleting stale dependent");
                    let existing = serializer.vertex_to_bundle(&child)?;
                    self.delete_inner(&existing)?;
                }
            }

            for child in incoming {
                let mutation = self.create_or_update_inner(child, serializer)?;
                if !self.is_linked(&vertex.id, &mutation.vertex().id, relation)? {
                    self.link(&vertex.id, &mutation.vertex().id, relation)?;
                }
            }
        }
        Ok(())
    }

    fn delete_inner(&self, bundle: &Bundle) -> Result<usize, PersistenceError> {
        let mut count = 0;
        for (_, children) in bundle.dependent_relations() {
            for child in children {
                count += self.delete_inner(&child)?;
            }
        }
        let id = bundle_id(bundle)?;
        self.store.delete_vertex(id)?;
        Ok(count + 1)
    }

    fn link(&self, parent: &str, child: &str, relation: &RelationDef) -> Result<(), GraphError> {
        match relation.direction().unwrap_or(Direction::Out) {
            Direction::Out => self.store.add_edge(parent, relation.name, child)?,
            Direction::In => self.store.add_edge(child, relation.name, parent)?,
        };
        Ok(())
    }

    fn is_linked(
        &self,
        parent: &str,
        child: &str,
        relation: &RelationDef,
    ) -> Result<bool, GraphError> {
        match relation.direction().unwrap_or(Direction::Out) {
            Direction::Out => self.store.has_edge(parent, relation.name, child),
            Direction::In => self.store.has_edge(child, relation.name, parent),
        }
    }
}

fn bundle_id(bundle: &Bundle) -> Result<&str, PersistenceError> {
    bundle
        .id()
        .ok_or_else(|| PersistenceError::MissingId(bundle.class().to_string()))
}

#[cfg(test)]
mod tests {
    use ehri_graph::{Direction, GraphStore, MemoryGraph, Properties};
    use serde_json::json;

    use crate::error::PersistenceError;
    use crate::models::EntityClass;
    use crate::persistence::{Bundle, MutationState, Serializer};

    use super::BundleDao;

    fn description(language: &str, name: &str) -> Bundle {
        Bundle::builder(EntityClass::DocumentaryUnitDescription)
            .data_value("languageCode", language)
            .data_value("name", name)
            .build()
    }

    fn unit() -> Bundle {
        Bundle::builder(EntityClass::DocumentaryUnit)
            .data_value("identifier", "c1")
            .relation(
                "describes",
                description("eng", "English").with_relation(
                    "hasDate",
                    Bundle::builder(EntityClass::DatePeriod)
                        .data_value("startDate", "1940")
                        .build(),
                ),
            )
            .relation("describes", description("fra", "French"))
            .build()
    }

    fn dao(store: &MemoryGraph) -> BundleDao<MemoryGraph> {
        BundleDao::new(store.clone()).with_scope_ids(vec!["nl".into(), "r1".into()])
    }

    #[test]
    fn create_writes_dependent_tree() {
        let store = MemoryGraph::new();
        let vertex = dao(&store).create(&unit()).unwrap();
        assert_eq!(vertex.id, "nl-r1-c1");
        assert_eq!(store.vertex_count(), 4);

        let descriptions = store.vertices(&vertex.id, Direction::In, "describes").unwrap();
        let ids: Vec<&str> = descriptions.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["nl-r1-c1.eng", "nl-r1-c1.fra"]);
        assert_eq!(
            store
                .vertices("nl-r1-c1.eng", Direction::Out, "hasDate")
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn create_ignores_non_dependent_relations() {
        let store = MemoryGraph::new();
        store
            .create_vertex("r1", "Repository", Properties::new())
            .unwrap();
        let repository = Bundle::builder(EntityClass::Repository)
            .id("r1")
            .data_value("identifier", "r1")
            .build();
        let vertex = dao(&store)
            .create(&unit().with_relation("heldBy", repository))
            .unwrap();
        assert!(store.vertices(&vertex.id, Direction::Out, "heldBy").unwrap().is_empty());
        assert_eq!(store.vertex_count(), 5);
    }

    #[test]
    fn update_twice_is_unchanged() {
        let store = MemoryGraph::new();
        let dao = dao(&store);
        let vertex = dao.create(&unit()).unwrap();
        let bundle = Serializer::new(&store).entity_to_bundle(&vertex.id).unwrap();

        let changed = bundle.with_data_value("scopeAndContent", "More");
        let mutation = dao.update(&changed).unwrap();
        assert_eq!(mutation.state(), MutationState::Updated);
        assert_eq!(mutation.prior().unwrap().data_str("scopeAndContent"), None);

        let mutation = dao.update(&changed).unwrap();
        assert_eq!(mutation.state(), MutationState::Unchanged);
        assert!(!mutation.has_changed());
    }

    #[test]
    fn update_keeps_managed_properties() {
        let store = MemoryGraph::new();
        let dao = dao(&store);
        let vertex = dao.create(&unit()).unwrap();
        store
            .set_property(&vertex.id, "_lastUpdated", json!("2024-01-01"))
            .unwrap();

        let bundle = Serializer::new(&store).entity_to_bundle(&vertex.id).unwrap();
        dao.update(&bundle.with_data_value("extent", "1m")).unwrap();
        let vertex = store.get_vertex(&vertex.id).unwrap().unwrap();
        assert_eq!(vertex.property_str("_lastUpdated"), Some("2024-01-01"));
        assert_eq!(vertex.property_str("extent"), Some("1m"));
    }

    #[test]
    fn update_reconciles_dependents() {
        let store = MemoryGraph::new();
        let dao = dao(&store);
        let vertex = dao.create(&unit()).unwrap();
        let bundle = Serializer::new(&store).entity_to_bundle(&vertex.id).unwrap();

        // Drop the English description (with its date) and add a German one.
        let french = bundle
            .relations_named("describes")
            .iter()
            .find(|b| b.data_str("languageCode") == Some("fra"))
            .cloned()
            .unwrap();
        let updated = bundle.with_relations_named(
            "describes",
            vec![french, description("deu", "German")],
        );
        let mutation = dao.update(&updated).unwrap();
        assert!(mutation.has_changed());

        assert!(!store.exists("nl-r1-c1.eng").unwrap());
        assert!(store.exists("nl-r1-c1.fra").unwrap());
        assert!(store.exists("nl-r1-c1.deu").unwrap());
        assert_eq!(store.vertex_count(), 3);
        assert!(store.has_edge("nl-r1-c1.deu", "describes", "nl-r1-c1").unwrap());
    }

    #[test]
    fn create_or_update_dispatches() {
        let store = MemoryGraph::new();
        let dao = dao(&store);
        let mutation = dao.create_or_update(&unit()).unwrap();
        assert_eq!(mutation.state(), MutationState::Created);
        assert!(mutation.created_new());

        let mutation = dao.create_or_update(&unit()).unwrap();
        assert_eq!(mutation.state(), MutationState::Unchanged);
    }

    #[test]
    fn delete_cascades_to_dependents_only() {
        let store = MemoryGraph::new();
        store
            .create_vertex("r1", "Repository", Properties::new())
            .unwrap();
        let dao = dao(&store);
        let vertex = dao.create(&unit()).unwrap();
        store.add_edge(&vertex.id, "heldBy", "r1").unwrap();

        let bundle = Serializer::new(&store).entity_to_bundle(&vertex.id).unwrap();
        assert!(bundle.has_relations("heldBy"));
        assert_eq!(dao.delete(&bundle).unwrap(), 4);
        assert_eq!(store.vertex_count(), 1);
        assert!(store.exists("r1").unwrap());
    }

    #[test]
    fn validation_errors_leave_store_untouched() {
        let store = MemoryGraph::new();
        let bundle = unit().with_relation("describes", description("deu", ""));
        assert!(matches!(
            dao(&store).create(&bundle),
            Err(PersistenceError::Validation(_))
        ));
        assert_eq!(store.vertex_count(), 0);

        assert!(matches!(
            dao(&store).update(&unit().with_id("missing")),
            Err(PersistenceError::ItemNotFound(_))
        ));
    }
}
