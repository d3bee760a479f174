// SPDX-License-Identifier: MIT OR Apache-2.0

use std::cell::RefCell;
use std::num::NonZeroUsize;

use ehri_graph::{GraphStore, Vertex};
use lru::LruCache;
use serde_json::Value;
use tracing::trace;

use crate::config::Config;
use crate::error::{ItemNotFound, PersistenceError, SerializationError};
use crate::models::event::{event_actioner, event_first_subject};
use crate::models::{EntityClass, Fetch, RelationDef, RelationSource};
use crate::persistence::{Bundle, Data, MANAGED_PREFIX, Relations};

/// Prefix of properties which are neither data nor meta.
const INTERNAL_PREFIX: &str = "__";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    id: String,
    depth: usize,
    lite: bool,
}

/// Converts vertices into bundles.
///
/// Properties of a vertex become the bundle's data, except for managed properties starting with
/// `_` which become its metadata. Relations are followed as declared by the vertex's entity class,
/// up to the configured maximum depth.
///
/// A serializer with cache enabled must only be used for one operation, as it does not notice
/// changes made to the graph after an item was cached.
#[derive(Debug)]
pub struct Serializer<'a, S> {
    store: &'a S,
    max_traversals: usize,
    dependent_only: bool,
    lite_mode: bool,
    included_properties: Vec<String>,
    cache: Option<RefCell<LruCache<CacheKey, Bundle>>>,
}

/// Staged construction of a [`Serializer`].
#[derive(Debug)]
pub struct SerializerBuilder<'a, S> {
    store: &'a S,
    max_traversals: usize,
    dependent_only: bool,
    lite_mode: bool,
    included_properties: Vec<String>,
    cache_size: Option<usize>,
    config_cache_size: usize,
}

impl<'a, S> SerializerBuilder<'a, S> {
    /// Applies depth and cache size from the configuration.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.max_traversals = config.max_traversals;
        self.config_cache_size = config.cache_size;
        self
    }

    /// Maximum depth of relations to follow.
    pub fn with_depth(mut self, max_traversals: usize) -> Self {
        self.max_traversals = max_traversals;
        self
    }

    /// Only follow dependent relations.
    pub fn dependent_only(mut self) -> Self {
        self.dependent_only = true;
        self
    }

    /// Serialize every item with mandatory and included properties only.
    pub fn with_lite_mode(mut self, lite_mode: bool) -> Self {
        self.lite_mode = lite_mode;
        self
    }

    /// Enables the bundle cache with the configured capacity.
    pub fn with_cache(mut self) -> Self {
        self.cache_size = Some(self.config_cache_size);
        self
    }

    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }

    /// Extra properties kept in lite serializations.
    pub fn with_included_properties(mut self, properties: Vec<String>) -> Self {
        self.included_properties = properties;
        self
    }

    pub fn build(self) -> Serializer<'a, S> {
        let cache = self
            .cache_size
            .and_then(NonZeroUsize::new)
            .map(|size| RefCell::new(LruCache::new(size)));
        Serializer {
            store: self.store,
            max_traversals: self.max_traversals,
            dependent_only: self.dependent_only,
            lite_mode: self.lite_mode,
            included_properties: self.included_properties,
            cache,
        }
    }
}

impl<'a, S> Serializer<'a, S>
where
    S: GraphStore,
{
    /// Serializer with default settings.
    pub fn new(store: &'a S) -> Self {
        Self::builder(store).build()
    }

    pub fn builder(store: &'a S) -> SerializerBuilder<'a, S> {
        let config = Config::default();
        SerializerBuilder {
            store,
            max_traversals: config.max_traversals,
            dependent_only: false,
            lite_mode: false,
            included_properties: Vec::new(),
            cache_size: None,
            config_cache_size: config.cache_size,
        }
    }

    pub fn vertex_to_bundle(&self, vertex: &Vertex) -> Result<Bundle, SerializationError> {
        self.fetch(vertex, 0, self.max_traversals, self.lite_mode)
    }

    /// Loads and serializes the item with the given id.
    pub fn entity_to_bundle(&self, id: &str) -> Result<Bundle, PersistenceError> {
        let vertex = self
            .store
            .get_vertex(id)?
            .ok_or_else(|| ItemNotFound(id.to_owned()))?;
        Ok(self.vertex_to_bundle(&vertex)?)
    }

    pub fn vertex_to_data(&self, vertex: &Vertex) -> Result<Value, SerializationError> {
        Ok(self.vertex_to_bundle(vertex)?.to_data())
    }

    pub fn vertex_to_json(&self, vertex: &Vertex) -> Result<String, SerializationError> {
        self.vertex_to_bundle(vertex)?.to_json()
    }

    pub fn vertex_to_xml_string(&self, vertex: &Vertex) -> Result<String, SerializationError> {
        Ok(self.vertex_to_bundle(vertex)?.to_xml_string())
    }

    /// Visits every vertex the serializer would include below `vertex`.
    ///
    /// The visitor receives the related vertex, the depth of its parent, the relation name and
    /// the position of the vertex within the relation.
    pub fn traverse_subtree<F>(
        &self,
        vertex: &Vertex,
        mut visitor: F,
    ) -> Result<(), SerializationError>
    where
        F: FnMut(&Vertex, usize, &str, usize),
    {
        self.traverse(vertex, 0, self.max_traversals, self.lite_mode, &mut visitor)
    }

    fn traverse(
        &self,
        vertex: &Vertex,
        depth: usize,
        max_depth: usize,
        lite: bool,
        visitor: &mut dyn FnMut(&Vertex, usize, &str, usize),
    ) -> Result<(), SerializationError> {
        let class = entity_class(vertex)?;
        if depth >= max_depth {
            return Ok(());
        }
        for relation in class.relations() {
            let Some(fetch) = relation.fetch else {
                continue;
            };
            if !self.should_traverse(relation, &fetch, depth, lite) {
                continue;
            }
            let (next_depth, next_max, next_lite) =
                self.descend(relation, &fetch, depth, max_depth, lite);
            for (index, related) in self.related(vertex, relation)?.iter().enumerate() {
                visitor(related, depth, relation.name, index);
                self.traverse(related, next_depth, next_max, next_lite, visitor)?;
            }
        }
        Ok(())
    }

    fn fetch(
        &self,
        vertex: &Vertex,
        depth: usize,
        max_depth: usize,
        lite: bool,
    ) -> Result<Bundle, SerializationError> {
        let key = CacheKey {
            id: vertex.id.clone(),
            depth,
            lite,
        };
        if let Some(cache) = &self.cache {
            if let Some(bundle) = cache.borrow_mut().get(&key) {
                trace!(id = %vertex.id, depth, "serializer cache hit");
                return Ok(bundle.clone());
            }
        }

        let class = entity_class(vertex)?;
        let relations = if depth < max_depth {
            self.fetch_relations(vertex, class, depth, max_depth, lite)?
        } else {
            Relations::new()
        };
        let bundle = Bundle::builder(class)
            .id(vertex.id.clone())
            .data(self.vertex_data(vertex, class, lite))
            .meta(self.vertex_meta(vertex, class)?)
            .relations(relations)
            .build();

        if let Some(cache) = &self.cache {
            cache.borrow_mut().put(key, bundle.clone());
        }
        Ok(bundle)
    }

    fn fetch_relations(
        &self,
        vertex: &Vertex,
        class: EntityClass,
        depth: usize,
        max_depth: usize,
        lite: bool,
    ) -> Result<Relations, SerializationError> {
        let mut relations = Relations::new();
        for relation in class.relations() {
            let Some(fetch) = relation.fetch else {
                continue;
            };
            if !self.should_traverse(relation, &fetch, depth, lite) {
                trace!(
                    id = %vertex.id,
                    relation = relation.name,
                    depth,
                    "not traversing relation"
                );
                continue;
            }
            let (next_depth, next_max, next_lite) =
                self.descend(relation, &fetch, depth, max_depth, lite);
            let mut bundles = Vec::new();
            for related in self.related(vertex, relation)? {
                bundles.push(self.fetch(&related, next_depth, next_max, next_lite)?);
            }
            if !bundles.is_empty() {
                relations.insert(relation.name.to_owned(), bundles);
            }
        }
        Ok(relations)
    }

    fn should_traverse(
        &self,
        relation: &RelationDef,
        fetch: &Fetch,
        depth: usize,
        lite: bool,
    ) -> bool {
        if self.dependent_only && !relation.dependent {
            return false;
        }
        if (lite || self.lite_mode) && fetch.when_not_lite {
            return false;
        }
        if depth >= fetch.if_below_level {
            return false;
        }
        if fetch.if_level >= 0 && depth > fetch.if_level as usize {
            return false;
        }
        true
    }

    /// Depth, maximum depth and lite flag of the items related over `relation`.
    fn descend(
        &self,
        relation: &RelationDef,
        fetch: &Fetch,
        depth: usize,
        max_depth: usize,
        lite: bool,
    ) -> (usize, usize, bool) {
        let next_depth = depth + 1;
        let next_max = if fetch.num_levels < 0 {
            max_depth
        } else {
            max_depth.min(next_depth + fetch.num_levels as usize)
        };
        let next_lite = self.lite_mode || lite || (!relation.dependent && !fetch.full);
        (next_depth, next_max, next_lite)
    }

    fn related(
        &self,
        vertex: &Vertex,
        relation: &RelationDef,
    ) -> Result<Vec<Vertex>, SerializationError> {
        let related = match relation.source {
            RelationSource::Edge(direction) => {
                self.store.vertices(&vertex.id, direction, relation.name)?
            }
            RelationSource::EventActioner => {
                event_actioner(self.store, &vertex.id)?.into_iter().collect()
            }
            RelationSource::EventFirstSubject => {
                event_first_subject(self.store, &vertex.id)?.into_iter().collect()
            }
        };
        Ok(related)
    }

    fn vertex_data(&self, vertex: &Vertex, class: EntityClass, lite: bool) -> Data {
        vertex
            .properties
            .iter()
            .filter(|(key, _)| !key.starts_with(MANAGED_PREFIX))
            .filter(|(key, _)| {
                !lite
                    || class.mandatory_keys().iter().any(|mandatory| *mandatory == key.as_str())
                    || self.included_properties.iter().any(|included| included == *key)
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn vertex_meta(&self, vertex: &Vertex, class: EntityClass) -> Result<Data, SerializationError> {
        let mut meta: Data = vertex
            .properties
            .iter()
            .filter(|(key, _)| key.starts_with(MANAGED_PREFIX) && !key.starts_with(INTERNAL_PREFIX))
            .map(|(key, value)| (key[MANAGED_PREFIX.len()..].to_owned(), value.clone()))
            .collect();
        for count in class.meta_counts() {
            let value = self.store.count_edges(&vertex.id, count.direction, count.label)?;
            meta.insert(count.name.to_owned(), Value::from(value));
        }
        Ok(meta)
    }
}

fn entity_class(vertex: &Vertex) -> Result<EntityClass, SerializationError> {
    vertex
        .label
        .parse()
        .map_err(|_| SerializationError::UnknownType {
            id: vertex.id.clone(),
            label: vertex.label.clone(),
        })
}

#[cfg(test)]
mod tests {
    use ehri_graph::{GraphStore, MemoryGraph, Properties, Vertex};
    use serde_json::json;

    use crate::error::SerializationError;

    use super::Serializer;

    fn add(store: &MemoryGraph, id: &str, label: &str, properties: serde_json::Value) -> Vertex {
        let properties: Properties = serde_json::from_value(properties).unwrap();
        store.create_vertex(id, label, properties).unwrap()
    }

    fn setup() -> MemoryGraph {
        let store = MemoryGraph::new();
        add(&store, "r1", "Repository", json!({"identifier": "r1", "_lastUpdated": "2024"}));
        add(
            &store,
            "r1.eng",
            "RepositoryDescription",
            json!({"name": "Repo", "languageCode": "eng", "history": "Long"}),
        );
        add(&store, "c1", "DocumentaryUnit", json!({"identifier": "c1", "__internal": true}));
        add(
            &store,
            "c1.eng",
            "DocumentaryUnitDescription",
            json!({"name": "Unit", "languageCode": "eng", "scopeAndContent": "Long"}),
        );
        add(&store, "c2", "DocumentaryUnit", json!({"identifier": "c2"}));
        store.add_edge("r1.eng", "describes", "r1").unwrap();
        store.add_edge("c1.eng", "describes", "c1").unwrap();
        store.add_edge("c1", "heldBy", "r1").unwrap();
        store.add_edge("c2", "childOf", "c1").unwrap();
        store
    }

    #[test]
    fn data_meta_and_relations() {
        let store = setup();
        let serializer = Serializer::new(&store);
        let bundle = serializer.entity_to_bundle("c1").unwrap();

        assert_eq!(bundle.id(), Some("c1"));
        assert_eq!(bundle.data().len(), 1);
        assert_eq!(bundle.meta().get("childCount"), Some(&json!(1)));
        assert!(!bundle.meta().contains_key("_internal"));

        let description = &bundle.relations_named("describes")[0];
        assert_eq!(description.data_str("scopeAndContent"), Some("Long"));

        // Non-dependent relations are serialized lite.
        let repository = &bundle.relations_named("heldBy")[0];
        assert_eq!(repository.data_str("identifier"), Some("r1"));
        assert_eq!(repository.meta().get("lastUpdated"), Some(&json!("2024")));
        let repository_description = &repository.relations_named("describes")[0];
        assert_eq!(repository_description.data_str("history"), None);
        assert_eq!(repository_description.data_str("name"), Some("Repo"));
    }

    #[test]
    fn included_properties_survive_lite_mode() {
        let store = setup();
        let serializer = Serializer::builder(&store)
            .with_lite_mode(true)
            .with_included_properties(vec!["scopeAndContent".to_string()])
            .build();
        let bundle = serializer.entity_to_bundle("c1").unwrap();
        let description = &bundle.relations_named("describes")[0];
        assert_eq!(description.data_str("scopeAndContent"), Some("Long"));
        let repository = &bundle.relations_named("heldBy")[0];
        let repository_description = &repository.relations_named("describes")[0];
        assert_eq!(repository_description.data_str("history"), None);
    }

    #[test]
    fn dependent_only_and_depth() {
        let store = setup();
        let serializer = Serializer::builder(&store).dependent_only().build();
        let bundle = serializer.entity_to_bundle("c1").unwrap();
        assert!(bundle.has_relations("describes"));
        assert!(!bundle.has_relations("heldBy"));

        let serializer = Serializer::builder(&store).with_depth(0).build();
        let bundle = serializer.entity_to_bundle("c2").unwrap();
        assert!(bundle.relations().is_empty());

        let serializer = Serializer::builder(&store).with_depth(1).build();
        let bundle = serializer.entity_to_bundle("c2").unwrap();
        let parent = &bundle.relations_named("childOf")[0];
        assert_eq!(parent.id(), Some("c1"));
        assert!(parent.relations().is_empty());
    }

    #[test]
    fn cached_serialization_is_stable() {
        let store = setup();
        let serializer = Serializer::builder(&store).with_cache().build();
        let first = serializer.entity_to_bundle("c2").unwrap();
        let second = serializer.entity_to_bundle("c2").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_data(), second.to_data());
    }

    #[test]
    fn traverse_visits_related_vertices() {
        let store = setup();
        let serializer = Serializer::new(&store);
        let vertex = store.get_vertex("c2").unwrap().unwrap();
        let mut visited = Vec::new();
        serializer
            .traverse_subtree(&vertex, |related, depth, relation, index| {
                visited.push((related.id.clone(), depth, relation.to_string(), index));
            })
            .unwrap();
        assert_eq!(visited[0], ("c1".to_string(), 0, "childOf".to_string(), 0));
        assert!(visited.iter().any(|(id, depth, _, _)| id == "r1" && *depth == 1));
    }

    #[test]
    fn unknown_labels_fail() {
        let store = MemoryGraph::new();
        let vertex = add(&store, "x", "Frobnicator", json!({}));
        assert!(matches!(
            Serializer::new(&store).vertex_to_bundle(&vertex),
            Err(SerializationError::UnknownType { .. })
        ));
    }
}
