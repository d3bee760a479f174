// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event log of all changes made to the graph.
//!
//! Every event is reachable over three independent linked lists, each with the most recent entry
//! at its head:
//!
//! * the global event queue, starting at the event root vertex,
//! * the action stream of the accessor who performed the change,
//! * the event stream of every item affected by the change.
//!
//! Action and event streams do not point at events directly but at `EventLink` vertices, so the
//! same event can take part in many streams. Snapshots of items taken before a change are stored
//! as versions in a fourth list per item and point back at the event which caused them.
use chrono::{DateTime, SecondsFormat, Utc};
use ehri_graph::{Direction, GraphStore, Properties, Vertex};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ItemNotFound, PersistenceError};
use crate::models::event::{
    action_link, event_actioner, event_first_subject, event_scope, event_subjects,
};
use crate::models::ontology::{
    ACTION_HAS_EVENT, ACTIONER_HAS_LIFECYCLE_ACTION, ENTITY_HAS_EVENT, ENTITY_HAS_LIFECYCLE_EVENT,
    ENTITY_HAS_PRIOR_VERSION, EVENT_HAS_SCOPE, EVENT_LINK_TYPE, EVENT_LOG_MESSAGE,
    EVENT_SUBJECT_COUNT, EVENT_TIMESTAMP, EVENT_TYPE, GLOBAL_EVENT_STREAM, VERSION_ENTITY_CLASS,
    VERSION_ENTITY_DATA, VERSION_ENTITY_ID, VERSION_HAS_EVENT,
};
use crate::models::{EntityClass, EventTypes, PermissionScope};
use crate::persistence::{Bundle, BundleDao, Serializer};

/// Records events and versions and reads them back.
#[derive(Clone, Debug)]
pub struct ActionManager<S> {
    store: S,
    scope: PermissionScope,
    config: Config,
}

impl<S> ActionManager<S>
where
    S: GraphStore + Clone,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, Config::default())
    }

    pub fn with_config(store: S, config: Config) -> Self {
        Self {
            store,
            scope: PermissionScope::System,
            config,
        }
    }

    /// Manager recording events within the given scope.
    pub fn with_scope(&self, scope: PermissionScope) -> Self {
        Self {
            store: self.store.clone(),
            scope,
            config: self.config.clone(),
        }
    }

    pub fn scope(&self) -> &PermissionScope {
        &self.scope
    }

    /// Starts a new event performed by `actioner`.
    ///
    /// Nothing is written until the returned context is committed. The event timestamp is taken
    /// now.
    pub fn new_event_context(
        &self,
        actioner: &str,
        event_type: EventTypes,
        log_message: Option<&str>,
    ) -> EventContext<'_, S> {
        EventContext {
            manager: self,
            actioner: actioner.to_owned(),
            event_type,
            log_message: log_message.map(str::to_owned),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            subjects: Vec::new(),
            versions: Vec::new(),
        }
    }

    /// Most recent event in the global queue.
    pub fn latest_global_event(&self) -> Result<Option<Vertex>, PersistenceError> {
        Ok(self.latest_global_events(1)?.into_iter().next())
    }

    /// Up to `limit` events from the global queue, most recent first.
    pub fn latest_global_events(&self, limit: usize) -> Result<Vec<Vertex>, PersistenceError> {
        let root = &self.config.event_root;
        if !self.store.exists(root)? {
            return Err(PersistenceError::MissingEventRoot(root.clone()));
        }
        let mut events = Vec::new();
        let mut current = first(&self.store, root, GLOBAL_EVENT_STREAM)?;
        while let Some(event) = current {
            if events.len() >= limit {
                break;
            }
            current = first(&self.store, &event.id, ACTIONER_HAS_LIFECYCLE_ACTION)?;
            events.push(event);
        }
        Ok(events)
    }

    /// Up to `limit` events performed by the accessor, most recent first.
    pub fn actions_for(
        &self,
        actioner: &str,
        limit: usize,
    ) -> Result<Vec<Vertex>, PersistenceError> {
        self.walk_stream(actioner, ACTIONER_HAS_LIFECYCLE_ACTION, ACTION_HAS_EVENT, limit)
    }

    /// Up to `limit` events affecting the item, most recent first.
    pub fn events_for(&self, subject: &str, limit: usize) -> Result<Vec<Vertex>, PersistenceError> {
        self.walk_stream(subject, ENTITY_HAS_LIFECYCLE_EVENT, ENTITY_HAS_EVENT, limit)
    }

    /// Up to `limit` versions of the item, most recent first.
    pub fn versions_for(
        &self,
        entity: &str,
        limit: usize,
    ) -> Result<Vec<Vertex>, PersistenceError> {
        if !self.store.exists(entity)? {
            return Err(ItemNotFound(entity.to_owned()).into());
        }
        let mut versions = Vec::new();
        let mut current = first(&self.store, entity, ENTITY_HAS_PRIOR_VERSION)?;
        while let Some(version) = current {
            if versions.len() >= limit {
                break;
            }
            current = first(&self.store, &version.id, ENTITY_HAS_PRIOR_VERSION)?;
            versions.push(version);
        }
        Ok(versions)
    }

    pub fn event_actioner(&self, event: &str) -> Result<Option<Vertex>, PersistenceError> {
        Ok(event_actioner(&self.store, event)?)
    }

    pub fn event_subjects(&self, event: &str) -> Result<Vec<Vertex>, PersistenceError> {
        Ok(event_subjects(&self.store, event)?)
    }

    /// Returns `true` if two events can be shown as one.
    ///
    /// Events aggregate if they share type, log message, scope, first subject and actioner. If
    /// `time_diff_secs` is not negative, their timestamps must also be less than that many seconds
    /// apart.
    pub fn can_aggregate(
        &self,
        first_event: &Vertex,
        second_event: &Vertex,
        time_diff_secs: i64,
    ) -> Result<bool, PersistenceError> {
        if first_event.property(EVENT_TYPE) != second_event.property(EVENT_TYPE) {
            return Ok(false);
        }
        if first_event.property(EVENT_LOG_MESSAGE) != second_event.property(EVENT_LOG_MESSAGE) {
            return Ok(false);
        }
        if time_diff_secs >= 0 {
            let first_time = timestamp(first_event)?;
            let second_time = timestamp(second_event)?;
            if (second_time - first_time).num_seconds().abs() >= time_diff_secs {
                return Ok(false);
            }
        }

        let ids = |vertex: Option<Vertex>| vertex.map(|vertex| vertex.id);
        if ids(event_scope(&self.store, &first_event.id)?)
            != ids(event_scope(&self.store, &second_event.id)?)
        {
            return Ok(false);
        }
        if ids(event_first_subject(&self.store, &first_event.id)?)
            != ids(event_first_subject(&self.store, &second_event.id)?)
        {
            return Ok(false);
        }
        Ok(ids(event_actioner(&self.store, &first_event.id)?)
            == ids(event_actioner(&self.store, &second_event.id)?))
    }

    /// Returns `true` if two events are equivalent regardless of when they happened.
    pub fn same_as(
        &self,
        first_event: &Vertex,
        second_event: &Vertex,
    ) -> Result<bool, PersistenceError> {
        self.can_aggregate(first_event, second_event, -1)
    }

    /// Returns `true` if `second_event` directly precedes `first_event` in the same action stream.
    pub fn sequential_with_same_accessor(
        &self,
        first_event: &Vertex,
        second_event: &Vertex,
    ) -> Result<bool, PersistenceError> {
        let (Some(first_link), Some(second_link)) = (
            action_link(&self.store, &first_event.id)?,
            action_link(&self.store, &second_event.id)?,
        ) else {
            return Ok(false);
        };
        Ok(self
            .store
            .has_edge(&first_link.id, ACTIONER_HAS_LIFECYCLE_ACTION, &second_link.id)?)
    }

    fn walk_stream(
        &self,
        owner: &str,
        stream_label: &str,
        event_label: &str,
        limit: usize,
    ) -> Result<Vec<Vertex>, PersistenceError> {
        if !self.store.exists(owner)? {
            return Err(ItemNotFound(owner.to_owned()).into());
        }
        let mut events = Vec::new();
        let mut current = first(&self.store, owner, stream_label)?;
        while let Some(link) = current {
            if events.len() >= limit {
                break;
            }
            if let Some(event) = first(&self.store, &link.id, event_label)? {
                events.push(event);
            }
            current = first(&self.store, &link.id, stream_label)?;
        }
        Ok(events)
    }

    fn dao(&self) -> BundleDao<S> {
        BundleDao::with_config(self.store.clone(), self.config.clone())
    }
}

/// An event under construction.
///
/// Subjects and versions are collected first and written together on [`EventContext::commit`].
#[derive(Debug)]
pub struct EventContext<'a, S> {
    manager: &'a ActionManager<S>,
    actioner: String,
    event_type: EventTypes,
    log_message: Option<String>,
    timestamp: String,
    subjects: Vec<String>,
    versions: Vec<(String, Bundle)>,
}

impl<S> EventContext<'_, S>
where
    S: GraphStore + Clone,
{
    pub fn actioner(&self) -> &str {
        &self.actioner
    }

    pub fn event_type(&self) -> EventTypes {
        self.event_type
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    /// Adds an item affected by the event. Adding the same item again has no effect.
    pub fn add_subject(mut self, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        if !self.subjects.contains(&subject) {
            self.subjects.push(subject);
        }
        self
    }

    pub fn add_subjects<I, T>(self, subjects: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        subjects
            .into_iter()
            .fold(self, |context, subject| context.add_subject(subject))
    }

    /// Snapshots the current state of the item as a version of it.
    ///
    /// Call this before the item is changed.
    pub fn create_version(self, entity: &str) -> Result<Self, PersistenceError> {
        let bundle = Serializer::builder(&self.manager.store)
            .with_config(&self.manager.config)
            .dependent_only()
            .build()
            .entity_to_bundle(entity)?;
        Ok(self.create_version_with(entity, bundle))
    }

    /// Records a precomputed snapshot as a version of the item.
    ///
    /// Only the first snapshot of an item is kept.
    pub fn create_version_with(mut self, entity: impl Into<String>, bundle: Bundle) -> Self {
        let entity = entity.into();
        if !self.versions.iter().any(|(id, _)| *id == entity) {
            self.versions.push((entity, bundle));
        }
        self
    }

    /// Writes the event, its links into all streams and its versions.
    pub fn commit(self) -> Result<Vertex, PersistenceError> {
        let store = &self.manager.store;
        let root = &self.manager.config.event_root;
        if !store.exists(root)? {
            return Err(PersistenceError::MissingEventRoot(root.clone()));
        }
        for id in std::iter::once(&self.actioner).chain(self.subjects.iter()) {
            if !store.exists(id)? {
                return Err(ItemNotFound(id.clone()).into());
            }
        }

        let dao = self.manager.dao();
        let event = dao.create(
            &Bundle::builder(EntityClass::SystemEvent)
                .data_value(EVENT_TYPE, self.event_type.name())
                .data_value(EVENT_TIMESTAMP, self.timestamp.as_str())
                .data_value(EVENT_LOG_MESSAGE, self.log_message.clone().unwrap_or_default())
                .build(),
        )?;
        if let PermissionScope::Item(scope) = &self.manager.scope {
            store.add_edge(&event.id, EVENT_HAS_SCOPE, scope)?;
        }
        replace_at_head(
            store,
            root,
            &event.id,
            GLOBAL_EVENT_STREAM,
            ACTIONER_HAS_LIFECYCLE_ACTION,
        )?;

        let link = create_link(store, ACTIONER_HAS_LIFECYCLE_ACTION)?;
        replace_at_head(
            store,
            &self.actioner,
            &link.id,
            ACTIONER_HAS_LIFECYCLE_ACTION,
            ACTIONER_HAS_LIFECYCLE_ACTION,
        )?;
        store.add_edge(&link.id, ACTION_HAS_EVENT, &event.id)?;

        for (count, subject) in self.subjects.iter().enumerate() {
            let link = create_link(store, ENTITY_HAS_LIFECYCLE_EVENT)?;
            replace_at_head(
                store,
                subject,
                &link.id,
                ENTITY_HAS_LIFECYCLE_EVENT,
                ENTITY_HAS_LIFECYCLE_EVENT,
            )?;
            store.add_edge(&link.id, ENTITY_HAS_EVENT, &event.id)?;
            store.set_property(&event.id, EVENT_SUBJECT_COUNT, Value::from(count + 1))?;
        }

        for (entity, bundle) in self.versions.iter() {
            let version = dao.create(
                &Bundle::builder(EntityClass::Version)
                    .data_value(VERSION_ENTITY_ID, entity.as_str())
                    .data_value(VERSION_ENTITY_CLASS, bundle.class().name())
                    .data_value(VERSION_ENTITY_DATA, bundle.to_json()?)
                    .build(),
            )?;
            replace_at_head(
                store,
                entity,
                &version.id,
                ENTITY_HAS_PRIOR_VERSION,
                ENTITY_HAS_PRIOR_VERSION,
            )?;
            store.add_edge(&version.id, VERSION_HAS_EVENT, &event.id)?;
        }

        debug!(
            id = %event.id,
            event_type = %self.event_type,
            actioner = %self.actioner,
            subjects = self.subjects.len(),
            "committed event"
        );
        Ok(store.get_vertex(&event.id)?.unwrap_or(event))
    }
}

/// Inserts `new_head` at the head of the list hanging off `head`.
///
/// The previous head, if any, is moved behind the new head.
fn replace_at_head<S: GraphStore>(
    store: &S,
    head: &str,
    new_head: &str,
    head_label: &str,
    label: &str,
) -> Result<(), PersistenceError> {
    let current = store.edges(head, Direction::Out, head_label)?;
    for edge in current.iter() {
        store.remove_edge(edge.id)?;
    }
    if let Some(previous) = current.first() {
        store.add_edge(new_head, label, &previous.to)?;
    }
    store.add_edge(head, head_label, new_head)?;
    Ok(())
}

fn create_link<S: GraphStore>(store: &S, link_type: &str) -> Result<Vertex, PersistenceError> {
    let mut properties = Properties::new();
    properties.insert(EVENT_LINK_TYPE.to_owned(), Value::from(link_type));
    Ok(store.create_vertex(
        &Uuid::new_v4().to_string(),
        EntityClass::EventLink.name(),
        properties,
    )?)
}

fn first<S: GraphStore>(
    store: &S,
    id: &str,
    label: &str,
) -> Result<Option<Vertex>, PersistenceError> {
    Ok(store.vertices(id, Direction::Out, label)?.into_iter().next())
}

fn timestamp(event: &Vertex) -> Result<DateTime<Utc>, PersistenceError> {
    let value = event.property_str(EVENT_TIMESTAMP).unwrap_or_default();
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|_| PersistenceError::InvalidTimestamp(value.to_owned()))
}

#[cfg(test)]
mod tests {
    use ehri_graph::{Direction, GraphStore, MemoryGraph, Properties, Vertex};
    use serde_json::json;

    use crate::error::PersistenceError;
    use crate::init::GraphInitializer;
    use crate::models::{EventTypes, PermissionScope};
    use crate::persistence::Bundle;

    use super::ActionManager;

    fn setup() -> MemoryGraph {
        let store = MemoryGraph::new();
        GraphInitializer::new(store.clone()).initialize().unwrap();
        for (id, label) in [
            ("u1", "UserProfile"),
            ("u2", "UserProfile"),
            ("c1", "DocumentaryUnit"),
            ("c2", "DocumentaryUnit"),
            ("r1", "Repository"),
        ] {
            let mut properties = Properties::new();
            properties.insert("identifier".into(), json!(id));
            store.create_vertex(id, label, properties).unwrap();
        }
        store
    }

    fn ids(vertices: &[Vertex]) -> Vec<&str> {
        vertices.iter().map(|vertex| vertex.id.as_str()).collect()
    }

    #[test]
    fn streams_are_most_recent_first() {
        let store = setup();
        let manager = ActionManager::new(store.clone());

        let mut events = Vec::new();
        for _ in 0..3 {
            let event = manager
                .new_event_context("u1", EventTypes::Modification, Some("edit"))
                .add_subject("c1")
                .commit()
                .unwrap();
            events.push(event);
        }
        let other = manager
            .new_event_context("u2", EventTypes::Creation, None)
            .add_subjects(["c2"])
            .commit()
            .unwrap();

        let expected: Vec<&str> = events.iter().rev().map(|event| event.id.as_str()).collect();
        assert_eq!(ids(&manager.actions_for("u1", usize::MAX).unwrap()), expected);
        assert_eq!(ids(&manager.events_for("c1", usize::MAX).unwrap()), expected);
        assert_eq!(ids(&manager.actions_for("u1", 2).unwrap()), expected[..2].to_vec());

        let global = manager.latest_global_events(usize::MAX).unwrap();
        assert_eq!(global.len(), 4);
        assert_eq!(global[0].id, other.id);
        assert_eq!(ids(&global[1..]), expected);
        assert_eq!(manager.latest_global_event().unwrap().unwrap().id, other.id);
    }

    #[test]
    fn event_navigation() {
        let store = setup();
        let manager = ActionManager::new(store.clone()).with_scope(PermissionScope::item("r1"));
        let event = manager
            .new_event_context("u1", EventTypes::Creation, None)
            .add_subjects(["c1", "c2"])
            .commit()
            .unwrap();

        assert_eq!(event.property_str("eventType"), Some("creation"));
        assert_eq!(event.property_str("logMessage"), Some(""));
        assert_eq!(event.property_i64("_subjectCount"), Some(2));
        assert_eq!(manager.event_actioner(&event.id).unwrap().unwrap().id, "u1");
        assert_eq!(ids(&manager.event_subjects(&event.id).unwrap()), vec!["c1", "c2"]);
        assert!(store.has_edge(&event.id, "hasEventScope", "r1").unwrap());
    }

    #[test]
    fn versions_link_to_events() {
        let store = setup();
        let manager = ActionManager::new(store.clone());
        let first = manager
            .new_event_context("u1", EventTypes::Modification, None)
            .add_subject("c1")
            .create_version("c1")
            .unwrap()
            .commit()
            .unwrap();
        let snapshot = Bundle::builder(crate::models::EntityClass::DocumentaryUnit)
            .data_value("identifier", "old")
            .build();
        let second = manager
            .new_event_context("u1", EventTypes::Modification, None)
            .add_subject("c1")
            .create_version_with("c1", snapshot.clone())
            .commit()
            .unwrap();

        let versions = manager.versions_for("c1", usize::MAX).unwrap();
        assert_eq!(versions.len(), 2);
        assert!(store.has_edge(&versions[0].id, "triggeredByEvent", &second.id).unwrap());
        assert!(store.has_edge(&versions[1].id, "triggeredByEvent", &first.id).unwrap());

        let data = versions[0].property_str("entityData").unwrap();
        assert_eq!(Bundle::from_json(data).unwrap(), snapshot);
        assert_eq!(versions[0].property_str("entityId"), Some("c1"));
        assert_eq!(versions[1].property_str("entityType"), Some("DocumentaryUnit"));
    }

    #[test]
    fn subjects_and_versions_are_recorded_once() {
        let store = setup();
        let manager = ActionManager::new(store.clone());
        let snapshot = Bundle::builder(crate::models::EntityClass::DocumentaryUnit)
            .data_value("identifier", "old")
            .build();
        let event = manager
            .new_event_context("u1", EventTypes::Modification, None)
            .add_subject("c1")
            .add_subjects(["c2", "c1"])
            .add_subject("c1")
            .create_version_with("c1", snapshot.clone())
            .create_version_with("c1", snapshot.with_data_value("identifier", "newer"))
            .commit()
            .unwrap();

        assert_eq!(ids(&manager.events_for("c1", usize::MAX).unwrap()), vec![event.id.as_str()]);
        assert_eq!(event.property_i64("_subjectCount"), Some(2));
        assert_eq!(ids(&manager.event_subjects(&event.id).unwrap()), vec!["c1", "c2"]);

        let versions = manager.versions_for("c1", usize::MAX).unwrap();
        assert_eq!(versions.len(), 1);
        let data = versions[0].property_str("entityData").unwrap();
        assert_eq!(Bundle::from_json(data).unwrap(), snapshot);
    }

    #[test]
    fn aggregation() {
        let store = setup();
        let manager = ActionManager::new(store.clone());
        let commit = |actioner: &str, subject: &str, event_type: EventTypes| {
            manager
                .new_event_context(actioner, event_type, None)
                .add_subject(subject)
                .commit()
                .unwrap()
        };
        let first = commit("u1", "c1", EventTypes::Modification);
        let second = commit("u1", "c1", EventTypes::Modification);
        let third = commit("u1", "c2", EventTypes::Modification);
        let fourth = commit("u2", "c1", EventTypes::Modification);
        let fifth = commit("u2", "c1", EventTypes::Deletion);

        assert!(manager.same_as(&first, &second).unwrap());
        assert!(manager.can_aggregate(&first, &second, 3600).unwrap());
        assert!(!manager.can_aggregate(&first, &second, 0).unwrap());
        assert!(!manager.same_as(&second, &third).unwrap());
        assert!(!manager.same_as(&second, &fourth).unwrap());
        assert!(!manager.same_as(&fourth, &fifth).unwrap());

        assert!(manager.sequential_with_same_accessor(&second, &first).unwrap());
        assert!(!manager.sequential_with_same_accessor(&first, &second).unwrap());
        assert!(!manager.sequential_with_same_accessor(&fourth, &third).unwrap());
    }

    #[test]
    fn missing_items_are_reported() {
        let store = setup();
        let manager = ActionManager::new(store.clone());
        assert!(matches!(
            manager
                .new_event_context("nobody", EventTypes::Creation, None)
                .commit(),
            Err(PersistenceError::ItemNotFound(_))
        ));
        assert!(matches!(
            manager
                .new_event_context("u1", EventTypes::Creation, None)
                .add_subject("missing")
                .commit(),
            Err(PersistenceError::ItemNotFound(_))
        ));
        assert!(manager.latest_global_event().unwrap().is_none());

        let empty = MemoryGraph::new();
        assert!(matches!(
            ActionManager::new(empty).latest_global_event(),
            Err(PersistenceError::MissingEventRoot(_))
        ));
        assert_eq!(store.vertices("u1", Direction::Out, "lifecycleAction").unwrap().len(), 0);
    }
}
