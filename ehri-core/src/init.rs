// SPDX-License-Identifier: MIT OR Apache-2.0

use ehri_graph::{GraphError, GraphStore, Properties};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::PersistenceError;
use crate::models::ontology::{IDENTIFIER_KEY, NAME_KEY};
use crate::models::{
    ADMIN_GROUP_IDENTIFIER, ANONYMOUS_IDENTIFIER, ContentTypes, EntityClass, PermissionType,
};

/// Seeds the vertices every graph needs before it can be used.
///
/// This creates the event root, the admin and anonymous groups and one vertex per permission
/// type and content type, with ids equal to their names. Running it on an initialized graph only
/// adds what is missing.
#[derive(Clone, Debug)]
pub struct GraphInitializer<S> {
    store: S,
    config: Config,
}

impl<S> GraphInitializer<S>
where
    S: GraphStore,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, Config::default())
    }

    pub fn with_config(store: S, config: Config) -> Self {
        Self { store, config }
    }

    pub fn is_initialized(&self) -> Result<bool, GraphError> {
        self.store.exists(&self.config.event_root)
    }

    pub fn initialize(&self) -> Result<(), PersistenceError> {
        let mut created = 0;
        created += self.ensure(&self.config.event_root, EntityClass::System, &[])?;
        created += self.ensure(
            ADMIN_GROUP_IDENTIFIER,
            EntityClass::Group,
            &[(IDENTIFIER_KEY, ADMIN_GROUP_IDENTIFIER), (NAME_KEY, "Administrators")],
        )?;
        created += self.ensure(
            ANONYMOUS_IDENTIFIER,
            EntityClass::Group,
            &[(IDENTIFIER_KEY, ANONYMOUS_IDENTIFIER), (NAME_KEY, "Anonymous")],
        )?;
        for permission in PermissionType::ALL {
            created += self.ensure(
                permission.name(),
                EntityClass::Permission,
                &[(IDENTIFIER_KEY, permission.name())],
            )?;
        }
        for content_type in ContentTypes::ALL {
            created += self.ensure(
                content_type.name(),
                EntityClass::ContentType,
                &[(IDENTIFIER_KEY, content_type.name())],
            )?;
        }
        debug!(created, "initialized graph");
        Ok(())
    }

    fn ensure(
        &self,
        id: &str,
        class: EntityClass,
        properties: &[(&str, &str)],
    ) -> Result<usize, PersistenceError> {
        if self.store.exists(id)? {
            return Ok(0);
        }
        let properties: Properties = properties
            .iter()
            .map(|(key, value)| ((*key).to_owned(), Value::from(*value)))
            .collect();
        self.store.create_vertex(id, class.name(), properties)?;
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use ehri_graph::{GraphStore, MemoryGraph};

    use super::GraphInitializer;

    #[test]
    fn initialize_is_idempotent() {
        let store = MemoryGraph::new();
        let initializer = GraphInitializer::new(store.clone());
        assert!(!initializer.is_initialized().unwrap());

        initializer.initialize().unwrap();
        assert!(initializer.is_initialized().unwrap());
        let count = store.vertex_count();
        assert_eq!(count, 3 + 7 + 13);

        initializer.initialize().unwrap();
        assert_eq!(store.vertex_count(), count);

        let owner = store.get_vertex("owner").unwrap().unwrap();
        assert_eq!(owner.label, "Permission");
        let units = store.get_vertex("DocumentaryUnit").unwrap().unwrap();
        assert_eq!(units.label, "ContentType");
    }
}
