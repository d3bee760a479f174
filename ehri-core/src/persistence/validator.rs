// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeSet, HashSet};

use ehri_graph::GraphStore;
use serde_json::Value;
use tracing::trace;

use crate::error::{PersistenceError, ValidationError};
use crate::persistence::{Bundle, ErrorSet, ErrorSetBuilder, ID_KEY};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Create,
    Update,
}

/// Checks a bundle tree before it is written to the store.
///
/// Validation happens in two passes over the dependent subtree. The data pass checks mandatory
/// and enumerated properties without touching the store, the tree pass assigns ids and checks
/// them together with unique properties against the store. Every error found in a pass is
/// collected into one [`ErrorSet`] before it is returned inside a [`ValidationError`].
#[derive(Debug)]
pub struct BundleValidator<'a, S> {
    store: &'a S,
    scopes: &'a [String],
}

impl<'a, S> BundleValidator<'a, S>
where
    S: GraphStore,
{
    /// Validator for bundles created under the given scope path.
    pub fn new(store: &'a S, scopes: &'a [String]) -> Self {
        Self { store, scopes }
    }

    /// Validates a bundle for creation and returns it with ids assigned to the whole tree.
    pub fn validate_for_create(&self, bundle: &Bundle) -> Result<Bundle, PersistenceError> {
        self.validate(bundle, Mode::Create)
    }

    /// Validates a bundle for update and returns it with ids assigned to the whole tree.
    pub fn validate_for_update(&self, bundle: &Bundle) -> Result<Bundle, PersistenceError> {
        self.validate(bundle, Mode::Update)
    }

    fn validate(&self, bundle: &Bundle, mode: Mode) -> Result<Bundle, PersistenceError> {
        let errors = validate_data(bundle);
        if !errors.is_empty() {
            return Err(ValidationError::new(bundle.clone(), errors).into());
        }

        let with_ids = bundle.generate_ids(self.scopes);
        let errors = self.validate_tree(&with_ids, self.scopes, mode)?;
        let errors = check_duplicate_ids(&with_ids, errors);
        if !errors.is_empty() {
            return Err(ValidationError::new(with_ids, errors).into());
        }
        Ok(with_ids)
    }

    fn validate_tree(
        &self,
        bundle: &Bundle,
        scopes: &[String],
        mode: Mode,
    ) -> Result<ErrorSet, PersistenceError> {
        let mut errors = ErrorSet::builder();
        match bundle.id() {
            None => errors.push_error(ID_KEY, "missing id"),
            Some(id) if mode == Mode::Create && self.store.exists(id)? => {
                trace!(id, "id collision on create");
                errors.push_errors(
                    bundle
                        .class()
                        .id_generator()
                        .handle_id_collision(scopes, bundle),
                );
            }
            Some(_) => (),
        }
        self.check_uniqueness(bundle, mode, &mut errors)?;
        self.check_children(bundle, scopes, mode, &mut errors)?;
        Ok(errors.build())
    }

    fn check_uniqueness(
        &self,
        bundle: &Bundle,
        mode: Mode,
        errors: &mut ErrorSetBuilder,
    ) -> Result<(), PersistenceError> {
        for key in bundle.unique_property_keys() {
            let Some(value) = bundle.data_value(key) else {
                continue;
            };
            let hits = self
                .store
                .vertices_by_property(key, value, Some(bundle.class().name()))?;
            let conflict = match mode {
                Mode::Create => !hits.is_empty(),
                Mode::Update => hits
                    .iter()
                    .any(|vertex| Some(vertex.id.as_str()) != bundle.id()),
            };
            if conflict {
                errors.push_error(
                    *key,
                    format!("value '{}' exists and must be unique", display(value)),
                );
            }
        }
        Ok(())
    }

    fn check_children(
        &self,
        bundle: &Bundle,
        scopes: &[String],
        mode: Mode,
        errors: &mut ErrorSetBuilder,
    ) -> Result<(), PersistenceError> {
        let mut child_scopes = scopes.to_vec();
        child_scopes.push(bundle.class().id_generator().id_base(bundle));
        let parent_scope: Vec<String> = bundle.id().map(str::to_owned).into_iter().collect();

        let mut seen = HashSet::new();
        for (name, children) in bundle.dependent_relations() {
            for child in children {
                let mut child_errors = self.validate_tree(&child, &child_scopes, mode)?;
                if let Some(id) = child.id() {
                    if !seen.insert(id.to_owned()) && child_errors.is_empty() {
                        let mut builder = ErrorSet::builder();
                        builder.push_errors(
                            child
                                .class()
                                .id_generator()
                                .handle_id_collision(&parent_scope, &child),
                        );
                        child_errors = builder.build();
                    }
                }
                errors.push_relation(name.clone(), child_errors);
            }
        }
        Ok(())
    }
}

/// Checks mandatory and enumerated properties of the whole dependent tree.
pub(crate) fn validate_data(bundle: &Bundle) -> ErrorSet {
    let mut errors = ErrorSet::builder();
    let class = bundle.class();
    for key in class.mandatory_keys() {
        match bundle.data_value(key) {
            None => errors.push_error(*key, "missing mandatory field"),
            Some(Value::String(value)) if value.trim().is_empty() => {
                errors.push_error(*key, "mandatory field must not be empty")
            }
            Some(_) => (),
        }
    }
    for property in class.enum_properties() {
        if let Some(value) = bundle.data_value(property.key) {
            let valid = value
                .as_str()
                .is_some_and(|value| property.values.iter().any(|allowed| *allowed == value));
            if !valid {
                errors.push_error(
                    property.key,
                    format!(
                        "value '{}' is not one of: {}",
                        display(value),
                        property.values.join(", ")
                    ),
                );
            }
        }
    }
    for (name, children) in bundle.dependent_relations() {
        for child in children {
            errors.push_relation(name.clone(), validate_data(&child));
        }
    }
    errors.build()
}

/// Reports ids used more than once within the dependent tree at its root.
fn check_duplicate_ids(bundle: &Bundle, errors: ErrorSet) -> ErrorSet {
    let dependents = bundle.dependents_only();
    let mut seen = HashSet::new();
    let mut duplicates = BTreeSet::new();
    for item in dependents.iter() {
        if let Some(id) = item.id() {
            if !seen.insert(id) {
                duplicates.insert(id.to_owned());
            }
        }
    }
    duplicates.into_iter().fold(errors, |errors, id| {
        errors.with_data_value(ID_KEY, format!("duplicate id '{id}' in item tree"))
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        value => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use ehri_graph::{GraphStore, MemoryGraph, Properties};
    use serde_json::json;

    use crate::error::PersistenceError;
    use crate::models::EntityClass;
    use crate::persistence::{Bundle, ErrorSet};

    use super::{BundleValidator, validate_data};

    fn description(language: &str, name: &str) -> Bundle {
        Bundle::builder(EntityClass::DocumentaryUnitDescription)
            .data_value("languageCode", language)
            .data_value("name", name)
            .build()
    }

    fn validation_errors(result: Result<Bundle, PersistenceError>) -> ErrorSet {
        match result {
            Err(PersistenceError::Validation(err)) => err.errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn mandatory_fields_on_nested_bundles() {
        let bundle = Bundle::builder(EntityClass::DocumentaryUnit)
            .data_value("identifier", "c1")
            .relation("describes", description("eng", "Name"))
            .relation("describes", description("fra", "  "))
            .build();

        let errors = validate_data(&bundle);
        assert!(!errors.is_empty());
        assert!(errors.errors_for("identifier").is_empty());
        let nested = errors.relations_named("describes");
        assert!(nested[0].is_empty());
        assert_eq!(nested[1].errors_for("name").len(), 1);
    }

    #[test]
    fn enum_values_are_checked() {
        let date = Bundle::builder(EntityClass::DatePeriod)
            .data_value("startDate", "1940")
            .data_value("type", "sometime")
            .build();
        assert_eq!(validate_data(&date).errors_for("type").len(), 1);
        assert!(validate_data(&date.with_data_value("type", "creation")).is_empty());
    }

    #[test]
    fn non_dependent_relations_are_not_validated() {
        let bundle = Bundle::builder(EntityClass::DocumentaryUnit)
            .data_value("identifier", "c1")
            .relation("heldBy", Bundle::new(EntityClass::Repository))
            .build();
        assert!(validate_data(&bundle).is_empty());
    }

    #[test]
    fn id_collision_on_create() {
        let store = MemoryGraph::new();
        store
            .create_vertex("nl-r1-c1", "DocumentaryUnit", Properties::new())
            .unwrap();
        let scopes = vec!["nl".to_string(), "r1".to_string()];
        let validator = BundleValidator::new(&store, &scopes);

        let bundle = Bundle::builder(EntityClass::DocumentaryUnit)
            .data_value("identifier", "c1")
            .build();
        let errors = validation_errors(validator.validate_for_create(&bundle));
        assert_eq!(errors.errors_for("identifier").len(), 1);

        // Existing ids are fine when updating.
        let with_ids = validator.validate_for_update(&bundle).unwrap();
        assert_eq!(with_ids.id(), Some("nl-r1-c1"));
    }

    #[test]
    fn duplicate_descriptions() {
        let store = MemoryGraph::new();
        let validator = BundleValidator::new(&store, &[]);
        let bundle = Bundle::builder(EntityClass::DocumentaryUnit)
            .data_value("identifier", "c1")
            .relation("describes", description("eng", "One"))
            .relation("describes", description("eng", "Two"))
            .build();

        let errors = validation_errors(validator.validate_for_create(&bundle));
        assert_eq!(errors.errors_for("id").len(), 1);
        let nested = errors.relations_named("describes");
        assert!(nested[0].is_empty());
        assert_eq!(nested[1].errors_for("languageCode").len(), 1);
    }

    #[test]
    fn unique_keys() {
        let store = MemoryGraph::new();
        let mut properties = Properties::new();
        properties.insert("identifier".into(), json!("nl"));
        store.create_vertex("other", "Country", properties).unwrap();

        let validator = BundleValidator::new(&store, &[]);
        let bundle = Bundle::builder(EntityClass::Country)
            .id("nl")
            .data_value("identifier", "nl")
            .build();
        let errors = validation_errors(validator.validate_for_create(&bundle));
        assert_eq!(errors.errors_for("identifier").len(), 1);

        // Matching the item itself is fine when updating.
        let own = bundle.with_id("other");
        assert!(validator.validate_for_update(&own).is_ok());
        let errors = validation_errors(validator.validate_for_update(&bundle));
        assert_eq!(errors.errors_for("identifier").len(), 1);
    }

    #[test]
    fn data_errors_are_reported_before_ids() {
        let store = MemoryGraph::new();
        let validator = BundleValidator::new(&store, &[]);
        let bundle = Bundle::new(EntityClass::DocumentaryUnit);
        let err = match validator.validate_for_create(&bundle) {
            Err(PersistenceError::Validation(err)) => err,
            other => panic!("expected validation error, got {other:?}"),
        };
        assert_eq!(err.bundle.id(), None);
        assert_eq!(err.errors.errors_for("identifier").len(), 1);
    }
}
