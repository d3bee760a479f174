// SPDX-License-Identifier: MIT OR Apache-2.0

//! Id generation for new items.
//!
//! Ids of identifiable items are a pure function of their scope path and their identifier, this
//! keeps them stable across imports and allows checking them offline. Items without a natural
//! identifier receive a random UUID.
use std::collections::BTreeMap;

use uuid::Uuid;

use crate::models::ontology::{IDENTIFIER_KEY, LANGUAGE_CODE};
use crate::persistence::Bundle;

/// Separator between the segments of a hierarchical id.
pub const SEPARATOR: &str = "-";

/// Separator between the parent path and the language part of description ids.
pub const DESCRIPTION_SEPARATOR: &str = ".";

/// Error messages keyed by the field which caused them.
pub type IdErrors = BTreeMap<String, Vec<String>>;

/// Strategy used to derive the id of a new item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdGenerator {
    /// Scope path joined with the item's identifier.
    IdentifiableEntity,

    /// Parent path joined with the language code and optional identifier of a description.
    Description,

    /// Random UUID.
    Generic,
}

impl IdGenerator {
    /// Generates an id for the bundle under the given scope path.
    pub fn generate_id(&self, scopes: &[String], bundle: &Bundle) -> String {
        match self {
            IdGenerator::IdentifiableEntity => {
                let mut segments = scopes.to_vec();
                segments.push(self.id_base(bundle));
                join_path(&segments)
            }
            IdGenerator::Description => {
                let base = slugify(&self.id_base(bundle));
                format!("{}{DESCRIPTION_SEPARATOR}{base}", join_path(scopes))
            }
            IdGenerator::Generic => Uuid::new_v4().to_string(),
        }
    }

    /// The part of an item's id contributed by the item itself.
    ///
    /// Children of the item are generated with this value appended to their scope path.
    pub fn id_base(&self, bundle: &Bundle) -> String {
        match self {
            IdGenerator::IdentifiableEntity => {
                bundle.data_str(IDENTIFIER_KEY).unwrap_or_default().to_owned()
            }
            IdGenerator::Description => {
                let language = bundle.data_str(LANGUAGE_CODE).unwrap_or_default();
                match bundle.data_str(IDENTIFIER_KEY) {
                    Some(identifier) if !identifier.trim().is_empty() => {
                        format!("{language}{SEPARATOR}{identifier}")
                    }
                    _ => language.to_owned(),
                }
            }
            IdGenerator::Generic => bundle.id().unwrap_or_default().to_owned(),
        }
    }

    /// Explains an id collision in terms of the fields the id was derived from.
    pub fn handle_id_collision(&self, scopes: &[String], bundle: &Bundle) -> IdErrors {
        let mut errors = IdErrors::new();
        match self {
            IdGenerator::IdentifiableEntity => {
                let identifier = bundle.data_str(IDENTIFIER_KEY).unwrap_or_default();
                let message = if scopes.is_empty() {
                    format!("an item with identifier '{identifier}' already exists")
                } else {
                    format!(
                        "an item with identifier '{identifier}' already exists in scope '{}'",
                        join_path(scopes)
                    )
                };
                errors.insert(IDENTIFIER_KEY.to_owned(), vec![message]);
            }
            IdGenerator::Description => {
                let language = bundle.data_str(LANGUAGE_CODE).unwrap_or_default();
                errors.insert(
                    LANGUAGE_CODE.to_owned(),
                    vec![format!(
                        "a description with language '{language}' and the same identifier already exists"
                    )],
                );
            }
            IdGenerator::Generic => {
                let id = bundle.id().unwrap_or_default();
                errors.insert(
                    "id".to_owned(),
                    vec![format!("an item with id '{id}' already exists")],
                );
            }
        }
        errors
    }
}

/// Joins id segments into a hierarchical id.
///
/// Blank segments are dropped, every other segment is slugified.
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|segment| segment.as_ref())
        .filter(|segment| !segment.trim().is_empty())
        .map(slugify)
        .collect::<Vec<String>>()
        .join(SEPARATOR)
}

/// Lowercases the value and replaces every run of non-alphanumeric characters with `_`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending = false;
    for c in value.trim().chars() {
        if c.is_alphanumeric() {
            if pending && !slug.is_empty() {
                slug.push('_');
            }
            pending = false;
            slug.extend(c.to_lowercase());
        } else {
            pending = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::models::EntityClass;
    use crate::persistence::Bundle;

    use super::{IdGenerator, join_path, slugify};

    fn scopes(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("c1"), "c1");
        assert_eq!(slugify("  Foo Bar  "), "foo_bar");
        assert_eq!(slugify("a--b//c"), "a_b_c");
        assert_eq!(slugify("-x-"), "x");
        assert_eq!(slugify("ÜBER"), "über");
    }

    #[test]
    fn join_paths() {
        assert_eq!(join_path(&["nl", "repo1", "c1"]), "nl-repo1-c1");
        assert_eq!(join_path(&["nl", "", " ", "c1"]), "nl-c1");
        assert_eq!(join_path(&["NL", "Repo 1"]), "nl-repo_1");
        assert_eq!(join_path::<&str>(&[]), "");
    }

    #[test]
    fn identifiable_ids() {
        let bundle = Bundle::builder(EntityClass::DocumentaryUnit)
            .data_value("identifier", json!("c1"))
            .build();
        let generator = IdGenerator::IdentifiableEntity;
        assert_eq!(
            generator.generate_id(&scopes(&["nl", "repo1"]), &bundle),
            "nl-repo1-c1"
        );
        assert_eq!(generator.id_base(&bundle), "c1");
        assert!(generator
            .handle_id_collision(&scopes(&["nl"]), &bundle)
            .contains_key("identifier"));
    }

    #[test]
    fn description_ids() {
        let bundle = Bundle::builder(EntityClass::DocumentaryUnitDescription)
            .data_value("languageCode", json!("eng"))
            .data_value("name", json!("A description"))
            .build();
        let generator = IdGenerator::Description;
        assert_eq!(
            generator.generate_id(&scopes(&["nl", "repo1", "c1"]), &bundle),
            "nl-repo1-c1.eng"
        );

        let bundle = bundle.with_data_value("identifier", json!("Alt Desc"));
        assert_eq!(generator.id_base(&bundle), "eng-Alt Desc");
        assert_eq!(
            generator.generate_id(&scopes(&["nl", "repo1", "c1"]), &bundle),
            "nl-repo1-c1.eng_alt_desc"
        );
        assert!(generator
            .handle_id_collision(&[], &bundle)
            .contains_key("languageCode"));
    }

    #[test]
    fn generic_ids_are_random() {
        let bundle = Bundle::new(EntityClass::DatePeriod);
        let generator = IdGenerator::Generic;
        assert_ne!(
            generator.generate_id(&[], &bundle),
            generator.generate_id(&[], &bundle)
        );
        assert_eq!(generator.id_base(&bundle), "");
        assert!(generator.handle_id_collision(&[], &bundle).contains_key("id"));
    }
}
