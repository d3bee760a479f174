// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::persistence::bundle::REL_KEY;

/// Key under which field errors appear in the data representation.
pub const ERROR_KEY: &str = "errors";

/// Validation errors arranged in the shape of the bundle they were found in.
///
/// Field errors are keyed by property name, errors of nested bundles are kept per relation name
/// in the same position as the bundle they belong to. An error set is empty if neither it nor any
/// nested set holds an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorSet {
    errors: BTreeMap<String, Vec<String>>,
    relations: BTreeMap<String, Vec<ErrorSet>>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error set holding a single field error.
    pub fn from_field(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::builder().add_error(key, message).build()
    }

    pub fn builder() -> ErrorSetBuilder {
        ErrorSetBuilder::default()
    }

    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// Error messages reported for one field.
    pub fn errors_for(&self, key: &str) -> &[String] {
        self.errors.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn relations(&self) -> &BTreeMap<String, Vec<ErrorSet>> {
        &self.relations
    }

    pub fn relations_named(&self, name: &str) -> &[ErrorSet] {
        self.relations.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.errors.values().all(Vec::is_empty)
            && self.relations.values().flatten().all(ErrorSet::is_empty)
    }

    pub fn with_data_value(&self, key: impl Into<String>, message: impl Into<String>) -> ErrorSet {
        let mut errors = self.clone();
        errors
            .errors
            .entry(key.into())
            .or_default()
            .push(message.into());
        errors
    }

    pub fn with_relation(&self, name: impl Into<String>, other: ErrorSet) -> ErrorSet {
        let mut errors = self.clone();
        errors
            .relations
            .entry(name.into())
            .or_default()
            .push(other);
        errors
    }

    /// Generic data representation.
    ///
    /// Nested error sets without errors are kept as `null` so every entry lines up with the
    /// related bundle at the same position.
    pub fn to_data(&self) -> Value {
        let errors = self
            .errors
            .iter()
            .filter(|(_, messages)| !messages.is_empty())
            .map(|(key, messages)| {
                let messages = messages.iter().cloned().map(Value::String).collect();
                (key.clone(), Value::Array(messages))
            })
            .collect::<Map<String, Value>>();

        let relations = self
            .relations
            .iter()
            .filter(|(_, sets)| sets.iter().any(|set| !set.is_empty()))
            .map(|(name, sets)| {
                let items = sets
                    .iter()
                    .map(|set| {
                        if set.is_empty() {
                            Value::Null
                        } else {
                            set.to_data()
                        }
                    })
                    .collect();
                (name.clone(), Value::Array(items))
            })
            .collect::<Map<String, Value>>();

        let mut object = Map::new();
        object.insert(ERROR_KEY.to_owned(), Value::Object(errors));
        object.insert(REL_KEY.to_owned(), Value::Object(relations));
        Value::Object(object)
    }

    pub fn to_json(&self) -> String {
        self.to_data().to_string()
    }
}

impl fmt::Display for ErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_data())
    }
}

impl Serialize for ErrorSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_data().serialize(serializer)
    }
}

/// Accumulates errors while walking a bundle tree.
#[derive(Clone, Debug, Default)]
pub struct ErrorSetBuilder {
    errors: BTreeMap<String, Vec<String>>,
    relations: BTreeMap<String, Vec<ErrorSet>>,
}

impl ErrorSetBuilder {
    pub fn add_error(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.push_error(key, message);
        self
    }

    pub fn push_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(key.into())
            .or_default()
            .push(message.into());
    }

    /// Adds all messages of a field error map, as returned by id collision handlers.
    pub fn push_errors(&mut self, errors: BTreeMap<String, Vec<String>>) {
        for (key, messages) in errors {
            self.errors.entry(key).or_default().extend(messages);
        }
    }

    pub fn add_relation(mut self, name: impl Into<String>, errors: ErrorSet) -> Self {
        self.push_relation(name, errors);
        self
    }

    pub fn push_relation(&mut self, name: impl Into<String>, errors: ErrorSet) {
        self.relations.entry(name.into()).or_default().push(errors);
    }

    pub fn build(self) -> ErrorSet {
        ErrorSet {
            errors: self.errors,
            relations: self.relations,
        }
    }
}
