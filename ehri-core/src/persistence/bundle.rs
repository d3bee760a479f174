// SPDX-License-Identifier: MIT OR Apache-2.0

//! Immutable tree of entity data used as the unit of persistence and serialization.
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::error::{DeserializationError, SerializationError};
use crate::models::EntityClass;
use crate::persistence::xml;

/// Flat property map of a bundle.
pub type Data = BTreeMap<String, Value>;

/// Child bundles keyed by relation name.
pub type Relations = BTreeMap<String, Vec<Bundle>>;

pub const ID_KEY: &str = "id";
pub const TYPE_KEY: &str = "type";
pub const DATA_KEY: &str = "data";
pub const META_KEY: &str = "meta";
pub const REL_KEY: &str = "relationships";

/// Data keys starting with this prefix are managed by the system and ignored when comparing
/// bundles.
pub const MANAGED_PREFIX: &str = "_";

/// An entity together with its nested related entities.
///
/// Bundles are persistent values: every `with_*` or `remove_*` method returns a new bundle
/// sharing unchanged parts with the original. Null data values are always dropped.
///
/// Two bundles are equal if they have the same entity class, the same data ignoring managed keys
/// and the same relations regardless of their order. Ids and metadata are not compared.
#[derive(Clone, Debug)]
pub struct Bundle {
    id: Option<String>,
    class: EntityClass,
    data: Arc<Data>,
    meta: Arc<Data>,
    relations: Arc<Relations>,
    temp: bool,
}

/// Staged construction of a [`Bundle`].
#[derive(Clone, Debug)]
pub struct BundleBuilder {
    id: Option<String>,
    class: EntityClass,
    data: Data,
    meta: Data,
    relations: Relations,
}

impl BundleBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn data(mut self, data: Data) -> Self {
        self.data.extend(data);
        self
    }

    pub fn data_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn meta(mut self, meta: Data) -> Self {
        self.meta.extend(meta);
        self
    }

    pub fn meta_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn relation(mut self, name: impl Into<String>, bundle: Bundle) -> Self {
        self.relations.entry(name.into()).or_default().push(bundle);
        self
    }

    pub fn relations(mut self, relations: Relations) -> Self {
        for (name, bundles) in relations {
            self.relations.entry(name).or_default().extend(bundles);
        }
        self
    }

    pub fn build(self) -> Bundle {
        Bundle {
            id: self.id,
            class: self.class,
            data: Arc::new(filter_data(self.data)),
            meta: Arc::new(self.meta),
            relations: Arc::new(self.relations),
            temp: false,
        }
    }
}

impl From<&Bundle> for BundleBuilder {
    fn from(bundle: &Bundle) -> Self {
        BundleBuilder {
            id: bundle.id.clone(),
            class: bundle.class,
            data: bundle.data.as_ref().clone(),
            meta: bundle.meta.as_ref().clone(),
            relations: bundle.relations.as_ref().clone(),
        }
    }
}

impl Bundle {
    /// Empty bundle of the given class.
    pub fn new(class: EntityClass) -> Self {
        Self::builder(class).build()
    }

    pub fn builder(class: EntityClass) -> BundleBuilder {
        BundleBuilder {
            id: None,
            class,
            data: Data::new(),
            meta: Data::new(),
            relations: Relations::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn with_id(&self, id: impl Into<String>) -> Bundle {
        Bundle {
            id: Some(id.into()),
            ..self.clone()
        }
    }

    pub fn class(&self) -> EntityClass {
        self.class
    }

    /// Returns `true` if the id of this bundle was generated rather than supplied.
    pub fn has_generated_id(&self) -> bool {
        self.temp
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns a data value if it is set and holds a string.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Sets a data value, a null value removes the key.
    pub fn with_data_value(&self, key: impl Into<String>, value: impl Into<Value>) -> Bundle {
        let mut data = self.data.as_ref().clone();
        data.insert(key.into(), value.into());
        Bundle {
            data: Arc::new(filter_data(data)),
            ..self.clone()
        }
    }

    pub fn remove_data_value(&self, key: &str) -> Bundle {
        let mut data = self.data.as_ref().clone();
        data.remove(key);
        Bundle {
            data: Arc::new(data),
            ..self.clone()
        }
    }

    /// Replaces the complete data map.
    pub fn with_data(&self, data: Data) -> Bundle {
        Bundle {
            data: Arc::new(filter_data(data)),
            ..self.clone()
        }
    }

    pub fn meta(&self) -> &Data {
        &self.meta
    }

    pub fn has_meta(&self) -> bool {
        !self.meta.is_empty()
    }

    pub fn with_meta_value(&self, key: impl Into<String>, value: impl Into<Value>) -> Bundle {
        let mut meta = self.meta.as_ref().clone();
        meta.insert(key.into(), value.into());
        Bundle {
            meta: Arc::new(meta),
            ..self.clone()
        }
    }

    pub fn with_meta(&self, meta: Data) -> Bundle {
        Bundle {
            meta: Arc::new(meta),
            ..self.clone()
        }
    }

    pub fn relations(&self) -> &Relations {
        &self.relations
    }

    /// Bundles related under the given name, in insertion order.
    pub fn relations_named(&self, name: &str) -> &[Bundle] {
        self.relations.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_relations(&self, name: &str) -> bool {
        !self.relations_named(name).is_empty()
    }

    /// Replaces the complete set of relations.
    pub fn replace_relations(&self, relations: Relations) -> Bundle {
        Bundle {
            relations: Arc::new(relations),
            ..self.clone()
        }
    }

    /// Adds all given relations to the existing ones.
    pub fn with_relations(&self, others: Relations) -> Bundle {
        let mut relations = self.relations.as_ref().clone();
        for (name, bundles) in others {
            relations.entry(name).or_default().extend(bundles);
        }
        self.replace_relations(relations)
    }

    /// Replaces the bundles related under one name.
    pub fn with_relations_named(&self, name: impl Into<String>, others: Vec<Bundle>) -> Bundle {
        let mut relations = self.relations.as_ref().clone();
        relations.insert(name.into(), others);
        self.replace_relations(relations)
    }

    pub fn with_relation(&self, name: impl Into<String>, other: Bundle) -> Bundle {
        let mut relations = self.relations.as_ref().clone();
        relations.entry(name.into()).or_default().push(other);
        self.replace_relations(relations)
    }

    /// Removes the first related bundle equal to `item` from the named relation.
    pub fn remove_relation(&self, name: &str, item: &Bundle) -> Bundle {
        let mut relations = self.relations.as_ref().clone();
        if let Some(bundles) = relations.get_mut(name) {
            if let Some(position) = bundles.iter().position(|bundle| bundle == item) {
                bundles.remove(position);
            }
            if bundles.is_empty() {
                relations.remove(name);
            }
        }
        self.replace_relations(relations)
    }

    /// Relations declared as dependent by this bundle's entity class.
    pub fn dependent_relations(&self) -> Relations {
        self.relations
            .iter()
            .filter(|(name, _)| self.class.dependent_relation(name).is_some())
            .map(|(name, bundles)| (name.clone(), bundles.clone()))
            .collect()
    }

    /// Copy of this tree containing only dependent relations, recursively.
    pub fn dependents_only(&self) -> Bundle {
        let relations = self
            .dependent_relations()
            .into_iter()
            .map(|(name, bundles)| {
                let bundles = bundles.iter().map(Bundle::dependents_only).collect();
                (name, bundles)
            })
            .collect();
        self.replace_relations(relations)
    }

    /// Merges data from a partial bundle into this one.
    ///
    /// Non-null values in `other` overwrite existing values and null values unset existing keys.
    /// Nested bundles are merged with the existing related bundle of the same id, nested bundles
    /// without a counterpart are ignored.
    pub fn merge_data_with(&self, other: &Bundle) -> Bundle {
        let mut data = self.data.as_ref().clone();
        for (key, value) in other.data.iter() {
            if value.is_null() {
                trace!(key, "unset key in merge");
                data.remove(key);
            } else {
                data.insert(key.clone(), value.clone());
            }
        }

        let mut relations = Relations::new();
        for (name, bundles) in self.relations.iter() {
            let Some(patches) = other.relations.get(name) else {
                relations.insert(name.clone(), bundles.clone());
                continue;
            };

            let mut merged = Vec::with_capacity(bundles.len());
            let mut updated = vec![false; bundles.len()];
            for patch in patches {
                let existing = bundles
                    .iter()
                    .position(|bundle| bundle.id.is_some() && bundle.id == patch.id);
                match existing {
                    Some(index) => {
                        updated[index] = true;
                        merged.push(bundles[index].merge_data_with(patch));
                    }
                    None => warn!(id = ?patch.id, "ignoring nested bundle in patch update"),
                }
            }
            for (index, bundle) in bundles.iter().enumerate() {
                if !updated[index] {
                    merged.push(bundle.clone());
                }
            }
            relations.insert(name.clone(), merged);
        }

        Bundle {
            data: Arc::new(data),
            relations: Arc::new(relations),
            ..self.clone()
        }
    }

    /// Removes every related bundle for which `filter` returns `true`, recursively.
    pub fn filter_relations<F>(&self, filter: F) -> Bundle
    where
        F: Fn(&str, &Bundle) -> bool,
    {
        self.filter_relations_inner(&filter)
    }

    fn filter_relations_inner(&self, filter: &dyn Fn(&str, &Bundle) -> bool) -> Bundle {
        let relations = self
            .relations
            .iter()
            .map(|(name, bundles)| {
                let kept = bundles
                    .iter()
                    .filter(|bundle| !filter(name, bundle))
                    .map(|bundle| bundle.filter_relations_inner(filter))
                    .collect::<Vec<Bundle>>();
                (name.clone(), kept)
            })
            .filter(|(_, bundles)| !bundles.is_empty())
            .collect();
        self.replace_relations(relations)
    }

    /// Number of relation levels beneath this bundle.
    pub fn depth(&self) -> usize {
        self.relations
            .values()
            .flatten()
            .map(|bundle| bundle.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Iterates over this bundle and all nested bundles in depth-first pre-order.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    /// Assigns ids to every bundle in the tree which does not have one yet.
    ///
    /// Ids are derived with the id generator of each bundle's class, using the given scope path
    /// extended by the id base of every ancestor. Bundles receiving a generated id are marked as
    /// such.
    pub fn generate_ids(&self, scopes: &[String]) -> Bundle {
        let generator = self.class.id_generator();
        let id = match &self.id {
            Some(id) => id.clone(),
            None => generator.generate_id(scopes, self),
        };

        let mut next_scopes = scopes.to_vec();
        next_scopes.push(generator.id_base(self));

        let relations = self
            .relations
            .iter()
            .map(|(name, bundles)| {
                let bundles = bundles
                    .iter()
                    .map(|bundle| bundle.generate_ids(&next_scopes))
                    .collect();
                (name.clone(), bundles)
            })
            .collect();

        Bundle {
            id: Some(id),
            class: self.class,
            data: self.data.clone(),
            meta: self.meta.clone(),
            relations: Arc::new(relations),
            temp: self.temp || self.id.is_none(),
        }
    }

    pub fn unique_property_keys(&self) -> &'static [&'static str] {
        self.class.unique_keys()
    }

    /// Keys the bundle's class declares: mandatory, unique and enumerated, without duplicates.
    pub fn property_keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = Vec::new();
        let declared = self
            .class
            .mandatory_keys()
            .iter()
            .chain(self.class.unique_keys())
            .copied()
            .chain(self.class.enum_properties().iter().map(|property| property.key));
        for key in declared {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Converts the bundle into its generic data representation.
    pub fn to_data(&self) -> Value {
        let mut object = Map::new();
        object.insert(
            ID_KEY.to_owned(),
            self.id.clone().map(Value::String).unwrap_or(Value::Null),
        );
        object.insert(TYPE_KEY.to_owned(), Value::String(self.class.name().to_owned()));
        object.insert(
            DATA_KEY.to_owned(),
            Value::Object(self.data.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        );
        if self.has_meta() {
            object.insert(
                META_KEY.to_owned(),
                Value::Object(self.meta.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            );
        }

        // Relation names are already sorted.
        let relations = self
            .relations
            .iter()
            .filter(|(_, bundles)| !bundles.is_empty())
            .map(|(name, bundles)| {
                let items = bundles.iter().map(Bundle::to_data).collect();
                (name.clone(), Value::Array(items))
            })
            .collect();
        object.insert(REL_KEY.to_owned(), Value::Object(relations));
        Value::Object(object)
    }

    /// Builds a bundle from its generic data representation.
    ///
    /// Null data values and empty sequences are dropped.
    pub fn from_data(value: &Value) -> Result<Bundle, DeserializationError> {
        let object = value.as_object().ok_or(DeserializationError::NotAMap)?;

        let id = match object.get(ID_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(other) => return Err(DeserializationError::InvalidId(other.to_string())),
        };

        let class = object
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .and_then(|name| name.parse::<EntityClass>().ok())
            .ok_or_else(|| {
                DeserializationError::UnknownType(
                    object
                        .get(TYPE_KEY)
                        .map(Value::to_string)
                        .unwrap_or_else(|| "null".to_owned()),
                )
            })?;

        let data = match object.get(DATA_KEY) {
            None | Some(Value::Null) => Data::new(),
            Some(Value::Object(data)) => data
                .iter()
                .filter(|(_, value)| !is_empty_sequence(value))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            Some(other) => return Err(DeserializationError::InvalidData(other.to_string())),
        };

        let meta = match object.get(META_KEY) {
            Some(Value::Object(meta)) => meta
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            _ => Data::new(),
        };

        let mut relations = Relations::new();
        match object.get(REL_KEY) {
            None | Some(Value::Null) => (),
            Some(Value::Object(items)) => {
                for (name, value) in items {
                    if let Value::Array(items) = value {
                        let bundles = items
                            .iter()
                            .map(Bundle::from_data)
                            .collect::<Result<Vec<Bundle>, DeserializationError>>()?;
                        relations.entry(name.clone()).or_default().extend(bundles);
                    }
                }
            }
            Some(_) => return Err(DeserializationError::InvalidRelations),
        }

        let mut builder = Bundle::builder(class).data(data).meta(meta).relations(relations);
        if let Some(id) = id {
            builder = builder.id(id);
        }
        Ok(builder.build())
    }

    pub fn from_json(json: &str) -> Result<Bundle, DeserializationError> {
        let value: Value = serde_json::from_str(json)?;
        Bundle::from_data(&value)
    }

    /// Encodes the bundle as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(&self.to_data())?)
    }

    /// Encodes the bundle as an XML document.
    pub fn to_xml_string(&self) -> String {
        xml::bundle_to_xml(self)
    }
}

impl PartialEq for Bundle {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class
            && unmanaged_data(&self.data) == unmanaged_data(&other.data)
            && unordered_relations_eq(&self.relations, &other.relations)
    }
}

impl Serialize for Bundle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_data().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Bundle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Bundle::from_data(&value).map_err(D::Error::custom)
    }
}

/// Depth-first iterator over a bundle tree.
#[derive(Debug)]
pub struct Iter<'a> {
    stack: Vec<&'a Bundle>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Bundle;

    fn next(&mut self) -> Option<Self::Item> {
        let bundle = self.stack.pop()?;
        let children: Vec<&Bundle> = bundle.relations.values().flatten().collect();
        self.stack.extend(children.into_iter().rev());
        Some(bundle)
    }
}

impl<'a> IntoIterator for &'a Bundle {
    type Item = &'a Bundle;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn filter_data(data: Data) -> Data {
    data.into_iter().filter(|(_, value)| !value.is_null()).collect()
}

fn is_empty_sequence(value: &Value) -> bool {
    matches!(value, Value::Array(items) if items.is_empty())
}

fn unmanaged_data(data: &Data) -> BTreeMap<&str, &Value> {
    data.iter()
        .filter(|(key, value)| !key.starts_with(MANAGED_PREFIX) && !value.is_null())
        .map(|(key, value)| (key.as_str(), value))
        .collect()
}

fn unordered_relations_eq(a: &Relations, b: &Relations) -> bool {
    let non_empty = |relations: &Relations| -> Vec<String> {
        relations
            .iter()
            .filter(|(_, bundles)| !bundles.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    };
    if non_empty(a) != non_empty(b) {
        return false;
    }
    a.iter().all(|(name, bundles)| {
        let others = b.get(name).map(Vec::as_slice).unwrap_or(&[]);
        multiset_eq(bundles, others)
    })
}

fn multiset_eq(a: &[Bundle], b: &[Bundle]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut matched = vec![false; b.len()];
    a.iter().all(|bundle| {
        let found = b
            .iter()
            .enumerate()
            .position(|(index, other)| !matched[index] && other == bundle);
        match found {
            Some(index) => {
                matched[index] = true;
                true
            }
            None => false,
        }
    })
}
