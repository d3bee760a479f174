// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::EntityClass;

/// Categories of first-class items over which permissions can be granted in bulk.
///
/// Every value is backed by a `ContentType` vertex whose id equals the name of the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContentTypes {
    DocumentaryUnit,
    Repository,
    HistoricalAgent,
    Group,
    UserProfile,
    Annotation,
    SystemEvent,
    AuthoritativeSet,
    CvocVocabulary,
    CvocConcept,
    Link,
    Country,
    VirtualUnit,
}

impl ContentTypes {
    pub const ALL: [ContentTypes; 13] = [
        ContentTypes::DocumentaryUnit,
        ContentTypes::Repository,
        ContentTypes::HistoricalAgent,
        ContentTypes::Group,
        ContentTypes::UserProfile,
        ContentTypes::Annotation,
        ContentTypes::SystemEvent,
        ContentTypes::AuthoritativeSet,
        ContentTypes::CvocVocabulary,
        ContentTypes::CvocConcept,
        ContentTypes::Link,
        ContentTypes::Country,
        ContentTypes::VirtualUnit,
    ];

    /// The entity class of items belonging to this content type.
    pub fn entity_class(&self) -> EntityClass {
        match self {
            ContentTypes::DocumentaryUnit => EntityClass::DocumentaryUnit,
            ContentTypes::Repository => EntityClass::Repository,
            ContentTypes::HistoricalAgent => EntityClass::HistoricalAgent,
            ContentTypes::Group => EntityClass::Group,
            ContentTypes::UserProfile => EntityClass::UserProfile,
            ContentTypes::Annotation => EntityClass::Annotation,
            ContentTypes::SystemEvent => EntityClass::SystemEvent,
            ContentTypes::AuthoritativeSet => EntityClass::AuthoritativeSet,
            ContentTypes::CvocVocabulary => EntityClass::CvocVocabulary,
            ContentTypes::CvocConcept => EntityClass::CvocConcept,
            ContentTypes::Link => EntityClass::Link,
            ContentTypes::Country => EntityClass::Country,
            ContentTypes::VirtualUnit => EntityClass::VirtualUnit,
        }
    }

    /// Content type of items of the given class, if there is one.
    pub fn for_class(class: EntityClass) -> Option<ContentTypes> {
        ContentTypes::ALL
            .iter()
            .find(|content_type| content_type.entity_class() == class)
            .copied()
    }

    pub fn name(&self) -> &'static str {
        self.entity_class().name()
    }
}

impl fmt::Display for ContentTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContentTypes {
    type Err = UnknownContentType;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ContentTypes::ALL
            .iter()
            .find(|content_type| content_type.name() == name)
            .copied()
            .ok_or_else(|| UnknownContentType(name.to_owned()))
    }
}

impl TryFrom<String> for ContentTypes {
    type Error = UnknownContentType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContentTypes> for String {
    fn from(value: ContentTypes) -> Self {
        value.name().to_owned()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("no content type found for type '{0}'")]
pub struct UnknownContentType(pub String);

#[cfg(test)]
mod tests {
    use crate::models::EntityClass;

    use super::ContentTypes;

    #[test]
    fn content_types_map_to_classes() {
        assert_eq!(
            ContentTypes::for_class(EntityClass::CvocConcept),
            Some(ContentTypes::CvocConcept)
        );
        assert_eq!(ContentTypes::for_class(EntityClass::DatePeriod), None);
        assert_eq!("VirtualUnit".parse(), Ok(ContentTypes::VirtualUnit));
        assert_eq!(
            serde_json::to_string(&ContentTypes::HistoricalAgent).unwrap(),
            "\"HistoricalAgent\""
        );
    }
}
