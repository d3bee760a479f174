// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static description of every vertex type in the content model.
//!
//! Each [`EntityClass`] knows its mandatory and unique property keys, the id generator used for
//! new items and the relations which are serialized into bundles. Relations marked as
//! "dependent" form the owned subtree of an item: they are created, updated and deleted together
//! with their parent, all other relations merely reference independently owned items.
use std::fmt;
use std::str::FromStr;

use ehri_graph::Direction;
use serde::{Deserialize, Serialize};

use crate::idgen::IdGenerator;
use crate::models::ontology::*;

/// Every type of vertex known to the content model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityClass {
    DocumentaryUnit,
    DocumentaryUnitDescription,
    Repository,
    RepositoryDescription,
    HistoricalAgent,
    HistoricalAgentDescription,
    AuthoritativeSet,
    CvocVocabulary,
    CvocConcept,
    CvocConceptDescription,
    Country,
    VirtualUnit,
    DatePeriod,
    Address,
    AccessPoint,
    MaintenanceEvent,
    Group,
    UserProfile,
    Annotation,
    Link,
    SystemEvent,
    EventLink,
    Version,
    PermissionGrant,
    Permission,
    ContentType,
    System,
}

/// How a relation is resolved when an item is serialized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationSource {
    /// Direct adjacency over an edge carrying the relation name as label.
    Edge(Direction),

    /// The accessor who initiated an event, found by walking its action stream.
    EventActioner,

    /// The first subject of an event, found by walking its subject streams.
    EventFirstSubject,
}

/// Traversal options for a serialized relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fetch {
    /// Only traverse when the current level equals this value, -1 disables the check.
    pub if_level: i32,

    /// Only traverse while the current level is below this value.
    pub if_below_level: usize,

    /// Number of levels to serialize below this relation, -1 means unlimited.
    pub num_levels: i32,

    /// Skip the relation entirely in lite mode.
    pub when_not_lite: bool,

    /// Serialize related items with all their data, even if the relation is not dependent.
    pub full: bool,
}

impl Fetch {
    pub const DEFAULT: Fetch = Fetch {
        if_level: -1,
        if_below_level: usize::MAX,
        num_levels: -1,
        when_not_lite: false,
        full: false,
    };

    const fn levels(num_levels: i32) -> Fetch {
        Fetch {
            num_levels,
            ..Fetch::DEFAULT
        }
    }

    const fn top_level(num_levels: i32) -> Fetch {
        Fetch {
            if_level: 0,
            num_levels,
            ..Fetch::DEFAULT
        }
    }

    const fn below(if_below_level: usize, num_levels: i32) -> Fetch {
        Fetch {
            if_below_level,
            num_levels,
            ..Fetch::DEFAULT
        }
    }
}

impl Default for Fetch {
    fn default() -> Self {
        Fetch::DEFAULT
    }
}

/// A named relation of an entity class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelationDef {
    pub name: &'static str,
    pub source: RelationSource,
    pub dependent: bool,
    pub fetch: Option<Fetch>,
}

impl RelationDef {
    const fn dependent(name: &'static str, direction: Direction) -> Self {
        RelationDef {
            name,
            source: RelationSource::Edge(direction),
            dependent: true,
            fetch: Some(Fetch::DEFAULT),
        }
    }

    const fn fetched(name: &'static str, direction: Direction, fetch: Fetch) -> Self {
        RelationDef {
            name,
            source: RelationSource::Edge(direction),
            dependent: false,
            fetch: Some(fetch),
        }
    }

    const fn computed(name: &'static str, source: RelationSource, fetch: Fetch) -> Self {
        RelationDef {
            name,
            source,
            dependent: false,
            fetch: Some(fetch),
        }
    }

    /// Edge direction of the relation, if it is a direct adjacency.
    pub fn direction(&self) -> Option<Direction> {
        match self.source {
            RelationSource::Edge(direction) => Some(direction),
            _ => None,
        }
    }
}

/// Meta value computed at serialization time by counting edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetaCount {
    pub name: &'static str,
    pub label: &'static str,
    pub direction: Direction,
}

/// Property which only accepts a closed set of values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnumProperty {
    pub key: &'static str,
    pub values: &'static [&'static str],
}

/// Static descriptor of an entity class.
#[derive(Debug)]
pub struct EntityDescriptor {
    pub name: &'static str,
    pub id_generator: IdGenerator,
    pub mandatory_keys: &'static [&'static str],
    pub unique_keys: &'static [&'static str],
    pub enum_properties: &'static [EnumProperty],
    pub relations: &'static [RelationDef],
    pub meta_counts: &'static [MetaCount],
}

const IN: Direction = Direction::In;
const OUT: Direction = Direction::Out;

const IDENTIFIABLE: &[&str] = &[IDENTIFIER_KEY];
const DESCRIPTION: &[&str] = &[NAME_KEY, LANGUAGE_CODE];
const NAMED_IDENTIFIABLE: &[&str] = &[IDENTIFIER_KEY, NAME_KEY];

/// Relations every accessible item exposes at the top level of a serialized tree.
const ACCESSIBLE_RELATIONS: [RelationDef; 2] = [
    RelationDef::fetched(IS_ACCESSIBLE_TO, OUT, Fetch::below(1, 0)),
    RelationDef::fetched(PROMOTED_BY, OUT, Fetch::below(1, 0)),
];

const DESCRIPTION_RELATIONS: [RelationDef; 3] = [
    RelationDef::dependent(ENTITY_HAS_DATE, OUT),
    RelationDef::dependent(HAS_ACCESS_POINT, OUT),
    RelationDef::dependent(HAS_MAINTENANCE_EVENT, OUT),
];

const fn descriptor(name: &'static str, id_generator: IdGenerator) -> EntityDescriptor {
    EntityDescriptor {
        name,
        id_generator,
        mandatory_keys: &[],
        unique_keys: &[],
        enum_properties: &[],
        relations: &[],
        meta_counts: &[],
    }
}

static DOCUMENTARY_UNIT: EntityDescriptor = EntityDescriptor {
    mandatory_keys: IDENTIFIABLE,
    relations: &[
        RelationDef::dependent(DESCRIPTION_FOR_ENTITY, IN),
        RelationDef::fetched(DOC_HELD_BY_REPOSITORY, OUT, Fetch::DEFAULT),
        RelationDef::fetched(DOC_IS_CHILD_OF, OUT, Fetch::DEFAULT),
        ACCESSIBLE_RELATIONS[0],
        ACCESSIBLE_RELATIONS[1],
    ],
    meta_counts: &[MetaCount {
        name: CHILD_COUNT,
        label: DOC_IS_CHILD_OF,
        direction: IN,
    }],
    ..descriptor("DocumentaryUnit", IdGenerator::IdentifiableEntity)
};

static DOCUMENTARY_UNIT_DESCRIPTION: EntityDescriptor = EntityDescriptor {
    mandatory_keys: DESCRIPTION,
    relations: &DESCRIPTION_RELATIONS,
    ..descriptor("DocumentaryUnitDescription", IdGenerator::Description)
};

static REPOSITORY: EntityDescriptor = EntityDescriptor {
    mandatory_keys: IDENTIFIABLE,
    relations: &[
        RelationDef::dependent(DESCRIPTION_FOR_ENTITY, IN),
        RelationDef::fetched(REPOSITORY_HAS_COUNTRY, OUT, Fetch::levels(0)),
        ACCESSIBLE_RELATIONS[0],
        ACCESSIBLE_RELATIONS[1],
    ],
    meta_counts: &[MetaCount {
        name: CHILD_COUNT,
        label: DOC_HELD_BY_REPOSITORY,
        direction: IN,
    }],
    ..descriptor("Repository", IdGenerator::IdentifiableEntity)
};

static REPOSITORY_DESCRIPTION: EntityDescriptor = EntityDescriptor {
    mandatory_keys: DESCRIPTION,
    relations: &[
        RelationDef::dependent(ENTITY_HAS_ADDRESS, OUT),
        DESCRIPTION_RELATIONS[0],
        DESCRIPTION_RELATIONS[1],
        DESCRIPTION_RELATIONS[2],
    ],
    ..descriptor("RepositoryDescription", IdGenerator::Description)
};

static HISTORICAL_AGENT: EntityDescriptor = EntityDescriptor {
    mandatory_keys: IDENTIFIABLE,
    relations: &[
        RelationDef::dependent(DESCRIPTION_FOR_ENTITY, IN),
        RelationDef::fetched(ITEM_IN_AUTHORITATIVE_SET, OUT, Fetch::levels(0)),
        ACCESSIBLE_RELATIONS[0],
        ACCESSIBLE_RELATIONS[1],
    ],
    ..descriptor("HistoricalAgent", IdGenerator::IdentifiableEntity)
};

static HISTORICAL_AGENT_DESCRIPTION: EntityDescriptor = EntityDescriptor {
    mandatory_keys: DESCRIPTION,
    relations: &DESCRIPTION_RELATIONS,
    ..descriptor("HistoricalAgentDescription", IdGenerator::Description)
};

static AUTHORITATIVE_SET: EntityDescriptor = EntityDescriptor {
    mandatory_keys: IDENTIFIABLE,
    relations: &ACCESSIBLE_RELATIONS,
    meta_counts: &[MetaCount {
        name: CHILD_COUNT,
        label: ITEM_IN_AUTHORITATIVE_SET,
        direction: IN,
    }],
    ..descriptor("AuthoritativeSet", IdGenerator::IdentifiableEntity)
};

static CVOC_VOCABULARY: EntityDescriptor = EntityDescriptor {
    mandatory_keys: IDENTIFIABLE,
    relations: &ACCESSIBLE_RELATIONS,
    meta_counts: &[MetaCount {
        name: CHILD_COUNT,
        label: ITEM_IN_AUTHORITATIVE_SET,
        direction: IN,
    }],
    ..descriptor("CvocVocabulary", IdGenerator::IdentifiableEntity)
};

static CVOC_CONCEPT: EntityDescriptor = EntityDescriptor {
    mandatory_keys: IDENTIFIABLE,
    relations: &[
        RelationDef::dependent(DESCRIPTION_FOR_ENTITY, IN),
        RelationDef::fetched(ITEM_IN_AUTHORITATIVE_SET, OUT, Fetch::levels(0)),
        RelationDef::fetched(CONCEPT_HAS_NARROWER, OUT, Fetch::below(1, 0)),
        ACCESSIBLE_RELATIONS[0],
        ACCESSIBLE_RELATIONS[1],
    ],
    meta_counts: &[MetaCount {
        name: CHILD_COUNT,
        label: CONCEPT_HAS_NARROWER,
        direction: OUT,
    }],
    ..descriptor("CvocConcept", IdGenerator::IdentifiableEntity)
};

static CVOC_CONCEPT_DESCRIPTION: EntityDescriptor = EntityDescriptor {
    mandatory_keys: DESCRIPTION,
    relations: &DESCRIPTION_RELATIONS,
    ..descriptor("CvocConceptDescription", IdGenerator::Description)
};

static COUNTRY: EntityDescriptor = EntityDescriptor {
    mandatory_keys: IDENTIFIABLE,
    unique_keys: IDENTIFIABLE,
    relations: &ACCESSIBLE_RELATIONS,
    meta_counts: &[MetaCount {
        name: CHILD_COUNT,
        label: REPOSITORY_HAS_COUNTRY,
        direction: IN,
    }],
    ..descriptor("Country", IdGenerator::IdentifiableEntity)
};

static VIRTUAL_UNIT: EntityDescriptor = EntityDescriptor {
    mandatory_keys: IDENTIFIABLE,
    relations: &[
        RelationDef::dependent(DESCRIPTION_FOR_ENTITY, IN),
        RelationDef::fetched(VC_INCLUDES_UNIT, OUT, Fetch::top_level(0)),
        RelationDef::fetched(VC_IS_PART_OF, OUT, Fetch::DEFAULT),
        ACCESSIBLE_RELATIONS[0],
        ACCESSIBLE_RELATIONS[1],
    ],
    meta_counts: &[MetaCount {
        name: CHILD_COUNT,
        label: VC_IS_PART_OF,
        direction: IN,
    }],
    ..descriptor("VirtualUnit", IdGenerator::IdentifiableEntity)
};

static DATE_PERIOD: EntityDescriptor = EntityDescriptor {
    mandatory_keys: &[DATE_PERIOD_START_DATE],
    enum_properties: &[EnumProperty {
        key: DATE_PERIOD_TYPE,
        values: &["creation", "existence"],
    }],
    ..descriptor("DatePeriod", IdGenerator::Generic)
};

static ADDRESS: EntityDescriptor = descriptor("Address", IdGenerator::Generic);

static ACCESS_POINT: EntityDescriptor = EntityDescriptor {
    mandatory_keys: &[NAME_KEY, ACCESS_POINT_TYPE],
    enum_properties: &[EnumProperty {
        key: ACCESS_POINT_TYPE,
        values: &[
            "creator",
            "subject",
            "person",
            "family",
            "corporateBody",
            "place",
            "genre",
            "other",
        ],
    }],
    ..descriptor("AccessPoint", IdGenerator::Generic)
};

static MAINTENANCE_EVENT: EntityDescriptor = EntityDescriptor {
    enum_properties: &[EnumProperty {
        key: MAINTENANCE_EVENT_TYPE,
        values: &["created", "revised", "deleted", "cancelled", "derived", "updated"],
    }],
    ..descriptor("MaintenanceEvent", IdGenerator::Generic)
};

static GROUP: EntityDescriptor = EntityDescriptor {
    mandatory_keys: NAMED_IDENTIFIABLE,
    unique_keys: IDENTIFIABLE,
    relations: &[
        RelationDef::fetched(ACCESSOR_BELONGS_TO_GROUP, OUT, Fetch::levels(1)),
        ACCESSIBLE_RELATIONS[0],
    ],
    meta_counts: &[MetaCount {
        name: CHILD_COUNT,
        label: ACCESSOR_BELONGS_TO_GROUP,
        direction: IN,
    }],
    ..descriptor("Group", IdGenerator::IdentifiableEntity)
};

static USER_PROFILE: EntityDescriptor = EntityDescriptor {
    mandatory_keys: NAMED_IDENTIFIABLE,
    unique_keys: IDENTIFIABLE,
    relations: &[
        RelationDef::fetched(ACCESSOR_BELONGS_TO_GROUP, OUT, Fetch::levels(1)),
        ACCESSIBLE_RELATIONS[0],
    ],
    ..descriptor("UserProfile", IdGenerator::IdentifiableEntity)
};

static ANNOTATION: EntityDescriptor = EntityDescriptor {
    mandatory_keys: &[ANNOTATION_BODY],
    relations: &[
        RelationDef::fetched(ANNOTATION_HAS_TARGET, OUT, Fetch::below(1, 0)),
        ACCESSIBLE_RELATIONS[0],
        ACCESSIBLE_RELATIONS[1],
    ],
    ..descriptor("Annotation", IdGenerator::Generic)
};

static LINK: EntityDescriptor = EntityDescriptor {
    relations: &[
        RelationDef::fetched(LINK_HAS_TARGET, OUT, Fetch::below(1, 0)),
        RelationDef::fetched(LINK_HAS_BODY, OUT, Fetch::below(1, 0)),
        ACCESSIBLE_RELATIONS[0],
        ACCESSIBLE_RELATIONS[1],
    ],
    ..descriptor("Link", IdGenerator::Generic)
};

static SYSTEM_EVENT: EntityDescriptor = EntityDescriptor {
    mandatory_keys: &[EVENT_TIMESTAMP, EVENT_TYPE],
    relations: &[
        RelationDef::computed(
            EVENT_HAS_ACTIONER,
            RelationSource::EventActioner,
            Fetch::levels(0),
        ),
        RelationDef::computed(
            EVENT_HAS_FIRST_SUBJECT,
            RelationSource::EventFirstSubject,
            Fetch::top_level(-1),
        ),
        RelationDef::fetched(EVENT_HAS_SCOPE, OUT, Fetch::top_level(-1)),
        RelationDef::fetched(VERSION_HAS_EVENT, IN, Fetch::top_level(-1)),
    ],
    ..descriptor("SystemEvent", IdGenerator::Generic)
};

static EVENT_LINK: EntityDescriptor = descriptor("EventLink", IdGenerator::Generic);

static VERSION: EntityDescriptor = EntityDescriptor {
    mandatory_keys: &[VERSION_ENTITY_ID, VERSION_ENTITY_CLASS],
    relations: &[RelationDef::fetched(
        VERSION_HAS_EVENT,
        OUT,
        Fetch::below(1, 0),
    )],
    ..descriptor("Version", IdGenerator::Generic)
};

static PERMISSION_GRANT: EntityDescriptor = EntityDescriptor {
    relations: &[
        RelationDef::fetched(PERMISSION_GRANT_HAS_SUBJECT, OUT, Fetch::levels(0)),
        RelationDef::fetched(PERMISSION_GRANT_HAS_PERMISSION, OUT, Fetch::levels(0)),
        RelationDef::fetched(PERMISSION_GRANT_HAS_TARGET, OUT, Fetch::levels(0)),
        RelationDef::fetched(PERMISSION_GRANT_HAS_SCOPE, OUT, Fetch::levels(0)),
        RelationDef::fetched(PERMISSION_GRANT_HAS_GRANTEE, OUT, Fetch::levels(0)),
    ],
    ..descriptor("PermissionGrant", IdGenerator::Generic)
};

static PERMISSION: EntityDescriptor = descriptor("Permission", IdGenerator::Generic);

static CONTENT_TYPE: EntityDescriptor = descriptor("ContentType", IdGenerator::Generic);

static SYSTEM: EntityDescriptor = descriptor("System", IdGenerator::Generic);

impl EntityClass {
    pub const ALL: [EntityClass; 27] = [
        EntityClass::DocumentaryUnit,
        EntityClass::DocumentaryUnitDescription,
        EntityClass::Repository,
        EntityClass::RepositoryDescription,
        EntityClass::HistoricalAgent,
        EntityClass::HistoricalAgentDescription,
        EntityClass::AuthoritativeSet,
        EntityClass::CvocVocabulary,
        EntityClass::CvocConcept,
        EntityClass::CvocConceptDescription,
        EntityClass::Country,
        EntityClass::VirtualUnit,
        EntityClass::DatePeriod,
        EntityClass::Address,
        EntityClass::AccessPoint,
        EntityClass::MaintenanceEvent,
        EntityClass::Group,
        EntityClass::UserProfile,
        EntityClass::Annotation,
        EntityClass::Link,
        EntityClass::SystemEvent,
        EntityClass::EventLink,
        EntityClass::Version,
        EntityClass::PermissionGrant,
        EntityClass::Permission,
        EntityClass::ContentType,
        EntityClass::System,
    ];

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        match self {
            EntityClass::DocumentaryUnit => &DOCUMENTARY_UNIT,
            EntityClass::DocumentaryUnitDescription => &DOCUMENTARY_UNIT_DESCRIPTION,
            EntityClass::Repository => &REPOSITORY,
            EntityClass::RepositoryDescription => &REPOSITORY_DESCRIPTION,
            EntityClass::HistoricalAgent => &HISTORICAL_AGENT,
            EntityClass::HistoricalAgentDescription => &HISTORICAL_AGENT_DESCRIPTION,
            EntityClass::AuthoritativeSet => &AUTHORITATIVE_SET,
            EntityClass::CvocVocabulary => &CVOC_VOCABULARY,
            EntityClass::CvocConcept => &CVOC_CONCEPT,
            EntityClass::CvocConceptDescription => &CVOC_CONCEPT_DESCRIPTION,
            EntityClass::Country => &COUNTRY,
            EntityClass::VirtualUnit => &VIRTUAL_UNIT,
            EntityClass::DatePeriod => &DATE_PERIOD,
            EntityClass::Address => &ADDRESS,
            EntityClass::AccessPoint => &ACCESS_POINT,
            EntityClass::MaintenanceEvent => &MAINTENANCE_EVENT,
            EntityClass::Group => &GROUP,
            EntityClass::UserProfile => &USER_PROFILE,
            EntityClass::Annotation => &ANNOTATION,
            EntityClass::Link => &LINK,
            EntityClass::SystemEvent => &SYSTEM_EVENT,
            EntityClass::EventLink => &EVENT_LINK,
            EntityClass::Version => &VERSION,
            EntityClass::PermissionGrant => &PERMISSION_GRANT,
            EntityClass::Permission => &PERMISSION,
            EntityClass::ContentType => &CONTENT_TYPE,
            EntityClass::System => &SYSTEM,
        }
    }

    /// Name of the class, also used as the vertex label.
    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    pub fn id_generator(&self) -> IdGenerator {
        self.descriptor().id_generator
    }

    pub fn mandatory_keys(&self) -> &'static [&'static str] {
        self.descriptor().mandatory_keys
    }

    pub fn unique_keys(&self) -> &'static [&'static str] {
        self.descriptor().unique_keys
    }

    pub fn enum_properties(&self) -> &'static [EnumProperty] {
        self.descriptor().enum_properties
    }

    pub fn relations(&self) -> &'static [RelationDef] {
        self.descriptor().relations
    }

    pub fn relation(&self, name: &str) -> Option<&'static RelationDef> {
        self.relations().iter().find(|relation| relation.name == name)
    }

    /// Relations forming the owned subtree of items of this class.
    pub fn dependent_relations(&self) -> impl Iterator<Item = &'static RelationDef> {
        self.relations().iter().filter(|relation| relation.dependent)
    }

    /// Returns the relation with the given name if it is dependent.
    pub fn dependent_relation(&self, name: &str) -> Option<&'static RelationDef> {
        self.relation(name).filter(|relation| relation.dependent)
    }

    pub fn meta_counts(&self) -> &'static [MetaCount] {
        self.descriptor().meta_counts
    }

    /// Returns `true` for classes whose items can hold permission grants.
    pub fn is_accessor(&self) -> bool {
        matches!(self, EntityClass::Group | EntityClass::UserProfile)
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityClass {
    type Err = UnknownEntityClass;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        EntityClass::ALL
            .iter()
            .find(|class| class.name() == name)
            .copied()
            .ok_or_else(|| UnknownEntityClass(name.to_owned()))
    }
}

/// Raised when a type name does not match any entity class.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown entity class '{0}'")]
pub struct UnknownEntityClass(pub String);

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::EntityClass;

    #[test]
    fn names_round_trip() {
        for class in EntityClass::ALL {
            assert_eq!(class.name().parse::<EntityClass>(), Ok(class));
        }
        assert!("Frobnicator".parse::<EntityClass>().is_err());
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<&str> = EntityClass::ALL.iter().map(|class| class.name()).collect();
        assert_eq!(names.len(), EntityClass::ALL.len());
    }

    #[test]
    fn relation_names_are_unique_per_class() {
        for class in EntityClass::ALL {
            let names: HashSet<&str> = class.relations().iter().map(|rel| rel.name).collect();
            assert_eq!(names.len(), class.relations().len(), "{class}");
        }
    }

    #[test]
    fn dependent_relations() {
        let unit = EntityClass::DocumentaryUnit;
        assert!(unit.dependent_relation("describes").is_some());
        assert!(unit.dependent_relation("heldBy").is_none());
        assert!(unit.relation("heldBy").is_some());

        let names: Vec<&str> = EntityClass::RepositoryDescription
            .dependent_relations()
            .map(|rel| rel.name)
            .collect();
        assert_eq!(names, vec!["hasAddress", "hasDate", "relatesTo", "maintenance"]);
    }
}
