// SPDX-License-Identifier: MIT OR Apache-2.0

//! Edge labels and property keys of the content model.

// Accessors and access control.
pub const ACCESSOR_BELONGS_TO_GROUP: &str = "belongsTo";
pub const IS_ACCESSIBLE_TO: &str = "access";
pub const PROMOTED_BY: &str = "promotedBy";
pub const DEMOTED_BY: &str = "demotedBy";
pub const HAS_PERMISSION_SCOPE: &str = "hasPermissionScope";

// Permission grants.
pub const PERMISSION_GRANT_HAS_SUBJECT: &str = "hasAccessor";
pub const PERMISSION_GRANT_HAS_PERMISSION: &str = "hasPermission";
pub const PERMISSION_GRANT_HAS_TARGET: &str = "hasTarget";
pub const PERMISSION_GRANT_HAS_SCOPE: &str = "hasScope";
pub const PERMISSION_GRANT_HAS_GRANTEE: &str = "hasGrantee";

// Events and versions.
pub const ACTIONER_HAS_LIFECYCLE_ACTION: &str = "lifecycleAction";
pub const ENTITY_HAS_LIFECYCLE_EVENT: &str = "lifecycleEvent";
pub const ACTION_HAS_EVENT: &str = "actionHasEvent";
pub const ENTITY_HAS_EVENT: &str = "hasEvent";
pub const EVENT_HAS_SCOPE: &str = "hasEventScope";
pub const EVENT_HAS_ACTIONER: &str = "hasActioner";
pub const EVENT_HAS_FIRST_SUBJECT: &str = "hasFirstSubject";
pub const ENTITY_HAS_PRIOR_VERSION: &str = "hasPriorVersion";
pub const VERSION_HAS_EVENT: &str = "triggeredByEvent";

/// Label of the edge from the global event root to the latest event.
pub const GLOBAL_EVENT_STREAM: &str = "lifecycleActionStream";

// Content.
pub const DESCRIPTION_FOR_ENTITY: &str = "describes";
pub const DOC_HELD_BY_REPOSITORY: &str = "heldBy";
pub const DOC_IS_CHILD_OF: &str = "childOf";
pub const REPOSITORY_HAS_COUNTRY: &str = "hasCountry";
pub const ITEM_IN_AUTHORITATIVE_SET: &str = "inAuthoritativeSet";
pub const CONCEPT_HAS_NARROWER: &str = "narrower";
pub const VC_INCLUDES_UNIT: &str = "includesUnit";
pub const VC_IS_PART_OF: &str = "isPartOf";
pub const ENTITY_HAS_DATE: &str = "hasDate";
pub const ENTITY_HAS_ADDRESS: &str = "hasAddress";
pub const HAS_ACCESS_POINT: &str = "relatesTo";
pub const HAS_MAINTENANCE_EVENT: &str = "maintenance";
pub const ANNOTATION_HAS_TARGET: &str = "hasAnnotationTarget";
pub const LINK_HAS_TARGET: &str = "hasLinkTarget";
pub const LINK_HAS_BODY: &str = "hasLinkBody";

// Property keys.
pub const IDENTIFIER_KEY: &str = "identifier";
pub const NAME_KEY: &str = "name";
pub const LANGUAGE_CODE: &str = "languageCode";
pub const ANNOTATION_BODY: &str = "body";
pub const DATE_PERIOD_START_DATE: &str = "startDate";
pub const DATE_PERIOD_TYPE: &str = "type";
pub const ACCESS_POINT_TYPE: &str = "type";
pub const MAINTENANCE_EVENT_TYPE: &str = "eventType";

pub const EVENT_TYPE: &str = "eventType";
pub const EVENT_TIMESTAMP: &str = "timestamp";
pub const EVENT_LOG_MESSAGE: &str = "logMessage";

pub const VERSION_ENTITY_ID: &str = "entityId";
pub const VERSION_ENTITY_CLASS: &str = "entityType";
pub const VERSION_ENTITY_DATA: &str = "entityData";

/// Managed property counting the subjects of an event.
pub const EVENT_SUBJECT_COUNT: &str = "_subjectCount";

/// Managed property naming the stream an event link belongs to.
pub const EVENT_LINK_TYPE: &str = "_linkType";

/// Meta key holding the number of immediate children or subjects of an item.
pub const CHILD_COUNT: &str = "childCount";
