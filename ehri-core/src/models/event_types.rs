// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kinds of events recorded in the event log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventTypes {
    Creation,
    CreateDependent,
    Modification,
    ModifyDependent,
    Deletion,
    DeleteDependent,
    Link,
    Annotation,
    SetGlobalPermissions,
    SetItemPermissions,
    SetVisibility,
    AddGroup,
    RemoveGroup,
    Ingest,
    Promotion,
    Demotion,
    Watch,
    Unwatch,
    Follow,
    Unfollow,
    Block,
    Unblock,
}

impl EventTypes {
    pub const ALL: [EventTypes; 22] = [
        EventTypes::Creation,
        EventTypes::CreateDependent,
        EventTypes::Modification,
        EventTypes::ModifyDependent,
        EventTypes::Deletion,
        EventTypes::DeleteDependent,
        EventTypes::Link,
        EventTypes::Annotation,
        EventTypes::SetGlobalPermissions,
        EventTypes::SetItemPermissions,
        EventTypes::SetVisibility,
        EventTypes::AddGroup,
        EventTypes::RemoveGroup,
        EventTypes::Ingest,
        EventTypes::Promotion,
        EventTypes::Demotion,
        EventTypes::Watch,
        EventTypes::Unwatch,
        EventTypes::Follow,
        EventTypes::Unfollow,
        EventTypes::Block,
        EventTypes::Unblock,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventTypes::Creation => "creation",
            EventTypes::CreateDependent => "createDependent",
            EventTypes::Modification => "modification",
            EventTypes::ModifyDependent => "modifyDependent",
            EventTypes::Deletion => "deletion",
            EventTypes::DeleteDependent => "deleteDependent",
            EventTypes::Link => "link",
            EventTypes::Annotation => "annotation",
            EventTypes::SetGlobalPermissions => "setGlobalPermissions",
            EventTypes::SetItemPermissions => "setItemPermissions",
            EventTypes::SetVisibility => "setVisibility",
            EventTypes::AddGroup => "addGroup",
            EventTypes::RemoveGroup => "removeGroup",
            EventTypes::Ingest => "ingest",
            EventTypes::Promotion => "promotion",
            EventTypes::Demotion => "demotion",
            EventTypes::Watch => "watch",
            EventTypes::Unwatch => "unwatch",
            EventTypes::Follow => "follow",
            EventTypes::Unfollow => "unfollow",
            EventTypes::Block => "block",
            EventTypes::Unblock => "unblock",
        }
    }
}

impl fmt::Display for EventTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventTypes {
    type Err = UnknownEventType;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        EventTypes::ALL
            .iter()
            .find(|event_type| event_type.name() == name)
            .copied()
            .ok_or_else(|| UnknownEventType(name.to_owned()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown event type '{0}'")]
pub struct UnknownEventType(pub String);
