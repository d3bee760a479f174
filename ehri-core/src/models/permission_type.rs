// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Permission verbs which can be granted to accessors.
///
/// Each permission carries a bit mask, a permission "contains" another one if all bits of the
/// other are set. `Owner` implies create, update, delete and annotate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    Create,
    Update,
    Delete,
    Annotate,
    Owner,
    Grant,
    Promote,
}

impl PermissionType {
    pub const ALL: [PermissionType; 7] = [
        PermissionType::Create,
        PermissionType::Update,
        PermissionType::Delete,
        PermissionType::Annotate,
        PermissionType::Owner,
        PermissionType::Grant,
        PermissionType::Promote,
    ];

    pub fn mask(&self) -> u32 {
        match self {
            PermissionType::Create => 1,
            PermissionType::Update => 2,
            PermissionType::Delete => 4,
            PermissionType::Annotate => 8,
            PermissionType::Owner => 1 | 2 | 4 | 8,
            PermissionType::Grant => 16,
            PermissionType::Promote => 32,
        }
    }

    /// Returns `true` if holding this permission implies holding `other`.
    pub fn contains(&self, other: PermissionType) -> bool {
        self.mask() & other.mask() == other.mask()
    }

    /// Name of the permission, also the id of its backing vertex.
    pub fn name(&self) -> &'static str {
        match self {
            PermissionType::Create => "create",
            PermissionType::Update => "update",
            PermissionType::Delete => "delete",
            PermissionType::Annotate => "annotate",
            PermissionType::Owner => "owner",
            PermissionType::Grant => "grant",
            PermissionType::Promote => "promote",
        }
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PermissionType {
    type Err = UnknownPermissionType;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        PermissionType::ALL
            .iter()
            .find(|permission| permission.name() == name)
            .copied()
            .ok_or_else(|| UnknownPermissionType(name.to_owned()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission type '{0}'")]
pub struct UnknownPermissionType(pub String);

#[cfg(test)]
mod tests {
    use super::PermissionType::*;

    #[test]
    fn owner_contains_crud() {
        for permission in [Create, Update, Delete, Annotate, Owner] {
            assert!(Owner.contains(permission), "{permission}");
        }
        assert!(!Owner.contains(Grant));
        assert!(!Owner.contains(Promote));
        assert!(!Update.contains(Owner));
        assert!(Grant.contains(Grant));
        assert!(!Create.contains(Update));
    }

    #[test]
    fn parse_names() {
        assert_eq!("annotate".parse(), Ok(Annotate));
        assert!("Annotate".parse::<super::PermissionType>().is_err());
    }
}
