// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use ehri_core::models::{ContentTypes, PermissionType};
#[cfg(feature = "serde")]
use serde::Serialize;

/// Permissions an accessor holds on content types.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(transparent))]
pub struct GlobalPermissionSet {
    permissions: BTreeMap<ContentTypes, BTreeSet<PermissionType>>,
}

impl GlobalPermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> GlobalPermissionSetBuilder {
        GlobalPermissionSetBuilder::default()
    }

    /// Every permission on every content type.
    pub fn all() -> Self {
        ContentTypes::ALL
            .iter()
            .fold(Self::builder(), |builder, content_type| {
                builder.set(*content_type, PermissionType::ALL)
            })
            .build()
    }

    pub fn has(&self, content_type: ContentTypes, permission: PermissionType) -> bool {
        self.permissions
            .get(&content_type)
            .is_some_and(|permissions| permissions.contains(&permission))
    }

    pub fn for_content_type(
        &self,
        content_type: ContentTypes,
    ) -> impl Iterator<Item = PermissionType> + '_ {
        self.permissions
            .get(&content_type)
            .into_iter()
            .flat_map(|permissions| permissions.iter().copied())
    }

    pub fn with_permission(&self, content_type: ContentTypes, permission: PermissionType) -> Self {
        let mut permissions = self.permissions.clone();
        permissions.entry(content_type).or_default().insert(permission);
        Self { permissions }
    }

    pub fn as_map(&self) -> &BTreeMap<ContentTypes, BTreeSet<PermissionType>> {
        &self.permissions
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.values().all(BTreeSet::is_empty)
    }
}

impl FromIterator<(ContentTypes, PermissionType)> for GlobalPermissionSet {
    fn from_iter<T: IntoIterator<Item = (ContentTypes, PermissionType)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::builder(), |builder, (content_type, permission)| {
                builder.set(content_type, [permission])
            })
            .build()
    }
}

#[derive(Clone, Debug, Default)]
pub struct GlobalPermissionSetBuilder {
    permissions: BTreeMap<ContentTypes, BTreeSet<PermissionType>>,
}

impl GlobalPermissionSetBuilder {
    /// Adds permissions on a content type to the ones already set.
    pub fn set<I>(mut self, content_type: ContentTypes, permissions: I) -> Self
    where
        I: IntoIterator<Item = PermissionType>,
    {
        self.permissions
            .entry(content_type)
            .or_default()
            .extend(permissions);
        self
    }

    pub fn build(self) -> GlobalPermissionSet {
        GlobalPermissionSet {
            permissions: self.permissions,
        }
    }
}

/// Permissions an accessor holds on a single item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(transparent))]
pub struct ItemPermissionSet {
    permissions: BTreeSet<PermissionType>,
}

impl ItemPermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        PermissionType::ALL.into_iter().collect()
    }

    pub fn has(&self, permission: PermissionType) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn with_permission(&self, permission: PermissionType) -> Self {
        let mut permissions = self.permissions.clone();
        permissions.insert(permission);
        Self { permissions }
    }

    pub fn iter(&self) -> impl Iterator<Item = PermissionType> + '_ {
        self.permissions.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl FromIterator<PermissionType> for ItemPermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionType>>(iter: T) -> Self {
        Self {
            permissions: iter.into_iter().collect(),
        }
    }
}

/// Permissions of an accessor next to the permissions of each group it belongs to.
///
/// The groups' permissions are kept apart so they can be shown separately. Checks against this
/// set consider all of them.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct InheritedPermissionSet<P> {
    accessor: String,
    permissions: P,
    inherited: Vec<(String, P)>,
}

pub type InheritedGlobalPermissionSet = InheritedPermissionSet<GlobalPermissionSet>;

pub type InheritedItemPermissionSet = InheritedPermissionSet<ItemPermissionSet>;

impl<P> InheritedPermissionSet<P> {
    pub fn builder(
        accessor: impl Into<String>,
        permissions: P,
    ) -> InheritedPermissionSetBuilder<P> {
        InheritedPermissionSetBuilder {
            set: InheritedPermissionSet {
                accessor: accessor.into(),
                permissions,
                inherited: Vec::new(),
            },
        }
    }

    pub fn accessor(&self) -> &str {
        &self.accessor
    }

    /// Permissions held by the accessor itself.
    pub fn permissions(&self) -> &P {
        &self.permissions
    }

    /// Permissions of each group, keyed by group id.
    pub fn inherited(&self) -> &[(String, P)] {
        &self.inherited
    }

    fn all_sets(&self) -> impl Iterator<Item = &P> {
        std::iter::once(&self.permissions).chain(self.inherited.iter().map(|(_, set)| set))
    }
}

impl InheritedGlobalPermissionSet {
    pub fn has(&self, content_type: ContentTypes, permission: PermissionType) -> bool {
        self.all_sets().any(|set| set.has(content_type, permission))
    }
}

impl InheritedItemPermissionSet {
    pub fn has(&self, permission: PermissionType) -> bool {
        self.all_sets().any(|set| set.has(permission))
    }
}

#[derive(Clone, Debug)]
pub struct InheritedPermissionSetBuilder<P> {
    set: InheritedPermissionSet<P>,
}

impl<P> InheritedPermissionSetBuilder<P> {
    pub fn with_inherited(mut self, accessor: impl Into<String>, permissions: P) -> Self {
        self.set.inherited.push((accessor.into(), permissions));
        self
    }

    pub fn build(self) -> InheritedPermissionSet<P> {
        self.set
    }
}
