// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access control for the EHRI graph.
//!
//! [`AclManager`] answers whether an accessor may perform an action on a single item or on all
//! items of a content type, and manages the permission grants these answers are based on.
//!
//! Grants are inherited through group membership. A grant bound to a permission scope only counts
//! when the scope is the manager's own scope, one of its ancestors, or one of the ancestors of the
//! item being checked. Owner grants are never bound to a scope. Members of the admin group pass
//! every check without holding any grants.
//!
//! Visibility is handled separately from permissions: an item restricted to a list of accessors
//! can only be seen by them and the members of their groups, see [`AclFilter`].
mod error;
mod manager;
mod permission_set;

pub use error::AclError;
pub use manager::{AclFilter, AclManager, PermissionGrantTarget};
pub use permission_set::{
    GlobalPermissionSet, GlobalPermissionSetBuilder, InheritedGlobalPermissionSet,
    InheritedItemPermissionSet, InheritedPermissionSet, InheritedPermissionSetBuilder,
    ItemPermissionSet,
};
