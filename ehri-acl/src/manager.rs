// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use ehri_core::{ItemNotFound, PermissionDenied};
use ehri_core::models::accessible;
use ehri_core::models::ontology::{
    IS_ACCESSIBLE_TO, PERMISSION_GRANT_HAS_PERMISSION, PERMISSION_GRANT_HAS_SCOPE,
    PERMISSION_GRANT_HAS_SUBJECT, PERMISSION_GRANT_HAS_TARGET,
};
use ehri_core::models::{
    Accessor, ContentTypes, EntityClass, PermissionScope, PermissionType, UnknownContentType,
};
use ehri_graph::{Direction, GraphStore, Properties, Vertex};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::AclError;
use crate::permission_set::{
    GlobalPermissionSet, InheritedGlobalPermissionSet, InheritedItemPermissionSet,
    ItemPermissionSet,
};

/// What a permission grant applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PermissionGrantTarget {
    /// Every item of a content type.
    ContentType(ContentTypes),

    /// A single item.
    Item(String),
}

impl PermissionGrantTarget {
    pub fn item(id: impl Into<String>) -> Self {
        PermissionGrantTarget::Item(id.into())
    }
}

impl From<ContentTypes> for PermissionGrantTarget {
    fn from(content_type: ContentTypes) -> Self {
        PermissionGrantTarget::ContentType(content_type)
    }
}

/// Read-through caches between permission and content type values and their vertices.
///
/// The vertices are seeded on initialization and never change, so entries are never evicted.
#[derive(Debug, Default)]
struct Lookups {
    permission_nodes: RwLock<HashMap<PermissionType, String>>,
    permission_types: RwLock<HashMap<String, PermissionType>>,
    content_type_nodes: RwLock<HashMap<ContentTypes, String>>,
    content_types: RwLock<HashMap<String, ContentTypes>>,
}

fn cached<K, V, F>(cache: &RwLock<HashMap<K, V>>, key: K, load: F) -> Result<V, AclError>
where
    K: Eq + Hash,
    V: Clone,
    F: FnOnce(&K) -> Result<V, AclError>,
{
    if let Some(value) = cache.read().expect("lookup lock poisoned").get(&key) {
        return Ok(value.clone());
    }
    let value = load(&key)?;
    cache
        .write()
        .expect("lookup lock poisoned")
        .insert(key, value.clone());
    Ok(value)
}

/// Permission checks and grant management within one permission scope.
///
/// The scope and its ancestors are resolved once on construction. Use [`AclManager::with_scope`]
/// to get a manager for another scope.
#[derive(Clone, Debug)]
pub struct AclManager<S> {
    store: S,
    scope: PermissionScope,
    scopes: Arc<HashSet<PermissionScope>>,
    lookups: Arc<Lookups>,
}

impl<S> AclManager<S>
where
    S: GraphStore,
{
    /// Manager for the system scope.
    pub fn new(store: S) -> Self {
        Self {
            store,
            scope: PermissionScope::System,
            scopes: Arc::new(HashSet::new()),
            lookups: Arc::new(Lookups::default()),
        }
    }

    /// Manager for the given scope, sharing this manager's store.
    pub fn with_scope(&self, scope: PermissionScope) -> Result<Self, AclError>
    where
        S: Clone,
    {
        let mut scopes: HashSet<PermissionScope> =
            scope.permission_scopes(&self.store)?.into_iter().collect();
        if !scope.is_system() {
            scopes.insert(scope.clone());
        }
        Ok(Self {
            store: self.store.clone(),
            scope,
            scopes: Arc::new(scopes),
            lookups: self.lookups.clone(),
        })
    }

    pub fn scope(&self) -> &PermissionScope {
        &self.scope
    }

    /// The manager's scope together with all its ancestors.
    pub fn scopes(&self) -> &HashSet<PermissionScope> {
        &self.scopes
    }

    pub fn belongs_to_admin(&self, accessor: &Accessor) -> Result<bool, AclError> {
        Ok(accessor.belongs_to_admin(&self.store)?)
    }

    pub fn is_anonymous(&self, accessor: &Accessor) -> bool {
        accessor.is_anonymous()
    }

    /// Returns `true` if the accessor can see the item.
    pub fn can_access(&self, item: &str, accessor: &Accessor) -> Result<bool, AclError> {
        self.acl_filter(accessor)?.allows(item)
    }

    /// Visibility filter for the accessor, reusable over many items.
    pub fn acl_filter(&self, accessor: &Accessor) -> Result<AclFilter<'_, S>, AclError> {
        if self.belongs_to_admin(accessor)? {
            return Ok(AclFilter {
                store: &self.store,
                accessors: None,
            });
        }
        let mut accessors = HashSet::new();
        if !accessor.is_anonymous() {
            accessors.insert(accessor.id().to_owned());
            accessors.extend(
                accessor
                    .all_parents(&self.store)?
                    .into_iter()
                    .map(|parent| parent.id().to_owned()),
            );
        }
        Ok(AclFilter {
            store: &self.store,
            accessors: Some(accessors),
        })
    }

    /// Predicate passing vertices which are content type items.
    pub fn content_type_filter() -> impl Fn(&Vertex) -> bool {
        |vertex: &Vertex| {
            ContentTypes::ALL
                .iter()
                .any(|content_type| content_type.name() == vertex.label)
        }
    }

    /// Restricts visibility of the item to exactly the given accessors.
    pub fn set_accessors(&self, item: &str, accessors: &[Accessor]) -> Result<(), AclError> {
        for current in accessible::accessors(&self.store, item)? {
            if !accessors.contains(&current) {
                accessible::remove_accessor(&self.store, item, &current)?;
            }
        }
        for accessor in accessors {
            accessible::add_accessor(&self.store, item, accessor)?;
        }
        Ok(())
    }

    pub fn remove_access_control(&self, item: &str, accessor: &Accessor) -> Result<(), AclError> {
        Ok(accessible::remove_accessor(&self.store, item, accessor)?)
    }

    /// Returns `true` if the accessor holds the permission on all items of the content type
    /// within this manager's scopes.
    pub fn has_content_type_permission(
        &self,
        content_type: ContentTypes,
        permission: PermissionType,
        accessor: &Accessor,
    ) -> Result<bool, AclError> {
        self.has_content_type_permission_in(content_type, permission, accessor, &self.scopes)
    }

    /// Returns `true` if the accessor holds the permission on the item.
    ///
    /// Besides this manager's scopes, grants bound to any ancestor scope of the item count.
    /// Permissions on the item's content type apply before grants on the item itself are
    /// considered.
    pub fn has_permission(
        &self,
        item: &str,
        permission: PermissionType,
        accessor: &Accessor,
    ) -> Result<bool, AclError> {
        let vertex = self
            .store
            .get_vertex(item)?
            .ok_or_else(|| ItemNotFound(item.to_owned()))?;
        let content_type = content_type_of(&vertex)?;

        let mut scopes = self.scopes.as_ref().clone();
        scopes.extend(PermissionScope::item(item).permission_scopes(&self.store)?);

        if self.has_content_type_permission_in(content_type, permission, accessor, &scopes)? {
            return Ok(true);
        }
        self.has_scoped_permission(item, permission, accessor, &scopes)
    }

    /// Grants a permission on the target to the accessor, returning the grant vertex.
    ///
    /// An existing equivalent grant in this manager's scope is returned unchanged. New grants
    /// are bound to the manager's scope unless it is the system scope or the permission is
    /// [`PermissionType::Owner`].
    ///
    /// Fails for the anonymous accessor and for admins, including members of the admin group.
    pub fn grant_permission(
        &self,
        target: &PermissionGrantTarget,
        permission: PermissionType,
        accessor: &Accessor,
    ) -> Result<Vertex, AclError> {
        self.check_grantable(accessor)?;
        if !self.store.exists(accessor.id())? {
            return Err(ItemNotFound(accessor.id().to_owned()).into());
        }
        let target_id = self.target_id(target)?;
        if let Some(grant) = self.find_permission(&target_id, permission, accessor)? {
            return Ok(grant);
        }

        let grant = self.store.create_vertex(
            &Uuid::new_v4().to_string(),
            EntityClass::PermissionGrant.name(),
            Properties::new(),
        )?;
        let permission_node = self.permission_node(permission)?;
        self.store
            .add_edge(&grant.id, PERMISSION_GRANT_HAS_SUBJECT, accessor.id())?;
        self.store
            .add_edge(&grant.id, PERMISSION_GRANT_HAS_PERMISSION, &permission_node)?;
        self.store
            .add_edge(&grant.id, PERMISSION_GRANT_HAS_TARGET, &target_id)?;
        if permission != PermissionType::Owner {
            if let Some(scope) = self.scope.id() {
                self.store
                    .add_edge(&grant.id, PERMISSION_GRANT_HAS_SCOPE, scope)?;
            }
        }
        debug!(
            grant = %grant.id,
            accessor = accessor.id(),
            %permission,
            grant_target = %target_id,
            "granted permission"
        );
        Ok(grant)
    }

    /// Deletes the accessor's grant of the permission on the target in this scope, if any.
    pub fn revoke_permission(
        &self,
        target: &PermissionGrantTarget,
        permission: PermissionType,
        accessor: &Accessor,
    ) -> Result<(), AclError> {
        self.check_grantable(accessor)?;
        let target_id = self.target_id(target)?;
        if let Some(grant) = self.find_permission(&target_id, permission, accessor)? {
            self.store.delete_vertex(&grant.id)?;
            debug!(
                grant = %grant.id,
                accessor = accessor.id(),
                %permission,
                grant_target = %target_id,
                "revoked permission"
            );
        }
        Ok(())
    }

    pub fn revoke_permission_grant(&self, grant: &str) -> Result<(), AclError> {
        let vertex = self
            .store
            .get_vertex(grant)?
            .ok_or_else(|| ItemNotFound(grant.to_owned()))?;
        if vertex.label != EntityClass::PermissionGrant.name() {
            return Err(AclError::UnexpectedType {
                id: vertex.id,
                label: vertex.label,
            });
        }
        self.store.delete_vertex(grant)?;
        debug!(grant, "revoked permission grant");
        Ok(())
    }

    /// Replaces the accessor's permissions on the item with exactly the given set.
    pub fn set_item_permissions(
        &self,
        item: &str,
        accessor: &Accessor,
        permissions: &ItemPermissionSet,
    ) -> Result<(), AclError> {
        self.check_not_system_account(accessor)?;
        let target = PermissionGrantTarget::item(item);
        for permission in PermissionType::ALL {
            if permissions.has(permission) {
                self.grant_permission(&target, permission, accessor)?;
            } else {
                self.revoke_permission(&target, permission, accessor)?;
            }
        }
        Ok(())
    }

    /// Replaces the accessor's permissions on all content types with exactly the given matrix.
    pub fn set_permission_matrix(
        &self,
        accessor: &Accessor,
        permissions: &GlobalPermissionSet,
    ) -> Result<(), AclError> {
        self.check_not_system_account(accessor)?;
        for content_type in ContentTypes::ALL {
            let target = PermissionGrantTarget::ContentType(content_type);
            for permission in PermissionType::ALL {
                if permissions.has(content_type, permission) {
                    self.grant_permission(&target, permission, accessor)?;
                } else {
                    self.revoke_permission(&target, permission, accessor)?;
                }
            }
        }
        Ok(())
    }

    /// Content type permissions granted directly to the accessor within this manager's scopes.
    ///
    /// Members of the admin group hold every permission.
    pub fn global_permissions(&self, accessor: &Accessor) -> Result<GlobalPermissionSet, AclError> {
        if self.belongs_to_admin(accessor)? {
            return Ok(GlobalPermissionSet::all());
        }
        let mut builder = GlobalPermissionSet::builder();
        for grant in accessor.permission_grants(&self.store)? {
            let in_scope = match self.grant_scope(&grant.id)? {
                None => true,
                Some(scope) => self.scopes.contains(&scope),
            };
            if !in_scope {
                continue;
            }
            let Some(permission) = self.grant_permission_type(&grant.id)? else {
                continue;
            };
            for target in self.grant_targets(&grant.id)? {
                if target.label == EntityClass::ContentType.name() {
                    builder = builder.set(self.content_type_enum(&target.id)?, [permission]);
                }
            }
        }
        Ok(builder.build())
    }

    /// Permissions granted directly to the accessor on the item.
    ///
    /// Besides grants targeting the item this includes grants on the item's content type bound to
    /// one of the item's ancestor scopes.
    pub fn item_permissions(
        &self,
        item: &str,
        accessor: &Accessor,
    ) -> Result<ItemPermissionSet, AclError> {
        if self.belongs_to_admin(accessor)? {
            return Ok(ItemPermissionSet::all());
        }
        let vertex = self
            .store
            .get_vertex(item)?
            .ok_or_else(|| ItemNotFound(item.to_owned()))?;
        let content_type = content_type_of(&vertex).ok();
        let scopes: HashSet<PermissionScope> = PermissionScope::item(item)
            .permission_scopes(&self.store)?
            .into_iter()
            .collect();

        let mut permissions = ItemPermissionSet::new();
        for grant in accessor.permission_grants(&self.store)? {
            let Some(permission) = self.grant_permission_type(&grant.id)? else {
                continue;
            };
            let targets = self.grant_targets(&grant.id)?;
            if targets.iter().any(|target| target.id == item) {
                permissions = permissions.with_permission(permission);
                continue;
            }
            let Some(scope) = self.grant_scope(&grant.id)? else {
                continue;
            };
            let content_type_targets = !targets.is_empty()
                && targets
                    .iter()
                    .all(|target| target.label == EntityClass::ContentType.name());
            let matches_type = content_type.is_some_and(|content_type| {
                targets.iter().any(|target| target.id == content_type.name())
            });
            if content_type_targets && matches_type && scopes.contains(&scope) {
                permissions = permissions.with_permission(permission);
            }
        }
        Ok(permissions)
    }

    /// Global permissions of the accessor and, separately, of every group it belongs to.
    pub fn inherited_global_permissions(
        &self,
        accessor: &Accessor,
    ) -> Result<InheritedGlobalPermissionSet, AclError> {
        let mut builder = InheritedGlobalPermissionSet::builder(
            accessor.id(),
            self.global_permissions(accessor)?,
        );
        for parent in accessor.all_parents(&self.store)? {
            builder = builder.with_inherited(parent.id(), self.global_permissions(&parent)?);
        }
        Ok(builder.build())
    }

    /// Item permissions of the accessor and, separately, of every group it belongs to.
    pub fn inherited_item_permissions(
        &self,
        item: &str,
        accessor: &Accessor,
    ) -> Result<InheritedItemPermissionSet, AclError> {
        let mut builder = InheritedItemPermissionSet::builder(
            accessor.id(),
            self.item_permissions(item, accessor)?,
        );
        for parent in accessor.all_parents(&self.store)? {
            builder = builder.with_inherited(parent.id(), self.item_permissions(item, &parent)?);
        }
        Ok(builder.build())
    }

    fn check_grantable(&self, accessor: &Accessor) -> Result<(), AclError> {
        if accessor.is_anonymous() || self.belongs_to_admin(accessor)? {
            return Err(AclError::SystemAccount(accessor.id().to_owned()));
        }
        Ok(())
    }

    fn check_not_system_account(&self, accessor: &Accessor) -> Result<(), AclError> {
        if accessor.is_anonymous() || self.belongs_to_admin(accessor)? {
            return Err(PermissionDenied::new(
                accessor.id(),
                "grant or revoke permissions of system accounts",
            )
            .into());
        }
        Ok(())
    }

    fn has_content_type_permission_in(
        &self,
        content_type: ContentTypes,
        permission: PermissionType,
        accessor: &Accessor,
        scopes: &HashSet<PermissionScope>,
    ) -> Result<bool, AclError> {
        if self.belongs_to_admin(accessor)? {
            return Ok(true);
        }
        let target = self.content_type_node(content_type)?;
        self.has_scoped_permission(&target, permission, accessor, scopes)
    }

    /// Searches the grants of the accessor and then of its groups for one on the target which
    /// implies the permission and is unscoped or bound to one of the scopes.
    fn has_scoped_permission(
        &self,
        target: &str,
        permission: PermissionType,
        accessor: &Accessor,
        scopes: &HashSet<PermissionScope>,
    ) -> Result<bool, AclError> {
        let mut visited = HashSet::new();
        let mut stack = vec![accessor.clone()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.id().to_owned()) {
                continue;
            }
            for grant in current.permission_grants(&self.store)? {
                let implied = self
                    .grant_permission_type(&grant.id)?
                    .is_some_and(|granted| granted.contains(permission));
                if !implied
                    || !self
                        .store
                        .has_edge(&grant.id, PERMISSION_GRANT_HAS_TARGET, target)?
                {
                    continue;
                }
                let in_scope = match self.grant_scope(&grant.id)? {
                    None => true,
                    Some(scope) => scopes.contains(&scope),
                };
                if in_scope {
                    trace!(
                        accessor = current.id(),
                        grant = %grant.id,
                        %permission,
                        grant_target = target,
                        "found grant"
                    );
                    return Ok(true);
                }
            }
            let mut parents = current.parents(&self.store)?;
            parents.reverse();
            stack.extend(parents);
        }
        Ok(false)
    }

    fn find_permission(
        &self,
        target: &str,
        permission: PermissionType,
        accessor: &Accessor,
    ) -> Result<Option<Vertex>, AclError> {
        let permission_node = self.permission_node(permission)?;
        for grant in accessor.permission_grants(&self.store)? {
            if self.is_in_scope(&grant.id, permission)?
                && self
                    .store
                    .has_edge(&grant.id, PERMISSION_GRANT_HAS_TARGET, target)?
                && self
                    .store
                    .has_edge(&grant.id, PERMISSION_GRANT_HAS_PERMISSION, &permission_node)?
            {
                return Ok(Some(grant));
            }
        }
        Ok(None)
    }

    /// Returns `true` if the grant belongs to this manager's scope.
    ///
    /// In the system scope only unscoped grants do. Owner grants are always unscoped.
    fn is_in_scope(&self, grant: &str, permission: PermissionType) -> Result<bool, AclError> {
        let grant_scope = self.grant_scope(grant)?;
        if permission == PermissionType::Owner {
            return Ok(grant_scope.is_none());
        }
        Ok(match grant_scope {
            None => self.scope.is_system(),
            Some(scope) => self.scopes.contains(&scope),
        })
    }

    fn grant_permission_type(&self, grant: &str) -> Result<Option<PermissionType>, AclError> {
        match first(&self.store, grant, PERMISSION_GRANT_HAS_PERMISSION)? {
            Some(node) => Ok(Some(self.permission_enum(&node.id)?)),
            None => Ok(None),
        }
    }

    fn grant_scope(&self, grant: &str) -> Result<Option<PermissionScope>, AclError> {
        Ok(first(&self.store, grant, PERMISSION_GRANT_HAS_SCOPE)?
            .map(|scope| PermissionScope::Item(scope.id)))
    }

    fn grant_targets(&self, grant: &str) -> Result<Vec<Vertex>, AclError> {
        Ok(self
            .store
            .vertices(grant, Direction::Out, PERMISSION_GRANT_HAS_TARGET)?)
    }

    fn target_id(&self, target: &PermissionGrantTarget) -> Result<String, AclError> {
        match target {
            PermissionGrantTarget::ContentType(content_type) => {
                self.content_type_node(*content_type)
            }
            PermissionGrantTarget::Item(id) => {
                if !self.store.exists(id)? {
                    return Err(ItemNotFound(id.clone()).into());
                }
                Ok(id.clone())
            }
        }
    }

    fn permission_node(&self, permission: PermissionType) -> Result<String, AclError> {
        cached(&self.lookups.permission_nodes, permission, |permission| {
            self.node(permission.name(), EntityClass::Permission)
        })
    }

    fn permission_enum(&self, node: &str) -> Result<PermissionType, AclError> {
        cached(&self.lookups.permission_types, node.to_owned(), |node| {
            Ok(node.parse::<PermissionType>()?)
        })
    }

    fn content_type_node(&self, content_type: ContentTypes) -> Result<String, AclError> {
        cached(&self.lookups.content_type_nodes, content_type, |content_type| {
            self.node(content_type.name(), EntityClass::ContentType)
        })
    }

    fn content_type_enum(&self, node: &str) -> Result<ContentTypes, AclError> {
        cached(&self.lookups.content_types, node.to_owned(), |node| {
            Ok(node.parse::<ContentTypes>()?)
        })
    }

    fn node(&self, id: &str, class: EntityClass) -> Result<String, AclError> {
        let vertex = self
            .store
            .get_vertex(id)?
            .ok_or_else(|| ItemNotFound(id.to_owned()))?;
        if vertex.label != class.name() {
            return Err(AclError::UnexpectedType {
                id: vertex.id,
                label: vertex.label,
            });
        }
        Ok(vertex.id)
    }
}

/// Decides which items an accessor can see.
#[derive(Debug)]
pub struct AclFilter<'a, S> {
    store: &'a S,

    /// The accessor and all its groups, `None` for members of the admin group.
    accessors: Option<HashSet<String>>,
}

impl<S> AclFilter<'_, S>
where
    S: GraphStore,
{
    /// Returns `true` if the item is unrestricted, promoted or visible to the accessor or one of
    /// its groups.
    pub fn allows(&self, item: &str) -> Result<bool, AclError> {
        let Some(accessors) = &self.accessors else {
            return Ok(true);
        };
        let visible_to = self
            .store
            .vertices(item, Direction::Out, IS_ACCESSIBLE_TO)?;
        if visible_to.is_empty() || accessible::is_promoted(self.store, item)? {
            return Ok(true);
        }
        Ok(visible_to
            .iter()
            .any(|accessor| accessors.contains(&accessor.id)))
    }

    /// Keeps the vertices the accessor can see.
    pub fn filter(&self, vertices: Vec<Vertex>) -> Result<Vec<Vertex>, AclError> {
        let mut visible = Vec::with_capacity(vertices.len());
        for vertex in vertices {
            if self.allows(&vertex.id)? {
                visible.push(vertex);
            }
        }
        Ok(visible)
    }
}

fn content_type_of(vertex: &Vertex) -> Result<ContentTypes, AclError> {
    vertex
        .label
        .parse::<EntityClass>()
        .ok()
        .and_then(ContentTypes::for_class)
        .ok_or_else(|| UnknownContentType(vertex.label.clone()).into())
}

fn first<S: GraphStore>(store: &S, id: &str, label: &str) -> Result<Option<Vertex>, AclError> {
    Ok(store.vertices(id, Direction::Out, label)?.into_iter().next())
}
