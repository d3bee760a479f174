// SPDX-License-Identifier: MIT OR Apache-2.0

use ehri_acl::{AclManager, PermissionGrantTarget};
use ehri_core::ActionManager;
use ehri_core::models::{Accessor, ContentTypes, EventTypes, PermissionScope, PermissionType};
use ehri_core::persistence::{Bundle, BundleDao};
use ehri_core::test_utils::{
    create_group, create_user, documentary_unit, repository, repository_scope,
};
use ehri_graph::MemoryGraph;
use rstest::rstest;

#[rstest]
fn country_archivists_create_units(
    repository: MemoryGraph,
    repository_scope: Vec<String>,
    documentary_unit: Bundle,
) {
    let user = Accessor::new(create_user(&repository, "mike").id);
    let archivists = Accessor::new(create_group(&repository, "nl-archivists").id);
    user.add_to_group(&repository, &archivists).unwrap();

    let country_acl = AclManager::new(repository.clone())
        .with_scope(PermissionScope::item("nl"))
        .unwrap();
    country_acl
        .grant_permission(
            &PermissionGrantTarget::ContentType(ContentTypes::DocumentaryUnit),
            PermissionType::Create,
            &archivists,
        )
        .unwrap();

    // The grant applies within the repository, which lies inside the country.
    let acl = AclManager::new(repository.clone())
        .with_scope(PermissionScope::item("nl-r1"))
        .unwrap();
    let create_units = (ContentTypes::DocumentaryUnit, PermissionType::Create);
    assert!(acl.has_content_type_permission(create_units.0, create_units.1, &user).unwrap());
    assert!(
        !AclManager::new(repository.clone())
            .has_content_type_permission(create_units.0, create_units.1, &user)
            .unwrap()
    );

    let unit = BundleDao::new(repository.clone())
        .with_scope_ids(repository_scope)
        .create(&documentary_unit)
        .unwrap();
    acl.grant_permission(
        &PermissionGrantTarget::item(unit.id.clone()),
        PermissionType::Owner,
        &user,
    )
    .unwrap();
    let event = ActionManager::new(repository.clone())
        .with_scope(PermissionScope::item("nl-r1"))
        .new_event_context(user.id(), EventTypes::Creation, None)
        .add_subject(unit.id.clone())
        .commit()
        .unwrap();

    assert!(acl.has_permission(&unit.id, PermissionType::Delete, &user).unwrap());
    let inherited = acl.inherited_item_permissions(&unit.id, &user).unwrap();
    assert!(inherited.permissions().has(PermissionType::Owner));
    assert!(acl.can_access(&event.id, &Accessor::anonymous()).unwrap());
}
