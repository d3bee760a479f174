// SPDX-License-Identifier: MIT OR Apache-2.0

use ehri_core::PersistenceError;
use ehri_core::check::check_graph;
use ehri_core::models::{EntityClass, PermissionScope, set_permission_scope};
use ehri_core::persistence::{Bundle, BundleDao, MutationState, Serializer};
use ehri_core::test_utils::{
    documentary_unit, random_identifier, repository, repository_scope, setup_logging,
};
use ehri_core::Config;
use ehri_graph::{GraphStore, MemoryGraph};
use rstest::rstest;

#[rstest]
fn create_serialize_round_trip(
    repository: MemoryGraph,
    repository_scope: Vec<String>,
    documentary_unit: Bundle,
) {
    setup_logging();
    let dao = BundleDao::new(repository.clone()).with_scope_ids(repository_scope);
    let vertex = dao.create(&documentary_unit).unwrap();
    assert_eq!(vertex.id, "nl-r1-c1");

    let serializer = Serializer::builder(&repository).dependent_only().build();
    let bundle = serializer.entity_to_bundle(&vertex.id).unwrap();
    assert_eq!(bundle, documentary_unit);
    assert_eq!(bundle.id(), Some("nl-r1-c1"));

    let ids: Vec<&str> = bundle.iter().filter_map(Bundle::id).collect();
    assert!(ids.contains(&"nl-r1-c1.eng"));
    assert!(ids.contains(&"nl-r1-c1.fra"));

    // Bundles survive their wire format.
    let json = bundle.to_json().unwrap();
    assert_eq!(Bundle::from_json(&json).unwrap(), bundle);
}

#[rstest]
fn update_is_idempotent(
    repository: MemoryGraph,
    repository_scope: Vec<String>,
    documentary_unit: Bundle,
) {
    let dao = BundleDao::new(repository.clone()).with_scope_ids(repository_scope);
    let vertex = dao.create(&documentary_unit).unwrap();
    let vertices = repository.vertex_count();

    let stored = Serializer::builder(&repository)
        .dependent_only()
        .build()
        .entity_to_bundle(&vertex.id)
        .unwrap();
    let changed = stored.with_data_value("extent", "2 boxes");

    let first = dao.update(&changed).unwrap();
    assert_eq!(first.state(), MutationState::Updated);
    let second = dao.update(&changed).unwrap();
    assert_eq!(second.state(), MutationState::Unchanged);
    assert_eq!(repository.vertex_count(), vertices);
}

#[rstest]
fn delete_cascades_to_dependents(
    repository: MemoryGraph,
    repository_scope: Vec<String>,
    documentary_unit: Bundle,
) {
    let dao = BundleDao::new(repository.clone()).with_scope_ids(repository_scope);
    let before = repository.vertex_count();
    let vertex = dao.create(&documentary_unit).unwrap();
    assert_eq!(repository.vertex_count(), before + 4);

    let stored = Serializer::builder(&repository)
        .dependent_only()
        .build()
        .entity_to_bundle(&vertex.id)
        .unwrap();
    assert_eq!(dao.delete(&stored).unwrap(), 4);
    assert_eq!(repository.vertex_count(), before);
}

#[rstest]
fn failed_validation_writes_nothing(repository: MemoryGraph, repository_scope: Vec<String>) {
    let dao = BundleDao::new(repository.clone()).with_scope_ids(repository_scope);
    let before = repository.vertex_count();

    let description = Bundle::builder(EntityClass::DocumentaryUnitDescription)
        .data_value("languageCode", "eng")
        .build();
    let bundle = Bundle::builder(EntityClass::DocumentaryUnit)
        .data_value("identifier", random_identifier())
        .relation("describes", description)
        .build();

    let err = dao.create(&bundle).unwrap_err();
    let PersistenceError::Validation(err) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(err.errors.relations_named("describes")[0].errors_for("name").len(), 1);
    assert_eq!(repository.vertex_count(), before);
}

#[rstest]
fn created_items_pass_graph_checks(
    repository: MemoryGraph,
    repository_scope: Vec<String>,
    documentary_unit: Bundle,
) {
    let dao = BundleDao::new(repository.clone()).with_scope_ids(repository_scope);
    let vertex = dao.create(&documentary_unit).unwrap();
    set_permission_scope(&repository, &vertex.id, &PermissionScope::item("nl-r1")).unwrap();

    let issues = check_graph(&repository, &Config::default()).unwrap();
    assert!(issues.is_empty(), "{issues:?}");

    let mutation = dao.create_or_update(&documentary_unit.with_id(vertex.id)).unwrap();
    assert_eq!(mutation.state(), MutationState::Unchanged);
}
