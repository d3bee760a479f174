// SPDX-License-Identifier: MIT OR Apache-2.0

use ehri_graph::{MemoryGraph, Vertex};
use rand::Rng;
use rand::distr::Alphanumeric;
use rstest::fixture;

use crate::init::GraphInitializer;
use crate::models::{EntityClass, PermissionScope, set_permission_scope};
use crate::persistence::{Bundle, BundleDao};

/// Scope path of the repository created by the [`repository`] fixture.
pub const REPOSITORY_SCOPE: [&str; 2] = ["nl", "r1"];

/// Empty, initialized in-memory graph.
#[fixture]
pub fn graph() -> MemoryGraph {
    let store = MemoryGraph::new();
    GraphInitializer::new(store.clone())
        .initialize()
        .expect("initialize graph");
    store
}

/// Initialized graph holding the country "nl" and the repository "nl-r1" in its scope.
#[fixture]
pub fn repository(graph: MemoryGraph) -> MemoryGraph {
    let dao = BundleDao::new(graph.clone());
    dao.create(
        &Bundle::builder(EntityClass::Country)
            .data_value("identifier", "nl")
            .build(),
    )
    .expect("create country");

    let dao = dao.with_scope_ids(vec!["nl".to_owned()]);
    let repository = Bundle::builder(EntityClass::Repository)
        .data_value("identifier", "r1")
        .relation(
            "describes",
            Bundle::builder(EntityClass::RepositoryDescription)
                .data_value("languageCode", "eng")
                .data_value("name", "Repository One")
                .build(),
        )
        .build();
    let vertex = dao.create(&repository).expect("create repository");
    set_permission_scope(&graph, &vertex.id, &PermissionScope::item("nl")).expect("set scope");
    graph
}

/// Scope ids of items created in the repository.
#[fixture]
pub fn repository_scope() -> Vec<String> {
    REPOSITORY_SCOPE.iter().map(|id| (*id).to_owned()).collect()
}

/// Documentary unit "c1" with an English and a French description.
#[fixture]
pub fn documentary_unit() -> Bundle {
    let date = Bundle::builder(EntityClass::DatePeriod)
        .data_value("startDate", "1940-01-01")
        .data_value("type", "creation")
        .build();
    Bundle::builder(EntityClass::DocumentaryUnit)
        .data_value("identifier", "c1")
        .relation(
            "describes",
            Bundle::builder(EntityClass::DocumentaryUnitDescription)
                .data_value("languageCode", "eng")
                .data_value("name", "Letters")
                .relation("hasDate", date)
                .build(),
        )
        .relation(
            "describes",
            Bundle::builder(EntityClass::DocumentaryUnitDescription)
                .data_value("languageCode", "fra")
                .data_value("name", "Lettres")
                .build(),
        )
        .build()
}

/// Random lowercase identifier, stable under id slugification.
pub fn random_identifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect()
}

pub fn create_user(store: &MemoryGraph, identifier: &str) -> Vertex {
    create_accessor(store, EntityClass::UserProfile, identifier)
}

pub fn create_group(store: &MemoryGraph, identifier: &str) -> Vertex {
    create_accessor(store, EntityClass::Group, identifier)
}

fn create_accessor(store: &MemoryGraph, class: EntityClass, identifier: &str) -> Vertex {
    let bundle = Bundle::builder(class)
        .data_value("identifier", identifier)
        .data_value("name", identifier)
        .build();
    BundleDao::new(store.clone())
        .create(&bundle)
        .expect("create accessor")
}
