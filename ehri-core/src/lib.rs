// SPDX-License-Identifier: MIT OR Apache-2.0

//! Archival content model and persistence layer of the EHRI graph.
//!
//! Items are stored as vertices of a [`GraphStore`](ehri_graph::GraphStore) and exchanged as
//! [`Bundle`](persistence::Bundle)s: immutable trees holding an item's data together with its
//! dependent items, for example a documentary unit with its descriptions and their date periods.
//!
//! - [`persistence::BundleDao`] validates bundles and writes, updates or deletes whole trees.
//! - [`persistence::Serializer`] reads vertices back into bundles, following the relations each
//!   [`EntityClass`](models::EntityClass) declares up to a configurable depth.
//! - [`actions::ActionManager`] records who changed which items in linked-list event streams and
//!   keeps prior versions of changed items.
//!
//! A graph has to be seeded with [`init::GraphInitializer`] before it is used. Permissions are
//! evaluated by the `ehri-acl` crate on top of the models defined here.
pub mod actions;
pub mod check;
pub mod config;
pub mod error;
pub mod idgen;
pub mod init;
pub mod models;
pub mod persistence;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use actions::{ActionManager, EventContext};
pub use config::Config;
pub use error::{
    DeserializationError, ItemNotFound, PermissionDenied, PersistenceError, SerializationError,
    ValidationError,
};
pub use init::GraphInitializer;
