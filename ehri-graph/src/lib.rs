// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property-graph store for the EHRI archival content model.
//!
//! The core crates only ever talk to the graph through the [`GraphStore`] trait: vertices carry a
//! unique string id, a type label and a flat map of JSON property values, edges are labelled and
//! directed. Transactions are owned by the caller and modelled with the [`Transaction`] trait.
//!
//! [`MemoryGraph`] is an in-memory implementation backed by a `petgraph` stable graph.
mod error;
mod memory;
mod traits;

pub use error::GraphError;
pub use memory::{MemoryGraph, MemoryPermit};
pub use traits::{
    Direction, Edge, EdgeId, GraphStore, Properties, Transaction, Vertex, with_transaction,
};
