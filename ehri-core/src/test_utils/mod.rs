// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures and helpers for tests of crates building on `ehri-core`.
mod fixtures;

pub use fixtures::*;

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}
