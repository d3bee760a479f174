// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading and writing trees of entity data.
//!
//! A [`Bundle`] is validated by the [`BundleValidator`], written by the [`BundleDao`] and read back
//! by the [`Serializer`].
mod bundle;
mod dao;
mod error_set;
mod mutation;
mod serializer;
mod validator;
mod xml;

pub use bundle::{
    Bundle, BundleBuilder, DATA_KEY, Data, ID_KEY, Iter, MANAGED_PREFIX, META_KEY, REL_KEY,
    Relations, TYPE_KEY,
};
pub use dao::BundleDao;
pub use error_set::{ERROR_KEY, ErrorSet, ErrorSetBuilder};
pub use mutation::{Mutation, MutationState};
pub use serializer::{Serializer, SerializerBuilder};
pub use validator::BundleValidator;
