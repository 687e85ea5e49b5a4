// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leaf types shared by the wikirights engine: typed references into the
//! wiki entity hierarchy and the vocabulary of rights which can be granted
//! or denied on them.

mod access;
mod entity;
mod right;

pub use access::{AccessLevel, RightState};
pub use entity::{
    DocumentReference, EntityReference, EntityType, InvalidReferenceError, USER_SPACE,
    resolve_document, resolve_user,
};
pub use right::Right;
