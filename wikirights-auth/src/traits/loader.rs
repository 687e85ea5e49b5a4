// SPDX-License-Identifier: MIT OR Apache-2.0

use wikirights_core::{AccessLevel, DocumentReference, EntityReference};

use crate::load::LoadError;

/// Cold-path resolution: derive the access level for a (user, entity)
/// pair, populating the right cache along the way.
pub trait RightLoader {
    fn load(
        &self,
        user: &DocumentReference,
        entity: &EntityReference,
    ) -> Result<AccessLevel, LoadError>;
}
