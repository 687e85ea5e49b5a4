// SPDX-License-Identifier: MIT OR Apache-2.0

use wikirights_core::DocumentReference;

/// Group membership as recorded in the wiki. Only direct membership is
/// exposed; the loader computes the transitive closure itself.
pub trait GroupService {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Groups the given user or group is a direct member of.
    fn groups_of(&self, member: &DocumentReference)
    -> Result<Vec<DocumentReference>, Self::Error>;

    /// One page of a group's direct members.
    fn members_of(
        &self,
        group: &DocumentReference,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DocumentReference>, Self::Error>;
}
