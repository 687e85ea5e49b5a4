// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push interface for keeping the right cache consistent with the wiki.
//!
//! Whichever component persists a document or group change calls in here
//! afterwards; the cache is never polled.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use wikirights_core::DocumentReference;

use crate::cache::RightCache;
use crate::traits::{GroupService, RuleStore};

/// Page size when enumerating group members.
const MEMBER_PAGE_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum InvalidationError<SE, GE>
where
    SE: std::error::Error + 'static,
    GE: std::error::Error + 'static,
{
    #[error("failed to inspect the changed document: {0}")]
    Store(#[source] SE),

    #[error("failed to enumerate group members: {0}")]
    Group(#[source] GE),
}

/// Invalidation hooks bound to one cache and the collaborators needed to
/// interpret a change.
#[derive(Debug)]
pub struct CacheInvalidator<S, G> {
    cache: Arc<RightCache>,
    store: S,
    groups: G,
}

impl<S, G> CacheInvalidator<S, G>
where
    S: RuleStore,
    G: GroupService,
{
    pub fn new(cache: Arc<RightCache>, store: S, groups: G) -> Self {
        Self {
            cache,
            store,
            groups,
        }
    }

    /// A document was created, updated or deleted. Drops the document's
    /// cache subtree; if the document declares group membership, also
    /// drops every member's resolved outcomes.
    pub fn document_updated(
        &self,
        document: &DocumentReference,
    ) -> Result<(), InvalidationError<S::Error, G::Error>> {
        debug!(document = %document, "invalidating cache entries for changed document");
        self.cache
            .remove(&self.cache.key_for(document.as_entity()));

        if self
            .store
            .is_group_document(document)
            .map_err(InvalidationError::Store)?
        {
            self.invalidate_group_members(document)?;
        }
        Ok(())
    }

    /// Drop the resolved outcomes of every member of a group, paging
    /// through the membership list. A member equal to the group itself is
    /// skipped.
    ///
    /// The current membership is enumerated, so when members are being
    /// removed this must run before the removal is persisted; otherwise
    /// drop the removed members individually via
    /// [`RightCache::remove_user`].
    pub fn invalidate_group_members(
        &self,
        group: &DocumentReference,
    ) -> Result<(), InvalidationError<S::Error, G::Error>> {
        let mut offset = 0;
        loop {
            let members = self
                .groups
                .members_of(group, MEMBER_PAGE_SIZE, offset)
                .map_err(InvalidationError::Group)?;
            for member in &members {
                if member == group {
                    continue;
                }
                self.cache
                    .remove_user(&self.cache.key_for(member.as_entity()));
            }
            if members.len() < MEMBER_PAGE_SIZE {
                break;
            }
            offset += MEMBER_PAGE_SIZE;
        }
        debug!(group = %group, "invalidated cached outcomes of group members");
        Ok(())
    }
}
