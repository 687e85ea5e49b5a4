// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cold-path resolution of access levels.
//!
//! The loader walks the entity chain from the wiki root down to the
//! requested entity, reads the security rules attached at each level,
//! matches them against the user and their transitive group closure and
//! merges the outcomes. Each traversed level is recorded in the right
//! cache on the way down, parents before children, so a concurrent reader
//! never finds a child entry whose chain it cannot follow upwards.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use wikirights_core::{AccessLevel, DocumentReference, EntityReference, EntityType, RightState};

use crate::cache::{InsertionError, RightCache, RightCacheEntry};
use crate::rule::{RuleKind, RuleState, SecurityRule};
use crate::traits::{GroupService, RightLoader, RuleStore};

/// Space holding the wiki-scope preferences document.
pub const WIKI_PREFERENCES_SPACE: &str = "XWiki";

/// Document carrying wiki-scope rules.
pub const WIKI_PREFERENCES_DOCUMENT: &str = "XWikiPreferences";

/// Document carrying space-scope rules, one per space.
pub const SPACE_PREFERENCES_DOCUMENT: &str = "WebPreferences";

/// Failure of a single cold load.
///
/// The two race variants are expected concurrency outcomes the service
/// retries on; the storage variants are right-service errors which
/// terminate the check.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("a conflicting cache entry was inserted concurrently")]
    Conflict,

    #[error("a parent cache entry was evicted during insertion")]
    ParentEvicted,

    #[error("failed to read security rules: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to resolve group membership: {0}")]
    Group(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<InsertionError> for LoadError {
    fn from(error: InsertionError) -> Self {
        match error {
            InsertionError::Conflict => LoadError::Conflict,
            InsertionError::ParentEvicted => LoadError::ParentEvicted,
        }
    }
}

impl LoadError {
    /// Whether retrying the resolution from scratch can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Conflict | LoadError::ParentEvicted)
    }
}

/// Default loader reading rules through a [`RuleStore`] and membership
/// through a [`GroupService`]. Stateless apart from the shared cache;
/// re-entrant from any number of threads.
#[derive(Debug)]
pub struct DefaultRightLoader<S, G> {
    cache: Arc<RightCache>,
    store: S,
    groups: G,
}

impl<S, G> DefaultRightLoader<S, G>
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

    /// All groups the user belongs to, directly or through nested groups.
    /// The visited set guards against membership cycles; a group listing
    /// itself as a member is skipped.
    fn group_closure(
        &self,
        user: &DocumentReference,
    ) -> Result<HashSet<DocumentReference>, LoadError> {
        let mut closure = HashSet::new();
        let mut queue = self
            .groups
            .groups_of(user)
            .map_err(|error| LoadError::Group(Box::new(error)))?;

        while let Some(group) = queue.pop() {
            if !closure.insert(group.clone()) {
                continue;
            }
            let parents = self
                .groups
                .groups_of(&group)
                .map_err(|error| LoadError::Group(Box::new(error)))?;
            for parent in parents {
                if parent != group && !closure.contains(&parent) {
                    queue.push(parent);
                }
            }
        }

        Ok(closure)
    }

    /// Rules attached at one hierarchy level. Document levels carry their
    /// own local rules; space and wiki levels read the global rules of
    /// their conventional preferences document. Sub-document levels carry
    /// none.
    fn rules_at(&self, level: &EntityReference) -> Result<Vec<SecurityRule>, LoadError> {
        let backing = match level.kind() {
            EntityType::Document => {
                let document = DocumentReference::try_from(level.clone())
                    .map_err(|error| LoadError::Store(Box::new(error)))?;
                return self
                    .store
                    .rules(&document, RuleKind::Local)
                    .map_err(|error| LoadError::Store(Box::new(error)));
            }
            EntityType::Space => DocumentReference::new(
                level.root().name(),
                level.name(),
                SPACE_PREFERENCES_DOCUMENT,
            ),
            EntityType::Wiki => DocumentReference::new(
                level.name(),
                WIKI_PREFERENCES_SPACE,
                WIKI_PREFERENCES_DOCUMENT,
            ),
            EntityType::Object | EntityType::ObjectProperty => return Ok(Vec::new()),
        };
        self.store
            .rules(&backing, RuleKind::Global)
            .map_err(|error| LoadError::Store(Box::new(error)))
    }
}

/// The outcome of one level's rules for one user: deny beats allow within
/// the level, rights no applicable rule mentions stay unset.
fn level_outcome(
    rules: &[SecurityRule],
    user: &DocumentReference,
    memberships: &HashSet<DocumentReference>,
) -> AccessLevel {
    let mut outcome = AccessLevel::default();
    for state in [RuleState::Allow, RuleState::Deny] {
        for rule in rules.iter().filter(|rule| rule.state == state) {
            let applies = rule.users.contains(user)
                || rule.groups.iter().any(|group| memberships.contains(group));
            if !applies {
                continue;
            }
            for right in &rule.rights {
                let right_state = match state {
                    RuleState::Allow => RightState::Allow,
                    RuleState::Deny => RightState::Deny,
                };
                outcome.set(*right, right_state);
            }
        }
    }
    outcome
}

impl<S, G> RightLoader for DefaultRightLoader<S, G>
where
    S: RuleStore,
    G: GroupService,
{
    fn load(
        &self,
        user: &DocumentReference,
        entity: &EntityReference,
    ) -> Result<AccessLevel, LoadError> {
        let mut chain: Vec<&EntityReference> = entity.ancestors().collect();
        chain.reverse();

        let memberships = self.group_closure(user)?;
        let user_key = self.cache.key_for(user.as_entity());

        let mut merged = AccessLevel::default();
        for level in chain {
            let key = self.cache.key_for(level);
            let rules = self.rules_at(level)?;
            if rules.is_empty() {
                self.cache
                    .insert_entity(key, RightCacheEntry::HaveNoObjects)?;
                continue;
            }
            merged.override_with(&level_outcome(&rules, user, &memberships));
            self.cache
                .insert_entity(key.clone(), RightCacheEntry::HaveObjects)?;
            self.cache
                .insert_user(user_key.clone(), key, merged.clone())?;
        }

        debug!(user = %user, entity = %entity, level = %merged, "loaded access level");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use wikirights_core::Right;

    use super::*;

    fn user(name: &str) -> DocumentReference {
        DocumentReference::new("xwiki", "XWiki", name)
    }

    #[test]
    fn deny_beats_allow_within_a_level() {
        let alice = user("Alice");
        let rules = vec![
            SecurityRule::allow([Right::View, Right::Edit]).for_user(alice.clone()),
            SecurityRule::deny([Right::Edit]).for_user(alice.clone()),
        ];
        let outcome = level_outcome(&rules, &alice, &HashSet::new());
        assert_eq!(outcome.get(Right::View), RightState::Allow);
        assert_eq!(outcome.get(Right::Edit), RightState::Deny);
        assert_eq!(outcome.get(Right::Delete), RightState::Unset);
    }

    #[test]
    fn rules_apply_through_group_membership() {
        let alice = user("Alice");
        let staff = user("StaffGroup");
        let rules = vec![SecurityRule::allow([Right::View]).for_group(staff.clone())];

        let no_membership = level_outcome(&rules, &alice, &HashSet::new());
        assert_eq!(no_membership.get(Right::View), RightState::Unset);

        let memberships: HashSet<_> = [staff].into_iter().collect();
        let with_membership = level_outcome(&rules, &alice, &memberships);
        assert_eq!(with_membership.get(Right::View), RightState::Allow);
    }
}
