// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent, capacity-bounded store for resolved rights.
//!
//! The cache holds two kinds of entries. Entity entries record whether a
//! hierarchy level carries security rules at all ([`RightCacheEntry::HaveObjects`]
//! / [`RightCacheEntry::HaveNoObjects`]); they are keyed by the entity alone
//! and shared between users. User entries hold the [`AccessLevel`] resolved
//! for one user at one rule-bearing level and are keyed by the (user,
//! entity) pair. Keeping the two tiers separate lets document mutation
//! invalidate a whole entity subtree while group mutation touches only one
//! user's resolved outcomes.
//!
//! Every non-wiki entity entry requires its parent entry to be present at
//! insertion time, and user entries require their entity entry. Capacity
//! eviction is silent and can break that invariant between two insertions
//! of the same load; the next insertion then fails with
//! [`InsertionError::ParentEvicted`] and the caller restarts resolution
//! from scratch. Two loads racing to different conclusions are caught the
//! same way: inserting over an existing entry with different content fails
//! with [`InsertionError::Conflict`]. Both signals are expected
//! concurrency outcomes, not errors to surface.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::trace;
use wikirights_core::{AccessLevel, EntityReference, EntityType};

/// Content-based key derived from an entity reference chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RightCacheKey {
    // Root-first, so dropping the last segment yields the parent key.
    segments: Vec<(EntityType, String)>,
}

impl RightCacheKey {
    /// Derive the key for an entity reference. Pure, no I/O.
    pub fn for_entity(entity: &EntityReference) -> Self {
        let mut segments: Vec<_> = entity
            .ancestors()
            .map(|reference| (reference.kind(), reference.name().to_owned()))
            .collect();
        segments.reverse();
        Self { segments }
    }

    /// Key of the parent entity, `None` at the top of the hierarchy.
    pub fn parent(&self) -> Option<RightCacheKey> {
        if self.segments.len() > 1 {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        } else {
            None
        }
    }
}

impl fmt::Display for RightCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, (_, name)) in self.segments.iter().enumerate() {
            if position > 0 {
                write!(f, "/")?;
            }
            write!(f, "{name}")?;
        }
        Ok(())
    }
}

/// A cached resolution result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RightCacheEntry {
    /// Resolved access for one (user, entity) pair.
    Level(AccessLevel),

    /// The entity level carries security rules; re-key by (user, entity)
    /// to find the resolved outcome.
    HaveObjects,

    /// The entity level carries no security rules; resolution continues at
    /// the parent.
    HaveNoObjects,
}

/// Recoverable insertion failures. Callers retry resolution from scratch;
/// neither signal is reported to the end user.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum InsertionError {
    #[error("a different entry is already cached under this key")]
    Conflict,

    #[error("the parent entry was evicted before the insertion completed")]
    ParentEvicted,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum CacheSlot {
    Entity(RightCacheKey),
    User {
        user: RightCacheKey,
        entity: RightCacheKey,
    },
}

struct CacheState {
    entries: LruCache<CacheSlot, RightCacheEntry>,
    /// Slots to drop when an entity key is explicitly removed: child entity
    /// slots and the (user, entity) slots recorded at this entity.
    dependents: HashMap<RightCacheKey, HashSet<CacheSlot>>,
    /// All (user, entity) slots per user key, for group invalidation.
    by_user: HashMap<RightCacheKey, HashSet<CacheSlot>>,
}

impl CacheState {
    fn unregister(&mut self, slot: &CacheSlot) {
        match slot {
            CacheSlot::Entity(key) => {
                if let Some(parent) = key.parent() {
                    if let Some(dependents) = self.dependents.get_mut(&parent) {
                        dependents.remove(slot);
                        if dependents.is_empty() {
                            self.dependents.remove(&parent);
                        }
                    }
                }
            }
            CacheSlot::User { user, entity } => {
                if let Some(dependents) = self.dependents.get_mut(entity) {
                    dependents.remove(slot);
                    if dependents.is_empty() {
                        self.dependents.remove(entity);
                    }
                }
                if let Some(slots) = self.by_user.get_mut(user) {
                    slots.remove(slot);
                    if slots.is_empty() {
                        self.by_user.remove(user);
                    }
                }
            }
        }
    }

    /// Insert a slot, bookkeeping the dependency indices and scrubbing the
    /// capacity victim out of them. The victim's own dependents stay
    /// registered: its children are still cached and must still fall when
    /// the victim's key is explicitly removed later.
    fn insert(&mut self, slot: CacheSlot, entry: RightCacheEntry) {
        match &slot {
            CacheSlot::Entity(key) => {
                if let Some(parent) = key.parent() {
                    self.dependents.entry(parent).or_default().insert(slot.clone());
                }
            }
            CacheSlot::User { user, entity } => {
                self.dependents
                    .entry(entity.clone())
                    .or_default()
                    .insert(slot.clone());
                self.by_user
                    .entry(user.clone())
                    .or_default()
                    .insert(slot.clone());
            }
        }
        if let Some((victim, _)) = self.entries.push(slot, entry) {
            self.unregister(&victim);
        }
    }
}

/// Process-wide right cache.
///
/// A single mutex guards the LRU store and its dependency indices so that
/// the parent-presence check and the insertion it guards are atomic. All
/// operations are short; nothing blocks while holding the lock.
pub struct RightCache {
    state: Mutex<CacheState>,
}

impl fmt::Debug for RightCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RightCache")
            .field("entries", &state.entries.len())
            .field("capacity", &state.entries.cap())
            .finish()
    }
}

impl RightCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                dependents: HashMap::new(),
                by_user: HashMap::new(),
            }),
        }
    }

    /// Derive the cache key for an entity reference. Pure, no I/O.
    pub fn key_for(&self, entity: &EntityReference) -> RightCacheKey {
        RightCacheKey::for_entity(entity)
    }

    /// Entity-level entry, if cached.
    pub fn entry(&self, key: &RightCacheKey) -> Option<RightCacheEntry> {
        let mut state = self.state.lock();
        state.entries.get(&CacheSlot::Entity(key.clone())).cloned()
    }

    /// (user, entity) entry, if cached. Only meaningful after an entity
    /// lookup returned [`RightCacheEntry::HaveObjects`].
    pub fn user_entry(
        &self,
        user: &RightCacheKey,
        entity: &RightCacheKey,
    ) -> Option<RightCacheEntry> {
        let mut state = self.state.lock();
        state
            .entries
            .get(&CacheSlot::User {
                user: user.clone(),
                entity: entity.clone(),
            })
            .cloned()
    }

    /// Insert an entity-level entry. The parent entity must already be
    /// cached; inserting an equal entry twice is fine.
    pub fn insert_entity(
        &self,
        key: RightCacheKey,
        entry: RightCacheEntry,
    ) -> Result<(), InsertionError> {
        let mut state = self.state.lock();
        if let Some(parent) = key.parent() {
            if !state.entries.contains(&CacheSlot::Entity(parent)) {
                return Err(InsertionError::ParentEvicted);
            }
        }
        let slot = CacheSlot::Entity(key.clone());
        if let Some(existing) = state.entries.peek(&slot) {
            if *existing != entry {
                return Err(InsertionError::Conflict);
            }
            state.entries.promote(&slot);
            return Ok(());
        }
        trace!(key = %key, "caching entity entry");
        state.insert(slot, entry);
        Ok(())
    }

    /// Insert the resolved level for a (user, entity) pair. The entity
    /// entry itself must still be cached.
    pub fn insert_user(
        &self,
        user: RightCacheKey,
        entity: RightCacheKey,
        level: AccessLevel,
    ) -> Result<(), InsertionError> {
        let mut state = self.state.lock();
        if !state.entries.contains(&CacheSlot::Entity(entity.clone())) {
            return Err(InsertionError::ParentEvicted);
        }
        let slot = CacheSlot::User { user, entity };
        let entry = RightCacheEntry::Level(level);
        if let Some(existing) = state.entries.peek(&slot) {
            if *existing != entry {
                return Err(InsertionError::Conflict);
            }
            state.entries.promote(&slot);
            return Ok(());
        }
        state.insert(slot, entry);
        Ok(())
    }

    /// Remove an entity entry together with everything depending on it:
    /// child entity entries and (user, entity) entries, transitively.
    pub fn remove(&self, key: &RightCacheKey) {
        let mut state = self.state.lock();
        let mut worklist = vec![CacheSlot::Entity(key.clone())];
        while let Some(slot) = worklist.pop() {
            state.entries.pop(&slot);
            state.unregister(&slot);
            if let CacheSlot::Entity(entity) = &slot {
                if let Some(dependents) = state.dependents.remove(entity) {
                    worklist.extend(dependents);
                }
            }
        }
    }

    /// Remove every (user, entity) entry recorded for the given user key.
    /// Used when the user's group memberships change.
    pub fn remove_user(&self, user: &RightCacheKey) {
        let mut state = self.state.lock();
        if let Some(slots) = state.by_user.remove(user) {
            for slot in slots {
                state.entries.pop(&slot);
                if let CacheSlot::User { entity, .. } = &slot {
                    if let Some(dependents) = state.dependents.get_mut(entity) {
                        dependents.remove(&slot);
                        if dependents.is_empty() {
                            state.dependents.remove(entity);
                        }
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
