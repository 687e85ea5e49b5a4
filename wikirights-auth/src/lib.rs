// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hierarchical rights resolution for a wiki, backed by a concurrent,
//! capacity-bounded right cache.
//!
//! The engine answers one question: may this user exercise this right on
//! this entity? Entities form a containment hierarchy (wiki ⊃ space ⊃
//! document); explicit allow and deny rules can be attached at any level
//! and are merged at load time, with deeper levels overriding and unset
//! rights inheriting. Resolved outcomes live in the [`cache::RightCache`]
//! until a document or group change pushes them out through
//! [`invalidate::CacheInvalidator`].
//!
//! Request threads share the cache without coordination. The two races
//! this opens up (a parent entry evicted mid-insertion, and two loads
//! racing to different conclusions) are detected at insertion time and
//! surfaced as result variants the service retries on; see [`cache`] for
//! the invariants.
//!
//! The hosting platform plugs in through the [`traits`] seams and talks
//! to the engine through [`service::RightService`] or the string-oriented
//! [`shim::CachingRightService`].

pub mod cache;
pub mod config;
pub mod context;
pub mod invalidate;
pub mod load;
pub mod rule;
pub mod service;
pub mod shim;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod traits;

#[cfg(test)]
mod tests;

pub use cache::{InsertionError, RightCache, RightCacheEntry, RightCacheKey};
pub use config::SecurityConfig;
pub use context::{RequestContext, RequestMode};
pub use invalidate::{CacheInvalidator, InvalidationError};
pub use load::{DefaultRightLoader, LoadError};
pub use rule::{RuleKind, RuleState, SecurityRule};
pub use service::{DefaultRightService, RightService, RightServiceError};
pub use shim::CachingRightService;
