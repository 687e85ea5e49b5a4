// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed startup configuration.
//!
//! All properties are read once when the engine is assembled; the
//! resolution path never performs string-keyed lookups.

use std::num::NonZeroUsize;

use tracing::{info, warn};

use crate::traits::ConfigurationSource;

/// Property holding the right cache capacity.
pub const CACHE_CAPACITY_PROPERTY: &str = "security.rightcache.capacity";

/// Property suppressing the login challenge on denied anonymous requests.
pub const HIDE_LOGIN_PROPERTY: &str = "xwiki.hidelogin";

/// Cache capacity used when the property is absent or unusable.
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityConfig {
    pub cache_capacity: NonZeroUsize,
    pub hide_login: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            // DEFAULT_CACHE_CAPACITY is a non-zero literal.
            cache_capacity: NonZeroUsize::new(DEFAULT_CACHE_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
            hide_login: false,
        }
    }
}

impl SecurityConfig {
    /// Resolve the configuration from startup properties. Unusable values
    /// fall back to the defaults with a warning, never an error.
    pub fn from_source<C: ConfigurationSource>(source: &C) -> Self {
        let mut config = Self::default();

        if let Some(value) = source.property(CACHE_CAPACITY_PROPERTY) {
            match value.trim().parse::<usize>().ok().and_then(NonZeroUsize::new) {
                Some(capacity) => config.cache_capacity = capacity,
                None => {
                    warn!(%value, "failed to interpret right cache capacity, using default");
                }
            }
        }

        if let Some(value) = source.property(HIDE_LOGIN_PROPERTY) {
            config.hide_login = value.trim().eq_ignore_ascii_case("true");
        }

        info!(capacity = config.cache_capacity.get(), "resolved security configuration");
        config
    }
}
