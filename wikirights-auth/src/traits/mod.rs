// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams towards the hosting wiki platform.

mod auth;
mod config;
mod groups;
mod loader;
mod prefs;
mod rules;

pub use auth::Authenticator;
pub use config::ConfigurationSource;
pub use groups::GroupService;
pub use loader::RightLoader;
pub use prefs::PreferenceSource;
pub use rules::RuleStore;
