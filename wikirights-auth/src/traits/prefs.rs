// SPDX-License-Identifier: MIT OR Apache-2.0

use wikirights_core::EntityReference;

/// Read access to wiki and space scoped preferences.
pub trait PreferenceSource {
    /// A preference set at wiki scope.
    fn wiki_preference(&self, wiki: &str, key: &str) -> Option<String>;

    /// A preference set at space scope.
    fn space_preference(&self, space: &EntityReference, key: &str) -> Option<String>;

    /// Whether the wiki is running in read-only mode.
    fn is_read_only(&self) -> bool;
}
