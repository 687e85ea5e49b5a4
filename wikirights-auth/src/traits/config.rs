// SPDX-License-Identifier: MIT OR Apache-2.0

/// Startup configuration properties, read once when the engine is built.
pub trait ConfigurationSource {
    fn property(&self, key: &str) -> Option<String>;
}
