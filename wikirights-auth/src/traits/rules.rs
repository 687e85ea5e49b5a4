// SPDX-License-Identifier: MIT OR Apache-2.0

use wikirights_core::DocumentReference;

use crate::rule::{RuleKind, SecurityRule};

/// Read access to the documents carrying security rules and authorship
/// metadata. Implemented by the hosting platform's document store.
pub trait RuleStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Security rules of the given kind attached to a document. An absent
    /// document yields no rules.
    fn rules(
        &self,
        document: &DocumentReference,
        kind: RuleKind,
    ) -> Result<Vec<SecurityRule>, Self::Error>;

    /// Last author of the document content, the subject of programming
    /// rights checks.
    fn content_author(
        &self,
        document: &DocumentReference,
    ) -> Result<Option<DocumentReference>, Self::Error>;

    /// Creator of the document.
    fn creator(
        &self,
        document: &DocumentReference,
    ) -> Result<Option<DocumentReference>, Self::Error>;

    /// Owner of a wiki.
    fn wiki_owner(&self, wiki: &str) -> Result<Option<DocumentReference>, Self::Error>;

    /// Whether the document declares group membership entries.
    fn is_group_document(&self, document: &DocumentReference) -> Result<bool, Self::Error>;
}
