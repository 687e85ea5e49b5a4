// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed, immutable references into the wiki entity hierarchy.
//!
//! A reference is a parent-linked chain of named nodes: a document lives in
//! a space, a space lives in a wiki (or in another space), objects and their
//! properties hang off documents. The set of entity kinds is closed and each
//! kind has a static table of allowed parent kinds; constructing a reference
//! which violates the table fails instead of producing a half-formed chain.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Space where user and group profile documents live.
pub const USER_SPACE: &str = "XWiki";

/// Space a bare document name resolves into.
const DEFAULT_SPACE: &str = "Main";

/// Document name an empty document reference resolves into.
const DEFAULT_DOCUMENT: &str = "WebHome";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidReferenceError {
    #[error("a {child} reference cannot have a {parent} parent")]
    DisallowedParent { child: EntityType, parent: EntityType },

    #[error("a {0} reference requires a parent")]
    MissingParent(EntityType),

    #[error("expected a {expected} reference but found {found}")]
    UnexpectedType { expected: EntityType, found: EntityType },
}

/// The closed set of entity kinds, ordered from least to most specific.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityType {
    Wiki,
    Space,
    Document,
    Object,
    ObjectProperty,
}

impl EntityType {
    /// Kinds a reference of this kind may have as its direct parent.
    pub fn allowed_parents(&self) -> &'static [EntityType] {
        match self {
            EntityType::Wiki => &[],
            EntityType::Space => &[EntityType::Wiki, EntityType::Space],
            EntityType::Document => &[EntityType::Space],
            EntityType::Object => &[EntityType::Document],
            EntityType::ObjectProperty => &[EntityType::Object],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Wiki => "wiki",
            EntityType::Space => "space",
            EntityType::Document => "document",
            EntityType::Object => "object",
            EntityType::ObjectProperty => "object property",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed node in the entity hierarchy with a shared, immutable parent
/// chain.
///
/// Equality and hashing are content-based over the whole chain, so two
/// independently constructed references to the same entity coalesce on the
/// same cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntityReference {
    name: String,
    kind: EntityType,
    parent: Option<Arc<EntityReference>>,
}

impl EntityReference {
    /// Construct a reference, validating the parent kind against the
    /// allowed-parent table.
    pub fn new(
        name: impl Into<String>,
        kind: EntityType,
        parent: Option<EntityReference>,
    ) -> Result<Self, InvalidReferenceError> {
        let allowed = kind.allowed_parents();
        match &parent {
            Some(parent_ref) => {
                if !allowed.contains(&parent_ref.kind) {
                    return Err(InvalidReferenceError::DisallowedParent {
                        child: kind,
                        parent: parent_ref.kind,
                    });
                }
            }
            None => {
                if !allowed.is_empty() {
                    return Err(InvalidReferenceError::MissingParent(kind));
                }
            }
        }

        Ok(Self {
            name: name.into(),
            kind,
            parent: parent.map(Arc::new),
        })
    }

    /// A top-level wiki reference.
    pub fn wiki(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntityType::Wiki,
            parent: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityType {
        self.kind
    }

    pub fn parent(&self) -> Option<&EntityReference> {
        self.parent.as_deref()
    }

    /// Iterate the chain from this reference up to the root wiki.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// The first reference of the given kind in the chain, starting from
    /// this reference.
    pub fn extract(&self, kind: EntityType) -> Option<&EntityReference> {
        self.ancestors().find(|reference| reference.kind == kind)
    }

    /// The root wiki reference of the chain.
    pub fn root(&self) -> &EntityReference {
        self.ancestors().last().unwrap_or(self)
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            let separator = match (self.kind, parent.kind) {
                (EntityType::Space, EntityType::Wiki) => ':',
                (EntityType::Object, _) => '^',
                _ => '.',
            };
            write!(f, "{parent}{separator}{}", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Iterator over a reference and its ancestors, most specific first.
#[derive(Clone, Debug)]
pub struct Ancestors<'a> {
    next: Option<&'a EntityReference>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a EntityReference;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// A reference known to point at a document.
///
/// Users and groups are identified by their profile documents, so this type
/// doubles as the identity type throughout the engine.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentReference(EntityReference);

impl DocumentReference {
    pub fn new(
        wiki: impl Into<String>,
        space: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let wiki = EntityReference::wiki(wiki);
        let space = EntityReference {
            name: space.into(),
            kind: EntityType::Space,
            parent: Some(Arc::new(wiki)),
        };
        Self(EntityReference {
            name: name.into(),
            kind: EntityType::Document,
            parent: Some(Arc::new(space)),
        })
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn space_name(&self) -> &str {
        // A document reference always has a space parent.
        self.0.parent().map(EntityReference::name).unwrap_or("")
    }

    pub fn wiki_name(&self) -> &str {
        self.0.root().name()
    }

    pub fn as_entity(&self) -> &EntityReference {
        &self.0
    }

    pub fn into_entity(self) -> EntityReference {
        self.0
    }

    /// The wiki reference this document belongs to.
    pub fn wiki_reference(&self) -> EntityReference {
        self.0.root().clone()
    }
}

impl TryFrom<EntityReference> for DocumentReference {
    type Error = InvalidReferenceError;

    fn try_from(reference: EntityReference) -> Result<Self, Self::Error> {
        if reference.kind() != EntityType::Document {
            return Err(InvalidReferenceError::UnexpectedType {
                expected: EntityType::Document,
                found: reference.kind(),
            });
        }
        Ok(Self(reference))
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Split an optional `wiki:` prefix off a document name.
fn split_wiki<'a>(name: &'a str, default_wiki: &'a str) -> (&'a str, &'a str) {
    match name.split_once(':') {
        Some((wiki, rest)) if !wiki.is_empty() => (wiki, rest),
        _ => (default_wiki, name),
    }
}

/// Resolve a textual document name (`wiki:Space.Page`, `Space.Page` or
/// `Page`) into a document reference, filling missing parts with the
/// platform defaults.
pub fn resolve_document(name: &str, default_wiki: &str) -> DocumentReference {
    let (wiki, rest) = split_wiki(name, default_wiki);
    let (space, document) = match rest.rsplit_once('.') {
        Some((space, document)) if !space.is_empty() => (space, document),
        _ => (DEFAULT_SPACE, rest),
    };
    let document = if document.is_empty() {
        DEFAULT_DOCUMENT
    } else {
        document
    };
    DocumentReference::new(wiki, space, document)
}

/// Resolve a textual user or group name into its profile document
/// reference. Bare names land in the platform user space.
pub fn resolve_user(name: &str, default_wiki: &str) -> DocumentReference {
    let (wiki, rest) = split_wiki(name, default_wiki);
    match rest.rsplit_once('.') {
        Some((space, user)) if !space.is_empty() => DocumentReference::new(wiki, space, user),
        _ => DocumentReference::new(wiki, USER_SPACE, rest),
    }
}
