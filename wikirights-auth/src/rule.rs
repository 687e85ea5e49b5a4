// SPDX-License-Identifier: MIT OR Apache-2.0

//! Security rules as they are attached to wiki documents.

use wikirights_core::{DocumentReference, Right};

/// Where a rule set is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuleKind {
    /// Rules on the document itself, scoped to that document.
    Local,

    /// Rules on a preferences document, scoped to the enclosing space or
    /// wiki.
    Global,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuleState {
    Allow,
    Deny,
}

/// One explicit allow or deny statement: a set of rights granted to or
/// withheld from a set of users and groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityRule {
    pub users: Vec<DocumentReference>,
    pub groups: Vec<DocumentReference>,
    pub rights: Vec<Right>,
    pub state: RuleState,
}

impl SecurityRule {
    pub fn allow(rights: impl Into<Vec<Right>>) -> Self {
        Self {
            users: Vec::new(),
            groups: Vec::new(),
            rights: rights.into(),
            state: RuleState::Allow,
        }
    }

    pub fn deny(rights: impl Into<Vec<Right>>) -> Self {
        Self {
            users: Vec::new(),
            groups: Vec::new(),
            rights: rights.into(),
            state: RuleState::Deny,
        }
    }

    pub fn for_user(mut self, user: DocumentReference) -> Self {
        self.users.push(user);
        self
    }

    pub fn for_group(mut self, group: DocumentReference) -> Self {
        self.groups.push(group);
        self
    }
}
