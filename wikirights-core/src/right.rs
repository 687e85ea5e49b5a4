// SPDX-License-Identifier: MIT OR Apache-2.0

//! The vocabulary of rights known to the engine.

use std::fmt;

/// A named permission which can be granted or denied on an entity.
///
/// [`Right::Illegal`] is the sentinel for unrecognised action or right
/// names; it carries no slot in an access level and can never be granted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Right {
    View,
    Edit,
    Comment,
    Delete,
    Register,
    Admin,
    Program,
    Illegal,
}

/// All rights which can actually be assigned, in catalog order.
const ALL_RIGHTS: [Right; 7] = [
    Right::View,
    Right::Edit,
    Right::Comment,
    Right::Delete,
    Right::Register,
    Right::Admin,
    Right::Program,
];

impl Right {
    /// Number of assignable rights.
    pub const COUNT: usize = ALL_RIGHTS.len();

    /// All assignable rights (excludes [`Right::Illegal`]).
    pub fn all() -> impl Iterator<Item = Right> {
        ALL_RIGHTS.into_iter()
    }

    /// Slot of this right in an access level, `None` for the sentinel.
    pub(crate) fn index(self) -> Option<usize> {
        ALL_RIGHTS.iter().position(|right| *right == self)
    }

    /// Resolve a right by its canonical name.
    pub fn from_name(name: &str) -> Right {
        match name {
            "view" => Right::View,
            "edit" => Right::Edit,
            "comment" => Right::Comment,
            "delete" => Right::Delete,
            "register" => Right::Register,
            "admin" => Right::Admin,
            "programming" => Right::Program,
            _ => Right::Illegal,
        }
    }

    /// Resolve a request action name to the right it requires.
    pub fn from_action(action: &str) -> Right {
        match action {
            "view" | "viewrev" | "downloadrev" | "download" | "get" | "pdf" | "export"
            | "skin" | "login" | "loginsubmit" | "loginerror" | "logout" => Right::View,
            "edit" | "inline" | "preview" | "save" | "saveandcontinue" | "rollback"
            | "attach" | "upload" | "lock" | "cancel" => Right::Edit,
            "commentadd" => Right::Comment,
            "delete" | "undelete" => Right::Delete,
            "register" => Right::Register,
            "admin" | "deleteversions" => Right::Admin,
            "programming" => Right::Program,
            _ => Right::Illegal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Right::View => "view",
            Right::Edit => "edit",
            Right::Comment => "comment",
            Right::Delete => "delete",
            Right::Register => "register",
            Right::Admin => "admin",
            Right::Program => "programming",
            Right::Illegal => "illegal",
        }
    }
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
