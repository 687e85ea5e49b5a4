// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request state handed to the right service.

use wikirights_core::DocumentReference;

/// How the request reached the wiki.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestMode {
    /// A browser request; anonymous users can be challenged to log in.
    #[default]
    Interactive,

    /// A remote API request; anonymous users stay guests, no challenge.
    Remote,
}

/// The state of one request as far as rights checking is concerned.
///
/// The service records a freshly authenticated user back into the context,
/// matching how the hosting platform keeps the session user around for the
/// rest of the request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Wiki the request is addressed to.
    pub wiki: String,

    /// Authenticated user, `None` while the request is anonymous.
    pub user: Option<DocumentReference>,

    /// Document the request is acting on.
    pub document: Option<DocumentReference>,

    /// Document supplying the script being executed, when different from
    /// the request document.
    pub script_document: Option<DocumentReference>,

    pub mode: RequestMode,
}

impl RequestContext {
    pub fn new(wiki: impl Into<String>) -> Self {
        Self {
            wiki: wiki.into(),
            user: None,
            document: None,
            script_document: None,
            mode: RequestMode::Interactive,
        }
    }

    pub fn with_user(mut self, user: DocumentReference) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_document(mut self, document: DocumentReference) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_script_document(mut self, document: DocumentReference) -> Self {
        self.script_document = Some(document);
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }
}
