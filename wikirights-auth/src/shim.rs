// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter onto the hosting platform's native rights interface.
//!
//! The host talks strings; this shim keeps that surface stable while
//! delegating every decision to the configured [`RightService`].

use tracing::debug;
use wikirights_core::DocumentReference;

use crate::context::RequestContext;
use crate::service::{GUEST_USER_FULLNAME, RightService};

/// Document holding the wiki-scope preferences, where wiki administration
/// rights are anchored.
const WIKI_PREFERENCES_FULLNAME: &str = "XWiki.XWikiPreferences";

/// Drop-in replacement for the host platform's rights service.
#[derive(Debug)]
pub struct CachingRightService<R> {
    inner: R,
}

impl<R> CachingRightService<R>
where
    R: RightService,
{
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn check_access(
        &self,
        action: &str,
        document: &DocumentReference,
        ctx: &mut RequestContext,
    ) -> bool {
        self.inner.check_access(action, document, ctx)
    }

    pub fn has_access_level(
        &self,
        right: &str,
        username: &str,
        docname: &str,
        ctx: &RequestContext,
    ) -> bool {
        self.inner.has_access_level(right, username, docname, ctx)
    }

    pub fn has_programming_rights(&self, ctx: &RequestContext) -> bool {
        self.inner.has_programming_rights(ctx)
    }

    pub fn has_programming_rights_for(
        &self,
        document: Option<&DocumentReference>,
        ctx: &RequestContext,
    ) -> bool {
        self.inner.has_programming_rights_for(document, ctx)
    }

    pub fn has_admin_rights(&self, ctx: &RequestContext) -> bool {
        self.inner.has_admin_rights(ctx)
    }

    /// Admin on the wiki preferences document, i.e. administration of the
    /// whole wiki rather than a single space.
    pub fn has_wiki_admin_rights(&self, ctx: &RequestContext) -> bool {
        let username = ctx
            .user
            .as_ref()
            .map(DocumentReference::to_string)
            .unwrap_or_else(|| GUEST_USER_FULLNAME.to_owned());
        debug!(user = %username, "checking wiki admin rights");
        self.inner
            .has_access_level("admin", &username, WIKI_PREFERENCES_FULLNAME, ctx)
    }

    pub fn list_all_levels(&self) -> Vec<String> {
        self.inner.list_all_levels()
    }
}
