// SPDX-License-Identifier: MIT OR Apache-2.0

//! The boolean rights-checking API exposed to the hosting platform.
//!
//! Every check resolves the user's access level through the right cache,
//! falling back to the loader on a miss, and degrades every failure to a
//! denial: nothing propagates past the boolean surface. The two cache race
//! signals are retried transparently; a conflicting insertion additionally
//! backs off briefly so the pending invalidation can land first.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use wikirights_core::{
    AccessLevel, DocumentReference, EntityReference, EntityType, Right, RightState, resolve_user,
};

use crate::cache::{RightCache, RightCacheEntry};
use crate::config::SecurityConfig;
use crate::context::{RequestContext, RequestMode};
use crate::load::LoadError;
use crate::traits::{Authenticator, PreferenceSource, RightLoader, RuleStore};

/// Name of the anonymous user.
pub const GUEST_USER: &str = "XWikiGuest";

/// Full name of the anonymous user.
pub const GUEST_USER_FULLNAME: &str = "XWiki.XWikiGuest";

/// Name of the user which passes every check.
pub const SUPERADMIN_USER: &str = "superadmin";

/// Bound on transparent retries after a cache race.
const MAX_LOAD_ATTEMPTS: usize = 5;

/// Pause before retrying after a conflicting insertion, giving the
/// invalidation triggered by the conflicting write a chance to land.
const CONFLICT_BACKOFF: Duration = Duration::from_millis(1);

/// Terminal failures of a single check. Callers of the boolean API never
/// see these; they are logged and turned into denials.
#[derive(Debug, Error)]
pub enum RightServiceError {
    #[error("right resolution did not settle after {0} attempts")]
    RetriesExhausted(usize),

    #[error("inconsistent cache entry for {user} at {entity}")]
    InconsistentEntry { user: String, entity: String },

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// The rights-checking API of the wiki.
pub trait RightService {
    /// May the current user perform `action` on `document`? Authenticates
    /// the request if necessary and, when an unauthenticated request is
    /// denied, triggers the host login flow as a side effect.
    fn check_access(
        &self,
        action: &str,
        document: &DocumentReference,
        ctx: &mut RequestContext,
    ) -> bool;

    /// Does the named user hold the named right on the named document? No
    /// authentication or login side effects.
    fn has_access_level(
        &self,
        right: &str,
        username: &str,
        docname: &str,
        ctx: &RequestContext,
    ) -> bool;

    /// Does the content author of the context document hold programming
    /// rights? The subject is deliberately the author, not the requesting
    /// user: a viewer must never inherit the script author's privileges,
    /// and vice versa.
    fn has_programming_rights(&self, ctx: &RequestContext) -> bool;

    /// Programming rights for an explicit document; with `None` the
    /// session user is checked at the current wiki.
    fn has_programming_rights_for(
        &self,
        document: Option<&DocumentReference>,
        ctx: &RequestContext,
    ) -> bool;

    /// Does the current user hold the admin right on the context document?
    fn has_admin_rights(&self, ctx: &RequestContext) -> bool;

    /// Names of all known rights.
    fn list_all_levels(&self) -> Vec<String>;
}

/// Default right service.
#[derive(Debug)]
pub struct DefaultRightService<L, S, A, P> {
    cache: Arc<RightCache>,
    loader: L,
    store: S,
    authenticator: A,
    preferences: P,
    config: SecurityConfig,
}

impl<L, S, A, P> DefaultRightService<L, S, A, P>
where
    L: RightLoader,
    S: RuleStore,
    A: Authenticator,
    P: PreferenceSource,
{
    pub fn new(
        cache: Arc<RightCache>,
        loader: L,
        store: S,
        authenticator: A,
        preferences: P,
        config: SecurityConfig,
    ) -> Self {
        Self {
            cache,
            loader,
            store,
            authenticator,
            preferences,
            config,
        }
    }

    /// One pass of the cache walk, most specific entity level first. The
    /// walk stops at the first level which answers concretely; merging
    /// across levels already happened inside the loader.
    fn resolve_once(
        &self,
        user: &DocumentReference,
        entity: &EntityReference,
    ) -> Result<AccessLevel, RightServiceError> {
        for level in entity.ancestors() {
            let key = self.cache.key_for(level);
            let Some(entry) = self.cache.entry(&key) else {
                return Ok(self.loader.load(user, entity)?);
            };
            match entry {
                RightCacheEntry::HaveNoObjects => continue,
                RightCacheEntry::HaveObjects => {
                    let user_key = self.cache.key_for(user.as_entity());
                    return match self.cache.user_entry(&user_key, &key) {
                        None => Ok(self.loader.load(user, entity)?),
                        Some(RightCacheEntry::Level(level)) => Ok(level),
                        Some(_) => Err(RightServiceError::InconsistentEntry {
                            user: user.to_string(),
                            entity: level.to_string(),
                        }),
                    };
                }
                RightCacheEntry::Level(_) => {
                    return Err(RightServiceError::InconsistentEntry {
                        user: user.to_string(),
                        entity: level.to_string(),
                    });
                }
            }
        }
        debug!(user = %user, entity = %entity, "no applicable rules, returning default level");
        Ok(AccessLevel::default())
    }

    /// Resolve with transparent retries on the cache race signals.
    fn access_level(
        &self,
        user: &DocumentReference,
        entity: &EntityReference,
    ) -> Result<AccessLevel, RightServiceError> {
        for attempt in 1..=MAX_LOAD_ATTEMPTS {
            match self.resolve_once(user, entity) {
                Err(RightServiceError::Load(race)) if race.is_retryable() => {
                    debug!(attempt, signal = %race, "retrying right resolution");
                    if matches!(race, LoadError::Conflict) {
                        thread::sleep(CONFLICT_BACKOFF);
                    }
                }
                outcome => return outcome,
            }
        }
        Err(RightServiceError::RetriesExhausted(MAX_LOAD_ATTEMPTS))
    }

    fn is_superadmin(&self, user: &DocumentReference) -> bool {
        user.name().eq_ignore_ascii_case(SUPERADMIN_USER)
            && user.space_name() == wikirights_core::USER_SPACE
    }

    /// Grants applied when no explicit rule settled the right: the wiki
    /// owner administers their wiki, the creator of a document may delete
    /// it. An explicit deny anywhere in the chain still wins.
    fn implicit_allow(&self, right: Right, user: &DocumentReference, entity: &EntityReference) -> bool {
        match right {
            Right::Admin => match self.store.wiki_owner(entity.root().name()) {
                Ok(owner) => owner.as_ref() == Some(user),
                Err(error) => {
                    warn!(error = %error, "failed to look up wiki owner");
                    false
                }
            },
            Right::Delete if entity.kind() == EntityType::Document => {
                let Ok(document) = DocumentReference::try_from(entity.clone()) else {
                    return false;
                };
                match self.store.creator(&document) {
                    Ok(creator) => creator.as_ref() == Some(user),
                    Err(error) => {
                        warn!(error = %error, "failed to look up document creator");
                        false
                    }
                }
            }
            _ => false,
        }
    }

    /// The core decision: resolve, apply the read-only override, fall back
    /// to implicit grants where nothing explicit applies.
    fn check(&self, right: Right, user: &DocumentReference, entity: &EntityReference) -> bool {
        if right != Right::Illegal && self.is_superadmin(user) {
            debug!(user = %user, entity = %entity, right = %right, "granted: superadmin");
            return true;
        }

        let level = match self.access_level(user, entity) {
            Ok(level) => level,
            Err(error) => {
                error!(user = %user, entity = %entity, error = %error,
                       "failed to resolve access level");
                return false;
            }
        };

        if self.preferences.is_read_only()
            && matches!(
                right,
                Right::Edit | Right::Delete | Right::Comment | Right::Register
            )
        {
            info!(user = %user, entity = %entity, right = %right,
                  "denied: wiki is in read-only mode");
            return false;
        }

        match level.get(right) {
            RightState::Allow => {
                debug!(user = %user, entity = %entity, right = %right, "access granted");
                true
            }
            RightState::Unset if self.implicit_allow(right, user, entity) => {
                debug!(user = %user, entity = %entity, right = %right,
                       "access granted implicitly");
                true
            }
            _ => {
                info!(user = %user, entity = %entity, right = %right, "access denied");
                false
            }
        }
    }

    /// Establish the user for the request, challenging the authenticator
    /// when necessary. `None` means the check is already decided as a
    /// denial.
    fn authenticate_user(
        &self,
        right: Right,
        document: &DocumentReference,
        ctx: &mut RequestContext,
    ) -> Option<DocumentReference> {
        if let Some(user) = &ctx.user {
            return Some(user.clone());
        }

        let needs_auth = self.needs_auth(right, document, ctx);
        let authenticated = match ctx.mode {
            // Remote API requests never get an interactive challenge.
            RequestMode::Remote => Some(resolve_user(GUEST_USER_FULLNAME, &ctx.wiki)),
            RequestMode::Interactive => match self.authenticator.authenticate() {
                Ok(user) => user,
                Err(error) => {
                    error!(error = %error, "caught error while authenticating user");
                    return None;
                }
            },
        };

        let user = match authenticated {
            Some(user) => user,
            None if needs_auth => {
                info!(document = %document, right = %right, "denied: authentication needed");
                return None;
            }
            None => resolve_user(GUEST_USER_FULLNAME, &ctx.wiki),
        };
        ctx.user = Some(user.clone());
        Some(user)
    }

    /// Whether the `authenticate_<right>` preference flags this right as
    /// requiring a logged-in user. Wiki scope is consulted before space
    /// scope.
    fn needs_auth(&self, right: Right, document: &DocumentReference, ctx: &RequestContext) -> bool {
        let key = format!("authenticate_{right}");
        if let Some(value) = self.preferences.wiki_preference(&ctx.wiki, &key) {
            if let Some(required) = parse_auth_requirement(&value) {
                return required;
            }
        }
        if let Some(space) = document.as_entity().extract(EntityType::Space) {
            if let Some(value) = self.preferences.space_preference(space, &key) {
                if let Some(required) = parse_auth_requirement(&value) {
                    return required;
                }
            }
        }
        false
    }

    fn maybe_show_login(&self, ctx: &RequestContext) {
        if ctx.mode == RequestMode::Interactive && !self.config.hide_login {
            self.authenticator.show_login();
        }
    }

    fn context_user(&self, ctx: &RequestContext) -> DocumentReference {
        ctx.user
            .clone()
            .unwrap_or_else(|| resolve_user(GUEST_USER_FULLNAME, &ctx.wiki))
    }
}

/// Interpret an `authenticate_<right>` preference value: "yes" or a
/// positive number require authentication, anything else defers to the
/// next scope.
fn parse_auth_requirement(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.eq_ignore_ascii_case("yes") {
        return Some(true);
    }
    match value.parse::<i64>() {
        Ok(number) if number > 0 => Some(true),
        Ok(_) => None,
        Err(_) => {
            warn!(value, "failed to interpret authentication preference");
            None
        }
    }
}

impl<L, S, A, P> RightService for DefaultRightService<L, S, A, P>
where
    L: RightLoader,
    S: RuleStore,
    A: Authenticator,
    P: PreferenceSource,
{
    fn check_access(
        &self,
        action: &str,
        document: &DocumentReference,
        ctx: &mut RequestContext,
    ) -> bool {
        debug!(action, document = %document, "checking access");
        let right = Right::from_action(action);
        if right == Right::Illegal {
            error!(action, "no right mapped for action");
        }

        let was_authenticated = ctx.user.is_some();
        let Some(user) = self.authenticate_user(right, document, ctx) else {
            if !was_authenticated {
                self.maybe_show_login(ctx);
            }
            return false;
        };

        let allow = self.check(right, &user, document.as_entity());
        if !allow && !was_authenticated {
            self.maybe_show_login(ctx);
        }
        allow
    }

    fn has_access_level(
        &self,
        right: &str,
        username: &str,
        docname: &str,
        ctx: &RequestContext,
    ) -> bool {
        let document = wikirights_core::resolve_document(docname, &ctx.wiki);
        let user = resolve_user(username, &ctx.wiki);
        let resolved = Right::from_name(right);
        if resolved == Right::Illegal {
            error!(name = right, "no such right");
        }
        self.check(resolved, &user, document.as_entity())
    }

    fn has_programming_rights(&self, ctx: &RequestContext) -> bool {
        let document = ctx.script_document.as_ref().or(ctx.document.as_ref());
        self.has_programming_rights_for(document, ctx)
    }

    fn has_programming_rights_for(
        &self,
        document: Option<&DocumentReference>,
        ctx: &RequestContext,
    ) -> bool {
        match document {
            Some(document) => {
                let author = match self.store.content_author(document) {
                    Ok(author) => author,
                    Err(error) => {
                        error!(document = %document, error = %error,
                               "failed to look up content author");
                        return false;
                    }
                };
                let Some(author) = author else {
                    info!(document = %document, "denied programming rights: no content author");
                    return false;
                };
                // Resolved at the document so a deny placed on the document
                // itself binds its author, wherever the grant came from.
                self.check(Right::Program, &author, document.as_entity())
            }
            None => {
                let user = self.context_user(ctx);
                self.check(Right::Program, &user, &EntityReference::wiki(ctx.wiki.as_str()))
            }
        }
    }

    fn has_admin_rights(&self, ctx: &RequestContext) -> bool {
        let user = self.context_user(ctx);
        match &ctx.document {
            Some(document) => self.check(Right::Admin, &user, document.as_entity()),
            None => {
                warn!("admin rights check without a current document");
                false
            }
        }
    }

    fn list_all_levels(&self) -> Vec<String> {
        Right::all().map(|right| right.as_str().to_owned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_preference_values() {
        assert_eq!(parse_auth_requirement("yes"), Some(true));
        assert_eq!(parse_auth_requirement("Yes"), Some(true));
        assert_eq!(parse_auth_requirement("1"), Some(true));
        assert_eq!(parse_auth_requirement("42"), Some(true));
        assert_eq!(parse_auth_requirement("0"), None);
        assert_eq!(parse_auth_requirement("-3"), None);
        assert_eq!(parse_auth_requirement(""), None);
        assert_eq!(parse_auth_requirement("maybe"), None);
    }
}
