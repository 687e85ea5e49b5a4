// SPDX-License-Identifier: MIT OR Apache-2.0

//! An in-memory wiki implementing every collaborator trait, for driving
//! the engine in tests without a hosting platform.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use wikirights_core::{DocumentReference, EntityReference};

use crate::rule::{RuleKind, SecurityRule};
use crate::traits::{
    Authenticator, ConfigurationSource, GroupService, PreferenceSource, RuleStore,
};

/// Failure scripted through [`MemoryWiki::fail_storage`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("the in-memory wiki was asked to fail")]
pub struct MemoryWikiError;

#[derive(Debug, Default)]
struct WikiState {
    rules: HashMap<(DocumentReference, RuleKind), Vec<SecurityRule>>,
    authors: HashMap<DocumentReference, DocumentReference>,
    creators: HashMap<DocumentReference, DocumentReference>,
    owners: HashMap<String, DocumentReference>,
    members: HashMap<DocumentReference, Vec<DocumentReference>>,
    wiki_preferences: HashMap<(String, String), String>,
    space_preferences: HashMap<(String, String), String>,
    properties: HashMap<String, String>,
    session_user: Option<DocumentReference>,
    read_only: bool,
    fail_storage: bool,
    login_prompts: usize,
}

/// Shared, mutable fake wiki. Cloning yields another handle onto the same
/// state, so the same instance can serve as store, group service,
/// authenticator and preference source at once.
#[derive(Clone, Debug, Default)]
pub struct MemoryWiki {
    state: Arc<RwLock<WikiState>>,
}

impl MemoryWiki {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&self, document: DocumentReference, kind: RuleKind, rule: SecurityRule) {
        self.state
            .write()
            .rules
            .entry((document, kind))
            .or_default()
            .push(rule);
    }

    pub fn clear_rules(&self, document: &DocumentReference, kind: RuleKind) {
        self.state.write().rules.remove(&(document.clone(), kind));
    }

    pub fn set_content_author(&self, document: DocumentReference, author: DocumentReference) {
        self.state.write().authors.insert(document, author);
    }

    pub fn set_creator(&self, document: DocumentReference, creator: DocumentReference) {
        self.state.write().creators.insert(document, creator);
    }

    pub fn set_wiki_owner(&self, wiki: impl Into<String>, owner: DocumentReference) {
        self.state.write().owners.insert(wiki.into(), owner);
    }

    pub fn add_group_member(&self, group: DocumentReference, member: DocumentReference) {
        self.state.write().members.entry(group).or_default().push(member);
    }

    pub fn remove_group_member(&self, group: &DocumentReference, member: &DocumentReference) {
        if let Some(members) = self.state.write().members.get_mut(group) {
            members.retain(|existing| existing != member);
        }
    }

    pub fn set_wiki_preference(
        &self,
        wiki: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.state
            .write()
            .wiki_preferences
            .insert((wiki.into(), key.into()), value.into());
    }

    pub fn set_space_preference(
        &self,
        space: &EntityReference,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.state
            .write()
            .space_preferences
            .insert((space.to_string(), key.into()), value.into());
    }

    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state.write().properties.insert(key.into(), value.into());
    }

    pub fn set_session_user(&self, user: Option<DocumentReference>) {
        self.state.write().session_user = user;
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.state.write().read_only = read_only;
    }

    /// Make every storage access fail, for exercising the fail-closed
    /// path.
    pub fn fail_storage(&self, fail: bool) {
        self.state.write().fail_storage = fail;
    }

    /// How many times the login challenge fired.
    pub fn login_prompts(&self) -> usize {
        self.state.read().login_prompts
    }
}

impl RuleStore for MemoryWiki {
    type Error = MemoryWikiError;

    fn rules(
        &self,
        document: &DocumentReference,
        kind: RuleKind,
    ) -> Result<Vec<SecurityRule>, Self::Error> {
        let state = self.state.read();
        if state.fail_storage {
            return Err(MemoryWikiError);
        }
        Ok(state
            .rules
            .get(&(document.clone(), kind))
            .cloned()
            .unwrap_or_default())
    }

    fn content_author(
        &self,
        document: &DocumentReference,
    ) -> Result<Option<DocumentReference>, Self::Error> {
        let state = self.state.read();
        if state.fail_storage {
            return Err(MemoryWikiError);
        }
        Ok(state.authors.get(document).cloned())
    }

    fn creator(
        &self,
        document: &DocumentReference,
    ) -> Result<Option<DocumentReference>, Self::Error> {
        let state = self.state.read();
        if state.fail_storage {
            return Err(MemoryWikiError);
        }
        Ok(state.creators.get(document).cloned())
    }

    fn wiki_owner(&self, wiki: &str) -> Result<Option<DocumentReference>, Self::Error> {
        let state = self.state.read();
        if state.fail_storage {
            return Err(MemoryWikiError);
        }
        Ok(state.owners.get(wiki).cloned())
    }

    fn is_group_document(&self, document: &DocumentReference) -> Result<bool, Self::Error> {
        let state = self.state.read();
        if state.fail_storage {
            return Err(MemoryWikiError);
        }
        Ok(state.members.contains_key(document))
    }
}

impl GroupService for MemoryWiki {
    type Error = MemoryWikiError;

    fn groups_of(
        &self,
        member: &DocumentReference,
    ) -> Result<Vec<DocumentReference>, Self::Error> {
        let state = self.state.read();
        if state.fail_storage {
            return Err(MemoryWikiError);
        }
        Ok(state
            .members
            .iter()
            .filter(|(_, members)| members.contains(member))
            .map(|(group, _)| group.clone())
            .collect())
    }

    fn members_of(
        &self,
        group: &DocumentReference,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<DocumentReference>, Self::Error> {
        let state = self.state.read();
        if state.fail_storage {
            return Err(MemoryWikiError);
        }
        let members = state.members.get(group).cloned().unwrap_or_default();
        Ok(members.into_iter().skip(offset).take(limit).collect())
    }
}

impl Authenticator for MemoryWiki {
    type Error = MemoryWikiError;

    fn authenticate(&self) -> Result<Option<DocumentReference>, Self::Error> {
        Ok(self.state.read().session_user.clone())
    }

    fn show_login(&self) {
        self.state.write().login_prompts += 1;
    }
}

impl PreferenceSource for MemoryWiki {
    fn wiki_preference(&self, wiki: &str, key: &str) -> Option<String> {
        self.state
            .read()
            .wiki_preferences
            .get(&(wiki.to_owned(), key.to_owned()))
            .cloned()
    }

    fn space_preference(&self, space: &EntityReference, key: &str) -> Option<String> {
        self.state
            .read()
            .space_preferences
            .get(&(space.to_string(), key.to_owned()))
            .cloned()
    }

    fn is_read_only(&self) -> bool {
        self.state.read().read_only
    }
}

impl ConfigurationSource for MemoryWiki {
    fn property(&self, key: &str) -> Option<String> {
        self.state.read().properties.get(key).cloned()
    }
}
