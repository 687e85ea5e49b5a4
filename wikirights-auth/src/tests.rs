// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;
use std::thread;

use wikirights_core::{DocumentReference, Right, resolve_user};

use crate::cache::{RightCache, RightCacheEntry};
use crate::config::SecurityConfig;
use crate::context::{RequestContext, RequestMode};
use crate::invalidate::CacheInvalidator;
use crate::load::DefaultRightLoader;
use crate::rule::{RuleKind, SecurityRule};
use crate::service::{DefaultRightService, RightService};
use crate::shim::CachingRightService;
use crate::test_utils::MemoryWiki;

type Engine =
    DefaultRightService<DefaultRightLoader<MemoryWiki, MemoryWiki>, MemoryWiki, MemoryWiki, MemoryWiki>;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn engine(wiki: &MemoryWiki) -> (Engine, Arc<RightCache>) {
    let config = SecurityConfig::default();
    let cache = Arc::new(RightCache::new(config.cache_capacity));
    let loader = DefaultRightLoader::new(cache.clone(), wiki.clone(), wiki.clone());
    let service = DefaultRightService::new(
        cache.clone(),
        loader,
        wiki.clone(),
        wiki.clone(),
        wiki.clone(),
        config,
    );
    (service, cache)
}

fn ctx() -> RequestContext {
    RequestContext::new("xwiki")
}

fn main_page() -> DocumentReference {
    DocumentReference::new("xwiki", "Main", "WebHome")
}

fn space_preferences() -> DocumentReference {
    DocumentReference::new("xwiki", "Main", "WebPreferences")
}

fn wiki_preferences() -> DocumentReference {
    DocumentReference::new("xwiki", "XWiki", "XWikiPreferences")
}

fn user(name: &str) -> DocumentReference {
    resolve_user(name, "xwiki")
}

#[test]
fn no_rules_anywhere_resolves_to_default_deny() {
    let wiki = MemoryWiki::new();
    let (service, cache) = engine(&wiki);

    for right in Right::all() {
        assert!(!service.has_access_level(right.as_str(), "Alice", "Main.WebHome", &ctx()));
    }
    // The whole chain got cached as rule-free.
    let doc_key = cache.key_for(main_page().as_entity());
    assert_eq!(cache.entry(&doc_key), Some(RightCacheEntry::HaveNoObjects));
}

#[test]
fn document_rule_grants_right_to_named_user() {
    let wiki = MemoryWiki::new();
    wiki.add_rule(
        main_page(),
        RuleKind::Local,
        SecurityRule::allow([Right::View]).for_user(user("Alice")),
    );
    let (service, _) = engine(&wiki);

    assert!(service.has_access_level("view", "Alice", "Main.WebHome", &ctx()));
    assert!(!service.has_access_level("edit", "Alice", "Main.WebHome", &ctx()));
    assert!(!service.has_access_level("view", "Mallory", "Main.WebHome", &ctx()));
}

#[test]
fn group_allow_on_space_applies_to_documents_below() {
    let wiki = MemoryWiki::new();
    let staff = user("StaffGroup");
    wiki.add_group_member(staff.clone(), user("Alice"));
    wiki.add_rule(
        space_preferences(),
        RuleKind::Global,
        SecurityRule::allow([Right::View]).for_group(staff),
    );
    let (service, _) = engine(&wiki);

    assert!(service.has_access_level("view", "Alice", "Main.WebHome", &ctx()));
    assert!(!service.has_access_level("view", "Mallory", "Main.WebHome", &ctx()));
}

#[test]
fn nested_group_membership_is_expanded_with_cycle_protection() {
    let wiki = MemoryWiki::new();
    let staff = user("StaffGroup");
    let employees = user("EmployeeGroup");
    wiki.add_group_member(staff.clone(), user("Alice"));
    wiki.add_group_member(employees.clone(), staff.clone());
    // Membership cycle between the two groups must not hang the closure.
    wiki.add_group_member(staff.clone(), employees.clone());
    wiki.add_group_member(staff.clone(), staff.clone());
    wiki.add_rule(
        main_page(),
        RuleKind::Local,
        SecurityRule::allow([Right::View]).for_group(employees),
    );
    let (service, _) = engine(&wiki);

    assert!(service.has_access_level("view", "Alice", "Main.WebHome", &ctx()));
}

#[test]
fn document_deny_overrides_wiki_grant_for_programming_rights() {
    init_logging();
    let wiki = MemoryWiki::new();
    let author = user("Author");
    let page = main_page();
    wiki.set_content_author(page.clone(), author.clone());
    wiki.add_rule(
        wiki_preferences(),
        RuleKind::Global,
        SecurityRule::allow([Right::Program]).for_user(author.clone()),
    );

    // The wiki-level grant alone is enough.
    let (service, _) = engine(&wiki);
    assert!(service.has_programming_rights_for(Some(&page), &ctx()));

    // An explicit deny on the document itself wins over the grant.
    wiki.add_rule(
        page.clone(),
        RuleKind::Local,
        SecurityRule::deny([Right::Program]).for_user(author),
    );
    let (service, _) = engine(&wiki);
    assert!(!service.has_programming_rights_for(Some(&page), &ctx()));
}

#[test]
fn programming_rights_require_a_content_author() {
    let wiki = MemoryWiki::new();
    let (service, _) = engine(&wiki);
    assert!(!service.has_programming_rights_for(Some(&main_page()), &ctx()));

    // Without a document the session user is checked at the wiki.
    wiki.add_rule(
        wiki_preferences(),
        RuleKind::Global,
        SecurityRule::allow([Right::Program]).for_user(user("Alice")),
    );
    let (service, _) = engine(&wiki);
    let context = ctx().with_user(user("Alice"));
    assert!(service.has_programming_rights_for(None, &context));
    assert!(service.has_programming_rights(&context));
}

#[test]
fn read_only_mode_forces_edit_denial() {
    let wiki = MemoryWiki::new();
    wiki.add_rule(
        main_page(),
        RuleKind::Local,
        SecurityRule::allow([Right::View, Right::Edit]).for_user(user("Alice")),
    );
    let (service, _) = engine(&wiki);
    let page = main_page();

    let mut context = ctx().with_user(user("Alice"));
    assert!(service.check_access("edit", &page, &mut context));

    wiki.set_read_only(true);
    let mut context = ctx().with_user(user("Alice"));
    assert!(!service.check_access("edit", &page, &mut context));
    // Reading is unaffected by read-only mode.
    assert!(service.check_access("view", &page, &mut context));
}

#[test]
fn repeated_checks_are_idempotent_and_leave_the_cache_alone() {
    let wiki = MemoryWiki::new();
    wiki.add_rule(
        main_page(),
        RuleKind::Local,
        SecurityRule::allow([Right::View]).for_user(user("Alice")),
    );
    let (service, cache) = engine(&wiki);

    let first = service.has_access_level("view", "Alice", "Main.WebHome", &ctx());
    let populated = cache.len();
    let second = service.has_access_level("view", "Alice", "Main.WebHome", &ctx());

    assert!(first && second);
    assert_eq!(cache.len(), populated);
}

#[test]
fn removed_leaf_falls_back_to_the_parent_decision() {
    let wiki = MemoryWiki::new();
    let staff = user("StaffGroup");
    wiki.add_group_member(staff.clone(), user("Alice"));
    wiki.add_rule(
        space_preferences(),
        RuleKind::Global,
        SecurityRule::allow([Right::View]).for_group(staff),
    );
    let (service, cache) = engine(&wiki);

    assert!(service.has_access_level("view", "Alice", "Main.WebHome", &ctx()));

    // Dropping the document's rule-free marker must only cost a reload,
    // never change the decision taken at the space.
    cache.remove(&cache.key_for(main_page().as_entity()));
    assert!(service.has_access_level("view", "Alice", "Main.WebHome", &ctx()));
}

#[test]
fn concurrent_cold_loads_leave_one_consistent_entry() {
    init_logging();
    let wiki = MemoryWiki::new();
    wiki.add_rule(
        main_page(),
        RuleKind::Local,
        SecurityRule::allow([Right::View]).for_user(user("Alice")),
    );
    let (service, cache) = engine(&wiki);

    thread::scope(|scope| {
        for _ in 0..2 {
            scope.spawn(|| {
                assert!(service.has_access_level("view", "Alice", "Main.WebHome", &ctx()));
            });
        }
    });

    // Exactly one pair entry survives and it matches the computed level.
    let doc_key = cache.key_for(main_page().as_entity());
    let user_key = cache.key_for(user("Alice").as_entity());
    match cache.user_entry(&user_key, &doc_key) {
        Some(RightCacheEntry::Level(level)) => assert!(level.allows(Right::View)),
        other => panic!("expected a resolved level, found {other:?}"),
    }
    // Wiki, space, document and the single pair entry.
    assert_eq!(cache.len(), 4);
}

#[test]
fn group_membership_invalidation_forces_a_cold_reload() {
    let wiki = MemoryWiki::new();
    let staff = user("StaffGroup");
    let alice = user("Alice");
    wiki.add_group_member(staff.clone(), alice.clone());
    wiki.add_rule(
        space_preferences(),
        RuleKind::Global,
        SecurityRule::allow([Right::View]).for_group(staff.clone()),
    );
    let (service, cache) = engine(&wiki);

    assert!(service.has_access_level("view", "Alice", "Main.WebHome", &ctx()));

    // Invalidate while the outgoing membership is still readable, then
    // persist the removal.
    let invalidator = CacheInvalidator::new(cache.clone(), wiki.clone(), wiki.clone());
    invalidator.invalidate_group_members(&staff).unwrap();
    wiki.remove_group_member(&staff, &alice);

    // The previously cached allow is gone and the reload denies.
    let space_key = cache.key_for(main_page().as_entity().parent().unwrap());
    let user_key = cache.key_for(alice.as_entity());
    assert_eq!(cache.user_entry(&user_key, &space_key), None);
    assert!(!service.has_access_level("view", "Alice", "Main.WebHome", &ctx()));
}

#[test]
fn document_update_invalidates_its_subtree() {
    let wiki = MemoryWiki::new();
    let owner = user("Owner");
    wiki.set_wiki_owner("xwiki", owner.clone());
    let (service, cache) = engine(&wiki);

    // Implicit grant: the wiki owner administers any document of the wiki.
    assert!(service.has_access_level("admin", "Owner", "Main.WebHome", &ctx()));
    assert!(!service.has_access_level("admin", "Alice", "Main.WebHome", &ctx()));

    // An explicit deny on the document beats the implicit grant, once the
    // stale cache entries for the document are pushed out.
    wiki.add_rule(
        main_page(),
        RuleKind::Local,
        SecurityRule::deny([Right::Admin]).for_user(owner),
    );
    let invalidator = CacheInvalidator::new(cache, wiki.clone(), wiki.clone());
    invalidator.document_updated(&main_page()).unwrap();
    assert!(!service.has_access_level("admin", "Owner", "Main.WebHome", &ctx()));
}

#[test]
fn creator_may_delete_their_document() {
    let wiki = MemoryWiki::new();
    wiki.set_creator(main_page(), user("Alice"));
    let (service, _) = engine(&wiki);

    assert!(service.has_access_level("delete", "Alice", "Main.WebHome", &ctx()));
    assert!(!service.has_access_level("delete", "Mallory", "Main.WebHome", &ctx()));
}

#[test]
fn anonymous_denial_triggers_the_login_challenge() {
    let wiki = MemoryWiki::new();
    let (service, _) = engine(&wiki);
    let page = main_page();

    let mut context = ctx();
    assert!(!service.check_access("edit", &page, &mut context));
    assert_eq!(wiki.login_prompts(), 1);

    // Remote API requests are denied silently as guests.
    let mut context = ctx().with_mode(RequestMode::Remote);
    assert!(!service.check_access("edit", &page, &mut context));
    assert_eq!(wiki.login_prompts(), 1);
    assert_eq!(context.user, Some(user("XWikiGuest")));
}

#[test]
fn authentication_preference_denies_anonymous_requests() {
    let wiki = MemoryWiki::new();
    wiki.set_wiki_preference("xwiki", "authenticate_edit", "yes");
    wiki.add_rule(
        main_page(),
        RuleKind::Local,
        SecurityRule::allow([Right::Edit]).for_user(user("Alice")),
    );
    let (service, _) = engine(&wiki);
    let page = main_page();

    let mut context = ctx();
    assert!(!service.check_access("edit", &page, &mut context));
    assert_eq!(wiki.login_prompts(), 1);

    // Once a session exists the same request goes through, and the
    // authenticated user is recorded back into the context.
    wiki.set_session_user(Some(user("Alice")));
    let mut context = ctx();
    assert!(service.check_access("edit", &page, &mut context));
    assert_eq!(context.user, Some(user("Alice")));
}

#[test]
fn superadmin_bypasses_explicit_denials() {
    let wiki = MemoryWiki::new();
    wiki.add_rule(
        main_page(),
        RuleKind::Local,
        SecurityRule::deny([Right::Edit]).for_user(user("superadmin")),
    );
    let (service, _) = engine(&wiki);

    assert!(service.has_access_level("edit", "superadmin", "Main.WebHome", &ctx()));
}

#[test]
fn unmapped_actions_are_denied_even_for_privileged_users() {
    let wiki = MemoryWiki::new();
    let (service, _) = engine(&wiki);
    let mut context = ctx().with_user(user("superadmin"));
    assert!(!service.check_access("frobnicate", &main_page(), &mut context));
}

#[test]
fn storage_failure_fails_closed() {
    let wiki = MemoryWiki::new();
    wiki.add_rule(
        main_page(),
        RuleKind::Local,
        SecurityRule::allow([Right::View]).for_user(user("Alice")),
    );
    wiki.fail_storage(true);
    let (service, _) = engine(&wiki);

    assert!(!service.has_access_level("view", "Alice", "Main.WebHome", &ctx()));
}

#[test]
fn shim_exposes_wiki_admin_rights() {
    let wiki = MemoryWiki::new();
    wiki.add_rule(
        wiki_preferences(),
        RuleKind::Global,
        SecurityRule::allow([Right::Admin]).for_user(user("Bob")),
    );
    let (service, _) = engine(&wiki);
    let shim = CachingRightService::new(service);

    let context = ctx().with_user(user("Bob"));
    assert!(shim.has_wiki_admin_rights(&context));
    assert!(!shim.has_wiki_admin_rights(&ctx()));

    let levels = shim.list_all_levels();
    assert!(levels.contains(&"programming".to_owned()));
    assert_eq!(levels.len(), Right::COUNT);
}
