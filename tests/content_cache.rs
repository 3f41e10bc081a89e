mod common;

use common::{ARTICLE, Harness, LANDING, article, image, published_article, title_of};
use published_cache::application::CacheServiceError;
use published_cache::application::repos::{IdKeyMap, RepoError};
use published_cache::cache::{CacheError, content_cache_key, media_cache_key};
use published_cache::domain::content::ContentEntity;
use published_cache::domain::types::{ItemKind, PublishedState};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn unresolved_identities_return_nothing() {
    let harness = Harness::new();
    let content = &harness.context.content;

    for preview in [false, true] {
        assert!(content.get_by_id(404, preview).await.expect("lookup").is_none());
        assert!(
            content
                .get_by_key(Uuid::new_v4(), preview)
                .await
                .expect("lookup")
                .is_none()
        );
        assert!(!content.has_content_by_id(404, preview).await.expect("peek"));
    }
    assert_eq!(harness.backend.content.load_count(), 0);
}

#[tokio::test]
async fn saving_a_draft_leaves_the_published_variant_alone() {
    let harness = Harness::new();
    let content = &harness.context.content;
    let mut entity = published_article(100, "First");
    content.refresh_content(&entity).await.expect("publish");

    entity.set_value("title", "", "", json!("Second"), Some(json!("First")));
    entity.published_state = PublishedState::Published;
    content.refresh_content(&entity).await.expect("save draft");

    let draft = content
        .get_by_id(100, true)
        .await
        .expect("draft read")
        .expect("draft");
    let published = content
        .get_by_id(100, false)
        .await
        .expect("published read")
        .expect("published");

    assert_eq!(title_of(&draft), Some(json!("Second")));
    assert!(draft.content().expect("content").is_draft());
    assert_eq!(title_of(&published), Some(json!("First")));
    assert!(!published.content().expect("content").is_draft());
}

#[tokio::test]
async fn publishing_updates_both_variants() {
    let harness = Harness::new();
    let content = &harness.context.content;
    let mut entity = published_article(101, "First");
    content.refresh_content(&entity).await.expect("publish");

    entity.set_value("title", "", "", json!("Second"), None);
    entity.publish();
    content.refresh_content(&entity).await.expect("republish");

    for preview in [true, false] {
        let model = content
            .get_by_key(entity.key, preview)
            .await
            .expect("read")
            .expect("model");
        assert_eq!(title_of(&model), Some(json!("Second")), "preview = {preview}");
    }
}

#[tokio::test]
async fn unpublishing_leaves_only_the_draft() {
    let harness = Harness::new();
    let content = &harness.context.content;
    let mut entity = published_article(102, "Live");
    content.refresh_content(&entity).await.expect("publish");
    assert!(content.has_content_by_id(102, false).await.expect("peek"));

    entity.unpublish();
    content.refresh_content(&entity).await.expect("unpublish");

    assert!(!content.has_content_by_id(102, false).await.expect("peek"));
    assert!(content.get_by_id(102, false).await.expect("read").is_none());
    assert!(content.get_by_id(102, true).await.expect("read").is_some());
}

#[tokio::test]
async fn delete_clears_both_slots_and_the_identity_map() {
    let harness = Harness::new();
    let content = &harness.context.content;
    let entity = published_article(103, "Doomed");
    content.refresh_content(&entity).await.expect("publish");
    assert!(harness.distributed.contains(&content_cache_key(entity.key, true)));
    assert!(harness.distributed.contains(&content_cache_key(entity.key, false)));

    content.delete_item(103).await.expect("delete");

    assert!(!harness.distributed.contains(&content_cache_key(entity.key, true)));
    assert!(!harness.distributed.contains(&content_cache_key(entity.key, false)));
    for preview in [false, true] {
        assert!(!content.has_content_by_id(103, preview).await.expect("peek"));
        assert!(content.get_by_id(103, preview).await.expect("read").is_none());
    }
    let id_keys = &harness.backend.id_keys;
    assert!(id_keys.resolve_key_for_id(103, ItemKind::Content).is_none());
    assert!(id_keys.resolve_id_for_key(entity.key, ItemKind::Content).is_none());
    assert!(!harness.backend.content.contains(103));
}

#[tokio::test]
async fn peek_never_loads_or_caches() {
    let harness = Harness::new();
    let content = &harness.context.content;
    let entity = published_article(104, "Stored");
    harness.store(&entity);

    assert!(!content.has_content_by_id(104, false).await.expect("peek"));
    assert_eq!(harness.backend.content.load_count(), 0);

    content.get_by_id(104, false).await.expect("read");
    assert!(content.has_content_by_id(104, false).await.expect("peek"));
    assert!(!content.has_content_by_id(104, true).await.expect("peek"));
}

#[tokio::test]
async fn misses_are_not_cached_negatively() {
    let harness = Harness::new();
    let content = &harness.context.content;
    let entity = article(105, "Draft only");
    harness.store(&entity);

    assert!(content.get_by_id(105, false).await.expect("read").is_none());
    assert!(content.get_by_id(105, false).await.expect("read").is_none());

    assert_eq!(harness.backend.content.load_count(), 2);
    assert!(!harness.distributed.contains(&content_cache_key(entity.key, false)));
}

#[tokio::test]
async fn preview_without_a_draft_serves_published_content_as_draft() {
    let harness = Harness::new();
    let entity = published_article(106, "Published");
    harness
        .backend
        .content
        .insert(published_cache::application::CacheNodeFactory.to_content_cache_node(&entity, false));

    let model = harness
        .context
        .content
        .get_by_id(106, true)
        .await
        .expect("read")
        .expect("model");
    let published = model.content().expect("content");

    assert!(published.is_draft());
    assert_eq!(published.value("title", "", ""), Some(&json!("Published")));
    let blocks = published.property("blocks").expect("blocks property");
    assert!(blocks.is_preview());
    assert!(blocks.values_cache_key().contains("[D:"));
}

#[tokio::test]
async fn seed_pins_published_items_of_the_requested_types() {
    let harness = Harness::new();
    let live = published_article(200, "Live");
    let draft = article(201, "Draft");
    let mut landing = ContentEntity::new(202, Uuid::new_v4(), LANDING, "Landing");
    landing.set_value("title", "", "", json!("Welcome"), None);
    landing.publish();
    for entity in [&live, &draft, &landing] {
        harness.store(entity);
    }

    let seeded = harness
        .context
        .content
        .seed(Some(&[ARTICLE][..]))
        .await
        .expect("seed");

    assert_eq!(seeded, 1);
    assert!(harness.distributed.contains(&content_cache_key(live.key, false)));
    assert!(!harness.distributed.contains(&content_cache_key(draft.key, false)));
    assert!(!harness.distributed.contains(&content_cache_key(draft.key, true)));
    assert!(!harness.distributed.contains(&content_cache_key(landing.key, false)));

    let all = harness.context.content.seed(None).await.expect("seed all");
    assert_eq!(all, 2);
    assert!(harness.distributed.contains(&content_cache_key(landing.key, false)));
}

#[tokio::test]
async fn refreshed_values_round_trip_through_the_factory() {
    let harness = Harness::new();
    let content = &harness.context.content;
    let mut entity = published_article(300, "Published title");
    entity.set_value(
        "title",
        "",
        "",
        json!("Edited title"),
        Some(json!("Published title")),
    );
    entity.published_state = PublishedState::Publishing;
    content.refresh_content(&entity).await.expect("refresh");

    let draft = content.get_by_id(300, true).await.expect("read").expect("draft");
    let published = content.get_by_id(300, false).await.expect("read").expect("published");

    for property in &entity.properties {
        let source = &property.values[0];
        assert_eq!(
            draft.content().and_then(|c| c.value(&property.alias, "", "")),
            Some(&source.edited),
            "draft {}",
            property.alias
        );
        assert_eq!(
            published
                .content()
                .and_then(|c| c.value(&property.alias, "", "")),
            source.published.as_ref(),
            "published {}",
            property.alias
        );
    }
}

#[tokio::test]
async fn every_scope_is_completed() {
    let harness = Harness::new();
    let content = &harness.context.content;
    let entity = published_article(400, "Scoped");
    harness.store(&entity);

    content.get_by_id(400, false).await.expect("read");
    content.refresh_content(&entity).await.expect("refresh");
    content.seed(None).await.expect("seed");
    content.delete_item(400).await.expect("delete");

    let scopes = &harness.backend.scopes;
    assert!(scopes.created() >= 4);
    assert_eq!(scopes.completed(), scopes.created());
    assert_eq!(scopes.rolled_back(), 0);
}

#[tokio::test]
async fn repository_failures_propagate_and_are_not_cached() {
    let harness = Harness::new();
    let content = &harness.context.content;
    harness.store(&published_article(500, "Flaky"));
    harness.backend.content.set_failing(true);

    let err = content.get_by_id(500, false).await.expect_err("failure");
    assert!(matches!(
        err,
        CacheServiceError::Cache(CacheError::Populate { .. })
    ));
    assert_eq!(harness.backend.scopes.rolled_back(), 1);

    harness.backend.content.set_failing(false);
    let model = content.get_by_id(500, false).await.expect("read").expect("model");
    assert_eq!(title_of(&model), Some(json!("Flaky")));
}

#[tokio::test]
async fn seeding_surfaces_the_repository_failure() {
    let harness = Harness::new();
    harness.store(&published_article(510, "Unlisted"));
    harness.backend.content.set_failing(true);

    let err = harness.context.content.seed(None).await.expect_err("failure");
    match err {
        CacheServiceError::Repo(RepoError::Persistence(message)) => {
            assert!(message.contains("unavailable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.backend.scopes.rolled_back(), 1);
    assert!(!harness.context.content.has_content_by_id(510, false).await.expect("peek"));
}

#[tokio::test]
async fn distributed_entries_are_shared_between_instances() {
    let harness = Harness::new();
    harness.store(&published_article(600, "Shared"));
    harness.context.content.get_by_id(600, false).await.expect("read");

    let sibling = harness.sibling();
    let model = sibling.content.get_by_id(600, false).await.expect("read").expect("model");

    assert_eq!(title_of(&model), Some(json!("Shared")));
    assert_eq!(harness.backend.content.load_count(), 1);
}

#[tokio::test]
async fn media_lifecycle() {
    let harness = Harness::new();
    let media = &harness.context.media;
    let mut logo = image(700, "Logo");
    media.refresh_media(&logo).await.expect("refresh");

    let model = media.get_by_id(700).await.expect("read").expect("media");
    let content = model.content().expect("content");
    assert_eq!(content.kind(), ItemKind::Media);
    assert_eq!(content.value("alt", "", ""), Some(&json!("Logo")));
    assert!(harness.distributed.contains(&media_cache_key(logo.key)));

    logo.set_value("alt", "", "", json!("New logo"), None);
    media.refresh_media(&logo).await.expect("refresh");
    let model = media.get_by_key(logo.key).await.expect("read").expect("media");
    assert_eq!(
        model.content().and_then(|c| c.value("alt", "", "")),
        Some(&json!("New logo"))
    );

    media.delete_item(700).await.expect("delete");
    assert!(!media.has_media_by_id(700).await.expect("peek"));
    assert!(media.get_by_id(700).await.expect("read").is_none());
    assert!(!harness.distributed.contains(&media_cache_key(logo.key)));
}
