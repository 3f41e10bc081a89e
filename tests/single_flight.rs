mod common;

use std::time::Duration;

use common::{Harness, published_article, title_of};
use published_cache::cache::CacheConfig;
use published_cache::infra::memory::{InMemoryBackend, InMemoryContentRepository};
use serde_json::json;

fn slow_harness() -> Harness {
    let backend = InMemoryBackend::with_content_repository(|id_keys| {
        InMemoryContentRepository::new(id_keys).with_load_delay(Duration::from_millis(50))
    });
    Harness::with_backend(backend, &CacheConfig::default())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reads_of_a_missing_item_load_it_once() {
    let harness = slow_harness();
    harness.store(&published_article(1, "Hot"));

    let readers: Vec<_> = (0..32)
        .map(|_| {
            let content = harness.context.content.clone();
            tokio::spawn(async move { content.get_by_id(1, false).await })
        })
        .collect();

    for reader in readers {
        let model = reader
            .await
            .expect("reader task")
            .expect("read")
            .expect("model");
        assert_eq!(title_of(&model), Some(json!("Hot")));
    }
    assert_eq!(harness.backend.content.load_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn draft_and_published_reads_are_separate_flights() {
    let harness = slow_harness();
    harness.store(&published_article(2, "Both"));

    let published = harness.context.content.clone();
    let draft = harness.context.content.clone();
    let (published, draft) = tokio::join!(
        published.get_by_id(2, false),
        draft.get_by_id(2, true)
    );

    assert!(published.expect("published read").is_some());
    assert!(draft.expect("draft read").is_some());
    assert_eq!(harness.backend.content.load_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn an_abandoned_reader_does_not_cancel_the_load() {
    let harness = slow_harness();
    harness.store(&published_article(3, "Patient"));

    let abandoned = {
        let content = harness.context.content.clone();
        tokio::spawn(async move { content.get_by_id(3, false).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    abandoned.abort();

    let model = harness
        .context
        .content
        .get_by_id(3, false)
        .await
        .expect("read")
        .expect("model");

    assert_eq!(title_of(&model), Some(json!("Patient")));
    assert_eq!(harness.backend.content.load_count(), 1);
}
