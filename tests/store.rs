//! Document Store Integration Tests
//!
//! Selection, live updates, and snapshot persistence as the presentation
//! layer uses them.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use lurnix::adapters::MemoryStore;
use lurnix::core::{
    DocumentAggregator, DocumentStore, LifecycleController, SelectionError, SimulatedPipeline,
};
use lurnix::domain::{DocumentStatus, SubmissionRequest};

#[tokio::test(start_paused = true)]
async fn test_selection_tracks_latest_state() {
    let documents = DocumentStore::new();
    let controller = LifecycleController::new(
        documents.clone(),
        Arc::new(SimulatedPipeline::new(Duration::from_secs(3))),
    )
    .with_pending_delay(Duration::from_secs(2));

    let doc = controller
        .submit(SubmissionRequest::new("page.png", "image/png", 512, "ta"))
        .await
        .unwrap();

    // Not yet viewable
    assert!(documents.first_viewable().await.is_none());
    assert!(matches!(
        documents.select_viewable(&doc.id).await,
        Err(SelectionError::NotViewable { status: DocumentStatus::Pending, .. })
    ));

    documents.select(&doc.id).await.unwrap();
    controller.wait(&doc.id).await;

    let selected = documents.selected().await.unwrap();
    assert_eq!(selected.status, DocumentStatus::Done);
    assert!(selected.channels.original_text.is_some());
    assert_eq!(documents.first_viewable().await.unwrap().id, doc.id);
}

#[tokio::test]
async fn test_snapshot_keeps_order_and_selection() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("home").join("catalog.json");

    let store = MemoryStore::with_entries([
        ("zebra/original-text.txt", "z"),
        ("apple/original-text.txt", "a"),
    ]);
    let documents = DocumentStore::new();
    DocumentAggregator::new(Arc::new(store))
        .aggregate_into(&documents)
        .await
        .unwrap();
    documents
        .select_viewable(&"apple".into())
        .await
        .unwrap();
    documents.save(&path).await.unwrap();

    let loaded = DocumentStore::load(&path).await.unwrap();
    let ids: Vec<_> = loaded
        .list()
        .await
        .into_iter()
        .map(|d| d.id.as_str().to_string())
        .collect();
    assert_eq!(ids, vec!["zebra", "apple"]);
    assert_eq!(loaded.selected().await.unwrap().id.as_str(), "apple");
}

#[tokio::test]
async fn test_corrupt_snapshot_is_an_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("catalog.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(DocumentStore::load(&path).await.is_err());
}
