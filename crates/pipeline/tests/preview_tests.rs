//! Integration tests for the annotation preview.

mod common;

use serde_json::json;

use annolink_core::segment::{AlwaysJobLocal, Scope};
use annolink_pipeline::preview_annotations;

use common::FakeService;

#[tokio::test]
async fn job_preview_groups_shapes_by_file() {
    let scope = Scope::Job {
        collection: 1,
        job: 10,
    };
    let service = FakeService::new("source")
        .with_collection(1, &["a/0.jpg", "a/1.jpg", "a/2.jpg", "a/3.jpg"])
        .with_job(1, 10, 2, 3)
        .with_annotations(
            scope,
            json!({
                "shapes": [{"frame": 0}, {"frame": 0}, {"frame": 1}],
                "tracks": [{"shapes": [{"frame": 1}]}],
            }),
        );

    let preview = preview_annotations(&service, scope, &AlwaysJobLocal)
        .await
        .unwrap();

    assert_eq!(preview.total_frames, 2);
    assert_eq!(preview.total_shapes, 3);
    assert_eq!(preview.files["a/2.jpg"].shapes, 2);
    assert_eq!(preview.files["a/3.jpg"].shapes, 1);
    assert_eq!(preview.files["a/3.jpg"].track_shapes, 1);
    assert!(!preview.files.contains_key("a/0.jpg"));
}

#[tokio::test]
async fn preview_of_unknown_job_fails() {
    let service = FakeService::new("source").with_collection(1, &["a/0.jpg"]);

    let result = preview_annotations(
        &service,
        Scope::Job {
            collection: 1,
            job: 77,
        },
        &AlwaysJobLocal,
    )
    .await;

    assert!(result.is_err());
}
