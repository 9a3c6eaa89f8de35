//! Integration tests for custom watermark images: storing, clearing,
//! and the fallbacks around missing events and files.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, multipart_request, tiny_png, Part};
use sqlx::PgPool;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: storing a watermark writes the object and flips the event
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn store_watermark_updates_event_and_storage(pool: PgPool) {
    let harness = common::build_test_harness(pool.clone());
    let user = common::seed_user(&pool, "wm@example.com").await;
    let event = common::seed_event(&pool, user.id).await;

    let png = tiny_png();
    let request = multipart_request(
        Method::PUT,
        &format!("/api/events/{}/watermark", event.id),
        &[Part::File {
            name: "image",
            file_name: "logo.png",
            content_type: "image/png",
            bytes: &png,
        }],
    );

    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let expected_key = format!("watermarks/{}.png", event.id);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], event.id);
    assert_eq!(json["data"]["watermark_image_key"], expected_key);
    assert!(harness.storage.contains(&expected_key));
}

// ---------------------------------------------------------------------------
// Test: clearing removes the key and is idempotent
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn clear_watermark_resets_event_and_is_idempotent(pool: PgPool) {
    let harness = common::build_test_harness(pool.clone());
    let user = common::seed_user(&pool, "wmclear@example.com").await;
    let event = common::seed_event(&pool, user.id).await;

    let png = tiny_png();
    let request = multipart_request(
        Method::PUT,
        &format!("/api/events/{}/watermark", event.id),
        &[Part::File {
            name: "image",
            file_name: "logo.png",
            content_type: "image/png",
            bytes: &png,
        }],
    );
    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let delete = |app: axum::Router| async move {
        app.oneshot(
            axum::http::Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/events/{}/watermark", event.id))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    };

    let response = delete(harness.app.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["watermark_image_key"].is_null());
    assert!(!harness.storage.contains(&format!("watermarks/{}.png", event.id)));

    // Clearing again is a no-op, not an error.
    let response = delete(harness.app.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Test: a request without a file part is rejected
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn store_watermark_requires_a_file(pool: PgPool) {
    let harness = common::build_test_harness(pool.clone());
    let user = common::seed_user(&pool, "wmempty@example.com").await;
    let event = common::seed_event(&pool, user.id).await;

    let request = multipart_request(
        Method::PUT,
        &format!("/api/events/{}/watermark", event.id),
        &[Part::Text {
            name: "note",
            value: "no image here",
        }],
    );

    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Test: unknown events 404 on both methods
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_event_returns_404(pool: PgPool) {
    let harness = common::build_test_harness(pool);

    let png = tiny_png();
    let request = multipart_request(
        Method::PUT,
        "/api/events/424242/watermark",
        &[Part::File {
            name: "image",
            file_name: "logo.png",
            content_type: "image/png",
            bytes: &png,
        }],
    );
    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = harness
        .app
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method(Method::DELETE)
                .uri("/api/events/424242/watermark")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
