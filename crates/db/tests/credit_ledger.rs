//! Integration tests for the credit ledger against a real database:
//! - purchase / deduction / refund transactions with before/after balances
//! - insufficient-balance rejection writes nothing
//! - refund guards: only once, only when charged, only with zero bibs
//! - concurrent refund attempts settle exactly one
//! - bib replacement is atomic per OCR run

use finishpix_core::bibs::BibCandidate;
use finishpix_db::models::credit::CreditKind;
use finishpix_db::models::event::CreateEvent;
use finishpix_db::models::photo::CreatePhoto;
use finishpix_db::models::user::CreateUser;
use finishpix_db::repositories::{
    BibNumberRepo, CreditRepo, DeductOutcome, EventRepo, PhotoRepo, RefundOutcome, UserRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, email: &str) -> finishpix_db::models::user::User {
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            display_name: "Test Photographer".to_string(),
        },
    )
    .await
    .unwrap()
}

async fn seed_event(pool: &PgPool, owner: i64) -> finishpix_db::models::event::Event {
    EventRepo::create(
        pool,
        &CreateEvent {
            owner_user_id: owner,
            name: "Harbor Half".to_string(),
            watermark_text: None,
            auto_retouch_enabled: None,
            face_search_enabled: None,
            label_detection_enabled: None,
            start_numbers: None,
        },
    )
    .await
    .unwrap()
}

async fn seed_photo(
    pool: &PgPool,
    event_id: i64,
    uploader: i64,
    key: &str,
    deducted: bool,
) -> finishpix_db::models::photo::Photo {
    let photos = PhotoRepo::create_batch(
        pool,
        event_id,
        uploader,
        &[CreatePhoto {
            file_name: "finish.jpg".to_string(),
            storage_key: key.to_string(),
            content_type: "image/jpeg".to_string(),
            size_bytes: 1024,
            credit_deducted: deducted,
        }],
    )
    .await
    .unwrap();
    photos.into_iter().next().unwrap()
}

// ---------------------------------------------------------------------------
// Test: purchase raises the balance and appends a positive row
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn purchase_appends_positive_row(pool: PgPool) {
    let user = seed_user(&pool, "buyer@example.com").await;

    let row = CreditRepo::record_purchase(&pool, user.id, 100, Some("Starter pack"))
        .await
        .unwrap();

    assert_eq!(row.kind_id, CreditKind::Purchase.id());
    assert_eq!(row.amount, 100);
    assert_eq!(row.balance_before, 0);
    assert_eq!(row.balance_after, 100);
    assert_eq!(CreditRepo::balance_of(&pool, user.id).await.unwrap(), 100);
}

// ---------------------------------------------------------------------------
// Test: deduction lowers the balance, keeps before/after consistent
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn deduction_lowers_balance(pool: PgPool) {
    let user = seed_user(&pool, "p1@example.com").await;
    let event = seed_event(&pool, user.id).await;
    CreditRepo::record_purchase(&pool, user.id, 100, None)
        .await
        .unwrap();

    let outcome =
        CreditRepo::deduct_for_batch(&pool, user.id, 30, event.id, "Premium batch of 10")
            .await
            .unwrap();

    let row = match outcome {
        DeductOutcome::Deducted(row) => row,
        other => panic!("expected deduction, got {other:?}"),
    };
    assert_eq!(row.amount, -30);
    assert_eq!(row.balance_before, 100);
    assert_eq!(row.balance_after, 70);
    assert_eq!(CreditRepo::balance_of(&pool, user.id).await.unwrap(), 70);
}

// ---------------------------------------------------------------------------
// Test: insufficient balance rejects and writes nothing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insufficient_balance_writes_nothing(pool: PgPool) {
    let user = seed_user(&pool, "broke@example.com").await;
    let event = seed_event(&pool, user.id).await;
    CreditRepo::record_purchase(&pool, user.id, 10, None)
        .await
        .unwrap();

    let outcome = CreditRepo::deduct_for_batch(&pool, user.id, 30, event.id, "Premium batch")
        .await
        .unwrap();

    match outcome {
        DeductOutcome::Insufficient {
            required,
            available,
        } => {
            assert_eq!(required, 30);
            assert_eq!(available, 10);
        }
        other => panic!("expected insufficient, got {other:?}"),
    }
    assert_eq!(CreditRepo::balance_of(&pool, user.id).await.unwrap(), 10);

    let ledger = CreditRepo::list_for_user(&pool, user.id, None).await.unwrap();
    assert_eq!(ledger.len(), 1, "only the purchase row should exist");
}

// ---------------------------------------------------------------------------
// Test: refund flips the photo flag and appends a refund row
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn refund_settles_once_with_reason(pool: PgPool) {
    let user = seed_user(&pool, "p2@example.com").await;
    let event = seed_event(&pool, user.id).await;
    CreditRepo::record_purchase(&pool, user.id, 100, None)
        .await
        .unwrap();
    CreditRepo::deduct_for_batch(&pool, user.id, 3, event.id, "Premium batch of 1")
        .await
        .unwrap();
    let photo = seed_photo(&pool, event.id, user.id, "orig/1/a.jpg", true).await;

    let reason = format!("No bib number found on photo {}", photo.id);
    let outcome =
        CreditRepo::refund_for_photo(&pool, user.id, photo.id, event.id, 3, &reason)
            .await
            .unwrap();

    let row = match outcome {
        RefundOutcome::Refunded(row) => row,
        other => panic!("expected refund, got {other:?}"),
    };
    assert_eq!(row.kind_id, CreditKind::Refund.id());
    assert_eq!(row.amount, 3);
    assert_eq!(row.balance_before, 97);
    assert_eq!(row.balance_after, 100);
    assert_eq!(row.photo_id, Some(photo.id));
    assert_eq!(row.reason.as_deref(), Some(reason.as_str()));

    let photo = PhotoRepo::find_by_id(&pool, photo.id).await.unwrap().unwrap();
    assert!(photo.credit_refunded);

    // A second attempt finds the flag already set.
    let again = CreditRepo::refund_for_photo(&pool, user.id, photo.id, event.id, 3, &reason)
        .await
        .unwrap();
    assert!(matches!(again, RefundOutcome::NotDue));
    assert_eq!(CreditRepo::balance_of(&pool, user.id).await.unwrap(), 100);
}

// ---------------------------------------------------------------------------
// Test: refund guards (never charged / bibs present)
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn refund_not_due_without_charge_or_with_bibs(pool: PgPool) {
    let user = seed_user(&pool, "p3@example.com").await;
    let event = seed_event(&pool, user.id).await;
    CreditRepo::record_purchase(&pool, user.id, 50, None)
        .await
        .unwrap();

    // Standard-tier photo: never charged.
    let free_photo = seed_photo(&pool, event.id, user.id, "orig/1/free.jpg", false).await;
    let outcome =
        CreditRepo::refund_for_photo(&pool, user.id, free_photo.id, event.id, 3, "no bibs")
            .await
            .unwrap();
    assert!(matches!(outcome, RefundOutcome::NotDue));

    // Charged photo, but OCR recorded a bib.
    let hit_photo = seed_photo(&pool, event.id, user.id, "orig/1/hit.jpg", true).await;
    BibNumberRepo::replace_for_photo(
        &pool,
        hit_photo.id,
        "cloud",
        0.93,
        &[BibCandidate {
            number: "1042".to_string(),
            confidence: 0.93,
        }],
    )
    .await
    .unwrap();
    let outcome =
        CreditRepo::refund_for_photo(&pool, user.id, hit_photo.id, event.id, 3, "no bibs")
            .await
            .unwrap();
    assert!(matches!(outcome, RefundOutcome::NotDue));

    assert_eq!(CreditRepo::balance_of(&pool, user.id).await.unwrap(), 50);
}

// ---------------------------------------------------------------------------
// Test: concurrent refund attempts settle exactly one
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_refunds_settle_exactly_one(pool: PgPool) {
    let user = seed_user(&pool, "p4@example.com").await;
    let event = seed_event(&pool, user.id).await;
    CreditRepo::record_purchase(&pool, user.id, 10, None)
        .await
        .unwrap();
    let photo = seed_photo(&pool, event.id, user.id, "orig/1/race.jpg", true).await;

    let (a, b) = tokio::join!(
        CreditRepo::refund_for_photo(&pool, user.id, photo.id, event.id, 3, "no bibs"),
        CreditRepo::refund_for_photo(&pool, user.id, photo.id, event.id, 3, "no bibs"),
    );

    let refunded = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|o| matches!(o, RefundOutcome::Refunded(_)))
        .count();
    assert_eq!(refunded, 1, "exactly one attempt may settle");
    assert_eq!(CreditRepo::balance_of(&pool, user.id).await.unwrap(), 13);
}

// ---------------------------------------------------------------------------
// Test: batch refund restores the full charge without a photo guard
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn batch_refund_restores_full_charge(pool: PgPool) {
    let user = seed_user(&pool, "p5@example.com").await;
    let event = seed_event(&pool, user.id).await;
    CreditRepo::record_purchase(&pool, user.id, 50, None)
        .await
        .unwrap();
    CreditRepo::deduct_for_batch(&pool, user.id, 12, event.id, "Premium batch of 4")
        .await
        .unwrap();
    assert_eq!(CreditRepo::balance_of(&pool, user.id).await.unwrap(), 38);

    let row = CreditRepo::record_batch_refund(
        &pool,
        user.id,
        12,
        event.id,
        "Batch submission failed before photos were stored",
    )
    .await
    .unwrap();

    assert_eq!(row.kind_id, CreditKind::Refund.id());
    assert_eq!(row.amount, 12);
    assert_eq!(row.balance_before, 38);
    assert_eq!(row.balance_after, 50);
    assert_eq!(row.photo_id, None);
    assert_eq!(row.event_id, Some(event.id));
    assert_eq!(CreditRepo::balance_of(&pool, user.id).await.unwrap(), 50);
}

// ---------------------------------------------------------------------------
// Test: each OCR run replaces the photo's bib rows wholesale
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn bib_replacement_is_atomic_per_run(pool: PgPool) {
    let user = seed_user(&pool, "p6@example.com").await;
    let event = seed_event(&pool, user.id).await;
    let photo = seed_photo(&pool, event.id, user.id, "orig/1/b.jpg", false).await;

    let first = vec![
        BibCandidate { number: "101".into(), confidence: 0.8 },
        BibCandidate { number: "202".into(), confidence: 0.7 },
    ];
    BibNumberRepo::replace_for_photo(&pool, photo.id, "local", 0.8, &first)
        .await
        .unwrap();

    let second = vec![BibCandidate { number: "303".into(), confidence: 0.95 }];
    BibNumberRepo::replace_for_photo(&pool, photo.id, "cloud", 0.95, &second)
        .await
        .unwrap();

    let rows = BibNumberRepo::list_for_photo(&pool, photo.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].number, "303");

    let photo = PhotoRepo::find_by_id(&pool, photo.id).await.unwrap().unwrap();
    assert_eq!(photo.ocr_engine.as_deref(), Some("cloud"));
    assert_eq!(photo.ocr_confidence, Some(0.95));
}
