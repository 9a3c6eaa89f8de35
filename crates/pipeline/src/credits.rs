//! Credit reconciliation after a photo's OCR verdict.

use sqlx::PgPool;

use finishpix_core::credits::refund_due;
use finishpix_db::models::photo::Photo;
use finishpix_db::repositories::{CreditRepo, RefundOutcome};

/// Applies the refund rule once a photo's bib outcome is known.
///
/// The in-memory check on the loaded photo row is only a fast path; the
/// authoritative guard is the conditional flag flip inside
/// [`CreditRepo::refund_for_photo`], which serialises racing workers.
pub struct CreditReconciler {
    pool: PgPool,
    credits_per_photo: i32,
}

impl CreditReconciler {
    pub fn new(pool: PgPool, credits_per_photo: i32) -> Self {
        Self {
            pool,
            credits_per_photo,
        }
    }

    /// Refund the photo's credit when it was charged and OCR found no
    /// bib numbers. Returns whether a refund was actually issued.
    pub async fn reconcile(&self, photo: &Photo, bib_count: usize) -> Result<bool, sqlx::Error> {
        if !refund_due(photo.credit_deducted, photo.credit_refunded, bib_count) {
            return Ok(false);
        }

        let reason = format!("No bib number found on photo {}", photo.id);
        let outcome = CreditRepo::refund_for_photo(
            &self.pool,
            photo.uploader_user_id,
            photo.id,
            photo.event_id,
            self.credits_per_photo,
            &reason,
        )
        .await?;

        match outcome {
            RefundOutcome::Refunded(row) => {
                tracing::info!(
                    photo_id = photo.id,
                    user_id = photo.uploader_user_id,
                    amount = row.amount,
                    "credit refunded for bib-less photo",
                );
                Ok(true)
            }
            RefundOutcome::NotDue => Ok(false),
        }
    }
}
