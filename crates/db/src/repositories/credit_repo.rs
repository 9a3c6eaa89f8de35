//! Repository for the append-only credit ledger.
//!
//! Every balance change follows the same discipline inside one
//! transaction: lock the user row (`FOR UPDATE`, which serialises
//! concurrent changes for the same user while leaving other users
//! untouched), read the balance, write the new balance, append a ledger
//! row carrying both. `users.credits` therefore always equals the signed
//! sum of the user's ledger.

use sqlx::PgPool;

use finishpix_core::types::DbId;

use crate::models::credit::{CreditKind, CreditTransaction};

/// Column list for `credit_transactions` queries.
const COLUMNS: &str = "\
    id, user_id, kind_id, amount, balance_before, balance_after, \
    reason, photo_id, event_id, created_at";

/// Maximum page size for ledger listing.
const MAX_LIMIT: i64 = 200;

/// Default page size for ledger listing.
const DEFAULT_LIMIT: i64 = 50;

/// Result of a batch deduction attempt.
#[derive(Debug)]
pub enum DeductOutcome {
    Deducted(CreditTransaction),
    /// Balance too low; nothing was written.
    Insufficient { required: i32, available: i32 },
}

/// Result of a per-photo refund attempt.
#[derive(Debug)]
pub enum RefundOutcome {
    Refunded(CreditTransaction),
    /// The photo was never charged, was already refunded, or has bib rows;
    /// nothing was written.
    NotDue,
}

pub struct CreditRepo;

impl CreditRepo {
    /// Append a purchase (top-up) and raise the balance.
    pub async fn record_purchase(
        pool: &PgPool,
        user_id: DbId,
        amount: i32,
        reason: Option<&str>,
    ) -> Result<CreditTransaction, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let before = lock_balance(&mut tx, user_id).await?;
        let after = before + amount;
        write_balance(&mut tx, user_id, after).await?;
        let row = append_row(
            &mut tx,
            user_id,
            CreditKind::Purchase,
            amount,
            before,
            after,
            reason,
            None,
            None,
        )
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Charge a whole premium batch at submission time.
    ///
    /// Rejects without writing anything when the balance cannot cover
    /// `total_cost`; the caller then fails the batch before any photo row
    /// or task exists.
    pub async fn deduct_for_batch(
        pool: &PgPool,
        user_id: DbId,
        total_cost: i32,
        event_id: DbId,
        reason: &str,
    ) -> Result<DeductOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let before = lock_balance(&mut tx, user_id).await?;
        if before < total_cost {
            tx.rollback().await?;
            return Ok(DeductOutcome::Insufficient {
                required: total_cost,
                available: before,
            });
        }

        let after = before - total_cost;
        write_balance(&mut tx, user_id, after).await?;
        let row = append_row(
            &mut tx,
            user_id,
            CreditKind::Deduction,
            -total_cost,
            before,
            after,
            Some(reason),
            None,
            Some(event_id),
        )
        .await?;

        tx.commit().await?;
        Ok(DeductOutcome::Deducted(row))
    }

    /// Refund one photo's credits after OCR found no bib numbers.
    ///
    /// The photo's `credit_refunded` flag is flipped conditionally inside
    /// the same transaction as the balance write; when two workers race,
    /// exactly one sees a row update and appends the ledger entry, the
    /// other gets [`RefundOutcome::NotDue`]. The guard also re-checks that
    /// the photo really has no bib rows.
    pub async fn refund_for_photo(
        pool: &PgPool,
        user_id: DbId,
        photo_id: DbId,
        event_id: DbId,
        amount: i32,
        reason: &str,
    ) -> Result<RefundOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let before = lock_balance(&mut tx, user_id).await?;

        let claimed = sqlx::query(
            "UPDATE photos SET credit_refunded = TRUE, updated_at = NOW() \
             WHERE id = $1 \
               AND credit_deducted \
               AND NOT credit_refunded \
               AND NOT EXISTS (SELECT 1 FROM bib_numbers WHERE photo_id = $1)",
        )
        .bind(photo_id)
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(RefundOutcome::NotDue);
        }

        let after = before + amount;
        write_balance(&mut tx, user_id, after).await?;
        let row = append_row(
            &mut tx,
            user_id,
            CreditKind::Refund,
            amount,
            before,
            after,
            Some(reason),
            Some(photo_id),
            Some(event_id),
        )
        .await?;

        tx.commit().await?;
        Ok(RefundOutcome::Refunded(row))
    }

    /// Return a whole batch charge after the submission failed downstream.
    ///
    /// Used by the API when originals cannot be stored or photo rows
    /// cannot be created after the deduction already committed. Unlike
    /// [`refund_for_photo`](Self::refund_for_photo) there is no photo to
    /// guard on, so the refund is unconditional.
    pub async fn record_batch_refund(
        pool: &PgPool,
        user_id: DbId,
        amount: i32,
        event_id: DbId,
        reason: &str,
    ) -> Result<CreditTransaction, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let before = lock_balance(&mut tx, user_id).await?;
        let after = before + amount;
        write_balance(&mut tx, user_id, after).await?;
        let row = append_row(
            &mut tx,
            user_id,
            CreditKind::Refund,
            amount,
            before,
            after,
            Some(reason),
            None,
            Some(event_id),
        )
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Current balance. Errors with `RowNotFound` for unknown users.
    pub async fn balance_of(pool: &PgPool, user_id: DbId) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar("SELECT credits FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Newest-first ledger page for a user.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: Option<i64>,
    ) -> Result<Vec<CreditTransaction>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let query = format!(
            "SELECT {COLUMNS} FROM credit_transactions \
             WHERE user_id = $1 ORDER BY id DESC LIMIT $2"
        );
        sqlx::query_as::<_, CreditTransaction>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

/// Lock the user row and return the current balance.
async fn lock_balance(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: DbId,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar("SELECT credits FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
}

async fn write_balance(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: DbId,
    credits: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET credits = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(credits)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn append_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: DbId,
    kind: CreditKind,
    amount: i32,
    balance_before: i32,
    balance_after: i32,
    reason: Option<&str>,
    photo_id: Option<DbId>,
    event_id: Option<DbId>,
) -> Result<CreditTransaction, sqlx::Error> {
    let query = format!(
        "INSERT INTO credit_transactions \
         (user_id, kind_id, amount, balance_before, balance_after, reason, photo_id, event_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, CreditTransaction>(&query)
        .bind(user_id)
        .bind(kind.id())
        .bind(amount)
        .bind(balance_before)
        .bind(balance_after)
        .bind(reason)
        .bind(photo_id)
        .bind(event_id)
        .fetch_one(&mut **tx)
        .await
}
