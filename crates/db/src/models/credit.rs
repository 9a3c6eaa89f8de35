//! Credit ledger models.

use finishpix_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Kind id type matching SMALLINT in the database.
pub type KindId = i16;

/// Ledger row kind, matching the 1-based seed order of the
/// `credit_transaction_kinds` table.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    Purchase = 1,
    Deduction = 2,
    Refund = 3,
}

impl CreditKind {
    /// Return the database kind ID.
    pub fn id(self) -> KindId {
        self as KindId
    }
}

impl From<CreditKind> for KindId {
    fn from(value: CreditKind) -> Self {
        value as KindId
    }
}

/// A row from the append-only `credit_transactions` table.
///
/// `amount` is signed (purchases and refunds positive, deductions
/// negative); `balance_before + amount == balance_after` is enforced by a
/// check constraint.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditTransaction {
    pub id: DbId,
    pub user_id: DbId,
    pub kind_id: KindId,
    pub amount: i32,
    pub balance_before: i32,
    pub balance_after: i32,
    pub reason: Option<String>,
    pub photo_id: Option<DbId>,
    pub event_id: Option<DbId>,
    pub created_at: Timestamp,
}
