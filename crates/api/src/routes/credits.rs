//! Credit balance, ledger history, and top-ups.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use finishpix_core::types::DbId;
use finishpix_core::CoreError;
use finishpix_db::models::credit::CreditTransaction;
use finishpix_db::repositories::CreditRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/users/{user_id}/credits", get(credit_summary).post(top_up))
}

// ---------------------------------------------------------------------------
// GET /users/{user_id}/credits
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Page size for the ledger history (newest first, capped server-side).
    pub limit: Option<i64>,
}

/// Balance plus a newest-first page of the ledger.
#[derive(Debug, Serialize)]
pub struct CreditSummary {
    pub user_id: DbId,
    pub balance: i32,
    pub history: Vec<CreditTransaction>,
}

/// Current balance and recent ledger entries for a user. Unknown users
/// get a 404.
async fn credit_summary(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<DataResponse<CreditSummary>>> {
    let balance = CreditRepo::balance_of(&state.pool, user_id).await?;
    let history = CreditRepo::list_for_user(&state.pool, user_id, params.limit).await?;

    Ok(Json(DataResponse {
        data: CreditSummary {
            user_id,
            balance,
            history,
        },
    }))
}

// ---------------------------------------------------------------------------
// POST /users/{user_id}/credits
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub amount: i32,
    pub reason: Option<String>,
}

/// Add credits to a user's balance. Returns the new ledger row.
async fn top_up(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Json(body): Json<TopUpRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CreditTransaction>>)> {
    if body.amount <= 0 {
        return Err(CoreError::Validation("Top-up amount must be positive".to_string()).into());
    }

    let row =
        CreditRepo::record_purchase(&state.pool, user_id, body.amount, body.reason.as_deref())
            .await?;

    tracing::info!(
        user_id,
        amount = body.amount,
        balance = row.balance_after,
        "credits purchased"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: row })))
}
