use crate::application::loan::{
    ServiceDependencies, get_loan as execute_get_loan, insert_loan as execute_insert_loan,
    return_book as execute_return_book, return_books as execute_return_books,
    set_extensions_for_loan as execute_set_extensions,
};
use crate::domain::commands::{ExtendLoanItem, ReturnBook, ReturnBooks};
use crate::domain::value_objects::{BookId, LoanId, LoanItemId};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{BorrowBooksRequest, LoanResponse},
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Command handlers (POST)
// ============================================================================

/// POST /loans - 新しい貸出を作成
///
/// 貸出日時はサーバーの現在時刻。
/// ルール違反時はルールの文言をそのまま`message`に入れて422を返す。
pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BorrowBooksRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let cmd = req.to_command(chrono::Utc::now());

    let loan = execute_insert_loan(&state.service_deps, cmd).await?;

    Ok((StatusCode::CREATED, Json(LoanResponse::from(&loan))))
}

/// POST /loans/:id/return - 貸出中の書籍をすべて返却
///
/// 返却済みの明細はそのまま（2回目の呼び出しも成功する）。
pub async fn return_books(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let cmd = ReturnBooks {
        loan_id: LoanId::from_uuid(loan_id),
        returned_at: chrono::Utc::now(),
    };

    let loan = execute_return_books(&state.service_deps, cmd).await?;

    Ok(Json(LoanResponse::from(&loan)))
}

/// POST /loans/:id/return/:book_id - 指定タイトルを1冊返却
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Path((loan_id, book_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<LoanResponse>, ApiError> {
    let cmd = ReturnBook {
        loan_id: LoanId::from_uuid(loan_id),
        book_id: BookId::from_uuid(book_id),
        returned_at: chrono::Utc::now(),
    };

    let loan = execute_return_book(&state.service_deps, cmd).await?;

    Ok(Json(LoanResponse::from(&loan)))
}

/// POST /loan-items/:id/extend - 貸出明細を延長
///
/// 返却予定日は延長した時点になる。
pub async fn extend_loan_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let cmd = ExtendLoanItem {
        item_id: LoanItemId::from_uuid(item_id),
        extended_at: chrono::Utc::now(),
    };

    let loan = execute_set_extensions(&state.service_deps, cmd).await?;

    Ok(Json(LoanResponse::from(&loan)))
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /loans/:id - 貸出を明細込みで取得
pub async fn get_loan_by_id(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = execute_get_loan(&state.service_deps, LoanId::from_uuid(loan_id)).await?;

    Ok(Json(LoanResponse::from(&loan)))
}
