use crate::application::loan::LoanApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(LoanApplicationError);

impl From<LoanApplicationError> for ApiError {
    fn from(err: LoanApplicationError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.0 {
            // 400 Bad Request - 貸出の構造が不正
            LoanApplicationError::InvalidLoan(_) => (StatusCode::BAD_REQUEST, "INVALID_LOAN"),

            // 404 Not Found - リクエストされたリソースが存在しない
            LoanApplicationError::LoanNotFound => (StatusCode::NOT_FOUND, "LOAN_NOT_FOUND"),
            LoanApplicationError::LoanItemNotFound => {
                (StatusCode::NOT_FOUND, "LOAN_ITEM_NOT_FOUND")
            }

            // 422 Unprocessable Entity - 参照エラー・ビジネスルール違反
            LoanApplicationError::ReaderNotFound => {
                (StatusCode::UNPROCESSABLE_ENTITY, "READER_NOT_FOUND")
            }
            LoanApplicationError::StaffNotFound => {
                (StatusCode::UNPROCESSABLE_ENTITY, "STAFF_NOT_FOUND")
            }
            LoanApplicationError::CopyNotFound(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "COPY_NOT_FOUND")
            }
            LoanApplicationError::LoanHasNoItems => {
                (StatusCode::UNPROCESSABLE_ENTITY, "LOAN_HAS_NO_ITEMS")
            }
            LoanApplicationError::BookNotInLoan => {
                (StatusCode::UNPROCESSABLE_ENTITY, "BOOK_NOT_IN_LOAN")
            }
            LoanApplicationError::PolicyViolation(rule) => {
                (StatusCode::UNPROCESSABLE_ENTITY, rule.code())
            }
            LoanApplicationError::ExtensionLimitExceeded => {
                (StatusCode::UNPROCESSABLE_ENTITY, "EXTENSION_LIMIT_EXCEEDED")
            }
            LoanApplicationError::AlreadyReturned => {
                (StatusCode::UNPROCESSABLE_ENTITY, "ALREADY_RETURNED")
            }

            // 409 Conflict - 判定中に同じ読者の貸出が保存された
            LoanApplicationError::ConcurrentLoanModification => {
                (StatusCode::CONFLICT, "CONCURRENT_LOAN_MODIFICATION")
            }

            // 500 Internal Server Error - システム障害
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            LoanApplicationError::LoanRepositoryError(e) => {
                tracing::error!("Loan repository error: {}", e);
                return internal_error("LOAN_REPOSITORY_ERROR", "Failed to access loans");
            }
            LoanApplicationError::UserDirectoryError(e) => {
                tracing::error!("User directory error: {}", e);
                return internal_error("USER_DIRECTORY_ERROR", "User directory error");
            }
            LoanApplicationError::CatalogServiceError(e) => {
                tracing::error!("Catalog service error: {}", e);
                return internal_error("CATALOG_SERVICE_ERROR", "Catalog service error");
            }
        };

        let body = Json(ErrorResponse::new(error_type, self.0.to_string()));
        (status, body).into_response()
    }
}

fn internal_error(error_type: &str, message: &str) -> Response {
    let body = Json(ErrorResponse::new(error_type, message));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}
