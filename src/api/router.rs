use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_loan, extend_loan_item, get_loan_by_id, return_book, return_books,
};

/// Creates the API router with all lending endpoints
///
/// - POST /loans - Create a loan for one or more copies
/// - GET /loans/:id - Get a loan with its items
/// - POST /loans/:id/return - Return every outstanding item
/// - POST /loans/:id/return/:book_id - Return one title
/// - POST /loan-items/:id/extend - Extend a single item
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/loans", post(create_loan))
        .route("/loans/:id", get(get_loan_by_id))
        .route("/loans/:id/return", post(return_books))
        .route("/loans/:id/return/:book_id", post(return_book))
        .route("/loan-items/:id/extend", post(extend_loan_item))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
