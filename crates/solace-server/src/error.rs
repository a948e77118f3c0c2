//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by the chat handler. Every variant renders as
/// `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("No query provided")]
  NoQuery,

  /// Carries the user-facing message rendered from the enforced limit.
  #[error("{0}")]
  RateLimited(String),

  /// Logged in full; the client only sees a generic message.
  #[error("Internal server error")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::NoQuery => StatusCode::BAD_REQUEST,
      ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    if let ApiError::Store(e) = &self {
      tracing::error!(error = %e, "chat store failure");
    }
    (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
  }
}
