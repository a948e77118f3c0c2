//! HTTP layer for Solace.
//!
//! Exposes an axum [`Router`] serving `POST /chat`, backed by any
//! [`ChatStore`] and any [`Responder`]. Long-lived services are built once by
//! the binary and injected through [`AppState`].

pub mod chat;
pub mod config;
pub mod error;

pub use config::ServerConfig;
pub use error::ApiError;

use std::sync::Arc;

use axum::{Router, routing::post};
use solace_core::{rate_limit::RateLimit, store::ChatStore};
use solace_rag::Responder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, R> {
  pub store:      Arc<S>,
  pub responder:  Arc<R>,
  pub rate_limit: RateLimit,
}

impl<S, R> Clone for AppState<S, R> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      responder:  Arc::clone(&self.responder),
      rate_limit: self.rate_limit,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the chat service.
pub fn router<S, R>(state: AppState<S, R>) -> Router
where
  S: ChatStore + 'static,
  R: Responder + 'static,
{
  Router::new()
    .route("/chat", post(chat::handler::<S, R>))
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
