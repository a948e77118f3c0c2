//! Handler for `POST /chat`.
//!
//! | Step | Outcome on failure |
//! |------|--------------------|
//! | validate `message` | 400 `{"error":"No query provided"}` |
//! | rate-limit check | 429 `{"error":"Rate limit exceeded. Max N/hour"}` |
//! | retrieve + generate | never fails; apology text instead |
//! | persist (within limit) | 429 if the window filled meanwhile |

use axum::{
  Json,
  body::Bytes,
  extract::State,
  http::HeaderMap,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solace_core::{
  chat::{ANONYMOUS_DEVICE, HistoryTurn, NewChat},
  store::ChatStore,
};
use solace_rag::{Reply, Responder};
use tracing::{debug, info, warn};

use crate::{AppState, error::ApiError};

/// Header naming the rate-limit subject.
pub const DEVICE_HEADER: &str = "x-device-id";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ChatRequest {
  pub message: Option<String>,
  /// Prior turns, oldest first. Not persisted.
  pub history: Vec<HistoryTurn>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
  pub query:    String,
  pub response: String,
}

/// The device a request is attributed to. Blank or absent means anonymous;
/// any other value is used exactly as sent.
pub fn device_id(headers: &HeaderMap) -> String {
  headers
    .get(DEVICE_HEADER)
    .and_then(|v| v.to_str().ok())
    .filter(|s| !s.trim().is_empty())
    .unwrap_or(ANONYMOUS_DEVICE)
    .to_owned()
}

/// Split a request body into its message and history.
///
/// The two fields are read independently: a body that is not a JSON object,
/// or a non-string `message`, carries no query, while an unusable `history`
/// is dropped without affecting the message.
pub fn parse_body(body: &[u8]) -> ChatRequest {
  let mut value: Value = match serde_json::from_slice(body) {
    Ok(v) => v,
    Err(e) => {
      debug!(error = %e, "unparseable chat body");
      return ChatRequest::default();
    }
  };

  let message = match value.get_mut("message").map(Value::take) {
    Some(Value::String(m)) => Some(m),
    _ => None,
  };

  let history = match value.get_mut("history").map(Value::take) {
    None | Some(Value::Null) => Vec::new(),
    Some(raw) => serde_json::from_value(raw).unwrap_or_else(|e| {
      warn!(error = %e, "ignoring malformed chat history");
      Vec::new()
    }),
  };

  ChatRequest { message, history }
}

/// `POST /chat` with body `{"message": "...", "history": [...]}`
pub async fn handler<S, R>(
  State(state): State<AppState<S, R>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Json<ChatResponse>, ApiError>
where
  S: ChatStore + 'static,
  R: Responder + 'static,
{
  let device = device_id(&headers);
  let request = parse_body(&body);

  let query = match request.message {
    Some(m) if !m.is_empty() => m,
    _ => return Err(ApiError::NoQuery),
  };

  let allowed = state
    .rate_limit
    .allow(state.store.as_ref(), &device, Utc::now())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  if !allowed {
    info!(%device, "rate limit exceeded");
    return Err(ApiError::RateLimited(state.rate_limit.exceeded_message()));
  }

  let reply = state.responder.respond(&query, &request.history).await;
  match &reply {
    Reply::Generated(_) => debug!(%device, "reply generated"),
    Reply::NoContext => info!(%device, "no retrievable context for query"),
    Reply::RetrievalFailed(reason) | Reply::GenerationFailed(reason) => {
      warn!(%device, %reason, "serving fallback reply");
    }
  }
  let response = reply.into_text();

  let record = state
    .store
    .record_chat_within_limit(NewChat::new(device.clone(), query, response), state.rate_limit)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| {
      info!(%device, "rate limit reached while generating; reply discarded");
      ApiError::RateLimited(state.rate_limit.exceeded_message())
    })?;

  Ok(Json(ChatResponse { query: record.query, response: record.response }))
}
