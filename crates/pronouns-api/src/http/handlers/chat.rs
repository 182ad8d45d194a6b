//! Chat bot endpoint, backed by the chat adapter.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatCommandRequest {
    /// Author's user snowflake.
    pub snowflake: String,
    /// Full message text, including the command prefix.
    pub command: String,
}

/// POST /api/v1/chat/command - Handle one chat message.
///
/// 204 when the message is not a command. `set` and `clear` are answered
/// before the write lands.
pub async fn run_command(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<ChatCommandRequest>,
) -> Response {
    let start = Instant::now();
    match state.chat.handle_message(&body.snowflake, &body.command).await {
        Some(reply) => Json(ApiResponse::timed(reply, start)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
