//! Game plugin endpoints, backed by the game adapter.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use pronouns_core::adapter::Reply;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GameCommandRequest {
    /// Player UUID or offline-mode key.
    pub uuid: String,
    /// Command text, with or without the leading `/pronouns`.
    pub command: String,
}

#[derive(Debug, Serialize)]
pub struct PlaceholderView {
    pub identifier: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteQuery {
    #[serde(default)]
    pub partial: String,
}

/// POST /api/v1/game/command - Run a player command.
pub async fn run_command(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<GameCommandRequest>,
) -> Result<Json<ApiResponse<Reply>>, AppError> {
    let start = Instant::now();

    let reply = state
        .game
        .submit(&body.uuid, &body.command)
        .await
        .map_err(|_| AppError::Internal("game command was dropped before it ran".to_string()))?;

    Ok(Json(ApiResponse::timed(reply, start)))
}

/// GET /api/v1/game/{uuid}/placeholder/{identifier} - Render a placeholder.
///
/// Served from cache; a cold player renders the default set until the
/// background fetch lands.
pub async fn placeholder(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path((uuid, identifier)): Path<(String, String)>,
) -> Json<ApiResponse<PlaceholderView>> {
    let start = Instant::now();
    let value = state.game.placeholder(&uuid, &identifier);
    Json(ApiResponse::timed(PlaceholderView { identifier, value }, start))
}

/// POST /api/v1/game/{uuid}/quit - Player left the server.
pub async fn player_quit(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(uuid): Path<String>,
) -> StatusCode {
    state.game.on_player_quit(&uuid);
    StatusCode::NO_CONTENT
}

/// GET /api/v1/game/complete?partial= - Tab completion for subcommands.
pub async fn complete(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<CompleteQuery>,
) -> Json<ApiResponse<Vec<&'static str>>> {
    let start = Instant::now();
    Json(ApiResponse::timed(state.game.complete(&query.partial), start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;

    fn command(uuid: &str, text: &str) -> Json<GameCommandRequest> {
        Json(GameCommandRequest {
            uuid: uuid.to_string(),
            command: text.to_string(),
        })
    }

    #[tokio::test]
    async fn set_then_get_through_game_adapter() {
        let (_dir, state) = test_state().await;

        let Json(resp) = run_command(State(state.clone()), Authenticated, command("uuid-123", "/pronouns set they/them"))
            .await
            .unwrap();
        let reply = resp.data.unwrap();
        assert!(reply.success);
        assert_eq!(reply.pronouns.as_deref(), Some("They/Them"));

        let Json(resp) = run_command(State(state), Authenticated, command("uuid-123", "get"))
            .await
            .unwrap();
        assert_eq!(resp.data.unwrap().pronouns.as_deref(), Some("They/Them"));
    }

    #[tokio::test]
    async fn placeholder_warms_then_renders() {
        let (_dir, state) = test_state().await;
        run_command(State(state.clone()), Authenticated, command("alex", "set she/her"))
            .await
            .unwrap();
        state.game.on_player_quit("alex");

        // Cold: default set, with a warm-up queued.
        let Json(resp) = placeholder(
            State(state.clone()),
            Authenticated,
            Path(("alex".to_string(), "pronouns".to_string())),
        )
        .await;
        assert_eq!(resp.data.unwrap().value, "They/Them");

        state.game.flush().await;
        let Json(resp) = placeholder(
            State(state),
            Authenticated,
            Path(("alex".to_string(), "subjective_capital".to_string())),
        )
        .await;
        assert_eq!(resp.data.unwrap().value, "She");
    }

    #[tokio::test]
    async fn complete_lists_matching_subcommands() {
        let (_dir, state) = test_state().await;
        let Json(resp) = complete(
            State(state),
            Authenticated,
            Query(CompleteQuery { partial: "c".to_string() }),
        )
        .await;
        assert_eq!(resp.data.unwrap(), vec!["clear"]);
    }
}
