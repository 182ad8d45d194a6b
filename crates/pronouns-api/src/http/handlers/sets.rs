//! Predefined pronoun sets.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::http::extractors::auth::Authenticated;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SetView {
    /// Full stored form, `she/her/she's/her/hers/herself`.
    pub set: String,
    /// Short display name, `She/Her`.
    pub display: String,
}

/// GET /api/v1/sets - Sets users can pick by subjective.
pub async fn list_sets(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Json<ApiResponse<Vec<SetView>>> {
    let start = Instant::now();
    let sets = state
        .frontends
        .registry
        .predefined()
        .iter()
        .map(|set| SetView {
            set: set.to_string(),
            display: set.formatted(),
        })
        .collect();
    Json(ApiResponse::timed(sets, start).with_link("self", "/api/v1/sets"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;

    #[tokio::test]
    async fn lists_default_sets_in_order() {
        let (_dir, state) = test_state().await;
        let Json(resp) = list_sets(State(state), Authenticated).await;
        let sets = resp.data.unwrap();
        assert_eq!(sets.len(), 7);
        assert_eq!(sets[0].set, "she/her/she's/her/hers/herself");
        assert_eq!(sets[0].display, "She/Her");
    }
}
