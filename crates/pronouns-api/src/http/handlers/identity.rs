//! Identity lookup and platform linking.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use pronouns_types::error::StoreError;
use pronouns_types::identity::{IdentityId, PlatformLink};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::platform::PlatformPath;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct IdentityView {
    pub identity_id: IdentityId,
    pub links: Vec<PlatformLink>,
}

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub identity_id: IdentityId,
}

/// GET /api/v1/identities/{platform}/{id} - Identity and all its platform IDs.
pub async fn get_identity(
    State(state): State<AppState>,
    _auth: Authenticated,
    PlatformPath(platform_id): PlatformPath,
) -> Result<Json<ApiResponse<IdentityView>>, AppError> {
    let start = Instant::now();
    let identity_id = state
        .frontends
        .resolver
        .find(&platform_id)
        .await?
        .ok_or(AppError::Store(StoreError::NotFound))?;
    let links = state.frontends.resolver.links(&identity_id).await?;
    Ok(Json(ApiResponse::timed(IdentityView { identity_id, links }, start)))
}

/// PUT /api/v1/identities/{platform}/{id}/link - Point a platform ID at an
/// existing identity.
///
/// The platform ID's previous identity keeps its own record; nothing is merged.
pub async fn link_identity(
    State(state): State<AppState>,
    _auth: Authenticated,
    PlatformPath(platform_id): PlatformPath,
    Json(body): Json<LinkRequest>,
) -> Result<Json<ApiResponse<IdentityView>>, AppError> {
    let start = Instant::now();
    let resolver = &state.frontends.resolver;

    if let Some(previous) = resolver.cached(&platform_id) {
        state.frontends.preferences.invalidate(&previous);
    }
    resolver.link(&platform_id, &body.identity_id).await?;

    let links = resolver.links(&body.identity_id).await?;
    let view = IdentityView {
        identity_id: body.identity_id,
        links,
    };
    Ok(Json(ApiResponse::timed(view, start)))
}
