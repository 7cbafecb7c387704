use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::staking::{SaveStakersRequest, StakingSummaryResponse},
    error::AppError,
    services::staking_service,
    state::SharedState,
};

/// Routes handling staker configuration for the live session.
pub fn router() -> Router<SharedState> {
    Router::new().route(
        "/players/{player_id}/session/staking",
        get(staking_summary).put(save_stakers),
    )
}

/// Staking state for the current session.
#[utoipa::path(
    get,
    path = "/players/{player_id}/session/staking",
    tag = "staking",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    responses(
        (status = 200, description = "Staking summary", body = StakingSummaryResponse),
        (status = 404, description = "No active session")
    )
)]
pub async fn staking_summary(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
) -> Result<Json<StakingSummaryResponse>, AppError> {
    let summary = staking_service::staking_summary(&state, &player_id).await?;
    Ok(Json(summary))
}

/// Replace the pending staker configuration set.
#[utoipa::path(
    put,
    path = "/players/{player_id}/session/staking",
    tag = "staking",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    request_body = SaveStakersRequest,
    responses(
        (status = 200, description = "Configs saved", body = StakingSummaryResponse)
    )
)]
pub async fn save_stakers(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
    Json(payload): Json<SaveStakersRequest>,
) -> Result<Json<StakingSummaryResponse>, AppError> {
    let summary = staking_service::save_staker_configs(&state, &player_id, payload).await?;
    Ok(Json(summary))
}
