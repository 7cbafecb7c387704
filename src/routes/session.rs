use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::{
        activity::UpdateItem,
        session::{
            ActionResponse, ChipUpdateRequest, EditBuyInRequest, EditStartTimeRequest,
            EndSessionRequest, EndSessionResponse, NextDayRequest, RebuyRequest, SessionSummary,
            StartSessionRequest,
        },
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes handling the live session lifecycle.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/players/{player_id}/session",
            post(start_session)
                .get(current_session)
                .delete(discard_session),
        )
        .route("/players/{player_id}/session/pause", post(pause_session))
        .route("/players/{player_id}/session/resume", post(resume_session))
        .route("/players/{player_id}/session/rebuy", post(rebuy))
        .route("/players/{player_id}/session/chips", post(quick_update))
        .route("/players/{player_id}/session/buy-in", put(edit_total_buy_in))
        .route(
            "/players/{player_id}/session/start-time",
            put(edit_start_time),
        )
        .route(
            "/players/{player_id}/session/next-day",
            post(progress_to_next_day),
        )
        .route(
            "/players/{player_id}/session/next-day/start",
            post(start_next_day),
        )
        .route("/players/{player_id}/session/end", post(end_session))
        .route(
            "/players/{player_id}/session/activity",
            get(recent_activity),
        )
}

/// Start a new live session for the player.
#[utoipa::path(
    post,
    path = "/players/{player_id}/session",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "Session started", body = SessionSummary)
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
    Valid(Json(payload)): Valid<Json<StartSessionRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::start_session(&state, &player_id, payload).await?;
    Ok(Json(summary))
}

/// The player's current live session, restored from storage if needed.
#[utoipa::path(
    get,
    path = "/players/{player_id}/session",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    responses(
        (status = 200, description = "Current session", body = SessionSummary),
        (status = 404, description = "No active session")
    )
)]
pub async fn current_session(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::current_session(&state, &player_id).await?;
    Ok(Json(summary))
}

/// Drop the live session without persisting a historical record.
#[utoipa::path(
    delete,
    path = "/players/{player_id}/session",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    responses(
        (status = 200, description = "Session discarded", body = ActionResponse)
    )
)]
pub async fn discard_session(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = session_service::discard_session(&state, &player_id).await?;
    Ok(Json(response))
}

/// Pause the session clock.
#[utoipa::path(
    post,
    path = "/players/{player_id}/session/pause",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    responses(
        (status = 200, description = "Session paused", body = SessionSummary),
        (status = 409, description = "Already paused")
    )
)]
pub async fn pause_session(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::pause_session(&state, &player_id).await?;
    Ok(Json(summary))
}

/// Resume the session clock.
#[utoipa::path(
    post,
    path = "/players/{player_id}/session/resume",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    responses(
        (status = 200, description = "Session resumed", body = SessionSummary),
        (status = 409, description = "Already running")
    )
)]
pub async fn resume_session(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::resume_session(&state, &player_id).await?;
    Ok(Json(summary))
}

/// Record a rebuy.
#[utoipa::path(
    post,
    path = "/players/{player_id}/session/rebuy",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    request_body = RebuyRequest,
    responses(
        (status = 200, description = "Rebuy recorded", body = SessionSummary)
    )
)]
pub async fn rebuy(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
    Json(payload): Json<RebuyRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::rebuy(&state, &player_id, payload).await?;
    Ok(Json(summary))
}

/// Record a chip-stack observation.
#[utoipa::path(
    post,
    path = "/players/{player_id}/session/chips",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    request_body = ChipUpdateRequest,
    responses(
        (status = 200, description = "Stack recorded", body = SessionSummary)
    )
)]
pub async fn quick_update(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
    Json(payload): Json<ChipUpdateRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::quick_update(&state, &player_id, payload).await?;
    Ok(Json(summary))
}

/// Correct the cumulative total buy-in.
#[utoipa::path(
    put,
    path = "/players/{player_id}/session/buy-in",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    request_body = EditBuyInRequest,
    responses(
        (status = 200, description = "Buy-in corrected", body = SessionSummary)
    )
)]
pub async fn edit_total_buy_in(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
    Json(payload): Json<EditBuyInRequest>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::edit_total_buy_in(&state, &player_id, payload).await?;
    Ok(Json(summary))
}

/// Retroactively move the session start time.
#[utoipa::path(
    put,
    path = "/players/{player_id}/session/start-time",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    request_body = EditStartTimeRequest,
    responses(
        (status = 200, description = "Start time edited", body = SessionSummary)
    )
)]
pub async fn edit_start_time(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
    Valid(Json(payload)): Valid<Json<EditStartTimeRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::edit_start_time(&state, &player_id, payload).await?;
    Ok(Json(summary))
}

/// Bag up a tournament session for the next day.
#[utoipa::path(
    post,
    path = "/players/{player_id}/session/next-day",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    request_body = NextDayRequest,
    responses(
        (status = 200, description = "Break scheduled", body = SessionSummary),
        (status = 409, description = "Not a tournament session")
    )
)]
pub async fn progress_to_next_day(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
    Valid(Json(payload)): Valid<Json<NextDayRequest>>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::progress_to_next_day(&state, &player_id, payload).await?;
    Ok(Json(summary))
}

/// Resume play on the next tournament day.
#[utoipa::path(
    post,
    path = "/players/{player_id}/session/next-day/start",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    responses(
        (status = 200, description = "Next day started", body = SessionSummary)
    )
)]
pub async fn start_next_day(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let summary = session_service::start_next_day(&state, &player_id).await?;
    Ok(Json(summary))
}

/// End the session: durable record plus staking settlement.
#[utoipa::path(
    post,
    path = "/players/{player_id}/session/end",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    request_body = EndSessionRequest,
    responses(
        (status = 200, description = "Session ended", body = EndSessionResponse),
        (status = 503, description = "Historical write could not be confirmed")
    )
)]
pub async fn end_session(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
    Json(payload): Json<EndSessionRequest>,
) -> Result<Json<EndSessionResponse>, AppError> {
    let response = session_service::end_session(&state, &player_id, payload).await?;
    Ok(Json(response))
}

/// Recent activity feed derived from the ledger.
#[utoipa::path(
    get,
    path = "/players/{player_id}/session/activity",
    tag = "session",
    params(("player_id" = String, Path, description = "Player the session belongs to")),
    responses(
        (status = 200, description = "Activity feed", body = [UpdateItem])
    )
)]
pub async fn recent_activity(
    State(state): State<SharedState>,
    Path(player_id): Path<String>,
) -> Result<Json<Vec<UpdateItem>>, AppError> {
    let feed = session_service::recent_activity(&state, &player_id).await?;
    Ok(Json(feed))
}
