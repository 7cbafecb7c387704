use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Chip Rail Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::start_session,
        crate::routes::session::current_session,
        crate::routes::session::discard_session,
        crate::routes::session::pause_session,
        crate::routes::session::resume_session,
        crate::routes::session::rebuy,
        crate::routes::session::quick_update,
        crate::routes::session::edit_total_buy_in,
        crate::routes::session::edit_start_time,
        crate::routes::session::progress_to_next_day,
        crate::routes::session::start_next_day,
        crate::routes::session::end_session,
        crate::routes::session::recent_activity,
        crate::routes::staking::staking_summary,
        crate::routes::staking::save_stakers,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::StartSessionRequest,
            crate::dto::session::TournamentInput,
            crate::dto::session::RebuyRequest,
            crate::dto::session::ChipUpdateRequest,
            crate::dto::session::EditBuyInRequest,
            crate::dto::session::EditStartTimeRequest,
            crate::dto::session::NextDayRequest,
            crate::dto::session::EndSessionRequest,
            crate::dto::session::SessionSummary,
            crate::dto::session::TournamentSummary,
            crate::dto::session::EndSessionResponse,
            crate::dto::session::ActionResponse,
            crate::dto::activity::UpdateItem,
            crate::dto::activity::UpdateItemKind,
            crate::dto::staking::StakerConfigInput,
            crate::dto::staking::SaveStakersRequest,
            crate::dto::staking::StakeSummary,
            crate::dto::staking::StakingSummaryResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Live session lifecycle operations"),
        (name = "staking", description = "Staker configuration and settlement"),
    )
)]
pub struct ApiDoc;
