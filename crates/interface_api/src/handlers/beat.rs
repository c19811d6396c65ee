//! Beat plan handlers

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use core_kernel::{DoctorId, UserId};
use domain_beat::BeatListFilter;
use domain_directory::Actor;

use crate::dto::beat::{BeatListQuery, BeatPlanResponse, CreateBeatPlanRequest};
use crate::error::ApiError;
use crate::AppState;

/// Creates a beat plan for one MR and one day
pub async fn create_plan(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateBeatPlanRequest>,
) -> Result<(StatusCode, Json<BeatPlanResponse>), ApiError> {
    let plan = state
        .beats
        .create_plan(
            &actor,
            domain_beat::CreateBeatPlanRequest {
                mr_id: request.mr_id.map(UserId::from),
                plan_date: request.plan_date,
                doctor_ids: request.doctor_ids.into_iter().map(DoctorId::from).collect(),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(plan.into())))
}

/// Lists beat plans inside the caller's scope
pub async fn list_plans(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<BeatListQuery>,
) -> Result<Json<Vec<BeatPlanResponse>>, ApiError> {
    let plans = state
        .beats
        .list_plans(
            &actor,
            BeatListFilter {
                mr_id: query.mr_id.map(UserId::from),
                date: query.date,
                limit: query.limit,
                offset: query.offset,
            },
        )
        .await?;
    Ok(Json(plans.into_iter().map(BeatPlanResponse::from).collect()))
}
