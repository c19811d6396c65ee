//! Coverage handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use core_kernel::{CoveragePlanId, DoctorId, UserId};
use domain_coverage::{ComplianceStatus, GroupBy, PlanListFilter, SummaryFilter};
use domain_directory::Actor;

use crate::dto::coverage::{
    parse_month, CreatePlanRequest, MyCoverageQuery, PlanListQuery, PlanResponse,
    SummaryQuery, SummaryRowResponse, UpdatePlanRequest,
};
use crate::error::ApiError;
use crate::AppState;

/// Creates a coverage plan
pub async fn create_plan(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<PlanResponse>), ApiError> {
    let month = parse_month(&request.month)?;
    let plan = state
        .coverage
        .create_plan(
            &actor,
            domain_coverage::CreatePlanRequest {
                doctor_id: DoctorId::from(request.doctor_id),
                month,
                planned_visits: request.planned_visits,
                assigned_mr: request.assigned_mr.map(UserId::from),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(plan.into())))
}

/// Retargets a plan; an empty body recomputes from the ledger
pub async fn update_plan(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePlanRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    let plan = state
        .coverage
        .update_plan(
            &actor,
            CoveragePlanId::from(id),
            domain_coverage::UpdatePlanRequest {
                planned_visits: request.planned_visits,
                is_active: request.is_active,
            },
        )
        .await?;
    Ok(Json(plan.into()))
}

/// Lists plans inside the caller's scope
pub async fn list_plans(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<PlanListQuery>,
) -> Result<Json<Vec<PlanResponse>>, ApiError> {
    let plans = state
        .coverage
        .list_plans(&actor, plan_filter(query)?)
        .await?;
    Ok(Json(plans.into_iter().map(PlanResponse::from).collect()))
}

/// Aggregates the caller's visible plans into summary rows
pub async fn summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Vec<SummaryRowResponse>>, ApiError> {
    let group_by = query
        .group_by
        .as_deref()
        .ok_or_else(|| ApiError::Validation("groupBy is required".to_string()))?
        .parse::<GroupBy>()?;
    let rows = state
        .coverage
        .summary(
            &actor,
            SummaryFilter {
                group_by,
                month: query.month.as_deref().map(parse_month).transpose()?,
                doctor_id: query.doctor_id.map(DoctorId::from),
                mr_id: query.mr_id.map(UserId::from),
            },
        )
        .await?;
    Ok(Json(rows.into_iter().map(SummaryRowResponse::from).collect()))
}

/// MR-only view of the caller's own plans
pub async fn my_coverage(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<MyCoverageQuery>,
) -> Result<Json<Vec<PlanResponse>>, ApiError> {
    if !actor.is_mr() {
        return Err(ApiError::Forbidden(
            "my-coverage is only available to MR callers".to_string(),
        ));
    }
    let plans = state
        .coverage
        .list_plans(
            &actor,
            PlanListFilter {
                month: query.month.as_deref().map(parse_month).transpose()?,
                ..PlanListFilter::default()
            },
        )
        .await?;
    Ok(Json(plans.into_iter().map(PlanResponse::from).collect()))
}

fn plan_filter(query: PlanListQuery) -> Result<PlanListFilter, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<ComplianceStatus>())
        .transpose()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    Ok(PlanListFilter {
        month: query.month.as_deref().map(parse_month).transpose()?,
        doctor_id: query.doctor_id.map(DoctorId::from),
        mr_id: query.mr_id.map(UserId::from),
        status,
        include_inactive: query.include_inactive,
        limit: query.limit,
        offset: query.offset,
    })
}
