//! Visit handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{DoctorId, UserId, VisitId};
use domain_directory::Actor;
use domain_visit::VisitListFilter;

use crate::dto::visit::{
    parse_status, RecordVisitRequest, UpdateVisitRequest, VisitListQuery, VisitResponse,
};
use crate::error::ApiError;
use crate::AppState;

/// Records a visit
pub async fn record_visit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<RecordVisitRequest>,
) -> Result<(StatusCode, Json<VisitResponse>), ApiError> {
    request.validate()?;
    let request = request.into_domain()?;
    let visit = state.visits.record_visit(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(visit.into())))
}

/// Lists visits inside the caller's scope
pub async fn list_visits(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<VisitListQuery>,
) -> Result<Json<Vec<VisitResponse>>, ApiError> {
    let visits = state
        .visits
        .list_visits(
            &actor,
            VisitListFilter {
                mr_id: query.mr_id.map(UserId::from),
                doctor_id: query.doctor_id.map(DoctorId::from),
                status: parse_status(query.status.as_deref())?,
                from: query.from,
                to: query.to,
                limit: query.limit,
                offset: query.offset,
            },
        )
        .await?;
    Ok(Json(visits.into_iter().map(VisitResponse::from).collect()))
}

/// Gets a visit by ID
pub async fn get_visit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<VisitResponse>, ApiError> {
    let visit = state.visits.get_visit(&actor, VisitId::from(id)).await?;
    Ok(Json(visit.into()))
}

/// Updates a visit
pub async fn update_visit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateVisitRequest>,
) -> Result<Json<VisitResponse>, ApiError> {
    request.validate()?;
    let request = request.into_domain()?;
    let visit = state
        .visits
        .update_visit(&actor, VisitId::from(id), request)
        .await?;
    Ok(Json(visit.into()))
}
