//! Directory handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{DoctorId, UserId};
use domain_directory::{Actor, DoctorListFilter, Role};

use crate::dto::directory::{
    CreateDoctorRequest, CreateUserRequest, DoctorListQuery, DoctorResponse, UpdateDoctorRequest,
    UserResponse,
};
use crate::error::ApiError;
use crate::AppState;

/// Creates a doctor
pub async fn create_doctor(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<DoctorResponse>), ApiError> {
    request.validate()?;
    let doctor = state
        .directory
        .create_doctor(
            &actor,
            domain_directory::CreateDoctorRequest {
                name: request.name,
                specialization: request.specialization,
                clinic_name: request.clinic_name,
                city: request.city,
                phone: request.phone,
                assigned_mr: request.assigned_mr.map(UserId::from),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(doctor.into())))
}

/// Lists doctors inside the caller's scope
pub async fn list_doctors(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Vec<DoctorResponse>>, ApiError> {
    let doctors = state
        .directory
        .list_doctors(
            &actor,
            DoctorListFilter {
                mr_id: query.mr_id.map(UserId::from),
                city: query.city,
                include_inactive: query.include_inactive,
                include_unapproved: query.include_unapproved,
                limit: query.limit,
                offset: query.offset,
            },
        )
        .await?;
    Ok(Json(doctors.into_iter().map(DoctorResponse::from).collect()))
}

/// Gets a doctor by ID
pub async fn get_doctor(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<DoctorResponse>, ApiError> {
    let doctor = state
        .directory
        .get_doctor(&actor, DoctorId::from(id))
        .await?;
    Ok(Json(doctor.into()))
}

/// Updates a doctor (approve, reassign, toggle active)
pub async fn update_doctor(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<DoctorResponse>, ApiError> {
    request.validate()?;
    let doctor = state
        .directory
        .update_doctor(
            &actor,
            DoctorId::from(id),
            domain_directory::UpdateDoctorRequest {
                name: request.name,
                specialization: request.specialization,
                clinic_name: request.clinic_name,
                city: request.city,
                phone: request.phone,
                assigned_mr: request.assigned_mr.map(UserId::from),
                is_approved: request.is_approved,
                is_active: request.is_active,
            },
        )
        .await?;
    Ok(Json(doctor.into()))
}

/// Creates a user (owner only)
pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    request.validate()?;
    let role = request.role.parse::<Role>().map_err(ApiError::Validation)?;
    let user = state
        .directory
        .create_user(
            &actor,
            domain_directory::CreateUserRequest {
                name: request.name,
                email: request.email,
                phone: request.phone,
                role,
                manager_id: request.manager_id.map(UserId::from),
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Lists the MRs visible to the caller
pub async fn list_mrs(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let mrs = state.directory.list_mrs(&actor).await?;
    Ok(Json(mrs.into_iter().map(UserResponse::from).collect()))
}
