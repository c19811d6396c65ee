//! Directory DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use domain_directory::{Doctor, User};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDoctorRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub specialization: Option<String>,
    pub clinic_name: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    #[serde(default, rename = "assignedMR", alias = "assignedMr")]
    pub assigned_mr: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDoctorRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub clinic_name: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    #[serde(default, rename = "assignedMR", alias = "assignedMr")]
    pub assigned_mr: Option<Uuid>,
    pub is_approved: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorListQuery {
    pub mr_id: Option<Uuid>,
    pub city: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    #[serde(default)]
    pub include_unapproved: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorResponse {
    pub id: Uuid,
    pub name: String,
    pub specialization: Option<String>,
    pub clinic_name: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    #[serde(rename = "assignedMR")]
    pub assigned_mr: Option<Uuid>,
    pub is_approved: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Doctor> for DoctorResponse {
    fn from(doctor: Doctor) -> Self {
        Self {
            id: doctor.id.into(),
            name: doctor.name,
            specialization: doctor.specialization,
            clinic_name: doctor.clinic_name,
            city: doctor.city,
            phone: doctor.phone,
            assigned_mr: doctor.assigned_mr.map(Uuid::from),
            is_approved: doctor.is_approved,
            is_active: doctor.is_active,
            created_at: doctor.created_at,
            updated_at: doctor.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    pub manager_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            name: user.name,
            email: user.email,
            phone: user.phone,
            role: user.role.as_str().to_string(),
            manager_id: user.manager_id.map(Uuid::from),
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}
