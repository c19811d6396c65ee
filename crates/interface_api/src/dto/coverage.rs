//! Coverage DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::MonthKey;
use domain_coverage::{CoveragePlan, PlanWithNames, SummaryRow};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    pub doctor_id: Uuid,
    /// `YYYY-MM`
    pub month: String,
    pub planned_visits: u32,
    #[serde(default, rename = "assignedMR", alias = "assignedMr")]
    pub assigned_mr: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanRequest {
    pub planned_visits: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanListQuery {
    pub month: Option<String>,
    pub doctor_id: Option<Uuid>,
    pub mr_id: Option<Uuid>,
    pub status: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    pub group_by: Option<String>,
    pub month: Option<String>,
    pub doctor_id: Option<Uuid>,
    pub mr_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyCoverageQuery {
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub id: Uuid,
    pub doctor_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(rename = "assignedMR")]
    pub assigned_mr: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mr_name: Option<String>,
    pub month: String,
    pub planned_visits: u32,
    pub actual_visits: u32,
    pub compliance_percentage: Decimal,
    pub status: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CoveragePlan> for PlanResponse {
    fn from(plan: CoveragePlan) -> Self {
        Self {
            id: plan.id.into(),
            doctor_id: plan.doctor_id.into(),
            doctor_name: None,
            assigned_mr: plan.assigned_mr.into(),
            mr_name: None,
            month: plan.month.to_string(),
            planned_visits: plan.planned_visits,
            actual_visits: plan.actual_visits,
            compliance_percentage: plan.compliance_percentage,
            status: plan.status.as_str().to_string(),
            is_active: plan.is_active,
            created_at: plan.created_at,
            updated_at: plan.updated_at,
        }
    }
}

impl From<PlanWithNames> for PlanResponse {
    fn from(populated: PlanWithNames) -> Self {
        let mut response = PlanResponse::from(populated.plan);
        response.doctor_name = Some(populated.doctor_name);
        response.mr_name = Some(populated.mr_name);
        response
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRowResponse {
    /// The grouped value: an MR id, a doctor id or a month key
    pub key: String,
    pub plan_count: u32,
    pub total_planned: u32,
    pub total_actual: u32,
    pub average_compliance: Decimal,
    pub compliance_percentage: Decimal,
    pub status: String,
}

impl From<SummaryRow> for SummaryRowResponse {
    fn from(row: SummaryRow) -> Self {
        Self {
            key: row.key.to_string(),
            plan_count: row.plan_count,
            total_planned: row.total_planned,
            total_actual: row.total_actual,
            average_compliance: row.average_compliance,
            compliance_percentage: row.compliance_percentage,
            status: row.status.as_str().to_string(),
        }
    }
}

pub(crate) fn parse_month(raw: &str) -> Result<MonthKey, ApiError> {
    raw.parse::<MonthKey>()
        .map_err(|e| ApiError::Validation(e.to_string()))
}
