//! Beat plan DTOs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain_beat::{BeatEntry, BeatPlan};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBeatPlanRequest {
    /// Required for owner/manager callers; ignored for MR callers
    pub mr_id: Option<Uuid>,
    pub plan_date: NaiveDate,
    pub doctor_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatListQuery {
    pub mr_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatEntryResponse {
    pub doctor_id: Uuid,
    pub status: String,
}

impl From<BeatEntry> for BeatEntryResponse {
    fn from(entry: BeatEntry) -> Self {
        Self {
            doctor_id: entry.doctor_id.into(),
            status: entry.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeatPlanResponse {
    pub id: Uuid,
    pub mr_id: Uuid,
    pub plan_date: NaiveDate,
    pub entries: Vec<BeatEntryResponse>,
    pub visited_count: usize,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BeatPlan> for BeatPlanResponse {
    fn from(plan: BeatPlan) -> Self {
        let visited_count = plan.visited_count();
        Self {
            id: plan.id.into(),
            mr_id: plan.mr_id.into(),
            plan_date: plan.plan_date,
            entries: plan.entries.into_iter().map(BeatEntryResponse::from).collect(),
            visited_count,
            created_by: plan.created_by.into(),
            created_at: plan.created_at,
            updated_at: plan.updated_at,
        }
    }
}
