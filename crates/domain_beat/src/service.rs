//! Beat application service
//!
//! Thin compared to visits and coverage: beat plans are itineraries, not
//! records, so the service only guards scope, the doctor list, and the
//! one-plan-per-day slot.

use std::sync::Arc;

use chrono::NaiveDate;
use core_kernel::{DoctorId, UserId};
use domain_directory::{resolve_mr_scope, Actor, DirectoryPort};

use crate::error::BeatError;
use crate::plan::BeatPlan;
use crate::ports::{BeatPlanQuery, BeatPlanStore};

/// Request for creating a beat plan
#[derive(Debug, Clone)]
pub struct CreateBeatPlanRequest {
    /// Required for owner/manager callers; ignored for MR callers
    pub mr_id: Option<UserId>,
    pub plan_date: NaiveDate,
    pub doctor_ids: Vec<DoctorId>,
}

/// Filters for the scoped beat plan listing
#[derive(Debug, Clone, Default)]
pub struct BeatListFilter {
    /// Explicit MR filter (validated against the caller's scope)
    pub mr_id: Option<UserId>,
    pub date: Option<NaiveDate>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Application service for beat plans
pub struct BeatService {
    store: Arc<dyn BeatPlanStore>,
    directory: Arc<dyn DirectoryPort>,
}

impl BeatService {
    pub fn new(store: Arc<dyn BeatPlanStore>, directory: Arc<dyn DirectoryPort>) -> Self {
        Self { store, directory }
    }

    /// Creates a beat plan for one MR and one day.
    ///
    /// MR callers always plan for themselves; owner and manager callers name
    /// the MR, managers only inside their team.
    pub async fn create_plan(
        &self,
        actor: &Actor,
        request: CreateBeatPlanRequest,
    ) -> Result<BeatPlan, BeatError> {
        let mr_id = if actor.is_mr() {
            actor.user_id
        } else {
            let mr_id = request.mr_id.ok_or_else(|| {
                BeatError::invalid("mrId is required when planning on behalf of an MR")
            })?;
            if actor.is_manager() {
                let scope = resolve_mr_scope(self.directory.as_ref(), actor, None).await?;
                if !scope.permits(mr_id) {
                    return Err(BeatError::unauthorized(format!(
                        "MR {} is not in your team",
                        mr_id
                    )));
                }
            }
            mr_id
        };

        if request.doctor_ids.is_empty() {
            return Err(BeatError::invalid("A beat plan needs at least one doctor"));
        }
        let mut seen = Vec::with_capacity(request.doctor_ids.len());
        for doctor_id in &request.doctor_ids {
            if seen.contains(doctor_id) {
                return Err(BeatError::invalid(format!(
                    "Doctor {} appears more than once",
                    doctor_id
                )));
            }
            seen.push(*doctor_id);
            let doctor = self.directory.get_doctor(*doctor_id).await.map_err(|e| {
                if e.is_not_found() {
                    BeatError::invalid(format!("Doctor {} does not exist", doctor_id))
                } else {
                    BeatError::Port(e)
                }
            })?;
            if !doctor.is_active {
                return Err(BeatError::invalid(format!(
                    "Doctor {} is inactive",
                    doctor_id
                )));
            }
        }

        if self
            .store
            .find_by_mr_and_date(mr_id, request.plan_date)
            .await?
            .is_some()
        {
            return Err(BeatError::duplicate_plan(mr_id, request.plan_date));
        }

        let plan = BeatPlan::new(mr_id, request.plan_date, request.doctor_ids, actor.user_id);
        self.store.insert_plan(&plan).await?;
        tracing::info!(
            plan_id = %plan.id,
            mr_id = %plan.mr_id,
            date = %plan.plan_date,
            doctors = plan.entries.len(),
            "Beat plan created"
        );
        Ok(plan)
    }

    /// Lists beat plans inside the actor's scope
    pub async fn list_plans(
        &self,
        actor: &Actor,
        filter: BeatListFilter,
    ) -> Result<Vec<BeatPlan>, BeatError> {
        let scope = resolve_mr_scope(self.directory.as_ref(), actor, filter.mr_id).await?;
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let query = BeatPlanQuery {
            mr_ids: scope.mr_ids().map(|ids| ids.to_vec()),
            date: filter.date,
            limit: filter.limit,
            offset: filter.offset,
        };
        Ok(self.store.find_plans(query).await?)
    }
}
