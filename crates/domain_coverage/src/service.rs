//! Coverage application service
//!
//! Create and retarget plans, list them, and aggregate them, all under the
//! same scope rules the visit ledger uses. Every write path recomputes the
//! derived fields through the engine; nothing here trusts a stored count.

use std::sync::Arc;

use core_kernel::{CoveragePlanId, DoctorId, MonthKey, UserId};
use domain_directory::{resolve_mr_scope, Actor, DirectoryPort};

use crate::engine::ComplianceEngine;
use crate::error::CoverageError;
use crate::plan::{ComplianceStatus, CoveragePlan};
use crate::ports::{CoveragePlanStore, PlanQuery};
use crate::summary::{summarize, GroupBy, SummaryRow};

/// Request for creating a coverage plan
#[derive(Debug, Clone)]
pub struct CreatePlanRequest {
    pub doctor_id: DoctorId,
    pub month: MonthKey,
    pub planned_visits: u32,
    /// Falls back to the doctor's assigned MR when omitted
    pub assigned_mr: Option<UserId>,
}

/// Request for retargeting a plan; an empty request still recomputes
#[derive(Debug, Clone, Default)]
pub struct UpdatePlanRequest {
    pub planned_visits: Option<u32>,
    pub is_active: Option<bool>,
}

/// Filters for the scoped plan listing
#[derive(Debug, Clone, Default)]
pub struct PlanListFilter {
    pub month: Option<MonthKey>,
    pub doctor_id: Option<DoctorId>,
    /// Explicit MR filter (validated against the caller's scope)
    pub mr_id: Option<UserId>,
    pub status: Option<ComplianceStatus>,
    pub include_inactive: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Filters for the summary aggregation
#[derive(Debug, Clone)]
pub struct SummaryFilter {
    pub group_by: GroupBy,
    pub month: Option<MonthKey>,
    pub doctor_id: Option<DoctorId>,
    pub mr_id: Option<UserId>,
}

/// A plan joined with display names for single-plan responses
#[derive(Debug, Clone)]
pub struct PlanWithNames {
    pub plan: CoveragePlan,
    pub doctor_name: String,
    pub mr_name: String,
}

/// Application service for the coverage domain
pub struct CoverageService {
    store: Arc<dyn CoveragePlanStore>,
    directory: Arc<dyn DirectoryPort>,
    engine: Arc<ComplianceEngine>,
}

impl CoverageService {
    pub fn new(
        store: Arc<dyn CoveragePlanStore>,
        directory: Arc<dyn DirectoryPort>,
        engine: Arc<ComplianceEngine>,
    ) -> Self {
        Self {
            store,
            directory,
            engine,
        }
    }

    /// Creates a plan for (doctor, month).
    ///
    /// The assigned MR resolves from the explicit argument, else from the
    /// doctor's current assignment. Owner and manager only; managers stay
    /// inside their team. An existing active plan for the slot conflicts.
    pub async fn create_plan(
        &self,
        actor: &Actor,
        request: CreatePlanRequest,
    ) -> Result<PlanWithNames, CoverageError> {
        if actor.is_mr() {
            return Err(CoverageError::unauthorized(
                "Coverage plans are created by owners and managers",
            ));
        }

        let doctor = self
            .directory
            .get_doctor(request.doctor_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    CoverageError::doctor_not_found(request.doctor_id)
                } else {
                    CoverageError::Port(e)
                }
            })?;
        if !doctor.is_active {
            return Err(CoverageError::invalid(format!(
                "Doctor {} is inactive",
                doctor.id
            )));
        }

        let assigned_mr = request
            .assigned_mr
            .or(doctor.assigned_mr)
            .ok_or_else(|| CoverageError::invalid("Assigned MR required for coverage plan"))?;
        let mr = self.directory.get_user(assigned_mr).await.map_err(|e| {
            if e.is_not_found() {
                CoverageError::invalid(format!("Assigned MR {} does not exist", assigned_mr))
            } else {
                CoverageError::Port(e)
            }
        })?;
        if !mr.is_mr() || !mr.is_active {
            return Err(CoverageError::invalid(format!(
                "User {} is not an active MR",
                assigned_mr
            )));
        }

        if actor.is_manager() {
            let scope = resolve_mr_scope(self.directory.as_ref(), actor, None).await?;
            if !scope.permits(assigned_mr) {
                return Err(CoverageError::unauthorized(format!(
                    "MR {} is not in your team",
                    assigned_mr
                )));
            }
        }

        // Friendlier than the storage backstop; a race still surfaces as a
        // Conflict from the partial unique index
        if self
            .store
            .find_active_plan(request.doctor_id, request.month)
            .await?
            .is_some()
        {
            return Err(CoverageError::duplicate_plan(
                request.doctor_id,
                request.month,
            ));
        }

        let mut plan = CoveragePlan::new(
            request.doctor_id,
            assigned_mr,
            request.month,
            request.planned_visits,
            actor.user_id,
        );
        let stats = self
            .engine
            .compute(plan.doctor_id, plan.assigned_mr, plan.month, plan.planned_visits)
            .await?;
        plan.apply_stats(stats);

        self.store.insert_plan(&plan).await?;
        tracing::info!(
            plan_id = %plan.id,
            doctor_id = %plan.doctor_id,
            month = %plan.month,
            planned = plan.planned_visits,
            "Coverage plan created"
        );

        Ok(PlanWithNames {
            doctor_name: doctor.name,
            mr_name: mr.name,
            plan,
        })
    }

    /// Retargets a plan and/or flips its active flag.
    ///
    /// Recomputes the derived fields from the ledger unconditionally, so an
    /// empty request doubles as a manual refresh after out-of-band edits.
    pub async fn update_plan(
        &self,
        actor: &Actor,
        plan_id: CoveragePlanId,
        request: UpdatePlanRequest,
    ) -> Result<PlanWithNames, CoverageError> {
        if actor.is_mr() {
            return Err(CoverageError::unauthorized(
                "Coverage plans are updated by owners and managers",
            ));
        }

        let mut plan = self.store.get_plan(plan_id).await.map_err(|e| {
            if e.is_not_found() {
                CoverageError::plan_not_found(plan_id)
            } else {
                CoverageError::Port(e)
            }
        })?;

        if actor.is_manager() {
            let scope = resolve_mr_scope(self.directory.as_ref(), actor, None).await?;
            if !scope.permits(plan.assigned_mr) {
                return Err(CoverageError::unauthorized(format!(
                    "Plan {} is outside your scope",
                    plan.id
                )));
            }
        }

        if let Some(planned) = request.planned_visits {
            plan.planned_visits = planned;
        }
        if let Some(is_active) = request.is_active {
            // Reactivation must not produce a second active plan for the slot
            if is_active && !plan.is_active {
                if let Some(other) = self
                    .store
                    .find_active_plan(plan.doctor_id, plan.month)
                    .await?
                {
                    if other.id != plan.id {
                        return Err(CoverageError::duplicate_plan(plan.doctor_id, plan.month));
                    }
                }
            }
            plan.is_active = is_active;
        }

        let stats = self
            .engine
            .compute(plan.doctor_id, plan.assigned_mr, plan.month, plan.planned_visits)
            .await?;
        plan.apply_stats(stats);

        self.store.update_plan(&plan).await?;
        tracing::info!(
            plan_id = %plan.id,
            planned = plan.planned_visits,
            actual = plan.actual_visits,
            status = %plan.status,
            "Coverage plan updated"
        );

        self.populate(plan).await
    }

    /// Lists plans inside the actor's scope; active only unless asked
    pub async fn list_plans(
        &self,
        actor: &Actor,
        filter: PlanListFilter,
    ) -> Result<Vec<CoveragePlan>, CoverageError> {
        let scope = resolve_mr_scope(self.directory.as_ref(), actor, filter.mr_id).await?;
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let query = PlanQuery {
            month: filter.month,
            doctor_id: filter.doctor_id,
            mr_ids: scope.mr_ids().map(|ids| ids.to_vec()),
            status: filter.status,
            is_active: if filter.include_inactive {
                None
            } else {
                Some(true)
            },
            limit: filter.limit,
            offset: filter.offset,
        };
        Ok(self.store.find_plans(query).await?)
    }

    /// Aggregates the actor's visible active plans into summary rows.
    ///
    /// Runs through the same scope resolution as the listing; an aggregate
    /// must never reveal rows the list would hide.
    pub async fn summary(
        &self,
        actor: &Actor,
        filter: SummaryFilter,
    ) -> Result<Vec<SummaryRow>, CoverageError> {
        let scope = resolve_mr_scope(self.directory.as_ref(), actor, filter.mr_id).await?;
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let query = PlanQuery {
            month: filter.month,
            doctor_id: filter.doctor_id,
            mr_ids: scope.mr_ids().map(|ids| ids.to_vec()),
            status: None,
            is_active: Some(true),
            limit: None,
            offset: None,
        };
        let plans = self.store.find_plans(query).await?;
        Ok(summarize(&plans, filter.group_by))
    }

    async fn populate(&self, plan: CoveragePlan) -> Result<PlanWithNames, CoverageError> {
        let doctor_name = self
            .directory
            .get_doctor(plan.doctor_id)
            .await
            .map(|d| d.name)
            .unwrap_or_else(|_| plan.doctor_id.to_string());
        let mr_name = self
            .directory
            .get_user(plan.assigned_mr)
            .await
            .map(|u| u.name)
            .unwrap_or_else(|_| plan.assigned_mr.to_string());
        Ok(PlanWithNames {
            plan,
            doctor_name,
            mr_name,
        })
    }
}
