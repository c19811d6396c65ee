//! Coverage Plan Store Ports
//!
//! Port interface for coverage plan persistence. Adapters: PostgreSQL
//! (infra_db) and the in-memory mock.

use async_trait::async_trait;

use core_kernel::{
    CoveragePlanId, DoctorId, DomainPort, HealthCheckResult, HealthCheckable, MonthKey, PortError,
    UserId,
};

use crate::plan::{ComplianceStatus, CoveragePlan};

/// Query parameters for finding coverage plans
#[derive(Debug, Clone, Default)]
pub struct PlanQuery {
    /// Filter by month
    pub month: Option<MonthKey>,
    /// Filter by doctor
    pub doctor_id: Option<DoctorId>,
    /// Restrict to plans assigned to any of these MRs
    pub mr_ids: Option<Vec<UserId>>,
    /// Filter by derived status
    pub status: Option<ComplianceStatus>,
    /// Filter by active flag; listing defaults to active plans only
    pub is_active: Option<bool>,
    /// Limit results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

impl PlanQuery {
    /// Creates a query for the active plans of one month
    pub fn for_month(month: MonthKey) -> Self {
        Self {
            month: Some(month),
            is_active: Some(true),
            ..Default::default()
        }
    }

    /// Restricts the query to a set of MRs
    pub fn for_mrs(mut self, mr_ids: Vec<UserId>) -> Self {
        self.mr_ids = Some(mr_ids);
        self
    }

    /// Adds pagination to the query
    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// The main port trait for coverage plan operations
#[async_trait]
pub trait CoveragePlanStore: DomainPort + HealthCheckable {
    /// Retrieves a plan by ID, or `PortError::NotFound`
    async fn get_plan(&self, id: CoveragePlanId) -> Result<CoveragePlan, PortError>;

    /// Finds plans matching the query criteria
    async fn find_plans(&self, query: PlanQuery) -> Result<Vec<CoveragePlan>, PortError>;

    /// Finds the single active plan for (doctor, month), if one exists
    async fn find_active_plan(
        &self,
        doctor_id: DoctorId,
        month: MonthKey,
    ) -> Result<Option<CoveragePlan>, PortError>;

    /// Inserts a new plan. The storage layer backs the one-active-plan
    /// invariant with a partial unique index and surfaces races as Conflict.
    async fn insert_plan(&self, plan: &CoveragePlan) -> Result<(), PortError>;

    /// Persists changes to an existing plan
    async fn update_plan(&self, plan: &CoveragePlan) -> Result<(), PortError>;
}

/// Mock implementation of CoveragePlanStore for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    /// In-memory mock implementation of CoveragePlanStore
    ///
    /// `fail_writes` simulates a storage outage so synchronizer isolation is
    /// testable: reads keep working, writes return Connection errors.
    #[derive(Debug, Default)]
    pub struct MockCoveragePlanStore {
        plans: Arc<RwLock<HashMap<CoveragePlanId, CoveragePlan>>>,
        fail_writes: AtomicBool,
    }

    impl MockCoveragePlanStore {
        /// Creates a new mock store
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with plans for testing
        pub async fn with_plans(self, plans: Vec<CoveragePlan>) -> Self {
            {
                let mut map = self.plans.write().await;
                for plan in plans {
                    map.insert(plan.id, plan);
                }
            }
            self
        }

        /// Makes every write fail with a Connection error
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        fn check_writable(&self) -> Result<(), PortError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(PortError::connection("Simulated plan store outage"))
            } else {
                Ok(())
            }
        }
    }

    impl DomainPort for MockCoveragePlanStore {}

    #[async_trait]
    impl HealthCheckable for MockCoveragePlanStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-coverage-plan-store".to_string(),
                status: core_kernel::AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: chrono::Utc::now(),
            }
        }
    }

    #[async_trait]
    impl CoveragePlanStore for MockCoveragePlanStore {
        async fn get_plan(&self, id: CoveragePlanId) -> Result<CoveragePlan, PortError> {
            self.plans
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("CoveragePlan", id))
        }

        async fn find_plans(&self, query: PlanQuery) -> Result<Vec<CoveragePlan>, PortError> {
            let plans = self.plans.read().await;
            let mut results: Vec<_> = plans
                .values()
                .filter(|p| {
                    if let Some(month) = query.month {
                        if p.month != month {
                            return false;
                        }
                    }
                    if let Some(doctor_id) = query.doctor_id {
                        if p.doctor_id != doctor_id {
                            return false;
                        }
                    }
                    if let Some(ref mrs) = query.mr_ids {
                        if !mrs.contains(&p.assigned_mr) {
                            return false;
                        }
                    }
                    if let Some(status) = query.status {
                        if p.status != status {
                            return false;
                        }
                    }
                    if let Some(is_active) = query.is_active {
                        if p.is_active != is_active {
                            return false;
                        }
                    }
                    true
                })
                .cloned()
                .collect();
            results.sort_by_key(|p| (p.month, p.created_at));

            if let Some(offset) = query.offset {
                results = results.into_iter().skip(offset as usize).collect();
            }
            if let Some(limit) = query.limit {
                results.truncate(limit as usize);
            }
            Ok(results)
        }

        async fn find_active_plan(
            &self,
            doctor_id: DoctorId,
            month: MonthKey,
        ) -> Result<Option<CoveragePlan>, PortError> {
            let plans = self.plans.read().await;
            Ok(plans
                .values()
                .find(|p| p.doctor_id == doctor_id && p.month == month && p.is_active)
                .cloned())
        }

        async fn insert_plan(&self, plan: &CoveragePlan) -> Result<(), PortError> {
            self.check_writable()?;
            let mut plans = self.plans.write().await;
            if plans.contains_key(&plan.id) {
                return Err(PortError::conflict(format!(
                    "CoveragePlan {} already exists",
                    plan.id
                )));
            }
            if plan.is_active
                && plans
                    .values()
                    .any(|p| p.doctor_id == plan.doctor_id && p.month == plan.month && p.is_active)
            {
                return Err(PortError::conflict(format!(
                    "Active plan already exists for doctor {} in {}",
                    plan.doctor_id, plan.month
                )));
            }
            plans.insert(plan.id, plan.clone());
            Ok(())
        }

        async fn update_plan(&self, plan: &CoveragePlan) -> Result<(), PortError> {
            self.check_writable()?;
            let mut plans = self.plans.write().await;
            if !plans.contains_key(&plan.id) {
                return Err(PortError::not_found("CoveragePlan", plan.id));
            }
            plans.insert(plan.id, plan.clone());
            Ok(())
        }
    }
}
