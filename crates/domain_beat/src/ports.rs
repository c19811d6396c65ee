//! Beat Plan Ports
//!
//! Port interface for beat plan persistence. Adapters: PostgreSQL (infra_db)
//! and the in-memory mock.

use async_trait::async_trait;
use chrono::NaiveDate;

use core_kernel::{
    BeatPlanId, DomainPort, HealthCheckResult, HealthCheckable, PortError, UserId,
};

use crate::plan::BeatPlan;

/// Query parameters for finding beat plans
#[derive(Debug, Clone, Default)]
pub struct BeatPlanQuery {
    /// Restrict to plans belonging to any of these MRs
    pub mr_ids: Option<Vec<UserId>>,
    /// Filter by plan date
    pub date: Option<NaiveDate>,
    /// Limit results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

impl BeatPlanQuery {
    /// Creates a query for the plans of one day
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
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

/// The main port trait for beat plan operations
#[async_trait]
pub trait BeatPlanStore: DomainPort + HealthCheckable {
    /// Retrieves a plan by ID, or `PortError::NotFound`
    async fn get_plan(&self, id: BeatPlanId) -> Result<BeatPlan, PortError>;

    /// Finds plans matching the query, most recent date first
    async fn find_plans(&self, query: BeatPlanQuery) -> Result<Vec<BeatPlan>, PortError>;

    /// Finds the plan for (mr, date), if one exists
    async fn find_by_mr_and_date(
        &self,
        mr_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<BeatPlan>, PortError>;

    /// Inserts a new plan. The storage layer backs the one-plan-per-day
    /// invariant with a unique index and surfaces races as Conflict.
    async fn insert_plan(&self, plan: &BeatPlan) -> Result<(), PortError>;

    /// Persists changes to an existing plan
    async fn update_plan(&self, plan: &BeatPlan) -> Result<(), PortError>;
}

/// Mock implementation of BeatPlanStore for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory mock implementation of BeatPlanStore
    #[derive(Debug, Default)]
    pub struct MockBeatPlanStore {
        plans: Arc<RwLock<HashMap<BeatPlanId, BeatPlan>>>,
    }

    impl MockBeatPlanStore {
        /// Creates a new mock store
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with plans for testing
        pub async fn with_plans(self, plans: Vec<BeatPlan>) -> Self {
            {
                let mut map = self.plans.write().await;
                for plan in plans {
                    map.insert(plan.id, plan);
                }
            }
            self
        }
    }

    impl DomainPort for MockBeatPlanStore {}

    #[async_trait]
    impl HealthCheckable for MockBeatPlanStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-beat-plan-store".to_string(),
                status: core_kernel::AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: chrono::Utc::now(),
            }
        }
    }

    #[async_trait]
    impl BeatPlanStore for MockBeatPlanStore {
        async fn get_plan(&self, id: BeatPlanId) -> Result<BeatPlan, PortError> {
            self.plans
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("BeatPlan", id))
        }

        async fn find_plans(&self, query: BeatPlanQuery) -> Result<Vec<BeatPlan>, PortError> {
            let plans = self.plans.read().await;
            let mut results: Vec<_> = plans
                .values()
                .filter(|p| {
                    if let Some(ref mrs) = query.mr_ids {
                        if !mrs.contains(&p.mr_id) {
                            return false;
                        }
                    }
                    if let Some(date) = query.date {
                        if p.plan_date != date {
                            return false;
                        }
                    }
                    true
                })
                .cloned()
                .collect();
            results.sort_by_key(|p| std::cmp::Reverse((p.plan_date, p.created_at)));

            if let Some(offset) = query.offset {
                results = results.into_iter().skip(offset as usize).collect();
            }
            if let Some(limit) = query.limit {
                results.truncate(limit as usize);
            }
            Ok(results)
        }

        async fn find_by_mr_and_date(
            &self,
            mr_id: UserId,
            date: NaiveDate,
        ) -> Result<Option<BeatPlan>, PortError> {
            let plans = self.plans.read().await;
            Ok(plans
                .values()
                .find(|p| p.mr_id == mr_id && p.plan_date == date)
                .cloned())
        }

        async fn insert_plan(&self, plan: &BeatPlan) -> Result<(), PortError> {
            let mut plans = self.plans.write().await;
            if plans.contains_key(&plan.id) {
                return Err(PortError::conflict(format!(
                    "BeatPlan {} already exists",
                    plan.id
                )));
            }
            if plans
                .values()
                .any(|p| p.mr_id == plan.mr_id && p.plan_date == plan.plan_date)
            {
                return Err(PortError::conflict(format!(
                    "Beat plan already exists for MR {} on {}",
                    plan.mr_id, plan.plan_date
                )));
            }
            plans.insert(plan.id, plan.clone());
            Ok(())
        }

        async fn update_plan(&self, plan: &BeatPlan) -> Result<(), PortError> {
            let mut plans = self.plans.write().await;
            if !plans.contains_key(&plan.id) {
                return Err(PortError::not_found("BeatPlan", plan.id));
            }
            plans.insert(plan.id, plan.clone());
            Ok(())
        }
    }

}
