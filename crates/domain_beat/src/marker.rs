//! Visit-to-Beat Marker
//!
//! When a counting visit lands, the matching entry on that day's beat plan
//! flips to Visited. Same containment contract as the coverage sync: runs
//! inside the recording request through the hook seam, failures are logged
//! and swallowed there, and a missed marking never blocks the visit.

use std::sync::Arc;

use async_trait::async_trait;

use core_kernel::{PortError, Timezone};
use domain_visit::{Visit, VisitRecordedHook};

use crate::ports::BeatPlanStore;

/// Marks the day's beat plan entry after a visit is recorded
pub struct BeatVisitMarker {
    store: Arc<dyn BeatPlanStore>,
    timezone: Timezone,
}

impl BeatVisitMarker {
    pub fn new(store: Arc<dyn BeatPlanStore>, timezone: Timezone) -> Self {
        Self { store, timezone }
    }
}

#[async_trait]
impl VisitRecordedHook for BeatVisitMarker {
    fn name(&self) -> &'static str {
        "beat-marker"
    }

    async fn on_visit_recorded(&self, visit: &Visit) -> Result<(), PortError> {
        let date = self.timezone.local_date(visit.visit_date);

        let Some(mut plan) = self.store.find_by_mr_and_date(visit.mr_id, date).await? else {
            tracing::debug!(
                mr_id = %visit.mr_id,
                date = %date,
                "No beat plan for visit day; skipping marker"
            );
            return Ok(());
        };
        if !plan.mark_visited(visit.doctor_id) {
            tracing::debug!(
                plan_id = %plan.id,
                doctor_id = %visit.doctor_id,
                "Visited doctor is not on the day's beat plan"
            );
            return Ok(());
        }

        self.store.update_plan(&plan).await?;
        tracing::info!(
            plan_id = %plan.id,
            doctor_id = %visit.doctor_id,
            visited = plan.visited_count(),
            "Beat plan entry marked visited"
        );
        Ok(())
    }
}
