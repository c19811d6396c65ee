//! Post-record hook seam
//!
//! After a counting visit is persisted, downstream bookkeeping runs through
//! this seam: coverage recompute, beat-plan marking. Hooks are best-effort.
//! The visit service logs a failing hook at warn level and moves on; the
//! visit write itself is never rolled back, and the ledger-recompute model
//! means a missed update heals on the next trigger.

use async_trait::async_trait;

use core_kernel::PortError;

use crate::visit::Visit;

/// A downstream reaction to a recorded or updated visit
#[async_trait]
pub trait VisitRecordedHook: Send + Sync {
    /// Stable name used in log records when the hook fails
    fn name(&self) -> &'static str;

    /// Called after the visit has been persisted
    async fn on_visit_recorded(&self, visit: &Visit) -> Result<(), PortError>;
}
