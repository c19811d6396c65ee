//! # Coverage Compliance Domain
//!
//! Monthly coverage plans pair a doctor with an MR and a visit target; the
//! compliance engine derives actuals, percentage and status from the visit
//! ledger. Derived fields are never edited directly and never incremented:
//! every write path recounts the month from scratch, so replaying the same
//! ledger always lands on the same numbers.
//!
//! ## Architecture
//!
//! Hexagonal: [`CoveragePlanStore`] abstracts persistence and `infra_db`
//! provides the PostgreSQL adapter. [`CoverageSynchronizer`] implements the
//! visit domain's post-record hook so counting visits refresh their plan
//! without the ledger knowing coverage exists.

pub mod engine;
pub mod error;
pub mod plan;
pub mod ports;
pub mod service;
pub mod summary;
pub mod sync;

pub use engine::ComplianceEngine;
pub use error::CoverageError;
pub use plan::{ComplianceStatus, CoveragePlan, CoverageStats};
pub use ports::{CoveragePlanStore, PlanQuery};
pub use service::{
    CoverageService, CreatePlanRequest, PlanListFilter, PlanWithNames, SummaryFilter,
    UpdatePlanRequest,
};
pub use summary::{summarize, GroupBy, GroupKey, SummaryRow};
pub use sync::CoverageSynchronizer;

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockCoveragePlanStore;
