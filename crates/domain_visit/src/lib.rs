//! # Visit Ledger Domain
//!
//! The authoritative record of MR-doctor interactions. Coverage plans never
//! count visits themselves; everything downstream recomputes from this
//! ledger, which is why the duplicate guard and the counting rule
//! (non-cancelled, met-or-no-outcome) live here.
//!
//! ## Architecture
//!
//! Hexagonal: [`VisitLedgerPort`] abstracts persistence, `infra_db` provides
//! the PostgreSQL adapter, [`MockVisitLedger`] backs tests. Downstream
//! bookkeeping (coverage recompute, beat-plan marking) plugs in through
//! [`VisitRecordedHook`] and runs best-effort after each counting create.

pub mod error;
pub mod hooks;
pub mod ports;
pub mod service;
pub mod validation;
pub mod visit;

pub use error::VisitError;
pub use hooks::VisitRecordedHook;
pub use ports::{VisitLedgerPort, VisitQuery};
pub use service::{
    OrderLineInput, RecordVisitRequest, UpdateVisitRequest, VisitListFilter, VisitService,
};
pub use validation::{GeoBounds, ValidationResult, VisitRules};
pub use visit::{GeoPoint, OrderLine, Visit, VisitBuilder, VisitOutcome, VisitStatus};

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockVisitLedger;
