//! # Beat Plan Domain
//!
//! Daily itineraries: which doctors an MR intends to call on, one plan per
//! MR per local calendar day. Recorded visits feed back through the visit
//! domain's post-record hook, flipping matching entries to Visited.

pub mod error;
pub mod marker;
pub mod plan;
pub mod ports;
pub mod service;

pub use error::BeatError;
pub use marker::BeatVisitMarker;
pub use plan::{BeatEntry, BeatEntryStatus, BeatPlan};
pub use ports::{BeatPlanQuery, BeatPlanStore};
pub use service::{BeatListFilter, BeatService, CreateBeatPlanRequest};

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockBeatPlanStore;
