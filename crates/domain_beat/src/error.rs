//! Beat domain errors

use chrono::NaiveDate;
use core_kernel::{BeatPlanId, PortError, UserId};
use domain_directory::DirectoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BeatError {
    #[error("Beat plan not found: {0}")]
    PlanNotFound(BeatPlanId),

    #[error("Invalid beat plan data: {0}")]
    InvalidData(String),

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("A beat plan already exists for MR {mr_id} on {date}")]
    DuplicatePlan { mr_id: UserId, date: NaiveDate },

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Port(#[from] PortError),
}

impl BeatError {
    pub fn plan_not_found(id: BeatPlanId) -> Self {
        BeatError::PlanNotFound(id)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        BeatError::InvalidData(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        BeatError::NotAuthorized(message.into())
    }

    pub fn duplicate_plan(mr_id: UserId, date: NaiveDate) -> Self {
        BeatError::DuplicatePlan { mr_id, date }
    }
}
