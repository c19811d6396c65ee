//! Core Kernel - Foundational types and utilities for the field-force system
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Temporal types for the reporting calendar (month keys and day windows)
//! - Common identifiers and value objects
//! - Port and health-check contracts for the hexagonal architecture

pub mod error;
pub mod identifiers;
pub mod money;
pub mod ports;
pub mod temporal;

pub use error::CoreError;
pub use identifiers::{BeatPlanId, CoveragePlanId, DoctorId, OrderLineId, UserId, VisitId};
pub use money::{Currency, Money, MoneyError};
pub use ports::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError,
};
pub use temporal::{DayWindow, MonthKey, MonthWindow, TemporalError, Timezone};
