//! # Directory Domain
//!
//! Users (owners, managers, MRs) and the doctors they call on. This crate
//! owns the reporting hierarchy and the single scope-resolution routine that
//! every read path in the workspace goes through.
//!
//! ## Architecture
//!
//! The domain follows hexagonal architecture. [`DirectoryPort`] abstracts
//! persistence; `infra_db` provides the PostgreSQL adapter and
//! [`MockDirectoryPort`] backs tests.

pub mod doctor;
pub mod error;
pub mod ports;
pub mod scope;
pub mod service;
pub mod user;

pub use doctor::Doctor;
pub use error::DirectoryError;
pub use ports::{DirectoryPort, DoctorQuery, UserQuery};
pub use scope::{resolve_mr_scope, Actor, ScopeFilter};
pub use service::{
    CreateDoctorRequest, CreateUserRequest, DirectoryService, DoctorListFilter,
    UpdateDoctorRequest,
};
pub use user::{Role, User};

#[cfg(any(test, feature = "mock"))]
pub use ports::mock::MockDirectoryPort;
