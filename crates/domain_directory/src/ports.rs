//! Directory Domain Ports
//!
//! This module defines the port interfaces for the directory domain, enabling
//! swappable implementations (PostgreSQL, mock, etc.).
//!
//! # Architecture
//!
//! The `DirectoryPort` trait defines all operations the directory domain needs
//! from its data source. Multiple adapters can implement this trait:
//!
//! - **Postgres Adapter**: Uses PostgreSQL (infra_db)
//! - **Mock Adapter**: In-memory, for testing without external dependencies
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_directory::ports::DirectoryPort;
//! use std::sync::Arc;
//!
//! pub struct DirectoryService {
//!     directory: Arc<dyn DirectoryPort>,
//! }
//!
//! impl DirectoryService {
//!     pub async fn get_doctor(&self, id: DoctorId) -> Result<Doctor, PortError> {
//!         self.directory.get_doctor(id).await
//!     }
//! }
//! ```

use async_trait::async_trait;

use core_kernel::{DoctorId, DomainPort, HealthCheckResult, HealthCheckable, PortError, UserId};

use crate::doctor::Doctor;
use crate::user::{Role, User};

/// Query parameters for finding users
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    /// Filter by role
    pub role: Option<Role>,
    /// Filter by the manager the user reports to
    pub manager_id: Option<UserId>,
    /// Filter by active status
    pub is_active: Option<bool>,
    /// Limit results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

impl UserQuery {
    /// Creates a query for the active MRs reporting to a manager
    pub fn mrs_of(manager_id: UserId) -> Self {
        Self {
            role: Some(Role::Mr),
            manager_id: Some(manager_id),
            is_active: Some(true),
            ..Default::default()
        }
    }

    /// Creates a query for all active users with a role
    pub fn by_role(role: Role) -> Self {
        Self {
            role: Some(role),
            is_active: Some(true),
            ..Default::default()
        }
    }
}

/// Query parameters for finding doctors
#[derive(Debug, Clone, Default)]
pub struct DoctorQuery {
    /// Restrict to doctors assigned to any of these MRs
    pub assigned_mrs: Option<Vec<UserId>>,
    /// Filter by active status
    pub is_active: Option<bool>,
    /// Filter by approval status
    pub is_approved: Option<bool>,
    /// Filter by city of practice
    pub city: Option<String>,
    /// Limit results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

impl DoctorQuery {
    /// Creates a query for the active doctors assigned to one MR
    pub fn assigned_to(mr_id: UserId) -> Self {
        Self {
            assigned_mrs: Some(vec![mr_id]),
            is_active: Some(true),
            ..Default::default()
        }
    }

    /// Adds pagination to the query
    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// The main port trait for directory operations
///
/// All methods are async and return `Result<T, PortError>` for consistent
/// error handling across adapter implementations.
#[async_trait]
pub trait DirectoryPort: DomainPort + HealthCheckable {
    /// Retrieves a user by ID, or `PortError::NotFound`
    async fn get_user(&self, id: UserId) -> Result<User, PortError>;

    /// Finds users matching the query criteria
    async fn find_users(&self, query: UserQuery) -> Result<Vec<User>, PortError>;

    /// Inserts a new user
    async fn insert_user(&self, user: &User) -> Result<(), PortError>;

    /// Persists changes to an existing user
    async fn update_user(&self, user: &User) -> Result<(), PortError>;

    /// Retrieves a doctor by ID, or `PortError::NotFound`
    async fn get_doctor(&self, id: DoctorId) -> Result<Doctor, PortError>;

    /// Finds doctors matching the query criteria
    async fn find_doctors(&self, query: DoctorQuery) -> Result<Vec<Doctor>, PortError>;

    /// Inserts a new doctor
    async fn insert_doctor(&self, doctor: &Doctor) -> Result<(), PortError>;

    /// Persists changes to an existing doctor
    async fn update_doctor(&self, doctor: &Doctor) -> Result<(), PortError>;
}

/// Mock implementation of DirectoryPort for testing
///
/// Stores users and doctors in memory; useful for unit testing without
/// database dependencies.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// In-memory mock implementation of DirectoryPort
    #[derive(Debug, Default)]
    pub struct MockDirectoryPort {
        users: Arc<RwLock<HashMap<UserId, User>>>,
        doctors: Arc<RwLock<HashMap<DoctorId, Doctor>>>,
    }

    impl MockDirectoryPort {
        /// Creates a new mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with users for testing
        pub async fn with_users(self, users: Vec<User>) -> Self {
            {
                let mut map = self.users.write().await;
                for user in users {
                    map.insert(user.id, user);
                }
            }
            self
        }

        /// Pre-populates with doctors for testing
        pub async fn with_doctors(self, doctors: Vec<Doctor>) -> Self {
            {
                let mut map = self.doctors.write().await;
                for doctor in doctors {
                    map.insert(doctor.id, doctor);
                }
            }
            self
        }
    }

    impl DomainPort for MockDirectoryPort {}

    #[async_trait]
    impl HealthCheckable for MockDirectoryPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-directory-port".to_string(),
                status: core_kernel::AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: chrono::Utc::now(),
            }
        }
    }

    #[async_trait]
    impl DirectoryPort for MockDirectoryPort {
        async fn get_user(&self, id: UserId) -> Result<User, PortError> {
            self.users
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("User", id))
        }

        async fn find_users(&self, query: UserQuery) -> Result<Vec<User>, PortError> {
            let users = self.users.read().await;
            let mut results: Vec<_> = users
                .values()
                .filter(|u| {
                    if let Some(role) = query.role {
                        if u.role != role {
                            return false;
                        }
                    }
                    if let Some(manager_id) = query.manager_id {
                        if u.manager_id != Some(manager_id) {
                            return false;
                        }
                    }
                    if let Some(is_active) = query.is_active {
                        if u.is_active != is_active {
                            return false;
                        }
                    }
                    true
                })
                .cloned()
                .collect();
            results.sort_by_key(|u| u.created_at);

            if let Some(offset) = query.offset {
                results = results.into_iter().skip(offset as usize).collect();
            }
            if let Some(limit) = query.limit {
                results.truncate(limit as usize);
            }
            Ok(results)
        }

        async fn insert_user(&self, user: &User) -> Result<(), PortError> {
            let mut users = self.users.write().await;
            if users.contains_key(&user.id) {
                return Err(PortError::conflict(format!("User {} already exists", user.id)));
            }
            users.insert(user.id, user.clone());
            Ok(())
        }

        async fn update_user(&self, user: &User) -> Result<(), PortError> {
            let mut users = self.users.write().await;
            if !users.contains_key(&user.id) {
                return Err(PortError::not_found("User", user.id));
            }
            users.insert(user.id, user.clone());
            Ok(())
        }

        async fn get_doctor(&self, id: DoctorId) -> Result<Doctor, PortError> {
            self.doctors
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Doctor", id))
        }

        async fn find_doctors(&self, query: DoctorQuery) -> Result<Vec<Doctor>, PortError> {
            let doctors = self.doctors.read().await;
            let mut results: Vec<_> = doctors
                .values()
                .filter(|d| {
                    if let Some(ref mrs) = query.assigned_mrs {
                        match d.assigned_mr {
                            Some(mr) if mrs.contains(&mr) => {}
                            _ => return false,
                        }
                    }
                    if let Some(is_active) = query.is_active {
                        if d.is_active != is_active {
                            return false;
                        }
                    }
                    if let Some(is_approved) = query.is_approved {
                        if d.is_approved != is_approved {
                            return false;
                        }
                    }
                    if let Some(ref city) = query.city {
                        if d.city.as_ref() != Some(city) {
                            return false;
                        }
                    }
                    true
                })
                .cloned()
                .collect();
            results.sort_by_key(|d| d.created_at);

            if let Some(offset) = query.offset {
                results = results.into_iter().skip(offset as usize).collect();
            }
            if let Some(limit) = query.limit {
                results.truncate(limit as usize);
            }
            Ok(results)
        }

        async fn insert_doctor(&self, doctor: &Doctor) -> Result<(), PortError> {
            let mut doctors = self.doctors.write().await;
            if doctors.contains_key(&doctor.id) {
                return Err(PortError::conflict(format!(
                    "Doctor {} already exists",
                    doctor.id
                )));
            }
            doctors.insert(doctor.id, doctor.clone());
            Ok(())
        }

        async fn update_doctor(&self, doctor: &Doctor) -> Result<(), PortError> {
            let mut doctors = self.doctors.write().await;
            if !doctors.contains_key(&doctor.id) {
                return Err(PortError::not_found("Doctor", doctor.id));
            }
            doctors.insert(doctor.id, doctor.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockDirectoryPort;
    use super::*;

    #[tokio::test]
    async fn test_mock_port_insert_and_get_doctor() {
        let port = MockDirectoryPort::new();
        let doctor = Doctor::new("Dr. Rao", UserId::new_v7());

        port.insert_doctor(&doctor).await.unwrap();
        let retrieved = port.get_doctor(doctor.id).await.unwrap();
        assert_eq!(retrieved.id, doctor.id);
        assert_eq!(retrieved.name, "Dr. Rao");
    }

    #[tokio::test]
    async fn test_mock_port_duplicate_insert_conflicts() {
        let port = MockDirectoryPort::new();
        let doctor = Doctor::new("Dr. Rao", UserId::new_v7());

        port.insert_doctor(&doctor).await.unwrap();
        let result = port.insert_doctor(&doctor).await;
        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_mock_port_not_found() {
        let port = MockDirectoryPort::new();
        let result = port.get_doctor(DoctorId::new_v7()).await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_find_users_by_manager() {
        let manager = User::new("Asha", Role::Manager);
        let mr_a = User::new_mr("Ravi", manager.id);
        let mr_b = User::new_mr("Sunil", UserId::new_v7());

        let port = MockDirectoryPort::new()
            .with_users(vec![manager.clone(), mr_a.clone(), mr_b])
            .await;

        let team = port.find_users(UserQuery::mrs_of(manager.id)).await.unwrap();
        assert_eq!(team.len(), 1);
        assert_eq!(team[0].id, mr_a.id);
    }

    #[tokio::test]
    async fn test_find_doctors_respects_mr_set() {
        let mr_a = UserId::new_v7();
        let mr_b = UserId::new_v7();
        let mut doc_a = Doctor::new("Dr. A", mr_a);
        doc_a.assign_to(mr_a);
        let mut doc_b = Doctor::new("Dr. B", mr_b);
        doc_b.assign_to(mr_b);
        let doc_unassigned = Doctor::new("Dr. C", mr_a);

        let port = MockDirectoryPort::new()
            .with_doctors(vec![doc_a.clone(), doc_b, doc_unassigned])
            .await;

        let query = DoctorQuery {
            assigned_mrs: Some(vec![mr_a]),
            ..Default::default()
        };
        let found = port.find_doctors(query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, doc_a.id);
    }

    #[tokio::test]
    async fn test_mock_port_health_check() {
        let port = MockDirectoryPort::new();
        let result = port.health_check().await;
        assert_eq!(result.status, core_kernel::AdapterHealth::Healthy);
    }
}
