//! Directory application service
//!
//! Orchestrates doctor and user management with the role rules applied:
//! who may create doctors, who approves them, and who sees whom.

use std::sync::Arc;

use core_kernel::{DoctorId, UserId};

use crate::doctor::Doctor;
use crate::error::DirectoryError;
use crate::ports::{DirectoryPort, DoctorQuery, UserQuery};
use crate::scope::{resolve_mr_scope, Actor, ScopeFilter};
use crate::user::{Role, User};

/// Request for creating a doctor
#[derive(Debug, Clone)]
pub struct CreateDoctorRequest {
    pub name: String,
    pub specialization: Option<String>,
    pub clinic_name: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    /// The MR to assign; ignored for MR callers, who always self-assign
    pub assigned_mr: Option<UserId>,
}

/// Request for updating a doctor
#[derive(Debug, Clone, Default)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub specialization: Option<String>,
    pub clinic_name: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub assigned_mr: Option<UserId>,
    pub is_approved: Option<bool>,
    pub is_active: Option<bool>,
}

/// Filters for the scoped doctor listing
#[derive(Debug, Clone, Default)]
pub struct DoctorListFilter {
    /// Explicit MR filter (validated against the caller's scope)
    pub mr_id: Option<UserId>,
    pub city: Option<String>,
    pub include_inactive: bool,
    pub include_unapproved: bool,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Request for creating a user
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub manager_id: Option<UserId>,
}

/// Application service for the directory domain
pub struct DirectoryService {
    directory: Arc<dyn DirectoryPort>,
}

impl DirectoryService {
    pub fn new(directory: Arc<dyn DirectoryPort>) -> Self {
        Self { directory }
    }

    pub fn port(&self) -> Arc<dyn DirectoryPort> {
        Arc::clone(&self.directory)
    }

    /// Creates a doctor.
    ///
    /// Owner- and manager-created doctors enter approved; MR-created doctors
    /// enter unapproved and are always assigned to the creating MR. Managers
    /// may only assign MRs from their own team.
    pub async fn create_doctor(
        &self,
        actor: &Actor,
        request: CreateDoctorRequest,
    ) -> Result<Doctor, DirectoryError> {
        if request.name.trim().is_empty() {
            return Err(DirectoryError::invalid("Doctor name is required"));
        }

        let assigned_mr = match actor.role {
            Role::Mr => Some(actor.user_id),
            Role::Owner | Role::Manager => {
                if let Some(mr_id) = request.assigned_mr {
                    self.ensure_active_mr(mr_id).await?;
                    if actor.is_manager() {
                        let scope = resolve_mr_scope(self.directory.as_ref(), actor, None).await?;
                        if !scope.permits(mr_id) {
                            return Err(DirectoryError::unauthorized(format!(
                                "MR {} is not in your team",
                                mr_id
                            )));
                        }
                    }
                    Some(mr_id)
                } else {
                    None
                }
            }
        };

        let mut doctor = Doctor::new(request.name, actor.user_id);
        doctor.specialization = request.specialization;
        doctor.clinic_name = request.clinic_name;
        doctor.city = request.city;
        doctor.phone = request.phone;
        doctor.assigned_mr = assigned_mr;
        doctor.is_approved = !actor.is_mr();

        self.directory.insert_doctor(&doctor).await?;
        Ok(doctor)
    }

    /// Retrieves a doctor visible to the actor
    pub async fn get_doctor(&self, actor: &Actor, id: DoctorId) -> Result<Doctor, DirectoryError> {
        let doctor = self
            .directory
            .get_doctor(id)
            .await
            .map_err(|e| Self::map_doctor_lookup(e, id))?;
        self.ensure_doctor_visible(actor, &doctor).await?;
        Ok(doctor)
    }

    /// Updates a doctor. Owner/manager only; managers stay inside their team.
    pub async fn update_doctor(
        &self,
        actor: &Actor,
        id: DoctorId,
        request: UpdateDoctorRequest,
    ) -> Result<Doctor, DirectoryError> {
        if actor.is_mr() {
            return Err(DirectoryError::unauthorized(
                "Doctor updates require owner or manager role",
            ));
        }

        let mut doctor = self
            .directory
            .get_doctor(id)
            .await
            .map_err(|e| Self::map_doctor_lookup(e, id))?;
        self.ensure_doctor_visible(actor, &doctor).await?;

        if let Some(name) = request.name {
            if name.trim().is_empty() {
                return Err(DirectoryError::invalid("Doctor name cannot be empty"));
            }
            doctor.name = name;
        }
        if let Some(specialization) = request.specialization {
            doctor.specialization = Some(specialization);
        }
        if let Some(clinic_name) = request.clinic_name {
            doctor.clinic_name = Some(clinic_name);
        }
        if let Some(city) = request.city {
            doctor.city = Some(city);
        }
        if let Some(phone) = request.phone {
            doctor.phone = Some(phone);
        }
        if let Some(mr_id) = request.assigned_mr {
            self.ensure_active_mr(mr_id).await?;
            if actor.is_manager() {
                let scope = resolve_mr_scope(self.directory.as_ref(), actor, None).await?;
                if !scope.permits(mr_id) {
                    return Err(DirectoryError::unauthorized(format!(
                        "MR {} is not in your team",
                        mr_id
                    )));
                }
            }
            doctor.assigned_mr = Some(mr_id);
        }
        if let Some(is_approved) = request.is_approved {
            doctor.is_approved = is_approved;
        }
        if let Some(is_active) = request.is_active {
            doctor.is_active = is_active;
        }
        doctor.updated_at = chrono::Utc::now();

        self.directory.update_doctor(&doctor).await?;
        Ok(doctor)
    }

    /// Lists doctors inside the actor's scope.
    ///
    /// MR callers see only approved doctors by default; unapproved ones they
    /// created can be included with `include_unapproved`.
    pub async fn list_doctors(
        &self,
        actor: &Actor,
        filter: DoctorListFilter,
    ) -> Result<Vec<Doctor>, DirectoryError> {
        let scope = resolve_mr_scope(self.directory.as_ref(), actor, filter.mr_id).await?;
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let query = DoctorQuery {
            assigned_mrs: scope.mr_ids().map(|ids| ids.to_vec()),
            is_active: if filter.include_inactive && !actor.is_mr() {
                None
            } else {
                Some(true)
            },
            is_approved: if actor.is_mr() && !filter.include_unapproved {
                Some(true)
            } else {
                None
            },
            city: filter.city,
            limit: filter.limit,
            offset: filter.offset,
        };
        Ok(self.directory.find_doctors(query).await?)
    }

    /// Creates a user. Owner only.
    pub async fn create_user(
        &self,
        actor: &Actor,
        request: CreateUserRequest,
    ) -> Result<User, DirectoryError> {
        if !actor.is_owner() {
            return Err(DirectoryError::unauthorized(
                "User creation requires owner role",
            ));
        }
        if request.name.trim().is_empty() {
            return Err(DirectoryError::invalid("User name is required"));
        }
        if request.manager_id.is_some() && request.role != Role::Mr {
            return Err(DirectoryError::invalid("Only MRs report to a manager"));
        }

        if let Some(manager_id) = request.manager_id {
            let manager = self
                .directory
                .get_user(manager_id)
                .await
                .map_err(|e| Self::map_user_lookup(e, manager_id))?;
            if manager.role != Role::Manager || !manager.is_active {
                return Err(DirectoryError::invalid(format!(
                    "User {} is not an active manager",
                    manager_id
                )));
            }
        }

        let mut user = User::new(request.name, request.role);
        user.email = request.email;
        user.phone = request.phone;
        user.manager_id = request.manager_id;

        self.directory.insert_user(&user).await?;
        Ok(user)
    }

    /// Retrieves a user by id
    pub async fn get_user(&self, id: UserId) -> Result<User, DirectoryError> {
        self.directory
            .get_user(id)
            .await
            .map_err(|e| Self::map_user_lookup(e, id))
    }

    /// Lists the MRs visible to the actor
    pub async fn list_mrs(&self, actor: &Actor) -> Result<Vec<User>, DirectoryError> {
        match actor.role {
            Role::Owner => Ok(self.directory.find_users(UserQuery::by_role(Role::Mr)).await?),
            Role::Manager => Ok(self
                .directory
                .find_users(UserQuery::mrs_of(actor.user_id))
                .await?),
            Role::Mr => {
                let me = self.get_user(actor.user_id).await?;
                Ok(vec![me])
            }
        }
    }

    async fn ensure_active_mr(&self, mr_id: UserId) -> Result<(), DirectoryError> {
        let user = self
            .directory
            .get_user(mr_id)
            .await
            .map_err(|e| Self::map_user_lookup(e, mr_id))?;
        if user.role != Role::Mr || !user.is_active {
            return Err(DirectoryError::invalid(format!(
                "User {} is not an active MR",
                mr_id
            )));
        }
        Ok(())
    }

    async fn ensure_doctor_visible(
        &self,
        actor: &Actor,
        doctor: &Doctor,
    ) -> Result<(), DirectoryError> {
        let scope = resolve_mr_scope(self.directory.as_ref(), actor, None).await?;
        let visible = match &scope {
            ScopeFilter::Unrestricted => true,
            ScopeFilter::MrIds(_) => match doctor.assigned_mr {
                Some(mr) => scope.permits(mr),
                // Unassigned doctors stay visible to managers for assignment
                None => actor.is_manager() || doctor.created_by == actor.user_id,
            },
        };
        if visible {
            Ok(())
        } else {
            Err(DirectoryError::unauthorized(format!(
                "Doctor {} is outside your scope",
                doctor.id
            )))
        }
    }

    fn map_doctor_lookup(error: core_kernel::PortError, id: DoctorId) -> DirectoryError {
        if error.is_not_found() {
            DirectoryError::doctor_not_found(id)
        } else {
            DirectoryError::Port(error)
        }
    }

    fn map_user_lookup(error: core_kernel::PortError, id: UserId) -> DirectoryError {
        if error.is_not_found() {
            DirectoryError::user_not_found(id)
        } else {
            DirectoryError::Port(error)
        }
    }
}
