//! Test Data Builders
//!
//! Builders that assemble fully-formed domain entities with sensible
//! defaults, so a test states only the fields it cares about. The `random_*`
//! constructors draw plausible names from `fake` for tests that need volume
//! rather than fixed values.

use chrono::{DateTime, NaiveDate, Utc};
use fake::faker::address::en::CityName;
use fake::faker::name::en::Name;
use fake::Fake;

use core_kernel::{DoctorId, Money, MonthKey, UserId};
use domain_beat::BeatPlan;
use domain_coverage::{CoveragePlan, CoverageStats};
use domain_directory::{Doctor, MockDirectoryPort, Role, User};
use domain_visit::{OrderLine, Visit, VisitBuilder, VisitOutcome, VisitStatus};

use crate::fixtures::{MoneyFixtures, StringFixtures, TemporalFixtures};

/// Builder for test users
pub struct TestUserBuilder {
    name: String,
    role: Role,
    manager_id: Option<UserId>,
    email: Option<String>,
    phone: Option<String>,
    is_active: bool,
}

impl Default for TestUserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestUserBuilder {
    /// Creates a builder for an MR with no manager
    pub fn new() -> Self {
        Self {
            name: StringFixtures::mr_name().to_string(),
            role: Role::Mr,
            manager_id: None,
            email: None,
            phone: None,
            is_active: true,
        }
    }

    /// Builder for an owner
    pub fn owner() -> Self {
        let mut builder = Self::new();
        builder.name = StringFixtures::owner_name().to_string();
        builder.role = Role::Owner;
        builder
    }

    /// Builder for a manager
    pub fn manager() -> Self {
        let mut builder = Self::new();
        builder.name = StringFixtures::manager_name().to_string();
        builder.role = Role::Manager;
        builder
    }

    /// Builder for an MR on the given manager's team
    pub fn mr_reporting_to(manager_id: UserId) -> Self {
        let mut builder = Self::new();
        builder.manager_id = Some(manager_id);
        builder
    }

    /// Builder for an MR with a randomly generated name
    pub fn random_mr(manager_id: UserId) -> Self {
        Self::mr_reporting_to(manager_id).with_name(Name().fake::<String>())
    }

    /// Sets the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Marks the user deactivated
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Builds the user
    pub fn build(self) -> User {
        let mut user = User::new(self.name, self.role);
        user.manager_id = self.manager_id;
        user.email = self.email;
        user.phone = self.phone;
        user.is_active = self.is_active;
        user
    }
}

/// Builder for test doctors
///
/// Defaults to an approved, active doctor so plans and visits targeting it
/// pass the plannability checks without extra setup.
pub struct TestDoctorBuilder {
    name: String,
    specialization: Option<String>,
    clinic_name: Option<String>,
    city: Option<String>,
    phone: Option<String>,
    assigned_mr: Option<UserId>,
    is_approved: bool,
    is_active: bool,
    created_by: Option<UserId>,
}

impl Default for TestDoctorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDoctorBuilder {
    /// Creates a builder with default values
    pub fn new() -> Self {
        Self {
            name: StringFixtures::doctor_name().to_string(),
            specialization: Some(StringFixtures::specialization().to_string()),
            clinic_name: Some(StringFixtures::clinic_name().to_string()),
            city: Some(StringFixtures::city().to_string()),
            phone: None,
            assigned_mr: None,
            is_approved: true,
            is_active: true,
            created_by: None,
        }
    }

    /// Builder for a doctor still awaiting approval
    pub fn unapproved() -> Self {
        let mut builder = Self::new();
        builder.is_approved = false;
        builder
    }

    /// Builder with a randomly generated name and city
    pub fn random() -> Self {
        Self::new()
            .with_name(format!("Dr. {}", Name().fake::<String>()))
            .with_city(CityName().fake::<String>())
    }

    /// Sets the doctor's name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the medical specialization
    pub fn with_specialization(mut self, specialization: impl Into<String>) -> Self {
        self.specialization = Some(specialization.into());
        self
    }

    /// Sets the city of practice
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    /// Assigns the doctor to an MR
    pub fn assigned_to(mut self, mr_id: UserId) -> Self {
        self.assigned_mr = Some(mr_id);
        self
    }

    /// Sets the creating user
    pub fn created_by(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }

    /// Marks the doctor deactivated
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Builds the doctor
    pub fn build(self) -> Doctor {
        let created_by = self
            .created_by
            .or(self.assigned_mr)
            .unwrap_or_else(UserId::new_v7);
        let mut doctor = Doctor::new(self.name, created_by);
        doctor.specialization = self.specialization;
        doctor.clinic_name = self.clinic_name;
        doctor.city = self.city;
        doctor.phone = self.phone;
        doctor.assigned_mr = self.assigned_mr;
        doctor.is_approved = self.is_approved;
        doctor.is_active = self.is_active;
        doctor
    }
}

/// Builder for test visits
///
/// Defaults to a completed, met visit mid-June so it counts toward coverage;
/// `recorded_by` falls back to the visiting MR.
pub struct TestVisitBuilder {
    mr_id: UserId,
    doctor_id: DoctorId,
    visit_date: DateTime<Utc>,
    status: VisitStatus,
    outcome: Option<VisitOutcome>,
    not_met_reason: Option<String>,
    orders: Vec<OrderLine>,
    recorded_by: Option<UserId>,
}

impl Default for TestVisitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestVisitBuilder {
    /// Creates a builder with default values
    pub fn new() -> Self {
        Self {
            mr_id: UserId::new_v7(),
            doctor_id: DoctorId::new_v7(),
            visit_date: TemporalFixtures::mid_month(),
            status: VisitStatus::Completed,
            outcome: Some(VisitOutcome::MetDoctor),
            not_met_reason: None,
            orders: Vec::new(),
            recorded_by: None,
        }
    }

    /// Sets the visiting MR
    pub fn for_mr(mut self, mr_id: UserId) -> Self {
        self.mr_id = mr_id;
        self
    }

    /// Sets the target doctor
    pub fn to_doctor(mut self, doctor_id: DoctorId) -> Self {
        self.doctor_id = doctor_id;
        self
    }

    /// Sets the visit instant
    pub fn on(mut self, when: DateTime<Utc>) -> Self {
        self.visit_date = when;
        self
    }

    /// Sets the visit to the morning of a June 2024 day
    pub fn on_june_day(self, day: u32) -> Self {
        self.on(TemporalFixtures::june_morning(day))
    }

    /// Sets a not-met outcome with the standard reason
    pub fn not_met(mut self, outcome: VisitOutcome) -> Self {
        self.outcome = Some(outcome);
        self.not_met_reason = Some(StringFixtures::not_met_reason().to_string());
        self
    }

    /// Clears the outcome entirely
    pub fn without_outcome(mut self) -> Self {
        self.outcome = None;
        self
    }

    /// Marks the visit cancelled
    pub fn cancelled(mut self) -> Self {
        self.status = VisitStatus::Cancelled;
        self
    }

    /// Adds an order line
    pub fn with_order(mut self, product: impl Into<String>, quantity: u32, amount: Money) -> Self {
        self.orders.push(OrderLine::new(product, quantity, amount));
        self
    }

    /// Adds the standard sample order line
    pub fn with_sample_order(self) -> Self {
        self.with_order(StringFixtures::product(), 10, MoneyFixtures::inr_order())
    }

    /// Sets the recording user
    pub fn recorded_by(mut self, user_id: UserId) -> Self {
        self.recorded_by = Some(user_id);
        self
    }

    /// Builds the visit
    pub fn build(self) -> Visit {
        let recorded_by = self.recorded_by.unwrap_or(self.mr_id);
        let mut builder = VisitBuilder::new()
            .mr(self.mr_id)
            .doctor(self.doctor_id)
            .visit_date(self.visit_date)
            .status(self.status)
            .orders(self.orders)
            .recorded_by(recorded_by);
        if let Some(outcome) = self.outcome {
            builder = builder.outcome(outcome);
        }
        if let Some(reason) = self.not_met_reason {
            builder = builder.not_met_reason(reason);
        }
        builder.build().expect("test visit defaults are valid")
    }
}

/// Builder for test coverage plans
pub struct TestCoveragePlanBuilder {
    doctor_id: DoctorId,
    assigned_mr: UserId,
    month: MonthKey,
    planned_visits: u32,
    actual_visits: u32,
    is_active: bool,
    created_by: Option<UserId>,
}

impl Default for TestCoveragePlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCoveragePlanBuilder {
    /// Creates a builder targeting ten June 2024 visits
    pub fn new() -> Self {
        Self {
            doctor_id: DoctorId::new_v7(),
            assigned_mr: UserId::new_v7(),
            month: TemporalFixtures::june_2024(),
            planned_visits: 10,
            actual_visits: 0,
            is_active: true,
            created_by: None,
        }
    }

    /// Sets the target doctor
    pub fn for_doctor(mut self, doctor_id: DoctorId) -> Self {
        self.doctor_id = doctor_id;
        self
    }

    /// Sets the responsible MR
    pub fn assigned_to(mut self, mr_id: UserId) -> Self {
        self.assigned_mr = mr_id;
        self
    }

    /// Sets the coverage month
    pub fn in_month(mut self, month: MonthKey) -> Self {
        self.month = month;
        self
    }

    /// Sets the planned visit target
    pub fn with_planned(mut self, planned_visits: u32) -> Self {
        self.planned_visits = planned_visits;
        self
    }

    /// Sets an actual visit count; the derived fields follow from it
    pub fn with_actual(mut self, actual_visits: u32) -> Self {
        self.actual_visits = actual_visits;
        self
    }

    /// Marks the plan deactivated
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Sets the creating user
    pub fn created_by(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }

    /// Builds the plan
    pub fn build(self) -> CoveragePlan {
        let created_by = self.created_by.unwrap_or(self.assigned_mr);
        let mut plan = CoveragePlan::new(
            self.doctor_id,
            self.assigned_mr,
            self.month,
            self.planned_visits,
            created_by,
        );
        if self.actual_visits > 0 {
            plan.apply_stats(CoverageStats::derive(self.planned_visits, self.actual_visits));
        }
        if !self.is_active {
            plan.deactivate();
        }
        plan
    }
}

/// Builder for test beat plans
pub struct TestBeatPlanBuilder {
    mr_id: UserId,
    plan_date: NaiveDate,
    doctor_ids: Vec<DoctorId>,
    created_by: Option<UserId>,
}

impl Default for TestBeatPlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBeatPlanBuilder {
    /// Creates a builder with one doctor on the standard plan date
    pub fn new() -> Self {
        Self {
            mr_id: UserId::new_v7(),
            plan_date: TemporalFixtures::plan_date(),
            doctor_ids: vec![DoctorId::new_v7()],
            created_by: None,
        }
    }

    /// Sets the planning MR
    pub fn for_mr(mut self, mr_id: UserId) -> Self {
        self.mr_id = mr_id;
        self
    }

    /// Sets the plan date
    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.plan_date = date;
        self
    }

    /// Replaces the itinerary
    pub fn with_doctors(mut self, doctor_ids: Vec<DoctorId>) -> Self {
        self.doctor_ids = doctor_ids;
        self
    }

    /// Appends a doctor to the itinerary
    pub fn add_doctor(mut self, doctor_id: DoctorId) -> Self {
        self.doctor_ids.push(doctor_id);
        self
    }

    /// Sets the creating user
    pub fn created_by(mut self, user_id: UserId) -> Self {
        self.created_by = Some(user_id);
        self
    }

    /// Builds the plan
    pub fn build(self) -> BeatPlan {
        let created_by = self.created_by.unwrap_or(self.mr_id);
        BeatPlan::new(self.mr_id, self.plan_date, self.doctor_ids, created_by)
    }
}

/// A small reporting hierarchy wired the way production data looks: one
/// owner, one manager, two MRs on the manager's team, and one approved
/// doctor assigned to each MR.
pub struct TeamFixture {
    pub owner: User,
    pub manager: User,
    pub mrs: Vec<User>,
    pub doctors: Vec<Doctor>,
}

impl TeamFixture {
    /// Builds the standard team
    pub fn standard() -> Self {
        let owner = TestUserBuilder::owner().build();
        let manager = TestUserBuilder::manager().build();
        let mr_a = TestUserBuilder::mr_reporting_to(manager.id).build();
        let mr_b = TestUserBuilder::mr_reporting_to(manager.id)
            .with_name("Sunil Shah")
            .build();
        let doctor_a = TestDoctorBuilder::new()
            .assigned_to(mr_a.id)
            .created_by(owner.id)
            .build();
        let doctor_b = TestDoctorBuilder::new()
            .with_name("Dr. Rao")
            .assigned_to(mr_b.id)
            .created_by(owner.id)
            .build();
        Self {
            owner,
            manager,
            mrs: vec![mr_a, mr_b],
            doctors: vec![doctor_a, doctor_b],
        }
    }

    /// Grows the team with randomly-named MRs
    pub fn with_extra_mrs(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.mrs.push(TestUserBuilder::random_mr(self.manager.id).build());
        }
        self
    }

    /// Seeds a mock directory with every member of the team
    pub async fn seed_directory(&self) -> MockDirectoryPort {
        let mut users = vec![self.owner.clone(), self.manager.clone()];
        users.extend(self.mrs.iter().cloned());
        MockDirectoryPort::new()
            .with_users(users)
            .await
            .with_doctors(self.doctors.clone())
            .await
    }
}
