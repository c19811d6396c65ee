//! Visit application service
//!
//! Records and edits visits: resolves the acting MR identity, checks doctor
//! assignment, runs field validation and the duplicate guard, persists, then
//! fires the post-record hooks. Hook failures are contained here; the visit
//! write is the primary operation and always survives them.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use core_kernel::{DoctorId, Money, UserId, VisitId};
use domain_directory::{resolve_mr_scope, Actor, DirectoryPort, Role};

use crate::error::VisitError;
use crate::hooks::VisitRecordedHook;
use crate::ports::{VisitLedgerPort, VisitQuery};
use crate::validation::VisitRules;
use crate::visit::{GeoPoint, OrderLine, Visit, VisitBuilder, VisitOutcome, VisitStatus};

/// One order line as supplied by the caller
#[derive(Debug, Clone)]
pub struct OrderLineInput {
    pub product: String,
    pub quantity: u32,
    pub amount: Money,
}

/// Request for recording a visit
#[derive(Debug, Clone)]
pub struct RecordVisitRequest {
    pub doctor_id: DoctorId,
    /// Required for owner/manager callers; ignored for MR callers
    pub mr_id: Option<UserId>,
    /// Defaults to now when omitted
    pub visit_date: Option<DateTime<Utc>>,
    pub outcome: Option<VisitOutcome>,
    pub not_met_reason: Option<String>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
    pub notes: Option<String>,
    pub orders: Vec<OrderLineInput>,
}

impl RecordVisitRequest {
    pub fn for_doctor(doctor_id: DoctorId) -> Self {
        Self {
            doctor_id,
            mr_id: None,
            visit_date: None,
            outcome: None,
            not_met_reason: None,
            check_in: None,
            check_out: None,
            location: None,
            notes: None,
            orders: Vec::new(),
        }
    }
}

/// Request for updating a visit; only supplied fields change
#[derive(Debug, Clone, Default)]
pub struct UpdateVisitRequest {
    pub visit_date: Option<DateTime<Utc>>,
    pub status: Option<VisitStatus>,
    pub outcome: Option<VisitOutcome>,
    pub not_met_reason: Option<String>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
    pub notes: Option<String>,
    pub orders: Option<Vec<OrderLineInput>>,
}

/// Filters for the scoped visit listing
#[derive(Debug, Clone, Default)]
pub struct VisitListFilter {
    /// Explicit MR filter (validated against the caller's scope)
    pub mr_id: Option<UserId>,
    pub doctor_id: Option<DoctorId>,
    pub status: Option<VisitStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Application service for the visit ledger
pub struct VisitService {
    ledger: Arc<dyn VisitLedgerPort>,
    directory: Arc<dyn DirectoryPort>,
    rules: VisitRules,
    hooks: Vec<Arc<dyn VisitRecordedHook>>,
}

impl VisitService {
    pub fn new(
        ledger: Arc<dyn VisitLedgerPort>,
        directory: Arc<dyn DirectoryPort>,
        rules: VisitRules,
    ) -> Self {
        Self {
            ledger,
            directory,
            rules,
            hooks: Vec::new(),
        }
    }

    /// Registers a post-record hook. Hooks run in registration order.
    pub fn with_hook(mut self, hook: Arc<dyn VisitRecordedHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn rules(&self) -> &VisitRules {
        &self.rules
    }

    /// Records a visit.
    ///
    /// MR callers always record as themselves; a payload `mr_id` is
    /// overridden. Owner and manager callers record on behalf of an MR and
    /// must name one, managers only inside their team.
    pub async fn record_visit(
        &self,
        actor: &Actor,
        request: RecordVisitRequest,
    ) -> Result<Visit, VisitError> {
        let mr_id = match actor.role {
            Role::Mr => actor.user_id,
            Role::Owner | Role::Manager => {
                let mr_id = request.mr_id.ok_or_else(|| {
                    VisitError::invalid("mrId is required when recording on behalf of an MR")
                })?;
                if actor.is_manager() {
                    let scope = resolve_mr_scope(self.directory.as_ref(), actor, None).await?;
                    if !scope.permits(mr_id) {
                        return Err(VisitError::unauthorized(format!(
                            "MR {} is not in your team",
                            mr_id
                        )));
                    }
                }
                mr_id
            }
        };

        let doctor = self
            .directory
            .get_doctor(request.doctor_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    VisitError::doctor_not_found(request.doctor_id)
                } else {
                    VisitError::Port(e)
                }
            })?;
        if !doctor.is_active {
            return Err(VisitError::invalid(format!(
                "Doctor {} is inactive",
                doctor.id
            )));
        }
        if actor.is_mr() && !doctor.is_assigned_to(mr_id) {
            return Err(VisitError::unauthorized(format!(
                "Doctor {} is not assigned to you",
                doctor.id
            )));
        }

        let mut builder = VisitBuilder::new()
            .mr(mr_id)
            .doctor(request.doctor_id)
            .recorded_by(actor.user_id)
            .orders(
                request
                    .orders
                    .into_iter()
                    .map(|o| OrderLine::new(o.product, o.quantity, o.amount))
                    .collect(),
            );
        if let Some(when) = request.visit_date {
            builder = builder.visit_date(when);
        }
        if let Some(outcome) = request.outcome {
            builder = builder.outcome(outcome);
        }
        if let Some(reason) = request.not_met_reason {
            builder = builder.not_met_reason(reason);
        }
        if let Some(check_in) = request.check_in {
            builder = builder.check_in(check_in);
        }
        if let Some(check_out) = request.check_out {
            builder = builder.check_out(check_out);
        }
        if let Some(location) = request.location {
            builder = builder.location(location);
        }
        if let Some(notes) = request.notes {
            builder = builder.notes(notes);
        }
        let visit = builder.build()?;

        let validation = self.rules.validate(&visit);
        if !validation.is_valid {
            return Err(VisitError::invalid(validation.errors.join("; ")));
        }

        let day = self
            .rules
            .timezone
            .day_window(self.rules.timezone.local_date(visit.visit_date));
        if let Some(existing) = self
            .ledger
            .find_day_conflict(mr_id, request.doctor_id, &day, None)
            .await?
        {
            return Err(VisitError::duplicate(existing));
        }

        self.ledger.insert_visit(&visit).await?;
        tracing::info!(
            visit_id = %visit.id,
            mr_id = %mr_id,
            doctor_id = %visit.doctor_id,
            "Visit recorded"
        );
        // Only counting visits move coverage or beat state, so only they
        // fire the hooks. Edits and cancellations heal on the next trigger.
        if visit.counts_for_coverage() {
            self.run_hooks(&visit).await;
        }
        Ok(visit)
    }

    /// Retrieves a visit visible to the actor
    pub async fn get_visit(&self, actor: &Actor, id: VisitId) -> Result<Visit, VisitError> {
        let visit = self
            .ledger
            .get_visit(id)
            .await
            .map_err(|e| Self::map_visit_lookup(e, id))?;
        self.ensure_visit_access(actor, &visit).await?;
        Ok(visit)
    }

    /// Updates a visit.
    ///
    /// Moving `visit_date` across a day boundary re-runs the duplicate guard
    /// against the new day, excluding the visit itself; so does reviving a
    /// cancelled visit, which re-occupies its day. Edits never fire the
    /// post-record hooks; derived coverage heals on the next trigger.
    pub async fn update_visit(
        &self,
        actor: &Actor,
        id: VisitId,
        request: UpdateVisitRequest,
    ) -> Result<Visit, VisitError> {
        let mut visit = self
            .ledger
            .get_visit(id)
            .await
            .map_err(|e| Self::map_visit_lookup(e, id))?;
        self.ensure_visit_access(actor, &visit).await?;

        let mut date_changed = false;
        let mut day_guard_ran = false;
        if let Some(new_date) = request.visit_date {
            let old_day = self.rules.timezone.local_date(visit.visit_date);
            let new_day = self.rules.timezone.local_date(new_date);
            if new_day != old_day {
                let window = self.rules.timezone.day_window(new_day);
                if let Some(existing) = self
                    .ledger
                    .find_day_conflict(visit.mr_id, visit.doctor_id, &window, Some(visit.id))
                    .await?
                {
                    return Err(VisitError::duplicate(existing));
                }
                day_guard_ran = true;
            }
            visit.visit_date = new_date;
            date_changed = true;
        }

        if let Some(status) = request.status {
            let reviving = visit.status == VisitStatus::Cancelled
                && status != VisitStatus::Cancelled;
            if reviving && !day_guard_ran {
                let window = self
                    .rules
                    .timezone
                    .day_window(self.rules.timezone.local_date(visit.visit_date));
                if let Some(existing) = self
                    .ledger
                    .find_day_conflict(visit.mr_id, visit.doctor_id, &window, Some(visit.id))
                    .await?
                {
                    return Err(VisitError::duplicate(existing));
                }
            }
            match status {
                VisitStatus::Cancelled => visit.cancel()?,
                other => visit.status = other,
            }
        }
        if let Some(outcome) = request.outcome {
            visit.outcome = Some(outcome);
        }
        if let Some(reason) = request.not_met_reason {
            visit.not_met_reason = Some(reason);
        }
        if let Some(check_in) = request.check_in {
            visit.check_in = Some(check_in);
        }
        if let Some(check_out) = request.check_out {
            visit.check_out = Some(check_out);
        }
        if let Some(location) = request.location {
            visit.location = Some(location);
        }
        if let Some(notes) = request.notes {
            visit.notes = Some(notes);
        }
        if let Some(orders) = request.orders {
            visit.orders = orders
                .into_iter()
                .map(|o| OrderLine::new(o.product, o.quantity, o.amount))
                .collect();
        }

        let mut validation = self.rules.validate_fields(&visit);
        if date_changed {
            validation.merge(self.rules.validate_timing(visit.visit_date, Utc::now()));
        }
        if !validation.is_valid {
            return Err(VisitError::invalid(validation.errors.join("; ")));
        }

        visit.updated_at = Utc::now();
        self.ledger.update_visit(&visit).await?;
        tracing::info!(visit_id = %visit.id, status = %visit.status, "Visit updated");
        Ok(visit)
    }

    /// Lists visits inside the actor's scope
    pub async fn list_visits(
        &self,
        actor: &Actor,
        filter: VisitListFilter,
    ) -> Result<Vec<Visit>, VisitError> {
        let scope = resolve_mr_scope(self.directory.as_ref(), actor, filter.mr_id).await?;
        if scope.is_empty() {
            return Ok(Vec::new());
        }

        let query = VisitQuery {
            mr_ids: scope.mr_ids().map(|ids| ids.to_vec()),
            doctor_id: filter.doctor_id,
            statuses: filter.status.map(|s| vec![s]),
            from: filter.from,
            to: filter.to,
            limit: filter.limit,
            offset: filter.offset,
        };
        Ok(self.ledger.find_visits(query).await?)
    }

    async fn ensure_visit_access(&self, actor: &Actor, visit: &Visit) -> Result<(), VisitError> {
        let scope = resolve_mr_scope(self.directory.as_ref(), actor, None).await?;
        if scope.permits(visit.mr_id) {
            Ok(())
        } else {
            Err(VisitError::unauthorized(format!(
                "Visit {} is outside your scope",
                visit.id
            )))
        }
    }

    async fn run_hooks(&self, visit: &Visit) {
        for hook in &self.hooks {
            if let Err(error) = hook.on_visit_recorded(visit).await {
                tracing::warn!(
                    hook = hook.name(),
                    visit_id = %visit.id,
                    error = %error,
                    "Post-visit hook failed; visit is already persisted"
                );
            }
        }
    }

    fn map_visit_lookup(error: core_kernel::PortError, id: VisitId) -> VisitError {
        if error.is_not_found() {
            VisitError::visit_not_found(id)
        } else {
            VisitError::Port(error)
        }
    }
}
