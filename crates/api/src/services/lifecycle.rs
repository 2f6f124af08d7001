//! # Appointment Lifecycle Manager
//!
//! Every status change goes through here. A change is computed from the
//! status observed when the action began and committed as a compare-and-swap;
//! if another actor moved the appointment in between, the caller gets
//! `Conflict(transition_raced)` rather than overwriting their change.
//!
//! Checks run in a fixed order: input, actor, current status, time rules,
//! then the conditional write.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use telecare_core::{
    errors::{CareError, CareResult, ConflictKind, PolicyRule},
    models::appointment::{
        Actor, AppointmentRequest, AppointmentStatus, LifecycleAction, Role, StatusChange,
    },
    scheduling::BookingPolicy,
};
use telecare_db::BookingStore;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    services::{
        notifier::{self, Notification, Notifier},
        payment::{self, PaymentGateway},
    },
    ApiState,
};

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpirySummary {
    pub expired: Vec<Uuid>,
    /// Requests that changed status between the scan and the update.
    pub skipped: usize,
}

#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn BookingStore>,
    notifier: Arc<dyn Notifier>,
    payments: Arc<dyn PaymentGateway>,
    policy: BookingPolicy,
    /// Background sends spawned by this manager that may still be running.
    deliveries: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn BookingStore>,
        notifier: Arc<dyn Notifier>,
        payments: Arc<dyn PaymentGateway>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            store,
            notifier,
            payments,
            policy,
            deliveries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn from_state(state: &ApiState) -> Self {
        Self::new(
            state.store.clone(),
            state.notifier.clone(),
            state.payments.clone(),
            state.policy,
        )
    }

    /// pending → confirmed, by the owning doctor.
    pub async fn accept(
        &self,
        actor: &Actor,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> CareResult<AppointmentRequest> {
        let appointment = self.load(id).await?;
        authorize(actor, &appointment, LifecycleAction::Accept)?;
        let to = next_status(&appointment, LifecycleAction::Accept)?;

        let confirmed = self
            .commit(&appointment, LifecycleAction::Accept, change(&appointment, to, now))
            .await?;

        self.notify(Notification::Accepted(confirmed.clone())).await;
        self.track(payment::dispatch(self.payments.clone(), confirmed.clone()))
            .await;
        Ok(confirmed)
    }

    /// pending → declined, by the owning doctor, with a reason.
    pub async fn decline(
        &self,
        actor: &Actor,
        id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> CareResult<AppointmentRequest> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CareError::Validation(
                "A reason is required to decline a request".to_string(),
            ));
        }

        let appointment = self.load(id).await?;
        authorize(actor, &appointment, LifecycleAction::Decline)?;
        let to = next_status(&appointment, LifecycleAction::Decline)?;

        let declined = self
            .commit(
                &appointment,
                LifecycleAction::Decline,
                StatusChange {
                    decline_reason: Some(reason.to_string()),
                    ..change(&appointment, to, now)
                },
            )
            .await?;

        self.notify(Notification::Declined(declined.clone())).await;
        Ok(declined)
    }

    /// pending|confirmed → cancelled, by the patient or the doctor, while the
    /// slot is more than the cutoff away.
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> CareResult<AppointmentRequest> {
        let appointment = self.load(id).await?;
        authorize(actor, &appointment, LifecycleAction::Cancel)?;
        let to = next_status(&appointment, LifecycleAction::Cancel)?;

        if appointment.slot_datetime - now <= self.policy.cancellation_cutoff() {
            warn!(
                "Cancellation refused inside cutoff: id={}, slot={}",
                appointment.id, appointment.slot_datetime
            );
            return Err(CareError::Policy(PolicyRule::CancellationWindow {
                cutoff_hours: self.policy.cancellation_cutoff_hours,
            }));
        }

        let cancelled = self
            .commit(
                &appointment,
                LifecycleAction::Cancel,
                StatusChange {
                    cancelled_by: Some(actor.role),
                    ..change(&appointment, to, now)
                },
            )
            .await?;

        self.notify(Notification::Cancelled(cancelled.clone())).await;
        Ok(cancelled)
    }

    /// confirmed → completed, by the owning doctor or the system, once the
    /// consultation has started.
    pub async fn complete(
        &self,
        actor: &Actor,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> CareResult<AppointmentRequest> {
        let appointment = self.load(id).await?;
        authorize(actor, &appointment, LifecycleAction::Complete)?;
        let to = next_status(&appointment, LifecycleAction::Complete)?;

        if now < appointment.slot_datetime {
            return Err(CareError::Policy(PolicyRule::ConsultationNotStarted));
        }

        let completed = self
            .commit(&appointment, LifecycleAction::Complete, change(&appointment, to, now))
            .await?;

        self.notify(Notification::Completed(completed.clone())).await;
        Ok(completed)
    }

    /// pending → cancelled by the system. Ignores the cancellation cutoff.
    pub async fn expire(&self, id: Uuid, now: DateTime<Utc>) -> CareResult<AppointmentRequest> {
        let appointment = self.load(id).await?;
        self.expire_loaded(&appointment, now).await
    }

    /// Expires every pending request older than the expiry window or whose
    /// slot has already started.
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> CareResult<ExpirySummary> {
        let created_before = now - self.policy.pending_expiry();
        let candidates = self.store.expirable_pending(created_before, now).await?;
        debug!("Expiry sweep found {} candidate(s)", candidates.len());

        let mut summary = ExpirySummary::default();
        for appointment in candidates {
            match self.expire_loaded(&appointment, now).await {
                Ok(expired) => summary.expired.push(expired.id),
                Err(CareError::Conflict(_)) | Err(CareError::InvalidTransition { .. }) => {
                    summary.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Expiry sweep finished: {} expired, {} skipped",
            summary.expired.len(),
            summary.skipped
        );
        Ok(summary)
    }

    async fn expire_loaded(
        &self,
        appointment: &AppointmentRequest,
        now: DateTime<Utc>,
    ) -> CareResult<AppointmentRequest> {
        let to = next_status(appointment, LifecycleAction::Expire)?;

        let expired = self
            .commit(
                appointment,
                LifecycleAction::Expire,
                StatusChange {
                    cancelled_by: Some(Role::System),
                    ..change(appointment, to, now)
                },
            )
            .await?;

        self.notify(Notification::Expired(expired.clone())).await;
        Ok(expired)
    }

    /// Waits for every notification and payment hand-off spawned so far.
    pub async fn flush_deliveries(&self) {
        let handles = std::mem::take(&mut *self.deliveries.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Background delivery task failed: {}", e);
            }
        }
    }

    async fn notify(&self, notification: Notification) {
        self.track(notifier::dispatch(self.notifier.clone(), notification))
            .await;
    }

    async fn track(&self, handle: JoinHandle<()>) {
        let mut deliveries = self.deliveries.lock().await;
        deliveries.retain(|pending| !pending.is_finished());
        deliveries.push(handle);
    }

    async fn load(&self, id: Uuid) -> CareResult<AppointmentRequest> {
        self.store
            .get_appointment(id)
            .await?
            .ok_or_else(|| CareError::NotFound(format!("Appointment with ID {} not found", id)))
    }

    async fn commit(
        &self,
        appointment: &AppointmentRequest,
        action: LifecycleAction,
        change: StatusChange,
    ) -> CareResult<AppointmentRequest> {
        let (from, to) = (change.from, change.to);

        match self.store.transition_status(appointment.id, change).await? {
            Some(updated) => {
                info!(
                    "Appointment {} {}: {} -> {}",
                    appointment.id, action, from, to
                );
                Ok(updated)
            }
            None => {
                warn!(
                    "Appointment {} changed before {} could commit (expected {})",
                    appointment.id, action, from
                );
                Err(CareError::Conflict(ConflictKind::TransitionRaced))
            }
        }
    }
}

fn change(appointment: &AppointmentRequest, to: AppointmentStatus, at: DateTime<Utc>) -> StatusChange {
    StatusChange {
        from: appointment.status,
        to,
        decline_reason: None,
        cancelled_by: None,
        at,
    }
}

fn next_status(
    appointment: &AppointmentRequest,
    action: LifecycleAction,
) -> CareResult<AppointmentStatus> {
    appointment.status.apply(action).ok_or_else(|| {
        debug!(
            "Rejected {} on appointment {} in status {}",
            action, appointment.id, appointment.status
        );
        CareError::InvalidTransition {
            from: appointment.status,
            action,
        }
    })
}

/// Who may perform `action` on `appointment`.
fn authorize(actor: &Actor, appointment: &AppointmentRequest, action: LifecycleAction) -> CareResult<()> {
    let is_doctor = actor.role == Role::Doctor && actor.id == appointment.doctor_id;
    let is_patient = actor.role == Role::Patient && actor.id == appointment.patient_id;

    let allowed = match action {
        LifecycleAction::Accept | LifecycleAction::Decline => is_doctor,
        LifecycleAction::Complete => is_doctor || actor.role == Role::System,
        LifecycleAction::Cancel => is_doctor || is_patient,
        LifecycleAction::Expire => actor.role == Role::System,
    };

    if allowed {
        Ok(())
    } else {
        Err(CareError::Authorization(format!(
            "Not allowed to {} this appointment",
            action
        )))
    }
}
