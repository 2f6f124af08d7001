//! Outbound notifications to patients and doctors.
//!
//! [`dispatch`] spawns the send and only logs a failure. A committed booking
//! or transition is never undone because a message could not be delivered.
//! The server drops the returned handle; one-shot binaries await it before
//! the runtime shuts down.

use async_trait::async_trait;
use std::sync::Arc;
use telecare_core::models::appointment::{AppointmentRequest, Role};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A patient asked for a slot; goes to the doctor.
    NewRequest(AppointmentRequest),
    Accepted(AppointmentRequest),
    Declined(AppointmentRequest),
    /// Goes to whichever party did not cancel.
    Cancelled(AppointmentRequest),
    Expired(AppointmentRequest),
    Completed(AppointmentRequest),
}

impl Notification {
    pub fn appointment(&self) -> &AppointmentRequest {
        match self {
            Notification::NewRequest(a)
            | Notification::Accepted(a)
            | Notification::Declined(a)
            | Notification::Cancelled(a)
            | Notification::Expired(a)
            | Notification::Completed(a) => a,
        }
    }

    pub fn recipient(&self) -> Uuid {
        let appointment = self.appointment();
        match self {
            Notification::NewRequest(_) => appointment.doctor_id,
            Notification::Cancelled(_) if appointment.cancelled_by == Some(Role::Patient) => {
                appointment.doctor_id
            }
            _ => appointment.patient_id,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Notification::NewRequest(a) if a.urgent => "New appointment request (URGENT)".to_string(),
            Notification::NewRequest(_) => "New appointment request".to_string(),
            Notification::Accepted(_) => "Appointment confirmed".to_string(),
            Notification::Declined(_) => "Appointment request declined".to_string(),
            Notification::Cancelled(_) => "Appointment cancelled".to_string(),
            Notification::Expired(_) => "Appointment request expired".to_string(),
            Notification::Completed(_) => "Consultation completed".to_string(),
        }
    }

    pub fn body(&self) -> String {
        let appointment = self.appointment();
        let when = appointment.slot_datetime.format("%Y-%m-%d %H:%M UTC");
        match self {
            Notification::NewRequest(a) => format!(
                "A patient requested a {} consultation on {}: {}",
                a.consultation_type.as_str(),
                when,
                a.reason
            ),
            Notification::Accepted(_) => {
                format!("Your appointment on {} has been confirmed.", when)
            }
            Notification::Declined(a) => format!(
                "Your appointment request for {} was declined. Reason: {}",
                when,
                a.decline_reason.as_deref().unwrap_or("not given")
            ),
            Notification::Cancelled(_) => format!("The appointment on {} was cancelled.", when),
            Notification::Expired(_) => format!(
                "Your appointment request for {} expired without a response from the doctor.",
                when
            ),
            Notification::Completed(_) => {
                format!("Your consultation on {} has been completed.", when)
            }
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> eyre::Result<()>;
}

/// Writes notifications to the log. Used when no delivery channel is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> eyre::Result<()> {
        info!(
            "Notification to {}: {} - {}",
            notification.recipient(),
            notification.title(),
            notification.body()
        );
        Ok(())
    }
}

/// Sends `notification` in the background.
pub fn dispatch(
    notifier: Arc<dyn Notifier>,
    notification: Notification,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&notification).await {
            warn!(
                "Failed to deliver '{}' for appointment {}: {:?}",
                notification.title(),
                notification.appointment().id,
                e
            );
        }
    })
}
