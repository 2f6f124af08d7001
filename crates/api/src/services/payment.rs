//! Hand-off to the payment provider when a doctor accepts a request.
//!
//! Payment processing itself lives outside this service. Accepting a request
//! only asks the gateway to authorize capture, in the background; a failure is
//! logged and does not revert the confirmation.

use async_trait::async_trait;
use std::sync::Arc;
use telecare_core::models::appointment::AppointmentRequest;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize_capture(&self, appointment: &AppointmentRequest) -> eyre::Result<()>;
}

/// Records capture requests in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPaymentGateway;

#[async_trait]
impl PaymentGateway for LoggingPaymentGateway {
    async fn authorize_capture(&self, appointment: &AppointmentRequest) -> eyre::Result<()> {
        info!(
            "Payment capture requested: appointment={}, patient={}, urgent={}",
            appointment.id, appointment.patient_id, appointment.urgent
        );
        Ok(())
    }
}

/// Requests capture in the background.
pub fn dispatch(
    gateway: Arc<dyn PaymentGateway>,
    appointment: AppointmentRequest,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = gateway.authorize_capture(&appointment).await {
            warn!(
                "Payment capture authorization failed for appointment {}: {:?}",
                appointment.id, e
            );
        }
    })
}
