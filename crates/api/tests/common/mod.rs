#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use telecare_api::{
    services::{
        booking::BookingCoordinator,
        lifecycle::LifecycleManager,
        notifier::{Notification, Notifier},
        payment::PaymentGateway,
    },
    ApiState,
};
use telecare_core::{
    models::{
        appointment::{AppointmentRequest, BookingDetails, ConsultationType},
        availability::{DayOfWeek, DayTemplate, TimeRange, WeeklyAvailability},
    },
    scheduling::BookingPolicy,
};
use telecare_db::{BookingStore, MemoryStore};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// 2030-01-07 is a Monday.
pub fn monday_0900() -> DateTime<Utc> {
    utc(2030, 1, 7, 9, 0)
}

/// A week before the Monday slots.
pub fn early() -> DateTime<Utc> {
    utc(2030, 1, 1, 0, 0)
}

/// Mondays 09:00-11:00 UTC.
pub fn monday_morning(doctor_id: Uuid) -> WeeklyAvailability {
    let mut days = BTreeMap::new();
    days.insert(
        DayOfWeek::Monday,
        DayTemplate::enabled(vec![TimeRange::new(t(9, 0), t(11, 0)).unwrap()]),
    );
    WeeklyAvailability::new(doctor_id, Tz::UTC, days, early()).unwrap()
}

pub fn details(reason: &str) -> BookingDetails {
    BookingDetails {
        consultation_type: ConsultationType::Video,
        reason: reason.to_string(),
        urgent: false,
        notes: None,
    }
}

/// Forwards every notification to a channel.
pub struct RecordingNotifier {
    tx: UnboundedSender<Notification>,
}

impl RecordingNotifier {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> eyre::Result<()> {
        self.tx.send(notification.clone())?;
        Ok(())
    }
}

/// Fails every delivery after recording the attempt.
pub struct FailingNotifier {
    tx: UnboundedSender<Notification>,
}

impl FailingNotifier {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, notification: &Notification) -> eyre::Result<()> {
        let _ = self.tx.send(notification.clone());
        Err(eyre::eyre!("mail relay unavailable"))
    }
}

/// Records each notification only after a delay.
pub struct SlowNotifier {
    delay: Duration,
    tx: UnboundedSender<Notification>,
}

impl SlowNotifier {
    pub fn new(delay: Duration) -> (Arc<Self>, UnboundedReceiver<Notification>) {
        let (tx, rx) = unbounded_channel();
        (Arc::new(Self { delay, tx }), rx)
    }
}

#[async_trait]
impl Notifier for SlowNotifier {
    async fn send(&self, notification: &Notification) -> eyre::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.tx.send(notification.clone())?;
        Ok(())
    }
}

pub struct RecordingPayments {
    tx: UnboundedSender<Uuid>,
}

impl RecordingPayments {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<Uuid>) {
        let (tx, rx) = unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl PaymentGateway for RecordingPayments {
    async fn authorize_capture(&self, appointment: &AppointmentRequest) -> eyre::Result<()> {
        self.tx.send(appointment.id)?;
        Ok(())
    }
}

/// Waits for the next background message.
pub async fn next<T>(rx: &mut UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for background task")
        .expect("channel closed")
}

/// A memory store with one doctor's Monday template, wired into an
/// `ApiState` that records notifications and payment hand-offs.
pub struct TestContext {
    pub doctor_id: Uuid,
    pub store: Arc<MemoryStore>,
    pub state: Arc<ApiState>,
    pub notifications: UnboundedReceiver<Notification>,
    pub payments: UnboundedReceiver<Uuid>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_policy(BookingPolicy::default()).await
    }

    pub async fn with_policy(policy: BookingPolicy) -> Self {
        let doctor_id = Uuid::new_v4();
        let store = Arc::new(MemoryStore::new());
        store
            .replace_availability(monday_morning(doctor_id))
            .await
            .unwrap();

        let (notifier, notifications) = RecordingNotifier::new();
        let (gateway, payments) = RecordingPayments::new();
        let state = ApiState::new(store.clone(), policy)
            .with_notifier(notifier)
            .with_payments(gateway);

        Self {
            doctor_id,
            store,
            state: Arc::new(state),
            notifications,
            payments,
        }
    }

    pub fn booking(&self) -> BookingCoordinator {
        BookingCoordinator::from_state(&self.state)
    }

    pub fn lifecycle(&self) -> LifecycleManager {
        LifecycleManager::from_state(&self.state)
    }

    /// Reserves `slot` for a new patient, booked at `early()`.
    pub async fn reserve(&mut self, slot: DateTime<Utc>) -> AppointmentRequest {
        let appointment = self
            .booking()
            .reserve(self.doctor_id, Uuid::new_v4(), slot, details("Check-up"), early())
            .await
            .unwrap();
        // Drain the new-request notification
        next(&mut self.notifications).await;
        appointment
    }
}
