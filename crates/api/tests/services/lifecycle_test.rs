use chrono::{DateTime, Duration, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;
use telecare_api::services::{
    appointments, lifecycle::LifecycleManager, notifier::Notification,
};
use telecare_core::{
    errors::{CareError, ConflictKind, PolicyRule},
    models::appointment::{
        Actor, AppointmentRequest, AppointmentStatus, LifecycleAction, Role,
    },
    scheduling::BookingPolicy,
};
use telecare_db::{mock::store::MockBookingStore, BookingStore};
use test_log::test;
use uuid::Uuid;

use crate::common::{
    details, early, monday_0900, next, FailingNotifier, RecordingPayments, TestContext,
};

#[test(tokio::test)]
async fn test_accept_confirms_and_hands_off_payment() {
    let mut ctx = TestContext::new().await;
    let pending = ctx.reserve(monday_0900()).await;

    let confirmed = ctx
        .lifecycle()
        .accept(&Actor::doctor(ctx.doctor_id), pending.id, early())
        .await
        .unwrap();

    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
    assert_eq!(confirmed.updated_at, early());

    let notification = next(&mut ctx.notifications).await;
    assert_eq!(notification, Notification::Accepted(confirmed.clone()));
    assert_eq!(notification.recipient(), pending.patient_id);
    assert_eq!(next(&mut ctx.payments).await, pending.id);
}

#[test(tokio::test)]
async fn test_only_the_owning_doctor_may_accept() {
    let mut ctx = TestContext::new().await;
    let pending = ctx.reserve(monday_0900()).await;

    for actor in [
        Actor::doctor(Uuid::new_v4()),
        Actor::patient(pending.patient_id),
        Actor::system(),
    ] {
        let result = ctx.lifecycle().accept(&actor, pending.id, early()).await;
        assert!(
            matches!(result, Err(CareError::Authorization(_))),
            "{:?} should not accept, got {:?}",
            actor,
            result
        );
    }

    assert_eq!(
        ctx.store.get_appointment(pending.id).await.unwrap().map(|a| a.status),
        Some(AppointmentStatus::Pending)
    );
}

#[test(tokio::test)]
async fn test_decline_requires_a_reason() {
    let mut ctx = TestContext::new().await;
    let pending = ctx.reserve(monday_0900()).await;

    let result = ctx
        .lifecycle()
        .decline(&Actor::doctor(ctx.doctor_id), pending.id, "  ", early())
        .await;

    assert!(matches!(result, Err(CareError::Validation(_))));
    assert_eq!(
        ctx.store.get_appointment(pending.id).await.unwrap().map(|a| a.status),
        Some(AppointmentStatus::Pending)
    );
}

#[test(tokio::test)]
async fn test_decline_frees_the_slot() {
    let mut ctx = TestContext::new().await;
    let pending = ctx.reserve(monday_0900()).await;

    let declined = ctx
        .lifecycle()
        .decline(
            &Actor::doctor(ctx.doctor_id),
            pending.id,
            " Fully booked that morning ",
            early(),
        )
        .await
        .unwrap();

    assert_eq!(declined.status, AppointmentStatus::Declined);
    assert_eq!(
        declined.decline_reason.as_deref(),
        Some("Fully booked that morning")
    );
    let notification = next(&mut ctx.notifications).await;
    assert!(notification.body().contains("Fully booked that morning"));

    // Another patient can now take the same slot
    let rebooked = ctx.reserve(monday_0900()).await;
    assert_eq!(rebooked.slot_datetime, pending.slot_datetime);
    assert_ne!(rebooked.id, pending.id);
}

#[rstest]
#[case::exactly_at_cutoff(Duration::hours(24), false)]
#[case::one_minute_inside(Duration::hours(24) - Duration::minutes(1), false)]
#[case::one_minute_outside(Duration::hours(24) + Duration::minutes(1), true)]
#[case::a_week_out(Duration::days(6), true)]
#[tokio::test]
async fn test_cancellation_cutoff(#[case] before_slot: Duration, #[case] allowed: bool) {
    let mut ctx = TestContext::new().await;
    let pending = ctx.reserve(monday_0900()).await;
    let now = monday_0900() - before_slot;

    let result = ctx
        .lifecycle()
        .cancel(&Actor::patient(pending.patient_id), pending.id, now)
        .await;

    if allowed {
        let cancelled = result.unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(cancelled.cancelled_by, Some(Role::Patient));
    } else {
        match result {
            Err(CareError::Policy(PolicyRule::CancellationWindow { cutoff_hours })) => {
                assert_eq!(cutoff_hours, 24)
            }
            other => panic!("Expected cancellation_window, got: {:?}", other),
        }
    }
}

#[test(tokio::test)]
async fn test_cancel_notifies_the_other_party() {
    let mut ctx = TestContext::new().await;
    let by_patient = ctx.reserve(monday_0900()).await;
    let by_doctor = ctx.reserve(monday_0900() + Duration::minutes(30)).await;

    ctx.lifecycle()
        .cancel(&Actor::patient(by_patient.patient_id), by_patient.id, early())
        .await
        .unwrap();
    assert_eq!(next(&mut ctx.notifications).await.recipient(), ctx.doctor_id);

    let cancelled = ctx
        .lifecycle()
        .cancel(&Actor::doctor(ctx.doctor_id), by_doctor.id, early())
        .await
        .unwrap();
    assert_eq!(cancelled.cancelled_by, Some(Role::Doctor));
    assert_eq!(
        next(&mut ctx.notifications).await.recipient(),
        by_doctor.patient_id
    );
}

#[test(tokio::test)]
async fn test_terminal_appointments_cannot_move() {
    let mut ctx = TestContext::new().await;
    let pending = ctx.reserve(monday_0900()).await;
    let doctor = Actor::doctor(ctx.doctor_id);
    ctx.lifecycle()
        .cancel(&doctor, pending.id, early())
        .await
        .unwrap();

    let accept = ctx.lifecycle().accept(&doctor, pending.id, early()).await;
    match accept {
        Err(CareError::InvalidTransition { from, action }) => {
            assert_eq!(from, AppointmentStatus::Cancelled);
            assert_eq!(action, LifecycleAction::Accept);
        }
        other => panic!("Expected invalid transition, got: {:?}", other),
    }

    let cancel = ctx.lifecycle().cancel(&doctor, pending.id, early()).await;
    assert!(matches!(cancel, Err(CareError::InvalidTransition { .. })));
}

#[test(tokio::test)]
async fn test_transition_checked_before_cutoff() {
    let mut ctx = TestContext::new().await;
    let pending = ctx.reserve(monday_0900()).await;
    let doctor = Actor::doctor(ctx.doctor_id);
    ctx.lifecycle()
        .decline(&doctor, pending.id, "Away", early())
        .await
        .unwrap();

    // Inside the cutoff, but the request is already declined
    let result = ctx
        .lifecycle()
        .cancel(&doctor, pending.id, monday_0900() - Duration::hours(1))
        .await;

    assert!(matches!(result, Err(CareError::InvalidTransition { .. })));
}

#[test(tokio::test)]
async fn test_complete_waits_for_the_consultation() {
    let mut ctx = TestContext::new().await;
    let pending = ctx.reserve(monday_0900()).await;
    let doctor = Actor::doctor(ctx.doctor_id);

    // Pending requests cannot be completed
    let result = ctx.lifecycle().complete(&doctor, pending.id, monday_0900()).await;
    assert!(matches!(result, Err(CareError::InvalidTransition { .. })));

    ctx.lifecycle()
        .accept(&doctor, pending.id, early())
        .await
        .unwrap();

    let early_finish = ctx
        .lifecycle()
        .complete(&doctor, pending.id, monday_0900() - Duration::minutes(1))
        .await;
    assert!(matches!(
        early_finish,
        Err(CareError::Policy(PolicyRule::ConsultationNotStarted))
    ));

    let completed = ctx
        .lifecycle()
        .complete(&Actor::system(), pending.id, monday_0900())
        .await
        .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);
    assert!(completed.status.is_terminal());
}

#[test(tokio::test)]
async fn test_unknown_appointment_is_not_found() {
    let ctx = TestContext::new().await;

    let result = ctx
        .lifecycle()
        .accept(&Actor::doctor(ctx.doctor_id), Uuid::new_v4(), early())
        .await;

    assert!(matches!(result, Err(CareError::NotFound(_))));
}

fn pending_fixture(doctor_id: Uuid, slot: DateTime<Utc>) -> AppointmentRequest {
    AppointmentRequest::new_pending(doctor_id, Uuid::new_v4(), slot, details("Migraine"), early())
}

#[test(tokio::test)]
async fn test_lost_compare_and_swap_is_conflict() {
    let doctor_id = Uuid::new_v4();
    let appointment = pending_fixture(doctor_id, monday_0900());
    let id = appointment.id;

    let mut store = MockBookingStore::new();
    store
        .expect_get_appointment()
        .returning(move |_| Ok(Some(appointment.clone())));
    store
        .expect_transition_status()
        .withf(move |requested, change| {
            *requested == id
                && change.from == AppointmentStatus::Pending
                && change.to == AppointmentStatus::Confirmed
        })
        .times(1)
        .returning(|_, _| Ok(None));

    let (notifier, mut attempts) = FailingNotifier::new();
    let (payments, mut captures) = RecordingPayments::new();
    let manager = LifecycleManager::new(
        Arc::new(store),
        notifier,
        payments,
        BookingPolicy::default(),
    );

    let result = manager.accept(&Actor::doctor(doctor_id), id, early()).await;

    match result {
        Err(CareError::Conflict(ConflictKind::TransitionRaced)) => {}
        other => panic!("Expected transition_raced conflict, got: {:?}", other),
    }
    assert!(attempts.try_recv().is_err());
    assert!(captures.try_recv().is_err());
}

#[test(tokio::test(flavor = "multi_thread", worker_threads = 4))]
async fn test_racing_accept_and_decline_have_one_winner() {
    let mut ctx = TestContext::new().await;
    let pending = ctx.reserve(monday_0900()).await;
    let doctor = Actor::doctor(ctx.doctor_id);
    let id = pending.id;

    let accept = {
        let manager = ctx.lifecycle();
        tokio::spawn(async move { manager.accept(&doctor, id, early()).await })
    };
    let decline = {
        let manager = ctx.lifecycle();
        tokio::spawn(async move { manager.decline(&doctor, id, "Away", early()).await })
    };

    let results = [accept.await.unwrap(), decline.await.unwrap()];
    let winners: Vec<&AppointmentRequest> =
        results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);

    for result in &results {
        if let Err(e) = result {
            assert!(
                matches!(
                    e,
                    CareError::Conflict(ConflictKind::TransitionRaced)
                        | CareError::InvalidTransition { .. }
                ),
                "unexpected loser error: {:?}",
                e
            );
        }
    }

    let stored = ctx.store.get_appointment(pending.id).await.unwrap().unwrap();
    assert_eq!(stored.status, winners[0].status);
}

#[test(tokio::test)]
async fn test_appointment_reads_are_limited_to_parties() {
    let mut ctx = TestContext::new().await;
    let pending = ctx.reserve(monday_0900()).await;
    let store = ctx.store.as_ref();

    for actor in [
        Actor::doctor(ctx.doctor_id),
        Actor::patient(pending.patient_id),
        Actor::system(),
    ] {
        assert_eq!(
            appointments::get_for_actor(store, &actor, pending.id).await.unwrap(),
            pending
        );
    }

    let stranger =
        appointments::get_for_actor(store, &Actor::patient(Uuid::new_v4()), pending.id).await;
    assert!(matches!(stranger, Err(CareError::Authorization(_))));

    let upcoming = appointments::list_for_patient(
        store,
        &Actor::patient(pending.patient_id),
        pending.patient_id,
        None,
        true,
        monday_0900() + Duration::hours(1),
    )
    .await
    .unwrap();
    assert!(upcoming.is_empty());

    let pending_only = appointments::list_for_doctor(
        store,
        &Actor::doctor(ctx.doctor_id),
        ctx.doctor_id,
        Some(AppointmentStatus::Pending),
        None,
        early(),
    )
    .await
    .unwrap();
    assert_eq!(pending_only, vec![pending]);
}
