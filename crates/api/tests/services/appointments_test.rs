use chrono::{Duration, NaiveDate};
use mockall::predicate::eq;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use telecare_api::services::appointments::{self, DaySelector};
use telecare_core::{
    errors::CareError,
    models::{
        appointment::{Actor, AppointmentRequest, AppointmentStatus},
        availability::{DayOfWeek, DayTemplate, TimeRange, WeeklyAvailability},
    },
};
use telecare_db::{mock::store::MockBookingStore, AppointmentFilter, BookingStore};
use test_log::test;
use uuid::Uuid;

use crate::common::{details, early, monday_0900, t, utc, TestContext};

#[test(tokio::test)]
async fn test_doctor_day_is_cut_in_doctor_time_zone() {
    let ctx = TestContext::new().await;
    let doctor_id = Uuid::new_v4();
    let mut days = BTreeMap::new();
    days.insert(
        DayOfWeek::Monday,
        DayTemplate::enabled(vec![TimeRange::new(t(16, 0), t(18, 0)).unwrap()]),
    );
    ctx.store
        .replace_availability(
            WeeklyAvailability::new(doctor_id, chrono_tz::America::Los_Angeles, days, early())
                .unwrap(),
        )
        .await
        .unwrap();

    // Monday 16:00 in Los Angeles is already Tuesday in UTC
    let monday_evening = ctx
        .booking()
        .reserve(
            doctor_id,
            Uuid::new_v4(),
            utc(2030, 1, 8, 0, 0),
            details("Back pain"),
            early(),
        )
        .await
        .unwrap();
    ctx.booking()
        .reserve(
            doctor_id,
            Uuid::new_v4(),
            utc(2030, 1, 15, 0, 0),
            details("Back pain"),
            early(),
        )
        .await
        .unwrap();

    let actor = Actor::doctor(doctor_id);
    let monday = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
    let on_monday = appointments::list_for_doctor(
        ctx.store.as_ref(),
        &actor,
        doctor_id,
        None,
        Some(DaySelector::On(monday)),
        early(),
    )
    .await
    .unwrap();
    assert_eq!(on_monday, vec![monday_evening.clone()]);

    // Noon on Monday in Los Angeles
    let today = appointments::list_for_doctor(
        ctx.store.as_ref(),
        &actor,
        doctor_id,
        Some(AppointmentStatus::Pending),
        Some(DaySelector::Today),
        utc(2030, 1, 7, 20, 0),
    )
    .await
    .unwrap();
    assert_eq!(today, vec![monday_evening]);

    let tuesday = appointments::list_for_doctor(
        ctx.store.as_ref(),
        &actor,
        doctor_id,
        None,
        Some(DaySelector::On(monday.succ_opt().unwrap())),
        early(),
    )
    .await
    .unwrap();
    assert!(tuesday.is_empty());
}

#[test(tokio::test)]
async fn test_day_filter_at_last_date_is_rejected() {
    let ctx = TestContext::new().await;

    let result = appointments::list_for_doctor(
        ctx.store.as_ref(),
        &Actor::doctor(ctx.doctor_id),
        ctx.doctor_id,
        None,
        Some(DaySelector::On(NaiveDate::MAX)),
        early(),
    )
    .await;

    assert!(matches!(result, Err(CareError::Validation(_))));
}

#[test(tokio::test)]
async fn test_patient_list_by_status() {
    let mut ctx = TestContext::new().await;
    let declined = ctx.reserve(monday_0900()).await;
    ctx.lifecycle()
        .decline(&Actor::doctor(ctx.doctor_id), declined.id, "Fully booked", early())
        .await
        .unwrap();
    let patient = Actor::patient(declined.patient_id);

    let found = appointments::list_for_patient(
        ctx.store.as_ref(),
        &patient,
        patient.id,
        Some(AppointmentStatus::Declined),
        false,
        early(),
    )
    .await
    .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, declined.id);

    let completed = appointments::list_for_patient(
        ctx.store.as_ref(),
        &patient,
        patient.id,
        Some(AppointmentStatus::Completed),
        false,
        early(),
    )
    .await
    .unwrap();
    assert!(completed.is_empty());
}

#[test(tokio::test)]
async fn test_starting_soon_lists_confirmed_consultations_for_either_party() {
    let mut ctx = TestContext::new().await;
    let first = ctx.reserve(monday_0900()).await;
    let waiting = ctx.reserve(monday_0900() + Duration::minutes(30)).await;
    let later = ctx.reserve(monday_0900() + Duration::minutes(90)).await;
    let doctor = Actor::doctor(ctx.doctor_id);
    for id in [first.id, later.id] {
        ctx.lifecycle().accept(&doctor, id, early()).await.unwrap();
    }

    let now = monday_0900() - Duration::minutes(10);
    let ids = |list: Vec<AppointmentRequest>| {
        list.into_iter().map(|a| a.id).collect::<Vec<_>>()
    };

    let for_doctor = appointments::starting_soon(ctx.store.as_ref(), &doctor, 15, now)
        .await
        .unwrap();
    assert_eq!(ids(for_doctor), vec![first.id]);

    let for_patient = appointments::starting_soon(
        ctx.store.as_ref(),
        &Actor::patient(first.patient_id),
        15,
        now,
    )
    .await
    .unwrap();
    assert_eq!(ids(for_patient), vec![first.id]);

    // Pending requests are never reported
    let wide = appointments::starting_soon(ctx.store.as_ref(), &doctor, 120, now)
        .await
        .unwrap();
    assert_eq!(ids(wide), vec![first.id, later.id]);
    let waiting_patient = appointments::starting_soon(
        ctx.store.as_ref(),
        &Actor::patient(waiting.patient_id),
        120,
        now,
    )
    .await
    .unwrap();
    assert!(waiting_patient.is_empty());
}

#[test(tokio::test)]
async fn test_starting_soon_rejections() {
    let ctx = TestContext::new().await;
    let doctor = Actor::doctor(ctx.doctor_id);

    for minutes in [0, -5, 24 * 60 + 1] {
        let result = appointments::starting_soon(ctx.store.as_ref(), &doctor, minutes, early()).await;
        assert!(matches!(result, Err(CareError::Validation(_))));
    }

    let result =
        appointments::starting_soon(ctx.store.as_ref(), &Actor::system(), 15, early()).await;
    assert!(matches!(result, Err(CareError::Authorization(_))));
}

#[test(tokio::test)]
async fn test_starting_soon_queries_only_the_callers_side() {
    let doctor_id = Uuid::new_v4();
    let now = early();
    let expected = AppointmentFilter::status(Some(AppointmentStatus::Confirmed))
        .between(now, now + Duration::minutes(15));

    let mut store = MockBookingStore::new();
    store
        .expect_list_for_doctor()
        .with(eq(doctor_id), eq(expected))
        .times(1)
        .returning(|_, _| Ok(Vec::new()));
    store.expect_list_for_patient().never();

    let found = appointments::starting_soon(&store, &Actor::doctor(doctor_id), 15, now)
        .await
        .unwrap();
    assert!(found.is_empty());
}
