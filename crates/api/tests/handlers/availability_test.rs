use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use telecare_core::models::{
    appointment::Actor,
    availability::{DayOfWeek, WeeklyAvailability},
    slot::{SlotListResponse, SlotStatus, SlotValidation},
};
use uuid::Uuid;

use crate::{as_actor, common::TestContext, server};

#[tokio::test]
async fn test_health_and_version() {
    let ctx = TestContext::new().await;
    let server = server(&ctx);

    let health = server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>(), json!({ "status": "ok" }));

    let version = server.get("/version").await;
    version.assert_status_ok();
    assert_eq!(version.json::<Value>()["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_get_availability() {
    let ctx = TestContext::new().await;
    let server = server(&ctx);

    let response = server
        .get(&format!("/api/doctors/{}/availability", ctx.doctor_id))
        .await;

    response.assert_status_ok();
    let availability = response.json::<WeeklyAvailability>();
    assert_eq!(availability.doctor_id, ctx.doctor_id);
    assert_eq!(availability.enabled_ranges(DayOfWeek::Monday).len(), 1);
}

#[tokio::test]
async fn test_unknown_doctor_is_404() {
    let ctx = TestContext::new().await;
    let server = server(&ctx);
    let unknown = Uuid::new_v4();

    let response = server
        .get(&format!("/api/doctors/{}/availability", unknown))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "not_found");

    let slots = server
        .get(&format!("/api/doctors/{}/slots", unknown))
        .add_query_param("date", "2030-01-07")
        .await;
    slots.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_replace_availability() {
    let ctx = TestContext::new().await;
    let server = server(&ctx);
    let path = format!("/api/doctors/{}/availability", ctx.doctor_id);
    let body = json!({
        "timezone": "Europe/Berlin",
        "days": {
            "tuesday": {
                "enabled": true,
                "ranges": [
                    { "start": "08:00:00", "end": "12:00:00" },
                    { "start": "14:00:00", "end": "17:30:00" }
                ]
            },
            "friday": { "enabled": false }
        }
    });

    let response = as_actor(server.put(&path), Actor::doctor(ctx.doctor_id))
        .json(&body)
        .await;

    response.assert_status_ok();
    let stored = response.json::<WeeklyAvailability>();
    assert_eq!(stored.timezone, chrono_tz::Europe::Berlin);
    assert!(stored.enabled_ranges(DayOfWeek::Monday).is_empty());
    assert_eq!(stored.enabled_ranges(DayOfWeek::Tuesday).len(), 2);

    // The new template is what slot listing now reads
    let slots = server
        .get(&format!("/api/doctors/{}/slots", ctx.doctor_id))
        .add_query_param("date", "2030-01-08")
        .await
        .json::<SlotListResponse>();
    assert_eq!(slots.total_slots, 15);
}

#[tokio::test]
async fn test_replace_availability_rejections() {
    let ctx = TestContext::new().await;
    let server = server(&ctx);
    let path = format!("/api/doctors/{}/availability", ctx.doctor_id);
    let valid = json!({ "timezone": "UTC", "days": {} });

    // No identity headers
    server
        .put(&path)
        .json(&valid)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // Someone else's template
    as_actor(server.put(&path), Actor::doctor(Uuid::new_v4()))
        .json(&valid)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    as_actor(server.put(&path), Actor::patient(Uuid::new_v4()))
        .json(&valid)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Overlapping ranges
    let overlapping = json!({
        "timezone": "UTC",
        "days": {
            "monday": {
                "enabled": true,
                "ranges": [
                    { "start": "09:00:00", "end": "11:00:00" },
                    { "start": "10:30:00", "end": "12:00:00" }
                ]
            }
        }
    });
    let response = as_actor(server.put(&path), Actor::doctor(ctx.doctor_id))
        .json(&overlapping)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "validation");
}

#[tokio::test]
async fn test_list_slots() {
    let mut ctx = TestContext::new().await;
    ctx.reserve(crate::common::utc(2030, 1, 7, 10, 0)).await;
    let server = server(&ctx);

    let response = server
        .get(&format!("/api/doctors/{}/slots", ctx.doctor_id))
        .add_query_param("date", "2030-01-07")
        .await;

    response.assert_status_ok();
    let list = response.json::<SlotListResponse>();
    assert_eq!(list.day_of_week, DayOfWeek::Monday);
    assert_eq!(list.total_slots, 4);
    assert_eq!(list.booked_count, 1);
    assert_eq!(list.available_count, 3);
    let statuses: Vec<SlotStatus> = list.slots.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![
            SlotStatus::Available,
            SlotStatus::Available,
            SlotStatus::Booked,
            SlotStatus::Available,
        ]
    );

    // A day without availability is an empty list, not an error
    let tuesday = server
        .get(&format!("/api/doctors/{}/slots", ctx.doctor_id))
        .add_query_param("date", "2030-01-08")
        .await
        .json::<SlotListResponse>();
    assert!(tuesday.slots.is_empty());
}

#[tokio::test]
async fn test_validate_slot() {
    let mut ctx = TestContext::new().await;
    ctx.reserve(crate::common::monday_0900()).await;
    let server = server(&ctx);
    let path = format!("/api/doctors/{}/slots/validate", ctx.doctor_id);

    let free = server
        .post(&path)
        .json(&json!({ "date": "2030-01-07", "time": "09:30:00" }))
        .await;
    free.assert_status_ok();
    assert_eq!(
        free.json::<SlotValidation>(),
        SlotValidation {
            ok: true,
            reason: None,
            message: None,
        }
    );

    for (time, reason) in [
        ("09:00:00", "already_booked"),
        ("09:10:00", "outside_availability"),
        ("10:45:00", "outside_availability"),
    ] {
        let response = server
            .post(&path)
            .json(&json!({ "date": "2030-01-07", "time": time }))
            .await;
        response.assert_status_ok();
        let validation = response.json::<SlotValidation>();
        assert!(!validation.ok);
        assert_eq!(validation.reason.as_deref(), Some(reason));
    }

    let tuesday = server
        .post(&path)
        .json(&json!({ "date": "2030-01-08", "time": "09:00:00" }))
        .await
        .json::<SlotValidation>();
    assert_eq!(tuesday.reason.as_deref(), Some("not_available_on_day"));

    let past = server
        .post(&path)
        .json(&json!({ "date": "2020-01-06", "time": "09:00:00" }))
        .await
        .json::<SlotValidation>();
    assert_eq!(past.reason.as_deref(), Some("slot_passed"));
}
