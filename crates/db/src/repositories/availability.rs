use crate::models::DbAvailability;
use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::{types::Json, Pool, Postgres};
use std::collections::BTreeMap;
use telecare_core::models::availability::{DayOfWeek, DayTemplate};
use uuid::Uuid;

pub async fn get_availability(
    pool: &Pool<Postgres>,
    doctor_id: Uuid,
) -> Result<Option<DbAvailability>> {
    tracing::debug!("Getting availability for doctor: {}", doctor_id);

    let availability = sqlx::query_as::<_, DbAvailability>(
        r#"
        SELECT doctor_id, timezone, days, updated_at
        FROM doctor_availability
        WHERE doctor_id = $1
        "#,
    )
    .bind(doctor_id)
    .fetch_optional(pool)
    .await?;

    Ok(availability)
}

/// Inserts or fully replaces the doctor's template.
pub async fn upsert_availability(
    pool: &Pool<Postgres>,
    doctor_id: Uuid,
    timezone: &str,
    days: &BTreeMap<DayOfWeek, DayTemplate>,
    updated_at: DateTime<Utc>,
) -> Result<DbAvailability> {
    tracing::debug!(
        "Replacing availability: doctor_id={}, timezone={}",
        doctor_id,
        timezone
    );

    let availability = sqlx::query_as::<_, DbAvailability>(
        r#"
        INSERT INTO doctor_availability (doctor_id, timezone, days, updated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (doctor_id) DO UPDATE
        SET timezone = EXCLUDED.timezone,
            days = EXCLUDED.days,
            updated_at = EXCLUDED.updated_at
        RETURNING doctor_id, timezone, days, updated_at
        "#,
    )
    .bind(doctor_id)
    .bind(timezone)
    .bind(Json(days))
    .bind(updated_at)
    .fetch_one(pool)
    .await?;

    Ok(availability)
}
