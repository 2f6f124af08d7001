use crate::{models::DbAppointment, store::AppointmentFilter};
use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres};
use telecare_core::models::appointment::{AppointmentRequest, StatusChange};
use uuid::Uuid;

/// Inserts a pending request unless an active one already holds the slot.
///
/// Returns `None` when the partial unique index rejected the row.
pub async fn insert_if_slot_free(
    pool: &Pool<Postgres>,
    appointment: &AppointmentRequest,
) -> Result<Option<DbAppointment>> {
    tracing::debug!(
        "Inserting appointment request: id={}, doctor_id={}, slot_at={}",
        appointment.id,
        appointment.doctor_id,
        appointment.slot_datetime
    );

    let inserted = sqlx::query_as::<_, DbAppointment>(
        r#"
        INSERT INTO appointment_requests (
            id, doctor_id, patient_id, slot_at, consultation_type, reason, notes,
            status, urgent, decline_reason, cancelled_by, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (doctor_id, slot_at) WHERE status IN ('pending', 'confirmed') DO NOTHING
        RETURNING id, doctor_id, patient_id, slot_at, consultation_type, reason, notes,
                  status, urgent, decline_reason, cancelled_by, created_at, updated_at
        "#,
    )
    .bind(appointment.id)
    .bind(appointment.doctor_id)
    .bind(appointment.patient_id)
    .bind(appointment.slot_datetime)
    .bind(appointment.consultation_type.as_str())
    .bind(&appointment.reason)
    .bind(appointment.notes.as_deref())
    .bind(appointment.status.as_str())
    .bind(appointment.urgent)
    .bind(appointment.decline_reason.as_deref())
    .bind(appointment.cancelled_by.map(|role| role.as_str()))
    .bind(appointment.created_at)
    .bind(appointment.updated_at)
    .fetch_optional(pool)
    .await?;

    if inserted.is_none() {
        tracing::debug!(
            "Slot already held: doctor_id={}, slot_at={}",
            appointment.doctor_id,
            appointment.slot_datetime
        );
    }

    Ok(inserted)
}

pub async fn get_appointment_by_id(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<DbAppointment>> {
    tracing::debug!("Getting appointment by id: {}", id);

    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, doctor_id, patient_id, slot_at, consultation_type, reason, notes,
               status, urgent, decline_reason, cancelled_by, created_at, updated_at
        FROM appointment_requests
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

pub async fn find_active_at(
    pool: &Pool<Postgres>,
    doctor_id: Uuid,
    slot_at: DateTime<Utc>,
) -> Result<Option<DbAppointment>> {
    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, doctor_id, patient_id, slot_at, consultation_type, reason, notes,
               status, urgent, decline_reason, cancelled_by, created_at, updated_at
        FROM appointment_requests
        WHERE doctor_id = $1 AND slot_at = $2 AND status IN ('pending', 'confirmed')
        "#,
    )
    .bind(doctor_id)
    .bind(slot_at)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

/// Active requests with `from <= slot_at < to`.
pub async fn get_active_between(
    pool: &Pool<Postgres>,
    doctor_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<DbAppointment>> {
    tracing::debug!(
        "Getting active appointments: doctor_id={}, from={}, to={}",
        doctor_id,
        from,
        to
    );

    let appointments = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, doctor_id, patient_id, slot_at, consultation_type, reason, notes,
               status, urgent, decline_reason, cancelled_by, created_at, updated_at
        FROM appointment_requests
        WHERE doctor_id = $1
          AND slot_at >= $2 AND slot_at < $3
          AND status IN ('pending', 'confirmed')
        ORDER BY slot_at ASC
        "#,
    )
    .bind(doctor_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

/// Compare-and-swap status update. Returns `None` when the row is missing or
/// its status no longer equals `change.from`.
pub async fn update_status(
    pool: &Pool<Postgres>,
    id: Uuid,
    change: &StatusChange,
) -> Result<Option<DbAppointment>> {
    tracing::debug!(
        "Updating appointment status: id={}, {} -> {}",
        id,
        change.from,
        change.to
    );

    let appointment = sqlx::query_as::<_, DbAppointment>(
        r#"
        UPDATE appointment_requests
        SET status = $3,
            decline_reason = COALESCE($4, decline_reason),
            cancelled_by = COALESCE($5, cancelled_by),
            updated_at = $6
        WHERE id = $1 AND status = $2
        RETURNING id, doctor_id, patient_id, slot_at, consultation_type, reason, notes,
                  status, urgent, decline_reason, cancelled_by, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(change.from.as_str())
    .bind(change.to.as_str())
    .bind(change.decline_reason.as_deref())
    .bind(change.cancelled_by.map(|role| role.as_str()))
    .bind(change.at)
    .fetch_optional(pool)
    .await?;

    Ok(appointment)
}

pub async fn get_appointments_by_doctor(
    pool: &Pool<Postgres>,
    doctor_id: Uuid,
    filter: &AppointmentFilter,
) -> Result<Vec<DbAppointment>> {
    tracing::debug!("Getting appointments for doctor: {}, {:?}", doctor_id, filter);

    let appointments = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, doctor_id, patient_id, slot_at, consultation_type, reason, notes,
               status, urgent, decline_reason, cancelled_by, created_at, updated_at
        FROM appointment_requests
        WHERE doctor_id = $1
          AND ($2::VARCHAR IS NULL OR status = $2)
          AND (NOT $3 OR status IN ('pending', 'confirmed'))
          AND ($4::TIMESTAMPTZ IS NULL OR slot_at >= $4)
          AND ($5::TIMESTAMPTZ IS NULL OR slot_at < $5)
        ORDER BY slot_at ASC
        "#,
    )
    .bind(doctor_id)
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.active_only)
    .bind(filter.slot_from)
    .bind(filter.slot_before)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

pub async fn get_appointments_by_patient(
    pool: &Pool<Postgres>,
    patient_id: Uuid,
    filter: &AppointmentFilter,
) -> Result<Vec<DbAppointment>> {
    tracing::debug!("Getting appointments for patient: {}, {:?}", patient_id, filter);

    let appointments = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, doctor_id, patient_id, slot_at, consultation_type, reason, notes,
               status, urgent, decline_reason, cancelled_by, created_at, updated_at
        FROM appointment_requests
        WHERE patient_id = $1
          AND ($2::VARCHAR IS NULL OR status = $2)
          AND (NOT $3 OR status IN ('pending', 'confirmed'))
          AND ($4::TIMESTAMPTZ IS NULL OR slot_at >= $4)
          AND ($5::TIMESTAMPTZ IS NULL OR slot_at < $5)
        ORDER BY slot_at ASC
        "#,
    )
    .bind(patient_id)
    .bind(filter.status.map(|s| s.as_str()))
    .bind(filter.active_only)
    .bind(filter.slot_from)
    .bind(filter.slot_before)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}

/// Pending requests created at or before `created_before`, or whose slot has
/// already started.
pub async fn get_expirable_pending(
    pool: &Pool<Postgres>,
    created_before: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Vec<DbAppointment>> {
    let appointments = sqlx::query_as::<_, DbAppointment>(
        r#"
        SELECT id, doctor_id, patient_id, slot_at, consultation_type, reason, notes,
               status, urgent, decline_reason, cancelled_by, created_at, updated_at
        FROM appointment_requests
        WHERE status = 'pending' AND (created_at <= $1 OR slot_at <= $2)
        ORDER BY created_at ASC
        "#,
    )
    .bind(created_before)
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(appointments)
}
