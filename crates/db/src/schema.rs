use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // One weekly template per doctor, replaced as a whole
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS doctor_availability (
            doctor_id UUID PRIMARY KEY,
            timezone VARCHAR(64) NOT NULL,
            days JSONB NOT NULL,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointment_requests (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            doctor_id UUID NOT NULL,
            patient_id UUID NOT NULL,
            slot_at TIMESTAMP WITH TIME ZONE NOT NULL,
            consultation_type VARCHAR(16) NOT NULL,
            reason TEXT NOT NULL,
            notes TEXT NULL,
            status VARCHAR(16) NOT NULL,
            urgent BOOLEAN NOT NULL DEFAULT FALSE,
            decline_reason TEXT NULL,
            cancelled_by VARCHAR(16) NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_status CHECK (
                status IN ('pending', 'confirmed', 'declined', 'completed', 'cancelled')
            ),
            CONSTRAINT valid_consultation_type CHECK (consultation_type IN ('video', 'phone')),
            CONSTRAINT valid_cancelled_by CHECK (
                cancelled_by IS NULL OR cancelled_by IN ('patient', 'doctor', 'system')
            )
        );
        "#,
    )
    .execute(pool)
    .await?;

    // At most one active request per doctor and slot. Reservation inserts
    // rely on this index for ON CONFLICT.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS uniq_appointment_requests_active_slot
            ON appointment_requests(doctor_id, slot_at)
            WHERE status IN ('pending', 'confirmed');
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_appointment_requests_doctor_slot ON appointment_requests(doctor_id, slot_at);
        CREATE INDEX IF NOT EXISTS idx_appointment_requests_patient_id ON appointment_requests(patient_id);
        CREATE INDEX IF NOT EXISTS idx_appointment_requests_status_created ON appointment_requests(status, created_at);
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema initialized successfully.");
    Ok(())
}
