use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::db::models::{Appointment, AppointmentDetail};

const DETAIL_SELECT: &str = "SELECT a.id, a.user_id, a.doctor_id, a.slot_date, a.slot_time, a.amount, \
        a.cancelled, a.payment, a.is_completed, a.created_at, \
        u.name AS user_name, u.image AS user_image, u.dob AS user_dob, \
        d.name AS doctor_name, d.image AS doctor_image, d.speciality AS doctor_speciality, \
        d.address AS doctor_address \
    FROM appointments a \
    JOIN users u ON u.id = a.user_id \
    JOIN doctors d ON d.id = a.doctor_id";

/// Creates an active, unpaid appointment for the slot.
///
/// Must run in the transaction that reserved the slot in the doctor's ledger.
pub async fn insert(
    conn: &mut PgConnection,
    user_id: Uuid,
    doctor_id: Uuid,
    slot_date: &str,
    slot_time: &str,
    amount: i64,
) -> Result<Appointment, sqlx::Error> {
    sqlx::query_as::<_, Appointment>(
        "INSERT INTO appointments (id, user_id, doctor_id, slot_date, slot_time, amount) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(doctor_id)
    .bind(slot_date)
    .bind(slot_time)
    .bind(amount)
    .fetch_one(conn)
    .await
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Like [`find_by_id`], but keeps the row locked until the transaction ends.
pub async fn find_by_id_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn mark_cancelled(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE appointments SET cancelled = TRUE WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn mark_completed<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE appointments SET is_completed = TRUE WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Flags the appointment as paid.
///
/// # Returns
///
/// Whether an appointment with that id existed.
pub async fn mark_paid<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE appointments SET payment = TRUE WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// A user's appointments with doctor details, newest first.
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<AppointmentDetail>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentDetail>(&format!(
        "{DETAIL_SELECT} WHERE a.user_id = $1 ORDER BY a.created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// All appointments of a doctor, oldest first.
pub async fn list_for_doctor(
    pool: &PgPool,
    doctor_id: Uuid,
) -> Result<Vec<AppointmentDetail>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentDetail>(&format!(
        "{DETAIL_SELECT} WHERE a.doctor_id = $1 ORDER BY a.created_at"
    ))
    .bind(doctor_id)
    .fetch_all(pool)
    .await
}

/// Every appointment with user and doctor details, newest first.
pub async fn list_all(pool: &PgPool) -> Result<Vec<AppointmentDetail>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentDetail>(&format!("{DETAIL_SELECT} ORDER BY a.created_at DESC"))
        .fetch_all(pool)
        .await
}

/// The `limit` most recently booked appointments.
///
/// # Arguments
///
/// * `pool` - The database connection pool
/// * `limit` - Maximum number of rows to return
pub async fn latest(pool: &PgPool, limit: i64) -> Result<Vec<AppointmentDetail>, sqlx::Error> {
    sqlx::query_as::<_, AppointmentDetail>(&format!(
        "{DETAIL_SELECT} ORDER BY a.created_at DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM appointments")
        .fetch_one(pool)
        .await
}

/// Sum of amounts over appointments that were completed or paid.
pub async fn earnings(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM appointments WHERE is_completed OR payment",
    )
    .fetch_one(pool)
    .await
}
