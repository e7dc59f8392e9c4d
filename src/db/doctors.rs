use serde_json::Value;
use sqlx::{types::Json, PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use crate::db::models::{Doctor, NewDoctor};
use crate::ledger::SlotLedger;

/// Inserts a new doctor with an empty slot ledger.
///
/// # Arguments
///
/// * `pool` - The database connection pool
/// * `doctor` - The doctor's details, with the password already hashed
///
/// # Returns
///
/// The stored `Doctor`. A duplicate email surfaces as a unique violation.
pub async fn insert(pool: &PgPool, doctor: &NewDoctor) -> Result<Doctor, sqlx::Error> {
    sqlx::query_as::<_, Doctor>(
        "INSERT INTO doctors (id, name, email, password, image, speciality, degree, experience, about, fees, address) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&doctor.name)
    .bind(&doctor.email)
    .bind(&doctor.password_hash)
    .bind(&doctor.image)
    .bind(&doctor.speciality)
    .bind(&doctor.degree)
    .bind(&doctor.experience)
    .bind(&doctor.about)
    .bind(doctor.fees)
    .bind(Json(&doctor.address))
    .fetch_one(pool)
    .await
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Doctor>, sqlx::Error> {
    sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Loads the doctor and holds its row lock until the surrounding
/// transaction ends. Every ledger read-modify-write goes through here.
pub async fn find_by_id_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Doctor>, sqlx::Error> {
    sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Looks a doctor up by login email.
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Doctor>, sqlx::Error> {
    sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Every doctor in the order they were added.
pub async fn list(pool: &PgPool) -> Result<Vec<Doctor>, sqlx::Error> {
    sqlx::query_as::<_, Doctor>("SELECT * FROM doctors ORDER BY created_at")
        .fetch_all(pool)
        .await
}

/// Overwrites the doctor's slot ledger.
///
/// Callers must hold the row lock taken by [`find_by_id_for_update`].
pub async fn save_ledger(
    conn: &mut PgConnection,
    id: Uuid,
    ledger: &SlotLedger,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE doctors SET slots_booked = $1 WHERE id = $2")
        .bind(Json(ledger))
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Flips the availability flag, returning the new value, or `None` for an
/// unknown doctor.
pub async fn toggle_availability(pool: &PgPool, id: Uuid) -> Result<Option<bool>, sqlx::Error> {
    sqlx::query_scalar("UPDATE doctors SET available = NOT available WHERE id = $1 RETURNING available")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Sets the editable profile fields of a doctor.
///
/// # Returns
///
/// `false` when no doctor has the given id.
pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    fees: i64,
    address: &Value,
    available: bool,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE doctors SET fees = $1, address = $2, available = $3 WHERE id = $4")
            .bind(fees)
            .bind(Json(address))
            .bind(available)
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM doctors")
        .fetch_one(pool)
        .await
}
