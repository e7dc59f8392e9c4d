use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Caller;
use crate::db::{appointments, doctors, models::Appointment, users};
use crate::error::ApiError;
use crate::ledger::LedgerError;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Doctor not found")]
    DoctorNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Appointment not found")]
    AppointmentNotFound,
    #[error("Doctor is not available")]
    DoctorUnavailable,
    #[error("This time slot is already booked")]
    AlreadyBooked,
    #[error("Unauthorized action")]
    Unauthorized,
    #[error("Appointment has been cancelled")]
    Cancelled,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AlreadyBooked { .. } => BookingError::AlreadyBooked,
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::DoctorNotFound
            | BookingError::UserNotFound
            | BookingError::AppointmentNotFound => ApiError::NotFound(err.to_string()),
            BookingError::DoctorUnavailable | BookingError::Cancelled => {
                ApiError::Validation(err.to_string())
            }
            BookingError::AlreadyBooked => ApiError::Conflict(err.to_string()),
            BookingError::Unauthorized => ApiError::Unauthorized(err.to_string()),
            BookingError::Database(e) => ApiError::from(e),
        }
    }
}

/// Whether `caller` may act on `appointment`. Users and doctors only on
/// their own appointments, the admin on any.
pub fn authorize(appointment: &Appointment, caller: Caller) -> Result<(), BookingError> {
    let permitted = match caller {
        Caller::User(id) => appointment.user_id == id,
        Caller::Doctor(id) => appointment.doctor_id == id,
        Caller::Admin => true,
    };

    if permitted {
        Ok(())
    } else {
        Err(BookingError::Unauthorized)
    }
}

/// Books `slot_time` on `slot_date` with the doctor for the user.
///
/// Runs in one transaction holding the doctor's row lock, so concurrent
/// bookings of the same doctor are applied one after the other and a second
/// booking of the same slot sees the first and fails with `AlreadyBooked`.
/// The ledger is written before the appointment row is created.
pub async fn reserve(
    pool: &PgPool,
    user_id: Uuid,
    doctor_id: Uuid,
    slot_date: &str,
    slot_time: &str,
) -> Result<Appointment, BookingError> {
    let mut tx = pool.begin().await?;

    let doctor = doctors::find_by_id_for_update(&mut tx, doctor_id)
        .await?
        .ok_or(BookingError::DoctorNotFound)?;
    if !doctor.available {
        return Err(BookingError::DoctorUnavailable);
    }

    if users::find_by_id(&mut *tx, user_id).await?.is_none() {
        return Err(BookingError::UserNotFound);
    }

    let mut ledger = doctor.slots_booked.0;
    ledger.reserve(slot_date, slot_time)?;
    doctors::save_ledger(&mut tx, doctor_id, &ledger).await?;

    let appointment =
        appointments::insert(&mut tx, user_id, doctor_id, slot_date, slot_time, doctor.fees)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    BookingError::AlreadyBooked
                }
                _ => BookingError::Database(e),
            })?;

    tx.commit().await?;

    log::info!(
        "Booked appointment {} with doctor {} on {} at {}",
        appointment.id,
        doctor_id,
        slot_date,
        slot_time
    );
    Ok(appointment)
}

/// Frees a slot in the doctor's ledger. Unknown doctors, dates and times are
/// a no-op.
pub async fn release(
    pool: &PgPool,
    doctor_id: Uuid,
    slot_date: &str,
    slot_time: &str,
) -> Result<(), BookingError> {
    let mut tx = pool.begin().await?;
    release_in(&mut tx, doctor_id, slot_date, slot_time).await?;
    tx.commit().await?;
    Ok(())
}

async fn release_in(
    conn: &mut PgConnection,
    doctor_id: Uuid,
    slot_date: &str,
    slot_time: &str,
) -> Result<(), sqlx::Error> {
    let Some(doctor) = doctors::find_by_id_for_update(conn, doctor_id).await? else {
        return Ok(());
    };

    let mut ledger = doctor.slots_booked.0;
    if ledger.release(slot_date, slot_time) {
        doctors::save_ledger(conn, doctor_id, &ledger).await?;
    }
    Ok(())
}

/// Cancels the appointment and frees its slot in a single transaction.
///
/// Cancelling an appointment that is already cancelled changes nothing; the
/// slot may have been booked again in the meantime.
pub async fn cancel_appointment(
    pool: &PgPool,
    appointment_id: Uuid,
    caller: Caller,
) -> Result<Appointment, BookingError> {
    let mut tx = pool.begin().await?;

    let mut appointment = appointments::find_by_id_for_update(&mut tx, appointment_id)
        .await?
        .ok_or(BookingError::AppointmentNotFound)?;
    authorize(&appointment, caller)?;

    if appointment.cancelled {
        return Ok(appointment);
    }

    appointments::mark_cancelled(&mut tx, appointment_id).await?;
    release_in(
        &mut tx,
        appointment.doctor_id,
        &appointment.slot_date,
        &appointment.slot_time,
    )
    .await?;
    tx.commit().await?;

    appointment.cancelled = true;
    log::info!("Appointment {} cancelled by {:?}", appointment_id, caller);
    Ok(appointment)
}

pub async fn complete_appointment(
    pool: &PgPool,
    appointment_id: Uuid,
    doctor_id: Uuid,
) -> Result<(), BookingError> {
    let appointment = appointments::find_by_id(pool, appointment_id)
        .await?
        .ok_or(BookingError::AppointmentNotFound)?;
    authorize(&appointment, Caller::Doctor(doctor_id))?;

    if appointment.cancelled {
        return Err(BookingError::Cancelled);
    }

    appointments::mark_completed(pool, appointment_id).await?;
    log::info!("Appointment {} completed", appointment_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn appointment(user_id: Uuid, doctor_id: Uuid) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            user_id,
            doctor_id,
            slot_date: "2024-06-01".into(),
            slot_time: "10:00".into(),
            amount: 500,
            cancelled: false,
            payment: false,
            is_completed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn owners_may_act_on_their_appointment() {
        let (user, doctor) = (Uuid::new_v4(), Uuid::new_v4());
        let appt = appointment(user, doctor);

        assert!(authorize(&appt, Caller::User(user)).is_ok());
        assert!(authorize(&appt, Caller::Doctor(doctor)).is_ok());
        assert!(authorize(&appt, Caller::Admin).is_ok());
    }

    #[test]
    fn strangers_are_unauthorized() {
        let appt = appointment(Uuid::new_v4(), Uuid::new_v4());

        assert!(matches!(
            authorize(&appt, Caller::User(Uuid::new_v4())),
            Err(BookingError::Unauthorized)
        ));
        assert!(matches!(
            authorize(&appt, Caller::Doctor(Uuid::new_v4())),
            Err(BookingError::Unauthorized)
        ));
    }

    #[test]
    fn roles_are_not_interchangeable() {
        let (user, doctor) = (Uuid::new_v4(), Uuid::new_v4());
        let appt = appointment(user, doctor);

        assert!(authorize(&appt, Caller::User(doctor)).is_err());
        assert!(authorize(&appt, Caller::Doctor(user)).is_err());
    }

    #[test]
    fn booking_errors_map_onto_api_taxonomy() {
        assert!(matches!(
            ApiError::from(BookingError::AlreadyBooked),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(BookingError::AppointmentNotFound),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(BookingError::Unauthorized),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(BookingError::DoctorUnavailable),
            ApiError::Validation(_)
        ));
    }

    #[test]
    fn ledger_conflict_becomes_already_booked() {
        let err = BookingError::from(LedgerError::AlreadyBooked {
            date: "2024-06-01".into(),
            time: "10:00".into(),
        });
        assert!(matches!(err, BookingError::AlreadyBooked));
    }
}
