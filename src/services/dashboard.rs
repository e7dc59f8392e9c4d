use std::collections::HashSet;

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{appointments, doctors, models::AppointmentDetail, users};

const LATEST_LIMIT: usize = 5;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    pub doctors: i64,
    pub appointments: i64,
    pub patients: i64,
    pub earning: i64,
    pub latest_appointments: Vec<AppointmentDetail>,
}

/// Only completed or paid appointments count towards earnings.
pub fn earns(detail: &AppointmentDetail) -> bool {
    detail.appointment.is_completed || detail.appointment.payment
}

pub async fn admin_dashboard(pool: &PgPool) -> Result<AdminDashboard, sqlx::Error> {
    let (doctors, patients, appointments, earning, latest_appointments) = futures::try_join!(
        doctors::count(pool),
        users::count(pool),
        appointments::count(pool),
        appointments::earnings(pool),
        appointments::latest(pool, LATEST_LIMIT as i64),
    )?;

    Ok(AdminDashboard {
        doctors,
        appointments,
        patients,
        earning,
        latest_appointments,
    })
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDashboard {
    pub earning: i64,
    pub appointments: usize,
    pub patients: usize,
    pub latest_appointments: Vec<AppointmentDetail>,
}

/// Aggregates a doctor's appointments, which must be ordered oldest first.
pub fn summarize(mut details: Vec<AppointmentDetail>) -> DoctorDashboard {
    let earning = details
        .iter()
        .filter(|d| earns(d))
        .map(|d| d.appointment.amount)
        .sum();
    let patients = details
        .iter()
        .map(|d| d.appointment.user_id)
        .collect::<HashSet<_>>()
        .len();
    let appointments = details.len();

    details.reverse();
    details.truncate(LATEST_LIMIT);

    DoctorDashboard {
        earning,
        appointments,
        patients,
        latest_appointments: details,
    }
}

pub async fn doctor_dashboard(
    pool: &PgPool,
    doctor_id: Uuid,
) -> Result<DoctorDashboard, sqlx::Error> {
    let details = appointments::list_for_doctor(pool, doctor_id).await?;
    Ok(summarize(details))
}
