use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::{verify_password, Caller, DoctorAuth};
use crate::db::{appointments, doctors, models::PublicDoctor};
use crate::error::ApiError;
use crate::handlers::{AppJson, AppointmentRequest, LoginRequest, Reply};
use crate::services::{booking, dashboard};
use crate::state::AppState;
use crate::utils::{address_from_value, amount_from_value, flag_from_value};

/// Doctor panel routes, mounted under `/api/doctor`. `/list` is public.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(doctor_list))
        .route("/login", post(login))
        .route("/appointments", get(list_appointments))
        .route("/complete-appointment", post(complete_appointment))
        .route("/cancel-appointment", post(cancel_appointment))
        .route("/dashboard", get(doctor_dashboard))
        .route("/profile", get(profile))
        .route("/update-profile", post(update_profile))
}

/// Fields arrive either typed or as strings from form-encoded frontends.
#[derive(Deserialize, Debug, Default)]
pub struct UpdateDoctorProfileRequest {
    #[serde(default)]
    fees: Value,
    #[serde(default)]
    address: Value,
    #[serde(default)]
    available: Value,
}

async fn doctor_list(State(state): State<AppState>) -> Result<Reply, ApiError> {
    let doctors: Vec<PublicDoctor> = doctors::list(&state.pool)
        .await?
        .into_iter()
        .map(PublicDoctor::from)
        .collect();
    Reply::ok().with("doctors", doctors)
}

/// Exchanges doctor credentials for a `dtoken`.
async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Reply, ApiError> {
    let (email, password) = req.credentials()?;
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let doctor = doctors::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(password, doctor.password.clone()).await? {
        return Err(invalid());
    }

    let token = state.auth.issue_doctor(doctor.id)?;
    Reply::ok().with("token", token)
}

async fn list_appointments(
    State(state): State<AppState>,
    DoctorAuth(doctor_id): DoctorAuth,
) -> Result<Reply, ApiError> {
    let appointments = appointments::list_for_doctor(&state.pool, doctor_id).await?;
    Reply::ok().with("appointments", appointments)
}

async fn complete_appointment(
    State(state): State<AppState>,
    DoctorAuth(doctor_id): DoctorAuth,
    AppJson(req): AppJson<AppointmentRequest>,
) -> Result<Reply, ApiError> {
    booking::complete_appointment(&state.pool, req.appointment_id, doctor_id).await?;
    Ok(Reply::message("Appointment Completed"))
}

async fn cancel_appointment(
    State(state): State<AppState>,
    auth: DoctorAuth,
    AppJson(req): AppJson<AppointmentRequest>,
) -> Result<Reply, ApiError> {
    booking::cancel_appointment(&state.pool, req.appointment_id, Caller::from(auth)).await?;
    Ok(Reply::message("Appointment Cancelled"))
}

async fn doctor_dashboard(
    State(state): State<AppState>,
    DoctorAuth(doctor_id): DoctorAuth,
) -> Result<Reply, ApiError> {
    let dash = dashboard::doctor_dashboard(&state.pool, doctor_id).await?;
    Reply::ok().with("dashData", dash)
}

async fn profile(
    State(state): State<AppState>,
    DoctorAuth(doctor_id): DoctorAuth,
) -> Result<Reply, ApiError> {
    let doctor = doctors::find_by_id(&state.pool, doctor_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Doctor not found".to_string()))?;
    Reply::ok().with("profileData", doctor)
}

/// Sets fees, address and availability in one go.
async fn update_profile(
    State(state): State<AppState>,
    DoctorAuth(doctor_id): DoctorAuth,
    AppJson(req): AppJson<UpdateDoctorProfileRequest>,
) -> Result<Reply, ApiError> {
    let fees = amount_from_value(&req.fees)
        .ok_or_else(|| ApiError::Validation("Invalid fees".to_string()))?;
    let address = address_from_value(&req.address)
        .ok_or_else(|| ApiError::Validation("Invalid address format".to_string()))?;
    let available = flag_from_value(&req.available);

    if !doctors::update_profile(&state.pool, doctor_id, fees, &address, available).await? {
        return Err(ApiError::NotFound("Doctor not found".to_string()));
    }
    log::info!("Updated profile of doctor {}", doctor_id);

    Ok(Reply::message("Profile updated"))
}
