use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::auth::{hash_password, AdminAuth, Caller};
use crate::db::{appointments, doctors, models::NewDoctor};
use crate::error::ApiError;
use crate::handlers::{AppJson, AppointmentRequest, FormData, LoginRequest, Reply};
use crate::services::{booking, dashboard};
use crate::state::AppState;
use crate::utils::{amount_from_str, is_strong_password, parse_address};

/// Admin panel routes, mounted under `/api/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/add-doctor", post(add_doctor))
        .route("/all-doctors", post(all_doctors))
        .route("/change-availability", post(change_availability))
        .route("/appointments", get(list_appointments))
        .route("/cancel-appointment", post(cancel_appointment))
        .route("/dashboard", get(admin_dashboard))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAvailabilityRequest {
    doc_id: Uuid,
}

/// Checks the configured admin credentials and issues an `atoken`.
async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Reply, ApiError> {
    let (email, password) = req.credentials()?;
    if !state.auth.is_admin_email(&email) || password != state.settings.admin_password {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = state.auth.issue_admin()?;
    log::info!("Admin logged in");
    Reply::ok().with("token", token)
}

/// Creates a doctor from a multipart form.
///
/// Every text field is required, as is the `image` file. Input is validated
/// before the image is uploaded.
async fn add_doctor(
    State(state): State<AppState>,
    _admin: AdminAuth,
    multipart: Multipart,
) -> Result<Reply, ApiError> {
    let form = FormData::read(multipart).await?;
    let missing = || ApiError::Validation("Missing Details".to_string());

    let name = form.text("name").ok_or_else(missing)?;
    let email = form.text("email").ok_or_else(missing)?;
    let password = form.text("password").ok_or_else(missing)?;
    let speciality = form.text("speciality").ok_or_else(missing)?;
    let degree = form.text("degree").ok_or_else(missing)?;
    let experience = form.text("experience").ok_or_else(missing)?;
    let about = form.text("about").ok_or_else(missing)?;
    let fees = form.text("fees").ok_or_else(missing)?;
    let address = form.text("address").ok_or_else(missing)?;

    if !email.validate_email() {
        return Err(ApiError::Validation("Please enter a valid Email".to_string()));
    }
    if !is_strong_password(&password) {
        return Err(ApiError::Validation(
            "Please enter a strong password".to_string(),
        ));
    }
    let fees = amount_from_str(&fees)
        .ok_or_else(|| ApiError::Validation("Invalid fees".to_string()))?;
    let address = parse_address(&address)
        .ok_or_else(|| ApiError::Validation("Invalid address format".to_string()))?;
    let image = form
        .image
        .ok_or_else(|| ApiError::Validation("Doctor image is required".to_string()))?;

    if doctors::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(ApiError::Conflict(
            "A doctor with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(password).await?;
    let image = state.media.upload(image).await?;

    let doctor = doctors::insert(
        &state.pool,
        &NewDoctor {
            name,
            email,
            password_hash,
            image,
            speciality,
            degree,
            experience,
            about,
            fees,
            address,
        },
    )
    .await?;
    log::info!("Added doctor {}", doctor.id);

    Reply::message("Doctor added")
        .status(StatusCode::CREATED)
        .with("doctorData", doctor)
}

async fn all_doctors(State(state): State<AppState>, _admin: AdminAuth) -> Result<Reply, ApiError> {
    let doctors = doctors::list(&state.pool).await?;
    Reply::ok().with("doctors", doctors)
}

/// Toggles whether the doctor can be booked.
async fn change_availability(
    State(state): State<AppState>,
    _admin: AdminAuth,
    AppJson(req): AppJson<ChangeAvailabilityRequest>,
) -> Result<Reply, ApiError> {
    let available = doctors::toggle_availability(&state.pool, req.doc_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Doctor not found".to_string()))?;
    log::info!("Doctor {} availability set to {}", req.doc_id, available);

    Reply::message("Availability Changed").with("available", available)
}

async fn list_appointments(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Reply, ApiError> {
    let appointments = appointments::list_all(&state.pool).await?;
    Reply::ok().with("appointments", appointments)
}

async fn cancel_appointment(
    State(state): State<AppState>,
    admin: AdminAuth,
    AppJson(req): AppJson<AppointmentRequest>,
) -> Result<Reply, ApiError> {
    booking::cancel_appointment(&state.pool, req.appointment_id, Caller::from(admin)).await?;
    Ok(Reply::message("Appointment cancelled"))
}

async fn admin_dashboard(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Reply, ApiError> {
    let dash = dashboard::admin_dashboard(&state.pool).await?;
    Reply::ok().with("dashData", dash)
}
