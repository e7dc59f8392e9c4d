use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, verify_password, Caller, UserAuth};
use crate::db::{appointments, models::UserProfileUpdate, users};
use crate::error::ApiError;
use crate::handlers::{AppJson, AppointmentRequest, FormData, LoginRequest, Reply};
use crate::services::{booking, payment};
use crate::state::AppState;
use crate::utils::{non_blank, parse_address};

/// Patient routes, mounted under `/api/user`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/get-profile", get(get_profile))
        .route("/update-profile", post(update_profile))
        .route("/book-appointment", post(book_appointment))
        .route("/appointments", get(list_appointments))
        .route("/cancel-appointment", post(cancel_appointment))
        .route("/payment-razorpay", post(payment_razorpay))
        .route("/verifyRazorpay", post(verify_razorpay))
}

#[derive(Deserialize, Validate, Debug)]
pub struct RegisterRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email"))]
    email: Option<String>,
    #[serde(default)]
    #[validate(length(min = 8, message = "Enter a strong password of at least 8 characters"))]
    password: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    doc_id: Uuid,
    #[serde(default)]
    slot_date: Option<String>,
    #[serde(default)]
    slot_time: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct VerifyPaymentRequest {
    razorpay_order_id: String,
}

/// Creates an account and signs the user in.
async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<Reply, ApiError> {
    let (Some(name), Some(email), Some(password)) = (
        non_blank(req.name.as_deref()),
        non_blank(req.email.as_deref()),
        req.password.clone().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::Validation("Missing Details".to_string()));
    };
    req.validate()?;

    if users::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(ApiError::Conflict(
            "User already exists with this email".to_string(),
        ));
    }

    let password_hash = hash_password(password).await?;
    let user = users::insert(&state.pool, &name, &email, &password_hash).await?;
    let token = state.auth.issue_user(user.id)?;
    log::info!("Registered user {}", user.id);

    Reply::ok()
        .status(StatusCode::CREATED)
        .with("token", token)?
        .with("user", user)
}

async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Reply, ApiError> {
    let (email, password) = req.credentials()?;
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = users::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(password, user.password.clone()).await? {
        return Err(invalid());
    }

    let token = state.auth.issue_user(user.id)?;
    Reply::message("User login successful")
        .with("token", token)?
        .with("user", user)
}

async fn get_profile(
    State(state): State<AppState>,
    UserAuth(user_id): UserAuth,
) -> Result<Reply, ApiError> {
    let user = users::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Reply::ok().with("userData", user)
}

/// Multipart profile update. Only the fields sent are changed; an `image`
/// file is uploaded to the media host first.
async fn update_profile(
    State(state): State<AppState>,
    UserAuth(user_id): UserAuth,
    multipart: Multipart,
) -> Result<Reply, ApiError> {
    let form = FormData::read(multipart).await?;

    let address = match form.text("address") {
        Some(raw) => Some(parse_address(&raw).ok_or_else(|| {
            ApiError::Validation(
                "Invalid address format. Address must be a valid JSON string.".to_string(),
            )
        })?),
        None => None,
    };

    let mut update = UserProfileUpdate {
        name: form.text("name"),
        phone: form.text("phone"),
        address,
        dob: form.text("dob"),
        gender: form.text("gender"),
        image: None,
    };

    if update.is_empty() && form.image.is_none() {
        return Err(ApiError::Validation(
            "No data provided to update.".to_string(),
        ));
    }

    if let Some(image) = form.image {
        update.image = Some(state.media.upload(image).await?);
    }

    let user = users::update_profile(&state.pool, user_id, &update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;
    log::info!("Updated profile of user {}", user_id);

    Reply::message("Profile Updated Successfully").with("user", user)
}

async fn book_appointment(
    State(state): State<AppState>,
    UserAuth(user_id): UserAuth,
    AppJson(req): AppJson<BookAppointmentRequest>,
) -> Result<Reply, ApiError> {
    let (Some(slot_date), Some(slot_time)) = (
        non_blank(req.slot_date.as_deref()),
        non_blank(req.slot_time.as_deref()),
    ) else {
        return Err(ApiError::Validation("Missing Details".to_string()));
    };

    let appointment =
        booking::reserve(&state.pool, user_id, req.doc_id, &slot_date, &slot_time).await?;

    Reply::message("Appointment Booked")
        .status(StatusCode::CREATED)
        .with("appointment", appointment)
}

async fn list_appointments(
    State(state): State<AppState>,
    UserAuth(user_id): UserAuth,
) -> Result<Reply, ApiError> {
    let appointments = appointments::list_for_user(&state.pool, user_id).await?;
    Reply::ok().with("appointments", appointments)
}

async fn cancel_appointment(
    State(state): State<AppState>,
    auth: UserAuth,
    AppJson(req): AppJson<AppointmentRequest>,
) -> Result<Reply, ApiError> {
    booking::cancel_appointment(&state.pool, req.appointment_id, Caller::from(auth)).await?;
    Ok(Reply::message("Appointment cancelled"))
}

/// Opens a gateway order the frontend checkout completes.
async fn payment_razorpay(
    State(state): State<AppState>,
    UserAuth(user_id): UserAuth,
    AppJson(req): AppJson<AppointmentRequest>,
) -> Result<Reply, ApiError> {
    let order = payment::create_payment_order(
        &state.pool,
        &state.payments,
        &state.settings.currency,
        req.appointment_id,
        user_id,
    )
    .await?;
    Reply::ok().with("order", order)
}

/// Called after checkout with the order id the gateway returned.
async fn verify_razorpay(
    State(state): State<AppState>,
    UserAuth(user_id): UserAuth,
    AppJson(req): AppJson<VerifyPaymentRequest>,
) -> Result<Reply, ApiError> {
    let paid =
        payment::verify_payment(&state.pool, &state.payments, &req.razorpay_order_id, user_id)
            .await?;

    if paid {
        Ok(Reply::message("Payment Successful"))
    } else {
        Err(ApiError::Validation("Payment failed".to_string()))
    }
}
