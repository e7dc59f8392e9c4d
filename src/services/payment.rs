use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Caller;
use crate::db::appointments;
use crate::error::ApiError;
use crate::services::booking::{authorize, BookingError};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid order id: {0}")]
    InvalidOrderId(String),
    #[error("amount {0} cannot be charged")]
    InvalidAmount(i64),
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidOrderId(_) | GatewayError::InvalidAmount(_) => {
                ApiError::Validation(err.to_string())
            }
            GatewayError::Http(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OrderRequest {
    /// Minor currency units (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

impl OrderRequest {
    /// Builds the order for an appointment fee given in whole units.
    ///
    /// # Returns
    ///
    /// `InvalidAmount` when the fee is negative or does not fit in minor units.
    pub fn for_appointment(
        appointment_id: Uuid,
        amount: i64,
        currency: &str,
    ) -> Result<Self, GatewayError> {
        let minor = amount
            .checked_mul(100)
            .filter(|minor| *minor >= 0)
            .ok_or(GatewayError::InvalidAmount(amount))?;

        Ok(Self {
            amount: minor,
            currency: currency.to_string(),
            receipt: appointment_id.to_string(),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Order {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    pub status: String,
    #[serde(default)]
    pub amount_paid: i64,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.status == "paid"
    }

    pub fn appointment_id(&self) -> Option<Uuid> {
        self.receipt.as_deref().and_then(|r| Uuid::parse_str(r).ok())
    }
}

#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(
        base_url: &str,
        key_id: &str,
        key_secret: &str,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: key_id.to_string(),
            key_secret: key_secret.to_string(),
        })
    }

    pub async fn create_order(&self, request: &OrderRequest) -> Result<Order, GatewayError> {
        let order = self
            .http
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<Order>()
            .await?;
        Ok(order)
    }

    pub async fn fetch_order(&self, order_id: &str) -> Result<Order, GatewayError> {
        validate_order_id(order_id)?;
        let order = self
            .http
            .get(format!("{}/orders/{}", self.base_url, order_id))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .await?
            .error_for_status()?
            .json::<Order>()
            .await?;
        Ok(order)
    }
}

/// Order ids end up in the request path, so only the gateway's own alphabet
/// is accepted.
fn validate_order_id(order_id: &str) -> Result<(), GatewayError> {
    let valid = !order_id.is_empty()
        && order_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(GatewayError::InvalidOrderId(order_id.to_string()))
    }
}

/// Opens a gateway order for the user's appointment.
pub async fn create_payment_order(
    pool: &PgPool,
    gateway: &RazorpayClient,
    currency: &str,
    appointment_id: Uuid,
    user_id: Uuid,
) -> Result<Order, ApiError> {
    let appointment = appointments::find_by_id(pool, appointment_id)
        .await?
        .filter(|a| !a.cancelled)
        .ok_or_else(|| ApiError::NotFound("Appointment Cancelled or not found".to_string()))?;
    authorize(&appointment, Caller::User(user_id))?;

    let request = OrderRequest::for_appointment(appointment.id, appointment.amount, currency)?;
    let order = gateway.create_order(&request).await?;
    log::info!("Created order {} for appointment {}", order.id, appointment.id);
    Ok(order)
}

/// Looks the order up at the gateway and flags the appointment as paid once
/// the gateway reports it settled. Returns whether the payment went through.
pub async fn verify_payment(
    pool: &PgPool,
    gateway: &RazorpayClient,
    order_id: &str,
    user_id: Uuid,
) -> Result<bool, ApiError> {
    let order = gateway.fetch_order(order_id).await?;
    if !order.is_paid() {
        log::warn!("Order {} is not paid (status {})", order.id, order.status);
        return Ok(false);
    }

    let appointment_id = order
        .appointment_id()
        .ok_or_else(|| ApiError::Validation("Order does not reference an appointment".to_string()))?;
    let appointment = appointments::find_by_id(pool, appointment_id)
        .await?
        .ok_or(BookingError::AppointmentNotFound)?;
    authorize(&appointment, Caller::User(user_id))?;

    appointments::mark_paid(pool, appointment_id).await?;
    log::info!("Appointment {} paid via order {}", appointment_id, order.id);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn order_amount_is_in_minor_units() {
        let id = Uuid::new_v4();
        let request = OrderRequest::for_appointment(id, 500, "INR").unwrap();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "amount": 50000, "currency": "INR", "receipt": id.to_string() })
        );
    }

    #[test]
    fn oversized_fee_is_rejected_not_wrapped() {
        let id = Uuid::new_v4();

        let err = OrderRequest::for_appointment(id, 100_000_000_000_000_000, "INR").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidAmount(_)));
        assert_eq!(
            ApiError::from(err).status(),
            axum::http::StatusCode::BAD_REQUEST
        );

        assert!(OrderRequest::for_appointment(id, i64::MAX, "INR").is_err());
        assert!(OrderRequest::for_appointment(id, -1, "INR").is_err());
    }

    #[test]
    fn parses_gateway_order_and_receipt() {
        let id = Uuid::new_v4();
        let order: Order = serde_json::from_value(json!({
            "id": "order_Nx1",
            "entity": "order",
            "amount": 50000,
            "amount_paid": 50000,
            "currency": "INR",
            "receipt": id.to_string(),
            "status": "paid",
            "attempts": 1
        }))
        .unwrap();

        assert!(order.is_paid());
        assert_eq!(order.appointment_id(), Some(id));
    }

    #[test]
    fn created_order_is_not_paid() {
        let order: Order = serde_json::from_value(json!({
            "id": "order_Nx2",
            "amount": 100,
            "currency": "INR",
            "receipt": "not-a-uuid",
            "status": "created"
        }))
        .unwrap();

        assert!(!order.is_paid());
        assert_eq!(order.appointment_id(), None);
    }

    #[test]
    fn order_ids_are_restricted_to_gateway_alphabet() {
        assert!(validate_order_id("order_Nx2AbC9").is_ok());
        assert!(validate_order_id("").is_err());
        assert!(validate_order_id("../payments").is_err());
        assert!(validate_order_id("order?x=1").is_err());
    }
}
