use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::services::{media::CloudinaryClient, payment::RazorpayClient};

/// Settings handlers read per request that don't belong to a client.
#[derive(Debug, Clone)]
pub struct Settings {
    pub admin_password: String,
    pub currency: String,
}

#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: PgPool,
    pub auth: Authenticator,
    pub payments: RazorpayClient,
    pub media: CloudinaryClient,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn from_config(pool: PgPool, config: &Config) -> Result<Self, crate::Error> {
        let auth = Authenticator::new(
            &config.jwt_secret,
            chrono::Duration::hours(config.token_ttl_hours),
            config.admin_email.clone(),
        );
        let payments = RazorpayClient::new(
            &config.razorpay_base_url,
            &config.razorpay_key_id,
            &config.razorpay_key_secret,
            config.http_timeout(),
        )?;
        let media = CloudinaryClient::new(
            &config.cloudinary_cloud_name,
            &config.cloudinary_upload_preset,
            config.http_timeout(),
        )?;

        Ok(Self {
            pool,
            auth,
            payments,
            media,
            settings: Arc::new(Settings {
                admin_password: config.admin_password.clone(),
                currency: config.currency.clone(),
            }),
        })
    }
}
