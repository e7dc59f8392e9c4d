use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL")]
    pub database_url: String,

    #[envconfig(from = "PORT", default = "4000")]
    pub port: u16,

    #[envconfig(from = "JWT_SECRET")]
    pub jwt_secret: String,

    /// Lifetime of user and doctor tokens. Admin tokens always expire after a day.
    #[envconfig(from = "TOKEN_TTL_HOURS", default = "72")]
    pub token_ttl_hours: i64,

    #[envconfig(from = "ADMIN_EMAIL")]
    pub admin_email: String,

    #[envconfig(from = "ADMIN_PASSWORD")]
    pub admin_password: String,

    #[envconfig(from = "RAZORPAY_KEY_ID")]
    pub razorpay_key_id: String,

    #[envconfig(from = "RAZORPAY_KEY_SECRET")]
    pub razorpay_key_secret: String,

    #[envconfig(from = "RAZORPAY_BASE_URL", default = "https://api.razorpay.com/v1")]
    pub razorpay_base_url: String,

    #[envconfig(from = "CURRENCY", default = "INR")]
    pub currency: String,

    #[envconfig(from = "CLOUDINARY_CLOUD_NAME")]
    pub cloudinary_cloud_name: String,

    #[envconfig(from = "CLOUDINARY_UPLOAD_PRESET")]
    pub cloudinary_upload_preset: String,

    /// Timeout applied to every outbound call to the payment gateway and media host.
    #[envconfig(from = "HTTP_TIMEOUT_SECS", default = "10")]
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs)
    }
}
