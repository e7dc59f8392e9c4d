use std::collections::HashMap;

use axum::{
    extract::{DefaultBodyLimit, FromRequest, Multipart},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::media::ImageUpload;
use crate::state::AppState;
use crate::utils::non_blank;

pub mod admin;
pub mod doctor;
pub mod user;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Builds the API router. Any origin may call it, since the patient, doctor
/// and admin panels are served from their own hosts.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "API WORKING" }))
        .nest("/api/admin", admin::routes())
        .nest("/api/doctor", doctor::routes())
        .nest("/api/user", user::routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// JSON body extractor whose rejections use the API's failure payload.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub appointment_id: Uuid,
}

#[derive(Deserialize, Debug, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn credentials(self) -> Result<(String, String), ApiError> {
        match (non_blank(self.email.as_deref()), self.password) {
            (Some(email), Some(password)) if !password.is_empty() => Ok((email, password)),
            _ => Err(ApiError::Validation("Missing Details".to_string())),
        }
    }
}

/// Successful response: `{"success": true, "message"?: ..., ...payload}`.
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    message: Option<String>,
    data: Map<String, Value>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            message: None,
            data: Map::new(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with(mut self, key: &str, value: impl Serialize) -> Result<Self, ApiError> {
        let value = serde_json::to_value(value)
            .map_err(|e| ApiError::Internal(format!("failed to serialize {}: {}", key, e)))?;
        self.data.insert(key.to_string(), value);
        Ok(self)
    }

    fn body(self) -> Value {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(true));
        if let Some(message) = self.message {
            body.insert("message".to_string(), Value::String(message));
        }
        body.extend(self.data);
        Value::Object(body)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self.body())).into_response()
    }
}

/// Text fields and the optional `image` file of a multipart form.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// The trimmed field value, or `None` when missing or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        non_blank(self.fields.get(name).map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_flattens_payload_next_to_success() {
        let body = Reply::message("Doctor added")
            .with("doctors", vec!["a", "b"])
            .unwrap()
            .body();

        assert_eq!(
            body,
            json!({ "success": true, "message": "Doctor added", "doctors": ["a", "b"] })
        );
    }

    #[test]
    fn reply_without_message_omits_it() {
        let body = Reply::ok().with("token", "abc").unwrap().body();
        assert_eq!(body, json!({ "success": true, "token": "abc" }));
    }

    #[test]
    fn login_requires_both_fields() {
        let missing = LoginRequest {
            email: Some("a@b.co".into()),
            password: None,
        };
        assert!(matches!(missing.credentials(), Err(ApiError::Validation(_))));

        let blank = LoginRequest {
            email: Some("  ".into()),
            password: Some("secret123".into()),
        };
        assert!(blank.credentials().is_err());

        let complete = LoginRequest {
            email: Some(" a@b.co ".into()),
            password: Some("secret123".into()),
        };
        assert_eq!(
            complete.credentials().unwrap(),
            ("a@b.co".to_string(), "secret123".to_string())
        );
    }

    #[test]
    fn form_text_ignores_blank_fields() {
        let mut form = FormData::default();
        form.fields.insert("name".into(), " Jane ".into());
        form.fields.insert("phone".into(), "".into());

        assert_eq!(form.text("name").as_deref(), Some("Jane"));
        assert_eq!(form.text("phone"), None);
        assert_eq!(form.text("gender"), None);
    }
}
