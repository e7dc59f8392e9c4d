use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;

use crate::ledger::SlotLedger;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub image: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub available: bool,
    pub fees: i64,
    pub address: Json<Value>,
    pub slots_booked: Json<SlotLedger>,
    pub created_at: DateTime<Utc>,
}

/// Doctor as shown on the public listing: no contact email.
#[derive(Serialize, Debug, Clone)]
pub struct PublicDoctor {
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub available: bool,
    pub fees: i64,
    pub address: Json<Value>,
    pub slots_booked: Json<SlotLedger>,
}

impl From<Doctor> for PublicDoctor {
    fn from(doctor: Doctor) -> Self {
        Self {
            id: doctor.id,
            name: doctor.name,
            image: doctor.image,
            speciality: doctor.speciality,
            degree: doctor.degree,
            experience: doctor.experience,
            about: doctor.about,
            available: doctor.available,
            fees: doctor.fees,
            address: doctor.address,
            slots_booked: doctor.slots_booked,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDoctor {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub image: String,
    pub speciality: String,
    pub degree: String,
    pub experience: String,
    pub about: String,
    pub fees: i64,
    pub address: Value,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub image: String,
    pub phone: String,
    pub address: Json<Value>,
    pub gender: String,
    pub dob: String,
    pub created_at: DateTime<Utc>,
}

/// Profile fields a user may change. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Value>,
    pub dob: Option<String>,
    pub gender: Option<String>,
    pub image: Option<String>,
}

impl UserProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "docId")]
    pub doctor_id: Uuid,
    pub slot_date: String,
    pub slot_time: String,
    pub amount: i64,
    pub cancelled: bool,
    pub payment: bool,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
}

/// An appointment joined with the names and pictures of both parties.
#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub appointment: Appointment,
    pub user_name: String,
    pub user_image: String,
    pub user_dob: String,
    pub doctor_name: String,
    pub doctor_image: String,
    pub doctor_speciality: String,
    pub doctor_address: Json<Value>,
}
