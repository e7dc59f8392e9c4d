//! Booking scenarios against a live Postgres. They are ignored by default;
//! run them with `TEST_DATABASE_URL=... cargo test --test booking -- --ignored`.

use serde_json::json;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use prescripto::{
    auth::Caller,
    db::{appointments, doctors, init_db, models::NewDoctor, users},
    ledger::SlotLedger,
    services::booking::{self, BookingError},
};

// Database creation and migrations run once at a time.
static INIT: Mutex<()> = Mutex::const_new(());

async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a Postgres server");
    let _guard = INIT.lock().await;
    init_db(&url).await.unwrap()
}

async fn seed_doctor(pool: &PgPool) -> Uuid {
    let doctor = doctors::insert(
        pool,
        &NewDoctor {
            name: "Dr. Test".into(),
            email: format!("doctor-{}@prescripto.test", Uuid::new_v4()),
            password_hash: "x".into(),
            image: String::new(),
            speciality: "General physician".into(),
            degree: "MBBS".into(),
            experience: "4 Years".into(),
            about: String::new(),
            fees: 500,
            address: json!({ "line1": "", "line2": "" }),
        },
    )
    .await
    .unwrap();
    doctor.id
}

async fn seed_user(pool: &PgPool) -> Uuid {
    let email = format!("user-{}@prescripto.test", Uuid::new_v4());
    users::insert(pool, "Patient", &email, "x").await.unwrap().id
}

async fn ledger_of(pool: &PgPool, doctor_id: Uuid) -> SlotLedger {
    doctors::find_by_id(pool, doctor_id)
        .await
        .unwrap()
        .unwrap()
        .slots_booked
        .0
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs TEST_DATABASE_URL"]
async fn book_repeat_and_cancel() {
    let pool = test_pool().await;
    let doctor = seed_doctor(&pool).await;
    let user = seed_user(&pool).await;

    let appt = booking::reserve(&pool, user, doctor, "2024-06-01", "10:00")
        .await
        .unwrap();
    assert_eq!(appt.amount, 500);
    assert!(!appt.cancelled && !appt.payment && !appt.is_completed);
    assert_eq!(
        serde_json::to_value(ledger_of(&pool, doctor).await).unwrap(),
        json!({ "2024-06-01": ["10:00"] })
    );

    let repeat = booking::reserve(&pool, user, doctor, "2024-06-01", "10:00").await;
    assert!(matches!(repeat, Err(BookingError::AlreadyBooked)));

    let cancelled = booking::cancel_appointment(&pool, appt.id, Caller::User(user))
        .await
        .unwrap();
    assert!(cancelled.cancelled);
    assert!(ledger_of(&pool, doctor).await.is_empty());

    // The freed slot can be booked again.
    booking::reserve(&pool, user, doctor, "2024-06-01", "10:00")
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs TEST_DATABASE_URL"]
async fn concurrent_bookings_of_one_slot() {
    let pool = test_pool().await;
    let doctor = seed_doctor(&pool).await;
    let (first, second) = (seed_user(&pool).await, seed_user(&pool).await);

    let (a, b) = tokio::join!(
        booking::reserve(&pool, first, doctor, "2024-06-02", "11:00"),
        booking::reserve(&pool, second, doctor, "2024-06-02", "11:00"),
    );

    let booked = [&a, &b].iter().filter(|r| r.is_ok()).count();
    let rejected = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(BookingError::AlreadyBooked)))
        .count();
    assert_eq!((booked, rejected), (1, 1));
    assert_eq!(
        ledger_of(&pool, doctor).await.times("2024-06-02"),
        vec!["11:00".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs TEST_DATABASE_URL"]
async fn stranger_cannot_cancel() {
    let pool = test_pool().await;
    let doctor = seed_doctor(&pool).await;
    let owner = seed_user(&pool).await;
    let stranger = seed_user(&pool).await;

    let appt = booking::reserve(&pool, owner, doctor, "2024-06-03", "09:00")
        .await
        .unwrap();

    let result = booking::cancel_appointment(&pool, appt.id, Caller::User(stranger)).await;
    assert!(matches!(result, Err(BookingError::Unauthorized)));

    let stored = appointments::find_by_id(&pool, appt.id).await.unwrap().unwrap();
    assert!(!stored.cancelled);
    assert!(ledger_of(&pool, doctor).await.is_booked("2024-06-03", "09:00"));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs TEST_DATABASE_URL"]
async fn cancelling_twice_is_a_no_op() {
    let pool = test_pool().await;
    let doctor = seed_doctor(&pool).await;
    let user = seed_user(&pool).await;

    let appt = booking::reserve(&pool, user, doctor, "2024-06-04", "12:00")
        .await
        .unwrap();
    booking::cancel_appointment(&pool, appt.id, Caller::Admin)
        .await
        .unwrap();

    // Someone else takes the slot before the second cancel arrives.
    let other = seed_user(&pool).await;
    booking::reserve(&pool, other, doctor, "2024-06-04", "12:00")
        .await
        .unwrap();

    booking::cancel_appointment(&pool, appt.id, Caller::Doctor(doctor))
        .await
        .unwrap();
    assert!(ledger_of(&pool, doctor).await.is_booked("2024-06-04", "12:00"));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs TEST_DATABASE_URL"]
async fn release_of_unknown_slot_is_a_no_op() {
    let pool = test_pool().await;
    let doctor = seed_doctor(&pool).await;
    let user = seed_user(&pool).await;

    booking::reserve(&pool, user, doctor, "2024-06-05", "10:00")
        .await
        .unwrap();
    booking::release(&pool, doctor, "2024-06-05", "15:00")
        .await
        .unwrap();
    booking::release(&pool, doctor, "2030-01-01", "10:00")
        .await
        .unwrap();
    booking::release(&pool, Uuid::new_v4(), "2024-06-05", "10:00")
        .await
        .unwrap();

    assert!(ledger_of(&pool, doctor).await.is_booked("2024-06-05", "10:00"));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs TEST_DATABASE_URL"]
async fn unavailable_doctor_cannot_be_booked() {
    let pool = test_pool().await;
    let doctor = seed_doctor(&pool).await;
    let user = seed_user(&pool).await;

    assert_eq!(
        doctors::toggle_availability(&pool, doctor).await.unwrap(),
        Some(false)
    );

    let result = booking::reserve(&pool, user, doctor, "2024-06-06", "10:00").await;
    assert!(matches!(result, Err(BookingError::DoctorUnavailable)));
    assert!(ledger_of(&pool, doctor).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs TEST_DATABASE_URL"]
async fn unknown_doctor_is_not_found() {
    let pool = test_pool().await;
    let user = seed_user(&pool).await;

    let result = booking::reserve(&pool, user, Uuid::new_v4(), "2024-06-07", "10:00").await;
    assert!(matches!(result, Err(BookingError::DoctorNotFound)));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs TEST_DATABASE_URL"]
async fn completing_a_cancelled_appointment_fails() {
    let pool = test_pool().await;
    let doctor = seed_doctor(&pool).await;
    let user = seed_user(&pool).await;

    let appt = booking::reserve(&pool, user, doctor, "2024-06-08", "10:00")
        .await
        .unwrap();
    booking::cancel_appointment(&pool, appt.id, Caller::User(user))
        .await
        .unwrap();

    let result = booking::complete_appointment(&pool, appt.id, doctor).await;
    assert!(matches!(result, Err(BookingError::Cancelled)));
}
