use sqlx::{types::Json, PgExecutor, PgPool};
use uuid::Uuid;

use crate::db::models::{User, UserProfileUpdate};

/// Registers a user. Profile fields start at their column defaults.
///
/// # Arguments
///
/// * `pool` - The database connection pool
/// * `name` - Display name
/// * `email` - Login email, unique across users
/// * `password_hash` - bcrypt hash of the password
pub async fn insert(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, email, password) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Looks a user up by login email.
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Applies the fields present in `update`, leaving the others untouched.
///
/// # Returns
///
/// The updated `User`, or `None` if the id is unknown.
pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    update: &UserProfileUpdate,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET \
            name = COALESCE($2, name), \
            phone = COALESCE($3, phone), \
            address = COALESCE($4, address), \
            dob = COALESCE($5, dob), \
            gender = COALESCE($6, gender), \
            image = COALESCE($7, image) \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(update.name.as_deref())
    .bind(update.phone.as_deref())
    .bind(update.address.as_ref().map(Json))
    .bind(update.dob.as_deref())
    .bind(update.gender.as_deref())
    .bind(update.image.as_deref())
    .fetch_optional(pool)
    .await
}

/// Number of registered users, shown as patients on the admin dashboard.
pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
}
