use serde_json::json;
use sqlx::PgPool;

use prescripto::{
    auth::hash_password,
    db::{doctors, init_db, models::NewDoctor, users},
    Error,
};

const SEED_PASSWORD: &str = "prescripto123";

struct SeedDoctor {
    name: &'static str,
    email: &'static str,
    speciality: &'static str,
    degree: &'static str,
    experience: &'static str,
    fees: i64,
    line1: &'static str,
}

fn get_seed_doctors() -> Vec<SeedDoctor> {
    vec![
        SeedDoctor {
            name: "Dr. Richard James",
            email: "richard.james@prescripto.dev",
            speciality: "General physician",
            degree: "MBBS",
            experience: "4 Years",
            fees: 50,
            line1: "17th Cross, Richmond",
        },
        SeedDoctor {
            name: "Dr. Emily Larson",
            email: "emily.larson@prescripto.dev",
            speciality: "Gynecologist",
            degree: "MBBS",
            experience: "3 Years",
            fees: 60,
            line1: "27th Cross, Richmond",
        },
        SeedDoctor {
            name: "Dr. Sarah Patel",
            email: "sarah.patel@prescripto.dev",
            speciality: "Dermatologist",
            degree: "MBBS",
            experience: "1 Years",
            fees: 30,
            line1: "37th Cross, Richmond",
        },
        SeedDoctor {
            name: "Dr. Christopher Lee",
            email: "christopher.lee@prescripto.dev",
            speciality: "Pediatricians",
            degree: "MBBS",
            experience: "2 Years",
            fees: 40,
            line1: "47th Cross, Richmond",
        },
        SeedDoctor {
            name: "Dr. Jennifer Garcia",
            email: "jennifer.garcia@prescripto.dev",
            speciality: "Neurologist",
            degree: "MBBS",
            experience: "4 Years",
            fees: 50,
            line1: "57th Cross, Richmond",
        },
        SeedDoctor {
            name: "Dr. Andrew Williams",
            email: "andrew.williams@prescripto.dev",
            speciality: "Gastroenterologist",
            degree: "MBBS",
            experience: "4 Years",
            fees: 50,
            line1: "67th Cross, Richmond",
        },
    ]
}

pub async fn seed_database(pool: &PgPool) -> Result<(), Error> {
    let password_hash = hash_password(SEED_PASSWORD.to_string()).await?;

    for seed in get_seed_doctors() {
        if doctors::find_by_email(pool, seed.email).await?.is_some() {
            log::info!("Doctor {} already present, skipping", seed.email);
            continue;
        }

        let doctor = NewDoctor {
            name: seed.name.to_string(),
            email: seed.email.to_string(),
            password_hash: password_hash.clone(),
            image: String::new(),
            speciality: seed.speciality.to_string(),
            degree: seed.degree.to_string(),
            experience: seed.experience.to_string(),
            about: format!(
                "{} is committed to delivering comprehensive medical care, focusing on preventive medicine, early diagnosis, and effective treatment strategies.",
                seed.name
            ),
            fees: seed.fees,
            address: json!({ "line1": seed.line1, "line2": "Circle, Ring Road, London" }),
        };
        doctors::insert(pool, &doctor).await?;
        log::info!("Seeded doctor {}", seed.email);
    }

    let demo_email = "patient@prescripto.dev";
    if users::find_by_email(pool, demo_email).await?.is_none() {
        users::insert(pool, "Demo Patient", demo_email, &password_hash).await?;
        log::info!("Seeded user {}", demo_email);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let database_url = std::env::var("DATABASE_URL")?;
    let pool = init_db(&database_url).await?;
    seed_database(&pool).await?;
    Ok(())
}
