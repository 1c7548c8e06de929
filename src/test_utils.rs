//! Shared fixtures for store and handler tests: an in-memory database plus
//! seed helpers.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{Habit, User};
use crate::store;
use crate::streak::RecurrenceRule;

/// A valid PHC-format Argon2id hash, precomputed so seeding users stays
/// cheap. Password hashing itself is exercised in `auth::tests`.
const SEED_PASSWORD_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$gZiV/M1gPc22ElAH/Jh1Hw$CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

/// In-memory SQLite pool with the schema applied.
///
/// A single connection, so every query in a test sees the same in-memory
/// database.
pub async fn setup_test_db() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to create in-memory database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

pub async fn seed_user(pool: &SqlitePool, email: &str, username: &str) -> User {
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        username: username.to_string(),
        password_hash: SEED_PASSWORD_HASH.to_string(),
        name: username.to_string(),
        created_at: Utc::now(),
    };
    store::create_user(pool, &user).await.expect("failed to seed user");
    user
}

pub async fn seed_habit(
    pool: &SqlitePool,
    owner: &User,
    label: &str,
    days: &[&str],
    streak: u32,
    last_logged: Option<NaiveDate>,
) -> Habit {
    let days: Vec<String> = days.iter().map(|d| d.to_string()).collect();
    let habit = Habit {
        id: Uuid::new_v4(),
        user_id: owner.id,
        name: "Read a chapter".to_string(),
        rule: RecurrenceRule::from_parts(label, &days).expect("seed rule must be valid"),
        streak,
        last_logged,
        accountability_partner: None,
        created_at: Utc::now(),
        logs: Vec::new(),
    };
    store::insert_habit(pool, &habit).await.expect("failed to seed habit");
    habit
}

/// Insert a raw log row, bypassing the orchestration.
pub async fn insert_log(pool: &SqlitePool, habit_id: Uuid, at: DateTime<Utc>) {
    sqlx::query("INSERT INTO habit_logs (habit_id, logged_at, logged_on) VALUES (?1, ?2, ?3)")
        .bind(habit_id.to_string())
        .bind(at)
        .bind(at.date_naive())
        .execute(pool)
        .await
        .expect("failed to insert log row");
}

/// Insert a habit row whose stored rule label no variant recognizes, the way
/// a missed migration would leave it.
pub async fn seed_corrupt_habit(pool: &SqlitePool, owner: &User, streak: u32) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO habits (id, user_id, name, frequency_label, frequency, streak, created_at)
         VALUES (?1, ?2, 'Legacy habit', 'biweekly', '[]', ?3, ?4)",
    )
    .bind(id.to_string())
    .bind(owner.id.to_string())
    .bind(streak)
    .bind(Utc::now())
    .execute(pool)
    .await
    .expect("failed to seed corrupt habit");
    id
}
