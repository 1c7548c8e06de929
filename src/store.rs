//! Database access. UUIDs are stored as hyphenated TEXT, dates as ISO-8601
//! TEXT via sqlx's chrono support. All queries are runtime-bound.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Habit, User};
use crate::streak::{self, RecurrenceRule, StreakState};

fn parse_uuid(raw: &str, column: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::Internal(format!("bad uuid in {column}: {e}")))
}

fn user_from_row(row: &SqliteRow) -> Result<User, ApiError> {
    let id: String = row.get("id");
    Ok(User {
        id: parse_uuid(&id, "users.id")?,
        email: row.get("email"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}

/// Decode a habit row. The recurrence pair is the one place stored data can
/// be semantically invalid, surfaced as a configuration error rather than
/// silently defaulted.
fn habit_from_row(row: &SqliteRow) -> Result<Habit, ApiError> {
    let label: String = row.get("frequency_label");
    let days_json: String = row.get("frequency");
    let days: Vec<String> = serde_json::from_str(&days_json).map_err(|e| {
        ApiError::Configuration(format!("frequency column is not a weekday list: {e}"))
    })?;
    let rule = RecurrenceRule::from_parts(&label, &days)
        .map_err(|e| ApiError::Configuration(e.to_string()))?;

    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let partner: Option<String> = row.get("accountability_partner");
    Ok(Habit {
        id: parse_uuid(&id, "habits.id")?,
        user_id: parse_uuid(&user_id, "habits.user_id")?,
        name: row.get("name"),
        rule,
        streak: row.get("streak"),
        last_logged: row.get("last_logged"),
        accountability_partner: partner
            .as_deref()
            .map(|p| parse_uuid(p, "habits.accountability_partner"))
            .transpose()?,
        created_at: row.get("created_at"),
        logs: Vec::new(),
    })
}

async fn fetch_logs<'e, E>(executor: E, habit_id: Uuid) -> Result<Vec<DateTime<Utc>>, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let rows = sqlx::query(
        "SELECT logged_at FROM habit_logs WHERE habit_id = ?1 ORDER BY logged_at ASC",
    )
    .bind(habit_id.to_string())
    .fetch_all(executor)
    .await?;
    Ok(rows.iter().map(|row| row.get("logged_at")).collect())
}

// ---------------------------------------------------------------------------
// Users and tokens
// ---------------------------------------------------------------------------

pub async fn create_user(pool: &SqlitePool, user: &User) -> Result<(), ApiError> {
    sqlx::query(
        "INSERT INTO users (id, email, username, password_hash, name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.created_at)
    .execute(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.message().contains("UNIQUE") => {
            ApiError::Validation("User already exists".into())
        }
        _ => ApiError::Database(e),
    })?;
    Ok(())
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, ApiError> {
    let row = sqlx::query(
        "SELECT id, email, username, password_hash, name, created_at FROM users WHERE email = ?1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, ApiError> {
    let row = sqlx::query(
        "SELECT id, email, username, password_hash, name, created_at FROM users WHERE username = ?1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn find_user_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, ApiError> {
    let row = sqlx::query(
        "SELECT id, email, username, password_hash, name, created_at FROM users WHERE id = ?1",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(user_from_row).transpose()
}

pub async fn insert_token(
    pool: &SqlitePool,
    token: &str,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
) -> Result<(), ApiError> {
    sqlx::query("INSERT INTO auth_tokens (token, user_id, expires_at) VALUES (?1, ?2, ?3)")
        .bind(token)
        .bind(user_id.to_string())
        .bind(expires_at)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_user_by_token(
    pool: &SqlitePool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<User>, ApiError> {
    let row = sqlx::query(
        "SELECT u.id, u.email, u.username, u.password_hash, u.name, u.created_at, t.expires_at
         FROM auth_tokens t
         JOIN users u ON u.id = t.user_id
         WHERE t.token = ?1",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let expires_at: DateTime<Utc> = row.get("expires_at");
    if expires_at <= now {
        return Ok(None);
    }
    Ok(Some(user_from_row(&row)?))
}

// ---------------------------------------------------------------------------
// Habits
// ---------------------------------------------------------------------------

pub async fn insert_habit(pool: &SqlitePool, habit: &Habit) -> Result<(), ApiError> {
    let days = serde_json::to_string(&habit.rule.day_names())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    sqlx::query(
        "INSERT INTO habits
            (id, user_id, name, frequency_label, frequency, streak, last_logged,
             accountability_partner, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(habit.id.to_string())
    .bind(habit.user_id.to_string())
    .bind(&habit.name)
    .bind(habit.rule.label())
    .bind(days)
    .bind(habit.streak)
    .bind(habit.last_logged)
    .bind(habit.accountability_partner.map(|p| p.to_string()))
    .bind(habit.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_habit(pool: &SqlitePool, id: Uuid) -> Result<Option<Habit>, ApiError> {
    let row = sqlx::query(
        "SELECT id, user_id, name, frequency_label, frequency, streak, last_logged,
                accountability_partner, created_at
         FROM habits WHERE id = ?1",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };
    let mut habit = habit_from_row(&row)?;
    habit.logs = fetch_logs(pool, habit.id).await?;
    Ok(Some(habit))
}

pub async fn get_habit_owned(
    pool: &SqlitePool,
    id: Uuid,
    owner_id: Uuid,
) -> Result<Option<Habit>, ApiError> {
    let habit = get_habit(pool, id).await?;
    Ok(habit.filter(|h| h.user_id == owner_id))
}

pub async fn list_habits_for_owner(
    pool: &SqlitePool,
    owner_id: Uuid,
) -> Result<Vec<Habit>, ApiError> {
    let rows = sqlx::query(
        "SELECT id, user_id, name, frequency_label, frequency, streak, last_logged,
                accountability_partner, created_at
         FROM habits WHERE user_id = ?1 ORDER BY created_at ASC",
    )
    .bind(owner_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut habits = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut habit = habit_from_row(row)?;
        habit.logs = fetch_logs(pool, habit.id).await?;
        habits.push(habit);
    }
    Ok(habits)
}

pub async fn list_partner_habits(
    pool: &SqlitePool,
    partner_id: Uuid,
) -> Result<Vec<Habit>, ApiError> {
    let rows = sqlx::query(
        "SELECT id, user_id, name, frequency_label, frequency, streak, last_logged,
                accountability_partner, created_at
         FROM habits WHERE accountability_partner = ?1 ORDER BY created_at ASC",
    )
    .bind(partner_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut habits = Vec::with_capacity(rows.len());
    for row in &rows {
        let mut habit = habit_from_row(row)?;
        habit.logs = fetch_logs(pool, habit.id).await?;
        habits.push(habit);
    }
    Ok(habits)
}

/// Owner-only partial update of name and recurrence rule.
pub async fn update_habit(
    pool: &SqlitePool,
    id: Uuid,
    owner_id: Uuid,
    name: &str,
    rule: &RecurrenceRule,
) -> Result<bool, ApiError> {
    let days =
        serde_json::to_string(&rule.day_names()).map_err(|e| ApiError::Internal(e.to_string()))?;
    let result = sqlx::query(
        "UPDATE habits SET name = ?1, frequency_label = ?2, frequency = ?3
         WHERE id = ?4 AND user_id = ?5",
    )
    .bind(name)
    .bind(rule.label())
    .bind(days)
    .bind(id.to_string())
    .bind(owner_id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Attach or clear the accountability partner reference. Owner-only; the
/// reference is non-owning, the partner user row is never touched.
pub async fn set_partner(
    pool: &SqlitePool,
    id: Uuid,
    owner_id: Uuid,
    partner_id: Option<Uuid>,
) -> Result<bool, ApiError> {
    let result = sqlx::query(
        "UPDATE habits SET accountability_partner = ?1 WHERE id = ?2 AND user_id = ?3",
    )
    .bind(partner_id.map(|p| p.to_string()))
    .bind(id.to_string())
    .bind(owner_id.to_string())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Hard delete of a habit and its log history, owner-only.
pub async fn delete_habit(pool: &SqlitePool, id: Uuid, owner_id: Uuid) -> Result<bool, ApiError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM habits WHERE id = ?1 AND user_id = ?2")
        .bind(id.to_string())
        .bind(owner_id.to_string())
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }
    sqlx::query("DELETE FROM habit_logs WHERE habit_id = ?1")
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Logging orchestration
// ---------------------------------------------------------------------------

/// The only mutating entry point for completions.
///
/// Runs read, idempotency check, log append and streak update as one
/// transaction per habit: either the appended log row and the new streak are
/// both persisted, or nothing is. The UNIQUE `(habit_id, logged_on)` index
/// turns a same-day race between two requests into a constraint violation on
/// the loser, reported as an already-logged rejection instead of a double
/// append.
pub async fn log_completion(
    pool: &SqlitePool,
    habit_id: Uuid,
    owner_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(u32, Vec<DateTime<Utc>>), ApiError> {
    let today = now.date_naive();
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        "SELECT id, user_id, name, frequency_label, frequency, streak, last_logged,
                accountability_partner, created_at
         FROM habits WHERE id = ?1 AND user_id = ?2",
    )
    .bind(habit_id.to_string())
    .bind(owner_id.to_string())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::HabitNotFound)?;
    let habit = habit_from_row(&row)?;

    // Exact-day scan over the full history; no sort order is guaranteed and
    // last_logged alone is not trusted for this check.
    let logs = fetch_logs(&mut *tx, habit_id).await?;
    if logs.iter().any(|entry| streak::is_same_utc_day(*entry, now)) {
        return Err(ApiError::AlreadyLogged);
    }

    let state = StreakState {
        streak: habit.streak,
        last_logged: habit.last_logged,
    };
    let next = streak::evaluate_transition(&state, &habit.rule, today);

    sqlx::query("INSERT INTO habit_logs (habit_id, logged_at, logged_on) VALUES (?1, ?2, ?3)")
        .bind(habit_id.to_string())
        .bind(now)
        .bind(today)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.message().contains("UNIQUE") => ApiError::AlreadyLogged,
            _ => ApiError::Database(e),
        })?;

    sqlx::query("UPDATE habits SET streak = ?1, last_logged = ?2 WHERE id = ?3")
        .bind(next.streak)
        .bind(next.last_logged)
        .bind(habit_id.to_string())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let mut logs = logs;
    logs.push(now);
    Ok((next.streak, logs))
}
