use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};

use crate::streak::RecurrenceRule;

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// User as exposed over the API: everything except the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Habit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub rule: RecurrenceRule,
    pub streak: u32,
    pub last_logged: Option<NaiveDate>,
    pub accountability_partner: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub logs: Vec<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct HabitResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub frequency_label: String,
    pub frequency: Vec<String>,
    pub streak: u32,
    pub logs: Vec<DateTime<Utc>>,
    pub last_logged: Option<NaiveDate>,
    pub accountability_partner: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accountability_partner_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_username: Option<String>,
}

impl From<&Habit> for HabitResponse {
    fn from(habit: &Habit) -> Self {
        HabitResponse {
            id: habit.id,
            user_id: habit.user_id,
            name: habit.name.clone(),
            frequency_label: habit.rule.label().to_string(),
            frequency: habit.rule.day_names(),
            streak: habit.streak,
            logs: habit.logs.clone(),
            last_logged: habit.last_logged,
            accountability_partner: habit.accountability_partner,
            created_at: habit.created_at,
            accountability_partner_username: None,
            owner_username: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct NewHabit {
    pub name: String,
    pub frequency_label: String,
    #[serde(default)]
    pub frequency: Vec<String>,
    pub accountability_partner_username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateHabit {
    pub name: Option<String>,
    pub frequency_label: Option<String>,
    pub frequency: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct InvitePartnerRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub message: String,
    pub streak: u32,
    pub logs: Vec<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PartnerUpdateResponse {
    pub message: String,
    pub habit: HabitResponse,
}
