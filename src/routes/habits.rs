use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    Habit, HabitResponse, InvitePartnerRequest, LogResponse, MessageResponse, NewHabit,
    PartnerUpdateResponse, UpdateHabit,
};
use crate::store;
use crate::streak::RecurrenceRule;

pub fn routes(pool: SqlitePool) -> Router {
    Router::new()
        .route("/api/habits/create", post(create_habit))
        .route("/api/habits", get(get_habits))
        .route("/api/habits/partner-habits", get(get_partner_habits))
        .route(
            "/api/habits/:id",
            get(get_habit_by_id).put(update_habit).delete(delete_habit),
        )
        .route("/api/habits/:id/log", post(log_habit))
        .route("/api/habits/:id/invite-partner", post(invite_partner))
        .route("/api/habits/:id/remove-partner", delete(remove_partner))
        .with_state(pool)
}

async fn create_habit(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Json(body): Json<NewHabit>,
) -> Result<(StatusCode, Json<HabitResponse>), ApiError> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::Validation("Habit name is required".into()));
    }
    let rule = RecurrenceRule::from_parts(&body.frequency_label, &body.frequency)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let partner = match &body.accountability_partner_username {
        Some(username) => {
            let partner = store::find_user_by_username(&pool, &username.trim().to_lowercase())
                .await?
                .ok_or(ApiError::PartnerNotFound)?;
            Some(partner.id)
        }
        None => None,
    };

    let habit = Habit {
        id: Uuid::new_v4(),
        user_id: user.id,
        name,
        rule,
        streak: 0,
        last_logged: None,
        accountability_partner: partner,
        created_at: Utc::now(),
        logs: Vec::new(),
    };
    store::insert_habit(&pool, &habit).await?;

    Ok((StatusCode::CREATED, Json(HabitResponse::from(&habit))))
}

async fn get_habits(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<HabitResponse>>, ApiError> {
    let habits = store::list_habits_for_owner(&pool, user.id).await?;
    Ok(Json(habits.iter().map(HabitResponse::from).collect()))
}

/// Visible to the habit's owner or its accountability partner; anyone else
/// gets the same answer as a missing habit.
async fn get_habit_by_id(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<HabitResponse>, ApiError> {
    let habit = store::get_habit(&pool, id).await?.ok_or(ApiError::HabitNotFound)?;
    let is_owner = habit.user_id == user.id;
    let is_partner = habit.accountability_partner == Some(user.id);
    if !is_owner && !is_partner {
        return Err(ApiError::HabitNotFound);
    }

    let mut response = HabitResponse::from(&habit);
    if let Some(partner_id) = habit.accountability_partner {
        if let Some(partner) = store::find_user_by_id(&pool, partner_id).await? {
            response.accountability_partner_username = Some(partner.username);
        }
    }
    Ok(Json(response))
}

async fn update_habit(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateHabit>,
) -> Result<Json<HabitResponse>, ApiError> {
    let habit = store::get_habit_owned(&pool, id, user.id)
        .await?
        .ok_or(ApiError::HabitNotFound)?;

    let name = match body.name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ApiError::Validation("Habit name is required".into()));
            }
            name
        }
        None => habit.name.clone(),
    };
    let rule = if body.frequency_label.is_some() || body.frequency.is_some() {
        let label = body
            .frequency_label
            .unwrap_or_else(|| habit.rule.label().to_string());
        let days = body.frequency.unwrap_or_else(|| habit.rule.day_names());
        RecurrenceRule::from_parts(&label, &days).map_err(|e| ApiError::Validation(e.to_string()))?
    } else {
        habit.rule.clone()
    };

    store::update_habit(&pool, id, user.id, &name, &rule).await?;
    let updated = store::get_habit(&pool, id).await?.ok_or(ApiError::HabitNotFound)?;
    Ok(Json(HabitResponse::from(&updated)))
}

async fn delete_habit(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !store::delete_habit(&pool, id, user.id).await? {
        return Err(ApiError::HabitNotFound);
    }
    Ok(Json(MessageResponse {
        message: "Habit deleted".into(),
    }))
}

async fn log_habit(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<LogResponse>, ApiError> {
    let (streak, logs) = store::log_completion(&pool, id, user.id, Utc::now()).await?;
    Ok(Json(LogResponse {
        message: "Habit logged!".into(),
        streak,
        logs,
    }))
}

async fn get_partner_habits(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<HabitResponse>>, ApiError> {
    let habits = store::list_partner_habits(&pool, user.id).await?;
    let mut out = Vec::with_capacity(habits.len());
    for habit in &habits {
        let mut response = HabitResponse::from(habit);
        if let Some(owner) = store::find_user_by_id(&pool, habit.user_id).await? {
            response.owner_username = Some(owner.username);
        }
        out.push(response);
    }
    Ok(Json(out))
}

async fn invite_partner(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<InvitePartnerRequest>,
) -> Result<Json<PartnerUpdateResponse>, ApiError> {
    let partner = store::find_user_by_username(&pool, &body.username.trim().to_lowercase())
        .await?
        .ok_or(ApiError::PartnerNotFound)?;

    if !store::set_partner(&pool, id, user.id, Some(partner.id)).await? {
        return Err(ApiError::HabitNotFound);
    }

    let habit = store::get_habit(&pool, id).await?.ok_or(ApiError::HabitNotFound)?;
    let mut response = HabitResponse::from(&habit);
    response.accountability_partner_username = Some(partner.username.clone());

    Ok(Json(PartnerUpdateResponse {
        message: format!("Partner {} added successfully", partner.username),
        habit: response,
    }))
}

async fn remove_partner(
    State(pool): State<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PartnerUpdateResponse>, ApiError> {
    if !store::set_partner(&pool, id, user.id, None).await? {
        return Err(ApiError::HabitNotFound);
    }
    let habit = store::get_habit(&pool, id).await?.ok_or(ApiError::HabitNotFound)?;

    Ok(Json(PartnerUpdateResponse {
        message: "Accountability partner removed successfully".into(),
        habit: HabitResponse::from(&habit),
    }))
}
