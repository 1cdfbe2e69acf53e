//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users/register` | Body: `{"name","email","password"}`; 409 on duplicate email |
//! | `POST` | `/users/login` | Checks Basic credentials and returns the profile |
//! | `GET`  | `/users/profile` | Authenticated; standing plus level progress |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use forge_core::{
  level::Progress,
  store::ForgeStore,
  user::{NewUser, validate_registration},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::{Authenticated, hash_password}, error::ApiError};

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  #[serde(default)]
  pub name:     String,
  #[serde(default)]
  pub email:    String,
  #[serde(default)]
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Registered {
  pub id:    Uuid,
  pub name:  String,
  pub email: String,
}

/// `POST /users/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ForgeStore,
{
  let (name, email) = validate_registration(&body.name, &body.email, &body.password)?;
  let password_hash = hash_password(&body.password)?;

  let user = state
    .store
    .create_user(NewUser { name, email: email.clone(), password_hash })
    .await
    .map_err(ApiError::store)?
    .ok_or(forge_core::Error::EmailTaken(email))?;

  tracing::info!(user_id = %user.user_id, "user registered");
  Ok((
    StatusCode::CREATED,
    Json(Registered { id: user.user_id, name: user.name, email: user.email }),
  ))
}

// ─── Profile ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Profile {
  pub id:         Uuid,
  pub name:       String,
  pub email:      String,
  pub points:     u32,
  pub level:      u8,
  pub badges:     Vec<String>,
  pub created_at: DateTime<Utc>,
  pub progress:   Progress,
}

async fn load_profile<S>(state: &AppState<S>, user_id: Uuid) -> Result<Profile, ApiError>
where
  S: ForgeStore,
{
  let user = state
    .store
    .get_user(user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(forge_core::Error::UserNotFound(user_id))?;

  let standing = user.standing;
  Ok(Profile {
    id:         user.user_id,
    name:       user.name,
    email:      user.email,
    progress:   Progress::for_points(standing.points),
    points:     standing.points,
    level:      standing.level,
    badges:     standing.badges,
    created_at: user.created_at,
  })
}

/// `GET /users/profile`
pub async fn profile<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
) -> Result<Json<Profile>, ApiError>
where
  S: ForgeStore + 'static,
{
  Ok(Json(load_profile(&state, principal.user_id).await?))
}

// ─── Login ────────────────────────────────────────────────────────────────────

/// `POST /users/login`. Credentials travel in the `Authorization` header;
/// the body is ignored.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
) -> Result<Json<Profile>, ApiError>
where
  S: ForgeStore + 'static,
{
  tracing::debug!(user_id = %principal.user_id, "login");
  Ok(Json(load_profile(&state, principal.user_id).await?))
}
