//! Handlers for `/mealplans`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/mealplans?week_start_date=YYYY-MM-DD` | Empty plan (`id: null`) if none saved |
//! | `POST` | `/mealplans` | Body: `{"week_start_date", "days": [7 × {"recipes": [...]}]}` |
//!
//! Any date within a week addresses that week's plan.

use axum::{
  Json,
  extract::{Query, State},
};
use forge_core::{
  meal_plan::{DayInput, MealPlanView, parse_week},
  store::ForgeStore,
};
use serde::Deserialize;

use crate::{AppState, auth::Authenticated, error::ApiError};

// ─── Get ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WeekParams {
  #[serde(alias = "weekStartDate")]
  pub week_start_date: Option<String>,
}

/// `GET /mealplans?week_start_date=<date>` (`weekStartDate` also accepted)
pub async fn get_week<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Query(params): Query<WeekParams>,
) -> Result<Json<MealPlanView>, ApiError>
where
  S: ForgeStore + 'static,
{
  let raw = params
    .week_start_date
    .ok_or(forge_core::Error::MissingField("week_start_date"))?;
  let date = parse_week(&raw)?;
  let view = state.planner.get(principal.user_id, date).await?;
  Ok(Json(view))
}

// ─── Upsert ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpsertBody {
  #[serde(alias = "weekStartDate")]
  pub week_start_date: Option<String>,
  pub days:            Option<Vec<DayInput>>,
}

/// `POST /mealplans`
pub async fn upsert<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Json(body): Json<UpsertBody>,
) -> Result<Json<MealPlanView>, ApiError>
where
  S: ForgeStore + 'static,
{
  let raw = body
    .week_start_date
    .ok_or(forge_core::Error::MissingField("week_start_date"))?;
  let days = body.days.ok_or(forge_core::Error::MissingField("days"))?;
  let date = parse_week(&raw)?;

  let view = state.planner.upsert(principal.user_id, date, days).await?;
  tracing::info!(
    user_id = %principal.user_id,
    week = %view.week_start_date.date_naive(),
    "meal plan saved"
  );
  Ok(Json(view))
}
