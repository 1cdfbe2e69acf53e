//! Handler for `POST /recipes/{id}/reviews`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use forge_core::{
  Error as CoreError,
  recipe::{ReviewDraft, ReviewOutcome},
  store::ForgeStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError, rewards};

#[derive(Debug, Serialize)]
pub struct ReviewAdded {
  pub message:     &'static str,
  pub rating:      f64,
  pub num_reviews: u32,
}

/// `POST /recipes/{id}/reviews`, body: `{"rating":5,"comment":"..."}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Path(recipe_id): Path<Uuid>,
  Json(draft): Json<ReviewDraft>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ForgeStore + 'static,
{
  let review = draft.validate(principal.user_id, &principal.name)?;

  let summary = match state
    .store
    .add_review(recipe_id, review)
    .await
    .map_err(ApiError::store)?
  {
    ReviewOutcome::Added(summary) => summary,
    ReviewOutcome::RecipeNotFound => return Err(CoreError::RecipeNotFound(recipe_id).into()),
    ReviewOutcome::AlreadyReviewed => return Err(CoreError::AlreadyReviewed(recipe_id).into()),
  };

  tracing::info!(
    %recipe_id,
    reviewer = %principal.user_id,
    rating = summary.rating,
    num_reviews = summary.num_reviews,
    "review added"
  );
  rewards::review_submitted(&state, principal.user_id, &summary).await;

  Ok((
    StatusCode::CREATED,
    Json(ReviewAdded {
      message:     "Review added",
      rating:      summary.rating,
      num_reviews: summary.num_reviews,
    }),
  ))
}
