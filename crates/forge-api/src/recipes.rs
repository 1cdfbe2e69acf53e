//! Handlers for `/recipes` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/recipes` | Optional `?search=<title>&category=<category>` |
//! | `POST`   | `/recipes` | Authenticated; awards the owner afterwards |
//! | `GET`    | `/recipes/{id}` | 404 if not found |
//! | `PUT`    | `/recipes/{id}` | Owner only; partial update |
//! | `DELETE` | `/recipes/{id}` | Owner only; reviews go with it |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use forge_core::{
  Error as CoreError,
  recipe::{NewRecipe, Recipe, RecipeDraft, RecipeQuery},
  store::ForgeStore,
  user::Principal,
};
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError, rewards};

/// Fetch a recipe and check that `principal` owns it.
async fn owned_recipe<S>(
  state: &AppState<S>,
  id: Uuid,
  principal: &Principal,
) -> Result<Recipe, ApiError>
where
  S: ForgeStore,
{
  let recipe = state
    .store
    .get_recipe(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::RecipeNotFound(id))?;
  if recipe.owner_id != principal.user_id {
    return Err(CoreError::NotRecipeOwner(id).into());
  }
  Ok(recipe)
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /recipes[?search=<text>][&category=<category>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(query): Query<RecipeQuery>,
) -> Result<Json<Vec<Recipe>>, ApiError>
where
  S: ForgeStore,
{
  let recipes = state
    .store
    .list_recipes(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(recipes))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /recipes`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Json(draft): Json<RecipeDraft>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ForgeStore + 'static,
{
  let content = draft.into_content()?;
  let created = state
    .store
    .create_recipe(NewRecipe { owner_id: principal.user_id, content })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(
    recipe_id = %created.recipe.recipe_id,
    owner_id = %principal.user_id,
    "recipe created"
  );
  rewards::recipe_created(&state, principal.user_id, created.owner_recipe_count).await;

  Ok((StatusCode::CREATED, Json(created.recipe)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /recipes/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Recipe>, ApiError>
where
  S: ForgeStore,
{
  let recipe = state
    .store
    .get_recipe(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::RecipeNotFound(id))?;
  Ok(Json(recipe))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /recipes/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<Uuid>,
  Json(draft): Json<RecipeDraft>,
) -> Result<Json<Recipe>, ApiError>
where
  S: ForgeStore + 'static,
{
  let mut content = owned_recipe(&state, id, &principal).await?.content;
  draft.apply_to(&mut content)?;

  let recipe = state
    .store
    .update_recipe(id, content)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::RecipeNotFound(id))?;
  Ok(Json(recipe))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /recipes/{id}`. Points already awarded for it are kept.
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ForgeStore + 'static,
{
  owned_recipe(&state, id, &principal).await?;
  let deleted = state.store.delete_recipe(id).await.map_err(ApiError::store)?;
  if !deleted {
    return Err(CoreError::RecipeNotFound(id).into());
  }
  tracing::info!(recipe_id = %id, "recipe deleted");
  Ok(StatusCode::NO_CONTENT)
}
