//! JSON REST API for FlavorForge.
//!
//! Exposes an axum [`Router`] backed by any [`forge_core::store::ForgeStore`].
//! TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", forge_api::api_router(store.clone()))
//! ```

pub mod auth;
pub mod error;
pub mod meal_plans;
pub mod recipes;
pub mod reviews;
pub mod rewards;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use forge_core::{ledger::Ledger, planner::MealPlanner, store::ForgeStore};

pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:   Arc<S>,
  pub ledger:  Ledger<S>,
  pub planner: MealPlanner<S>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      ledger:  self.ledger.clone(),
      planner: self.planner.clone(),
    }
  }
}

impl<S: ForgeStore> AppState<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self {
      ledger:  Ledger::new(Arc::clone(&store)),
      planner: MealPlanner::new(Arc::clone(&store)),
      store,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ForgeStore + 'static,
{
  Router::new()
    // Users
    .route("/users/register", post(users::register::<S>))
    .route("/users/login", post(users::login::<S>))
    .route("/users/profile", get(users::profile::<S>))
    // Recipes
    .route("/recipes", get(recipes::list::<S>).post(recipes::create::<S>))
    .route(
      "/recipes/{id}",
      get(recipes::get_one::<S>)
        .put(recipes::update::<S>)
        .delete(recipes::delete::<S>),
    )
    .route("/recipes/{id}/reviews", post(reviews::create::<S>))
    // Meal plans
    .route("/mealplans", get(meal_plans::get_week::<S>).post(meal_plans::upsert::<S>))
    .with_state(AppState::new(store))
}

#[cfg(test)]
mod tests;
