//! The `ForgeStore` trait: the data-store collaborator.
//!
//! Implemented by storage backends (e.g. `forge-store-sqlite`). The services
//! in this crate and the HTTP layer depend on this abstraction only.
//!
//! Every mutating method is atomic per document: a backend must not expose a
//! half-applied update, and two concurrent calls touching the same user,
//! recipe or meal-plan key must serialise rather than lose an update.

use std::future::Future;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  ledger::{Award, AwardReceipt},
  meal_plan::{PlannedWeek, RecipeRef, StoredMealPlan},
  recipe::{
    CreatedRecipe, NewRecipe, NewReview, Recipe, RecipeContent, RecipeQuery,
    ReviewOutcome,
  },
  user::{NewUser, User},
};

/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ForgeStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user with an empty standing. Returns `None` if the email
  /// is already registered.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up a user by (lower-cased) email, including the password hash.
  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Atomically read the user's standing, apply `award` via
  /// [`Standing::apply`](crate::user::Standing::apply) and write it back.
  /// Returns `None` if the user does not exist.
  fn apply_award(
    &self,
    user_id: Uuid,
    award: Award,
  ) -> impl Future<Output = Result<Option<AwardReceipt>, Self::Error>> + Send + '_;

  // ── Recipes ───────────────────────────────────────────────────────────

  /// Insert a recipe and count the owner's recipes in the same transaction.
  fn create_recipe(
    &self,
    input: NewRecipe,
  ) -> impl Future<Output = Result<CreatedRecipe, Self::Error>> + Send + '_;

  fn get_recipe(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Recipe>, Self::Error>> + Send + '_;

  fn list_recipes<'a>(
    &'a self,
    query: &'a RecipeQuery,
  ) -> impl Future<Output = Result<Vec<Recipe>, Self::Error>> + Send + 'a;

  /// Replace the owner-editable content. Reviews and derived rating fields
  /// are left untouched. Returns `None` if the recipe does not exist.
  fn update_recipe(
    &self,
    id: Uuid,
    content: RecipeContent,
  ) -> impl Future<Output = Result<Option<Recipe>, Self::Error>> + Send + '_;

  /// Delete a recipe and its reviews. Returns `false` if it did not exist.
  fn delete_recipe(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reviews ───────────────────────────────────────────────────────────

  /// Append a review and recompute `rating` / `num_reviews` as one unit.
  /// A user may review a recipe at most once.
  fn add_review(
    &self,
    recipe_id: Uuid,
    review: NewReview,
  ) -> impl Future<Output = Result<ReviewOutcome, Self::Error>> + Send + '_;

  // ── Meal plans ────────────────────────────────────────────────────────

  fn find_meal_plan(
    &self,
    user_id: Uuid,
    week_start: NaiveDate,
  ) -> impl Future<Output = Result<Option<StoredMealPlan>, Self::Error>> + Send + '_;

  /// Create the plan for `(user_id, week_start)` or overwrite its days.
  fn upsert_meal_plan(
    &self,
    user_id: Uuid,
    week_start: NaiveDate,
    days: PlannedWeek,
  ) -> impl Future<Output = Result<StoredMealPlan, Self::Error>> + Send + '_;

  /// Project the given recipes to `{id, title, category}`. Ids with no
  /// matching recipe are absent from the result.
  fn recipe_refs<'a>(
    &'a self,
    ids: &'a [Uuid],
  ) -> impl Future<Output = Result<Vec<RecipeRef>, Self::Error>> + Send + 'a;
}
