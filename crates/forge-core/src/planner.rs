//! Meal plan upsert resolver.
//!
//! Enforces one plan per `(user, week)` and the fixed seven-day shape, and
//! resolves stored recipe ids to display projections on the way out.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
  Error, Result,
  meal_plan::{
    DayInput, DayView, MealPlanView, RecipeRef, StoredMealPlan, sanitize_days,
    start_of_day, week_start,
  },
  store::ForgeStore,
};

pub struct MealPlanner<S> {
  store: Arc<S>,
}

impl<S> Clone for MealPlanner<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S> MealPlanner<S>
where
  S: ForgeStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// The plan for the week containing `date`, or a synthetic empty plan
  /// (`id == None`) if none was saved.
  pub async fn get(&self, user_id: Uuid, date: NaiveDate) -> Result<MealPlanView> {
    let week = week_start(date);
    let stored = self
      .store
      .find_meal_plan(user_id, week)
      .await
      .map_err(Error::store)?;

    match stored {
      Some(plan) => self.resolve(plan).await,
      None => Ok(MealPlanView::empty(user_id, week)),
    }
  }

  /// Create or fully replace the plan for the week containing `date`.
  ///
  /// The day count is checked before anything is written.
  pub async fn upsert(
    &self,
    user_id: Uuid,
    date: NaiveDate,
    days: Vec<DayInput>,
  ) -> Result<MealPlanView> {
    let days = sanitize_days(days)?;
    let week = week_start(date);
    let plan = self
      .store
      .upsert_meal_plan(user_id, week, days)
      .await
      .map_err(Error::store)?;
    self.resolve(plan).await
  }

  async fn resolve(&self, plan: StoredMealPlan) -> Result<MealPlanView> {
    let mut seen = HashSet::new();
    let ids: Vec<Uuid> = plan
      .days
      .iter()
      .flat_map(|d| d.recipes.iter().copied())
      .filter(|id| seen.insert(*id))
      .collect();

    let refs: HashMap<Uuid, RecipeRef> = self
      .store
      .recipe_refs(&ids)
      .await
      .map_err(Error::store)?
      .into_iter()
      .map(|r| (r.id, r))
      .collect();

    // Deleted recipes drop out of the view.
    let days = plan.days.each_ref().map(|day| DayView {
      recipes: day
        .recipes
        .iter()
        .filter_map(|id| refs.get(id).cloned())
        .collect(),
    });

    Ok(MealPlanView {
      id: Some(plan.plan_id),
      user_id: plan.user_id,
      week_start_date: start_of_day(plan.week_start),
      days,
      created_at: Some(plan.created_at),
      updated_at: Some(plan.updated_at),
    })
  }
}
