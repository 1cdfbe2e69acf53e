//! Best-effort gamification after a primary write has succeeded.
//!
//! A failed award is logged and dropped; it never fails the request that
//! triggered it.

use forge_core::{
  ledger::{AwardReceipt, is_popular},
  recipe::RatingSummary,
  store::ForgeStore,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::AppState;

fn log_receipt(user_id: Uuid, event: &str, receipt: &AwardReceipt) {
  let outcome = &receipt.outcome;
  for badge in &outcome.new_badges {
    info!(%user_id, event, badge = %badge, "badge granted");
  }
  if let Some(level) = outcome.new_level {
    info!(%user_id, event, level, points = receipt.standing.points, "level up");
  }
}

fn settle<E: std::fmt::Display>(
  user_id: Uuid,
  event: &'static str,
  result: Result<AwardReceipt, E>,
) {
  match result {
    Ok(receipt) => log_receipt(user_id, event, &receipt),
    Err(e) => warn!(%user_id, event, error = %e, "award failed"),
  }
}

/// `recipe_count` is the owner's total including the new recipe.
pub async fn recipe_created<S>(state: &AppState<S>, owner_id: Uuid, recipe_count: u64)
where
  S: ForgeStore,
{
  let result = state.ledger.award_for_recipe_created(owner_id, recipe_count).await;
  settle(owner_id, "recipe_created", result);
}

/// Reward the reviewer, and the owner too if the recipe just became popular.
pub async fn review_submitted<S>(state: &AppState<S>, reviewer: Uuid, summary: &RatingSummary)
where
  S: ForgeStore,
{
  let result = state.ledger.award_for_review_submitted(reviewer).await;
  settle(reviewer, "review_submitted", result);

  if is_popular(summary, reviewer) {
    let result = state.ledger.award_for_popular_recipe(summary.owner_id).await;
    settle(summary.owner_id, "popular_recipe", result);
  }
}
