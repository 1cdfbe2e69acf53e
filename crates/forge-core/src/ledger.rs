//! Points ledger and badge awarder.
//!
//! The award rules are a pure function over a [`Standing`]
//! ([`Standing::apply`]). A store runs that function inside its per-user
//! write transaction, so reading the current standing, applying an award and
//! persisting the result form one unit and concurrent awards for the same
//! user serialise instead of overwriting each other.
//!
//! [`Ledger`] is the service entry point used by request handlers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result, level,
  recipe::RatingSummary,
  store::ForgeStore,
  user::Standing,
};

// ─── Rules ───────────────────────────────────────────────────────────────────

pub const FIRST_RECIPE: &str = "First Recipe";
pub const MASTER_CHEF_LVL_1: &str = "Master Chef Lvl 1";
pub const FIRST_REVIEW: &str = "First Review";
pub const POPULAR_PLATE: &str = "Popular Plate";

pub const RECIPE_POINTS: u32 = 10;
pub const REVIEW_POINTS: u32 = 2;
pub const POPULAR_RECIPE_POINTS: u32 = 15;

/// Recipe count at which [`MASTER_CHEF_LVL_1`] is granted. Exact match only.
pub const MASTER_CHEF_RECIPE_COUNT: u64 = 5;

pub const POPULAR_MIN_RATING: f64 = 4.5;
pub const POPULAR_MIN_REVIEWS: u32 = 5;

/// The badge granted on first reaching `level`.
pub fn level_badge(level: u8) -> String { format!("Level {level}") }

/// A recipe qualifies its owner for the popular bonus after `reviewer`'s
/// review. Self-reviews never qualify.
pub fn is_popular(summary: &RatingSummary, reviewer: Uuid) -> bool {
  reviewer != summary.owner_id
    && summary.rating >= POPULAR_MIN_RATING
    && summary.num_reviews >= POPULAR_MIN_REVIEWS
}

/// A domain event that earns points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Award {
  RecipeCreated {
    /// Recipes owned by the user after the insert.
    recipe_count: u64,
  },
  ReviewSubmitted,
  PopularRecipe,
}

/// What [`Standing::apply`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardOutcome {
  pub points_added: u32,
  /// Badges granted by this award, in grant order.
  pub new_badges:   Vec<String>,
  /// Set when the award moved the user to a new level.
  pub new_level:    Option<u8>,
}

impl AwardOutcome {
  pub fn is_noop(&self) -> bool {
    self.points_added == 0 && self.new_badges.is_empty()
  }
}

/// A standing as persisted after an award, with the change that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwardReceipt {
  pub standing: Standing,
  pub outcome:  AwardOutcome,
}

impl Standing {
  /// Append `badge` unless already held.
  fn grant(&mut self, badge: impl Into<String>, outcome: &mut AwardOutcome) {
    let badge = badge.into();
    if !self.has_badge(&badge) {
      self.badges.push(badge.clone());
      outcome.new_badges.push(badge);
    }
  }

  fn add_points(&mut self, points: u32, outcome: &mut AwardOutcome) {
    self.points = self.points.saturating_add(points);
    outcome.points_added = outcome.points_added.saturating_add(points);
  }

  /// Re-derive `level` from `points`, granting the level badge on change.
  fn settle_level(&mut self, outcome: &mut AwardOutcome) {
    let new_level = level::level_for(self.points);
    if new_level != self.level {
      self.level = new_level;
      outcome.new_level = Some(new_level);
      self.grant(level_badge(new_level), outcome);
    }
  }

  /// Apply one award. Idempotent with respect to badges: a badge already
  /// present is never added twice.
  pub fn apply(&mut self, award: Award) -> AwardOutcome {
    let mut outcome = AwardOutcome::default();

    match award {
      Award::RecipeCreated { recipe_count } => {
        self.add_points(RECIPE_POINTS, &mut outcome);
        if recipe_count == 1 {
          self.grant(FIRST_RECIPE, &mut outcome);
        }
        if recipe_count == MASTER_CHEF_RECIPE_COUNT {
          self.grant(MASTER_CHEF_LVL_1, &mut outcome);
        }
      }
      Award::ReviewSubmitted => {
        self.add_points(REVIEW_POINTS, &mut outcome);
        self.grant(FIRST_REVIEW, &mut outcome);
      }
      Award::PopularRecipe => {
        // The bonus is paid together with the badge, once.
        if self.has_badge(POPULAR_PLATE) {
          return outcome;
        }
        self.grant(POPULAR_PLATE, &mut outcome);
        self.add_points(POPULAR_RECIPE_POINTS, &mut outcome);
      }
    }

    self.settle_level(&mut outcome);
    outcome
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// Applies awards to users through a [`ForgeStore`].
pub struct Ledger<S> {
  store: Arc<S>,
}

impl<S> Clone for Ledger<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S> Ledger<S>
where
  S: ForgeStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  async fn award(&self, user_id: Uuid, award: Award) -> Result<AwardReceipt> {
    self
      .store
      .apply_award(user_id, award)
      .await
      .map_err(Error::store)?
      .ok_or(Error::UserNotFound(user_id))
  }

  /// +10 points; "First Recipe" at count 1, "Master Chef Lvl 1" at exactly 5.
  pub async fn award_for_recipe_created(
    &self,
    user_id: Uuid,
    recipe_count: u64,
  ) -> Result<AwardReceipt> {
    self.award(user_id, Award::RecipeCreated { recipe_count }).await
  }

  /// +2 points; "First Review" if not yet held.
  pub async fn award_for_review_submitted(&self, user_id: Uuid) -> Result<AwardReceipt> {
    self.award(user_id, Award::ReviewSubmitted).await
  }

  /// +15 points and "Popular Plate" for the recipe owner, once.
  pub async fn award_for_popular_recipe(&self, owner_id: Uuid) -> Result<AwardReceipt> {
    self.award(owner_id, Award::PopularRecipe).await
  }
}
