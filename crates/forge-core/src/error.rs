//! Error types for `forge-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  // ── Validation ──────────────────────────────────────────────────────────
  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("invalid email address: {0:?}")]
  InvalidEmail(String),

  #[error("password must be at least {0} characters")]
  PasswordTooShort(usize),

  #[error("rating must be a whole number between 1 and 5, got {0}")]
  InvalidRating(String),

  #[error("review comment must not be empty")]
  EmptyComment,

  #[error("servings must be a positive integer, got {0}")]
  InvalidServings(i64),

  #[error("days must have exactly 7 entries, got {0}")]
  InvalidDayCount(usize),

  #[error("invalid week start date {0:?}; expected YYYY-MM-DD")]
  InvalidWeekStart(String),

  // ── Not found ───────────────────────────────────────────────────────────
  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("recipe not found: {0}")]
  RecipeNotFound(Uuid),

  // ── Conflict ────────────────────────────────────────────────────────────
  #[error("recipe {0} already reviewed by this user")]
  AlreadyReviewed(Uuid),

  #[error("a user with email {0:?} already exists")]
  EmailTaken(String),

  // ── Authorisation ───────────────────────────────────────────────────────
  #[error("recipe {0} belongs to another user")]
  NotRecipeOwner(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
