//! Recipes and reviews.
//!
//! A recipe's `rating` and `num_reviews` are derived from its reviews. The
//! store recomputes both in the same transaction that appends a review; no
//! other code path writes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Category ────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
  Appetizer,
  MainCourse,
  Salad,
  Soup,
  Dessert,
  Beverage,
  Other,
}

// ─── Ingredients ─────────────────────────────────────────────────────────────

/// One line of an ingredient list, e.g. `200 g flour (sifted)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quantity: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unit:     Option<String>,
  pub name:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes:    Option<String>,
}

impl Ingredient {
  pub fn named(name: impl Into<String>) -> Self {
    Self { quantity: None, unit: None, name: name.into(), notes: None }
  }
}

/// Ingredient as submitted by a client.
///
/// Older clients send plain strings; they are kept as the ingredient name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngredientInput {
  Structured(Ingredient),
  Legacy(String),
}

impl From<IngredientInput> for Ingredient {
  fn from(input: IngredientInput) -> Self {
    match input {
      IngredientInput::Structured(i) => i,
      IngredientInput::Legacy(name) => Ingredient::named(name),
    }
  }
}

// ─── Recipe ──────────────────────────────────────────────────────────────────

pub const DEFAULT_SERVINGS: u32 = 4;

/// The owner-editable part of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeContent {
  pub title:       String,
  pub description: Option<String>,
  pub category:    Category,
  pub servings:    u32,
  pub ingredients: Vec<Ingredient>,
  pub steps:       Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
  pub review_id:  Uuid,
  pub user_id:    Uuid,
  /// Reviewer's display name at the time of writing.
  pub name:       String,
  pub rating:     u8,
  pub comment:    String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
  pub recipe_id:   Uuid,
  pub owner_id:    Uuid,
  #[serde(flatten)]
  pub content:     RecipeContent,
  pub reviews:     Vec<Review>,
  /// Mean of `reviews[].rating`; `0.0` without reviews.
  pub rating:      f64,
  pub num_reviews: u32,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::ForgeStore::create_recipe`].
#[derive(Debug, Clone)]
pub struct NewRecipe {
  pub owner_id: Uuid,
  pub content:  RecipeContent,
}

/// Result of inserting a recipe.
#[derive(Debug, Clone)]
pub struct CreatedRecipe {
  pub recipe:             Recipe,
  /// Recipes owned by the author, counted after the insert and in the same
  /// transaction.
  pub owner_recipe_count: u64,
}

/// Filter for [`crate::store::ForgeStore::list_recipes`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeQuery {
  /// Case-insensitive substring match on the title.
  pub search:   Option<String>,
  pub category: Option<Category>,
}

// ─── Drafts ──────────────────────────────────────────────────────────────────

/// Recipe fields as submitted for create or update. Every field is optional
/// so the same body serves partial updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeDraft {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub category:    Option<Category>,
  pub servings:    Option<i64>,
  pub ingredients: Option<Vec<IngredientInput>>,
  pub steps:       Option<Vec<String>>,
}

fn clean_title(title: Option<String>) -> Option<String> {
  title
    .map(|t| t.trim().to_owned())
    .filter(|t| !t.is_empty())
}

fn clean_description(description: String) -> Option<String> {
  let trimmed = description.trim();
  (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn clean_servings(servings: i64) -> Result<u32> {
  u32::try_from(servings)
    .ok()
    .filter(|s| *s > 0)
    .ok_or(Error::InvalidServings(servings))
}

fn clean_steps(steps: Vec<String>) -> Vec<String> {
  steps
    .into_iter()
    .map(|s| s.trim().to_owned())
    .filter(|s| !s.is_empty())
    .collect()
}

fn clean_ingredients(ingredients: Vec<IngredientInput>) -> Vec<Ingredient> {
  ingredients
    .into_iter()
    .map(Ingredient::from)
    .filter(|i| !i.name.trim().is_empty())
    .collect()
}

impl RecipeDraft {
  /// Validate a draft for creation. Title and category are required;
  /// servings default to [`DEFAULT_SERVINGS`].
  pub fn into_content(self) -> Result<RecipeContent> {
    let title = clean_title(self.title).ok_or(Error::MissingField("title"))?;
    let category = self.category.ok_or(Error::MissingField("category"))?;
    let servings = self
      .servings
      .map(clean_servings)
      .transpose()?
      .unwrap_or(DEFAULT_SERVINGS);

    Ok(RecipeContent {
      title,
      description: self.description.and_then(clean_description),
      category,
      servings,
      ingredients: self.ingredients.map(clean_ingredients).unwrap_or_default(),
      steps: self.steps.map(clean_steps).unwrap_or_default(),
    })
  }

  /// Overlay the fields present in this draft onto `content`. Omitted fields
  /// keep their current value; a blank title is rejected.
  pub fn apply_to(self, content: &mut RecipeContent) -> Result<()> {
    if let Some(title) = self.title {
      content.title =
        clean_title(Some(title)).ok_or(Error::MissingField("title"))?;
    }
    if let Some(servings) = self.servings {
      content.servings = clean_servings(servings)?;
    }
    if let Some(description) = self.description {
      content.description = clean_description(description);
    }
    if let Some(category) = self.category {
      content.category = category;
    }
    if let Some(ingredients) = self.ingredients {
      content.ingredients = clean_ingredients(ingredients);
    }
    if let Some(steps) = self.steps {
      content.steps = clean_steps(steps);
    }
    Ok(())
  }
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

/// Review body as submitted by a client.
///
/// `rating` stays loosely typed until [`ReviewDraft::validate`] so that a
/// missing, fractional or quoted rating gets a validation error instead of a
/// body rejection. Numeric strings such as `"5"` are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewDraft {
  #[serde(default)]
  pub rating:  Option<serde_json::Value>,
  #[serde(default)]
  pub comment: String,
}

/// Input to [`crate::store::ForgeStore::add_review`].
#[derive(Debug, Clone)]
pub struct NewReview {
  pub user_id: Uuid,
  pub name:    String,
  pub rating:  u8,
  pub comment: String,
}

impl ReviewDraft {
  pub fn validate(self, user_id: Uuid, name: &str) -> Result<NewReview> {
    let raw = match self.rating {
      None | Some(serde_json::Value::Null) => return Err(Error::MissingField("rating")),
      Some(raw) => raw,
    };
    let rating = parse_rating(&raw).ok_or_else(|| Error::InvalidRating(raw.to_string()))?;
    let comment = self.comment.trim();
    if comment.is_empty() {
      return Err(Error::EmptyComment);
    }
    Ok(NewReview {
      user_id,
      name: name.to_owned(),
      rating,
      comment: comment.to_owned(),
    })
  }
}

/// A whole number from 1 to 5, given as a JSON number or a numeric string.
fn parse_rating(raw: &serde_json::Value) -> Option<u8> {
  let value = match raw {
    serde_json::Value::Number(n) => n.as_f64()?,
    serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
    _ => return None,
  };
  if value.fract() != 0.0 || !(1.0..=5.0).contains(&value) {
    return None;
  }
  Some(value as u8)
}

/// A recipe's derived rating fields right after a review was appended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
  pub recipe_id:   Uuid,
  pub owner_id:    Uuid,
  pub rating:      f64,
  pub num_reviews: u32,
}

/// What happened when a review was submitted to the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReviewOutcome {
  Added(RatingSummary),
  RecipeNotFound,
  /// The reviewer already has a review on this recipe.
  AlreadyReviewed,
}
