//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, week keys are `YYYY-MM-DD`, UUIDs are
//! hyphenated lowercase strings. Lists (badges, ingredients, steps, plan
//! days) are compact JSON.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use forge_core::{
  meal_plan::{PlannedWeek, StoredMealPlan},
  recipe::{Category, Recipe, RecipeContent, Review},
  user::{Standing, User},
};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_category(c: Category) -> &'static str { c.into() }

pub fn decode_category(s: &str) -> Result<Category> {
  Category::from_str(s).map_err(|_| Error::Corrupt {
    column: "category",
    value:  s.to_owned(),
  })
}

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

fn decode_count<T: TryFrom<i64>>(column: &'static str, raw: i64) -> Result<T> {
  T::try_from(raw).map_err(|_| Error::Corrupt { column, value: raw.to_string() })
}

pub fn decode_standing(points: i64, level: i64, badges: &str) -> Result<Standing> {
  Ok(Standing {
    points: decode_count("points", points)?,
    level:  decode_count("level", level)?,
    badges: decode_json(badges)?,
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "user_id, name, email, password_hash, points, level, badges, created_at";

/// Raw values read directly from a `users` row, in [`USER_COLUMNS`] order.
pub struct RawUser {
  pub user_id:       String,
  pub name:          String,
  pub email:         String,
  pub password_hash: String,
  pub points:        i64,
  pub level:         i64,
  pub badges:        String,
  pub created_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      name:          row.get(1)?,
      email:         row.get(2)?,
      password_hash: row.get(3)?,
      points:        row.get(4)?,
      level:         row.get(5)?,
      badges:        row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      name:          self.name,
      email:         self.email,
      password_hash: self.password_hash,
      standing:      decode_standing(self.points, self.level, &self.badges)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const RECIPE_COLUMNS: &str = "recipe_id, owner_id, title, description, \
  category, servings, ingredients, steps, rating, num_reviews, created_at, \
  updated_at";

/// Raw values read from a `recipes` row, in [`RECIPE_COLUMNS`] order, plus
/// the recipe's reviews.
pub struct RawRecipe {
  pub recipe_id:   String,
  pub owner_id:    String,
  pub title:       String,
  pub description: Option<String>,
  pub category:    String,
  pub servings:    i64,
  pub ingredients: String,
  pub steps:       String,
  pub rating:      f64,
  pub num_reviews: i64,
  pub created_at:  String,
  pub updated_at:  String,
  pub reviews:     Vec<RawReview>,
}

impl RawRecipe {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      recipe_id:   row.get(0)?,
      owner_id:    row.get(1)?,
      title:       row.get(2)?,
      description: row.get(3)?,
      category:    row.get(4)?,
      servings:    row.get(5)?,
      ingredients: row.get(6)?,
      steps:       row.get(7)?,
      rating:      row.get(8)?,
      num_reviews: row.get(9)?,
      created_at:  row.get(10)?,
      updated_at:  row.get(11)?,
      reviews:     Vec::new(),
    })
  }

  pub fn into_recipe(self) -> Result<Recipe> {
    Ok(Recipe {
      recipe_id:   decode_uuid(&self.recipe_id)?,
      owner_id:    decode_uuid(&self.owner_id)?,
      content:     RecipeContent {
        title:       self.title,
        description: self.description,
        category:    decode_category(&self.category)?,
        servings:    decode_count("servings", self.servings)?,
        ingredients: decode_json(&self.ingredients)?,
        steps:       decode_json(&self.steps)?,
      },
      reviews:     self
        .reviews
        .into_iter()
        .map(RawReview::into_review)
        .collect::<Result<_>>()?,
      rating:      self.rating,
      num_reviews: decode_count("num_reviews", self.num_reviews)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const REVIEW_COLUMNS: &str =
  "review_id, user_id, name, rating, comment, created_at";

pub struct RawReview {
  pub review_id:  String,
  pub user_id:    String,
  pub name:       String,
  pub rating:     i64,
  pub comment:    String,
  pub created_at: String,
}

impl RawReview {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:  row.get(0)?,
      user_id:    row.get(1)?,
      name:       row.get(2)?,
      rating:     row.get(3)?,
      comment:    row.get(4)?,
      created_at: row.get(5)?,
    })
  }

  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      review_id:  decode_uuid(&self.review_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      name:       self.name,
      rating:     decode_count("rating", self.rating)?,
      comment:    self.comment,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const MEAL_PLAN_COLUMNS: &str =
  "plan_id, user_id, week_start, days, created_at, updated_at";

pub struct RawMealPlan {
  pub plan_id:    String,
  pub user_id:    String,
  pub week_start: String,
  pub days:       String,
  pub created_at: String,
  pub updated_at: String,
}

impl RawMealPlan {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      plan_id:    row.get(0)?,
      user_id:    row.get(1)?,
      week_start: row.get(2)?,
      days:       row.get(3)?,
      created_at: row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  pub fn into_meal_plan(self) -> Result<StoredMealPlan> {
    let days: PlannedWeek = decode_json(&self.days)?;
    Ok(StoredMealPlan {
      plan_id: decode_uuid(&self.plan_id)?,
      user_id: decode_uuid(&self.user_id)?,
      week_start: decode_date(&self.week_start)?,
      days,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn category_column_round_trip() {
    assert_eq!(encode_category(Category::MainCourse), "main_course");
    assert_eq!(decode_category("dessert").unwrap(), Category::Dessert);
    assert!(matches!(
      decode_category("Κυρίως Πιάτο"),
      Err(Error::Corrupt { column: "category", .. })
    ));
  }

  #[test]
  fn negative_points_are_rejected() {
    assert!(decode_standing(-1, 1, "[]").is_err());
    let s = decode_standing(60, 2, r#"["First Recipe","Level 2"]"#).unwrap();
    assert_eq!(s.points, 60);
    assert_eq!(s.badges, vec!["First Recipe", "Level 2"]);
  }

  #[test]
  fn plan_days_must_be_seven() {
    let six = encode_json(&vec![serde_json::json!({ "recipes": [] }); 6]).unwrap();
    assert!(decode_json::<PlannedWeek>(&six).is_err());
  }
}
