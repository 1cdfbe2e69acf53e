//! [`SqliteStore`], the SQLite implementation of [`ForgeStore`].
//!
//! Each mutating method runs in one `BEGIN IMMEDIATE` transaction inside a
//! single `call` on the connection thread, so a per-user or per-recipe
//! update is never observed half-applied and concurrent updates serialise.

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::{ErrorCode, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use forge_core::{
  ledger::{Award, AwardReceipt},
  meal_plan::{PlannedWeek, RecipeRef, StoredMealPlan},
  recipe::{
    CreatedRecipe, NewRecipe, NewReview, RatingSummary, Recipe, RecipeContent,
    RecipeQuery, ReviewOutcome,
  },
  store::ForgeStore,
  user::{NewUser, Standing, User},
};

use crate::{
  Error, Result,
  encode::{
    MEAL_PLAN_COLUMNS, RECIPE_COLUMNS, REVIEW_COLUMNS, RawMealPlan, RawRecipe,
    RawReview, RawUser, USER_COLUMNS, decode_category, decode_standing,
    decode_uuid, encode_category, encode_date, encode_dt, encode_json,
    encode_uuid,
  },
  schema::SCHEMA,
};

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation
  )
}

/// Load the reviews of every recipe in `recipes`, oldest first.
fn attach_reviews(
  conn: &rusqlite::Connection,
  recipes: &mut [RawRecipe],
) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {REVIEW_COLUMNS} FROM reviews
     WHERE recipe_id = ?1
     ORDER BY created_at, rowid"
  ))?;
  for recipe in recipes.iter_mut() {
    recipe.reviews = stmt
      .query_map(rusqlite::params![recipe.recipe_id], RawReview::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?;
  }
  Ok(())
}

fn select_recipe(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> rusqlite::Result<Option<RawRecipe>> {
  let raw = conn
    .query_row(
      &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE recipe_id = ?1"),
      rusqlite::params![id_str],
      RawRecipe::from_row,
    )
    .optional()?;

  match raw {
    Some(mut raw) => {
      attach_reviews(conn, std::slice::from_mut(&mut raw))?;
      Ok(Some(raw))
    }
    None => Ok(None),
  }
}

/// What the review transaction did, before decoding.
enum ReviewInsert {
  Missing,
  Duplicate,
  Added { owner_id: String, rating: f64, count: i64 },
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A FlavorForge store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ForgeStore impl ─────────────────────────────────────────────────────────

impl ForgeStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<Option<User>> {
    let user = User {
      user_id:       Uuid::new_v4(),
      name:          input.name,
      email:         input.email,
      password_hash: input.password_hash,
      standing:      Standing::default(),
      created_at:    Utc::now(),
    };

    let id_str      = encode_uuid(user.user_id);
    let name        = user.name.clone();
    let email       = user.email.clone();
    let hash        = user.password_hash.clone();
    let points      = i64::from(user.standing.points);
    let level       = i64::from(user.standing.level);
    let badges_json = encode_json(&user.standing.badges)?;
    let at_str      = encode_dt(user.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO users (
             user_id, name, email, password_hash, points, level, badges, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![id_str, name, email, hash, points, level, badges_json, at_str],
        );
        match result {
          Ok(_) => Ok(true),
          // The only unique column besides the random primary key is email.
          Err(e) if is_constraint_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(inserted.then_some(user))
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
              rusqlite::params![email],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn apply_award(&self, user_id: Uuid, award: Award) -> Result<Option<AwardReceipt>> {
    let id_str = encode_uuid(user_id);

    let receipt = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row: Option<(i64, i64, String)> = tx
          .query_row(
            "SELECT points, level, badges FROM users WHERE user_id = ?1",
            rusqlite::params![id_str],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
          )
          .optional()?;

        let Some((points, level, badges)) = row else {
          return Ok(None);
        };

        let mut standing =
          decode_standing(points, level, &badges).map_err(Error::into_call)?;
        let outcome = standing.apply(award);

        if !outcome.is_noop() {
          let badges_json =
            encode_json(&standing.badges).map_err(Error::into_call)?;
          tx.execute(
            "UPDATE users SET points = ?2, level = ?3, badges = ?4 WHERE user_id = ?1",
            rusqlite::params![
              id_str,
              i64::from(standing.points),
              i64::from(standing.level),
              badges_json,
            ],
          )?;
        }

        tx.commit()?;
        Ok(Some(AwardReceipt { standing, outcome }))
      })
      .await?;

    Ok(receipt)
  }

  // ── Recipes ───────────────────────────────────────────────────────────────

  async fn create_recipe(&self, input: NewRecipe) -> Result<CreatedRecipe> {
    let now = Utc::now();
    let recipe = Recipe {
      recipe_id:   Uuid::new_v4(),
      owner_id:    input.owner_id,
      content:     input.content,
      reviews:     Vec::new(),
      rating:      0.0,
      num_reviews: 0,
      created_at:  now,
      updated_at:  now,
    };

    let id_str           = encode_uuid(recipe.recipe_id);
    let owner_str        = encode_uuid(recipe.owner_id);
    let title            = recipe.content.title.clone();
    let description      = recipe.content.description.clone();
    let category         = encode_category(recipe.content.category);
    let servings         = i64::from(recipe.content.servings);
    let ingredients_json = encode_json(&recipe.content.ingredients)?;
    let steps_json       = encode_json(&recipe.content.steps)?;
    let at_str           = encode_dt(now);

    let count: i64 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
          "INSERT INTO recipes (
             recipe_id, owner_id, title, description, category, servings,
             ingredients, steps, rating, num_reviews, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, ?9, ?9)",
          rusqlite::params![
            id_str,
            owner_str,
            title,
            description,
            category,
            servings,
            ingredients_json,
            steps_json,
            at_str,
          ],
        )?;
        let count = tx.query_row(
          "SELECT COUNT(*) FROM recipes WHERE owner_id = ?1",
          rusqlite::params![owner_str],
          |r| r.get(0),
        )?;
        tx.commit()?;
        Ok(count)
      })
      .await?;

    Ok(CreatedRecipe {
      recipe,
      owner_recipe_count: u64::try_from(count).unwrap_or_default(),
    })
  }

  async fn get_recipe(&self, id: Uuid) -> Result<Option<Recipe>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| Ok(select_recipe(conn, &id_str)?))
      .await?;

    raw.map(RawRecipe::into_recipe).transpose()
  }

  async fn list_recipes(&self, query: &RecipeQuery) -> Result<Vec<Recipe>> {
    let category = query.category.map(encode_category);
    let needle = query
      .search
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_lowercase);

    let raws: Vec<RawRecipe> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECIPE_COLUMNS} FROM recipes
           WHERE (?1 IS NULL OR category = ?1)
           ORDER BY created_at DESC, rowid DESC"
        ))?;
        let mut rows = stmt
          .query_map(rusqlite::params![category], RawRecipe::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        // Titles are matched here rather than with LIKE, which only folds
        // ASCII case. Reviews are loaded for the survivors only.
        if let Some(needle) = &needle {
          rows.retain(|r| r.title.to_lowercase().contains(needle.as_str()));
        }
        attach_reviews(conn, &mut rows)?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecipe::into_recipe).collect()
  }

  async fn update_recipe(&self, id: Uuid, content: RecipeContent) -> Result<Option<Recipe>> {
    let id_str           = encode_uuid(id);
    let category         = encode_category(content.category);
    let servings         = i64::from(content.servings);
    let ingredients_json = encode_json(&content.ingredients)?;
    let steps_json       = encode_json(&content.steps)?;
    let at_str           = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
          "UPDATE recipes
           SET title = ?2, description = ?3, category = ?4, servings = ?5,
               ingredients = ?6, steps = ?7, updated_at = ?8
           WHERE recipe_id = ?1",
          rusqlite::params![
            id_str,
            content.title,
            content.description,
            category,
            servings,
            ingredients_json,
            steps_json,
            at_str,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        let raw = select_recipe(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawRecipe::into_recipe).transpose()
  }

  async fn delete_recipe(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "DELETE FROM recipes WHERE recipe_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(changed > 0)
      })
      .await?;

    Ok(deleted)
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  async fn add_review(&self, recipe_id: Uuid, review: NewReview) -> Result<ReviewOutcome> {
    let recipe_str = encode_uuid(recipe_id);
    let review_str = encode_uuid(Uuid::new_v4());
    let user_str   = encode_uuid(review.user_id);
    let at_str     = encode_dt(Utc::now());

    let insert = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let owner: Option<String> = tx
          .query_row(
            "SELECT owner_id FROM recipes WHERE recipe_id = ?1",
            rusqlite::params![recipe_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(owner_id) = owner else {
          return Ok(ReviewInsert::Missing);
        };

        let inserted = tx.execute(
          "INSERT INTO reviews (
             review_id, recipe_id, user_id, name, rating, comment, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            review_str,
            recipe_str,
            user_str,
            review.name,
            review.rating,
            review.comment,
            at_str,
          ],
        );
        match inserted {
          Ok(_) => {}
          // UNIQUE (recipe_id, user_id): the user already reviewed it.
          Err(e) if is_constraint_violation(&e) => return Ok(ReviewInsert::Duplicate),
          Err(e) => return Err(e.into()),
        }

        let (rating, count): (f64, i64) = tx.query_row(
          "SELECT COALESCE(AVG(rating), 0.0), COUNT(*) FROM reviews WHERE recipe_id = ?1",
          rusqlite::params![recipe_str],
          |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        tx.execute(
          "UPDATE recipes SET rating = ?2, num_reviews = ?3, updated_at = ?4
           WHERE recipe_id = ?1",
          rusqlite::params![recipe_str, rating, count, at_str],
        )?;
        tx.commit()?;
        Ok(ReviewInsert::Added { owner_id, rating, count })
      })
      .await?;

    match insert {
      ReviewInsert::Missing => Ok(ReviewOutcome::RecipeNotFound),
      ReviewInsert::Duplicate => Ok(ReviewOutcome::AlreadyReviewed),
      ReviewInsert::Added { owner_id, rating, count } => Ok(ReviewOutcome::Added(RatingSummary {
        recipe_id,
        owner_id: decode_uuid(&owner_id)?,
        rating,
        num_reviews: u32::try_from(count).map_err(|_| Error::Corrupt {
          column: "num_reviews",
          value:  count.to_string(),
        })?,
      })),
    }
  }

  // ── Meal plans ────────────────────────────────────────────────────────────

  async fn find_meal_plan(
    &self,
    user_id: Uuid,
    week_start: NaiveDate,
  ) -> Result<Option<StoredMealPlan>> {
    let user_str = encode_uuid(user_id);
    let week_str = encode_date(week_start);

    let raw: Option<RawMealPlan> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {MEAL_PLAN_COLUMNS} FROM meal_plans
                 WHERE user_id = ?1 AND week_start = ?2"
              ),
              rusqlite::params![user_str, week_str],
              RawMealPlan::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMealPlan::into_meal_plan).transpose()
  }

  async fn upsert_meal_plan(
    &self,
    user_id: Uuid,
    week_start: NaiveDate,
    days: PlannedWeek,
  ) -> Result<StoredMealPlan> {
    let plan_str  = encode_uuid(Uuid::new_v4());
    let user_str  = encode_uuid(user_id);
    let week_str  = encode_date(week_start);
    let days_json = encode_json(&days)?;
    let at_str    = encode_dt(Utc::now());

    // The (user_id, week_start) key is resolved by SQLite itself: an
    // existing row keeps its id and created_at and has its days replaced.
    let raw: RawMealPlan = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO meal_plans (
               plan_id, user_id, week_start, days, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT (user_id, week_start) DO UPDATE
               SET days = excluded.days, updated_at = excluded.updated_at
             RETURNING {MEAL_PLAN_COLUMNS}"
          ),
          rusqlite::params![plan_str, user_str, week_str, days_json, at_str],
          RawMealPlan::from_row,
        )?)
      })
      .await?;

    raw.into_meal_plan()
  }

  async fn recipe_refs(&self, ids: &[Uuid]) -> Result<Vec<RecipeRef>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let id_strs: Vec<String> = ids.iter().copied().map(encode_uuid).collect();

    let rows: Vec<(String, String, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT recipe_id, title, category FROM recipes WHERE recipe_id = ?1",
        )?;
        let mut rows = Vec::with_capacity(id_strs.len());
        for id in &id_strs {
          let row = stmt
            .query_row(rusqlite::params![id], |r| {
              Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .optional()?;
          rows.extend(row);
        }
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, title, category)| {
        Ok(RecipeRef {
          id: decode_uuid(&id)?,
          title,
          category: decode_category(&category)?,
        })
      })
      .collect()
  }
}
