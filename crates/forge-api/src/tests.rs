//! Router tests against an in-memory store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::NaiveDate;
use forge_core::{
  ledger::{Award, AwardReceipt},
  meal_plan::{PlannedWeek, RecipeRef, StoredMealPlan},
  recipe::{
    CreatedRecipe, NewRecipe, NewReview, Recipe, RecipeContent, RecipeQuery,
    ReviewOutcome,
  },
  store::ForgeStore,
  user::{NewUser, User},
};
use forge_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::api_router;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  Router::new().nest("/api", api_router(Arc::new(store)))
}

fn auth_header(email: &str, pass: &str) -> String {
  format!("Basic {}", B64.encode(format!("{email}:{pass}")))
}

async fn call(
  app:    &Router,
  method: &str,
  uri:    &str,
  auth:   Option<&str>,
  body:   Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(email) = auth {
    builder = builder.header(header::AUTHORIZATION, auth_header(email, "secret1"));
  }
  let req = match body {
    Some(v) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(v.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

/// Register `email` with password `secret1` and return the new user id.
async fn register(app: &Router, email: &str) -> Uuid {
  let (status, body) = call(
    app,
    "POST",
    "/api/users/register",
    None,
    Some(json!({ "name": "Maria", "email": email, "password": "secret1" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["id"].as_str().unwrap().parse().unwrap()
}

async fn create_recipe(app: &Router, email: &str, title: &str) -> Uuid {
  let (status, body) = call(
    app,
    "POST",
    "/api/recipes",
    Some(email),
    Some(json!({ "title": title, "category": "dessert" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["recipe_id"].as_str().unwrap().parse().unwrap()
}

async fn profile(app: &Router, email: &str) -> Value {
  let (status, body) = call(app, "GET", "/api/users/profile", Some(email), None).await;
  assert_eq!(status, StatusCode::OK);
  body
}

// ── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_hides_password_hash() {
  let app = app().await;
  let (status, body) = call(
    &app,
    "POST",
    "/api/users/register",
    None,
    Some(json!({ "name": " Maria ", "email": "Maria@Example.com", "password": "secret1" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["name"], "Maria");
  assert_eq!(body["email"], "maria@example.com");
  assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn register_rejects_bad_input_and_duplicates() {
  let app = app().await;
  register(&app, "maria@example.com").await;

  let (status, _) = call(
    &app,
    "POST",
    "/api/users/register",
    None,
    Some(json!({ "name": "Maria", "email": "maria@example.com", "password": "secret1" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, body) = call(
    &app,
    "POST",
    "/api/users/register",
    None,
    Some(json!({ "name": "Kostas", "email": "kostas@example.com", "password": "123" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("at least 6"));

  let (status, _) = call(
    &app,
    "POST",
    "/api/users/register",
    None,
    Some(json!({ "name": "Kostas", "email": "not-an-email", "password": "secret1" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_requires_credentials() {
  let app = app().await;
  let req = Request::builder()
    .uri("/api/users/profile")
    .body(Body::empty())
    .unwrap();
  let resp = app.oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn new_profile_starts_at_level_one() {
  let app = app().await;
  register(&app, "maria@example.com").await;

  let body = profile(&app, "maria@example.com").await;
  assert_eq!(body["points"], 0);
  assert_eq!(body["level"], 1);
  assert_eq!(body["badges"], json!([]));
  assert_eq!(body["progress"]["level_name"], "Novice Cook");
  assert_eq!(body["progress"]["next_level"], json!({ "kind": "at", "points": 50 }));
}

#[tokio::test]
async fn login_returns_profile_for_valid_credentials() {
  let app = app().await;
  let id = register(&app, "maria@example.com").await;

  let (status, body) = call(&app, "POST", "/api/users/login", Some("maria@example.com"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["id"], id.to_string());
  assert_eq!(body["email"], "maria@example.com");
  assert_eq!(body["level"], 1);
  assert!(body.get("password_hash").is_none());

  let req = Request::builder()
    .method("POST")
    .uri("/api/users/login")
    .header(header::AUTHORIZATION, auth_header("maria@example.com", "wrong-pass"))
    .body(Body::empty())
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let (status, _) = call(&app, "POST", "/api/users/login", Some("nobody@example.com"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Recipes ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn creating_recipes_awards_points_and_badges() {
  let app = app().await;
  register(&app, "maria@example.com").await;

  create_recipe(&app, "maria@example.com", "Galaktoboureko").await;
  let body = profile(&app, "maria@example.com").await;
  assert_eq!(body["points"], 10);
  assert_eq!(body["badges"], json!(["First Recipe"]));

  for i in 0..4 {
    create_recipe(&app, "maria@example.com", &format!("Dish {i}")).await;
  }
  let body = profile(&app, "maria@example.com").await;
  assert_eq!(body["points"], 50);
  assert_eq!(body["level"], 2);
  assert_eq!(body["badges"], json!(["First Recipe", "Master Chef Lvl 1", "Level 2"]));
  assert_eq!(body["progress"]["level_name"], "Apprentice Chef");
}

#[tokio::test]
async fn recipe_validation_and_legacy_ingredients() {
  let app = app().await;
  register(&app, "maria@example.com").await;

  let (status, _) = call(
    &app,
    "POST",
    "/api/recipes",
    Some("maria@example.com"),
    Some(json!({ "title": "   ", "category": "soup" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(
    &app,
    "POST",
    "/api/recipes",
    Some("maria@example.com"),
    Some(json!({ "title": "Fakes", "category": "soup", "servings": 0 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call(
    &app,
    "POST",
    "/api/recipes",
    Some("maria@example.com"),
    Some(json!({
      "title": "Fakes",
      "category": "soup",
      "ingredients": ["lentils", { "quantity": 2, "unit": "tbsp", "name": "olive oil" }],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["servings"], 4);
  assert_eq!(body["ingredients"][0]["name"], "lentils");
  assert_eq!(body["ingredients"][1]["unit"], "tbsp");
}

#[tokio::test]
async fn list_and_filter_recipes() {
  let app = app().await;
  register(&app, "maria@example.com").await;
  create_recipe(&app, "maria@example.com", "Loukoumades").await;
  create_recipe(&app, "maria@example.com", "Baklava").await;

  let (status, body) = call(&app, "GET", "/api/recipes?search=BAKL", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["title"], "Baklava");

  let (_, body) = call(&app, "GET", "/api/recipes?category=soup", None, None).await;
  assert_eq!(body, json!([]));

  let (_, body) = call(&app, "GET", "/api/recipes?category=dessert", None, None).await;
  assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn only_owner_may_edit_or_delete() {
  let app = app().await;
  register(&app, "maria@example.com").await;
  register(&app, "kostas@example.com").await;
  let id = create_recipe(&app, "maria@example.com", "Revani").await;
  let uri = format!("/api/recipes/{id}");

  let (status, _) = call(
    &app,
    "PUT",
    &uri,
    Some("kostas@example.com"),
    Some(json!({ "title": "Mine now" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&app, "DELETE", &uri, Some("kostas@example.com"), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = call(
    &app,
    "PUT",
    &uri,
    Some("maria@example.com"),
    Some(json!({ "servings": 8 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["title"], "Revani");
  assert_eq!(body["servings"], 8);

  let (status, _) = call(&app, "DELETE", &uri, Some("maria@example.com"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&app, "GET", &uri, None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  // Points are never taken back.
  assert_eq!(profile(&app, "maria@example.com").await["points"], 10);
}

// ── Reviews ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn review_flow() {
  let app = app().await;
  register(&app, "maria@example.com").await;
  register(&app, "kostas@example.com").await;
  let id = create_recipe(&app, "maria@example.com", "Kataifi").await;
  let uri = format!("/api/recipes/{id}/reviews");

  let (status, _) = call(
    &app,
    "POST",
    &uri,
    Some("kostas@example.com"),
    Some(json!({ "rating": 6, "comment": "Too good" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(
    &app,
    "POST",
    &uri,
    Some("kostas@example.com"),
    Some(json!({ "rating": 5, "comment": "   " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call(
    &app,
    "POST",
    &uri,
    Some("kostas@example.com"),
    Some(json!({ "rating": 5, "comment": "Wonderful" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["rating"], 5.0);
  assert_eq!(body["num_reviews"], 1);

  let (status, _) = call(
    &app,
    "POST",
    &uri,
    Some("kostas@example.com"),
    Some(json!({ "rating": 1, "comment": "Changed my mind" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = call(
    &app,
    "POST",
    &format!("/api/recipes/{}/reviews", Uuid::new_v4()),
    Some("kostas@example.com"),
    Some(json!({ "rating": 4, "comment": "Where is it?" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let reviewer = profile(&app, "kostas@example.com").await;
  assert_eq!(reviewer["points"], 2);
  assert_eq!(reviewer["badges"], json!(["First Review"]));

  let (_, recipe) = call(&app, "GET", &format!("/api/recipes/{id}"), None, None).await;
  assert_eq!(recipe["reviews"][0]["comment"], "Wonderful");
  assert_eq!(recipe["num_reviews"], 1);
}

#[tokio::test]
async fn malformed_ratings_are_json_bad_requests() {
  let app = app().await;
  register(&app, "maria@example.com").await;
  register(&app, "kostas@example.com").await;
  let id = create_recipe(&app, "maria@example.com", "Galaktoboureko").await;
  let uri = format!("/api/recipes/{id}/reviews");

  for body in [
    json!({ "comment": "No stars given" }),
    json!({ "rating": null, "comment": "No stars given" }),
    json!({ "rating": 4.5, "comment": "Almost perfect" }),
    json!({ "rating": "lots", "comment": "Very good" }),
  ] {
    let (status, resp) = call(&app, "POST", &uri, Some("kostas@example.com"), Some(body.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(resp["error"].is_string(), "{body} -> {resp}");
  }

  let (status, resp) = call(
    &app,
    "POST",
    &uri,
    Some("kostas@example.com"),
    Some(json!({ "rating": "5", "comment": "Quoted but fine" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(resp["rating"], 5.0);
  assert_eq!(resp["num_reviews"], 1);
}

#[tokio::test]
async fn fifth_high_review_makes_recipe_popular() {
  let app = app().await;
  register(&app, "maria@example.com").await;
  let id = create_recipe(&app, "maria@example.com", "Bougatsa").await;
  let uri = format!("/api/recipes/{id}/reviews");

  for i in 0..5 {
    let email = format!("fan{i}@example.com");
    register(&app, &email).await;
    let (status, _) = call(
      &app,
      "POST",
      &uri,
      Some(&email),
      Some(json!({ "rating": 5, "comment": "Delicious" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let owner = profile(&app, "maria@example.com").await;
  assert_eq!(owner["points"], 25);
  assert_eq!(owner["badges"], json!(["First Recipe", "Popular Plate"]));
}

// ── Meal plans ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn meal_plan_requires_week() {
  let app = app().await;
  register(&app, "maria@example.com").await;

  let (status, _) = call(&app, "GET", "/api/mealplans", Some("maria@example.com"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(
    &app,
    "GET",
    "/api/mealplans?week_start_date=next-tuesday",
    Some("maria@example.com"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsaved_week_is_empty() {
  let app = app().await;
  register(&app, "maria@example.com").await;

  let (status, body) = call(
    &app,
    "GET",
    "/api/mealplans?week_start_date=2024-03-06",
    Some("maria@example.com"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["id"], Value::Null);
  assert_eq!(body["days"].as_array().unwrap().len(), 7);
  assert!(body["week_start_date"].as_str().unwrap().starts_with("2024-03-04"));
}

#[tokio::test]
async fn meal_plan_upsert_and_read_back() {
  let app = app().await;
  register(&app, "maria@example.com").await;
  let id = create_recipe(&app, "maria@example.com", "Melomakarona").await;

  let mut days = vec![json!({ "recipes": [] }); 6];
  let (status, _) = call(
    &app,
    "POST",
    "/api/mealplans",
    Some("maria@example.com"),
    Some(json!({ "week_start_date": "2024-03-05", "days": days.clone() })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  days.insert(0, json!({ "recipes": [id.to_string(), { "_id": id.to_string() }, 7] }));
  let (status, saved) = call(
    &app,
    "POST",
    "/api/mealplans",
    Some("maria@example.com"),
    Some(json!({ "week_start_date": "2024-03-05T18:30:00Z", "days": days })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(saved["id"].is_string());
  let monday = &saved["days"][0]["recipes"];
  assert_eq!(monday.as_array().unwrap().len(), 2);
  assert_eq!(monday[0]["title"], "Melomakarona");
  assert_eq!(monday[0]["category"], "dessert");

  let (status, fetched) = call(
    &app,
    "GET",
    "/api/mealplans?week_start_date=2024-03-10",
    Some("maria@example.com"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched["id"], saved["id"]);
  assert_eq!(fetched["days"], saved["days"]);
}

#[tokio::test]
async fn camel_case_week_key_is_accepted() {
  let app = app().await;
  register(&app, "maria@example.com").await;
  let id = create_recipe(&app, "maria@example.com", "Loukoumades").await;

  let mut days = vec![json!({ "recipes": [] }); 7];
  days[2] = json!({ "recipes": [id.to_string()] });
  let (status, saved) = call(
    &app,
    "POST",
    "/api/mealplans",
    Some("maria@example.com"),
    Some(json!({ "weekStartDate": "2024-03-12", "days": days })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{saved}");
  assert!(saved["week_start_date"].as_str().unwrap().starts_with("2024-03-11"));

  let (status, fetched) = call(
    &app,
    "GET",
    "/api/mealplans?weekStartDate=2024-03-12",
    Some("maria@example.com"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched["id"], saved["id"]);
  assert_eq!(fetched["days"][2]["recipes"][0]["title"], "Loukoumades");
}

#[tokio::test]
async fn null_recipes_in_a_day_mean_an_empty_day() {
  let app = app().await;
  register(&app, "maria@example.com").await;

  let mut days = vec![json!({ "recipes": [] }); 6];
  days.push(json!({ "recipes": null }));
  let (status, saved) = call(
    &app,
    "POST",
    "/api/mealplans",
    Some("maria@example.com"),
    Some(json!({ "week_start_date": "2024-03-04", "days": days })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{saved}");
  assert_eq!(saved["days"][6]["recipes"], json!([]));
}

// ── Award failures ──────────────────────────────────────────────────────────

type StoreResult<T> = Result<T, forge_store_sqlite::Error>;

/// Delegates to SQLite but refuses every award.
struct FailingAwards(SqliteStore);

impl ForgeStore for FailingAwards {
  type Error = forge_store_sqlite::Error;

  async fn create_user(&self, input: NewUser) -> StoreResult<Option<User>> {
    self.0.create_user(input).await
  }

  async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> { self.0.get_user(id).await }

  async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
    self.0.find_user_by_email(email).await
  }

  async fn apply_award(&self, _user_id: Uuid, _award: Award) -> StoreResult<Option<AwardReceipt>> {
    Err(forge_store_sqlite::Error::DateParse("awards unavailable".into()))
  }

  async fn create_recipe(&self, input: NewRecipe) -> StoreResult<CreatedRecipe> {
    self.0.create_recipe(input).await
  }

  async fn get_recipe(&self, id: Uuid) -> StoreResult<Option<Recipe>> { self.0.get_recipe(id).await }

  async fn list_recipes(&self, query: &RecipeQuery) -> StoreResult<Vec<Recipe>> {
    self.0.list_recipes(query).await
  }

  async fn update_recipe(&self, id: Uuid, content: RecipeContent) -> StoreResult<Option<Recipe>> {
    self.0.update_recipe(id, content).await
  }

  async fn delete_recipe(&self, id: Uuid) -> StoreResult<bool> { self.0.delete_recipe(id).await }

  async fn add_review(&self, recipe_id: Uuid, review: NewReview) -> StoreResult<ReviewOutcome> {
    self.0.add_review(recipe_id, review).await
  }

  async fn find_meal_plan(
    &self,
    user_id: Uuid,
    week_start: NaiveDate,
  ) -> StoreResult<Option<StoredMealPlan>> {
    self.0.find_meal_plan(user_id, week_start).await
  }

  async fn upsert_meal_plan(
    &self,
    user_id: Uuid,
    week_start: NaiveDate,
    days: PlannedWeek,
  ) -> StoreResult<StoredMealPlan> {
    self.0.upsert_meal_plan(user_id, week_start, days).await
  }

  async fn recipe_refs(&self, ids: &[Uuid]) -> StoreResult<Vec<RecipeRef>> {
    self.0.recipe_refs(ids).await
  }
}

#[tokio::test]
async fn failed_awards_do_not_fail_the_write() {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let app = Router::new().nest("/api", api_router(Arc::new(FailingAwards(store))));
  register(&app, "maria@example.com").await;
  register(&app, "kostas@example.com").await;

  let id = create_recipe(&app, "maria@example.com", "Revani").await;
  let (status, body) = call(
    &app,
    "POST",
    &format!("/api/recipes/{id}/reviews"),
    Some("kostas@example.com"),
    Some(json!({ "rating": 5, "comment": "Syrupy" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["num_reviews"], 1);

  let (status, recipe) = call(&app, "GET", &format!("/api/recipes/{id}"), None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(recipe["title"], "Revani");
  assert_eq!(recipe["num_reviews"], 1);
  assert_eq!(recipe["reviews"][0]["comment"], "Syrupy");

  for email in ["maria@example.com", "kostas@example.com"] {
    let standing = profile(&app, email).await;
    assert_eq!(standing["points"], 0);
    assert_eq!(standing["badges"], json!([]));
  }
}
