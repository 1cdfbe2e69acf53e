//! Weekly meal plans.
//!
//! A plan is keyed by `(user, week start)` where the week start is the Monday
//! of the week, at midnight UTC. `days` always has seven entries, Monday
//! first.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{Error, Result, recipe::Category};

pub const DAYS_PER_WEEK: usize = 7;

// ─── Week keys ───────────────────────────────────────────────────────────────

/// The Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
  date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Midnight UTC of `date`.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
  date.and_time(NaiveTime::MIN).and_utc()
}

/// Parse a client-supplied week date (`YYYY-MM-DD` or an RFC 3339 timestamp)
/// and normalise it to its week start.
pub fn parse_week(raw: &str) -> Result<NaiveDate> {
  let raw = raw.trim();
  let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .or_else(|| {
      DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
    .ok_or_else(|| Error::InvalidWeekStart(raw.to_owned()))?;
  Ok(week_start(date))
}

// ─── Stored form ─────────────────────────────────────────────────────────────

/// One day as stored: recipe ids in the order the user placed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedDay {
  pub recipes: Vec<Uuid>,
}

pub type PlannedWeek = [PlannedDay; DAYS_PER_WEEK];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMealPlan {
  pub plan_id:    Uuid,
  pub user_id:    Uuid,
  pub week_start: NaiveDate,
  pub days:       PlannedWeek,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// One day as submitted. Entries may be id strings or recipe objects
/// carrying `id`/`_id`; see [`recipe_ref_id`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DayInput {
  #[serde(default, deserialize_with = "null_as_empty")]
  pub recipes: Vec<serde_json::Value>,
}

/// `"recipes": null` reads as an empty day.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<serde_json::Value>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Extract a recipe id from a submitted entry. Anything that is not a UUID
/// string, or an object with a UUID string under `id` or `_id`, yields `None`.
pub fn recipe_ref_id(entry: &serde_json::Value) -> Option<Uuid> {
  let raw = match entry {
    serde_json::Value::String(s) => s.as_str(),
    serde_json::Value::Object(map) => map
      .get("id")
      .or_else(|| map.get("_id"))
      .and_then(serde_json::Value::as_str)?,
    _ => return None,
  };
  Uuid::parse_str(raw.trim()).ok()
}

/// Check the day count and reduce every entry to a well-formed id. Malformed
/// entries are dropped; duplicates within a day are kept.
pub fn sanitize_days(days: Vec<DayInput>) -> Result<PlannedWeek> {
  let count = days.len();
  let planned: Vec<PlannedDay> = days
    .into_iter()
    .map(|day| PlannedDay {
      recipes: day.recipes.iter().filter_map(recipe_ref_id).collect(),
    })
    .collect();
  <PlannedWeek>::try_from(planned).map_err(|_| Error::InvalidDayCount(count))
}

// ─── Read model ──────────────────────────────────────────────────────────────

/// Display projection of a recipe inside a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRef {
  pub id:       Uuid,
  pub title:    String,
  pub category: Category,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayView {
  pub recipes: Vec<RecipeRef>,
}

/// The plan returned to clients. `id` is `None` for the synthetic empty plan
/// of a week that has never been saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPlanView {
  pub id:              Option<Uuid>,
  pub user_id:         Uuid,
  pub week_start_date: DateTime<Utc>,
  pub days:            [DayView; DAYS_PER_WEEK],
  pub created_at:      Option<DateTime<Utc>>,
  pub updated_at:      Option<DateTime<Utc>>,
}

impl MealPlanView {
  pub fn empty(user_id: Uuid, week: NaiveDate) -> Self {
    Self {
      id: None,
      user_id,
      week_start_date: start_of_day(week),
      days: Default::default(),
      created_at: None,
      updated_at: None,
    }
  }

  pub fn is_persisted(&self) -> bool { self.id.is_some() }
}
