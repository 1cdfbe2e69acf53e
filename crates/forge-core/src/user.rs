//! Users and their gamification standing.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, level};

// ─── Standing ────────────────────────────────────────────────────────────────

/// The gamification slice of a user record.
///
/// `level` always equals [`level::level_for`]`(points)`; only the ledger
/// mutates a standing (see [`crate::ledger`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
  pub points: u32,
  pub level:  u8,
  /// Distinct labels in the order they were earned.
  pub badges: Vec<String>,
}

impl Default for Standing {
  fn default() -> Self {
    Self {
      points: 0,
      level:  level::level_for(0),
      badges: Vec::new(),
    }
  }
}

impl Standing {
  pub fn has_badge(&self, badge: &str) -> bool {
    self.badges.iter().any(|b| b == badge)
  }
}

// ─── User ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub name:          String,
  pub email:         String,
  /// Argon2 PHC string.
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  #[serde(flatten)]
  pub standing:      Standing,
  pub created_at:    DateTime<Utc>,
}

/// The authenticated identity handed to the core on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
  pub user_id: Uuid,
  pub name:    String,
}

impl From<&User> for Principal {
  fn from(user: &User) -> Self {
    Self { user_id: user.user_id, name: user.name.clone() }
  }
}

// ─── NewUser ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::ForgeStore::create_user`]. The password must
/// already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:          String,
  pub email:         String,
  pub password_hash: String,
}

pub const MIN_PASSWORD_LEN: usize = 6;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

fn email_is_valid(email: &str) -> bool {
  static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
  EMAIL_REGEX
    .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
    .as_ref()
    .is_some_and(|re| re.is_match(email))
}

/// Check registration fields before the password is hashed. Returns the
/// trimmed name and the lower-cased email.
pub fn validate_registration(
  name: &str,
  email: &str,
  password: &str,
) -> Result<(String, String)> {
  let name = name.trim();
  if name.is_empty() {
    return Err(Error::MissingField("name"));
  }
  let email = email.trim().to_lowercase();
  if email.is_empty() {
    return Err(Error::MissingField("email"));
  }
  if !email_is_valid(&email) {
    return Err(Error::InvalidEmail(email));
  }
  if password.len() < MIN_PASSWORD_LEN {
    return Err(Error::PasswordTooShort(MIN_PASSWORD_LEN));
  }
  Ok((name.to_owned(), email))
}
