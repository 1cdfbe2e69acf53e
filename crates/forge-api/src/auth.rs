//! HTTP Basic-auth extractor and password hashing.
//!
//! Credentials are `email:password`; the password is checked against the
//! user's argon2 PHC string.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use forge_core::{store::ForgeStore, user::Principal};
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

/// Present in a handler's arguments means the request was authenticated.
pub struct Authenticated(pub Principal);

/// Hash `password` into an argon2 PHC string with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Store(e.to_string().into()))
}

/// Decode a `Basic` authorization header into `(email, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded.trim()).map_err(|_| ApiError::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (email, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((email.to_owned(), password.to_owned()))
}

/// Resolve the caller of a request, or fail with 401.
pub async fn authenticate<S>(headers: &HeaderMap, store: &S) -> Result<Principal, ApiError>
where
  S: ForgeStore,
{
  let (email, password) = basic_credentials(headers)?;

  let user = store
    .find_user_by_email(&email)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&user.password_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)?;

  Ok(Principal::from(&user))
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: ForgeStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let principal = authenticate(&parts.headers, state.store.as_ref()).await?;
    tracing::debug!(user_id = %principal.user_id, "authenticated");
    Ok(Authenticated(principal))
  }
}
