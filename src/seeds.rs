//! Seed data guaranteeing the app is usable before any signup.

use tracing::error;
use uuid::Uuid;

use crate::domain::User;

/// One built-in development account (`john@example.com` / `password`).
/// If hashing the dev password somehow fails we start with no users rather
/// than a half-built account.
pub fn seed_users() -> Vec<User> {
  match bcrypt::hash("password", bcrypt::DEFAULT_COST) {
    Ok(password_hash) => vec![User {
      id: Uuid::new_v4(),
      name: "John Doe".into(),
      email: "john@example.com".into(),
      password_hash,
      quizzes: Vec::new(),
    }],
    Err(e) => {
      error!(target: "notes2quiz_backend", error = %e, "Failed to hash seed password; starting with no users");
      Vec::new()
    }
  }
}
