//! In-memory repository: users (with their quiz history), sessions, and the
//! leaderboard.
//!
//! The original design kept these as process-wide globals; here they form an
//! explicit repository handed to handlers through `AppState`, so a durable
//! datastore can slot in behind the same methods later. Quiz records are
//! append-only and never mutated after creation. The parsing pipeline has no
//! dependency on this module.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{AttemptedQuestion, LeaderboardEntry, QuizRecord, User};

pub const LEADERBOARD_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum SignupError {
  #[error("Email already registered")]
  EmailTaken,
  #[error("password hashing failed: {0}")]
  Hash(#[from] bcrypt::BcryptError),
}

#[derive(Clone)]
pub struct MemoryStore {
  users: Arc<RwLock<Vec<User>>>,
  sessions: Arc<RwLock<HashMap<String, Uuid>>>,
  leaderboard: Arc<RwLock<Vec<LeaderboardEntry>>>,
}

impl MemoryStore {
  pub fn with_users(seed: Vec<User>) -> Self {
    Self {
      users: Arc::new(RwLock::new(seed)),
      sessions: Arc::new(RwLock::new(HashMap::new())),
      leaderboard: Arc::new(RwLock::new(Vec::new())),
    }
  }

  // --- Users ---

  /// Register a new account. Email matching is case-insensitive.
  #[instrument(level = "info", skip(self, password), fields(%email))]
  pub async fn create_user(
    &self,
    name: &str,
    email: &str,
    password: &str,
  ) -> Result<User, SignupError> {
    let mut users = self.users.write().await;
    if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
      return Err(SignupError::EmailTaken);
    }
    let user = User {
      id: Uuid::new_v4(),
      name: name.to_string(),
      email: email.to_string(),
      password_hash: bcrypt::hash(password, bcrypt::DEFAULT_COST)?,
      quizzes: Vec::new(),
    };
    users.push(user.clone());
    info!(target: "notes2quiz_backend", id = %user.id, "User registered");
    Ok(user)
  }

  /// Check credentials; a hash that fails to verify reads as a bad password.
  pub async fn verify_login(&self, email: &str, password: &str) -> Option<User> {
    let users = self.users.read().await;
    let user = users.iter().find(|u| u.email.eq_ignore_ascii_case(email))?;
    match bcrypt::verify(password, &user.password_hash) {
      Ok(true) => Some(user.clone()),
      _ => None,
    }
  }

  pub async fn get_user(&self, id: Uuid) -> Option<User> {
    self.users.read().await.iter().find(|u| u.id == id).cloned()
  }

  // --- Quiz history ---

  /// Append an upload-generated quiz record to a user's history.
  #[instrument(level = "debug", skip(self, record), fields(%user_id, quiz_id = %record.id))]
  pub async fn append_quiz(&self, user_id: Uuid, record: QuizRecord) -> bool {
    let mut users = self.users.write().await;
    match users.iter_mut().find(|u| u.id == user_id) {
      Some(user) => {
        user.quizzes.push(record);
        true
      }
      None => false,
    }
  }

  /// Record a graded attempt: one immutable history record plus one
  /// leaderboard row, in a single critical section.
  #[instrument(level = "info", skip(self, questions), fields(%user_id, score, total))]
  pub async fn save_graded_attempt(
    &self,
    user_id: Uuid,
    score: u32,
    total: u32,
    questions: Vec<AttemptedQuestion>,
  ) -> Option<QuizRecord> {
    let mut users = self.users.write().await;
    let user = users.iter_mut().find(|u| u.id == user_id)?;
    let record = QuizRecord {
      id: Uuid::new_v4(),
      summary: None,
      score: Some(score),
      total: Some(total),
      questions,
      date: Utc::now(),
    };
    user.quizzes.push(record.clone());
    let name = user.name.clone();
    drop(users);

    self.leaderboard.write().await.push(LeaderboardEntry {
      name,
      score,
      total,
      date: record.date,
    });
    Some(record)
  }

  pub async fn latest_quiz(&self, user_id: Uuid) -> Option<QuizRecord> {
    self
      .get_user(user_id)
      .await
      .and_then(|u| u.quizzes.last().cloned())
  }

  pub async fn find_quiz(&self, user_id: Uuid, quiz_id: Uuid) -> Option<QuizRecord> {
    self
      .get_user(user_id)
      .await
      .and_then(|u| u.quizzes.into_iter().find(|q| q.id == quiz_id))
  }

  // --- Leaderboard ---

  /// Top entries sorted by score, ties broken by most recent date.
  pub async fn top_leaderboard(&self) -> Vec<LeaderboardEntry> {
    let mut board = self.leaderboard.read().await.clone();
    board.sort_by(|a, b| (b.score, b.date).cmp(&(a.score, a.date)));
    board.truncate(LEADERBOARD_LIMIT);
    board
  }

  // --- Sessions ---

  pub async fn create_session(&self, user_id: Uuid) -> String {
    let sid = Uuid::new_v4().to_string();
    self.sessions.write().await.insert(sid.clone(), user_id);
    sid
  }

  pub async fn session_user(&self, sid: &str) -> Option<Uuid> {
    self.sessions.read().await.get(sid).copied()
  }

  pub async fn drop_session(&self, sid: &str) {
    self.sessions.write().await.remove(sid);
  }
}
