//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AttemptedQuestion, Flashcard, LeaderboardEntry, QuizQuestion, QuizRecord, User};

/// Public projection of a user. Never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserOut {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Convert full `User` (internal) to the public DTO.
pub fn to_user_out(u: &User) -> UserOut {
    UserOut {
        id: u.id,
        name: u.name.clone(),
        email: u.email.clone(),
    }
}

//
// Auth
//

/// Signup accepts both field spellings the frontend has used over time
/// (`name`/`username`, `password`/`pwd`).
#[derive(Debug, Deserialize)]
pub struct SignupIn {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub pwd: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginIn {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct AuthOut {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserOut>,
}

#[derive(Serialize)]
pub struct MeOut {
    pub user: Option<UserOut>,
}

//
// Quiz generation and history
//

#[derive(Debug, Deserialize)]
pub struct GenerateQuizIn {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Serialize)]
pub struct QuizEnvelope {
    pub questions: Vec<QuizQuestion>,
}

#[derive(Serialize)]
pub struct GenerateQuizOut {
    pub quiz: QuizEnvelope,
}

#[derive(Serialize)]
pub struct QuestionsOut {
    pub questions: Vec<AttemptedQuestion>,
}

/// Score/total arrive as whatever the frontend serialized (number or numeric
/// string); coercion happens in the handler via [`as_count`].
#[derive(Debug, Deserialize)]
pub struct SaveQuizIn {
    #[serde(default)]
    pub score: serde_json::Value,
    #[serde(default)]
    pub total: serde_json::Value,
    #[serde(default)]
    pub questions: Vec<AttemptedQuestion>,
}

#[derive(Serialize)]
pub struct SaveQuizOut {
    pub message: String,
    pub quiz: QuizRecord,
}

#[derive(Serialize)]
pub struct DashboardOut {
    pub quizzes: Vec<QuizRecord>,
}

#[derive(Serialize)]
pub struct LeaderboardOut {
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Coerce a JSON number or numeric string into a non-negative count.
pub fn as_count(v: &serde_json::Value) -> Option<u32> {
    match v {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

//
// Upload
//

#[derive(Serialize)]
pub struct UploadOut {
    pub summary: String,
    pub quiz: QuizRecord,
}

//
// Explanations
//

#[derive(Debug, Deserialize)]
pub struct ExplainIn {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub correct: String,
    #[serde(default)]
    pub chosen: String,
}

#[derive(Serialize)]
pub struct ExplainOut {
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchExplainIn {
    #[serde(default, rename = "wrongAnswers")]
    pub wrong_answers: Vec<ExplainIn>,
}

#[derive(Serialize)]
pub struct ExplanationItem {
    pub question: String,
    pub correct: String,
    pub chosen: String,
    pub explanation: String,
}

#[derive(Serialize)]
pub struct BatchExplainOut {
    pub explanations: Vec<ExplanationItem>,
}

//
// Flashcards and misc
//

#[derive(Debug, Deserialize)]
pub struct FlashcardsIn {
    #[serde(default)]
    pub summary: String,
}

#[derive(Serialize)]
pub struct FlashcardsOut {
    pub flashcards: Vec<Flashcard>,
}

#[derive(Serialize)]
pub struct StatusOut {
    pub status: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
