//! Minimal OpenAI client for our use-cases.
//!
//! We only call chat.completions and request plain text; the quiz and
//! flashcard paths deliberately parse the free-form reply themselves instead
//! of relying on the service's JSON mode, because replies wander off-format
//! anyway. Calls are instrumented and log model names, latencies, and
//! response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short to
//! avoid leaking uploaded notes into logs.
//!
//! Only a failed service call crosses this boundary as [`GenerationError`];
//! unreadable completions degrade to empty results further down the chain.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::{Flashcard, QuizQuestion};
use crate::parse;
use crate::util::fill_template;

const SUMMARY_MAX_TOKENS: u32 = 800;
const SUMMARY_TEMPERATURE: f32 = 0.5;
const QUIZ_MAX_TOKENS: u32 = 1200;
const QUIZ_TEMPERATURE: f32 = 0.3;
const FLASHCARDS_TEMPERATURE: f32 = 0.7;

/// The completion service call itself failed (network, auth, quota, timeout).
/// Surfaced to the caller; never retried internally.
#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("completion transport error: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("completion service returned HTTP {status}: {message}")]
  Service { status: u16, message: String },
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, fast_model, strong_model })
  }

  /// Plain-text chat completion: the one awaited external call of the
  /// pipeline. Returns the raw completion text, trimmed.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn chat_plain(
    &self,
    model: &str,
    system: &str,
    user: &str,
    max_tokens: Option<u32>,
    temperature: f32,
  ) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      max_tokens,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "notes2quiz-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(GenerationError::Service { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }

  // --- High-level helpers (domain-specialized) ---

  /// Summarize extracted note text into cleaned bullet points.
  #[instrument(level = "info", skip(self, prompts, notes), fields(model = %self.fast_model, notes_len = notes.len()))]
  pub async fn summarize(&self, prompts: &Prompts, notes: &str) -> Result<String, GenerationError> {
    let user = fill_template(&prompts.summary_user_template, &[("notes", notes)]);
    let raw = self
      .chat_plain(
        &self.fast_model,
        &prompts.summary_system,
        &user,
        Some(SUMMARY_MAX_TOKENS),
        SUMMARY_TEMPERATURE,
      )
      .await?;
    Ok(parse::normalize(&raw))
  }

  /// Generate a quiz from source text: one completion call, then the parsing
  /// chain. An empty list is a valid (if degenerate) success; only a failed
  /// service call is an error.
  #[instrument(level = "info", skip(self, prompts, source), fields(model = %self.strong_model, %difficulty, source_len = source.len()))]
  pub async fn generate_quiz(
    &self,
    prompts: &Prompts,
    source: &str,
    difficulty: &str,
  ) -> Result<Vec<QuizQuestion>, GenerationError> {
    let user = fill_template(
      &prompts.quiz_user_template,
      &[("difficulty", difficulty), ("notes", source)],
    );
    let start = std::time::Instant::now();
    let result = self
      .chat_plain(&self.strong_model, &prompts.quiz_system, &user, Some(QUIZ_MAX_TOKENS), QUIZ_TEMPERATURE)
      .await;
    let elapsed = start.elapsed();

    let text = match result {
      Ok(t) => t,
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during quiz generation");
        return Err(e);
      }
    };

    let questions = parse::parse_quiz_response(&text);
    info!(?elapsed, count = questions.len(), reply_len = text.len(), "Quiz generated");
    Ok(questions)
  }

  /// Generate flashcards from a summary. Parsing reuses the JSON extraction
  /// stages only; there is no line-oriented fallback for flashcards, so an
  /// off-format reply degrades to an empty list.
  #[instrument(level = "info", skip(self, prompts, summary), fields(model = %self.fast_model, summary_len = summary.len()))]
  pub async fn generate_flashcards(
    &self,
    prompts: &Prompts,
    summary: &str,
  ) -> Result<Vec<Flashcard>, GenerationError> {
    let user = fill_template(&prompts.flashcards_user_template, &[("summary", summary)]);
    let text = self
      .chat_plain(&self.fast_model, &prompts.flashcards_system, &user, None, FLASHCARDS_TEMPERATURE)
      .await?;
    let cards = parse::extract_json::<Vec<Flashcard>>(&text).unwrap_or_default();
    info!(count = cards.len(), reply_len = text.len(), "Flashcards generated");
    Ok(cards)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_body_extraction_prefers_the_nested_message() {
    let body = r#"{"error": {"message": "insufficient_quota", "type": "billing"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("insufficient_quota"));
    assert_eq!(extract_openai_error("plain text error"), None);
  }

  #[test]
  fn request_omits_max_tokens_when_unset() {
    let req = ChatCompletionRequest {
      model: "m".into(),
      messages: vec![],
      temperature: 0.7,
      max_tokens: None,
    };
    let v = serde_json::to_value(&req).unwrap();
    assert!(v.get("max_tokens").is_none());
  }

  #[test]
  fn service_error_carries_status_and_message() {
    let e = GenerationError::Service { status: 429, message: "quota".into() };
    let msg = e.to_string();
    assert!(msg.contains("429"));
    assert!(msg.contains("quota"));
  }

  #[tokio::test]
  async fn failed_service_call_surfaces_a_generation_error() {
    // Nothing listens on the discard port; the connection is refused
    // immediately, so this exercises the transport-failure path offline.
    let oa = OpenAI {
      client: reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap(),
      api_key: "test-key".into(),
      base_url: "http://127.0.0.1:9".into(),
      fast_model: "m".into(),
      strong_model: "m".into(),
    };
    let prompts = Prompts::default();
    let err = oa.generate_quiz(&prompts, "some notes", "Easy").await.unwrap_err();
    assert!(matches!(err, GenerationError::Transport(_)));

    let err = oa.summarize(&prompts, "some notes").await.unwrap_err();
    assert!(matches!(err, GenerationError::Transport(_)));
  }
}
