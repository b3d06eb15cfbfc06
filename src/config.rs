//! Loading application configuration (prompts + upload policy) from TOML/env.
//!
//! See `AppConfig` and `Prompts` for the expected schema.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts used by the OpenAI client. Defaults reproduce the instruction
/// templates the app ships with; override them in TOML to tune tone or the
/// requested question count.
///
/// Placeholders: `{notes}`, `{difficulty}`, `{summary}`, `{question}`,
/// `{correct}` (filled with `util::fill_template`).
#[derive(Clone, Debug, Deserialize)]
pub struct Prompts {
  // Upload summarization
  pub summary_system: String,
  pub summary_user_template: String,
  // Quiz generation (strict JSON-only instruction)
  pub quiz_system: String,
  pub quiz_user_template: String,
  // Flashcards generation
  pub flashcards_system: String,
  pub flashcards_user_template: String,
  // Deterministic answer explanations (no model call)
  pub explanation_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      summary_system: "You are a helpful assistant who summarizes text clearly.".into(),
      summary_user_template: "Summarize the following notes as clear, concise bullet points. \
        Use plain hyphens (-) for bullets, keep each point short (max 20 words), \
        and do not include headings, numbering, or extra text:\n\n{notes}:".into(),
      quiz_system: "You are an expert teacher creating multiple-choice quizzes.".into(),
      quiz_user_template: "Create 10 multiple-choice questions from the following study notes. \
        Return ONLY valid JSON in this exact format: \
        [{\"question\": \"...\", \"options\": {\"A\": \"...\", \"B\": \"...\", \"C\": \"...\", \"D\": \"...\"}, \"answer\": \"B\"}]. \
        No explanations, no extra text, only JSON.\n\nDifficulty: {difficulty}.\n\nNotes:\n{notes}".into(),
      flashcards_system: "You create concise study flashcards. Respond ONLY with strict JSON.".into(),
      flashcards_user_template: "Create concise flashcards from the following text.\n\
        Respond in JSON array format where each item has:\n\
        - question (string)\n- answer (string)\n\nText:\n{summary}".into(),
      explanation_template: "The correct answer is {correct} because this concept is \
        fundamental to the question: {question}".into(),
    }
  }
}

/// Attempt to load `AppConfig` from APP_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("APP_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "notes2quiz_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "notes2quiz_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "notes2quiz_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// Where uploaded files land and how big they may be.
#[derive(Clone, Debug)]
pub struct UploadPolicy {
  pub dir: PathBuf,
  pub max_bytes: usize,
}

const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

impl UploadPolicy {
  pub fn from_env() -> Self {
    let dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
    let max_bytes = std::env::var("MAX_UPLOAD_BYTES")
      .ok()
      .and_then(|v| v.parse::<usize>().ok())
      .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
    Self { dir: PathBuf::from(dir), max_bytes }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_prompts_carry_their_placeholders() {
    let p = Prompts::default();
    assert!(p.summary_user_template.contains("{notes}"));
    assert!(p.quiz_user_template.contains("{difficulty}"));
    assert!(p.quiz_user_template.contains("{notes}"));
    assert!(p.flashcards_user_template.contains("{summary}"));
    assert!(p.explanation_template.contains("{correct}"));
    assert!(p.explanation_template.contains("{question}"));
  }

  #[test]
  fn quiz_prompt_requests_json_only() {
    let p = Prompts::default();
    assert!(p.quiz_user_template.contains("ONLY valid JSON"));
    assert!(p.quiz_user_template.contains("\"answer\""));
  }

  #[test]
  fn partial_prompts_table_falls_back_to_defaults() {
    let cfg: AppConfig = toml::from_str(
      r#"
        [prompts]
        summary_system = "custom"
      "#,
    )
    .unwrap_or_default();
    // A partial [prompts] table is a parse error (all fields required),
    // so the loader falls back to defaults rather than mixing halves.
    assert_eq!(cfg.prompts.summary_system, Prompts::default().summary_system);
  }
}
