//! Domain models used by the backend: option keys, quiz questions, stored
//! quiz records, flashcards, users, and leaderboard rows.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of keys a multiple-choice option may use.
///
/// The model is asked for bare letters; anything outside A-D is rejected at
/// assembly time instead of travelling on as a free-form string. Keys are
/// case-sensitive: `b` is not a valid key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionKey {
  A,
  B,
  C,
  D,
}

impl OptionKey {
  /// Strict single-letter match (uppercase only).
  pub fn from_char(c: char) -> Option<Self> {
    match c {
      'A' => Some(OptionKey::A),
      'B' => Some(OptionKey::B),
      'C' => Some(OptionKey::C),
      'D' => Some(OptionKey::D),
      _ => None,
    }
  }

  /// Parse an answer token such as `B`, `B.` or `(B)`.
  /// Wrapping punctuation is tolerated; the letter itself stays case-sensitive.
  pub fn from_answer_token(token: &str) -> Option<Self> {
    let inner = token.trim().trim_matches(|c: char| !c.is_ascii_alphanumeric());
    let mut chars = inner.chars();
    match (chars.next(), chars.next()) {
      (Some(c), None) => Self::from_char(c),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      OptionKey::A => "A",
      OptionKey::B => "B",
      OptionKey::C => "C",
      OptionKey::D => "D",
    }
  }
}

impl fmt::Display for OptionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Serde adapter keeping the wire shape `"answer": "B"` / `"answer": ""`.
/// An unset answer is an empty string, never an absent field.
pub mod answer_letter {
  use serde::{Deserialize, Deserializer, Serializer};

  use super::OptionKey;

  pub fn serialize<S: Serializer>(v: &Option<OptionKey>, s: S) -> Result<S::Ok, S::Error> {
    match v {
      Some(k) => s.serialize_str(k.as_str()),
      None => s.serialize_str(""),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<OptionKey>, D::Error> {
    // Tolerant on purpose: null, "", or a malformed letter all read as "no answer".
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.as_deref().and_then(OptionKey::from_answer_token))
  }
}

/// One generated multiple-choice question.
///
/// `options` may be sparse or empty; `answer` is `None` when the model output
/// carried no usable answer letter. Neither field is ever absent on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
  #[serde(default)]
  pub question: String,
  #[serde(default)]
  pub options: BTreeMap<OptionKey, String>,
  #[serde(default, with = "answer_letter")]
  pub answer: Option<OptionKey>,
}

/// A question inside a saved attempt: the generated question plus whatever
/// the user picked for it (absent for records saved straight after upload).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptedQuestion {
  #[serde(default)]
  pub question: String,
  #[serde(default)]
  pub options: BTreeMap<OptionKey, String>,
  #[serde(default, with = "answer_letter")]
  pub answer: Option<OptionKey>,
  #[serde(default, with = "answer_letter")]
  pub user_answer: Option<OptionKey>,
}

impl From<QuizQuestion> for AttemptedQuestion {
  fn from(q: QuizQuestion) -> Self {
    AttemptedQuestion {
      question: q.question,
      options: q.options,
      answer: q.answer,
      user_answer: None,
    }
  }
}

/// Immutable per-save record appended to a user's quiz history.
/// Created once, never mutated; `score`/`total` are present only for graded
/// attempts, `summary` only for upload-generated quizzes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuizRecord {
  pub id: Uuid,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub summary: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub score: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total: Option<u32>,
  pub questions: Vec<AttemptedQuestion>,
  pub date: DateTime<Utc>,
}

/// Question/answer pair generated for the flashcards view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
  #[serde(default)]
  pub question: String,
  #[serde(default)]
  pub answer: String,
}

/// Registered account. The password is stored only as a bcrypt hash.
#[derive(Clone, Debug)]
pub struct User {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  pub password_hash: String,
  pub quizzes: Vec<QuizRecord>,
}

/// One row of the public leaderboard.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaderboardEntry {
  pub name: String,
  pub score: u32,
  pub total: u32,
  pub date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn answer_tokens_accept_wrapping_punctuation_only() {
    assert_eq!(OptionKey::from_answer_token("B"), Some(OptionKey::B));
    assert_eq!(OptionKey::from_answer_token("B."), Some(OptionKey::B));
    assert_eq!(OptionKey::from_answer_token("(C)"), Some(OptionKey::C));
    // Lowercase keys stay invalid: option letters are case-sensitive.
    assert_eq!(OptionKey::from_answer_token("b"), None);
    assert_eq!(OptionKey::from_answer_token("E"), None);
    assert_eq!(OptionKey::from_answer_token("BC"), None);
    assert_eq!(OptionKey::from_answer_token(""), None);
  }

  #[test]
  fn question_serializes_empty_answer_as_empty_string() {
    let q = QuizQuestion {
      question: "What is 2+2?".into(),
      options: BTreeMap::new(),
      answer: None,
    };
    let json = serde_json::to_value(&q).unwrap();
    assert_eq!(json["answer"], "");
  }

  #[test]
  fn question_round_trips_through_wire_schema() {
    let text = r#"{"question":"Capital of France?","options":{"A":"Paris","B":"Rome"},"answer":"A"}"#;
    let q: QuizQuestion = serde_json::from_str(text).unwrap();
    assert_eq!(q.answer, Some(OptionKey::A));
    assert_eq!(q.options.get(&OptionKey::A).map(String::as_str), Some("Paris"));
    let back = serde_json::to_string(&q).unwrap();
    let again: QuizQuestion = serde_json::from_str(&back).unwrap();
    assert_eq!(q, again);
  }

  #[test]
  fn null_answer_reads_as_unset() {
    let text = r#"{"question":"q","options":{},"answer":null}"#;
    let q: QuizQuestion = serde_json::from_str(text).unwrap();
    assert_eq!(q.answer, None);
  }
}
