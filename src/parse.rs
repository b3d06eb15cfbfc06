//! Turning free-form model completions into validated quiz questions.
//!
//! The model is asked for a strict JSON array but routinely wraps it in prose
//! or code fences, or abandons JSON entirely. Parsing is an ordered chain of
//! strategies sharing one result type:
//!
//!   1) direct JSON parse of the fence-stripped text
//!   2) salvage parse of the widest `[...]` span embedded in prose
//!   3) line-oriented fallback parser (total; worst case an empty list)
//!
//! The first strategy to produce questions wins. Nothing in this module
//! touches storage or the network, and nothing here returns an error: a
//! completion the chain cannot read yields an empty list, which callers treat
//! as a valid degenerate result.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{OptionKey, QuizQuestion};

static MARKDOWN_MARKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*#]+").unwrap());
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static CODE_FENCES: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?").unwrap());

/// Strip markdown artifacts and normalize line structure in summary text.
///
/// Removes `*`/`#` runs, converts CRLF to LF, collapses three or more
/// consecutive line breaks to a single blank line, and trims. Total over any
/// input and idempotent.
pub fn normalize(text: &str) -> String {
  let no_marks = MARKDOWN_MARKS.replace_all(text, "");
  let unix = no_marks.replace("\r\n", "\n");
  let collapsed = BLANK_RUNS.replace_all(&unix, "\n\n");
  collapsed.trim().to_string()
}

/// Remove triple-backtick fence markers (optionally tagged `json`).
pub fn strip_code_fences(text: &str) -> String {
  CODE_FENCES.replace_all(text, "").trim().to_string()
}

/// Question shape as it arrives from the model, before validation.
/// Every field is optional so that partial or null-bearing JSON still loads.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawQuestion {
  #[serde(default)]
  pub question: Option<String>,
  #[serde(default)]
  pub options: Option<BTreeMap<String, String>>,
  #[serde(default)]
  pub answer: Option<String>,
}

/// Strict JSON extraction: direct parse first, then a salvage parse of the
/// widest bracketed span. `None` means both attempts failed; the caller is
/// expected to fall through to [`parse_lines`].
///
/// Generic because the flashcards path reads a different array shape through
/// the same two stages.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Option<T> {
  let cleaned = strip_code_fences(text);
  if let Ok(parsed) = serde_json::from_str::<T>(&cleaned) {
    return Some(parsed);
  }
  let span = bracketed_span(&cleaned)?;
  serde_json::from_str::<T>(span).ok()
}

/// Widest array-looking span: first `[` through the last `]`.
fn bracketed_span(text: &str) -> Option<&str> {
  let start = text.find('[')?;
  let end = text.rfind(']')?;
  if end < start {
    return None;
  }
  Some(&text[start..=end])
}

/// Line-oriented fallback parser. Total: never fails, worst case `vec![]`.
///
/// Recognizes, over trimmed non-blank lines:
///   - a question header: starts with `q`/`Q` and contains a `.`; the
///     question text is everything after the first dot
///   - up to four option lines: first character must be an uppercase `A`-`D`
///     (key matching is case-sensitive, unlike header detection) and the line
///     must be at least two characters; key and one separator are skipped
///   - an optional `answer` line (case-insensitive), split on the first `:`,
///     taking the first whitespace token after it
///
/// Unrecognized lines advance the scan by one.
pub fn parse_lines(text: &str) -> Vec<RawQuestion> {
  let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
  let mut questions = Vec::new();
  let mut i = 0;

  while i < lines.len() {
    let line = lines[i];
    let is_header =
      line.chars().next().map(|c| c.eq_ignore_ascii_case(&'q')).unwrap_or(false) && line.contains('.');
    if !is_header {
      i += 1;
      continue;
    }

    let q_text = line
      .split_once('.')
      .map(|(_, rest)| rest.trim().to_string())
      .unwrap_or_default();
    i += 1;

    let mut options = BTreeMap::new();
    for _ in 0..4 {
      let Some(part) = lines.get(i) else { break };
      let mut chars = part.chars();
      let key = chars.next().and_then(OptionKey::from_char);
      // Two characters minimum: the key plus one separator (`.`/`)`/space).
      match key {
        Some(k) if part.chars().count() >= 2 => {
          let option_text = part.chars().skip(2).collect::<String>().trim().to_string();
          options.insert(k.as_str().to_string(), option_text);
          i += 1;
        }
        _ => break,
      }
    }

    let mut answer = String::new();
    if let Some(next) = lines.get(i) {
      if next.to_lowercase().starts_with("answer") {
        if let Some((_, rest)) = next.split_once(':') {
          answer = rest.split_whitespace().next().unwrap_or("").to_string();
        }
        i += 1;
      }
    }

    questions.push(RawQuestion {
      question: Some(q_text),
      options: Some(options),
      answer: Some(answer),
    });
  }

  questions
}

/// Normalize field presence and enforce the closed option-key set.
///
/// Missing fields become empty values; option keys that are not a single
/// uppercase `A`-`D` are dropped, and an answer outside the surviving key
/// space of the schema becomes "undetermined" rather than a loose string.
pub fn assemble(raw: Vec<RawQuestion>) -> Vec<QuizQuestion> {
  raw
    .into_iter()
    .map(|r| {
      let options: BTreeMap<OptionKey, String> = r
        .options
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| {
          let mut chars = k.chars();
          match (chars.next().and_then(OptionKey::from_char), chars.next()) {
            (Some(key), None) => Some((key, v)),
            _ => None,
          }
        })
        .collect();
      let answer = r.answer.as_deref().and_then(OptionKey::from_answer_token);
      QuizQuestion {
        question: r.question.unwrap_or_default(),
        options,
        answer,
      }
    })
    .collect()
}

/// A single attempt at reading completion text into raw questions.
/// `None` means "not recognized by this strategy", never a hard error.
trait ParseStrategy {
  fn name(&self) -> &'static str;
  fn parse(&self, input: &str) -> Option<Vec<RawQuestion>>;
}

/// Whole input is the JSON array (after fence stripping).
struct DirectJson;

impl ParseStrategy for DirectJson {
  fn name(&self) -> &'static str {
    "direct_json"
  }

  fn parse(&self, input: &str) -> Option<Vec<RawQuestion>> {
    serde_json::from_str(input).ok()
  }
}

/// JSON array buried in surrounding prose.
struct SalvageArray;

impl ParseStrategy for SalvageArray {
  fn name(&self) -> &'static str {
    "salvage_array"
  }

  fn parse(&self, input: &str) -> Option<Vec<RawQuestion>> {
    let span = bracketed_span(input)?;
    serde_json::from_str(span).ok()
  }
}

/// Terminal strategy: the line parser cannot fail, so the chain always ends.
struct LineFallback;

impl ParseStrategy for LineFallback {
  fn name(&self) -> &'static str {
    "line_fallback"
  }

  fn parse(&self, input: &str) -> Option<Vec<RawQuestion>> {
    Some(parse_lines(input))
  }
}

const STRATEGIES: &[&dyn ParseStrategy] = &[&DirectJson, &SalvageArray, &LineFallback];

/// Run the full chain over one model completion and assemble the result.
pub fn parse_quiz_response(text: &str) -> Vec<QuizQuestion> {
  let cleaned = strip_code_fences(text);
  for strategy in STRATEGIES {
    if let Some(raw) = strategy.parse(&cleaned) {
      debug!(target: "quiz", strategy = strategy.name(), count = raw.len(), "quiz text parsed");
      return assemble(raw);
    }
  }
  // Unreachable: LineFallback always returns Some.
  Vec::new()
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  fn opts(pairs: &[(OptionKey, &str)]) -> BTreeMap<OptionKey, String> {
    pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
  }

  #[test]
  fn normalize_strips_marks_and_collapses_blank_runs() {
    assert_eq!(normalize("**Hello**\n\n\n\nWorld#"), "Hello\n\nWorld");
  }

  #[test]
  fn normalize_converts_crlf() {
    assert_eq!(normalize("a\r\nb\r\n\r\n\r\nc"), "a\nb\n\nc");
  }

  #[test]
  fn normalize_is_total_and_idempotent() {
    for input in ["", "   ", "## Title **bold**\r\n\r\n\r\n\r\ntail", "plain"] {
      let once = normalize(input);
      assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
    }
  }

  #[test]
  fn extract_json_reads_a_clean_array() {
    let text = r#"[{"question":"What is 2+2?","options":{"A":"3","B":"4"},"answer":"B"}]"#;
    let raw: Vec<RawQuestion> = extract_json(text).unwrap();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].question.as_deref(), Some("What is 2+2?"));
    assert_eq!(raw[0].answer.as_deref(), Some("B"));
  }

  #[test]
  fn extract_json_strips_code_fences() {
    let fenced = "```json\n[{\"question\":\"q\",\"options\":{},\"answer\":\"A\"}]\n```";
    let bare = "[{\"question\":\"q\",\"options\":{},\"answer\":\"A\"}]";
    let a: Vec<RawQuestion> = extract_json(fenced).unwrap();
    let b: Vec<RawQuestion> = extract_json(bare).unwrap();
    assert_eq!(assemble(a), assemble(b));
  }

  #[test]
  fn extract_json_salvages_array_from_prose() {
    let text = "Here are your questions:\n[{\"question\":\"q1\",\"options\":{\"A\":\"x\"},\"answer\":\"A\"}]\nGood luck!";
    let raw: Vec<RawQuestion> = extract_json(text).unwrap();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].question.as_deref(), Some("q1"));
  }

  #[test]
  fn extract_json_fails_without_any_array() {
    let out: Option<Vec<RawQuestion>> = extract_json("Q1. What is 2+2?\nA. 3\nB. 4");
    assert!(out.is_none());
  }

  #[test]
  fn line_parser_reads_the_canonical_block() {
    let block = "Q1. What is 2+2?\nA. 3\nB. 4\nC. 5\nD. 6\nAnswer: B";
    let questions = assemble(parse_lines(block));
    assert_eq!(
      questions,
      vec![QuizQuestion {
        question: "What is 2+2?".into(),
        options: opts(&[
          (OptionKey::A, "3"),
          (OptionKey::B, "4"),
          (OptionKey::C, "5"),
          (OptionKey::D, "6"),
        ]),
        answer: Some(OptionKey::B),
      }]
    );
  }

  #[test]
  fn line_parser_defaults_missing_answer_to_empty() {
    let block = "Q1. What is 2+2?\nA. 3\nB. 4\nC. 5\nD. 6";
    let questions = assemble(parse_lines(block));
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].answer, None);
    assert_eq!(serde_json::to_value(&questions[0]).unwrap()["answer"], "");
  }

  #[test]
  fn line_parser_emits_header_with_no_options() {
    let questions = assemble(parse_lines("Q1. Orphan question with nothing below"));
    assert_eq!(questions.len(), 1);
    assert!(questions[0].options.is_empty());
    assert_eq!(questions[0].answer, None);
  }

  #[test]
  fn line_parser_handles_back_to_back_questions_without_answers() {
    let block = "Q1. First?\nA. one\nB. two\nQ2. Second?\nA. uno\nB. dos\nAnswer: A";
    let questions = assemble(parse_lines(block));
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].answer, None);
    assert_eq!(questions[1].answer, Some(OptionKey::A));
  }

  #[test]
  fn line_parser_stops_options_at_first_non_option_line() {
    let block = "Q1. Pick one\nA. alpha\nnot an option\nB. beta";
    let questions = assemble(parse_lines(block));
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].options, opts(&[(OptionKey::A, "alpha")]));
  }

  #[test]
  fn line_parser_option_keys_are_case_sensitive_but_headers_are_not() {
    // The asymmetry is deliberate: `q1.`/`ANSWER:` match, `a.` does not.
    let block = "q1. lowercase header works\nA. kept\nANSWER: A";
    let questions = assemble(parse_lines(block));
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].options, opts(&[(OptionKey::A, "kept")]));
    assert_eq!(questions[0].answer, Some(OptionKey::A));

    // A lowercase key is not an option line; it terminates option collection.
    let lower = assemble(parse_lines("Q1. q\na. nope\nA. yes"));
    assert!(lower[0].options.is_empty());
  }

  #[test]
  fn line_parser_two_character_option_line_has_empty_text() {
    let questions = assemble(parse_lines("Q1. Short options\nA.\nB)"));
    assert_eq!(
      questions[0].options,
      opts(&[(OptionKey::A, ""), (OptionKey::B, "")])
    );
  }

  #[test]
  fn line_parser_single_character_line_is_not_an_option() {
    let questions = assemble(parse_lines("Q1. Bare letter below\nA"));
    assert!(questions[0].options.is_empty());
  }

  #[test]
  fn line_parser_ignores_trailing_prose_without_header() {
    let block = "Q1. Real question\nA. yes\nAnswer: A\nThese were your questions.";
    let questions = assemble(parse_lines(block));
    assert_eq!(questions.len(), 1);
  }

  #[test]
  fn line_parser_answer_line_without_colon_keeps_answer_empty() {
    let questions = assemble(parse_lines("Q1. q\nA. x\nAnswer B"));
    assert_eq!(questions[0].answer, None);
  }

  #[test]
  fn line_parser_takes_first_token_after_colon() {
    let questions = assemble(parse_lines("Q1. q\nA. x\nB. y\nAnswer: B (because)"));
    assert_eq!(questions[0].answer, Some(OptionKey::B));
  }

  #[test]
  fn assemble_drops_out_of_range_keys_and_answers() {
    let raw = vec![RawQuestion {
      question: Some("q".into()),
      options: Some(
        [
          ("A".to_string(), "fine".to_string()),
          ("E".to_string(), "dropped".to_string()),
          ("AB".to_string(), "dropped".to_string()),
        ]
        .into_iter()
        .collect(),
      ),
      answer: Some("E".into()),
    }];
    let questions = assemble(raw);
    assert_eq!(questions[0].options, opts(&[(OptionKey::A, "fine")]));
    assert_eq!(questions[0].answer, None);
  }

  #[test]
  fn assemble_defaults_absent_fields() {
    let questions = assemble(vec![RawQuestion::default()]);
    assert_eq!(questions[0].question, "");
    assert!(questions[0].options.is_empty());
    assert_eq!(questions[0].answer, None);
  }

  #[test]
  fn chain_prefers_json_then_falls_back_to_lines() {
    let json_text = r#"[{"question":"from json","options":{"A":"x"},"answer":"A"}]"#;
    assert_eq!(parse_quiz_response(json_text)[0].question, "from json");

    let lines_text = "Intro prose.\nQ1. from lines\nA. x\nAnswer: A";
    assert_eq!(parse_quiz_response(lines_text)[0].question, "from lines");
  }

  #[test]
  fn chain_yields_empty_set_for_unreadable_text() {
    assert!(parse_quiz_response("The model refused to cooperate today.").is_empty());
  }

  #[test]
  fn json_round_trip_is_lossless_for_schema_fields() {
    let text = r#"[
      {"question":"One","options":{"A":"1","B":"2","C":"3","D":"4"},"answer":"C"},
      {"question":"Two","options":{"B":"only"},"answer":""}
    ]"#;
    let questions = assemble(extract_json::<Vec<RawQuestion>>(text).unwrap());
    let encoded = serde_json::to_string(&questions).unwrap();
    let reparsed: Vec<QuizQuestion> = serde_json::from_str(&encoded).unwrap();
    assert_eq!(questions, reparsed);
  }
}
