//! HTTP endpoint handlers. These are thin wrappers over the store, the
//! parsing pipeline, and the OpenAI client.
//! Each handler is instrumented; session cookies and payload contents stay
//! out of the logs.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::auth::{clear_session_cookie, current_user, session_cookie, session_id};
use crate::domain::{AttemptedQuestion, QuizRecord};
use crate::extract::{allowed_file, extract_text};
use crate::mailer::send_welcome_email;
use crate::pdf::{render_quiz_review_pdf, render_summary_pdf};
use crate::protocol::*;
use crate::state::AppState;
use crate::store::SignupError;
use crate::util::{fill_template, secure_filename, trunc_for_log};

const DEFAULT_DIFFICULTY: &str = "Easy";

fn err(status: StatusCode, msg: impl Into<String>) -> Response {
  (status, Json(ErrorOut { error: msg.into() })).into_response()
}

fn auth_failure(status: StatusCode, message: &str) -> Response {
  (status, Json(AuthOut { success: false, message: message.into(), user: None })).into_response()
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

// ---- Auth ----

#[instrument(level = "info", skip_all)]
pub async fn http_signup(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SignupIn>,
) -> Response {
  let email = body.email.unwrap_or_default().trim().to_string();
  let name = body
    .name
    .or(body.username)
    .map(|n| n.trim().to_string())
    .filter(|n| !n.is_empty())
    .unwrap_or_else(|| "New User".into());
  let password = body.password.or(body.pwd).unwrap_or_default();

  if email.is_empty() || password.is_empty() {
    return auth_failure(StatusCode::BAD_REQUEST, "Email and password required");
  }

  let user = match state.store.create_user(&name, &email, &password).await {
    Ok(u) => u,
    Err(SignupError::EmailTaken) => {
      return auth_failure(StatusCode::BAD_REQUEST, "Email already registered");
    }
    Err(e) => {
      error!(target: "notes2quiz_backend", error = %e, "Signup failed");
      return auth_failure(StatusCode::INTERNAL_SERVER_ERROR, "Signup failed");
    }
  };

  let sid = state.store.create_session(user.id).await;

  // Welcome mail must never block or fail the signup.
  let smtp = state.smtp.clone();
  let to = user.email.clone();
  let _ = tokio::task::spawn_blocking(move || send_welcome_email(smtp.as_ref(), &to));

  (
    StatusCode::OK,
    [(header::SET_COOKIE, session_cookie(&sid))],
    Json(AuthOut {
      success: true,
      message: "Signup successful. Welcome email sent.".into(),
      user: Some(to_user_out(&user)),
    }),
  )
    .into_response()
}

#[instrument(level = "info", skip_all)]
pub async fn http_login(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LoginIn>,
) -> Response {
  let email = body.email.unwrap_or_default().trim().to_string();
  let password = body.password.unwrap_or_default();

  if email.is_empty() || password.is_empty() {
    return auth_failure(StatusCode::BAD_REQUEST, "Email and password required");
  }

  match state.store.verify_login(&email, &password).await {
    Some(user) => {
      let sid = state.store.create_session(user.id).await;
      info!(target: "notes2quiz_backend", id = %user.id, "Login successful");
      (
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&sid))],
        Json(AuthOut {
          success: true,
          message: "Login successful".into(),
          user: Some(to_user_out(&user)),
        }),
      )
        .into_response()
    }
    None => auth_failure(StatusCode::UNAUTHORIZED, "Invalid email or password"),
  }
}

#[instrument(level = "info", skip_all)]
pub async fn http_logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
  if let Some(sid) = session_id(&headers) {
    state.store.drop_session(&sid).await;
  }
  (
    StatusCode::OK,
    [(header::SET_COOKIE, clear_session_cookie())],
    Json(AuthOut { success: true, message: "Logged out".into(), user: None }),
  )
    .into_response()
}

#[instrument(level = "info", skip_all)]
pub async fn http_me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
  let user = current_user(&state, &headers).await;
  Json(MeOut { user: user.as_ref().map(to_user_out) }).into_response()
}

// ---- Quiz history ----

#[instrument(level = "info", skip_all)]
pub async fn http_api_quiz(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
  let Some(user) = current_user(&state, &headers).await else {
    return err(StatusCode::UNAUTHORIZED, "Not logged in");
  };
  let questions = state
    .store
    .latest_quiz(user.id)
    .await
    .map(|q| q.questions)
    .unwrap_or_default();
  Json(QuestionsOut { questions }).into_response()
}

#[instrument(level = "info", skip_all)]
pub async fn http_dashboard(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
  let Some(user) = current_user(&state, &headers).await else {
    return err(StatusCode::UNAUTHORIZED, "Not logged in");
  };
  Json(DashboardOut { quizzes: user.quizzes }).into_response()
}

// ---- Quiz generation ----

#[instrument(level = "info", skip_all, fields(difficulty = %body.difficulty.clone().unwrap_or_else(|| DEFAULT_DIFFICULTY.into())))]
pub async fn http_generate_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerateQuizIn>,
) -> Response {
  let summary = body.summary.unwrap_or_default();
  if summary.trim().is_empty() {
    return err(StatusCode::BAD_REQUEST, "Summary required");
  }
  let difficulty = body.difficulty.unwrap_or_else(|| DEFAULT_DIFFICULTY.into());

  let Some(oa) = &state.openai else {
    return err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate quiz: OpenAI not configured");
  };
  match oa.generate_quiz(&state.prompts, &summary, &difficulty).await {
    Ok(questions) => {
      info!(target: "quiz", count = questions.len(), "HTTP quiz generated");
      Json(GenerateQuizOut { quiz: QuizEnvelope { questions } }).into_response()
    }
    Err(e) => err(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to generate quiz: {e}")),
  }
}

#[instrument(level = "info", skip_all)]
pub async fn http_save_quiz(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<SaveQuizIn>,
) -> Response {
  let Some(user) = current_user(&state, &headers).await else {
    return err(StatusCode::UNAUTHORIZED, "Not logged in");
  };
  let (Some(score), Some(total)) = (as_count(&body.score), as_count(&body.total)) else {
    return err(StatusCode::BAD_REQUEST, "Invalid score or total");
  };

  match state.store.save_graded_attempt(user.id, score, total, body.questions).await {
    Some(record) => {
      info!(target: "quiz", user = %user.id, quiz = %record.id, score, total, "Quiz attempt saved");
      Json(SaveQuizOut { message: "Quiz saved successfully".into(), quiz: record }).into_response()
    }
    None => err(StatusCode::UNAUTHORIZED, "Not logged in"),
  }
}

#[instrument(level = "info", skip_all)]
pub async fn http_leaderboard(State(state): State<Arc<AppState>>) -> Response {
  Json(LeaderboardOut { leaderboard: state.store.top_leaderboard().await }).into_response()
}

// ---- Explanations ----

#[instrument(level = "info", skip_all)]
pub async fn http_explain_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ExplainIn>,
) -> Response {
  let explanation = fill_template(
    &state.prompts.explanation_template,
    &[("correct", &body.correct), ("question", &body.question)],
  );
  Json(ExplainOut { explanation }).into_response()
}

#[instrument(level = "info", skip_all, fields(count = body.wrong_answers.len()))]
pub async fn http_batch_explanations(
  State(state): State<Arc<AppState>>,
  Json(body): Json<BatchExplainIn>,
) -> Response {
  let explanations = body
    .wrong_answers
    .into_iter()
    .map(|item| {
      let explanation = fill_template(
        &state.prompts.explanation_template,
        &[("correct", &item.correct), ("question", &item.question)],
      );
      ExplanationItem {
        question: item.question,
        correct: item.correct,
        chosen: item.chosen,
        explanation,
      }
    })
    .collect();
  Json(BatchExplainOut { explanations }).into_response()
}

#[instrument(level = "info", skip_all)]
pub async fn http_save_attempt(Json(body): Json<serde_json::Value>) -> Response {
  info!(target: "quiz", payload = %trunc_for_log(&body.to_string(), 300), "Quiz attempt payload received");
  Json(StatusOut { status: "success".into(), message: "Attempt saved successfully".into() })
    .into_response()
}

// ---- Upload & summary ----

#[instrument(level = "info", skip_all)]
pub async fn http_upload(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  mut multipart: Multipart,
) -> Response {
  let Some(user) = current_user(&state, &headers).await else {
    return err(StatusCode::UNAUTHORIZED, "Not logged in");
  };

  let mut file: Option<(String, Bytes)> = None;
  loop {
    match multipart.next_field().await {
      Ok(Some(field)) if field.name() == Some("file") => {
        let filename = field.file_name().map(ToString::to_string).unwrap_or_default();
        match field.bytes().await {
          Ok(bytes) => {
            file = Some((filename, bytes));
            break;
          }
          Err(e) => return err(StatusCode::BAD_REQUEST, format!("Failed to read upload: {e}")),
        }
      }
      Ok(Some(_)) => continue,
      Ok(None) => break,
      Err(e) => return err(StatusCode::BAD_REQUEST, format!("Malformed multipart body: {e}")),
    }
  }
  let Some((filename, bytes)) = file else {
    return err(StatusCode::BAD_REQUEST, "No file uploaded");
  };
  if filename.is_empty() {
    return err(StatusCode::BAD_REQUEST, "No file uploaded");
  }
  if !allowed_file(&filename) {
    return err(StatusCode::BAD_REQUEST, "Invalid file type. Only PDF, DOCX, and TXT are allowed.");
  }
  if bytes.len() > state.uploads.max_bytes {
    return err(StatusCode::PAYLOAD_TOO_LARGE, "File too large");
  }

  let saved_filename = format!("{}_{}", Utc::now().timestamp(), secure_filename(&filename));
  let path = state.uploads.dir.join(&saved_filename);
  if let Err(e) = tokio::fs::create_dir_all(&state.uploads.dir).await {
    return err(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to save file: {e}"));
  }
  if let Err(e) = tokio::fs::write(&path, &bytes).await {
    return err(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to save file: {e}"));
  }

  let content = match extract_text(&filename, &bytes) {
    Ok(c) => c,
    Err(e) => return err(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
  };

  let Some(oa) = &state.openai else {
    return err(StatusCode::INTERNAL_SERVER_ERROR, "OpenAI summary request failed: not configured");
  };
  let summary = match oa.summarize(&state.prompts, &content).await {
    Ok(s) => s,
    Err(e) => return err(StatusCode::INTERNAL_SERVER_ERROR, format!("OpenAI summary request failed: {e}")),
  };
  let questions = match oa.generate_quiz(&state.prompts, &summary, DEFAULT_DIFFICULTY).await {
    Ok(q) => q,
    Err(e) => return err(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to generate quiz: {e}")),
  };

  let record = QuizRecord {
    id: Uuid::new_v4(),
    summary: Some(summary.clone()),
    score: None,
    total: None,
    questions: questions.into_iter().map(AttemptedQuestion::from).collect(),
    date: Utc::now(),
  };
  if !state.store.append_quiz(user.id, record.clone()).await {
    return err(StatusCode::UNAUTHORIZED, "Not logged in");
  }

  info!(target: "quiz", user = %user.id, quiz = %record.id, file = %saved_filename, questions = record.questions.len(), "Upload processed into quiz");
  Json(UploadOut { summary, quiz: record }).into_response()
}

// ---- PDF downloads ----

fn pdf_attachment(filename: String, bytes: Vec<u8>) -> Response {
  (
    [
      (header::CONTENT_TYPE, "application/pdf".to_string()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
    ],
    bytes,
  )
    .into_response()
}

#[instrument(level = "info", skip_all, fields(%quiz_id))]
pub async fn http_download_summary(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(quiz_id): Path<String>,
) -> Response {
  let Some(user) = current_user(&state, &headers).await else {
    return err(StatusCode::UNAUTHORIZED, "Unauthorized");
  };
  let Ok(id) = Uuid::parse_str(&quiz_id) else {
    return err(StatusCode::NOT_FOUND, "Quiz not found");
  };
  let Some(record) = state.store.find_quiz(user.id, id).await else {
    return err(StatusCode::NOT_FOUND, "Quiz not found");
  };
  let bytes = render_summary_pdf(record.summary.as_deref().unwrap_or(""));
  pdf_attachment(format!("summary_quiz_{}.pdf", record.id), bytes)
}

#[instrument(level = "info", skip_all, fields(%quiz_id))]
pub async fn http_download_quiz(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(quiz_id): Path<String>,
) -> Response {
  let Some(user) = current_user(&state, &headers).await else {
    return err(StatusCode::UNAUTHORIZED, "Unauthorized");
  };
  let Ok(id) = Uuid::parse_str(&quiz_id) else {
    return err(StatusCode::NOT_FOUND, "Quiz not found");
  };
  let Some(record) = state.store.find_quiz(user.id, id).await else {
    return err(StatusCode::NOT_FOUND, "Quiz not found");
  };
  let bytes = render_quiz_review_pdf(&record);
  pdf_attachment(format!("quiz_review_{}.pdf", record.id), bytes)
}

// ---- Flashcards ----

#[instrument(level = "info", skip_all, fields(summary_len = body.summary.len()))]
pub async fn http_generate_flashcards(
  State(state): State<Arc<AppState>>,
  Json(body): Json<FlashcardsIn>,
) -> Response {
  if body.summary.trim().is_empty() {
    return err(StatusCode::BAD_REQUEST, "No summary provided");
  }
  let Some(oa) = &state.openai else {
    return err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate flashcards");
  };
  match oa.generate_flashcards(&state.prompts, &body.summary).await {
    Ok(flashcards) => Json(FlashcardsOut { flashcards }).into_response(),
    Err(e) => {
      error!(target: "quiz", error = %e, "Flashcards generation failed");
      err(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate flashcards")
    }
  }
}
