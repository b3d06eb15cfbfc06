//! Welcome-mail composition.
//!
//! Actual SMTP delivery sits outside this backend: when the SMTP settings are
//! complete the composed RFC-822 message is spooled to a directory an external
//! relay watches, otherwise the mail is skipped with a log line. Either way a
//! mail problem never fails the signup that triggered it.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const WELCOME_SUBJECT: &str = "Welcome to Notes2Quiz!";
const WELCOME_BODY: &str =
  "Welcome to Notes2Quiz!\n\nYour account is ready. Start uploading your notes and learning smarter!";

/// SMTP relay settings, complete or absent. `from_env` requires every field
/// so a half-configured relay is treated as "not configured".
#[derive(Clone, Debug)]
pub struct SmtpSettings {
  pub server: String,
  pub port: u16,
  pub user: String,
  pub email_from: String,
  pub spool_dir: PathBuf,
}

impl SmtpSettings {
  pub fn from_env() -> Option<Self> {
    let server = std::env::var("SMTP_SERVER").ok()?;
    let port = std::env::var("SMTP_PORT").ok()?.parse::<u16>().ok()?;
    let user = std::env::var("SMTP_USER").ok()?;
    // The password is only checked for presence; the relay reads it itself.
    std::env::var("SMTP_PASS").ok()?;
    let email_from = std::env::var("EMAIL_FROM").ok()?;
    let spool_dir = std::env::var("SMTP_SPOOL_DIR").unwrap_or_else(|_| "outbox".into());
    Some(Self { server, port, user, email_from, spool_dir: PathBuf::from(spool_dir) })
  }
}

/// Compose the welcome message with minimal RFC-822 headers.
pub fn compose_welcome(from: &str, to: &str) -> String {
  format!(
    "From: {from}\r\nTo: {to}\r\nSubject: {WELCOME_SUBJECT}\r\nDate: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{WELCOME_BODY}\r\n",
    Utc::now().to_rfc2822()
  )
}

/// Spool a welcome mail for `to`, or skip when SMTP is not configured.
/// Spool failures are logged and swallowed.
#[instrument(level = "info", skip(settings), fields(to = %to))]
pub fn send_welcome_email(settings: Option<&SmtpSettings>, to: &str) {
  let Some(cfg) = settings else {
    info!(target: "notes2quiz_backend", "SMTP not configured; skipping welcome email.");
    return;
  };

  let message = compose_welcome(&cfg.email_from, to);
  let filename = cfg.spool_dir.join(format!("welcome-{}.eml", Uuid::new_v4()));
  if let Err(e) = std::fs::create_dir_all(&cfg.spool_dir)
    .and_then(|_| std::fs::write(&filename, message))
  {
    warn!(target: "notes2quiz_backend", error = %e, "Error spooling welcome email");
    return;
  }
  info!(
    target: "notes2quiz_backend",
    relay = %format!("{}:{}", cfg.server, cfg.port),
    spool = %filename.display(),
    "Welcome email spooled"
  );
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn welcome_message_has_headers_and_body() {
    let msg = compose_welcome("noreply@example.com", "new@example.com");
    assert!(msg.starts_with("From: noreply@example.com\r\n"));
    assert!(msg.contains("To: new@example.com\r\n"));
    assert!(msg.contains("Subject: Welcome to Notes2Quiz!\r\n"));
    let (headers, body) = msg.split_once("\r\n\r\n").unwrap();
    assert!(headers.contains("Content-Type: text/plain"));
    assert!(body.contains("Your account is ready"));
  }

  #[test]
  fn unconfigured_smtp_is_a_silent_skip() {
    // Must not panic or touch the filesystem.
    send_welcome_email(None, "someone@example.com");
  }
}
