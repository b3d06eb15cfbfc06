//! Application state: the in-memory repository, prompts, upload policy,
//! SMTP settings, and the optional OpenAI client.
//!
//! This module only wires things together; behavior lives in the modules it
//! pulls from. Handlers receive the whole state via axum's `State` extractor.

use crate::config::{load_app_config_from_env, Prompts, UploadPolicy};
use crate::mailer::SmtpSettings;
use crate::openai::OpenAI;
use crate::seeds::seed_users;
use crate::store::MemoryStore;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct AppState {
    pub store: MemoryStore,
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub uploads: UploadPolicy,
    pub smtp: Option<SmtpSettings>,
}

impl AppState {
    /// Build state from env: load config, seed the dev user, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        // Load TOML config if provided (prompt overrides).
        let prompts = load_app_config_from_env()
            .map(|c| c.prompts)
            .unwrap_or_default();

        let store = MemoryStore::with_users(seed_users());

        // Build optional OpenAI client (if API key present).
        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "notes2quiz_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
        } else {
            info!(target: "notes2quiz_backend", "OpenAI disabled (no OPENAI_API_KEY). Generation endpoints will return errors.");
        }

        let uploads = UploadPolicy::from_env();
        info!(target: "notes2quiz_backend", dir = %uploads.dir.display(), max_bytes = uploads.max_bytes, "Upload policy");

        let smtp = SmtpSettings::from_env();
        if smtp.is_none() {
            info!(target: "notes2quiz_backend", "SMTP not configured; welcome emails will be skipped.");
        }

        Self {
            store,
            openai,
            prompts,
            uploads,
            smtp,
        }
    }
}
