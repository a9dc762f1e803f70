mod credentials;
mod handlers;
mod import;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::core::{config::Settings, state::AppState};

/// Room for multipart framing and the `entity` field around the roster file.
const IMPORT_FRAMING_BYTES: usize = 64 * 1024;

pub(crate) fn router(settings: &Settings) -> Router<AppState> {
    let max_file = settings.accounts().max_import_size_kb.saturating_mul(1024);
    let import_limit =
        usize::try_from(max_file).unwrap_or(usize::MAX).saturating_add(IMPORT_FRAMING_BYTES);

    Router::new()
        .route("/", get(handlers::overview).post(handlers::create_user))
        .route("/import", post(import::import_roster).layer(DefaultBodyLimit::max(import_limit)))
        .route("/credentials/download", get(credentials::download_credentials))
        .route("/:user_id", patch(handlers::update_user))
        .route("/:user_id/reset-password", post(handlers::reset_password))
        .route("/:user_id/toggle-status", post(handlers::toggle_status))
}

#[cfg(test)]
mod tests;
