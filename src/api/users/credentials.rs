use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::api::activity;
use crate::api::errors::ApiError;
use crate::api::extract::ApiQuery;
use crate::api::guards::{CurrentAdmin, SessionId};
use crate::core::state::AppState;
use crate::core::time::{file_stamp, primitive_now_utc};
use crate::services::credentials::{render_export, ExportFormat};

#[derive(Debug, Default, Deserialize)]
pub(super) struct DownloadQuery {
    #[serde(default)]
    format: Option<String>,
}

/// Hands out the pending credential list once; the list is emptied by the same read
/// and put back when the download cannot be recorded.
pub(super) async fn download_credentials(
    CurrentAdmin(admin): CurrentAdmin,
    SessionId(session_id): SessionId,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DownloadQuery>,
) -> Result<Response, ApiError> {
    let format = ExportFormat::parse(query.format.as_deref());
    let filename =
        format!("credentials_{}.{}", file_stamp(primitive_now_utc()), format.extension());
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| ApiError::internal(e, "Failed to build download header"))?;

    let mut conn = state
        .db()
        .acquire()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire connection"))?;

    let items = state.sessions().take_credentials(&session_id).await;
    if items.is_empty() {
        return Err(ApiError::NotFound("No credentials to download.".to_string()));
    }

    let recorded = activity::record(
        &mut conn,
        admin.user_id,
        "download_credentials",
        Some(format!("{} credentials as {}", items.len(), format.extension())),
    )
    .await;
    if let Err(err) = recorded {
        state.sessions().push_credentials(&session_id, &items).await;
        return Err(err);
    }

    let body = render_export(format, &items);
    let mut response = (StatusCode::OK, body).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
    response.headers_mut().insert(header::CONTENT_DISPOSITION, disposition);
    response.headers_mut().insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}
