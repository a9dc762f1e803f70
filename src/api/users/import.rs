use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};

use crate::api::activity;
use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, SessionId};
use crate::core::{metrics, state::AppState};
use crate::db::types::UserEntity;
use crate::schemas::user::ImportResponse;
use crate::services::accounts::{self, NewAccount};
use crate::services::roster_import::{self, RosterRow};

use super::handlers::{parse_entity, provision_error};

struct RosterUpload {
    entity: Option<String>,
    filename: Option<String>,
    bytes: Option<Vec<u8>>,
}

async fn read_upload(mut multipart: Multipart, max_bytes: u64) -> Result<RosterUpload, ApiError> {
    let mut upload = RosterUpload { entity: None, filename: None, bytes: None };

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                upload.filename = field.file_name().map(str::to_string);
                let mut bytes = Vec::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
                {
                    if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                        return Err(ApiError::BadRequest(format!(
                            "File size exceeds {} KB limit",
                            max_bytes / 1024
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                upload.bytes = Some(bytes);
            }
            "entity" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Invalid entity field".to_string()))?;
                upload.entity = Some(text);
            }
            _ => {}
        }
    }

    Ok(upload)
}

fn row_account(entity: UserEntity, row: RosterRow) -> NewAccount {
    NewAccount {
        entity,
        full_name: row.full_name,
        email: row.email,
        phone: row.phone,
        gender: row.gender,
        class_id: row.class_id,
        subject_id: row.subject_id,
    }
}

/// All rows commit together; the first bad row aborts the import with its line number.
pub(super) async fn import_roster(
    CurrentAdmin(admin): CurrentAdmin,
    SessionId(session_id): SessionId,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportResponse>, ApiError> {
    let multipart = multipart.map_err(|_| {
        ApiError::BadRequest("Please select a CSV file and entity type.".to_string())
    })?;
    let limits = state.settings().accounts();
    let upload = read_upload(multipart, limits.max_import_size_kb.saturating_mul(1024)).await?;

    let (Some(bytes), Some(entity)) = (upload.bytes, upload.entity.as_deref()) else {
        return Err(ApiError::BadRequest("Please select a CSV file and entity type.".to_string()));
    };
    let entity = parse_entity(entity)?;

    let filename = upload.filename.unwrap_or_default().to_ascii_lowercase();
    if !filename.ends_with(".csv") {
        return Err(ApiError::BadRequest("Only CSV files are supported in this build.".to_string()));
    }

    let rows = roster_import::parse_roster(&bytes, limits.max_import_rows)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let mut issued = Vec::with_capacity(rows.len());
    for row in rows {
        let line = row.line;
        let provisioned =
            accounts::provision(&mut tx, row_account(entity, row), limits.temp_password_length)
                .await
                .map_err(|err| match provision_error(err) {
                    ApiError::BadRequest(message) => {
                        ApiError::BadRequest(format!("Line {line}: {message}"))
                    }
                    other => other,
                })?;
        issued.push(provisioned.credential);
    }
    let imported = issued.len();
    activity::record(
        &mut tx,
        admin.user_id,
        "import_users",
        Some(format!("{imported} {}s from {filename}", entity.as_str())),
    )
    .await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    state.sessions().push_credentials(&session_id, &issued).await;
    metrics::record_credentials_issued("import", imported);
    tracing::info!(imported, entity = entity.as_str(), action = "import_users", "Roster imported");

    Ok(Json(ImportResponse {
        ok: true,
        message: format!("Imported {imported} {}s and generated credentials.", entity.as_str()),
        imported,
        creds_available: state.sessions().has_credentials(&session_id).await,
    }))
}
