use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use sqlx::PgConnection;
use validator::Validate;

use crate::api::activity;
use crate::api::errors::ApiError;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::guards::{CurrentAdmin, SessionId};
use crate::api::pagination::{PageParams, Paginated};
use crate::core::{metrics, security, state::AppState};
use crate::db::models::User;
use crate::db::types::{UserEntity, UserRole};
use crate::repositories;
use crate::schemas::user::{
    AccountIssuedResponse, StudentResponse, TeacherResponse, ToggleStatusResponse, UserCreate,
    UserResponse, UserUpdate, UsersOverview,
};
use crate::services::accounts::{self, NewAccount, ProvisionError, DEFAULT_FULL_NAME};
use crate::services::credentials::{self, IssuedCredential};

pub(super) fn provision_error(err: ProvisionError) -> ApiError {
    if err.is_user_facing() {
        ApiError::BadRequest(err.to_string())
    } else {
        ApiError::internal(err, "Failed to create account")
    }
}

pub(super) fn parse_entity(raw: &str) -> Result<UserEntity, ApiError> {
    UserEntity::parse(raw)
        .ok_or_else(|| ApiError::BadRequest("entity must be student or teacher".to_string()))
}

pub(super) fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found.".to_string())
}

pub(super) async fn overview(
    CurrentAdmin(_admin): CurrentAdmin,
    SessionId(session_id): SessionId,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<UsersOverview>, ApiError> {
    let db = state.db();

    let student_total = repositories::students::count(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count students"))?;
    let students = repositories::students::list_page(db, params.limit(), params.offset())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list students"))?;

    let teacher_total = repositories::teachers::count(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count teachers"))?;
    let teachers = repositories::teachers::list_page(db, params.limit(), params.offset())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list teachers"))?;

    let available_classes = repositories::classes::list_available(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list available classes"))?;
    let active_subjects = repositories::subjects::list_active(db)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list active subjects"))?;

    Ok(Json(UsersOverview {
        students: Paginated::new(students, &params, student_total).map(StudentResponse::from),
        teachers: Paginated::new(teachers, &params, teacher_total).map(TeacherResponse::from),
        available_classes,
        active_subjects,
        creds_available: state.sessions().has_credentials(&session_id).await,
    }))
}

pub(super) async fn create_user(
    CurrentAdmin(admin): CurrentAdmin,
    SessionId(session_id): SessionId,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserCreate>,
) -> Result<(StatusCode, Json<AccountIssuedResponse>), ApiError> {
    payload.validate().map_err(ApiError::InvalidFields)?;
    let entity = parse_entity(&payload.entity)?;

    let account = NewAccount {
        entity,
        full_name: accounts::non_blank(payload.full_name.as_deref())
            .unwrap_or_else(|| DEFAULT_FULL_NAME.to_string()),
        email: accounts::non_blank(payload.email.as_deref()),
        phone: accounts::non_blank(payload.phone.as_deref()),
        gender: accounts::non_blank(payload.gender.as_deref()),
        class_id: payload.class_id,
        subject_id: payload.subject_id,
    };

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let provisioned =
        accounts::provision(&mut tx, account, state.settings().accounts().temp_password_length)
            .await
            .map_err(provision_error)?;
    activity::record(
        &mut tx,
        admin.user_id,
        "create_user",
        Some(format!("{} {}", entity.as_str(), provisioned.user.username)),
    )
    .await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    state.sessions().push_credentials(&session_id, &[provisioned.credential]).await;
    metrics::record_credentials_issued("create_user", 1);
    tracing::info!(
        user_id = provisioned.user.user_id,
        entity = entity.as_str(),
        action = "create_user",
        "Account provisioned"
    );

    Ok((
        StatusCode::CREATED,
        Json(AccountIssuedResponse {
            ok: true,
            message: format!(
                "{} account created. Credentials added to the one-time list.",
                capitalize(entity.as_str())
            ),
            user: UserResponse::from_db(provisioned.user),
            creds_available: true,
        }),
    ))
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

async fn load_user(conn: &mut PgConnection, user_id: i64) -> Result<User, ApiError> {
    repositories::users::find_by_id(&mut *conn, user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or_else(user_not_found)
}

/// Moves a student into `class_id`, creating the student row when it is missing.
async fn assign_class(
    conn: &mut PgConnection,
    user_id: i64,
    class_id: i64,
) -> Result<(), ApiError> {
    let current = repositories::students::find_by_user_id(&mut *conn, user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load student"))?;
    if current.as_ref().and_then(|student| student.class_id) == Some(class_id) {
        return Ok(());
    }

    accounts::ensure_class_has_room(&mut *conn, class_id).await.map_err(provision_error)?;

    if current.is_some() {
        repositories::students::set_class(&mut *conn, user_id, class_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update class"))?;
    } else {
        repositories::students::create(&mut *conn, user_id, Some(class_id))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to create student profile"))?;
    }
    Ok(())
}

async fn assign_subject(
    conn: &mut PgConnection,
    user_id: i64,
    subject_id: i64,
) -> Result<(), ApiError> {
    accounts::ensure_subject_exists(&mut *conn, subject_id).await.map_err(provision_error)?;

    let updated = repositories::teachers::set_subject(&mut *conn, user_id, subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update subject"))?;
    if updated == 0 {
        repositories::teachers::create(&mut *conn, user_id, Some(subject_id))
            .await
            .map_err(|e| ApiError::internal(e, "Failed to create teacher profile"))?;
    }
    Ok(())
}

pub(super) async fn update_user(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(ApiError::InvalidFields)?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let user = load_user(&mut tx, user_id).await?;

    let full_name = accounts::non_blank(payload.full_name.as_deref());
    let email = accounts::non_blank(payload.email.as_deref());
    let phone = accounts::non_blank(payload.phone.as_deref());
    let gender = accounts::non_blank(payload.gender.as_deref());
    repositories::users::update_profile(
        &mut *tx,
        user.user_id,
        repositories::users::UpdateProfile {
            full_name: full_name.as_deref(),
            email: email.as_deref(),
            phone: phone.as_deref(),
            gender: gender.as_deref(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))?;

    match (user.role(), payload.class_id, payload.subject_id) {
        (Some(UserRole::Student), Some(class_id), _) => {
            assign_class(&mut tx, user.user_id, class_id).await?;
        }
        (Some(UserRole::Teacher), _, Some(subject_id)) => {
            assign_subject(&mut tx, user.user_id, subject_id).await?;
        }
        _ => {}
    }

    activity::record(&mut tx, admin.user_id, "update_user", Some(format!("user {}", user.username)))
        .await?;
    let updated = load_user(&mut tx, user.user_id).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(UserResponse::from_db(updated)))
}

pub(super) async fn reset_password(
    CurrentAdmin(admin): CurrentAdmin,
    SessionId(session_id): SessionId,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<AccountIssuedResponse>, ApiError> {
    let temp_password =
        credentials::generate_temp_password(state.settings().accounts().temp_password_length);
    let password_hash = security::hash_password(&temp_password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let mut user = load_user(&mut tx, user_id).await?;
    repositories::users::set_password(&mut *tx, user.user_id, &password_hash, true)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to reset password"))?;
    activity::record(
        &mut tx,
        admin.user_id,
        "reset_password",
        Some(format!("user {}", user.username)),
    )
    .await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    let credential = IssuedCredential {
        full_name: user.full_name.clone().unwrap_or_default(),
        email: user.email.clone().unwrap_or_default(),
        username: user.username.clone(),
        password: temp_password,
    };
    state.sessions().push_credentials(&session_id, &[credential]).await;
    metrics::record_credentials_issued("reset_password", 1);

    user.force_password_change = true;
    Ok(Json(AccountIssuedResponse {
        ok: true,
        message: "Temporary password generated. Download it now; it won't be shown again."
            .to_string(),
        user: UserResponse::from_db(user),
        creds_available: true,
    }))
}

pub(super) async fn toggle_status(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<ToggleStatusResponse>, ApiError> {
    if user_id == admin.user_id {
        return Err(ApiError::BadRequest("You cannot deactivate your own account.".to_string()));
    }

    let mut tx =
        state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let is_active = repositories::users::toggle_active(&mut *tx, user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update user status"))?
        .ok_or_else(user_not_found)?;
    let action = if is_active { "activate_user" } else { "deactivate_user" };
    activity::record(&mut tx, admin.user_id, action, Some(format!("user {user_id}"))).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(ToggleStatusResponse { ok: true, user_id, is_active }))
}
