use axum::http::{header, Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn created_student_credentials_download_once() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());
    let class = test_support::insert_class(ctx.state.db(), "9A", "9", Some(30)).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/users",
            Some(&token),
            Some(json!({
                "entity": "student",
                "full_name": "Alice Smith",
                "email": "alice@example.com",
                "class_id": class.class_id
            })),
        ))
        .await
        .expect("create user");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["user"]["username"], "alice");
    assert_eq!(created["user"]["role"], "student");
    assert_eq!(created["user"]["force_password_change"], true);
    assert_eq!(created["creds_available"], true);

    let user_id = created["user"]["user_id"].as_i64().expect("user id");
    let student = repositories::students::find_by_user_id(ctx.state.db(), user_id)
        .await
        .expect("query")
        .expect("student row");
    assert_eq!(student.class_id, Some(class.class_id));

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/users/credentials/download?format=csv",
            Some(&token),
            None,
        ))
        .await
        .expect("download");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    let disposition =
        response.headers()[header::CONTENT_DISPOSITION].to_str().expect("disposition").to_string();
    assert!(disposition.starts_with("attachment; filename=\"credentials_"), "{disposition}");
    assert!(disposition.ends_with(".csv\""), "{disposition}");
    let body = test_support::read_text(response).await;
    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("Full Name,Email,Username,Temporary Password"));
    let row = lines.next().expect("credential row");
    assert!(row.starts_with("Alice Smith,alice@example.com,alice,"), "{row}");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/users/credentials/download",
            Some(&token),
            None,
        ))
        .await
        .expect("download again");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(test_support::read_json(response).await["error"], "No credentials to download.");
}

#[tokio::test]
async fn usernames_get_numeric_suffixes_and_full_classes_are_rejected() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());
    let class = test_support::insert_class(ctx.state.db(), "9B", "9", Some(1)).await;
    test_support::insert_user(ctx.state.db(), "Bora", "Bora Existing", UserRole::Student, "secret1")
        .await;

    let create = |body: serde_json::Value| {
        test_support::json_request(Method::POST, "/api/v1/admin/users", Some(&token), Some(body))
    };

    let response = ctx
        .app
        .clone()
        .oneshot(create(json!({
            "entity": "student",
            "full_name": "Bora Kim",
            "class_id": class.class_id
        })))
        .await
        .expect("create first");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(test_support::read_json(response).await["user"]["username"], "bora2");

    let response = ctx
        .app
        .clone()
        .oneshot(create(json!({
            "entity": "student",
            "full_name": "Chan Dara",
            "class_id": class.class_id
        })))
        .await
        .expect("create into full class");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        test_support::read_json(response).await["error"],
        format!("Class {} is full.", class.class_id)
    );
    assert!(repositories::users::find_by_username(ctx.state.db(), "chan")
        .await
        .expect("query")
        .is_none());

    let response = ctx
        .app
        .clone()
        .oneshot(create(json!({"entity": "teacher"})))
        .await
        .expect("create teacher without name");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = test_support::read_json(response).await;
    assert_eq!(body["user"]["username"], "new");
    assert_eq!(body["user"]["full_name"], "New User");

    let response = ctx
        .app
        .oneshot(create(json!({"entity": "parent"})))
        .await
        .expect("unknown entity");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_updates_profile_and_class() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());
    let from = test_support::insert_class(ctx.state.db(), "10A", "10", None).await;
    let to = test_support::insert_class(ctx.state.db(), "10B", "10", None).await;
    let (student, _) =
        test_support::insert_student(ctx.state.db(), "sreypov", "Srey Pov", Some(from.class_id))
            .await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/admin/users/{}", student.user_id),
            Some(&token),
            Some(json!({
                "full_name": "Srey Pov Chea",
                "email": "   ",
                "phone": "012 345 678",
                "class_id": to.class_id
            })),
        ))
        .await
        .expect("update user");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["full_name"], "Srey Pov Chea");
    assert_eq!(body["phone"], "012 345 678");
    assert!(body["email"].is_null());

    let row = repositories::students::find_by_user_id(ctx.state.db(), student.user_id)
        .await
        .expect("query")
        .expect("student");
    assert_eq!(row.class_id, Some(to.class_id));
}

#[tokio::test]
async fn reset_password_and_toggle_status() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());
    let (teacher, _) = test_support::insert_teacher(ctx.state.db(), "mrkeo", None).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/admin/users/{}/reset-password", teacher.user_id),
            Some(&token),
            None,
        ))
        .await
        .expect("reset password");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test_support::read_json(response).await["user"]["force_password_change"], true);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/users/credentials/download?format=txt",
            Some(&token),
            None,
        ))
        .await
        .expect("download txt");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_text(response).await;
    assert!(body.starts_with("Full Name, Email, Username, Temporary Password\n"));
    assert!(body.contains(", mrkeo, "), "{body}");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/admin/users/{}/toggle-status", admin.user_id),
            Some(&token),
            None,
        ))
        .await
        .expect("toggle self");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/admin/users/{}/toggle-status", teacher.user_id),
            Some(&token),
            None,
        ))
        .await
        .expect("toggle teacher");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test_support::read_json(response).await["is_active"], false);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/admin/users/{}/toggle-status", teacher.user_id),
            Some(&token),
            None,
        ))
        .await
        .expect("toggle teacher back");
    assert_eq!(test_support::read_json(response).await["is_active"], true);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/users/9999/toggle-status",
            Some(&token),
            None,
        ))
        .await
        .expect("toggle missing");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn roster_import_creates_accounts_in_one_transaction() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());
    let class = test_support::insert_class(ctx.state.db(), "11A", "11", None).await;

    let csv = format!(
        "full_name,email,class_id\nDara Chan,dara@example.com,{0}\n\"Lim, Sophea\",,{0}\n",
        class.class_id
    );
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            "/api/v1/admin/users/import",
            &token,
            &[("entity", "student")],
            Some(("roster.CSV", csv.as_bytes())),
        ))
        .await
        .expect("import");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["message"], "Imported 2 students and generated credentials.");
    assert_eq!(body["imported"], 2);
    assert_eq!(body["creds_available"], true);

    let enrolled = repositories::students::count_in_class(ctx.state.db(), class.class_id)
        .await
        .expect("count");
    assert_eq!(enrolled, 2);

    let bad = "name,class_id\nGood Row,\nBad Row,99999\n";
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            "/api/v1/admin/users/import",
            &token,
            &[("entity", "student")],
            Some(("more.csv", bad.as_bytes())),
        ))
        .await
        .expect("import bad rows");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        test_support::read_json(response).await["error"],
        "Line 3: Class 99999 does not exist."
    );
    assert_eq!(repositories::students::count(ctx.state.db()).await.expect("count"), 2);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            "/api/v1/admin/users/import",
            &token,
            &[("entity", "student")],
            Some(("roster.xlsx", b"binary")),
        ))
        .await
        .expect("import xlsx");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        test_support::read_json(response).await["error"],
        "Only CSV files are supported in this build."
    );

    let response = ctx
        .app
        .oneshot(test_support::multipart_request(
            "/api/v1/admin/users/import",
            &token,
            &[],
            Some(("roster.csv", csv.as_bytes())),
        ))
        .await
        .expect("import without entity");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn overview_lists_people_and_options() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());
    let class = test_support::insert_class(ctx.state.db(), "12A", "12", None).await;
    let subject = test_support::insert_subject(ctx.state.db(), "Chemistry").await;
    test_support::insert_student(ctx.state.db(), "kunthea", "Kunthea", Some(class.class_id)).await;
    test_support::insert_teacher(ctx.state.db(), "mrsok", Some(subject.subject_id)).await;

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/admin/users", Some(&token), None))
        .await
        .expect("overview");
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_json(response).await;
    assert_eq!(body["students"]["total"], 1);
    assert_eq!(body["students"]["items"][0]["class_name"], "12A");
    assert_eq!(body["teachers"]["items"][0]["subject_name"], "Chemistry");
    assert_eq!(body["available_classes"][0]["class_id"], class.class_id);
    assert_eq!(body["active_subjects"][0]["subject_name"], "Chemistry");
    assert_eq!(body["creds_available"], false);
}

#[tokio::test]
async fn roster_upload_limit_follows_import_size_setting() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());

    std::env::set_var("MAX_IMPORT_SIZE_KB", "3072");
    let settings = crate::core::config::Settings::load().expect("settings");
    std::env::remove_var("MAX_IMPORT_SIZE_KB");
    let state = crate::core::state::AppState::new(
        settings,
        ctx.state.db().clone(),
        ctx.state.redis().clone(),
    );
    let app = crate::api::router::router(state);

    // Larger than axum's default 2 MB body limit, inside the configured 3 MB.
    let mut csv = String::from("full_name\nBig Roster\n");
    csv.push_str(&"\n".repeat(2_500_000));
    let response = app
        .clone()
        .oneshot(test_support::multipart_request(
            "/api/v1/admin/users/import",
            &token,
            &[("entity", "student")],
            Some(("big.csv", csv.as_bytes())),
        ))
        .await
        .expect("import large roster");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["imported"], 1);

    // Over the file limit but still within the request body limit.
    csv.push_str(&"\n".repeat(660_000));
    let response = app
        .oneshot(test_support::multipart_request(
            "/api/v1/admin/users/import",
            &token,
            &[("entity", "student")],
            Some(("bigger.csv", csv.as_bytes())),
        ))
        .await
        .expect("import oversized roster");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        test_support::read_json(response).await["error"],
        "File size exceeds 3072 KB limit"
    );
}

async fn download_credentials_csv(app: &axum::Router, token: &str) -> axum::response::Response {
    app.clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/users/credentials/download?format=csv",
            Some(token),
            None,
        ))
        .await
        .expect("download")
}

#[tokio::test]
async fn short_first_names_get_usernames_that_can_log_in() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/users",
            Some(&token),
            Some(json!({"entity": "student", "full_name": "Ly Sokha"})),
        ))
        .await
        .expect("create user");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(test_support::read_json(response).await["user"]["username"], "ly0");

    let response = download_credentials_csv(&ctx.app, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_text(response).await;
    let row = body.lines().nth(1).expect("credential row");
    let fields: Vec<&str> = row.split(',').collect();
    assert_eq!(fields[..3], ["Ly Sokha", "", "ly0"]);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"username": fields[2], "password": fields[3]})),
        ))
        .await
        .expect("login");
    let status = response.status();
    let login = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {login}");
    assert_eq!(login["must_change_password"], true);
}

#[tokio::test]
async fn failed_download_keeps_pending_credentials() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/users",
            Some(&token),
            Some(json!({"entity": "teacher", "full_name": "Sok Chea"})),
        ))
        .await
        .expect("create user");
    assert_eq!(response.status(), StatusCode::CREATED);

    // Audit insert fails while the table is renamed.
    sqlx::query("ALTER TABLE activity_logs RENAME TO activity_logs_offline")
        .execute(ctx.state.db())
        .await
        .expect("rename away");
    let response = download_credentials_csv(&ctx.app, &token).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    sqlx::query("ALTER TABLE activity_logs_offline RENAME TO activity_logs")
        .execute(ctx.state.db())
        .await
        .expect("rename back");
    let response = download_credentials_csv(&ctx.app, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = test_support::read_text(response).await;
    assert!(body.lines().any(|line| line.starts_with("Sok Chea,,sok,")), "{body}");
}
