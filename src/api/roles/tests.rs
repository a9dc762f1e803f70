use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::test_support;

#[tokio::test]
async fn admin_manages_custom_roles() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/roles",
            Some(&token),
            Some(json!({"role_name": "Librarian"})),
        ))
        .await
        .expect("create role");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["message"], "created");
    let role_id = created["role_id"].as_i64().expect("role id");
    assert!(role_id > 3);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/admin/roles/{role_id}"),
            Some(&token),
            Some(json!({"role_name": "Library Staff"})),
        ))
        .await
        .expect("rename role");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test_support::read_json(response).await["message"], "updated");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/admin/roles", Some(&token), None))
        .await
        .expect("list roles");
    let roles = test_support::read_json(response).await;
    let names: Vec<&str> =
        roles.as_array().expect("array").iter().filter_map(|r| r["role_name"].as_str()).collect();
    assert_eq!(names, vec!["Admin", "Teacher", "Student", "Library Staff"]);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/admin/roles/{role_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("delete role");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(test_support::read_json(response).await["message"], "deleted");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/admin/roles/{role_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("delete again");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let logged: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_logs WHERE action IN ('create_role', 'update_role', 'delete_role')",
    )
    .fetch_one(ctx.state.db())
    .await
    .expect("activity count");
    assert_eq!(logged, 3);
}

#[tokio::test]
async fn role_validation_and_conflicts() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/roles",
            Some(&token),
            Some(json!({"role_name": "  "})),
        ))
        .await
        .expect("blank role");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test_support::read_json(response).await["error"], "role_name required");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/roles",
            Some(&token),
            Some(json!({"role_name": "Teacher"})),
        ))
        .await
        .expect("duplicate role");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/admin/roles/{}", UserRole::Student.id()),
            Some(&token),
            None,
        ))
        .await
        .expect("delete builtin");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            "/api/v1/admin/roles/999",
            Some(&token),
            Some(json!({"role_name": "Ghost"})),
        ))
        .await
        .expect("update missing");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn roles_in_use_cannot_be_deleted() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());

    let role_id = crate::repositories::roles::create(ctx.state.db(), "Counselor")
        .await
        .expect("create role");
    let user = test_support::insert_user(
        ctx.state.db(),
        "counsel",
        "Counsel",
        UserRole::Student,
        "secret1",
    )
    .await;
    sqlx::query("UPDATE users SET role_id = $1 WHERE user_id = $2")
        .bind(role_id)
        .bind(user.user_id)
        .execute(ctx.state.db())
        .await
        .expect("assign role");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/admin/roles/{role_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("delete in use");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(test_support::read_json(response).await["error"], "role is assigned to users");
}
