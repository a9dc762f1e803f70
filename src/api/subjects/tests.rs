use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support;

#[tokio::test]
async fn admin_manages_subjects() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/subjects",
            Some(&token),
            Some(json!({"subject_name": "Physics", "description": "   "})),
        ))
        .await
        .expect("create subject");
    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert!(created["description"].is_null());
    let subject_id = created["subject_id"].as_i64().expect("subject id");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/admin/subjects/{subject_id}"),
            Some(&token),
            Some(json!({"subjectName": "Applied Physics", "description": "Labs"})),
        ))
        .await
        .expect("update subject");
    assert_eq!(response.status(), StatusCode::OK);
    let updated = test_support::read_json(response).await;
    assert_eq!(updated["subject_name"], "Applied Physics");
    assert_eq!(updated["description"], "Labs");

    test_support::insert_subject(ctx.state.db(), "Biology").await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/admin/subjects/{subject_id}/deactivate"),
            Some(&token),
            None,
        ))
        .await
        .expect("deactivate");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/subjects/active",
            Some(&token),
            None,
        ))
        .await
        .expect("active subjects");
    let active = test_support::read_json(response).await;
    let names: Vec<&str> = active
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|s| s["subject_name"].as_str())
        .collect();
    assert_eq!(names, vec!["Biology"]);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/admin/subjects",
            Some(&token),
            None,
        ))
        .await
        .expect("list subjects");
    let page = test_support::read_json(response).await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"][0]["subject_name"], "Biology");
}

#[tokio::test]
async fn subject_name_is_required() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_admin(ctx.state.db(), "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/admin/subjects",
            Some(&token),
            Some(json!({"description": "no name"})),
        ))
        .await
        .expect("create subject");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test_support::read_json(response).await["error"], "subject_name is required");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            "/api/v1/admin/subjects/77",
            Some(&token),
            Some(json!({"subject_name": "Ghost"})),
        ))
        .await
        .expect("update missing");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
