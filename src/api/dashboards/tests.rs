use std::collections::HashMap;

use axum::http::{Method, StatusCode};
use time::macros::date;
use time::Duration;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::test_support;

async fn record_test_result(
    pool: &sqlx::PgPool,
    student_id: i64,
    subject_id: i64,
    recorded_by: i64,
    score: f64,
    term: Option<&str>,
) {
    let percentage = crate::services::grading::percentage(score, 100.0);
    repositories::test_results::create(
        pool,
        repositories::test_results::NewTestResult {
            student_id,
            subject_id,
            test_name: "Midterm",
            score,
            max_score: 100.0,
            percentage,
            grade: crate::services::grading::letter_grade(percentage),
            term,
            remarks: None,
            test_date: date!(2025 - 02 - 14),
            recorded_by,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .expect("insert test result");
}

async fn get(ctx: &test_support::TestContext, uri: &str, token: &str) -> serde_json::Value {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, uri, Some(token), None))
        .await
        .expect("request");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "{uri}: {body}");
    body
}

#[tokio::test]
async fn admin_dashboard_counts_active_classes_and_all_results() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let admin = test_support::insert_admin(pool, "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());

    let class = test_support::insert_class(pool, "7A", "7", None).await;
    let closed = test_support::insert_class(pool, "7B", "7", None).await;
    repositories::classes::set_active(pool, closed.class_id, false).await.expect("deactivate");
    let subject = test_support::insert_subject(pool, "Math").await;
    let (_, student) =
        test_support::insert_student(pool, "vanna", "Vanna Ly", Some(class.class_id)).await;
    let (teacher, _) = test_support::insert_teacher(pool, "mrlim", Some(subject.subject_id)).await;
    record_test_result(pool, student.student_id, subject.subject_id, teacher.user_id, 95.0, None)
        .await;
    let now = primitive_now_utc();
    repositories::activity_logs::record(pool, Some(admin.user_id), "login", None, now)
        .await
        .expect("log");

    let body = get(&ctx, "/api/v1/admin/dashboard", &token).await;
    assert_eq!(body["totals"]["students"], 1);
    assert_eq!(body["totals"]["teachers"], 1);
    assert_eq!(body["totals"]["classes"], 1);
    assert_eq!(body["totals"]["subjects"], 1);
    assert_eq!(body["totals"]["quizzes"], 0);
    assert_eq!(body["totals"]["results"], 1);
    assert_eq!(body["recent_activity"][0]["action"], "login");
    assert_eq!(body["recent_activity"][0]["username"], "principal");

    let charts = get(&ctx, "/api/v1/admin/dashboard/charts", &token).await;
    assert_eq!(charts["students_per_class"]["labels"], serde_json::json!(["7A"]));
    assert_eq!(charts["students_per_class"]["values"], serde_json::json!([1]));
    assert_eq!(charts["grade_distribution"]["labels"], serde_json::json!(["A"]));
    assert_eq!(charts["monthly_signups"]["values"][0], 3);
}

#[tokio::test]
async fn admin_report_filters_by_class_name_and_term() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let admin = test_support::insert_admin(pool, "principal").await;
    let token = test_support::bearer_token(admin.user_id, ctx.state.settings());

    let seven = test_support::insert_class(pool, "7A", "7", None).await;
    let eight = test_support::insert_class(pool, "8A", "8", None).await;
    let subject = test_support::insert_subject(pool, "Science").await;
    let (_, first) = test_support::insert_student(pool, "dara", "Dara", Some(seven.class_id)).await;
    let (_, second) =
        test_support::insert_student(pool, "nita", "Nita", Some(seven.class_id)).await;
    let (_, other) = test_support::insert_student(pool, "rith", "Rith", Some(eight.class_id)).await;

    record_test_result(pool, first.student_id, subject.subject_id, admin.user_id, 92.0, Some("T1"))
        .await;
    record_test_result(pool, second.student_id, subject.subject_id, admin.user_id, 40.0, Some("T1"))
        .await;
    record_test_result(pool, first.student_id, subject.subject_id, admin.user_id, 70.0, Some("T2"))
        .await;
    record_test_result(pool, other.student_id, subject.subject_id, admin.user_id, 88.0, Some("T1"))
        .await;

    let body = get(&ctx, "/api/v1/admin/report?class=7A&term=T1&grade=", &token).await;
    assert_eq!(body["filters"]["class"], "7A");
    assert!(body["filters"]["grade"].is_null());
    assert_eq!(body["stats"]["total_results"], 2);
    assert_eq!(body["stats"]["total_students"], 2);
    assert_eq!(body["stats"]["pass_rate"], 50.0);
    assert_eq!(body["stats"]["average_score"], 66.0);
    assert_eq!(body["stats"]["top_performers"], 1);
    assert_eq!(body["stats"]["need_support"], 1);
    assert_eq!(body["results"]["total"], 2);
    assert_eq!(body["options"]["grade_levels"], serde_json::json!(["7", "8"]));

    let rows = body["results"]["items"].as_array().expect("rows");
    let failing = rows.iter().find(|row| row["student_name"] == "Nita").expect("nita row");
    assert_eq!(failing["student_code"], format!("#STU{:03}", second.student_id));
    assert_eq!(failing["grade"], "F");
    assert_eq!(failing["status"], "Needs Support");
    assert_eq!(failing["source"], "test");
    assert_eq!(failing["date"], "2025-02-14");

    let everything = get(&ctx, "/api/v1/admin/report?per_page=2&page=2", &token).await;
    assert_eq!(everything["stats"]["total_results"], 4);
    assert_eq!(everything["results"]["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(everything["results"]["has_prev"], true);
}

#[tokio::test]
async fn teacher_dashboard_counts_quiz_statuses_and_results() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let class = test_support::insert_class(pool, "9A", "9", None).await;
    let subject = test_support::insert_subject(pool, "History").await;
    let (teacher, _) = test_support::insert_teacher(pool, "mrsok", Some(subject.subject_id)).await;
    let (other_teacher, _) = test_support::insert_teacher(pool, "mrkim", None).await;
    let (_, student) =
        test_support::insert_student(pool, "sophal", "Sophal", Some(class.class_id)).await;
    let token = test_support::bearer_token(teacher.user_id, ctx.state.settings());

    let now = primitive_now_utc();
    let (live, _) = test_support::insert_quiz(
        pool,
        teacher.user_id,
        class.class_id,
        subject.subject_id,
        now - Duration::hours(1),
        now + Duration::hours(1),
    )
    .await;
    test_support::insert_quiz(
        pool,
        teacher.user_id,
        class.class_id,
        subject.subject_id,
        now + Duration::days(1),
        now + Duration::days(2),
    )
    .await;
    test_support::insert_quiz(
        pool,
        other_teacher.user_id,
        class.class_id,
        subject.subject_id,
        now - Duration::days(2),
        now - Duration::days(1),
    )
    .await;

    repositories::quiz_results::create(
        pool,
        repositories::quiz_results::NewQuizResult {
            quiz_id: live.quiz_id,
            student_id: student.student_id,
            score: 1,
            total_questions: 2,
            percentage: 50.0,
            grade: "F",
            answers: HashMap::new(),
            submitted_at: now,
        },
    )
    .await
    .expect("insert result");

    let body = get(&ctx, "/api/v1/teacher/dashboard", &token).await;
    assert_eq!(body["subject"]["subject_name"], "History");
    assert_eq!(body["quizzes"]["total"], 2);
    assert_eq!(body["quizzes"]["live"], 1);
    assert_eq!(body["quizzes"]["upcoming"], 1);
    assert_eq!(body["quizzes"]["finished"], 0);
    assert_eq!(body["students_with_results"], 1);
    assert_eq!(body["recent_results"][0]["student_name"], "Sophal");

    let report = get(&ctx, "/api/v1/teacher/report", &token).await;
    assert_eq!(report["stats"]["total_results"], 1);
    assert_eq!(report["results"]["items"][0]["source"], "quiz");
    assert_eq!(report["results"]["items"][0]["max_score"], 2.0);

    let students_uri = format!("/api/v1/teacher/students?class_id={}", class.class_id);
    let students = get(&ctx, &students_uri, &token).await;
    assert_eq!(students.as_array().map(Vec::len), Some(1));
    let none = get(&ctx, "/api/v1/teacher/students?class_id=999", &token).await;
    assert_eq!(none.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn student_dashboard_shows_class_quizzes_and_submissions() {
    let ctx = test_support::setup_test_context().await;
    let pool = ctx.state.db();
    let class = test_support::insert_class(pool, "10C", "10", None).await;
    let other_class = test_support::insert_class(pool, "10D", "10", None).await;
    let subject = test_support::insert_subject(pool, "English").await;
    let (teacher, _) = test_support::insert_teacher(pool, "mschan", Some(subject.subject_id)).await;
    let (user, student) =
        test_support::insert_student(pool, "bopha", "Bopha", Some(class.class_id)).await;
    let token = test_support::bearer_token(user.user_id, ctx.state.settings());

    let now = primitive_now_utc();
    let (done, _) = test_support::insert_quiz(
        pool,
        teacher.user_id,
        class.class_id,
        subject.subject_id,
        now - Duration::days(2),
        now - Duration::days(1),
    )
    .await;
    test_support::insert_quiz(
        pool,
        teacher.user_id,
        other_class.class_id,
        subject.subject_id,
        now - Duration::hours(1),
        now + Duration::hours(1),
    )
    .await;
    repositories::quiz_results::create(
        pool,
        repositories::quiz_results::NewQuizResult {
            quiz_id: done.quiz_id,
            student_id: student.student_id,
            score: 2,
            total_questions: 2,
            percentage: 100.0,
            grade: "A",
            answers: HashMap::new(),
            submitted_at: now - Duration::days(1),
        },
    )
    .await
    .expect("insert result");

    let body = get(&ctx, "/api/v1/student/dashboard", &token).await;
    assert_eq!(body["class"]["class_name"], "10C");
    let quizzes = body["quizzes"].as_array().expect("quizzes");
    assert_eq!(quizzes.len(), 1);
    assert_eq!(quizzes[0]["quiz"]["status"], "finished");
    assert_eq!(quizzes[0]["submitted"], true);
    assert_eq!(body["average_percentage"], 100.0);
    assert_eq!(body["recent_results"][0]["grade"], "A");

    let report = get(&ctx, "/api/v1/student/report", &token).await;
    assert_eq!(report["stats"]["total_results"], 1);
    assert_eq!(report["stats"]["pass_rate"], 100.0);
}

#[tokio::test]
async fn self_registered_student_gets_empty_dashboard() {
    let ctx = test_support::setup_test_context().await;
    let user = test_support::insert_user(
        ctx.state.db(),
        "newkid",
        "New User",
        crate::db::types::UserRole::Student,
        "secret1",
    )
    .await;
    let token = test_support::bearer_token(user.user_id, ctx.state.settings());

    let body = get(&ctx, "/api/v1/student/dashboard", &token).await;
    assert!(body["class"].is_null());
    assert_eq!(body["quizzes"], serde_json::json!([]));

    let report = get(&ctx, "/api/v1/student/report", &token).await;
    assert_eq!(report["stats"]["total_results"], 0);
    assert_eq!(report["results"]["total"], 0);
}

#[tokio::test]
async fn dashboards_are_role_gated() {
    let ctx = test_support::setup_test_context().await;
    let (teacher, _) = test_support::insert_teacher(ctx.state.db(), "mrsok", None).await;
    let token = test_support::bearer_token(teacher.user_id, ctx.state.settings());

    for uri in ["/api/v1/admin/dashboard", "/api/v1/student/dashboard", "/api/v1/admin/report"] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(Method::GET, uri, Some(&token), None))
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}
