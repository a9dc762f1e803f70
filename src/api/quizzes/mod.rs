mod helpers;
mod student;
mod teacher;

use axum::{
    routing::{get, post},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn teacher_router() -> Router<AppState> {
    Router::new()
        .route("/", get(teacher::list_quizzes).post(teacher::create_quiz))
        .route("/:quiz_id", get(teacher::get_quiz).put(teacher::update_quiz))
        .route("/:quiz_id/toggle-status", post(teacher::toggle_quiz))
        .route("/:quiz_id/results", get(teacher::quiz_results))
}

pub(crate) fn student_router() -> Router<AppState> {
    Router::new()
        .route("/", get(student::list_quizzes))
        .route("/:quiz_id", get(student::open_quiz))
        .route("/:quiz_id/submit", post(student::submit_quiz))
}
