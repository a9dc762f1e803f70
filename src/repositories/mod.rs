pub(crate) mod activity_logs;
pub(crate) mod classes;
pub(crate) mod questions;
pub(crate) mod quiz_results;
pub(crate) mod quizzes;
pub(crate) mod reports;
pub(crate) mod roles;
pub(crate) mod students;
pub(crate) mod subjects;
pub(crate) mod teachers;
pub(crate) mod test_results;
pub(crate) mod users;
