pub(crate) mod activity;
pub(crate) mod auth;
pub(crate) mod classes;
pub(crate) mod dashboards;
pub(crate) mod errors;
pub(crate) mod extract;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod pagination;
pub(crate) mod quizzes;
pub(crate) mod results;
pub(crate) mod roles;
pub(crate) mod router;
pub(crate) mod subjects;
pub(crate) mod users;
pub(crate) mod validation;
