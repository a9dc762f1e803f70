pub(crate) mod accounts;
pub(crate) mod credentials;
pub(crate) mod grading;
pub(crate) mod password_reset;
pub(crate) mod quiz_window;
pub(crate) mod roster_import;
