pub(crate) mod auth;
pub(crate) mod courses;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod lectures;
pub(crate) mod router;
pub(crate) mod students;
pub(crate) mod validation;
