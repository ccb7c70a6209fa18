pub(crate) mod courses;
pub(crate) mod enrollments;
pub(crate) mod lectures;
pub(crate) mod progress;
pub(crate) mod users;
