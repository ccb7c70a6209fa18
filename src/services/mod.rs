pub(crate) mod ordering;
pub(crate) mod progress;
