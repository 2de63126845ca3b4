pub(crate) mod enrollments;
pub(crate) mod exams;
pub(crate) mod grades;
pub(crate) mod lectures;
pub(crate) mod questions;
pub(crate) mod staff;
pub(crate) mod statistics;
