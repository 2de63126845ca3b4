pub mod access;
pub mod error;
pub mod exam_aggregate;
pub mod grading;
pub mod statistics;
