pub mod report;
pub mod signal;
pub mod tick;
