pub mod backup;
pub mod core;
pub mod reports;
pub mod session;
pub mod students;
