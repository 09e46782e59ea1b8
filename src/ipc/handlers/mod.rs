pub mod attendance;
pub mod classes;
pub mod core;
pub mod reports;
pub mod students;
pub mod table;
