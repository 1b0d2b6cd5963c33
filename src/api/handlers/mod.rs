pub mod academics;
pub mod backup;
pub mod core;
pub mod courses;
pub mod rewards;
pub mod scores;
pub mod statistics;
pub mod students;
