//! Data models

pub mod user;
pub mod student;
pub mod prediction;

pub use user::*;
pub use student::*;
pub use prediction::*;
