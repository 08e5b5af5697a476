//! HTTP handlers

pub mod health;
pub mod auth;
pub mod students;
pub mod predictions;
pub mod dashboard;
