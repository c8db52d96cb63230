//! Typed client for the student-records HTTP API.

mod client;
mod models;

pub use client::ApiClient;
pub use models::{Exam, Fee, LoginRecord, Student, StudentDraft};
