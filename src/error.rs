//! Client error taxonomy for the records API.
//! Every failure a call can produce is classified here so the dispatcher can map
//! it onto a field message or a notice without inspecting HTTP details itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failure before an HTTP status was available.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("network error: {message}")]
pub struct NetworkError {
    pub message: String,
}

impl NetworkError {
    pub fn new<S: Into<String>>(message: S) -> Self { Self { message: message.into() } }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        NetworkError::new(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthError {
    #[error("no such user")]
    NoSuchUser,
    #[error("wrong password")]
    WrongPassword,
    #[error("authentication failed with HTTP {status}")]
    Unknown { status: u16 },
    /// The server accepted the login but the identity body could not be read.
    #[error("malformed login response: {message}")]
    Malformed { message: String },
    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NoSuchUser => "no_user",
            AuthError::WrongPassword => "wrong_password",
            AuthError::Unknown { .. } => "auth_failed",
            AuthError::Malformed { .. } => "malformed",
            AuthError::Network(_) => "network",
        }
    }

    /// Field-local text shown under the login form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::NoSuchUser => "No user found with that username/email.".to_string(),
            AuthError::WrongPassword => "Wrong password.".to_string(),
            AuthError::Unknown { status } => format!("Login failed ({}).", status),
            AuthError::Malformed { .. } => "Login failed: unexpected response from server.".to_string(),
            AuthError::Network(_) => "Error connecting to server.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignupError {
    #[error("email already registered")]
    EmailExists,
    #[error("signup failed with HTTP {status}")]
    Unknown { status: u16 },
    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl SignupError {
    pub fn code(&self) -> &'static str {
        match self {
            SignupError::EmailExists => "email_exists",
            SignupError::Unknown { .. } => "signup_failed",
            SignupError::Network(_) => "network",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            SignupError::EmailExists => "Email already exists. Try another.".to_string(),
            SignupError::Unknown { status } => format!("Signup failed ({}).", status),
            SignupError::Network(_) => "Error connecting to server.".to_string(),
        }
    }
}

/// Failure of a students/exams/fees/admin call.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceError {
    #[error("request failed with HTTP {status}")]
    Status { status: u16 },
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("malformed response body: {message}")]
    Malformed { message: String },
}

impl ResourceError {
    pub fn code(&self) -> &'static str {
        match self {
            ResourceError::Status { .. } => "http_status",
            ResourceError::Network(_) => "network",
            ResourceError::Malformed { .. } => "malformed",
        }
    }

    /// HTTP status when the server answered, None for transport or decode failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ResourceError::Status { status } => Some(*status),
            _ => None,
        }
    }

    pub fn malformed<S: Into<String>>(message: S) -> Self {
        ResourceError::Malformed { message: message.into() }
    }
}
