use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Danger,
}

/// The single dismissible banner above the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success<S: Into<String>>(msg: S) -> Self { Self { level: NoticeLevel::Success, message: msg.into() } }
    pub fn info<S: Into<String>>(msg: S) -> Self { Self { level: NoticeLevel::Info, message: msg.into() } }
    pub fn warning<S: Into<String>>(msg: S) -> Self { Self { level: NoticeLevel::Warning, message: msg.into() } }
    pub fn danger<S: Into<String>>(msg: S) -> Self { Self { level: NoticeLevel::Danger, message: msg.into() } }
}
