use serde::{Deserialize, Serialize};

/// Identity as returned by `POST /api/auth/login`. `role` is the raw server string;
/// use [`super::normalize`] for any capability decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

impl Identity {
    /// Name shown in the header; falls back to the username when the server sent none.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() { &self.username } else { &self.name }
    }
}
