use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

/// Opaque bearer value sent as the `Authorization` header on every authorized call.
/// Derived once at login from the canonical username and the typed password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn basic(username: &str, password: &str) -> Self {
        let raw = format!("{}:{}", username, password);
        Credential(format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw)))
    }

    /// Wrap a header value read back from storage.
    pub fn from_header_value<S: Into<String>>(value: S) -> Self { Credential(value.into()) }

    pub fn header_value(&self) -> &str { &self.0 }
}

// Never print the secret, even in debug logs.
impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}
