use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Raw role spellings the records service uses for administrators.
pub const ADMIN_ALIASES: [&str; 2] = ["ADMIN", "ROLE_ADMIN"];

/// Normalized permission level derived from the server's free-form role string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    Admin,
    #[default]
    Standard,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Admin => "ADMIN",
            Capability::Standard => "STANDARD",
        }
    }

    pub fn is_admin(&self) -> bool { matches!(self, Capability::Admin) }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw role string to a capability. Total: anything that is not one of the
/// admin aliases (ASCII case and surrounding whitespace ignored) is STANDARD.
/// Callers never compare role strings themselves.
pub fn normalize(raw: &str) -> Capability {
    let r = raw.trim();
    if ADMIN_ALIASES.iter().any(|a| a.eq_ignore_ascii_case(r)) {
        Capability::Admin
    } else {
        Capability::Standard
    }
}
