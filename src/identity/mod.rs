//! Authenticated identity, role policy and session persistence for the console.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod role;
mod credential;
mod session;

pub use principal::Identity;
pub use role::{normalize, Capability, ADMIN_ALIASES};
pub use credential::Credential;
pub use session::{
    FileStorage, MemoryStorage, PersistedSession, Session, SessionStorage, SessionStore,
};
