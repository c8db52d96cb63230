//! Console configuration: environment first, then command-line flags on top.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::api::ApiClient;
use crate::identity::{FileStorage, MemoryStorage, SessionStorage, SessionStore};

pub const ENV_API_BASE: &str = "STUDENTDESK_API_BASE";
pub const ENV_STATE_DIR: &str = "STUDENTDESK_STATE_DIR";
pub const ENV_PERSIST: &str = "STUDENTDESK_PERSIST_SESSION";
pub const ENV_TIMEOUT: &str = "STUDENTDESK_TIMEOUT_SECS";

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8080";
pub const DEFAULT_STATE_DIR: &str = ".studentdesk";

pub fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool_env(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|v| parse_bool(&v))
}

fn parse_secs_env(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|v| v.trim().parse::<u64>().ok())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub api_base: String,
    pub state_dir: PathBuf,
    pub persist_session: bool,
    pub timeout: Option<Duration>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            persist_session: true,
            timeout: None,
        }
    }
}

/// What the command line asked for besides configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    Run,
    Help,
}

impl ConsoleConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = env::var(ENV_API_BASE) {
            if !v.trim().is_empty() { cfg.api_base = v.trim().to_string(); }
        }
        if let Ok(v) = env::var(ENV_STATE_DIR) {
            if !v.trim().is_empty() { cfg.state_dir = PathBuf::from(v.trim()); }
        }
        if let Some(b) = parse_bool_env(ENV_PERSIST) { cfg.persist_session = b; }
        if let Some(s) = parse_secs_env(ENV_TIMEOUT) { cfg.timeout = Some(Duration::from_secs(s)); }
        cfg
    }

    /// Apply command-line flags (program name already removed).
    pub fn apply_args(&mut self, args: &[String]) -> Result<Invocation> {
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--api" => {
                    let v = args.get(i + 1).ok_or_else(|| anyhow!("--api requires a URL"))?;
                    self.api_base = v.clone();
                    i += 2;
                }
                "--state-dir" => {
                    let v = args.get(i + 1).ok_or_else(|| anyhow!("--state-dir requires a path"))?;
                    self.state_dir = PathBuf::from(v);
                    i += 2;
                }
                "--timeout" => {
                    let v = args.get(i + 1).ok_or_else(|| anyhow!("--timeout requires a number of seconds"))?;
                    let secs: u64 = v.parse().with_context(|| format!("invalid --timeout value '{}'", v))?;
                    self.timeout = Some(Duration::from_secs(secs));
                    i += 2;
                }
                "--no-persist" => {
                    self.persist_session = false;
                    i += 1;
                }
                "-h" | "--help" => return Ok(Invocation::Help),
                unk => return Err(anyhow!("unrecognized argument: {}", unk)),
            }
        }
        Ok(Invocation::Run)
    }

    pub fn api_client(&self) -> Result<ApiClient> {
        ApiClient::with_timeout(&self.api_base, self.timeout)
    }

    pub fn session_store(&self) -> SessionStore {
        let storage: Box<dyn SessionStorage> = if self.persist_session {
            Box::new(FileStorage::new(&self.state_dir))
        } else {
            Box::new(MemoryStorage::new())
        };
        SessionStore::new(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn bool_words() {
        for t in ["1", "true", "YES", " on "] { assert_eq!(parse_bool(t), Some(true)); }
        for f in ["0", "false", "No", "off"] { assert_eq!(parse_bool(f), Some(false)); }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn flags_override_defaults() {
        let mut cfg = ConsoleConfig::default();
        let inv = cfg
            .apply_args(&args(&["--api", "http://records:9000", "--state-dir", "/tmp/sd", "--no-persist", "--timeout", "5"]))
            .unwrap();
        assert_eq!(inv, Invocation::Run);
        assert_eq!(cfg.api_base, "http://records:9000");
        assert_eq!(cfg.state_dir, PathBuf::from("/tmp/sd"));
        assert!(!cfg.persist_session);
        assert_eq!(cfg.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn help_and_bad_flags() {
        let mut cfg = ConsoleConfig::default();
        assert_eq!(cfg.apply_args(&args(&["-h"])).unwrap(), Invocation::Help);
        assert!(cfg.apply_args(&args(&["--api"])).is_err());
        assert!(cfg.apply_args(&args(&["--timeout", "soon"])).is_err());
        assert!(cfg.apply_args(&args(&["--verbose"])).is_err());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let cfg = ConsoleConfig { api_base: "::nope::".into(), ..Default::default() };
        assert!(cfg.api_client().is_err());
        assert!(ConsoleConfig::default().api_client().is_ok());
    }

    #[test]
    fn api_base_keeps_its_path_prefix() {
        let cfg = ConsoleConfig { api_base: "https://intranet.school.org/records".into(), ..Default::default() };
        assert_eq!(cfg.api_client().unwrap().base().as_str(), "https://intranet.school.org/records/");
    }
}
