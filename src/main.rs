//!
//! studentdesk binary
//! ------------------
//! Interactive console for the student-records service. Configuration comes from
//! STUDENTDESK_* environment variables, overridden by command-line flags.

use std::env;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use studentdesk::cli::run_repl;
use studentdesk::config::{ConsoleConfig, Invocation};
use studentdesk::dispatcher::Dispatcher;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--state-dir <dir>] [--no-persist] [--timeout <secs>]\n\nFlags:\n  --api <url>          Records API base URL (env: STUDENTDESK_API_BASE, default http://127.0.0.1:8080)\n  --state-dir <dir>    Where the session record is kept (env: STUDENTDESK_STATE_DIR, default .studentdesk)\n  --no-persist         Keep the session in memory only (env: STUDENTDESK_PERSIST_SESSION=false)\n  --timeout <secs>     Per-request timeout (env: STUDENTDESK_TIMEOUT_SECS, default none)\n  -h, --help           Show this help\n\nLogging is controlled with RUST_LOG (default warn).\n\n{}",
        studentdesk::cli::HELP
    );
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?;
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = if args.is_empty() { "studentdesk".to_string() } else { args.remove(0) };

    let mut cfg = ConsoleConfig::from_env();
    match cfg.apply_args(&args) {
        Ok(Invocation::Help) => {
            print_usage(&program);
            return Ok(());
        }
        Ok(Invocation::Run) => {}
        Err(e) => {
            eprintln!("{}", e);
            print_usage(&program);
            std::process::exit(2);
        }
    }

    let api = cfg.api_client()?;
    info!(
        target: "studentdesk::startup",
        api = %api.base(),
        state_dir = %cfg.state_dir.display(),
        persist = cfg.persist_session,
        "starting console"
    );
    let dispatcher = Dispatcher::new(api, cfg.session_store());

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;
    run_repl(rt, dispatcher)
}
