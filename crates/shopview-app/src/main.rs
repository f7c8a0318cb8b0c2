//! Shopview host
//!
//! Runs the host side of the bridge for one embedded store surface. Without
//! a platform webview the surface is driven over stdin/stdout: the shell
//! writes content messages and commands as JSON lines, and the host answers
//! with replies and the actions it took.

mod ipc;
mod runtime;
mod state;
mod storage;
mod surface;

use shopview_common::{init_logging, LogConfig};
use shopview_core::{BridgeConfig, LogTracker, SharedStore, ShopviewResult, SystemClock};
use state::AppState;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use storage::SqliteStore;
use surface::{ActionLog, HeadlessHost};
use tokio::io::BufReader;
use tracing::{error, info};

/// Environment variable naming the config file
const CONFIG_ENV: &str = "SHOPVIEW_CONFIG";

/// Environment variable carrying the analytics user id
const USER_ENV: &str = "SHOPVIEW_USER";

fn main() {
    // Route `log` records from the library crates into tracing
    tracing_log::LogTracer::init().expect("Failed to set log tracer");
    init_logging(LogConfig::from_env());

    if let Err(e) = run() {
        error!(error = %e, "Shopview host failed");
        std::process::exit(1);
    }
}

/// First argument, then `SHOPVIEW_CONFIG`, then the data directory
fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(BridgeConfig::default_path)
}

fn database_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("shopview.db")
}

fn run() -> ShopviewResult<()> {
    let path = config_path();
    let config = BridgeConfig::load(&path)?;
    info!(store_url = %config.store_url, platform = ?config.platform, "Starting shopview host");

    let store: SharedStore = Arc::new(SqliteStore::open(&database_path(&path))?);
    let log = ActionLog::new();
    let mut state = AppState::new(
        config,
        store,
        Box::new(HeadlessHost::new(log.clone())),
        Box::new(LogTracker),
    )?;
    if let Ok(user_id) = std::env::var(USER_ENV) {
        state = state.with_user_id(user_id);
    }
    let state = Arc::new(Mutex::new(state));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(runtime::run(
        state,
        log,
        SystemClock,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    ))
}
