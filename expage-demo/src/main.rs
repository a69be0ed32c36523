use std::env;
use std::fs;
use std::path::PathBuf;

use expage_core::{ExPageError, Manager, ManagerConfig, Scope, Severity};
use serde_json::json;

fn main() -> Result<(), ExPageError> {
    let logger = env_logger::Builder::from_default_env().build();
    let level = logger.filter();
    expage_core::set_forward_logger(Box::new(logger), level);

    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("expage-demo"));
    fs::create_dir_all(&dir).map_err(|e| ExPageError::Storage(format!("failed to create '{}': {}", dir.display(), e)))?;

    let config = ManagerConfig::from_json(&json!({
        "dirname": dir,
        "filelog": "app.log",
        "separate": { "exceptions": "exceptions.log" },
        "mode": "dev",
    }))?;

    // Lives until the end of main; dropping it writes the logs and the report.
    let manager = Manager::new(config)?;

    log::warn!(user = "demo", attempts = 3; "login throttled");
    log::info!("below the capture level, only forwarded");

    manager.capture().on_error(
        Severity::Notice,
        "cache miss on warm start",
        file!(),
        line!(),
        Some(Scope::new().with("key", "session:42").with("ttl", 300)),
    );

    if let Err(e) = fs::read_to_string(dir.join("missing-settings.toml")) {
        manager.capture().on_uncaught_error(&e);
    }

    println!("logs go to {}", dir.display());
    Ok(())
}
