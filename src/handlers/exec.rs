//! Headless one-shot execution for `--exec`.

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config::Config;
use crate::device::{self, DeviceClass};
use crate::process::PythonProvider;
use crate::session::{SessionManager, TeardownPolicy};

/// Execute `source` once and print the captured output: stdout verbatim,
/// stderr as an error-styled segment on our own stderr.
///
/// A fault raised by the source is part of its output, so the exit code
/// stays 0; only session-level failures (interpreter missing, broken
/// pipe) error out.
pub async fn run(source: &str, cfg: &Config, device_override: Option<DeviceClass>) -> Result<()> {
    let class = match device_override {
        Some(class) => class,
        None => device::classify(&device::probe().await),
    };
    tracing::debug!(?class, "running one-shot execution");

    let provider = PythonProvider::from_config(cfg);
    let manager = SessionManager::new(Box::new(provider), TeardownPolicy::for_device(class));

    let result = manager.execute(source.trim_end()).await?;

    print!("{}", result.stdout);
    if !result.stderr.is_empty() {
        eprint!("{}", result.stderr.red());
    }
    Ok(())
}
