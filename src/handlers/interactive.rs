//! Interactive pad handler with TUI interface using Ratatui.

use anyhow::Result;
use is_terminal::IsTerminal;
use std::io;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::device::DeviceClass;
use crate::pad::LayoutMode;
use crate::tui::run_pad;

/// Run the interactive pad.
pub async fn run(
    cfg: Config,
    catalog: Catalog,
    source: String,
    title: String,
    snippet_index: Option<usize>,
    layout: LayoutMode,
    device_override: Option<DeviceClass>,
) -> Result<()> {
    // Check if TUI mode is available
    if !io::stdout().is_terminal() {
        eprintln!("Warning: the pad requires a proper terminal. Use --exec for piped output.");
        return Err(anyhow::anyhow!("TUI mode requires a proper terminal environment"));
    }

    run_pad(cfg, catalog, source, title, snippet_index, layout, device_override).await
}
