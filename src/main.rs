use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use owo_colors::OwoColorize;
use pypad::catalog::Catalog;
use pypad::cli;
use pypad::config::Config;
use pypad::device::DeviceClass;
use pypad::handlers;
use pypad::pad::LayoutMode;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // CLI overrides land in the environment before the config is loaded,
    // so they win over .pypadrc like any other PYPAD_* variable.
    if let Some(path) = args.catalog.as_deref() {
        std::env::set_var("PYPAD_CATALOG", path);
    }
    if let Some(name) = args.device_class.as_deref() {
        // Normalize aliases (mobile, desktop, ...) to the canonical names
        let class = DeviceClass::from_name(name).ok_or_else(|| {
            anyhow!("unknown device class: {name} (expected constrained or capable)")
        })?;
        let canonical = match class {
            DeviceClass::Constrained => "constrained",
            DeviceClass::Capable => "capable",
        };
        std::env::set_var("PYPAD_DEVICE_CLASS", canonical);
    }
    if let Some(name) = args.layout.as_deref() {
        if LayoutMode::from_name(name).is_none() {
            bail!("unknown layout: {name} (expected stacked or side)");
        }
        std::env::set_var("PYPAD_LAYOUT", name);
    }

    // Load config
    let cfg = Config::load();

    let tui_mode = !args.exec && !args.list_snippets;
    init_tracing(&cfg, tui_mode)?;

    let catalog = Catalog::load(&cfg)?;

    if args.list_snippets {
        for (index, snippet) in catalog.iter().enumerate() {
            println!("{}  {}", format!("{:>3}", index).cyan(), snippet.title);
        }
        return Ok(());
    }

    let layout = cfg
        .get("PYPAD_LAYOUT")
        .and_then(|name| LayoutMode::from_name(&name))
        .unwrap_or(LayoutMode::Stacked);
    let device_override = cfg
        .get("PYPAD_DEVICE_CLASS")
        .and_then(|name| DeviceClass::from_name(&name));

    // Resolve the initial source: explicit file, explicit snippet index,
    // otherwise a random catalog pick.
    let (source, title, snippet_index) = if let Some(path) = args.file.as_deref() {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        (source, display_name(path), None)
    } else if let Some(index) = args.snippet {
        let snippet = catalog.get(index).with_context(|| {
            format!(
                "snippet index {index} is out of range ({} snippets, try --list-snippets)",
                catalog.len()
            )
        })?;
        (snippet.source.clone(), snippet.title.clone(), Some(index))
    } else {
        let (index, snippet) = catalog
            .pick_random()
            .and_then(|index| catalog.get(index).map(|snippet| (index, snippet)))
            .context("catalog is empty")?;
        (snippet.source.clone(), snippet.title.clone(), Some(index))
    };

    if args.exec {
        handlers::exec::run(&source, &cfg, device_override).await
    } else {
        handlers::interactive::run(
            cfg,
            catalog,
            source,
            title,
            snippet_index,
            layout,
            device_override,
        )
        .await
    }
}

/// Route tracing output somewhere that cannot corrupt the interface:
/// headless runs log to stderr, TUI runs log to the `PYPAD_LOG` file or
/// are silenced entirely.
fn init_tracing(cfg: &Config, tui_mode: bool) -> Result<()> {
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let (writer, ansi) = if tui_mode {
        match cfg.get("PYPAD_LOG") {
            Some(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("opening log file {path}"))?;
                (BoxMakeWriter::new(std::sync::Arc::new(file)), false)
            }
            None => (BoxMakeWriter::new(std::io::sink), false),
        }
    } else {
        (BoxMakeWriter::new(std::io::stderr), true)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi),
        )
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
