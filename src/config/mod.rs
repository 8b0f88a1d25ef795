use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use directories::BaseDirs;

/// Runtime configuration: defaults, overlaid by `.pypadrc`, overlaid by
/// `PYPAD_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        // Read .pypadrc if it exists; key=value lines, # starts a comment
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().flatten() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if let Ok(v) = env::var(key) {
            return Some(v);
        }
        self.inner.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }
}

/// Known keys:
///
/// - `PYPAD_PYTHON`: interpreter binary (default `python3`)
/// - `PYPAD_STARTUP_TIMEOUT`: seconds to wait for the ready handshake
/// - `PYPAD_DEVICE_CLASS`: `constrained` or `capable`, skips probing
/// - `PYPAD_LAYOUT`: `stacked` or `side`
/// - `PYPAD_CATALOG`: path to a JSON snippet catalog
/// - `PYPAD_LOG`: log file for TUI sessions (logs are silenced otherwise)
fn is_config_key(k: &str) -> bool {
    k.starts_with("PYPAD_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("pypad").join(".pypadrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("PYPAD_PYTHON".into(), "python3".into());
    m.insert("PYPAD_STARTUP_TIMEOUT".into(), "10".into());
    m
}
