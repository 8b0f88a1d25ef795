//! Device classification: decide how aggressively interpreter sessions
//! are torn down from coarse platform signals.

/// Client capability class, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Memory-constrained host: interpreter sessions are disposed after
    /// every run to bound peak memory.
    Constrained,
    /// Desktop-class host: sessions stay warm between runs.
    Capable,
}

impl DeviceClass {
    /// Parse a user-supplied class name; accepts a few aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "constrained" | "mobile" | "tablet" => Some(Self::Constrained),
            "capable" | "desktop" => Some(Self::Capable),
            _ => None,
        }
    }
}

/// Raw platform signals consumed by [`classify`].
#[derive(Debug, Clone)]
pub struct Signals {
    /// Operating system name as reported by the platform.
    pub os: String,
    /// Total physical memory in kilobytes, when the platform exposes it.
    pub total_memory_kb: Option<u64>,
}

/// Total memory below which a host counts as constrained (2 GiB).
const CONSTRAINED_MEMORY_KB: u64 = 2 * 1024 * 1024;

/// Classify a host from its signals. Pure so callers can pin the
/// heuristic in tests without probing anything.
///
/// Mobile operating systems are constrained outright; otherwise the
/// memory signal decides, and a host with no memory signal is assumed
/// capable.
pub fn classify(signals: &Signals) -> DeviceClass {
    if matches!(signals.os.as_str(), "android" | "ios") {
        return DeviceClass::Constrained;
    }
    if let Some(kb) = signals.total_memory_kb {
        if kb < CONSTRAINED_MEMORY_KB {
            return DeviceClass::Constrained;
        }
    }
    DeviceClass::Capable
}

/// Gather platform signals. Async because the memory probe reads the
/// filesystem; platforms without `/proc/meminfo` simply report no
/// memory signal.
pub async fn probe() -> Signals {
    let total_memory_kb = read_total_memory_kb().await;
    let signals = Signals {
        os: std::env::consts::OS.to_string(),
        total_memory_kb,
    };
    tracing::debug!(?signals, "probed device signals");
    signals
}

async fn read_total_memory_kb() -> Option<u64> {
    let text = tokio::fs::read_to_string("/proc/meminfo").await.ok()?;
    parse_meminfo(&text)
}

fn parse_meminfo(text: &str) -> Option<u64> {
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("MemTotal:") {
            return rest.trim().trim_end_matches("kB").trim().parse().ok();
        }
    }
    None
}
