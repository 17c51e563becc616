//! Runtime configuration: platform data directory plus optional
//! `{data_dir}/config.toml` overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::error;

const DEFAULT_LOG: &str = "info";
const DEFAULT_LOG_FORMAT: &str = "pretty";

// ─── Theme ───────────────────────────────────────────────────────────────────

/// UI theme preference. Outside the engine core — persisted under the
/// `theme` store key and owned by whichever front end is attached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}' (expected light or dark)")),
        }
    }
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
/// Priority: CLI / env var > TOML > built-in default.
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    /// Log level filter string, e.g. "debug", "info,taskdesk=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default, human-readable) | "json".
    log_format: Option<String>,
    /// Theme used when the store holds no saved preference: "light" | "dark".
    default_theme: Option<Theme>,
}

fn load_toml(data_dir: &Path) -> TomlConfig {
    let path = data_dir.join("config.toml");
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return TomlConfig::default();
    };
    match toml::from_str(&contents) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            TomlConfig::default()
        }
    }
}

/// Resolved configuration after layering CLI args, TOML, and defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log: String,
    pub log_format: String,
    pub default_theme: Theme,
}

impl Config {
    pub fn resolve(data_dir: Option<PathBuf>, log: Option<String>) -> Self {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);
        let toml = load_toml(&data_dir);
        Self {
            log: log
                .or(toml.log)
                .unwrap_or_else(|| DEFAULT_LOG.to_string()),
            log_format: toml
                .log_format
                .unwrap_or_else(|| DEFAULT_LOG_FORMAT.to_string()),
            default_theme: toml.default_theme.unwrap_or_default(),
            data_dir,
        }
    }
}

fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/taskdesk
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("taskdesk");
        }
    }
    #[cfg(target_os = "linux")]
    {
        // $XDG_DATA_HOME/taskdesk or ~/.local/share/taskdesk
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("taskdesk");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("taskdesk");
        }
    }
    #[cfg(target_os = "windows")]
    {
        // %APPDATA%\taskdesk
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata).join("taskdesk");
        }
    }
    // Fallback
    PathBuf::from(".taskdesk")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
