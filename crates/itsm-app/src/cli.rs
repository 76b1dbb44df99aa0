//! CLI argument definitions for the ITSM console.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Terminal front-end for the ITSM assistant backend.
#[derive(Parser, Debug)]
#[command(name = "itsm-console", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the assistant backend, e.g. http://localhost:5019.
    #[arg(short = 'b', long = "backend-url")]
    pub backend_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Write the effective configuration to the config path and exit.
    #[arg(long = "init-config")]
    pub init_config: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > ITSM_CONSOLE_CONFIG env var > ~/.itsm-console/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("ITSM_CONSOLE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the backend base URL.
    ///
    /// Priority: --backend-url flag > ITSM_BACKEND_URL env var > config file value.
    pub fn resolve_backend_url(&self, config_url: &str) -> String {
        if let Some(ref url) = self.backend_url {
            return url.clone();
        }
        if let Ok(url) = std::env::var("ITSM_BACKEND_URL") {
            if !url.trim().is_empty() {
                return url;
            }
        }
        config_url.to_string()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value. `RUST_LOG`, when set,
    /// overrides both at subscriber setup.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".itsm-console").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".itsm-console").join("config.toml");
    }
    PathBuf::from("config.toml")
}
