//! TOML configuration. Every field has a default, so a missing file is fine.

use crate::errors::Result;
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "statement-viewer.toml";

const PLACEHOLDER_SCRIPT_ID: &str = "YOUR_SCRIPT_ID";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendSection,
    pub cache: CacheSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    /// Deployed script URL, e.g. `https://script.google.com/macros/s/<id>/exec`.
    pub base_url: String,
    /// Bound for search, autocomplete and connection tests.
    pub lookup_timeout_secs: u64,
    /// Statement generation scans more data on the backend, so it gets longer.
    pub statement_timeout_secs: u64,
    /// Honour `HTTP_PROXY` / `HTTPS_PROXY` from the environment.
    pub use_system_proxy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// `None` disables the cache.
    pub path: Option<PathBuf>,
    pub freshness_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: format!("https://script.google.com/macros/s/{PLACEHOLDER_SCRIPT_ID}/exec"),
            lookup_timeout_secs: 8,
            statement_timeout_secs: 30,
            use_system_proxy: true,
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("statement-viewer-cache.json")),
            freshness_secs: 60 * 60,
        }
    }
}

impl BackendSection {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }

    /// Reject URLs that were never filled in.
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if url.is_empty() || url.contains(PLACEHOLDER_SCRIPT_ID) {
            bail!("set backend.base_url to your deployed script URL (or pass --url)");
        }
        if self.lookup_timeout_secs == 0 || self.statement_timeout_secs == 0 {
            bail!("backend timeouts must be at least one second");
        }
        Ok(())
    }

    /// Deployment id from a `/macros/s/<id>/…` URL, if the URL has that shape.
    pub fn script_id(&self) -> Option<&str> {
        let (_, rest) = self.base_url.split_once("/macros/s/")?;
        rest.split('/').next().filter(|id| !id.is_empty())
    }
}

impl CacheSection {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}

/// Load `path`, or [`DEFAULT_CONFIG_FILE`] when `None`.
///
/// An explicitly named file must exist; the default one may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let (p, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    if !p.exists() {
        if explicit {
            bail!("config file {} does not exist", p.display());
        }
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}
