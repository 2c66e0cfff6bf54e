//! Configuration loading.
//!
//! Sources, lowest to highest precedence:
//!
//! 1. `config.toml` (under `dirs::config_dir()/greenline/`, or an explicit path)
//! 2. a `.env` file in the working directory
//! 3. process environment variables
//!
//! ```toml
//! [supabase]
//! url = "https://xyz.supabase.co"
//! service_role_key = "..."
//!
//! [database]
//! url = "postgres://localhost/greenline"
//!
//! [shim]
//! binding = "placeholder"
//! probe_table = "conversations"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::binding::ParamBinding;
use crate::error::{ShimError, ShimResult};

pub const DEFAULT_PROBE_TABLE: &str = "conversations";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub anon_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    pub binding: ParamBinding,
    pub probe_table: String,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            binding: ParamBinding::default(),
            probe_table: DEFAULT_PROBE_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub supabase: SupabaseConfig,
    pub database: DatabaseConfig,
    pub shim: ShimConfig,
}

/// Which backend a configuration points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Rest { url: String, key: String },
    Postgres { url: String },
}

impl Config {
    /// Load from file, `.env` and environment.
    ///
    /// A missing file at the default location is not an error; a missing
    /// file at an explicit `path` is.
    pub fn load(path: Option<&Path>) -> ShimResult<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };

        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", env_file.display());
        }
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// `dirs::config_dir()/greenline/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("greenline").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> ShimResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShimError::Config(format!("lecture de {} impossible: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ShimResult<Self> {
        toml::from_str(content).map_err(|e| ShimError::Config(e.to_string()))
    }

    /// Override fields from environment-style variables. Empty values are
    /// treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SUPABASE_URL") {
            self.supabase.url = Some(v);
        }
        if let Some(v) = get("SUPABASE_SERVICE_ROLE_KEY") {
            self.supabase.service_role_key = Some(v);
        }
        if let Some(v) = get("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = Some(v);
        }
        if let Some(v) = get("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = get("GREENLINE_PARAM_BINDING") {
            match v.parse() {
                Ok(mode) => self.shim.binding = mode,
                Err(e) => tracing::warn!("Ignoring GREENLINE_PARAM_BINDING: {}", e),
            }
        }
        if let Some(v) = get("GREENLINE_PROBE_TABLE") {
            self.shim.probe_table = v;
        }
    }

    /// Service-role key if present, anon key otherwise.
    pub fn api_key(&self) -> Option<&str> {
        self.supabase
            .service_role_key
            .as_deref()
            .or(self.supabase.anon_key.as_deref())
    }

    /// The hosted API wins when fully configured; a database URL is the
    /// fallback.
    pub fn backend_kind(&self) -> ShimResult<BackendKind> {
        if let (Some(url), Some(key)) = (self.supabase.url.as_deref(), self.api_key()) {
            return Ok(BackendKind::Rest {
                url: url.to_string(),
                key: key.to_string(),
            });
        }
        if let Some(url) = self.database.url.as_deref() {
            return Ok(BackendKind::Postgres {
                url: url.to_string(),
            });
        }
        Err(ShimError::Config(
            "Configuration Supabase manquante: SUPABASE_URL et SUPABASE_SERVICE_ROLE_KEY \
             (ou SUPABASE_ANON_KEY), ou DATABASE_URL"
                .to_string(),
        ))
    }
}
