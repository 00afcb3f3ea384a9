use crate::error::{BranchboardError, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_CONCURRENCY: usize = 200;

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub github_token: Option<String>,
    pub organization: String,
    pub bind: String,
    pub concurrency: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("github_token", &self.github_token.as_ref().map(|_| "[REDACTED]"))
            .field("organization", &self.organization)
            .field("bind", &self.bind)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: None,
            organization: String::new(),
            bind: "127.0.0.1:5000".to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub organization: Option<String>,
    pub bind: Option<String>,
    pub concurrency: Option<usize>,
}

impl Config {
    pub fn load(overrides: Overrides) -> Self {
        Self::load_from(&config_dir().join("branchboard").join("config.toml"), overrides)
    }

    pub fn load_from(config_file: &std::path::Path, overrides: Overrides) -> Self {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if config_file.exists() {
            figment = figment.merge(Toml::file(config_file));
        }

        figment = figment.merge(Env::prefixed("BRANCHBOARD_")).merge(
            Env::raw()
                .only(&["GITHUB_TOKEN"])
                .map(|_| "github_token".into()),
        );

        if let Some(org) = overrides.organization {
            figment = figment.merge(Serialized::default("organization", org));
        }
        if let Some(bind) = overrides.bind {
            figment = figment.merge(Serialized::default("bind", bind));
        }
        if let Some(n) = overrides.concurrency {
            figment = figment.merge(Serialized::default("concurrency", n));
        }

        match figment.extract::<Config>() {
            Ok(mut config) => {
                config.concurrency = config.concurrency.max(1);
                config
            }
            Err(e) => {
                tracing::warn!("config parse error, using defaults: {e}");
                Config::default()
            }
        }
    }

    pub fn token(&self) -> Result<&str> {
        match self.github_token.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(BranchboardError::Config(
                "GITHUB_TOKEN environment variable unset".to_string(),
            )),
        }
    }

    pub fn organization(&self) -> Result<&str> {
        let org = self.organization.trim();
        if org.is_empty() {
            return Err(BranchboardError::Config(
                "no organization configured (use --org or BRANCHBOARD_ORGANIZATION)".to_string(),
            ));
        }
        Ok(org)
    }
}

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}
