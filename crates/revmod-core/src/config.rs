use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context};

pub const ROOT_VAR: &str = "REVMOD_ROOT";
pub const ADDR_VAR: &str = "REVMOD_ADDR";
pub const GIT_VAR: &str = "REVMOD_GIT";

pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_GIT: &str = "git";

#[derive(Debug, Clone)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Explicit settings that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub addr: Option<SocketAddr>,
    pub git: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    addr: SocketAddr,
    git: String,
}

impl Config {
    /// Builds the server configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if no repository root is configured, the root is not a
    /// directory, or the listen address does not parse.
    pub fn from_env(overrides: Overrides) -> anyhow::Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture(), overrides)
    }

    /// # Errors
    /// See [`Config::from_env`].
    pub fn from_snapshot(snapshot: &EnvSnapshot, overrides: Overrides) -> anyhow::Result<Self> {
        let root = match overrides.root {
            Some(root) => root,
            None => match snapshot.var(ROOT_VAR) {
                Some(root) => PathBuf::from(root),
                None => bail!("no repository root configured; pass --root or set {ROOT_VAR}"),
            },
        };
        if !root.is_dir() {
            bail!("repository root {} is not a directory", root.display());
        }

        let addr = match overrides.addr {
            Some(addr) => addr,
            None => {
                let raw = snapshot.var(ADDR_VAR).unwrap_or(DEFAULT_ADDR);
                raw.parse()
                    .with_context(|| format!("invalid {ADDR_VAR} value '{raw}'"))?
            }
        };

        let git = overrides
            .git
            .or_else(|| snapshot.var(GIT_VAR).map(ToOwned::to_owned))
            .unwrap_or_else(|| DEFAULT_GIT.to_string());

        Ok(Self { root, addr, git })
    }

    #[must_use]
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[must_use]
    pub fn git(&self) -> &str {
        &self.git
    }
}
