// ⚙️ Process configuration (environment)

use anyhow::{Context, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DB_PATH: &str = "marbetes.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `PORT`
    pub port: u16,
    /// `MARBETES_DB`
    pub database_path: PathBuf,
    /// `CHROME_BIN` - None lets the browser driver find Chromium on its own
    pub chrome_executable: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: PathBuf::from(DEFAULT_DB_PATH),
            chrome_executable: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = get("PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
        }
        if let Some(path) = get("MARBETES_DB") {
            config.database_path = PathBuf::from(path);
        }
        config.chrome_executable = get("CHROME_BIN").map(PathBuf::from);

        Ok(config)
    }

    /// All interfaces on the configured port
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}
