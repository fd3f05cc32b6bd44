use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3000;

/// Server settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Built frontend bundle (`index.html` plus hashed bundles).
    pub dist_dir: PathBuf,
    /// Hand-maintained static files served under `/static`.
    pub assets_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup so tests don't touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| format!("Invalid PORT {raw:?}: {e}"))?,
            None => DEFAULT_PORT,
        };
        Ok(ServerConfig {
            port,
            dist_dir: lookup("DIST_DIR").unwrap_or_else(|| "dist".to_string()).into(),
            assets_dir: lookup("ASSETS_DIR").unwrap_or_else(|| "assets".to_string()).into(),
        })
    }
}
