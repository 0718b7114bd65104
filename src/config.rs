use anyhow::{Context, Result, anyhow};
use std::{
    collections::HashMap,
    fs,
    net::SocketAddr,
    path::Path,
};

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

pub const DATABASE_URL_KEY: &str = "DATABASE_URL";
pub const HOST_KEY: &str = "VIDEO_FINDER_HOST";
pub const PORT_KEY: &str = "VIDEO_FINDER_PORT";

/// Raw values gathered from an env file and the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub database_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl EnvConfig {
    fn apply(&mut self, key: &str, value: &str, origin: &str) -> Result<()> {
        match key {
            DATABASE_URL_KEY => {
                if !value.is_empty() {
                    self.database_url = Some(value.to_string());
                }
            }
            HOST_KEY => {
                if !value.is_empty() {
                    self.host = Some(value.to_string());
                }
            }
            PORT_KEY => {
                let port: u16 = value
                    .parse()
                    .with_context(|| format!("Parsing {PORT_KEY} from {origin}"))?;
                self.port = Some(port);
            }
            _ => {}
        }
        Ok(())
    }
}

/// Fully resolved server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Resolves `host` (an IP literal or a name such as `localhost`) to the
    /// first address it maps to.
    pub async fn socket_addr(&self) -> Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("Resolving host {}", self.host))?
            .next()
            .ok_or_else(|| anyhow!("Host {} resolved to no addresses", self.host))
    }
}

/// Reads `KEY=VALUE` lines from `path`. A missing file is not an error.
pub fn read_env_file(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let origin = path.display().to_string();
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"').trim_matches('\'');
            cfg.apply(key.trim(), value, &origin)?;
        }
    }
    Ok(Some(cfg))
}

/// Layers `vars` (normally the process environment) over `base`.
pub fn overlay_env<I>(base: EnvConfig, vars: I) -> Result<EnvConfig>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut cfg = base;
    for (key, value) in vars {
        cfg.apply(&key, value.trim(), "the environment")?;
    }
    Ok(cfg)
}

/// Loads settings from `env_file` (optional) and the process environment,
/// the latter winning.
pub fn load_settings(env_file: &Path) -> Result<Settings> {
    load_settings_from(env_file, std::env::vars())
}

pub fn load_settings_from<I>(env_file: &Path, vars: I) -> Result<Settings>
where
    I: IntoIterator<Item = (String, String)>,
{
    let file_cfg = read_env_file(env_file)?.unwrap_or_default();
    let wanted: HashMap<String, String> = vars
        .into_iter()
        .filter(|(key, _)| matches!(key.as_str(), DATABASE_URL_KEY | HOST_KEY | PORT_KEY))
        .collect();
    let cfg = overlay_env(file_cfg, wanted)?;

    let database_url = cfg.database_url.ok_or_else(|| {
        anyhow!(
            "{DATABASE_URL_KEY} not set in the environment or {}",
            env_file.display()
        )
    })?;
    Ok(Settings {
        database_url,
        host: cfg.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: cfg.port.unwrap_or(DEFAULT_PORT),
    })
}
