use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Deserialize;
use tracing::{debug, info, warn};

pub const CONFIG_ENV_VAR: &str = "LANES_CONFIG";
const CONFIG_FILE_NAME: &str = ".lanes.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub data_location: Option<String>,
    pub default_command: String,
    pub color: String,
    pub timezone: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_location: None,
            default_command: "board".to_string(),
            color: "auto".to_string(),
            timezone: None,
        }
    }
}

impl Config {
    #[tracing::instrument(skip(override_path))]
    pub fn load(override_path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = resolve_config_path(override_path) else {
            warn!("no config file found; using defaults");
            return Ok(Config::default());
        };

        let path = expand_tilde(&path);
        info!(file = %path.display(), "loading config");
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!(
            default_command = %cfg.default_command,
            color = %cfg.color,
            "loaded config"
        );
        Ok(cfg)
    }
}

fn resolve_config_path(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path.to_path_buf());
    }
    default_config_path()
}

pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        if env_path == "/dev/null" {
            return None;
        }
        return Some(PathBuf::from(env_path));
    }

    let home = dirs::home_dir()?;
    let candidate = home.join(CONFIG_FILE_NAME);
    if candidate.exists() { Some(candidate) } else { None }
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(location) = &cfg.data_location {
        expand_tilde(Path::new(location))
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".lanes"))
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}
