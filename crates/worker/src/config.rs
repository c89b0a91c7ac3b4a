use std::path::{Path, PathBuf};

use serde::Deserialize;
use suito_core::TitleCharsets;
use thiserror::Error;

/// Environment variable naming the config file when no CLI argument is given.
pub const CONFIG_ENV: &str = "SUITO_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("No platform data directory available; set intake_dir and store_dir explicitly")]
    NoDataDir,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Folder watched for new photos.
    pub intake_dir: Option<PathBuf>,
    /// Root of the blob store (`processed/`, `review/`, `failed/`).
    pub store_dir: Option<PathBuf>,
    /// Recognition endpoint; the worker refuses to start without one.
    pub recognizer_url: Option<String>,
    pub recognizer_api_key: Option<String>,
    /// Recipient of replies for photos dropped into the intake folder.
    pub default_recipient: String,
    pub log_format: LogFormat,
    pub queue_capacity: usize,
    pub title_charsets: TitleCharsets,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            intake_dir: None,
            store_dir: None,
            recognizer_url: None,
            recognizer_api_key: None,
            default_recipient: "intake".to_string(),
            log_format: LogFormat::Pretty,
            queue_capacity: 64,
            title_charsets: TitleCharsets::default(),
        }
    }
}

/// Directories the worker runs against, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDirs {
    pub intake_dir: PathBuf,
    pub store_dir: PathBuf,
}

impl WorkerConfig {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&text, path)
    }

    /// Config from the first CLI argument or `SUITO_CONFIG`; defaults when neither is set.
    pub fn from_args_or_env(arg: Option<String>) -> Result<Self, ConfigError> {
        match arg.or_else(|| std::env::var(CONFIG_ENV).ok()) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Explicit directories win; the rest land under the platform data dir.
    pub fn resolve_dirs(&self) -> Result<ResolvedDirs, ConfigError> {
        if let (Some(intake), Some(store)) = (&self.intake_dir, &self.store_dir) {
            return Ok(ResolvedDirs { intake_dir: intake.clone(), store_dir: store.clone() });
        }
        let project_dirs =
            directories::ProjectDirs::from("com", "suito", "Suito").ok_or(ConfigError::NoDataDir)?;
        Ok(self.resolve_dirs_under(project_dirs.data_dir()))
    }

    fn resolve_dirs_under(&self, data_dir: &Path) -> ResolvedDirs {
        ResolvedDirs {
            intake_dir: self.intake_dir.clone().unwrap_or_else(|| data_dir.join("intake")),
            store_dir: self.store_dir.clone().unwrap_or_else(|| data_dir.join("store")),
        }
    }
}
