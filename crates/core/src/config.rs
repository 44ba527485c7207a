use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

static CONFIG_FILE_NAME: &str = "config.json";
static ICON_DIR_NAME: &str = "icons";
static BACKUP_DIR_NAME: &str = "backups";
static ERROR_LOG_NAME: &str = "error_log.txt";
static ENV_DATA_DIR: &str = "BIFROST_DATA_DIR";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "bifrost", "Bifrost"));

pub const DEFAULT_FAVICON_ENDPOINT: &str = "https://www.google.com/s2/favicons";

/// Settings for the remote favicon lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaviconOptions {
    pub endpoint: String,
    pub size: u32,
    pub timeout: Duration,
    /// Skips TLS certificate verification. Off unless explicitly requested.
    pub accept_invalid_certs: bool,
}

impl Default for FaviconOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_FAVICON_ENDPOINT.to_string(),
            size: 64,
            timeout: Duration::from_secs(3),
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    config_path: PathBuf,
    icon_dir: PathBuf,
    legacy_dir: Option<PathBuf>,
    bundle_candidates: Vec<PathBuf>,
    favicon: FaviconOptions,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory using the provided override,
    /// environment variables, and platform defaults. The directory holding the running
    /// executable is recorded as the legacy install location.
    pub fn discover(data_dir_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        let config = Self::from_data_dir(data_dir)?;
        match install_dir() {
            Some(dir) => Ok(config.with_install_dir(dir)),
            None => Ok(config),
        }
    }

    /// Construct [`AppConfig`] directly from a resolved data directory.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        let icon_dir = data_dir.join(ICON_DIR_NAME);
        Ok(Self {
            data_dir,
            config_path,
            icon_dir,
            legacy_dir: None,
            bundle_candidates: Vec::new(),
            favicon: FaviconOptions::default(),
        })
    }

    /// Point legacy migration and bundled-icon refresh at an install directory.
    pub fn with_install_dir(mut self, dir: PathBuf) -> Self {
        self.bundle_candidates = vec![dir.join(ICON_DIR_NAME), dir.join("_internal"), dir.clone()];
        self.legacy_dir = Some(dir);
        self
    }

    pub fn with_favicon_options(mut self, favicon: FaviconOptions) -> Self {
        self.favicon = favicon;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn icon_dir(&self) -> &Path {
        &self.icon_dir
    }

    /// Preset imports back up the current document here.
    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join(BACKUP_DIR_NAME)
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.data_dir.join(ERROR_LOG_NAME)
    }

    pub fn legacy_dir(&self) -> Option<&Path> {
        self.legacy_dir.as_deref()
    }

    pub fn bundle_candidates(&self) -> &[PathBuf] {
        &self.bundle_candidates
    }

    pub fn favicon(&self) -> &FaviconOptions {
        &self.favicon
    }
}

fn install_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if cfg!(debug_assertions) {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let dev_dir = manifest_dir.join("..").join("tmp").join("dev-bifrost");
        return Ok(dev_dir);
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_local_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".bifrost"));
    }

    Ok(env::current_dir()?.join(".bifrost"))
}
