//! The managed icon directory: importing user images, generating icons from the shell
//! and from favicons, rendering, and garbage collection.
//!
//! File names carry the ownership contract. `auto_*` files were generated by the
//! launcher, `custom_*` files were imported by the user; both are removed as soon as no
//! entry references them. Anything else (the bundled app icon, files dropped in by hand)
//! is never touched.

pub mod render;
pub mod sources;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::config::AppConfig;
use crate::error::StoreError;
use crate::model::Entry;

pub use render::{IconCache, IconImage};
pub use sources::{FaviconSource, HttpFaviconSource, ShellIconProvider, TileIconProvider};

pub const AUTO_PREFIX: &str = "auto_";
pub const CUSTOM_PREFIX: &str = "custom_";
pub const APP_ICON: &str = "app_icon.png";
pub const PROTECTED_ICONS: [&str; 2] = [APP_ICON, "app_icon.ico"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetClass {
    Auto,
    Custom,
    Protected,
}

impl AssetClass {
    pub fn of(name: &str) -> Self {
        if PROTECTED_ICONS.contains(&name) {
            AssetClass::Protected
        } else if name.starts_with(AUTO_PREFIX) {
            AssetClass::Auto
        } else if name.starts_with(CUSTOM_PREFIX) {
            AssetClass::Custom
        } else {
            AssetClass::Protected
        }
    }

    pub fn is_collectable(self) -> bool {
        !matches!(self, AssetClass::Protected)
    }
}

/// Keep ASCII-alphanumerics, spaces, dots and underscores.
pub fn sanitize_stem(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

pub struct IconAssetManager {
    dir: PathBuf,
    favicons: Box<dyn FaviconSource>,
    shell: Box<dyn ShellIconProvider>,
    cache: IconCache,
}

impl IconAssetManager {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_sources(
            config.icon_dir().to_path_buf(),
            Box::new(HttpFaviconSource::new(config.favicon().clone())),
            Box::new(TileIconProvider),
        )
    }

    pub fn with_sources(
        dir: PathBuf,
        favicons: Box<dyn FaviconSource>,
        shell: Box<dyn ShellIconProvider>,
    ) -> Self {
        Self {
            dir,
            favicons,
            shell,
            cache: IconCache::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn asset_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn cache(&self) -> &IconCache {
        &self.cache
    }

    /// Copy a user-chosen image into the directory as `custom_<unix-secs>_<basename>`.
    ///
    /// A second import of the same basename within the same second gets a `-<n>` counter
    /// after the timestamp instead of overwriting the first.
    pub fn import(&mut self, source: &Path) -> Result<String, StoreError> {
        let basename = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                StoreError::io(
                    source,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file path"),
                )
            })?;
        if !source.is_file() {
            return Err(StoreError::io(
                source,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source image does not exist"),
            ));
        }
        self.ensure_dir()?;

        let stamp = chrono::Utc::now().timestamp();
        let mut name = format!("{CUSTOM_PREFIX}{stamp}_{basename}");
        let mut counter = 1;
        while self.asset_path(&name).exists() {
            name = format!("{CUSTOM_PREFIX}{stamp}-{counter}_{basename}");
            counter += 1;
        }

        let target = self.asset_path(&name);
        fs::copy(source, &target).map_err(|err| StoreError::io(&target, err))?;
        self.cache.invalidate(&name);
        tracing::info!(asset = name.as_str(), source = %source.display(), "imported icon");
        Ok(name)
    }

    /// Save the shell's icon for `path` as `auto_<basename>.png`.
    pub fn extract_system_icon(&mut self, path: &Path) -> Option<String> {
        let bitmap = self.shell.icon_for(path)?;
        let basename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut stem = sanitize_stem(&basename);
        if stem.is_empty() {
            stem = "icon".to_string();
        }
        let name = format!("{AUTO_PREFIX}{stem}.png");

        let target = self.asset_path(&name);
        let saved = self
            .ensure_dir()
            .map_err(|err| err.to_string())
            .and_then(|_| {
                bitmap
                    .save_with_format(&target, image::ImageFormat::Png)
                    .map_err(|err| err.to_string())
            });
        match saved {
            Ok(()) => {
                self.cache.invalidate(&name);
                Some(name)
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "could not save shell icon");
                None
            }
        }
    }

    /// Fetch the favicon for `url`'s host and save it as `auto_<host>.png`.
    pub fn fetch_remote_icon(&mut self, url: &str) -> Option<String> {
        let domain = url_domain(url)?;
        let stem = sanitize_stem(&domain);
        if stem.is_empty() {
            return None;
        }
        let name = format!("{AUTO_PREFIX}{stem}.png");

        match self.download_favicon(&domain, &name) {
            Ok(()) => {
                self.cache.invalidate(&name);
                tracing::debug!(domain = domain.as_str(), asset = name.as_str(), "fetched favicon");
                Some(name)
            }
            Err(err) => {
                tracing::warn!(domain = domain.as_str(), error = %err, "favicon fetch failed");
                None
            }
        }
    }

    fn download_favicon(&self, domain: &str, name: &str) -> Result<(), StoreError> {
        let bytes = self.favicons.fetch(domain)?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|err| StoreError::Network(format!("favicon is not an image: {err}")))?;
        self.ensure_dir()?;
        let target = self.asset_path(name);
        decoded
            .save_with_format(&target, image::ImageFormat::Png)
            .map_err(|err| {
                StoreError::io(&target, std::io::Error::new(std::io::ErrorKind::Other, err))
            })
    }

    pub fn render(&mut self, name: &str, fallback_label: &str) -> &IconImage {
        self.cache.get_or_render(&self.dir, name, fallback_label)
    }

    /// Remove `name` unless it is protected or still referenced. Returns whether a file
    /// was deleted.
    pub fn delete_if_unused(&mut self, name: &str, entries: &[Entry]) -> bool {
        if name.is_empty() || !AssetClass::of(name).is_collectable() {
            return false;
        }
        if entries.iter().any(|entry| entry.icon == name) {
            return false;
        }
        self.remove(name)
    }

    /// Remove every collectable asset no entry references.
    pub fn collect_garbage(&mut self, entries: &[Entry]) -> Vec<String> {
        let referenced: BTreeSet<&str> = entries.iter().map(|entry| entry.icon.as_str()).collect();
        let listing = match fs::read_dir(&self.dir) {
            Ok(listing) => listing,
            Err(err) => {
                tracing::debug!(dir = %self.dir.display(), error = %err, "icon directory unreadable");
                return Vec::new();
            }
        };

        let mut orphans: Vec<String> = listing
            .filter_map(Result::ok)
            .filter(|item| item.path().is_file())
            .map(|item| item.file_name().to_string_lossy().into_owned())
            .filter(|name| AssetClass::of(name).is_collectable() && !referenced.contains(name.as_str()))
            .collect();
        orphans.sort();
        orphans.retain(|name| self.remove(name));
        orphans
    }

    fn remove(&mut self, name: &str) -> bool {
        let path = self.asset_path(name);
        if !path.exists() {
            return false;
        }
        self.cache.invalidate(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(asset = name, "removed unused icon");
                true
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to remove icon");
                false
            }
        }
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|err| StoreError::io(&self.dir, err))
    }
}

/// Host (and port, when present) of an http(s) URL.
pub fn url_domain(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}
