//! External collaborators that produce icon pixels: the remote favicon service and the
//! desktop shell's file icons.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use image::RgbaImage;
use reqwest::blocking::Client;

use crate::config::FaviconOptions;
use crate::error::StoreError;
use crate::icons::render::gradient_tile;

const SHELL_ICON_SIZE: u32 = 128;

pub trait FaviconSource {
    /// Raw image bytes for `domain`.
    fn fetch(&self, domain: &str) -> Result<Vec<u8>, StoreError>;
}

pub trait ShellIconProvider {
    /// A representative bitmap for a file or folder, if the shell has one.
    fn icon_for(&self, path: &Path) -> Option<RgbaImage>;
}

/// Looks up favicons through an HTTP endpoint taking `domain` and `sz` query parameters.
#[derive(Debug, Clone)]
pub struct HttpFaviconSource {
    options: FaviconOptions,
}

impl HttpFaviconSource {
    pub fn new(options: FaviconOptions) -> Self {
        if options.accept_invalid_certs {
            tracing::warn!(
                endpoint = options.endpoint.as_str(),
                "favicon lookups will skip TLS certificate verification"
            );
        }
        Self { options }
    }

    fn client(&self) -> Result<Client, StoreError> {
        Client::builder()
            .timeout(self.options.timeout)
            .danger_accept_invalid_certs(self.options.accept_invalid_certs)
            .build()
            .map_err(|err| StoreError::Network(err.to_string()))
    }
}

impl FaviconSource for HttpFaviconSource {
    fn fetch(&self, domain: &str) -> Result<Vec<u8>, StoreError> {
        let size = self.options.size.to_string();
        let response = self
            .client()?
            .get(&self.options.endpoint)
            .query(&[("domain", domain), ("sz", size.as_str())])
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|err| StoreError::Network(err.to_string()))?;
        let bytes = response
            .bytes()
            .map_err(|err| StoreError::Network(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Shell icon stand-in for platforms without a native icon provider: a gradient tile
/// whose colour is derived from the folder/extension so similar files look alike.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileIconProvider;

impl ShellIconProvider for TileIconProvider {
    fn icon_for(&self, path: &Path) -> Option<RgbaImage> {
        let metadata = path.metadata().ok()?;
        let kind = if metadata.is_dir() {
            "<folder>".to_string()
        } else {
            path.extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default()
        };

        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        let [r, g, b, ..] = hasher.finish().to_le_bytes();
        let from = [r | 0x40, g | 0x40, b | 0x40];
        let to = [r / 2, g / 2, b / 2];
        Some(gradient_tile(SHELL_ICON_SIZE, 24.0, from, to))
    }
}
