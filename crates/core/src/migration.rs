//! Startup preparation of the data directory: legacy import and bundled icon refresh.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::error::StoreError;
use crate::icons::render::default_app_icon;
use crate::icons::{APP_ICON, PROTECTED_ICONS};

const LEGACY_CONFIG_NAME: &str = "config.json";
const LEGACY_ICON_DIR: &str = "icons";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated_config: bool,
    pub migrated_icons: usize,
    pub refreshed_icons: Vec<String>,
    pub synthesized_app_icon: bool,
}

pub struct MigrationBootstrap<'a> {
    config: &'a AppConfig,
}

impl<'a> MigrationBootstrap<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    /// Safe to call on every start. Failures are logged; a partial report is returned.
    pub fn run(&self) -> MigrationReport {
        let mut report = MigrationReport::default();

        for dir in [self.config.data_dir(), self.config.icon_dir()] {
            if let Err(err) = fs::create_dir_all(dir) {
                tracing::error!(error = %StoreError::io(dir, err), "could not create data directory");
            }
        }

        if !self.config.config_path().exists() {
            if let Some(legacy) = self.legacy_dir() {
                self.import_legacy(legacy, &mut report);
            }
        }

        report.refreshed_icons = self.refresh_bundled_icons();

        let app_icon = self.config.icon_dir().join(APP_ICON);
        if !app_icon.exists() {
            match default_app_icon().save_with_format(&app_icon, image::ImageFormat::Png) {
                Ok(()) => report.synthesized_app_icon = true,
                Err(err) => {
                    tracing::warn!(path = %app_icon.display(), error = %err, "could not write default app icon")
                }
            }
        }

        tracing::debug!(?report, "migration finished");
        report
    }

    /// The legacy install directory, unless it is the managed directory itself.
    fn legacy_dir(&self) -> Option<&Path> {
        self.config
            .legacy_dir()
            .filter(|legacy| !same_dir(legacy, self.config.data_dir()))
    }

    fn import_legacy(&self, legacy: &Path, report: &mut MigrationReport) {
        let legacy_config = legacy.join(LEGACY_CONFIG_NAME);
        if legacy_config.is_file() {
            match fs::copy(&legacy_config, self.config.config_path()) {
                Ok(_) => {
                    tracing::info!(from = %legacy_config.display(), "migrated legacy config");
                    report.migrated_config = true;
                }
                Err(err) => {
                    tracing::error!(error = %StoreError::io(&legacy_config, err), "config migration failed")
                }
            }
        }

        let legacy_icons = legacy.join(LEGACY_ICON_DIR);
        let listing = match fs::read_dir(&legacy_icons) {
            Ok(listing) => listing,
            Err(_) => return,
        };
        for item in listing.filter_map(Result::ok) {
            let source = item.path();
            if !source.is_file() {
                continue;
            }
            let target = self.config.icon_dir().join(item.file_name());
            match fs::copy(&source, &target) {
                Ok(_) => report.migrated_icons += 1,
                Err(err) => {
                    tracing::error!(error = %StoreError::io(&source, err), "icon migration failed")
                }
            }
        }
    }

    /// Overwrite each bundled icon with the copy from the first candidate directory that
    /// has it.
    fn refresh_bundled_icons(&self) -> Vec<String> {
        let mut refreshed = Vec::new();
        for name in PROTECTED_ICONS {
            let Some(source) = self.find_bundled(name) else {
                continue;
            };
            let target = self.config.icon_dir().join(name);
            match fs::copy(&source, &target) {
                Ok(_) => refreshed.push(name.to_string()),
                Err(err) => {
                    tracing::warn!(error = %StoreError::io(&source, err), "bundled icon refresh failed")
                }
            }
        }
        refreshed
    }

    fn find_bundled(&self, name: &str) -> Option<PathBuf> {
        self.config
            .bundle_candidates()
            .iter()
            .filter(|dir| !same_dir(dir, self.config.icon_dir()))
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn layout() -> (TempDir, AppConfig, PathBuf) {
        let root = TempDir::new().unwrap();
        let install = root.path().join("install");
        fs::create_dir_all(&install).unwrap();
        let config = AppConfig::from_data_dir(root.path().join("data"))
            .unwrap()
            .with_install_dir(install.clone());
        (root, config, install)
    }

    #[test]
    fn creates_directories_and_default_icon() {
        let root = TempDir::new().unwrap();
        let config = AppConfig::from_data_dir(root.path().join("data")).unwrap();

        let report = MigrationBootstrap::new(&config).run();

        assert!(config.icon_dir().is_dir());
        assert!(report.synthesized_app_icon);
        assert!(config.icon_dir().join(APP_ICON).is_file());
        assert!(!report.migrated_config);
    }

    #[test]
    fn copies_legacy_config_and_icons_once() {
        let (_root, config, install) = layout();
        fs::write(install.join("config.json"), r#"{"apps": []}"#).unwrap();
        fs::create_dir_all(install.join("icons")).unwrap();
        fs::write(install.join("icons").join("auto_old.png"), b"old").unwrap();

        let first = MigrationBootstrap::new(&config).run();
        assert!(first.migrated_config);
        assert_eq!(first.migrated_icons, 1);
        assert!(config.icon_dir().join("auto_old.png").is_file());

        fs::write(config.config_path(), r#"{"entries": []}"#).unwrap();
        let second = MigrationBootstrap::new(&config).run();
        assert!(!second.migrated_config);
        assert_eq!(
            fs::read_to_string(config.config_path()).unwrap(),
            r#"{"entries": []}"#
        );
    }

    #[test]
    fn bundled_icons_are_force_updated_every_run() {
        let (_root, config, install) = layout();
        fs::create_dir_all(install.join("_internal")).unwrap();
        fs::write(install.join("_internal").join("app_icon.ico"), b"v2-ico").unwrap();
        fs::write(install.join("app_icon.png"), b"v2-png").unwrap();
        fs::create_dir_all(config.icon_dir()).unwrap();
        fs::write(config.icon_dir().join("app_icon.ico"), b"v1-ico").unwrap();
        fs::write(config.config_path(), "{}").unwrap();

        let report = MigrationBootstrap::new(&config).run();

        assert_eq!(
            report.refreshed_icons,
            vec!["app_icon.png".to_string(), "app_icon.ico".to_string()]
        );
        assert_eq!(fs::read(config.icon_dir().join("app_icon.ico")).unwrap(), b"v2-ico");
        assert_eq!(fs::read(config.icon_dir().join("app_icon.png")).unwrap(), b"v2-png");
        assert!(!report.synthesized_app_icon);
    }
}
