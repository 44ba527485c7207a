use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::config::AppConfig;
use crate::error::{StoreError, ValidationError};
use crate::model::{Document, DocumentPatch, Entry, Settings};

const PRESET_KEYS: [&str; 3] = ["entries", "settings", "apps"];

/// Owns the launcher document and its file. Every mutation is written to disk before
/// the call returns.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: Document,
}

impl ConfigStore {
    pub fn load(config: &AppConfig) -> Self {
        Self::open(config.config_path())
    }

    /// Read `path` and merge it onto the default document.
    ///
    /// A missing file is created with the defaults. An unreadable or unparsable file is
    /// logged and replaced by the defaults; its previous content is not kept.
    pub fn open(path: &Path) -> Self {
        let (document, persist) = match fs::read_to_string(path) {
            Ok(text) => match Document::from_json(&text) {
                Ok(document) => {
                    let outdated = needs_rewrite(&text, &document);
                    if outdated {
                        tracing::info!(path = %path.display(), "upgrading config layout");
                    }
                    (document, outdated)
                }
                Err(source) => {
                    let err = StoreError::Parse {
                        path: path.to_path_buf(),
                        source,
                    };
                    tracing::error!(error = %err, "config unreadable, resetting to defaults");
                    (Document::default(), true)
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config yet, writing defaults");
                (Document::default(), true)
            }
            Err(source) => {
                let err = StoreError::io(path, source);
                tracing::error!(error = %err, "config unreadable, resetting to defaults");
                (Document::default(), true)
            }
        };

        let store = Self {
            path: path.to_path_buf(),
            document,
        };
        if persist {
            if let Err(err) = store.save() {
                tracing::error!(error = %err, "failed to persist default config");
            }
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn entries(&self) -> &[Entry] {
        &self.document.entries
    }

    pub fn settings(&self) -> &Settings {
        &self.document.settings
    }

    /// Write the whole document through a sibling temp file that replaces the target.
    pub fn save(&self) -> Result<(), StoreError> {
        let result = self.write_atomically();
        if let Err(err) = &result {
            tracing::error!(error = %err, "config save failed");
        }
        result
    }

    fn write_atomically(&self) -> Result<(), StoreError> {
        let bytes = to_pretty_json(&self.document)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|err| StoreError::io(&dir, err))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(|err| StoreError::io(&dir, err))?;
        temp.write_all(&bytes)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|err| StoreError::io(temp.path(), err))?;
        temp.persist(&self.path)
            .map_err(|err| StoreError::io(&self.path, err.error))?;
        Ok(())
    }

    pub fn set_entries(&mut self, entries: Vec<Entry>) -> Result<(), StoreError> {
        self.document.entries = entries;
        self.save()
    }

    /// Read one settings key, falling back to `default` when it is absent or has another
    /// type.
    pub fn get_setting<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        serde_json::to_value(&self.document.settings)
            .ok()
            .and_then(|mut value| value.get_mut(key).map(Value::take))
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or(default)
    }

    /// Assign one settings key. Unknown keys are stored alongside the known ones; a known
    /// key given a value of another type is refused and nothing is written.
    pub fn set_setting<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.document
            .settings
            .set_value(key, value)
            .map_err(|source| StoreError::InvalidSetting {
                key: key.to_string(),
                source,
            })?;
        self.save()
    }

    /// Apply `edit` to a copy of the document and persist it. A rejected edit leaves
    /// the document untouched.
    pub fn update<T, F>(&mut self, edit: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Document) -> Result<T, ValidationError>,
    {
        let mut draft = self.document.clone();
        let outcome = edit(&mut draft)?;
        self.document = draft;
        self.save()?;
        Ok(outcome)
    }

    pub fn replace_document(&mut self, document: Document) -> Result<(), StoreError> {
        self.document = document;
        self.save()
    }

    /// Replace the document with an external preset after backing up the current one
    /// into `backup_dir`. Returns the backup path.
    pub fn import_preset(&mut self, preset: &Path, backup_dir: &Path) -> Result<PathBuf, StoreError> {
        let text = fs::read_to_string(preset).map_err(|err| StoreError::io(preset, err))?;
        let value: Value = serde_json::from_str(&text).map_err(|source| StoreError::Parse {
            path: preset.to_path_buf(),
            source,
        })?;
        let is_preset = value
            .as_object()
            .map(|object| PRESET_KEYS.iter().any(|key| object.contains_key(*key)))
            .unwrap_or(false);
        if !is_preset {
            return Err(ValidationError::InvalidPreset {
                path: preset.to_path_buf(),
            }
            .into());
        }
        let patch: DocumentPatch = serde_json::from_value(value).map_err(|source| StoreError::Parse {
            path: preset.to_path_buf(),
            source,
        })?;

        let backup = self.write_backup(backup_dir)?;
        tracing::info!(preset = %preset.display(), backup = %backup.display(), "importing preset");
        self.replace_document(Document::default().merged(patch))?;
        Ok(backup)
    }

    fn write_backup(&self, backup_dir: &Path) -> Result<PathBuf, ValidationError> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut target = backup_dir.join(format!("config_backup_{stamp}.json"));
        let mut counter = 1;
        while target.exists() {
            target = backup_dir.join(format!("config_backup_{stamp}_{counter}.json"));
            counter += 1;
        }

        let failed = |reason: String| ValidationError::BackupFailed {
            path: target.clone(),
            reason,
        };
        let bytes = to_pretty_json(&self.document).map_err(|err| failed(err.to_string()))?;
        fs::create_dir_all(backup_dir).map_err(|err| failed(err.to_string()))?;
        fs::write(&target, bytes).map_err(|err| failed(err.to_string()))?;
        Ok(target)
    }
}

/// Legacy key names and missing defaults are written back once after loading. A file
/// holding values the merge could not read is left as it is.
fn needs_rewrite(text: &str, document: &Document) -> bool {
    let (Ok(on_disk), Ok(merged)) = (
        serde_json::from_str::<Value>(text),
        serde_json::to_value(document),
    ) else {
        return false;
    };
    if on_disk == merged {
        return false;
    }
    if !preserves(&on_disk, &merged) {
        tracing::warn!("config holds unreadable values, leaving the file untouched");
        return false;
    }
    true
}

/// Whether every value of `on_disk` survives in `merged`, following legacy key names.
fn preserves(on_disk: &Value, merged: &Value) -> bool {
    match (on_disk, merged) {
        (Value::Object(disk), Value::Object(kept)) => disk.iter().all(|(key, value)| {
            kept.get(key)
                .or_else(|| legacy_rename(key).and_then(|renamed| kept.get(renamed)))
                .is_some_and(|kept| preserves(value, kept))
        }),
        (Value::Array(disk), Value::Array(kept)) => {
            disk.len() == kept.len() && disk.iter().zip(kept).all(|(a, b)| preserves(a, b))
        }
        _ => on_disk == merged,
    }
}

fn legacy_rename(key: &str) -> Option<&'static str> {
    match key {
        "apps" => Some("entries"),
        "type" => Some("kind"),
        _ => None,
    }
}

fn to_pretty_json(document: &Document) -> Result<Vec<u8>, StoreError> {
    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    document.serialize(&mut serializer)?;
    Ok(bytes)
}
