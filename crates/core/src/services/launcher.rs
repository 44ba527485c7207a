use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::error::{StoreError, ValidationError};
use crate::groups;
use crate::icons::{url_domain, IconAssetManager, IconImage};
use crate::launch::{ActionLauncher, SystemLauncher};
use crate::model::{group_or_home, Document, Entry, WindowGeometry};
use crate::shortcuts::{self, Exclusion, ShortcutTarget};
use crate::store::ConfigStore;

const COPY_SUFFIX: &str = " (copy)";
const UNTITLED_LINK: &str = "New Link";

/// What to do when a requested shortcut already has an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortcutPolicy {
    /// Fail with [`ValidationError::ShortcutTaken`] so the caller can ask the user.
    #[default]
    Reject,
    /// Take the shortcut from its current owner.
    Steal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupTab {
    pub name: String,
    pub shortcut: Option<String>,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    Launched { entry: Entry, started: bool },
    FocusGroup(String),
}

pub struct LauncherService {
    config: AppConfig,
    store: ConfigStore,
    icons: IconAssetManager,
    launcher: Box<dyn ActionLauncher>,
}

impl LauncherService {
    pub fn new(config: AppConfig) -> Self {
        let icons = IconAssetManager::new(&config);
        Self::with_parts(config, icons, Box::new(SystemLauncher))
    }

    pub fn with_parts(
        config: AppConfig,
        icons: IconAssetManager,
        launcher: Box<dyn ActionLauncher>,
    ) -> Self {
        let store = ConfigStore::load(&config);
        Self {
            config,
            store,
            icons,
            launcher,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        self.store.document()
    }

    pub fn entries(&self) -> &[Entry] {
        self.store.entries()
    }

    pub fn icons(&self) -> &IconAssetManager {
        &self.icons
    }

    /// Look an entry up by name, optionally within one group.
    pub fn find_entry(&self, name: &str, group: Option<&str>) -> Result<Entry, ValidationError> {
        self.entries()
            .iter()
            .find(|entry| {
                entry.name == name && group.map_or(true, |group| entry.group_name() == group)
            })
            .cloned()
            .ok_or_else(|| ValidationError::EntryNotFound(name.to_string()))
    }

    /// Reconciled tabs with their entries. Persists the order when reconciliation
    /// changed it.
    pub fn tabs(&mut self) -> Result<Vec<GroupTab>, StoreError> {
        let order = groups::group_names(self.document());
        if order != self.document().settings.group_order {
            tracing::debug!(?order, "persisting reconciled group order");
            self.store.set_setting("group_order", &order)?;
        }

        let document = self.document();
        Ok(order
            .into_iter()
            .map(|name| GroupTab {
                shortcut: document.group_shortcut(&name).map(str::to_string),
                entries: document
                    .entries
                    .iter()
                    .filter(|entry| entry.group_name() == name)
                    .cloned()
                    .collect(),
                name,
            })
            .collect())
    }

    pub fn add_entry(&mut self, mut entry: Entry, policy: ShortcutPolicy) -> Result<Entry, StoreError> {
        prepare(&mut entry)?;
        let added = self.store.update(|doc| {
            bind_shortcut(doc, &entry.shortcut, Exclusion::none(), policy)?;
            doc.entries.push(entry.clone());
            Ok(entry)
        })?;
        tracing::info!(entry = added.name.as_str(), group = added.group.as_str(), "added entry");
        Ok(added)
    }

    /// Replace `original` with `updated`. A replaced icon is collected when nothing else
    /// uses it.
    pub fn edit_entry(
        &mut self,
        original: &Entry,
        mut updated: Entry,
        policy: ShortcutPolicy,
    ) -> Result<Entry, StoreError> {
        prepare(&mut updated)?;
        let saved = self.store.update(|doc| {
            let index = doc
                .find_entry(original)
                .ok_or_else(|| ValidationError::EntryNotFound(original.name.clone()))?;
            bind_shortcut(doc, &updated.shortcut, Exclusion::entry(original), policy)?;
            doc.entries[index] = updated.clone();
            Ok(updated)
        })?;
        if original.icon != saved.icon {
            self.icons.delete_if_unused(&original.icon, self.store.entries());
        }
        Ok(saved)
    }

    pub fn delete_entry(&mut self, entry: &Entry) -> Result<Entry, StoreError> {
        let removed = self.store.update(|doc| {
            let index = doc
                .find_entry(entry)
                .ok_or_else(|| ValidationError::EntryNotFound(entry.name.clone()))?;
            Ok(doc.entries.remove(index))
        })?;
        self.icons.delete_if_unused(&removed.icon, self.store.entries());
        tracing::info!(entry = removed.name.as_str(), "deleted entry");
        Ok(removed)
    }

    /// Duplicate an entry right after itself, without its shortcut.
    pub fn copy_entry(&mut self, entry: &Entry) -> Result<Entry, StoreError> {
        self.store.update(|doc| {
            let index = doc
                .find_entry(entry)
                .ok_or_else(|| ValidationError::EntryNotFound(entry.name.clone()))?;
            let mut copy = doc.entries[index].clone();
            copy.name.push_str(COPY_SUFFIX);
            copy.shortcut.clear();
            doc.entries.insert(index + 1, copy.clone());
            Ok(copy)
        })
    }

    pub fn swap_entries(&mut self, first: &Entry, second: &Entry) -> Result<(), StoreError> {
        if first == second {
            return Ok(());
        }
        self.store.update(|doc| {
            let a = doc
                .find_entry(first)
                .ok_or_else(|| ValidationError::EntryNotFound(first.name.clone()))?;
            let b = doc
                .find_entry(second)
                .ok_or_else(|| ValidationError::EntryNotFound(second.name.clone()))?;
            doc.entries.swap(a, b);
            Ok(())
        })
    }

    /// Reassign an entry to another group, keeping its list position.
    pub fn move_entry(&mut self, entry: &Entry, group: &str) -> Result<Entry, StoreError> {
        let target = group_or_home(group).trim().to_string();
        if entry.group_name() == target {
            return Ok(entry.clone());
        }
        self.store.update(|doc| {
            let index = doc
                .find_entry(entry)
                .ok_or_else(|| ValidationError::EntryNotFound(entry.name.clone()))?;
            doc.entries[index].group = target;
            Ok(doc.entries[index].clone())
        })
    }

    /// Pre-filled entry for a dropped file or folder. Not stored.
    pub fn draft_from_path(&mut self, path: &Path, group: &str) -> Entry {
        let name = path
            .file_stem()
            .or_else(|| path.file_name())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut entry = Entry::new(name, group, path.display().to_string());
        entry.icon = self.icons.extract_system_icon(path).unwrap_or_default();
        entry
    }

    /// Pre-filled entry for a dropped link. Not stored.
    pub fn draft_from_url(&mut self, url: &str, group: &str) -> Entry {
        let name = url_domain(url).unwrap_or_else(|| UNTITLED_LINK.to_string());
        let mut entry = Entry::new(name, group, url.trim());
        entry.icon = self.icons.fetch_remote_icon(url).unwrap_or_default();
        entry
    }

    pub fn add_group(&mut self, name: &str) -> Result<(), StoreError> {
        self.store.update(|doc| groups::add_group(doc, name))
    }

    pub fn rename_group(&mut self, old: &str, new: &str) -> Result<(), StoreError> {
        self.store.update(|doc| groups::rename_group(doc, old, new))
    }

    /// Delete a group and everything in it. Icons only its entries used are collected.
    pub fn delete_group(&mut self, name: &str) -> Result<Vec<Entry>, StoreError> {
        let removed = self.store.update(|doc| groups::delete_group(doc, name))?;
        for entry in &removed {
            self.icons.delete_if_unused(&entry.icon, self.store.entries());
        }
        tracing::info!(group = name, entries = removed.len(), "deleted group");
        Ok(removed)
    }

    pub fn reorder_groups(&mut self, order: Vec<String>) -> Result<Vec<String>, StoreError> {
        self.store.update(|doc| {
            groups::reorder_groups(doc, order);
            Ok(doc.settings.group_order.clone())
        })
    }

    pub fn move_group(&mut self, from: usize, to: usize) -> Result<Vec<String>, StoreError> {
        self.store.update(|doc| {
            groups::move_group(doc, from, to)?;
            Ok(doc.settings.group_order.clone())
        })
    }

    /// Bind `shortcut` to a group. An empty shortcut clears the binding.
    pub fn set_group_shortcut(
        &mut self,
        group: &str,
        shortcut: &str,
        policy: ShortcutPolicy,
    ) -> Result<Option<String>, StoreError> {
        let shortcut = shortcuts::normalize(shortcut)?;
        self.store.update(|doc| {
            if !groups::contains_group(doc, group) {
                return Err(ValidationError::GroupNotFound(group.to_string()));
            }
            if shortcut.is_empty() {
                doc.settings.group_shortcuts.remove(group);
                return Ok(None);
            }
            bind_shortcut(doc, &shortcut, Exclusion::group(group), policy)?;
            doc.settings
                .group_shortcuts
                .insert(group.to_string(), shortcut.clone());
            Ok(Some(shortcut))
        })
    }

    pub fn resolve(&self, shortcut: &str) -> Option<ShortcutTarget> {
        let shortcut = shortcuts::normalize(shortcut).ok()?;
        shortcuts::resolve(self.document(), &shortcut)
    }

    /// Launch the entry owning `shortcut`, or name the group to focus.
    pub fn activate(&self, shortcut: &str) -> Option<Activation> {
        match self.resolve(shortcut)? {
            ShortcutTarget::Entry(entry) => {
                let started = self.launch_entry(&entry);
                Some(Activation::Launched { entry, started })
            }
            ShortcutTarget::Group(group) => Some(Activation::FocusGroup(group)),
        }
    }

    pub fn launch_entry(&self, entry: &Entry) -> bool {
        self.launcher.launch(&entry.action)
    }

    pub fn set_always_on_top(&mut self, pinned: bool) -> Result<(), StoreError> {
        self.store.set_setting("always_on_top", pinned)
    }

    /// Store the window rectangle. Extra keys already on the stored geometry are kept.
    pub fn save_window_geometry(&mut self, mut geometry: WindowGeometry) -> Result<(), StoreError> {
        let mut extra = self.store.settings().window_geometry.extra.clone();
        extra.append(&mut geometry.extra);
        geometry.extra = extra;
        self.store.set_setting("window_geometry", geometry)
    }

    /// Replace the whole document with a preset file. Returns where the previous
    /// document was backed up.
    pub fn import_preset(&mut self, preset: &Path) -> Result<PathBuf, StoreError> {
        self.store.import_preset(preset, &self.config.backup_dir())
    }

    pub fn import_icon(&mut self, source: &Path) -> Result<String, StoreError> {
        self.icons.import(source)
    }

    /// Drop an asset nothing refers to, such as an import whose edit was refused.
    pub fn discard_icon(&mut self, name: &str) -> bool {
        self.icons.delete_if_unused(name, self.store.entries())
    }

    pub fn collect_garbage(&mut self) -> Vec<String> {
        self.icons.collect_garbage(self.store.entries())
    }

    pub fn render_icon(&mut self, entry: &Entry) -> &IconImage {
        self.icons.render(&entry.icon, &entry.name)
    }
}

fn prepare(entry: &mut Entry) -> Result<(), ValidationError> {
    if entry.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    entry.normalize_group();
    entry.shortcut = shortcuts::normalize(&entry.shortcut)?;
    Ok(())
}

/// Free `shortcut` for a new owner. The caller assigns it in the same edit.
fn bind_shortcut(
    doc: &mut Document,
    shortcut: &str,
    exclude: Exclusion<'_>,
    policy: ShortcutPolicy,
) -> Result<(), ValidationError> {
    if shortcut.is_empty() {
        return Ok(());
    }
    if policy == ShortcutPolicy::Reject {
        shortcuts::check_available(doc, shortcut, exclude)?;
    }
    if shortcuts::claim(doc, shortcut) {
        tracing::info!(shortcut, "shortcut reassigned");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::{FaviconSource, TileIconProvider};
    use crate::shortcuts::ShortcutOwner;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct OfflineFavicons;

    impl FaviconSource for OfflineFavicons {
        fn fetch(&self, _domain: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::Network("offline".into()))
        }
    }

    #[derive(Default, Clone)]
    struct RecordingLauncher {
        launched: Rc<RefCell<Vec<String>>>,
    }

    impl ActionLauncher for RecordingLauncher {
        fn launch(&self, action: &str) -> bool {
            self.launched.borrow_mut().push(action.to_string());
            true
        }
    }

    fn service() -> (LauncherService, RecordingLauncher, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).unwrap();
        let icons = IconAssetManager::with_sources(
            config.icon_dir().to_path_buf(),
            Box::new(OfflineFavicons),
            Box::new(TileIconProvider),
        );
        let launcher = RecordingLauncher::default();
        let service = LauncherService::with_parts(config, icons, Box::new(launcher.clone()));
        (service, launcher, dir)
    }

    fn entry(name: &str, group: &str, shortcut: &str) -> Entry {
        let mut entry = Entry::new(name, group, format!("/usr/bin/{name}"));
        entry.shortcut = shortcut.to_string();
        entry
    }

    fn reload(service: &LauncherService) -> Document {
        ConfigStore::load(service.config()).document().clone()
    }

    #[test]
    fn second_claim_of_a_shortcut_wins() {
        let (mut service, _, _dir) = service();
        service
            .add_entry(entry("term", "Home", "Ctrl+Alt+1"), ShortcutPolicy::Steal)
            .unwrap();
        service
            .add_entry(entry("mail", "Home", "ctrl+alt+1"), ShortcutPolicy::Steal)
            .unwrap();

        let doc = reload(&service);
        let holders: Vec<&str> = doc
            .entries
            .iter()
            .filter(|e| e.shortcut == "Ctrl+Alt+1")
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(holders, vec!["mail"]);
        assert_eq!(doc.entries[0].shortcut, "");
    }

    #[test]
    fn rejecting_policy_reports_the_owner() {
        let (mut service, _, _dir) = service();
        service
            .add_entry(entry("term", "Home", "Ctrl+Alt+1"), ShortcutPolicy::Reject)
            .unwrap();

        let err = service
            .add_entry(entry("mail", "Home", "Ctrl+Alt+1"), ShortcutPolicy::Reject)
            .unwrap_err();

        assert_eq!(
            err.validation(),
            Some(&ValidationError::ShortcutTaken {
                shortcut: "Ctrl+Alt+1".into(),
                owner: ShortcutOwner::Entry("term".into()),
            })
        );
        assert_eq!(service.entries().len(), 1);
    }

    #[test]
    fn editing_keeps_own_shortcut_without_conflict() {
        let (mut service, _, _dir) = service();
        let term = service
            .add_entry(entry("term", "Home", "Ctrl+T"), ShortcutPolicy::Reject)
            .unwrap();
        let mut updated = term.clone();
        updated.action = "/usr/bin/kitty".into();

        let saved = service
            .edit_entry(&term, updated, ShortcutPolicy::Reject)
            .unwrap();

        assert_eq!(saved.shortcut, "Ctrl+T");
        assert_eq!(reload(&service).entries, vec![saved]);
    }

    #[test]
    fn entry_shortcut_steals_from_group() {
        let (mut service, _, _dir) = service();
        service.add_group("Work").unwrap();
        service
            .set_group_shortcut("Work", "Ctrl+2", ShortcutPolicy::Reject)
            .unwrap();

        service
            .add_entry(entry("term", "Home", "Ctrl+2"), ShortcutPolicy::Steal)
            .unwrap();

        assert_eq!(service.document().group_shortcut("Work"), None);
        assert!(matches!(
            service.resolve("ctrl+2"),
            Some(ShortcutTarget::Entry(e)) if e.name == "term"
        ));
    }

    #[test]
    fn deleting_one_user_of_a_shared_icon_keeps_the_file() {
        let (mut service, _, _dir) = service();
        let icon_dir = service.config().icon_dir().to_path_buf();
        fs::create_dir_all(&icon_dir).unwrap();
        fs::write(icon_dir.join("auto_example.png"), b"png").unwrap();

        let mut first = entry("one", "Home", "");
        first.icon = "auto_example.png".into();
        let mut second = entry("two", "Home", "");
        second.icon = "auto_example.png".into();
        let first = service.add_entry(first, ShortcutPolicy::Reject).unwrap();
        let second = service.add_entry(second, ShortcutPolicy::Reject).unwrap();

        service.delete_entry(&first).unwrap();
        assert!(icon_dir.join("auto_example.png").exists());

        service.delete_entry(&second).unwrap();
        assert!(!icon_dir.join("auto_example.png").exists());
    }

    #[test]
    fn replacing_an_icon_collects_the_old_one() {
        let (mut service, _, dir) = service();
        let source = dir.path().join("logo.png");
        fs::write(&source, b"png").unwrap();
        let imported = service.import_icon(&source).unwrap();

        let mut original = entry("docs", "Home", "");
        original.icon = imported.clone();
        let original = service.add_entry(original, ShortcutPolicy::Reject).unwrap();
        let mut updated = original.clone();
        updated.icon.clear();
        service
            .edit_entry(&original, updated, ShortcutPolicy::Reject)
            .unwrap();

        assert!(!service.icons().asset_path(&imported).exists());
    }

    #[test]
    fn copy_lands_after_source_without_shortcut() {
        let (mut service, _, _dir) = service();
        let term = service
            .add_entry(entry("term", "Home", "Ctrl+T"), ShortcutPolicy::Reject)
            .unwrap();
        service
            .add_entry(entry("mail", "Home", ""), ShortcutPolicy::Reject)
            .unwrap();

        let copy = service.copy_entry(&term).unwrap();

        assert_eq!(copy.name, "term (copy)");
        assert_eq!(copy.shortcut, "");
        let names: Vec<&str> = service.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["term", "term (copy)", "mail"]);
    }

    #[test]
    fn swap_and_move_reorder_entries() {
        let (mut service, _, _dir) = service();
        let a = service
            .add_entry(entry("a", "Home", ""), ShortcutPolicy::Reject)
            .unwrap();
        let b = service
            .add_entry(entry("b", "Home", ""), ShortcutPolicy::Reject)
            .unwrap();

        service.swap_entries(&a, &b).unwrap();
        let moved = service.move_entry(&a, "Work").unwrap();

        let doc = reload(&service);
        assert_eq!(doc.entries[0].name, "b");
        assert_eq!(doc.entries[1], moved);
        assert_eq!(moved.group, "Work");
    }

    #[test]
    fn missing_entries_are_reported() {
        let (mut service, _, _dir) = service();
        let ghost = entry("ghost", "Home", "");
        assert!(matches!(
            service.delete_entry(&ghost).unwrap_err().validation(),
            Some(ValidationError::EntryNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn tabs_persist_reconciled_order() {
        let (mut service, _, _dir) = service();
        service
            .add_entry(entry("x", "Zeta", ""), ShortcutPolicy::Reject)
            .unwrap();
        service
            .add_entry(entry("y", "Alpha", ""), ShortcutPolicy::Reject)
            .unwrap();

        let tabs = service.tabs().unwrap();

        let names: Vec<&str> = tabs.iter().map(|tab| tab.name.as_str()).collect();
        assert_eq!(names, vec!["Home", "Alpha", "Zeta"]);
        assert!(tabs[0].entries.is_empty());
        assert_eq!(tabs[2].entries[0].name, "x");
        assert_eq!(
            reload(&service).settings.group_order,
            vec!["Home".to_string(), "Alpha".to_string(), "Zeta".to_string()]
        );
    }

    #[test]
    fn deleting_a_group_drops_its_entries_and_icons() {
        let (mut service, _, _dir) = service();
        let icon_dir = service.config().icon_dir().to_path_buf();
        fs::create_dir_all(&icon_dir).unwrap();
        fs::write(icon_dir.join("auto_work.png"), b"png").unwrap();
        let mut mail = entry("mail", "Work", "");
        mail.icon = "auto_work.png".into();
        service.add_entry(mail, ShortcutPolicy::Reject).unwrap();
        service
            .add_entry(entry("music", "Home", ""), ShortcutPolicy::Reject)
            .unwrap();
        service
            .set_group_shortcut("Work", "Ctrl+W", ShortcutPolicy::Reject)
            .unwrap();

        let removed = service.delete_group("Work").unwrap();

        assert_eq!(removed.len(), 1);
        assert!(!icon_dir.join("auto_work.png").exists());
        let doc = reload(&service);
        assert_eq!(doc.entries.len(), 1);
        assert!(doc.settings.group_shortcuts.is_empty());
    }

    #[test]
    fn activation_launches_entries_and_focuses_groups() {
        let (mut service, launcher, _dir) = service();
        service
            .add_entry(entry("term", "Home", "Ctrl+Alt+T"), ShortcutPolicy::Reject)
            .unwrap();
        service.add_group("Work").unwrap();
        service
            .set_group_shortcut("Work", "Ctrl+Alt+W", ShortcutPolicy::Reject)
            .unwrap();

        assert!(matches!(
            service.activate("alt+ctrl+t"),
            Some(Activation::Launched { started: true, .. })
        ));
        assert_eq!(
            service.activate("Ctrl+Alt+W"),
            Some(Activation::FocusGroup("Work".into()))
        );
        assert_eq!(service.activate("Ctrl+Alt+Q"), None);
        assert_eq!(
            launcher.launched.borrow().as_slice(),
            ["/usr/bin/term".to_string()]
        );
    }

    #[test]
    fn reserved_shortcuts_are_refused() {
        let (mut service, _, _dir) = service();
        let err = service
            .add_entry(entry("x", "Home", "Win+E"), ShortcutPolicy::Steal)
            .unwrap_err();
        assert!(matches!(
            err.validation(),
            Some(ValidationError::ReservedShortcut(_))
        ));
    }

    #[test]
    fn drafts_fill_name_and_fall_back_without_icons() {
        let (mut service, _, dir) = service();
        let script = dir.path().join("backup.sh");
        fs::write(&script, b"#!/bin/sh").unwrap();

        let from_path = service.draft_from_path(&script, "");
        assert_eq!(from_path.name, "backup");
        assert_eq!(from_path.group, "Home");
        assert_eq!(from_path.icon, "auto_backup.sh.png");

        let from_url = service.draft_from_url("https://news.example.org/today", "Web");
        assert_eq!(from_url.name, "news.example.org");
        assert_eq!(from_url.icon, "");
        assert_eq!(service.draft_from_url("mailto:me", "Web").name, UNTITLED_LINK);
        assert!(service.entries().is_empty());
    }

    #[test]
    fn entries_without_icons_render_lettered_placeholders() {
        let (mut service, _, _dir) = service();
        let mail = entry("mail", "Home", "");
        let icon = service.render_icon(&mail);
        assert_eq!(icon.glyph, Some('M'));
        assert_eq!(service.icons().cache().len(), 1);
    }

    #[test]
    fn window_state_is_persisted() {
        let (mut service, _, _dir) = service();
        service.set_always_on_top(false).unwrap();
        service
            .save_window_geometry(WindowGeometry::new(10, 20, 640, 480))
            .unwrap();

        let doc = reload(&service);
        assert!(!doc.settings.always_on_top);
        assert_eq!(doc.settings.window_geometry.rect(), Some((10, 20, 640, 480)));
    }
}
