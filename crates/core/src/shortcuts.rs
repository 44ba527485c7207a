//! One namespace of keyboard shortcuts shared by entries and groups.
//!
//! Bindings are never stored on their own; they are rebuilt from the document each
//! time. A non-empty shortcut string belongs to at most one entry or group.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ValidationError;
use crate::model::{Document, Entry};

const MODIFIER_ORDER: [&str; 4] = ["Ctrl", "Alt", "Shift", "Meta"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutOwner {
    Entry(String),
    Group(String),
}

impl fmt::Display for ShortcutOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortcutOwner::Entry(name) => write!(f, "entry '{}'", name),
            ShortcutOwner::Group(name) => write!(f, "group '{}'", name),
        }
    }
}

/// What a pressed shortcut resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum ShortcutTarget {
    Entry(Entry),
    Group(String),
}

/// Who asks for a shortcut, so its current binding is not reported as a conflict.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exclusion<'a> {
    pub entry: Option<&'a Entry>,
    pub group: Option<&'a str>,
}

impl<'a> Exclusion<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn entry(entry: &'a Entry) -> Self {
        Self {
            entry: Some(entry),
            group: None,
        }
    }

    pub fn group(group: &'a str) -> Self {
        Self {
            entry: None,
            group: Some(group),
        }
    }
}

/// Map every bound shortcut to its owner. When two owners share a string (a document
/// edited by hand), the group wins, matching the scan order.
pub fn occupied_shortcuts(doc: &Document, exclude: Exclusion<'_>) -> BTreeMap<String, ShortcutOwner> {
    let mut occupied = BTreeMap::new();
    for entry in &doc.entries {
        if exclude.entry == Some(entry) || entry.shortcut.is_empty() {
            continue;
        }
        occupied.insert(entry.shortcut.clone(), ShortcutOwner::Entry(entry.name.clone()));
    }
    for (group, shortcut) in &doc.settings.group_shortcuts {
        if exclude.group == Some(group.as_str()) || shortcut.is_empty() {
            continue;
        }
        occupied.insert(shortcut.clone(), ShortcutOwner::Group(group.clone()));
    }
    occupied
}

/// Report the current owner of `shortcut` as a conflict the caller must confirm.
pub fn check_available(
    doc: &Document,
    shortcut: &str,
    exclude: Exclusion<'_>,
) -> Result<(), ValidationError> {
    if shortcut.is_empty() {
        return Ok(());
    }
    match occupied_shortcuts(doc, exclude).remove(shortcut) {
        Some(owner) => Err(ValidationError::ShortcutTaken {
            shortcut: shortcut.to_string(),
            owner,
        }),
        None => Ok(()),
    }
}

/// Strip `shortcut` from every entry and group holding it. The caller assigns it to the
/// new owner and persists right after. Returns whether anything was evicted.
pub fn claim(doc: &mut Document, shortcut: &str) -> bool {
    if shortcut.is_empty() {
        return false;
    }
    let mut evicted = false;
    for entry in doc.entries.iter_mut().filter(|entry| entry.shortcut == shortcut) {
        tracing::debug!(entry = entry.name.as_str(), shortcut, "evicting entry shortcut");
        entry.shortcut.clear();
        evicted = true;
    }
    let before = doc.settings.group_shortcuts.len();
    doc.settings
        .group_shortcuts
        .retain(|_, bound| bound.as_str() != shortcut);
    evicted || doc.settings.group_shortcuts.len() != before
}

/// Entries take precedence over groups.
pub fn resolve(doc: &Document, shortcut: &str) -> Option<ShortcutTarget> {
    if shortcut.is_empty() {
        return None;
    }
    if let Some(entry) = doc.entries.iter().find(|entry| entry.shortcut == shortcut) {
        return Some(ShortcutTarget::Entry(entry.clone()));
    }
    doc.settings
        .group_shortcuts
        .iter()
        .find(|(_, bound)| bound.as_str() == shortcut)
        .map(|(group, _)| ShortcutTarget::Group(group.clone()))
}

/// Canonicalise a chord such as `alt+ctrl+k` into `Ctrl+Alt+K`.
///
/// A `+` standing where a key is expected is the plus key, so `Ctrl++` is Ctrl and Plus.
/// A chord needs exactly one non-modifier key. Chords using the Meta (Windows/Command)
/// modifier and `Alt+F4` are reserved.
pub fn normalize(raw: &str) -> Result<String, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(String::new());
    }
    let invalid = || ValidationError::InvalidShortcut(raw.to_string());

    let mut modifiers: Vec<&'static str> = Vec::new();
    let mut key: Option<String> = None;
    for part in split_chord(raw) {
        match canonical_modifier(part) {
            Some(modifier) => {
                if !modifiers.contains(&modifier) {
                    modifiers.push(modifier);
                }
            }
            None if key.is_some() => return Err(invalid()),
            None => key = Some(canonical_key(part)),
        }
    }
    modifiers.sort_by_key(|modifier| MODIFIER_ORDER.iter().position(|m| m == modifier));

    let key = key.ok_or_else(invalid)?;
    let reserved = modifiers.contains(&"Meta") || (modifiers.contains(&"Alt") && key == "F4");
    let mut chord: Vec<String> = modifiers.iter().map(|m| m.to_string()).collect();
    chord.push(key);
    let chord = chord.join("+");
    if reserved {
        return Err(ValidationError::ReservedShortcut(chord));
    }
    Ok(chord)
}

fn split_chord(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = raw.trim();
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('+') {
            parts.push("+");
            let after = after.trim_start();
            rest = after.strip_prefix('+').unwrap_or(after).trim_start();
            continue;
        }
        match rest.find('+') {
            Some(at) => {
                parts.push(rest[..at].trim());
                rest = rest[at + 1..].trim_start();
            }
            None => {
                parts.push(rest.trim());
                break;
            }
        }
    }
    parts
}

fn canonical_modifier(part: &str) -> Option<&'static str> {
    match part.to_ascii_lowercase().as_str() {
        "ctrl" | "control" => Some("Ctrl"),
        "alt" | "option" | "opt" => Some("Alt"),
        "shift" => Some("Shift"),
        "meta" | "win" | "super" | "cmd" | "command" => Some("Meta"),
        _ => None,
    }
}

fn canonical_key(part: &str) -> String {
    let mut chars = part.chars();
    match (chars.next(), chars.next()) {
        (Some(only), None) => only.to_uppercase().collect(),
        _ => {
            let lower = part.to_ascii_lowercase();
            if lower.len() > 1 && lower.starts_with('f') && lower[1..].chars().all(|c| c.is_ascii_digit()) {
                return lower.to_ascii_uppercase();
            }
            let mut out = String::with_capacity(part.len());
            let mut rest = lower.chars();
            if let Some(first) = rest.next() {
                out.extend(first.to_uppercase());
                out.extend(rest);
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entry;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn entry_with(name: &str, shortcut: &str) -> Entry {
        let mut entry = Entry::new(name, "Home", format!("/bin/{name}"));
        entry.shortcut = shortcut.to_string();
        entry
    }

    fn sample_doc() -> Document {
        let mut doc = Document::default();
        doc.entries.push(entry_with("term", "Ctrl+Alt+1"));
        doc.entries.push(entry_with("mail", ""));
        doc.settings
            .group_shortcuts
            .insert("Work".into(), "Ctrl+Alt+2".into());
        doc
    }

    #[test]
    fn occupied_lists_entries_and_groups() {
        let doc = sample_doc();
        let occupied = occupied_shortcuts(&doc, Exclusion::none());
        assert_eq!(occupied.len(), 2);
        assert_eq!(
            occupied.get("Ctrl+Alt+1"),
            Some(&ShortcutOwner::Entry("term".into()))
        );
        assert_eq!(
            occupied.get("Ctrl+Alt+2"),
            Some(&ShortcutOwner::Group("Work".into()))
        );
    }

    #[test]
    fn exclusions_skip_the_editor_own_binding() {
        let doc = sample_doc();
        let term = doc.entries[0].clone();
        assert!(check_available(&doc, "Ctrl+Alt+1", Exclusion::entry(&term)).is_ok());
        assert!(check_available(&doc, "Ctrl+Alt+2", Exclusion::group("Work")).is_ok());
        assert_eq!(
            check_available(&doc, "Ctrl+Alt+2", Exclusion::entry(&term)),
            Err(ValidationError::ShortcutTaken {
                shortcut: "Ctrl+Alt+2".into(),
                owner: ShortcutOwner::Group("Work".into()),
            })
        );
    }

    #[test]
    fn claim_then_assign_leaves_one_owner() {
        let mut doc = sample_doc();
        doc.settings
            .group_shortcuts
            .insert("Play".into(), "Ctrl+Alt+1".into());

        assert!(claim(&mut doc, "Ctrl+Alt+1"));
        doc.entries[1].shortcut = "Ctrl+Alt+1".into();

        let holders: Vec<&str> = doc
            .entries
            .iter()
            .filter(|e| e.shortcut == "Ctrl+Alt+1")
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(holders, vec!["mail"]);
        assert!(doc.entries[0].shortcut.is_empty());
        assert!(!doc.settings.group_shortcuts.contains_key("Play"));
        assert!(doc.settings.group_shortcuts.contains_key("Work"));
    }

    #[test]
    fn claim_of_empty_or_unbound_shortcut_is_a_no_op() {
        let mut doc = sample_doc();
        let before = doc.clone();
        assert!(!claim(&mut doc, ""));
        assert!(!claim(&mut doc, "Ctrl+Q"));
        assert_eq!(doc, before);
    }

    #[test]
    fn resolve_prefers_entries_over_groups() {
        let mut doc = sample_doc();
        doc.settings
            .group_shortcuts
            .insert("Dup".into(), "Ctrl+Alt+1".into());
        match resolve(&doc, "Ctrl+Alt+1") {
            Some(ShortcutTarget::Entry(entry)) => assert_eq!(entry.name, "term"),
            other => panic!("expected entry, got {other:?}"),
        }
        assert_eq!(
            resolve(&doc, "Ctrl+Alt+2"),
            Some(ShortcutTarget::Group("Work".into()))
        );
        assert_eq!(resolve(&doc, ""), None);
    }

    #[rstest]
    #[case("ctrl+alt+1", "Ctrl+Alt+1")]
    #[case("Alt + Control + k", "Ctrl+Alt+K")]
    #[case("shift+f5", "Shift+F5")]
    #[case("ctrl+space", "Ctrl+Space")]
    #[case("", "")]
    #[case("Ctrl++", "Ctrl++")]
    #[case("ctrl + +", "Ctrl++")]
    #[case("+", "+")]
    fn normalize_canonicalises_chords(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("win+d")]
    #[case("alt+f4")]
    #[case("cmd++")]
    fn normalize_rejects_reserved_chords(#[case] raw: &str) {
        assert!(matches!(
            normalize(raw),
            Err(ValidationError::ReservedShortcut(_))
        ));
    }

    #[rstest]
    #[case("a+b")]
    #[case("ctrl+k+j")]
    #[case("ctrl+shift")]
    #[case("Ctrl+")]
    fn normalize_rejects_malformed_chords(#[case] raw: &str) {
        assert_eq!(
            normalize(raw),
            Err(ValidationError::InvalidShortcut(raw.to_string()))
        );
    }
}
