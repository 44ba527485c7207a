//! Group (tab) ordering and the document edits that keep entries, group shortcuts and
//! the persisted order in step.

use std::collections::BTreeSet;

use crate::error::ValidationError;
use crate::model::{Document, Entry, HOME_GROUP};

/// Derive the effective tab order from the entries and the persisted order.
///
/// Persisted names are kept in place, including groups that currently hold no
/// entries. Groups with entries that the persisted order does not mention are
/// appended in lexicographic order. Never returns an empty list.
pub fn reconcile_order(entries: &[Entry], persisted: &[String]) -> Vec<String> {
    let present: BTreeSet<&str> = entries.iter().map(Entry::group_name).collect();

    let mut seen = BTreeSet::new();
    let mut order = Vec::with_capacity(persisted.len() + present.len());
    for name in persisted {
        if name.trim().is_empty() || !seen.insert(name.as_str()) {
            continue;
        }
        order.push(name.clone());
    }

    // BTreeSet iteration is already sorted.
    for name in present {
        if seen.insert(name) {
            order.push(name.to_string());
        }
    }

    if order.is_empty() {
        order.push(HOME_GROUP.to_string());
    }
    order
}

pub fn group_names(doc: &Document) -> Vec<String> {
    reconcile_order(&doc.entries, &doc.settings.group_order)
}

pub fn contains_group(doc: &Document, name: &str) -> bool {
    group_names(doc).iter().any(|group| group == name)
}

/// Add an empty group at the end of the order.
pub fn add_group(doc: &mut Document, name: &str) -> Result<(), ValidationError> {
    let name = clean_name(name)?;
    if contains_group(doc, &name) {
        return Err(ValidationError::GroupExists(name));
    }
    doc.settings.group_order = group_names(doc);
    doc.settings.group_order.push(name);
    Ok(())
}

/// Rename a group everywhere it is referenced.
pub fn rename_group(doc: &mut Document, old: &str, new: &str) -> Result<(), ValidationError> {
    let new = clean_name(new)?;
    if old == new {
        return Ok(());
    }
    if !contains_group(doc, old) {
        return Err(ValidationError::GroupNotFound(old.to_string()));
    }
    if contains_group(doc, &new) {
        return Err(ValidationError::GroupExists(new));
    }

    for entry in doc.entries.iter_mut().filter(|entry| entry.group_name() == old) {
        entry.group = new.clone();
    }
    if let Some(shortcut) = doc.settings.group_shortcuts.remove(old) {
        doc.settings.group_shortcuts.insert(new.clone(), shortcut);
    }
    for slot in doc.settings.group_order.iter_mut().filter(|slot| slot.as_str() == old) {
        *slot = new.clone();
    }
    Ok(())
}

/// Remove a group with its entries, shortcut and order slot. Returns the removed
/// entries so their icons can be garbage-collected.
pub fn delete_group(doc: &mut Document, name: &str) -> Result<Vec<Entry>, ValidationError> {
    if !contains_group(doc, name) {
        return Err(ValidationError::GroupNotFound(name.to_string()));
    }
    let (removed, kept): (Vec<Entry>, Vec<Entry>) = doc
        .entries
        .drain(..)
        .partition(|entry| entry.group_name() == name);
    doc.entries = kept;
    doc.settings.group_shortcuts.remove(name);
    doc.settings.group_order.retain(|slot| slot != name);
    Ok(removed)
}

/// Persist an explicit order (tab drag). Groups missing from `order` are re-appended by
/// the next reconciliation.
pub fn reorder_groups(doc: &mut Document, order: Vec<String>) {
    doc.settings.group_order = order;
    doc.settings.group_order = group_names(doc);
}

/// Move the tab at `from` to position `to`.
pub fn move_group(doc: &mut Document, from: usize, to: usize) -> Result<(), ValidationError> {
    let mut order = group_names(doc);
    if from >= order.len() {
        return Err(ValidationError::GroupNotFound(format!("#{from}")));
    }
    let name = order.remove(from);
    let to = to.min(order.len());
    order.insert(to, name);
    doc.settings.group_order = order;
    Ok(())
}

fn clean_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}
