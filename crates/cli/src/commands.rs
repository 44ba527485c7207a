use std::fmt;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use bifrost_core::{
    Activation, Entry, LauncherService, ShortcutPolicy, StoreError, ValidationError,
};

use crate::cli::{
    AddArgs, AddPathArgs, AddUrlArgs, CliCommand, EditArgs, EntryRef, GroupCommand, IconsCommand,
    MoveArgs, PinState, PresetArgs, SwapArgs,
};
use crate::config::AppConfig;

pub fn execute<W: Write>(config: &AppConfig, command: CliCommand, writer: W) -> Result<()> {
    let mut service = LauncherService::new(config.clone());
    execute_with(&mut service, command, writer)
}

pub fn execute_with<W: Write>(
    service: &mut LauncherService,
    command: CliCommand,
    mut writer: W,
) -> Result<()> {
    match command {
        CliCommand::List => handle_list(service, &mut writer),
        CliCommand::Add(args) => handle_add(service, args, &mut writer),
        CliCommand::AddPath(args) => handle_add_path(service, args, &mut writer),
        CliCommand::AddUrl(args) => handle_add_url(service, args, &mut writer),
        CliCommand::Edit(args) => handle_edit(service, args, &mut writer),
        CliCommand::Delete(target) => {
            let entry = lookup(service, &target)?;
            let removed = service.delete_entry(&entry)?;
            write_line(&mut writer, SummaryLine::Deleted(removed.name))
        }
        CliCommand::Copy(target) => {
            let entry = lookup(service, &target)?;
            let copy = service.copy_entry(&entry)?;
            write_line(&mut writer, SummaryLine::Copied(copy.name))
        }
        CliCommand::Move(args) => handle_move(service, args, &mut writer),
        CliCommand::Swap(args) => handle_swap(service, args, &mut writer),
        CliCommand::Group(command) => handle_group(service, command, &mut writer),
        CliCommand::Press(args) => match service.activate(&args.shortcut) {
            Some(Activation::Launched { entry, started }) => {
                write_line(&mut writer, SummaryLine::Launched { name: entry.name, started })
            }
            Some(Activation::FocusGroup(group)) => {
                write_line(&mut writer, SummaryLine::Focus(group))
            }
            None => write_line(&mut writer, SummaryLine::Unbound(args.shortcut)),
        },
        CliCommand::Launch(target) => {
            let entry = lookup(service, &target)?;
            let started = service.launch_entry(&entry);
            write_line(&mut writer, SummaryLine::Launched { name: entry.name, started })
        }
        CliCommand::Pin(args) => {
            let pinned = args.state == PinState::On;
            service.set_always_on_top(pinned)?;
            write_line(&mut writer, SummaryLine::Pinned(pinned))
        }
        CliCommand::Preset(args) => handle_preset(service, args, &mut writer),
        CliCommand::Icons(IconsCommand::Import { path }) => {
            let asset = import(service, &path)?;
            writeln!(writer, "{asset}")?;
            Ok(())
        }
        CliCommand::Icons(IconsCommand::Gc) => {
            let removed = service.collect_garbage();
            write_line(&mut writer, SummaryLine::Collected(removed))
        }
    }
}

fn handle_list<W: Write>(service: &mut LauncherService, mut writer: W) -> Result<()> {
    for tab in service.tabs()? {
        match &tab.shortcut {
            Some(shortcut) => writeln!(writer, "[{}] ({})", tab.name, shortcut)?,
            None => writeln!(writer, "[{}]", tab.name)?,
        }
        if tab.entries.is_empty() {
            writeln!(writer, "  (empty)")?;
        }
        for entry in &tab.entries {
            write!(writer, "  {}  {}", entry.name, entry.action)?;
            if !entry.shortcut.is_empty() {
                write!(writer, "  <{}>", entry.shortcut)?;
            }
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn handle_add<W: Write>(service: &mut LauncherService, args: AddArgs, writer: W) -> Result<()> {
    let mut entry = Entry::new(args.name, args.group, args.action);
    let imported = args.icon.as_deref().map(|path| import(service, path)).transpose()?;
    if let Some(icon) = &imported {
        entry.icon = icon.clone();
    }
    entry.shortcut = args.shortcut.unwrap_or_default();
    let added = service
        .add_entry(entry, policy(args.steal))
        .map_err(|err| discard_on_error(service, imported.as_deref(), err))?;
    write_line(writer, SummaryLine::Added(added))
}

fn handle_add_path<W: Write>(
    service: &mut LauncherService,
    args: AddPathArgs,
    writer: W,
) -> Result<()> {
    if !args.path.exists() {
        return Err(anyhow!("{} does not exist", args.path.display()));
    }
    let mut entry = service.draft_from_path(&args.path, &args.group);
    if let Some(name) = args.name {
        entry.name = name;
    }
    let added = service.add_entry(entry, ShortcutPolicy::Reject)?;
    write_line(writer, SummaryLine::Added(added))
}

fn handle_add_url<W: Write>(
    service: &mut LauncherService,
    args: AddUrlArgs,
    writer: W,
) -> Result<()> {
    let mut entry = service.draft_from_url(&args.url, &args.group);
    if let Some(name) = args.name {
        entry.name = name;
    }
    let added = service.add_entry(entry, ShortcutPolicy::Reject)?;
    write_line(writer, SummaryLine::Added(added))
}

fn handle_edit<W: Write>(service: &mut LauncherService, args: EditArgs, writer: W) -> Result<()> {
    let original = lookup(service, &args.target)?;
    let mut updated = original.clone();
    if let Some(name) = args.rename {
        updated.name = name;
    }
    if let Some(group) = args.to_group {
        updated.group = group;
    }
    if let Some(action) = args.action {
        updated.action = action;
    }
    let imported = args.icon.as_deref().map(|path| import(service, path)).transpose()?;
    if let Some(icon) = &imported {
        updated.icon = icon.clone();
    }
    if let Some(shortcut) = args.shortcut {
        updated.shortcut = shortcut;
    }
    if args.clear_shortcut {
        updated.shortcut.clear();
    }

    let saved = service
        .edit_entry(&original, updated, policy(args.steal))
        .map_err(|err| discard_on_error(service, imported.as_deref(), err))?;
    write_line(writer, SummaryLine::Updated(saved))
}

fn handle_move<W: Write>(service: &mut LauncherService, args: MoveArgs, writer: W) -> Result<()> {
    let entry = lookup(service, &args.target)?;
    let moved = service.move_entry(&entry, &args.to)?;
    write_line(
        writer,
        SummaryLine::Moved {
            name: moved.name,
            group: moved.group,
        },
    )
}

fn handle_swap<W: Write>(service: &mut LauncherService, args: SwapArgs, writer: W) -> Result<()> {
    let first = lookup(
        service,
        &EntryRef {
            name: args.first,
            group: args.group.clone(),
        },
    )?;
    let second = lookup(
        service,
        &EntryRef {
            name: args.second,
            group: args.group,
        },
    )?;
    service.swap_entries(&first, &second)?;
    write_line(writer, SummaryLine::Swapped(first.name, second.name))
}

fn handle_group<W: Write>(
    service: &mut LauncherService,
    command: GroupCommand,
    mut writer: W,
) -> Result<()> {
    match command {
        GroupCommand::Add { name } => {
            service.add_group(&name)?;
            write_line(writer, SummaryLine::GroupAdded(name.trim().to_string()))
        }
        GroupCommand::Rename { old, new } => {
            service.rename_group(&old, &new)?;
            write_line(writer, SummaryLine::GroupRenamed(old, new.trim().to_string()))
        }
        GroupCommand::Delete { name, yes } => {
            if !yes {
                let count = service
                    .entries()
                    .iter()
                    .filter(|entry| entry.group_name() == name)
                    .count();
                writeln!(
                    writer,
                    "Group '{}' holds {} {}; pass --yes to delete it",
                    name,
                    count,
                    plural(count, "entry", "entries")
                )?;
                return Ok(());
            }
            let removed = service.delete_group(&name)?;
            write_line(writer, SummaryLine::GroupDeleted(name, removed.len()))
        }
        GroupCommand::Shortcut {
            name,
            shortcut,
            steal,
        } => {
            let bound = service
                .set_group_shortcut(&name, shortcut.as_deref().unwrap_or_default(), policy(steal))
                .map_err(explain)?;
            write_line(writer, SummaryLine::GroupShortcut(name, bound))
        }
        GroupCommand::Order { names } => {
            let order = service.reorder_groups(names)?;
            write_line(writer, SummaryLine::Order(order))
        }
    }
}

fn handle_preset<W: Write>(
    service: &mut LauncherService,
    args: PresetArgs,
    mut writer: W,
) -> Result<()> {
    if !args.yes {
        writeln!(
            writer,
            "Loading {} replaces the current configuration; pass --yes to continue",
            args.path.display()
        )?;
        return Ok(());
    }
    let backup = service.import_preset(&args.path)?;
    writeln!(writer, "Loaded preset {}", args.path.display())?;
    writeln!(writer, "Previous configuration saved to {}", backup.display())?;
    Ok(())
}

fn import(service: &mut LauncherService, path: &Path) -> Result<String> {
    service
        .import_icon(path)
        .with_context(|| format!("failed to import {}", path.display()))
}

/// A refused add or edit must not leave its freshly imported icon behind.
fn discard_on_error(
    service: &mut LauncherService,
    imported: Option<&str>,
    err: StoreError,
) -> anyhow::Error {
    if let Some(icon) = imported {
        service.discard_icon(icon);
    }
    explain(err)
}

fn lookup(service: &LauncherService, target: &EntryRef) -> Result<Entry> {
    Ok(service.find_entry(&target.name, target.group.as_deref())?)
}

fn policy(steal: bool) -> ShortcutPolicy {
    if steal {
        ShortcutPolicy::Steal
    } else {
        ShortcutPolicy::Reject
    }
}

fn explain(err: StoreError) -> anyhow::Error {
    match err.validation() {
        Some(ValidationError::ShortcutTaken { .. }) => {
            anyhow!("{err}; pass --steal to reassign it")
        }
        _ => err.into(),
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

fn write_line<W: Write>(mut writer: W, line: SummaryLine) -> Result<()> {
    writeln!(writer, "{line}")?;
    Ok(())
}

enum SummaryLine {
    Added(Entry),
    Updated(Entry),
    Deleted(String),
    Copied(String),
    Moved { name: String, group: String },
    Swapped(String, String),
    Launched { name: String, started: bool },
    Focus(String),
    Unbound(String),
    Pinned(bool),
    Collected(Vec<String>),
    GroupAdded(String),
    GroupRenamed(String, String),
    GroupDeleted(String, usize),
    GroupShortcut(String, Option<String>),
    Order(Vec<String>),
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLine::Added(entry) | SummaryLine::Updated(entry) => {
                let verb = if matches!(self, SummaryLine::Added(_)) {
                    "Added"
                } else {
                    "Updated"
                };
                write!(f, "{} '{}' in {}", verb, entry.name, entry.group_name())?;
                if !entry.shortcut.is_empty() {
                    write!(f, " <{}>", entry.shortcut)?;
                }
                Ok(())
            }
            SummaryLine::Deleted(name) => write!(f, "Deleted '{}'", name),
            SummaryLine::Copied(name) => write!(f, "Created '{}'", name),
            SummaryLine::Moved { name, group } => write!(f, "Moved '{}' to {}", name, group),
            SummaryLine::Swapped(a, b) => write!(f, "Swapped '{}' and '{}'", a, b),
            SummaryLine::Launched { name, started } => {
                if *started {
                    write!(f, "Launched '{}'", name)
                } else {
                    write!(f, "Could not launch '{}'", name)
                }
            }
            SummaryLine::Focus(group) => write!(f, "Switch to group '{}'", group),
            SummaryLine::Unbound(shortcut) => write!(f, "Nothing is bound to {}", shortcut),
            SummaryLine::Pinned(true) => write!(f, "Window stays on top"),
            SummaryLine::Pinned(false) => write!(f, "Window no longer stays on top"),
            SummaryLine::Collected(removed) if removed.is_empty() => {
                write!(f, "No unused icons")
            }
            SummaryLine::Collected(removed) => write!(
                f,
                "Removed {} unused icon{}: {}",
                removed.len(),
                if removed.len() == 1 { "" } else { "s" },
                removed.join(", ")
            ),
            SummaryLine::GroupAdded(name) => write!(f, "Added group '{}'", name),
            SummaryLine::GroupRenamed(old, new) => {
                write!(f, "Renamed group '{}' to '{}'", old, new)
            }
            SummaryLine::GroupDeleted(name, count) => write!(
                f,
                "Deleted group '{}' and {} {}",
                name,
                count,
                plural(*count, "entry", "entries")
            ),
            SummaryLine::GroupShortcut(name, Some(shortcut)) => {
                write!(f, "Group '{}' bound to {}", name, shortcut)
            }
            SummaryLine::GroupShortcut(name, None) => {
                write!(f, "Cleared shortcut of group '{}'", name)
            }
            SummaryLine::Order(order) => write!(f, "Tab order: {}", order.join(", ")),
        }
    }
}
