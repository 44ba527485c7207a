use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "bifrost",
    version,
    about = "A tabbed launcher for files, folders and links with global shortcuts.",
    after_help = "Examples:\n  bifrost                          List tabs and entries (same as `bifrost list`)\n  bifrost add-path ~/Projects --group Work\n  bifrost add --name Mail --action https://mail.example.com --shortcut ctrl+alt+m\n  bifrost press ctrl+alt+m\n  bifrost group shortcut Work ctrl+2 --steal"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the tracing filter written to error_log.txt (e.g. "info", "debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    /// Skip TLS certificate verification when fetching favicons
    #[arg(long = "insecure-favicon-tls", global = true)]
    pub insecure_favicon_tls: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Show every tab with its entries and shortcuts (default command)
    List,
    /// Add an entry
    Add(AddArgs),
    /// Add an entry for a file or folder, using its shell icon
    AddPath(AddPathArgs),
    /// Add an entry for a link, using the site's favicon
    AddUrl(AddUrlArgs),
    /// Change an existing entry
    Edit(EditArgs),
    /// Delete an entry
    Delete(EntryRef),
    /// Duplicate an entry right after itself
    Copy(EntryRef),
    /// Move an entry to another tab
    Move(MoveArgs),
    /// Swap the positions of two entries
    Swap(SwapArgs),
    /// Manage tabs
    #[command(subcommand)]
    Group(GroupCommand),
    /// Trigger whatever a shortcut is bound to
    Press(PressArgs),
    /// Launch an entry by name
    Launch(EntryRef),
    /// Toggle the always-on-top window setting
    Pin(PinArgs),
    /// Replace the configuration with a preset file (the current one is backed up)
    Preset(PresetArgs),
    /// Manage the icon directory
    #[command(subcommand)]
    Icons(IconsCommand),
}

/// Selects an entry by name, optionally narrowed to one tab.
#[derive(Args, Debug, Clone)]
pub struct EntryRef {
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Only match entries in this tab
    #[arg(long)]
    pub group: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,

    /// File, folder or URL to open
    #[arg(long)]
    pub action: String,

    /// Tab to add the entry to (defaults to Home)
    #[arg(long, default_value = "")]
    pub group: String,

    /// Image file to import as the entry icon
    #[arg(long, value_name = "PATH")]
    pub icon: Option<PathBuf>,

    /// Keyboard chord such as ctrl+alt+1
    #[arg(long)]
    pub shortcut: Option<String>,

    /// Take the shortcut from its current owner
    #[arg(long)]
    pub steal: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AddPathArgs {
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    #[arg(long, default_value = "")]
    pub group: String,

    /// Use this name instead of the file name
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddUrlArgs {
    #[arg(value_name = "URL")]
    pub url: String,

    #[arg(long, default_value = "")]
    pub group: String,

    /// Use this name instead of the host name
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[command(flatten)]
    pub target: EntryRef,

    #[arg(long, value_name = "NAME")]
    pub rename: Option<String>,

    #[arg(long = "to-group", value_name = "GROUP")]
    pub to_group: Option<String>,

    #[arg(long)]
    pub action: Option<String>,

    /// Image file to import as the new icon
    #[arg(long, value_name = "PATH")]
    pub icon: Option<PathBuf>,

    #[arg(long, conflicts_with = "clear_shortcut")]
    pub shortcut: Option<String>,

    #[arg(long = "clear-shortcut")]
    pub clear_shortcut: bool,

    #[arg(long)]
    pub steal: bool,
}

#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    #[command(flatten)]
    pub target: EntryRef,

    /// Destination tab
    #[arg(long, value_name = "GROUP")]
    pub to: String,
}

#[derive(Args, Debug, Clone)]
pub struct SwapArgs {
    pub first: String,
    pub second: String,

    /// Only match entries in this tab
    #[arg(long)]
    pub group: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum GroupCommand {
    /// Add an empty tab at the end
    Add { name: String },
    /// Rename a tab everywhere it is referenced
    Rename { old: String, new: String },
    /// Delete a tab together with its entries
    Delete {
        name: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Bind a shortcut to a tab; omit the chord to clear it
    Shortcut {
        name: String,
        shortcut: Option<String>,
        #[arg(long)]
        steal: bool,
    },
    /// Persist a new tab order; unlisted tabs keep their relative order at the end
    Order {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PressArgs {
    #[arg(value_name = "CHORD")]
    pub shortcut: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PinState {
    On,
    Off,
}

#[derive(Args, Debug, Clone)]
pub struct PinArgs {
    #[arg(value_enum)]
    pub state: PinState,
}

#[derive(Args, Debug, Clone)]
pub struct PresetArgs {
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Confirm replacing the current configuration
    #[arg(long)]
    pub yes: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum IconsCommand {
    /// Copy an image into the icon directory and print its asset name
    Import { path: PathBuf },
    /// Remove generated and imported icons no entry uses
    Gc,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommands() {
        let cli = Cli::try_parse_from([
            "bifrost",
            "press",
            "ctrl+1",
            "--data-dir",
            "/tmp/x",
            "--insecure-favicon-tls",
        ])
        .unwrap();
        assert!(cli.insecure_favicon_tls);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Some(CliCommand::Press(ref args)) if args.shortcut == "ctrl+1"));
    }

    #[test]
    fn shortcut_and_clear_conflict() {
        let parsed = Cli::try_parse_from([
            "bifrost",
            "edit",
            "Mail",
            "--shortcut",
            "ctrl+m",
            "--clear-shortcut",
        ]);
        assert!(parsed.is_err());
    }
}
