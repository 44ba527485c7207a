pub mod launcher;

pub use launcher::{Activation, GroupTab, LauncherService, ShortcutPolicy};
