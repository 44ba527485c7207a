pub use bifrost_cli::cli;
pub use bifrost_cli::commands;
pub use bifrost_cli::config;
pub use bifrost_cli::logging;
pub use bifrost_cli::AppConfig;

pub use bifrost_core as core;
pub use bifrost_core::model;
pub use bifrost_core::{LauncherService, MigrationBootstrap};
