pub mod config;
pub mod error;
pub mod groups;
pub mod icons;
pub mod launch;
pub mod migration;
pub mod model;
pub mod services;
pub mod shortcuts;
pub mod store;

pub use config::{AppConfig, FaviconOptions};
pub use error::{StoreError, ValidationError};
pub use icons::IconAssetManager;
pub use migration::{MigrationBootstrap, MigrationReport};
pub use model::*;
pub use services::{Activation, GroupTab, LauncherService, ShortcutPolicy};
pub use shortcuts::{ShortcutOwner, ShortcutTarget};
pub use store::ConfigStore;
