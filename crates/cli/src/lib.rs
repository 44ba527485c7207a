pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;

pub use bifrost_core as core;
pub use bifrost_core::model;

pub use bifrost_core::AppConfig;
