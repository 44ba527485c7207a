pub use bifrost_core::config::*;

use crate::cli::Cli;

pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = AppConfig::discover(cli.data_dir.clone())?;
    if !cli.insecure_favicon_tls {
        return Ok(config);
    }
    let favicon = FaviconOptions {
        accept_invalid_certs: true,
        ..config.favicon().clone()
    };
    Ok(config.with_favicon_options(favicon))
}
