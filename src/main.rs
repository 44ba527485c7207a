use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = bifrost::cli::Cli::parse();
    let config = bifrost::config::from_cli(&cli)?;
    bifrost::logging::init_tracing(&config, cli.log_filter.as_deref())?;

    let report = bifrost::MigrationBootstrap::new(&config).run();
    if report.migrated_config {
        eprintln!(
            "Imported the configuration of a previous install into {}",
            config.data_dir().display()
        );
    }

    let command = cli.command.clone().unwrap_or(bifrost::cli::CliCommand::List);
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if let Err(err) = bifrost::commands::execute(&config, command, &mut handle) {
        tracing::error!(error = %format!("{err:#}"), "command failed");
        return Err(err);
    }

    Ok(())
}
