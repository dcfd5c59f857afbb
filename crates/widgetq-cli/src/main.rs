use clap::Parser;
use widgetq_core::observability::init_logging;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_logging(cli.log_format.into());

    if let Err(e) = commands::run_command(cli).await {
        tracing::error!(error = %format!("{e:#}"), "widgetq failed");
        return Err(e);
    }
    Ok(())
}
