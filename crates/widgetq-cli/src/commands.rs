use std::io::Read;
use std::path::Path;

use anyhow::{Context, bail};
use widgetq_core::app::{AppBuilder, Ingress, LocalBackends};

use crate::cli::{Cli, Command, RunArgs, SubmitArgs};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Run(args) => cmd_run(&cli.data_root, args).await,
        Command::Submit(args) => cmd_submit(&cli.data_root, args).await,
    }
}

async fn cmd_run(data_root: &Path, args: RunArgs) -> anyhow::Result<()> {
    let config = args.to_config(data_root).context("invalid configuration")?;
    let backends = LocalBackends::open(&config.data_root);
    let dispatch = AppBuilder::from_config(&config, &backends)
        .context("invalid configuration")?
        .build()?;

    let stats = dispatch.router().stats();
    let handle = dispatch.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutdown requested; finishing current batch");
    handle.shutdown_and_join().await;

    let snapshot = stats.snapshot();
    tracing::info!(
        fetched = snapshot.fetched,
        stored = snapshot.stored,
        deleted = snapshot.deleted,
        ignored = snapshot.ignored,
        rejected = snapshot.rejected,
        dead_lettered = snapshot.dead_lettered,
        store_failures = snapshot.store_failures,
        ack_failures = snapshot.ack_failures,
        "stopped"
    );
    println!("{}", serde_json::to_string(&snapshot)?);
    Ok(())
}

async fn cmd_submit(data_root: &Path, args: SubmitArgs) -> anyhow::Result<()> {
    let raw = match &args.file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut raw = Vec::new();
            std::io::stdin()
                .read_to_end(&mut raw)
                .context("failed to read stdin")?;
            raw
        }
    };

    let backends = LocalBackends::open(data_root);
    let ingress = Ingress::new(backends.queues, args.queue_url);
    let response = ingress.admit(&raw).await;

    println!("{}", response.body);
    if !response.is_success() {
        bail!("request not accepted (status {})", response.status_code);
    }
    Ok(())
}
