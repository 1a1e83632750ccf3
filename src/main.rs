use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

use bookmagic::cli::{Cli, Command};
use bookmagic::commands;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    bookmagic::logging::init().context("init logging")?;

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    let summary = match cli.command {
        Command::GeneratePreview(args) => commands::generate_preview(&cli.global, args)
            .await
            .context("generate preview")?,
        Command::Worker(args) => commands::worker(&cli.global, args)
            .await
            .context("export")?,
        Command::Upload(args) => commands::upload(&cli.global, args)
            .await
            .context("upload")?,
        Command::Templates => commands::templates(&cli.global).context("templates")?,
    };

    let out = serde_json::to_string_pretty(&summary).context("serialize summary")?;
    println!("{out}");
    Ok(())
}
