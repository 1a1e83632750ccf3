use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;

use bookmagic::app::server::{AppState, router};
use bookmagic::cli::GlobalArgs;
use bookmagic::commands::pipeline_from;
use bookmagic::store::InMemoryProjectStore;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct AppArgs {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Export runs allowed to execute at the same time.
    #[arg(long, default_value_t = 1)]
    max_concurrency: usize,

    #[command(flatten)]
    global: GlobalArgs,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    bookmagic::logging::init_for_server()?;

    let args = AppArgs::parse();
    tracing::info!(?args, "starting bookmagic-app");

    let settings = args.global.settings()?;
    settings.layout.ensure_dirs().context("prepare workspace")?;
    tracing::info!(
        uploads = %settings.layout.uploads_dir.display(),
        exports = %settings.layout.export_dir.display(),
        pandoc = %settings.pandoc.display(),
        "workspace ready"
    );

    let pipeline = pipeline_from(settings)?;
    let state = AppState::new(
        pipeline,
        Arc::new(InMemoryProjectStore::new()),
        args.max_concurrency,
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("bind {}", args.addr))?;
    tracing::info!(addr = %args.addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(?err, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!("shutting down");
}
