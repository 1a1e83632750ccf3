use anyhow::Context as _;

/// Browser protocol chatter from chromiumoxide drowns out pipeline stages at `info`.
const DEFAULT_DIRECTIVES: &str = "info,chromiumoxide=warn,tungstenite=warn";

/// Installs the global subscriber. `RUST_LOG` overrides the default directives.
///
/// Logs always go to stderr so that the CLI can print its JSON summary on stdout.
pub fn init() -> anyhow::Result<()> {
    init_with_default(DEFAULT_DIRECTIVES)
}

/// Same as [`init`], with request tracing from `tower_http` enabled by default.
pub fn init_for_server() -> anyhow::Result<()> {
    init_with_default(&format!("{DEFAULT_DIRECTIVES},tower_http=debug"))
}

fn init_with_default(directives: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(directives))
        .with_context(|| format!("build log filter from {directives:?}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
