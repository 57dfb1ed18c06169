mod act_commands;
mod check_commands;
mod patterns_commands;
mod runtime;
mod serve_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "pinion", version, about = "Pinion: pattern-matched action dispatch")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./pinion.toml, then ~/.config/pinion/).
    #[arg(long, short, global = true, env = "PINION_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load plugins and accept remote messages on the configured listeners.
    Serve,
    /// Send one message, e.g. `pinion act 'role:math,cmd:sum,left:1,right:2'`.
    Act {
        /// Message in compact `key:value` form.
        message: String,
        /// Load a bundled plugin in addition to the configured ones.
        #[arg(long = "plugin", short)]
        plugins: Vec<String>,
    },
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// List registered patterns and pinned transports.
    Patterns {
        #[arg(long = "plugin", short)]
        plugins: Vec<String>,
    },
}

/// Logs go to stderr so `act` output on stdout stays machine-readable.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "pinion starting");

    let config = cli.config.as_deref();
    match &cli.command {
        Commands::Serve => serve_commands::handle_serve(config).await,
        Commands::Act { message, plugins } => {
            act_commands::handle_act(config, message, plugins).await
        },
        Commands::Check { verbose } => check_commands::handle_check(config, *verbose),
        Commands::Patterns { plugins } => {
            patterns_commands::handle_patterns(config, plugins).await
        },
    }
}
