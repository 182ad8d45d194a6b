//! ProNouns CLI and REST API entry point.
//!
//! Binary name: `pronouns`
//!
//! Parses CLI arguments, initializes database and services, then dispatches
//! to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;
use pronouns_infra::config::resolve_data_dir;
use pronouns_observe::{LogFormat, TracingOptions};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A server logs requests by default; one-shot commands stay quiet.
    let serving = matches!(cli.command, Commands::Serve { .. });
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 if serving => "info",
        0 => "warn",
        1 => "info,pronouns_core=debug,pronouns_infra=debug,pronouns_api=debug",
        _ => "trace",
    };
    let options = TracingOptions {
        enable_otel: cli.otel,
        default_filter: filter.to_string(),
        format: if cli.log_json { LogFormat::Json } else { LogFormat::Pretty },
    };
    pronouns_observe::init_tracing(&options)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = dispatch(cli).await;
    pronouns_observe::shutdown_tracing();
    result
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    // Shell completions and init don't need app state
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "pronouns", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Init { force } => {
            return cli::config::init(&resolve_data_dir(), *force, cli.json).await;
        }
        _ => {}
    }

    // Initialize application state (config, DB, services)
    let state = AppState::init().await?;

    let json = cli.json;
    let result = match cli.command {
        Commands::Resolve { platform, id } => cli::identity::resolve(&state, platform, &id, json).await,
        Commands::Link {
            platform,
            id,
            identity,
        } => cli::identity::link(&state, platform, &id, &identity, json).await,
        Commands::Get { platform, id } => cli::preference::get(&state, platform, &id, json).await,
        Commands::Set {
            platform,
            id,
            pronouns,
            expect_version,
        } => cli::preference::set(&state, platform, &id, &pronouns, expect_version, json).await,
        Commands::Clear {
            platform,
            id,
            expect_version,
        } => cli::preference::clear(&state, platform, &id, expect_version, json).await,
        Commands::History { platform, id } => cli::preference::history(&state, platform, &id, json).await,
        Commands::List { limit, offset } => cli::preference::list(&state, limit, offset, json).await,
        Commands::Sets => cli::preference::sets(&state, json),
        Commands::Run { platform, id, text } => cli::run::run(&state, platform, &id, &text, json).await,
        Commands::Status => cli::status::status(&state, json).await,
        Commands::Serve { port, host } => serve(&state, host, port).await,
        // Handled above
        Commands::Completions { .. } | Commands::Init { .. } => Ok(()),
    };

    state.shutdown().await;
    result
}

async fn serve(state: &AppState, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);

    if let Some(key) = http::extractors::auth::ensure_api_key(state).await? {
        println!();
        println!("  API Key: {key}");
        println!("  Save this key -- it will not be shown again.");
        println!();
    }

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "REST API listening");
    println!("  ProNouns API listening on http://{addr}");

    let router = http::router::build_router(state.clone());
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped, draining background work");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
