//! Implicada CLI and REST API entry point.
//!
//! Binary name: `implicada`
//!
//! Parses CLI arguments, initializes database and services, then starts
//! the REST API server or reports status.

mod http;
mod state;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use state::AppState;

#[derive(Parser)]
#[command(name = "implicada", about = "Implicada conversational backend", version)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output machine-readable JSON where applicable
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000, env = "IMPLICADA_PORT")]
        port: u16,

        /// Host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Export spans via OpenTelemetry (stdout exporter)
        #[arg(long)]
        otel: bool,
    },

    /// Show data directory and storage counts
    Status,

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state or tracing
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        generate(*shell, &mut cmd, "implicada", &mut std::io::stdout());
        return Ok(());
    }

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info,implicada=debug",
        _ => "trace",
    };
    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    implicada_observe::tracing_setup::init_tracing(otel, default_filter)
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    // Initialize application state (DB, services)
    let state = AppState::init().await?;

    match cli.command {
        Commands::Serve { port, host, .. } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Implicada API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            implicada_observe::tracing_setup::shutdown_tracing();
            println!("\n  Server stopped.");
        }

        Commands::Status => {
            let users: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
                .fetch_one(&state.db_pool.reader)
                .await?;
            let sessions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_sessions")
                .fetch_one(&state.db_pool.reader)
                .await?;
            let turns: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM turns")
                .fetch_one(&state.db_pool.reader)
                .await?;

            if cli.json {
                let status = serde_json::json!({
                    "data_dir": state.data_dir.display().to_string(),
                    "users": users.0,
                    "sessions": sessions.0,
                    "turns": turns.0,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!();
                println!(
                    "  {} Implicada status",
                    console::style("📊").bold()
                );
                println!();
                println!("  Data dir:  {}", state.data_dir.display());
                println!("  Users:     {}", users.0);
                println!("  Sessions:  {}", sessions.0);
                println!("  Turns:     {}", turns.0);
                println!();
            }
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
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
