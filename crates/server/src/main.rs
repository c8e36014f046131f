//! Grounded QA Server Entry Point

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use grounded_qa_agent::{AskOptions, ChatSession};
use grounded_qa_config::{load_settings, load_settings_from_file, Settings};
use grounded_qa_rag::{evaluate, EvalQuery, HybridRetriever, SearchOptions};
use grounded_qa_server::{create_router, init_metrics, AppState};

#[derive(Parser, Debug)]
#[command(name = "grounded-qa", version, about, long_about = None)]
struct Cli {
    /// Configuration environment, layered over config/default
    #[arg(long, env = "GROUNDED_QA_ENV")]
    env: Option<String>,

    /// Single configuration file; overrides --env
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API (default)
    Serve,
    /// Answer one question and print the reply as JSON
    Ask {
        question: String,
        /// Answer style preset
        #[arg(long)]
        style: Option<String>,
        /// Attach ranking explanations and rationales
        #[arg(long)]
        explain: bool,
    },
    /// Report Recall@k and MRR for lexical, dense and hybrid retrieval
    Eval {
        /// JSONL file of {query, gold_snippet?, answer?}
        queries: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => load_settings_from_file(&path.to_string_lossy()),
        None => load_settings(cli.env.as_deref()),
    };
    let (config, load_error) = match loaded {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    init_tracing(&config);
    if let Some(e) = load_error {
        tracing::warn!(error = %e, "Failed to load configuration, using defaults");
    }
    tracing::info!(
        environment = ?config.environment,
        config_env = cli.env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Ask {
            question,
            style,
            explain,
        } => ask(config, &question, style, explain).await,
        Commands::Eval { queries } => eval(&config, &queries),
    }
}

async fn serve(config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting Grounded QA Server v{}", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled && init_metrics().is_some() {
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::from_settings(config)?;
    let cleanup = state.start_cleanup_task();
    let app = create_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = cleanup.send(true);

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn ask(
    config: Settings,
    question: &str,
    style: Option<String>,
    explain: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_settings(config)?;
    let mut session = ChatSession::new("cli");
    let options = AskOptions {
        style,
        explain: Some(explain),
        followups: None,
    };

    let reply = state.assistant.ask(&mut session, question, &options).await;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

fn eval(config: &Settings, queries: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let retriever = HybridRetriever::from_settings(config);
    let queries = EvalQuery::load_jsonl(queries)?;
    let report = evaluate(&retriever, &queries, &SearchOptions::from(&config.retrieval))?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// `RUST_LOG` overrides the configured level
fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("grounded_qa={level},tower_http=debug").into()
    });

    let fmt_layer = if config.observability.json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
