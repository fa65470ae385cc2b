use aura_gateway::config::Args;
use aura_gateway::{Result, build, spawn_health_checkers};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn run(args: Args) -> Result<()> {
    let (state, app) = build(&args)?;
    spawn_health_checkers(&state, &args);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Gateway running on http://localhost:{}", args.port);
    tracing::info!(
        "Analysis quota: {} call(s) per {} seconds per session",
        args.max_analysis_calls,
        args.analysis_window
    );
    tracing::info!("Comment cache TTL: {} seconds", args.cache_ttl);
    if !state.chat.has_key() {
        tracing::warn!("no chat API key configured, comments will use fallbacks");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aura_gateway=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // parse cli arguments
    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!("Execution failed - {e}");
        std::process::exit(1);
    }
}
