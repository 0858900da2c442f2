use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use splice::agent::{Agent, Toolbox};
use splice::api::{create_router, AppState};
use splice::config::Config;
use splice::db::{Database, Introspector, QueryGateway};
use splice::llm::{CompletionOptions, LlmProvider};
use splice::render::{ChartRenderer, ReportExporter};
use splice::session::SessionManager;

#[derive(Parser)]
#[command(name = "splice")]
#[command(about = "Conversational analytics agent for RNA-seq result databases")]
struct Args {
    /// Ask a single question on the command line instead of serving HTTP
    #[arg(long)]
    question: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "splice=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    std::fs::create_dir_all(&config.artifacts.plots_dir)?;
    std::fs::create_dir_all(&config.artifacts.reports_dir)?;

    tracing::info!(url = %config.database.url, "Initializing database...");
    let db = Database::new(&config.database).await?;

    if let Some(llm_config) = &config.llm {
        tracing::info!(model = %llm_config.model, "Initializing action model...");
    }
    // The action model needs deterministic tool selection; the response model
    // gets a little temperature for readable prose.
    let action_llm = LlmProvider::new(config.llm.as_ref()).with_options(CompletionOptions {
        temperature: Some(0.0),
        max_tokens: None,
    });
    if !action_llm.is_available() {
        tracing::warn!("LLM unavailable - set LLM_MODEL to enable the agent");
    }
    let response_llm = LlmProvider::new(config.response_llm.as_ref().or(config.llm.as_ref()))
        .with_options(CompletionOptions {
            temperature: Some(0.1),
            max_tokens: None,
        });

    let toolbox = Arc::new(Toolbox::new(
        QueryGateway::new(db.clone()),
        Introspector::new(db),
        ChartRenderer::new(&config.artifacts.plots_dir),
        ReportExporter::new(&config.artifacts.reports_dir),
        config.agent.preview_rows,
        config.agent.cache_freshness_secs,
    ));

    let agent = Agent::new(
        Arc::new(action_llm),
        Arc::new(response_llm),
        toolbox,
        config.agent.clone(),
    );
    let sessions = SessionManager::new(config.agent.memory_char_budget);

    if let Some(question) = args.question {
        let session = sessions.get_or_create(None);
        let outcome = agent.ask(&session, &question).await;
        println!("{}", outcome.answer);
        if let Some(plot) = outcome.plot_filename {
            println!("Plot: {}/{plot}", config.artifacts.plots_dir);
        }
        if let Some(report) = outcome.report_filename {
            println!("Report: {}/{report}", config.artifacts.reports_dir);
        }
        return Ok(());
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, agent, sessions);
    let app = create_router(state);

    tracing::info!("Splice starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  Chat:         http://{}/api/v1/chat", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

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

    tracing::info!("Shutdown signal received");
}
