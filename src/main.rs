//! Parley - conversational agents server
//!
//! Hosts a general chatbot, a news research assistant and an interview
//! simulator as resumable graphs over persisted per-thread state.

mod agents;
mod api;
mod config;
mod conversation;
mod db;
mod llm;
mod routing;
mod runtime;
mod system_prompt;
mod tools;

use agents::AgentKind;
use api::{create_router, AppState};
use config::{InterviewCatalog, ServerConfig, StorageMode};
use db::Database;
use llm::ModelRegistry;
use runtime::{
    Checkpointer, DatabaseCheckpointer, MemoryCheckpointer, RegistryLlmClient, RuntimeManager,
    ToolRegistryExecutor,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tools::ToolRegistry;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = ServerConfig::from_env()?;

    let catalog = match &config.interview_rules {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading interview formats");
            InterviewCatalog::load(path)?
        }
        None => InterviewCatalog::default(),
    };

    // Storage per agent
    let database = if config.uses_database() {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tracing::info!(path = %config.db_path.display(), "Opening database");
        Some(Database::open(&config.db_path)?)
    } else {
        None
    };

    let mut stores: HashMap<AgentKind, Arc<dyn Checkpointer>> = HashMap::new();
    for kind in AgentKind::ALL {
        let store: Arc<dyn Checkpointer> = match (config.storage_for(kind), &database) {
            (StorageMode::Database, Some(db)) => Arc::new(DatabaseCheckpointer::new(db.clone())),
            _ => Arc::new(MemoryCheckpointer::new()),
        };
        tracing::info!(agent = %kind, storage = ?config.storage_for(kind), "Configured storage");
        stores.insert(kind, store);
    }

    // Initialize LLM registry
    let llm_registry = Arc::new(ModelRegistry::new(&config.llm));

    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!("No LLM API keys configured. Set OPENAI_API_KEY, GEMINI_API_KEY or LLM_GATEWAY.");
    }

    std::fs::create_dir_all(&config.output_dir)?;

    let llm_client = RegistryLlmClient::new(
        llm_registry.clone(),
        llm_registry.default_model_id().to_string(),
    );
    let tools = ToolRegistryExecutor::new(ToolRegistry::standard(config.pdf_renderer.clone()));

    let runtime = RuntimeManager::new(
        Arc::new(llm_client),
        Arc::new(tools),
        config.output_dir.clone(),
        catalog,
        |kind| {
            stores
                .get(&kind)
                .cloned()
                .unwrap_or_else(|| Arc::new(MemoryCheckpointer::new()))
        },
    );

    // Create application state
    let state = AppState::new(runtime, llm_registry);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Parley server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
