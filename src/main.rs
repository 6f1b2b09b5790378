//! Oliv chat server
//!
//! Serves the conversation manager to the chat front end over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oliv_chat::config::{Config, PromptTemplate};
use oliv_chat::core::ConversationManager;
use oliv_chat::providers::CompletionClient;
use oliv_chat::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oliv_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let chat_config = config.chat_config()?;

    let persona = match &chat_config.assistant.persona_file {
        Some(path) => PromptTemplate::load_from_file(path).await?,
        None => PromptTemplate::builtin(),
    };
    tracing::info!("🎭 Persona: {}", persona.persona.name);

    let completion = &chat_config.completion;
    let api_key = completion.api_key();
    if api_key.is_none() {
        tracing::warn!(
            "{} is not set; completion requests will be sent without credentials",
            completion.api_key_env
        );
    }

    // One client for the whole process, shared by every send
    let client = Arc::new(CompletionClient::new(
        completion.clone(),
        api_key,
        persona.system_prompt.content.clone(),
    ));
    tracing::info!(model = %completion.model, endpoint = %completion.endpoint, "🔌 Completion client ready");

    let state = AppState {
        manager: Arc::new(ConversationManager::new(client)),
        suggestions: Arc::new(persona.suggestions()),
    };

    let app = Router::new()
        .merge(routes::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("💬 Oliv chat running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
