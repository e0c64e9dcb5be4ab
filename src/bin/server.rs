use support_triage_agent::{
    agent::SupportAgent,
    api::{start_server, ApiState},
    classifier::KeywordClassifier,
    config::AppConfig,
    escalation::EscalationQueue,
    gemini::GeminiClient,
    graph::build_graph,
    state::InMemoryThreadStore,
    tools::{HttpLookupTool, LookupTool, PlaceholderLookup},
    travel::CityRecommender,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    info!("Support Triage Agent - Run Server");
    info!("Port: {}", config.port);
    info!("Assistant ID: {}", config.assistant_id);

    // Create components
    let lookup: Arc<dyn LookupTool> = match &config.lookup_url {
        Some(url) => {
            info!("Order lookup backend: {}", url);
            Arc::new(HttpLookupTool::new(url)?)
        }
        None => Arc::new(PlaceholderLookup),
    };
    let graph = build_graph(Arc::new(KeywordClassifier), lookup);

    let agent = Arc::new(SupportAgent::new(
        graph,
        Box::new(InMemoryThreadStore::new()),
        EscalationQueue::new(),
    ));

    let recommender = match &config.google_api_key {
        Some(key) => {
            let model = GeminiClient::new(key.clone(), config.gemini_model.clone())?;
            Some(Arc::new(CityRecommender::new(Arc::new(model))))
        }
        None => {
            warn!("GOOGLE_API_KEY not set; /api/recommend is disabled");
            None
        }
    };

    let state = ApiState {
        agent,
        assistant_id: config.assistant_id.clone(),
        recommender,
    };

    info!("Starting API server...");

    // Start API server
    start_server(state, config.port).await?;

    Ok(())
}
