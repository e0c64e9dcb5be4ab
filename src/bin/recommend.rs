use clap::Parser;
use std::sync::Arc;
use support_triage_agent::{
    config::AppConfig,
    gemini::{GeminiClient, GenerationSettings},
    travel::{Budget, CityRecommender, TripRequest},
};
use tracing_subscriber::EnvFilter;

/// Suggest ten cities for a vacation budget and duration
#[derive(Debug, Parser)]
#[command(name = "city-recommender", version)]
struct Args {
    /// "Less than $1000", "Between $1000 and $2000", "Between $2000 and $5000",
    /// "More than $5000", or under-1000 / 1000-2000 / 2000-5000 / over-5000
    #[arg(long, default_value = "under-1000")]
    budget: Budget,

    /// Vacation length in weeks
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    weeks: u32,

    /// Sampling temperature
    #[arg(long, default_value_t = 0.1)]
    temperature: f32,

    /// Maximum output tokens for the model reply
    #[arg(long, default_value_t = 256, value_parser = clap::value_parser!(i32).range(1..))]
    max_tokens: i32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    let Some(api_key) = config.google_api_key else {
        eprintln!("Missing GOOGLE_API_KEY. Set it in your environment or .env, then rerun.");
        std::process::exit(1);
    };

    let model = GeminiClient::new(api_key, config.gemini_model)?.with_settings(GenerationSettings {
        temperature: args.temperature,
        max_output_tokens: args.max_tokens,
    });
    let recommender = CityRecommender::new(Arc::new(model));

    let request = TripRequest::new(args.budget, args.weeks)?;
    let recommendation = recommender.recommend(&request).await?;

    println!(
        "Cities for {} week(s), budget {}:",
        request.weeks, request.budget
    );
    for (i, city) in recommendation.cities.iter().enumerate() {
        println!("  {}. {}", i + 1, city);
    }

    Ok(())
}
