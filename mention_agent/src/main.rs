mod config;
mod generator;
mod twitter;

use anyhow::Context;
use dotenvy::dotenv;
use tracing_subscriber::filter::EnvFilter;

use std::sync::Arc;

use mention_core::generate::Responder;
use mention_core::job::PollJob;
use mention_core::poll::{PollConfig, Poller};
use mention_core::retry::RateLimitExecutor;
use mention_core::state::{AgentState, StateStore};
use mention_core::trigger::GenerationTrigger;
use twitter_client::TwitterClient;

use crate::config::Config;
use crate::generator::{HttpContentGenerator, LogResponder, WebhookResponder};
use crate::twitter::TwitterSource;

const DEFAULT_LOG_FILTER: &str = "debug,hyper=info,reqwest=info,wiremock=info";

#[tokio::main]
async fn main() {
    dotenv().ok();

    // 1. Initialize logger
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();

    if let Err(e) = run().await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // 2. Load configuration
    let config = Config::from_env()?;

    // 3. Authenticate with Twitter
    let bearer_token = TwitterClient::authenticate(&config.api_key, &config.api_secret)
        .await
        .context("Error getting bearer token")?;
    let client = TwitterClient::new(&bearer_token).context("Error initializing Twitter client")?;
    tracing::info!("Successfully authenticated with Twitter API");

    // 4. Initialize collaborators
    let generator = HttpContentGenerator::new(config.generator_url.clone(), config.generator_api_key.clone())?;
    let responder: Arc<dyn Responder> = match &config.responder_url {
        Some(url) => Arc::new(WebhookResponder::new(url.clone())?),
        None => {
            tracing::info!("RESPONDER_URL not set, replies will only be logged");
            Arc::new(LogResponder)
        }
    };
    let trigger = GenerationTrigger::new(Arc::new(generator), responder);

    // 5. Load state
    let store = StateStore::new(&config.state_file);
    let state = AgentState::from(store.load().await);

    // 6. Start polling
    let mut poll_config = PollConfig::new(&config.username);
    poll_config.page_size = config.page_size;
    let poller = Poller::new(
        poll_config,
        Arc::new(TwitterSource::new(client)),
        trigger,
        RateLimitExecutor::default(),
        store,
    );
    let job = PollJob::listen(poller, state);

    tracing::info!(
        "Starting to monitor mentions for @{} every {} seconds",
        config.username,
        config.poll_interval.as_secs()
    );
    tokio::select! {
        _ = job.schedule(config.poll_interval) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Error listening for shutdown signal")?;
            tracing::info!("Shutting down");
        }
    }
    Ok(())
}
