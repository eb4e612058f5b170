//! Diwan - terminal client for a government-services chat assistant
//!
//! Talks to the assistant backend over its cookie-session HTTP API:
//! log in, pick up previous conversations, and watch answers stream in
//! chunk by chunk.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod conversation;
mod core;
mod session;
mod store;
mod ui;

use crate::api::ApiClient;
use crate::config::Config;
use crate::core::ChatService;
use crate::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "diwan=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load()?;
    tracing::info!("Assistant backend at {}", config.api_base);

    let store = Arc::new(Store::new());
    let service = ChatService::new(ApiClient::new(&config.api_base), store);

    ui::run(service, config).await
}
