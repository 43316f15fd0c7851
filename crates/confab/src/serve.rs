// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `confab serve` command implementation.

use std::sync::Arc;
use std::time::Duration;

use confab_agent::{shutdown, AgentSettings, ConversationAgent};
use confab_config::ConfabConfig;
use confab_core::ConfabError;
use confab_gateway::{start_server, GatewayState, ServerConfig};
use confab_memory::{ConversationStore, Journal};
use confab_openai::OpenAiRunner;
use tracing::{info, warn};

/// Runs the gateway until SIGINT/SIGTERM, then waits for in-flight commits.
pub async fn run_serve(config: ConfabConfig) -> Result<(), ConfabError> {
    init_tracing(&config.agent.log_level);
    info!(name = %config.agent.name, "starting confab serve");

    let agent = Arc::new(build_agent(&config).await?);
    let cancel = shutdown::install_signal_handler();

    let state = GatewayState::new(Arc::clone(&agent), cancel.clone());
    let result = start_server(&ServerConfig::from(&config.gateway), state).await;

    // A bind failure never saw a signal; release any per-request tokens.
    cancel.cancel();

    let grace = Duration::from_secs(config.stream.shutdown_grace_secs);
    if agent.shutdown(grace).await {
        info!("all commits drained");
    } else {
        warn!(
            in_flight = agent.in_flight(),
            "shutdown grace elapsed with commits still running"
        );
    }

    result
}

/// Store, runner and agent from configuration.
pub(crate) async fn build_agent(config: &ConfabConfig) -> Result<ConversationAgent, ConfabError> {
    let store = match config.memory.journal_dir.as_deref() {
        Some(dir) => {
            let journal = Journal::open(dir).await?;
            info!(dir = %journal.dir().display(), "conversation journal enabled");
            ConversationStore::with_journal(journal)
        }
        None => ConversationStore::new(),
    };

    if config.provider.api_key.is_none() {
        warn!("provider.api_key is not set; turns will fail to start");
    }
    let runner = OpenAiRunner::new(config.provider.clone())?;

    Ok(ConversationAgent::new(
        Arc::new(runner),
        Arc::new(store),
        AgentSettings::from_config(config),
    ))
}

pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("confab={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
