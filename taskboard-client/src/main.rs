//! # Taskboard Client
//!
//! Signs in and keeps a live summary of the visible task list in the log.
//!
//! ## Usage
//!
//! ```bash
//! TASKBOARD_API_URL=http://127.0.0.1:8080 \
//! TASKBOARD_EMAIL=ana@school.test \
//! TASKBOARD_PASSWORD=... \
//! cargo run -p taskboard-client
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use taskboard_client::{
    api::ApiClient, auth_events::AuthEventBus, config::ClientConfig, refresher::Refresher,
    state::TaskBoardState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskboard_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::load()?;
    let (email, password) = config
        .credentials()
        .ok_or_else(|| anyhow::anyhow!("TASKBOARD_EMAIL and TASKBOARD_PASSWORD are required"))?;

    tracing::info!(
        "Taskboard Client v{} polling {} every {}s",
        env!("CARGO_PKG_VERSION"),
        config.api_url,
        config.poll_interval.as_secs()
    );

    let events = AuthEventBus::new();
    let client = Arc::new(ApiClient::new(&config.api_url, events.clone()));
    let state = Arc::new(TaskBoardState::new());

    client.login(email, password).await?;

    let mut refresher = Refresher::new(client.clone(), state.clone(), config.poll_interval);
    refresher.start(Some(events.subscribe()));

    let mut revisions = state.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.snapshot().await;
                let mut by_status = BTreeMap::new();
                for task in &snapshot.tasks {
                    *by_status.entry(format!("{:?}", task.status)).or_insert(0usize) += 1;
                }
                tracing::info!(total = snapshot.tasks.len(), ?by_status, "Task board updated");
            }
        }
    }

    tracing::info!("Shutdown signal received, exiting...");
    refresher.stop().await;
    client.sign_out().await;

    Ok(())
}
