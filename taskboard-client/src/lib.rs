//! # Taskboard Client Library
//!
//! Keeps a local copy of the task board in sync with the API.
//!
//! ## Modules
//!
//! - `api`: HTTP client and the `TaskService` seam
//! - `auth_events`: Session events with scoped suspension
//! - `config`: Layered client configuration
//! - `error`: Client error type
//! - `refresher`: The single bounded-interval poll loop
//! - `state`: Local task list and optimistic mutations
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskboard_client::{api::ApiClient, auth_events::AuthEventBus};
//! use taskboard_client::{config::ClientConfig, refresher::Refresher, state::TaskBoardState};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::load()?;
//! let events = AuthEventBus::new();
//! let client = Arc::new(ApiClient::new(&config.api_url, events.clone()));
//! let state = Arc::new(TaskBoardState::new());
//!
//! let mut refresher = Refresher::new(client, state, config.poll_interval);
//! refresher.start(Some(events.subscribe()));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth_events;
pub mod config;
pub mod error;
pub mod refresher;
pub mod state;
