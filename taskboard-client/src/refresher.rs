/// Polling refresher
///
/// Keeps [`TaskBoardState`] in step with the server by refetching the whole
/// task list on a fixed interval. There is exactly one loop per
/// [`Refresher`]:
///
/// - the interval is never shorter than [`MIN_POLL_INTERVAL`];
/// - immediate refetches (after a mutation or sign-in) are requests to the
///   same loop through a [`RefreshTrigger`], never a second timer;
/// - requests that arrive while a fetch is running coalesce into one
///   follow-up fetch;
/// - [`Refresher::start`] stops a running loop before starting a new one.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use taskboard_client::api::ApiClient;
/// use taskboard_client::auth_events::AuthEventBus;
/// use taskboard_client::refresher::Refresher;
/// use taskboard_client::state::TaskBoardState;
///
/// # async fn example() {
/// let events = AuthEventBus::new();
/// let client = Arc::new(ApiClient::new("http://127.0.0.1:8080", events.clone()));
/// let state = Arc::new(TaskBoardState::new());
///
/// let mut refresher = Refresher::new(client, state, Duration::from_secs(60));
/// refresher.start(Some(events.subscribe()));
///
/// // later
/// refresher.trigger().request();
/// refresher.stop().await;
/// # }
/// ```

use crate::api::TaskService;
use crate::auth_events::AuthEvent;
use crate::error::ClientError;
use crate::state::TaskBoardState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Lower bound for the poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub fn clamp_interval(interval: Duration) -> Duration {
    interval.max(MIN_POLL_INTERVAL)
}

/// Handle for requesting an out-of-schedule refetch
#[derive(Debug, Clone, Default)]
pub struct RefreshTrigger(Arc<Notify>);

impl RefreshTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the loop to refetch as soon as it is idle
    pub fn request(&self) {
        self.0.notify_one();
    }

    pub(crate) async fn requested(&self) {
        self.0.notified().await;
    }
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

pub struct Refresher {
    service: Arc<dyn TaskService>,
    state: Arc<TaskBoardState>,
    interval: Duration,
    trigger: RefreshTrigger,
    running: Option<Running>,
}

impl Refresher {
    /// `interval` is raised to [`MIN_POLL_INTERVAL`] when shorter
    pub fn new(service: Arc<dyn TaskService>, state: Arc<TaskBoardState>, interval: Duration) -> Self {
        Self {
            service,
            state,
            interval: clamp_interval(interval),
            trigger: RefreshTrigger::new(),
            running: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn trigger(&self) -> RefreshTrigger {
        self.trigger.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.task.is_finished())
    }

    /// Starts the loop, replacing any loop already running
    ///
    /// The first fetch happens immediately. With `auth_events`, sign-in
    /// requests a fetch and sign-out or expiry clears local state.
    pub fn start(&mut self, auth_events: Option<broadcast::Receiver<AuthEvent>>) {
        if let Some(previous) = self.running.take() {
            previous.cancel.cancel();
            previous.task.abort();
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.service),
            Arc::clone(&self.state),
            self.interval,
            self.trigger.clone(),
            auth_events,
            cancel.clone(),
        ));

        tracing::debug!(interval_secs = self.interval.as_secs(), "Refresher started");
        self.running = Some(Running { cancel, task });
    }

    /// Stops the loop and waits for it to exit
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            let _ = running.task.await;
            tracing::debug!("Refresher stopped");
        }
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            running.task.abort();
        }
    }
}

async fn poll_loop(
    service: Arc<dyn TaskService>,
    state: Arc<TaskBoardState>,
    interval: Duration,
    trigger: RefreshTrigger,
    mut auth_events: Option<broadcast::Receiver<AuthEvent>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {}

            _ = trigger.requested() => {
                // Next scheduled poll is a full interval after this one
                ticker.reset();
            }

            event = next_event(&mut auth_events) => match event {
                Some(AuthEvent::SignedIn { .. }) => ticker.reset(),
                Some(AuthEvent::SignedOut | AuthEvent::SessionExpired) => {
                    state.clear().await;
                    continue;
                }
                None => {
                    auth_events = None;
                    continue;
                }
            },
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = refresh_once(service.as_ref(), &state) => {}
        }
    }
}

/// Next auth event; `None` once the bus is gone. Pends forever without a
/// subscription so the branch never fires.
async fn next_event(events: &mut Option<broadcast::Receiver<AuthEvent>>) -> Option<AuthEvent> {
    let Some(rx) = events.as_mut() else {
        return std::future::pending().await;
    };

    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Refresher lagged behind auth events");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// One fetch-and-replace; failures keep the current state
pub async fn refresh_once(service: &dyn TaskService, state: &TaskBoardState) -> Result<usize, ClientError> {
    match service.list_tasks().await {
        Ok(tasks) => {
            let count = tasks.len();
            state.replace_all(tasks).await;
            tracing::debug!(count, "Task list refreshed");
            Ok(count)
        }
        Err(e) => {
            if e.is_transient() {
                tracing::warn!(error = %e, "Refresh failed, will retry on next tick");
            } else {
                tracing::error!(error = %e, "Refresh failed");
            }
            Err(e)
        }
    }
}
