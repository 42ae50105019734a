/// Session events and scoped suspension
///
/// The client publishes an [`AuthEvent`] whenever its session changes.
/// Subscribers (the refresher among them) react by refetching or clearing
/// local state.
///
/// Some administrative flows must not be observed as session changes while
/// they run. [`AuthEventBus::suspend`] returns a guard; while any guard is
/// alive, sign-in events are dropped. An event that ends the session is
/// held back instead and delivered once the last guard is released, so
/// subscribers never keep state that belongs to a dead session. The guard
/// releases on drop, so an early return or a panic cannot leave the bus
/// muted.
///
/// # Example
///
/// ```
/// use taskboard_client::auth_events::{AuthEvent, AuthEventBus};
///
/// let bus = AuthEventBus::new();
/// let mut rx = bus.subscribe();
///
/// {
///     let _guard = bus.suspend();
///     assert!(!bus.publish(AuthEvent::SessionExpired));
///     assert!(rx.try_recv().is_err());
/// }
///
/// assert_eq!(rx.try_recv().unwrap(), AuthEvent::SessionExpired);
/// ```

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: Uuid, organization_id: Uuid },
    SignedOut,

    /// The server rejected the stored token
    SessionExpired,
}

impl AuthEvent {
    /// Whether subscribers must drop session-scoped state
    pub fn ends_session(&self) -> bool {
        matches!(self, AuthEvent::SignedOut | AuthEvent::SessionExpired)
    }
}

#[derive(Debug, Default)]
struct Suspension {
    depth: usize,
    deferred: Option<AuthEvent>,
}

#[derive(Debug, Clone)]
pub struct AuthEventBus {
    sender: broadcast::Sender<AuthEvent>,
    suspension: Arc<Mutex<Suspension>>,
}

impl AuthEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            suspension: Arc::new(Mutex::new(Suspension::default())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Sends `event` to current subscribers
    ///
    /// Returns `false` when the bus is suspended and the event was not sent
    /// now. Session-ending events are deferred until the bus resumes; the
    /// latest one wins. Having no subscribers is not a drop.
    pub fn publish(&self, event: AuthEvent) -> bool {
        {
            let mut suspension = lock(&self.suspension);
            if suspension.depth > 0 {
                tracing::debug!(?event, "Auth event held while suspended");
                if event.ends_session() {
                    suspension.deferred = Some(event);
                }
                return false;
            }
        }

        let _ = self.sender.send(event);
        true
    }

    /// Mutes the bus until the returned guard is dropped; guards nest
    pub fn suspend(&self) -> SuspendGuard {
        lock(&self.suspension).depth += 1;
        SuspendGuard {
            sender: self.sender.clone(),
            suspension: Arc::clone(&self.suspension),
        }
    }

    pub fn is_suspended(&self) -> bool {
        lock(&self.suspension).depth > 0
    }
}

impl Default for AuthEventBus {
    fn default() -> Self {
        Self::new()
    }
}

// A panic while holding the lock leaves the counters consistent
fn lock(suspension: &Mutex<Suspension>) -> MutexGuard<'_, Suspension> {
    suspension.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Keeps an [`AuthEventBus`] muted while alive
#[must_use = "the bus resumes as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SuspendGuard {
    sender: broadcast::Sender<AuthEvent>,
    suspension: Arc<Mutex<Suspension>>,
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        let deferred = {
            let mut suspension = lock(&self.suspension);
            suspension.depth = suspension.depth.saturating_sub(1);
            if suspension.depth == 0 {
                suspension.deferred.take()
            } else {
                None
            }
        };

        if let Some(event) = deferred {
            tracing::debug!(?event, "Delivering held auth event");
            let _ = self.sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_subscribers() {
        let bus = AuthEventBus::new();
        let mut rx = bus.subscribe();

        let event = AuthEvent::SignedIn {
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
        };
        assert!(bus.publish(event.clone()));
        assert_eq!(rx.try_recv().unwrap(), event);
    }

    #[test]
    fn test_nested_guards() {
        let bus = AuthEventBus::new();
        let mut rx = bus.subscribe();

        let outer = bus.suspend();
        let inner = bus.suspend();
        drop(inner);
        assert!(bus.is_suspended());
        assert!(!bus.publish(AuthEvent::SignedIn {
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
        }));

        drop(outer);
        assert!(!bus.is_suspended());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_expiry_delivered_after_last_guard() {
        let bus = AuthEventBus::new();
        let mut rx = bus.subscribe();

        let outer = bus.suspend();
        let inner = bus.suspend();
        assert!(!bus.publish(AuthEvent::SignedOut));
        assert!(!bus.publish(AuthEvent::SessionExpired));

        drop(inner);
        assert!(rx.try_recv().is_err());

        drop(outer);
        assert_eq!(rx.try_recv().unwrap(), AuthEvent::SessionExpired);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_expiry_survives_panicking_flow() {
        let bus = AuthEventBus::new();
        let mut rx = bus.subscribe();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = bus.suspend();
            bus.publish(AuthEvent::SessionExpired);
            panic!("creation failed midway");
        }));

        assert!(result.is_err());
        assert_eq!(rx.try_recv().unwrap(), AuthEvent::SessionExpired);
    }

    #[test]
    fn test_guard_released_on_panic() {
        let bus = AuthEventBus::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = bus.suspend();
            panic!("creation failed midway");
        }));

        assert!(result.is_err());
        assert!(!bus.is_suspended());
    }

    #[tokio::test]
    async fn test_guard_released_on_early_return() {
        async fn create(bus: &AuthEventBus, fail: bool) -> Result<(), &'static str> {
            let _guard = bus.suspend();
            if fail {
                return Err("conflict");
            }
            Ok(())
        }

        let bus = AuthEventBus::new();
        assert!(create(&bus, true).await.is_err());
        assert!(!bus.is_suspended());
    }

    #[test]
    fn test_clones_share_suspension() {
        let bus = AuthEventBus::new();
        let other = bus.clone();

        let _guard = bus.suspend();
        assert!(other.is_suspended());
    }
}
