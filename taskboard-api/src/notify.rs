/// Credential notifications
///
/// Creating an account (or an organization, or resetting a password)
/// issues a temporary password that has to reach the new user somehow.
/// Delivery is a side effect of an already committed write: it is raced
/// against a timer, and whatever happens the account stays created. When
/// delivery does not succeed in time, the credentials are returned to the
/// caller instead so an operator can pass them on.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use taskboard_api::notify::{deliver_with_timeout, CredentialNotice, Delivery, LogNotifier};
///
/// # async fn example(notice: CredentialNotice) {
/// let delivery = deliver_with_timeout(&LogNotifier, &notice, Duration::from_secs(10)).await;
/// if delivery != Delivery::Delivered {
///     // include the temporary password in the response
/// }
/// # }
/// ```

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use taskboard_shared::accounts::IssuedCredentials;
use taskboard_shared::models::user::User;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("No notification channel is configured")]
    NotConfigured,

    #[error("Notification transport failed: {0}")]
    Transport(String),

    #[error("Notification endpoint answered {0}")]
    Rejected(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    AccountCreated,
    OrganizationCreated,
    PasswordReset,
}

/// Payload handed to a [`Notifier`]
#[derive(Debug, Clone, Serialize)]
pub struct CredentialNotice {
    pub kind: NoticeKind,
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: String,
    pub temporary_password: String,
    pub reset_token: String,
}

impl CredentialNotice {
    pub fn new(kind: NoticeKind, issued: &IssuedCredentials) -> Self {
        Self {
            kind,
            user_id: issued.user.id,
            organization_id: issued.user.organization_id,
            name: issued.user.name.clone(),
            email: issued.user.email.clone(),
            temporary_password: issued.temporary_password.clone(),
            reset_token: issued.reset_token.clone(),
        }
    }
}

/// Channel that gets credentials to a user
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notice: &CredentialNotice) -> Result<(), NotifyError>;
}

/// Used when no channel is configured; never delivers
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notice: &CredentialNotice) -> Result<(), NotifyError> {
        debug!(user_id = %notice.user_id, kind = ?notice.kind, "No notification channel configured");
        Err(NotifyError::NotConfigured)
    }
}

/// Posts notices as JSON to a webhook
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notice: &CredentialNotice) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(notice)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Rejected(status.as_u16()))
        }
    }
}

/// How a notification attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    Delivered,
    Failed { reason: String },
    TimedOut,
}

/// Sends `notice`, giving up after `timeout`
pub async fn deliver_with_timeout(
    notifier: &dyn Notifier,
    notice: &CredentialNotice,
    timeout: Duration,
) -> Delivery {
    match tokio::time::timeout(timeout, notifier.send(notice)).await {
        Ok(Ok(())) => {
            info!(user_id = %notice.user_id, kind = ?notice.kind, "Credentials delivered");
            Delivery::Delivered
        }
        Ok(Err(NotifyError::NotConfigured)) => Delivery::Failed {
            reason: NotifyError::NotConfigured.to_string(),
        },
        Ok(Err(e)) => {
            warn!(user_id = %notice.user_id, error = %e, "Credential notification failed");
            Delivery::Failed {
                reason: e.to_string(),
            }
        }
        Err(_) => {
            warn!(
                user_id = %notice.user_id,
                timeout_ms = timeout.as_millis() as u64,
                "Credential notification timed out"
            );
            Delivery::TimedOut
        }
    }
}

/// Response body for operations that issue credentials
///
/// The temporary password and reset token are present only when the
/// notification was not delivered.
#[derive(Debug, Serialize)]
pub struct IssuedCredentialsResponse {
    pub user: User,
    pub notification: Delivery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

impl IssuedCredentialsResponse {
    pub fn new(issued: IssuedCredentials, notification: Delivery) -> Self {
        let undelivered = notification != Delivery::Delivered;

        Self {
            user: issued.user,
            temporary_password: undelivered.then_some(issued.temporary_password),
            reset_token: undelivered.then_some(issued.reset_token),
            notification,
        }
    }
}

/// Builds the notice, races delivery and shapes the response
pub async fn notify_issued(
    notifier: &dyn Notifier,
    kind: NoticeKind,
    issued: IssuedCredentials,
    timeout: Duration,
) -> IssuedCredentialsResponse {
    let notice = CredentialNotice::new(kind, &issued);
    let delivery = deliver_with_timeout(notifier, &notice, timeout).await;
    IssuedCredentialsResponse::new(issued, delivery)
}
