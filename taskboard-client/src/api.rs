/// HTTP client for the Taskboard API
///
/// [`TaskService`] is the seam between the client's local state and the
/// server: the refresher and [`crate::state::TaskBoard`] only talk to the
/// trait, and [`ApiClient`] implements it over HTTP.
///
/// # Example
///
/// ```no_run
/// use taskboard_client::api::{ApiClient, TaskService};
/// use taskboard_client::auth_events::AuthEventBus;
///
/// # async fn example() -> Result<(), taskboard_client::error::ClientError> {
/// let client = ApiClient::new("http://127.0.0.1:8080", AuthEventBus::new());
/// client.login("ana@school.test", "Sup3rSecret!").await?;
///
/// for task in client.list_tasks().await? {
///     println!("{} [{:?}]", task.title, task.status);
/// }
/// # Ok(())
/// # }
/// ```

use crate::auth_events::{AuthEvent, AuthEventBus};
use crate::error::ClientError;
use async_trait::async_trait;
use chrono::{DateTime, Offset, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use taskboard_shared::auth::permissions::Role;
use taskboard_shared::models::task::{TaskPriority, TaskStatus};
use taskboard_shared::models::user::User;
use taskboard_shared::tasks::due_date::{format_due_date, parse_due_date};
use taskboard_shared::tasks::TaskView;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Task operations the client depends on
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Every task visible to the session
    async fn list_tasks(&self) -> Result<Vec<TaskView>, ClientError>;

    async fn create_task(&self, task: &NewTask) -> Result<TaskView, ClientError>;

    async fn update_task(&self, id: Uuid, update: &TaskUpdate) -> Result<TaskView, ClientError>;

    async fn delete_task(&self, id: Uuid) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<Uuid>>,
}

/// Partial task update; unset fields are left alone
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// `Some(None)` clears the description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,

    /// Same formats as task creation; `Some(None)` clears the due date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<String>>,

    /// Version the update was based on; the server answers 409 on mismatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Local projection of the update, used before the server confirms it
    pub fn apply_to(&self, task: &mut TaskView, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(due_date) = &self.due_date {
            task.due_date = due_date.as_deref().map(|raw| {
                parse_due_date(raw, Utc.fix())
                    .map(|due| format_due_date(&due))
                    .unwrap_or_else(|_| raw.to_string())
            });
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(is_private) = self.is_private {
            task.is_private = is_private;
        }
        if let Some(status) = self.status {
            if status != task.status {
                task.completed_at = (status == TaskStatus::Completed).then_some(now);
                task.status = status;
            }
        }
        task.updated_at = now;
    }
}

/// Session returned by login
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub organization_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUserRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Created account; the temporary password is present only when the
/// server could not deliver it
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedUser {
    pub user: User,
    pub temporary_password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    events: AuthEventBus,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, events: AuthEventBus) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            events,
        }
    }

    pub fn events(&self) -> &AuthEventBus {
        &self.events
    }

    pub async fn is_signed_in(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionInfo, ClientError> {
        let response = self
            .http
            .post(self.url("/v1/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        // A 401 here is a failed sign-in, not an expired session
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        let session: SessionInfo = decode(response).await?;

        *self.token.write().await = Some(session.token.clone());
        tracing::info!(user_id = %session.user.id, "Signed in");

        self.events.publish(AuthEvent::SignedIn {
            user_id: session.user.id,
            organization_id: session.organization_id,
        });

        Ok(session)
    }

    pub async fn sign_out(&self) {
        if self.token.write().await.take().is_some() {
            self.events.publish(AuthEvent::SignedOut);
        }
    }

    /// Creates an account on behalf of an administrator
    ///
    /// Session events are suspended for the duration of the call so
    /// subscribers do not treat the new account as a session change. A
    /// rejected token still reaches subscribers once the call returns.
    pub async fn create_user(&self, request: &NewUserRequest) -> Result<CreatedUser, ClientError> {
        let _guard = self.events.suspend();

        let response = self
            .authorized(Method::POST, "/v1/users")
            .await?
            .json(request)
            .send()
            .await?;

        self.handle(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self.token.read().await.clone().ok_or(ClientError::Unauthorized)?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    async fn handle<T: DeserializeOwned>(&self, response: Response) -> Result<T, ClientError> {
        if response.status() == StatusCode::UNAUTHORIZED {
            self.expire().await;
            return Err(ClientError::Unauthorized);
        }
        decode(response).await
    }

    async fn expire(&self) {
        if self.token.write().await.take().is_some() {
            tracing::warn!("Session rejected by server");
            self.events.publish(AuthEvent::SessionExpired);
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);

    Err(ClientError::Api { status, message })
}

#[async_trait]
impl TaskService for ApiClient {
    async fn list_tasks(&self) -> Result<Vec<TaskView>, ClientError> {
        let response = self.authorized(Method::GET, "/v1/tasks").await?.send().await?;
        self.handle(response).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<TaskView, ClientError> {
        let response = self
            .authorized(Method::POST, "/v1/tasks")
            .await?
            .json(task)
            .send()
            .await?;
        self.handle(response).await
    }

    async fn update_task(&self, id: Uuid, update: &TaskUpdate) -> Result<TaskView, ClientError> {
        let response = self
            .authorized(Method::PUT, &format!("/v1/tasks/{}", id))
            .await?
            .json(update)
            .send()
            .await?;
        self.handle(response).await
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), ClientError> {
        let response = self
            .authorized(Method::DELETE, &format!("/v1/tasks/{}", id))
            .await?
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                self.expire().await;
                Err(ClientError::Unauthorized)
            }
            status if status.is_success() => Ok(()),
            _ => decode::<serde_json::Value>(response).await.map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus) -> TaskView {
        let now = Utc::now();
        TaskView {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            title: "Grade exams".to_string(),
            description: None,
            status,
            priority: TaskPriority::Medium,
            due_date: None,
            is_private: false,
            completed_at: None,
            version: 1,
            assignees: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let update = TaskUpdate {
            status: Some(TaskStatus::InProgress),
            version: Some(3),
            ..Default::default()
        };

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "in_progress", "version": 3 }));
    }

    #[test]
    fn test_update_can_clear_fields() {
        let update = TaskUpdate {
            description: Some(None),
            due_date: Some(None),
            ..Default::default()
        };

        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "description": null, "due_date": null }));

        let mut view = task(TaskStatus::Pending);
        view.description = Some("Bring red pens".to_string());
        view.due_date = Some("2025-03-14T09:30:00+00:00".to_string());

        update.apply_to(&mut view, Utc::now());
        assert_eq!(view.description, None);
        assert_eq!(view.due_date, None);
    }

    #[test]
    fn test_local_due_date_projection() {
        let update = TaskUpdate {
            due_date: Some(Some("2025-03-14 09:30".to_string())),
            description: Some(Some("Bring red pens".to_string())),
            ..Default::default()
        };
        let mut view = task(TaskStatus::Pending);

        update.apply_to(&mut view, Utc::now());
        assert_eq!(view.due_date.as_deref(), Some("2025-03-14T09:30:00+00:00"));
        assert_eq!(view.description.as_deref(), Some("Bring red pens"));
    }

    #[test]
    fn test_local_completion_sets_completed_at() {
        let now = Utc::now();
        let mut view = task(TaskStatus::Pending);

        TaskUpdate::status(TaskStatus::Completed).apply_to(&mut view, now);
        assert_eq!(view.status, TaskStatus::Completed);
        assert_eq!(view.completed_at, Some(now));

        TaskUpdate::status(TaskStatus::InProgress).apply_to(&mut view, now);
        assert_eq!(view.completed_at, None);
    }

    #[test]
    fn test_same_status_keeps_completed_at() {
        let earlier = Utc::now() - chrono::Duration::hours(1);
        let mut view = task(TaskStatus::Completed);
        view.completed_at = Some(earlier);

        TaskUpdate::status(TaskStatus::Completed).apply_to(&mut view, Utc::now());
        assert_eq!(view.completed_at, Some(earlier));
    }

    #[tokio::test]
    async fn test_requests_without_session_fail_locally() {
        let client = ApiClient::new("http://127.0.0.1:1", AuthEventBus::new());
        assert!(matches!(client.list_tasks().await, Err(ClientError::Unauthorized)));
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = ApiClient::new("http://localhost:8080/", AuthEventBus::new());
        assert_eq!(client.url("/v1/tasks"), "http://localhost:8080/v1/tasks");
    }
}
