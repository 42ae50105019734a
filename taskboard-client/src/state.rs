/// Local task state
///
/// [`TaskBoardState`] holds the last known task list. It is replaced
/// wholesale by every poll and patched in place by optimistic mutations.
/// Each change bumps a revision counter observers can watch.
///
/// [`TaskBoard`] is the mutation entry point: it applies a change locally
/// first, sends it to the server, then asks the refresher for an
/// immediate refetch so the list converges on the server's view. A
/// rejected mutation restores the previous local value.

use crate::api::{NewTask, TaskService, TaskUpdate};
use crate::error::ClientError;
use crate::refresher::RefreshTrigger;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use taskboard_shared::tasks::TaskView;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub tasks: Vec<TaskView>,

    /// Completion time of the last successful poll
    pub last_synced: Option<DateTime<Utc>>,
}

pub struct TaskBoardState {
    inner: RwLock<Snapshot>,
    revision: watch::Sender<u64>,
}

impl TaskBoardState {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: RwLock::new(Snapshot::default()),
            revision,
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    pub async fn tasks(&self) -> Vec<TaskView> {
        self.inner.read().await.tasks.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<TaskView> {
        self.inner.read().await.tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Replaces the list with a fresh server copy
    pub async fn replace_all(&self, tasks: Vec<TaskView>) {
        {
            let mut inner = self.inner.write().await;
            inner.tasks = tasks;
            inner.last_synced = Some(Utc::now());
        }
        self.bump();
    }

    /// Inserts `task` or replaces the entry with the same id
    pub async fn upsert(&self, task: TaskView) {
        {
            let mut inner = self.inner.write().await;
            match inner.tasks.iter_mut().find(|t| t.id == task.id) {
                Some(existing) => *existing = task,
                None => inner.tasks.push(task),
            }
        }
        self.bump();
    }

    /// Edits one task in place and returns its previous value
    pub async fn update_with<F>(&self, id: Uuid, edit: F) -> Option<TaskView>
    where
        F: FnOnce(&mut TaskView),
    {
        let previous = {
            let mut inner = self.inner.write().await;
            let task = inner.tasks.iter_mut().find(|t| t.id == id)?;
            let previous = task.clone();
            edit(task);
            previous
        };
        self.bump();
        Some(previous)
    }

    pub async fn remove(&self, id: Uuid) -> Option<TaskView> {
        let removed = {
            let mut inner = self.inner.write().await;
            let index = inner.tasks.iter().position(|t| t.id == id)?;
            inner.tasks.remove(index)
        };
        self.bump();
        Some(removed)
    }

    /// Drops everything, e.g. after sign-out
    pub async fn clear(&self) {
        *self.inner.write().await = Snapshot::default();
        self.bump();
    }

    /// Receiver that changes whenever the state does
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

impl Default for TaskBoardState {
    fn default() -> Self {
        Self::new()
    }
}

/// Optimistic task mutations
#[derive(Clone)]
pub struct TaskBoard {
    service: Arc<dyn TaskService>,
    state: Arc<TaskBoardState>,
    trigger: RefreshTrigger,
}

impl TaskBoard {
    pub fn new(service: Arc<dyn TaskService>, state: Arc<TaskBoardState>, trigger: RefreshTrigger) -> Self {
        Self {
            service,
            state,
            trigger,
        }
    }

    pub fn state(&self) -> &Arc<TaskBoardState> {
        &self.state
    }

    /// Creates a task; it appears locally once the server assigns its id
    pub async fn create_task(&self, task: NewTask) -> Result<TaskView, ClientError> {
        let result = self.service.create_task(&task).await;
        if let Ok(created) = &result {
            self.state.upsert(created.clone()).await;
        }
        self.trigger.request();
        result
    }

    pub async fn update_task(&self, id: Uuid, update: TaskUpdate) -> Result<TaskView, ClientError> {
        let now = Utc::now();
        let previous = self.state.update_with(id, |task| update.apply_to(task, now)).await;

        let result = self.service.update_task(id, &update).await;
        match &result {
            Ok(confirmed) => self.state.upsert(confirmed.clone()).await,
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "Update rejected, reverting");
                if let Some(previous) = previous {
                    self.state.upsert(previous).await;
                }
            }
        }

        self.trigger.request();
        result
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<(), ClientError> {
        let removed = self.state.remove(id).await;

        let result = self.service.delete_task(id).await;
        if let Err(e) = &result {
            tracing::warn!(task_id = %id, error = %e, "Delete rejected, restoring");
            if let Some(removed) = removed {
                self.state.upsert(removed).await;
            }
        }

        self.trigger.request();
        result
    }
}
