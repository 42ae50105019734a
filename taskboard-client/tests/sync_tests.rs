/// Board and refresher working together against an in-memory server

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskboard_client::api::{NewTask, TaskService, TaskUpdate};
use taskboard_client::error::ClientError;
use taskboard_client::refresher::{Refresher, MIN_POLL_INTERVAL};
use taskboard_client::state::{TaskBoard, TaskBoardState};
use taskboard_shared::models::task::{TaskPriority, TaskStatus};
use taskboard_shared::tasks::TaskView;
use uuid::Uuid;

#[derive(Default)]
struct MemoryServer {
    tasks: Mutex<Vec<TaskView>>,
    lists: AtomicUsize,
}

impl MemoryServer {
    fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    /// Change made by another client
    fn insert_elsewhere(&self, title: &str) {
        let task = new_view(title);
        self.tasks.lock().unwrap().push(task);
    }
}

fn new_view(title: &str) -> TaskView {
    let now = Utc::now();
    TaskView {
        id: Uuid::new_v4(),
        organization_id: Uuid::nil(),
        created_by: Uuid::nil(),
        title: title.to_string(),
        description: None,
        status: TaskStatus::Pending,
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

#[async_trait]
impl TaskService for MemoryServer {
    async fn list_tasks(&self) -> Result<Vec<TaskView>, ClientError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn create_task(&self, task: &NewTask) -> Result<TaskView, ClientError> {
        let created = new_view(&task.title);
        self.tasks.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: Uuid, update: &TaskUpdate) -> Result<TaskView, ClientError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(ClientError::Unauthorized)?;
        update.apply_to(task, Utc::now());
        task.version += 1;
        Ok(task.clone())
    }

    async fn delete_task(&self, id: Uuid) -> Result<(), ClientError> {
        self.tasks.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }
}

async fn elapse(duration: Duration) {
    tokio::time::sleep(duration).await;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_mutation_refetch_uses_the_poll_loop() {
    let server = Arc::new(MemoryServer::default());
    let state = Arc::new(TaskBoardState::new());

    let mut refresher = Refresher::new(server.clone(), state.clone(), MIN_POLL_INTERVAL);
    let board = TaskBoard::new(server.clone(), state.clone(), refresher.trigger());
    refresher.start(None);
    elapse(Duration::from_millis(1)).await;
    assert_eq!(server.lists(), 1);

    server.insert_elsewhere("Added by a colleague");
    board
        .create_task(NewTask {
            title: "Prepare report".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    // Created task is local before any poll
    assert_eq!(state.tasks().await.len(), 1);

    elapse(Duration::from_millis(1)).await;
    assert_eq!(server.lists(), 2);
    assert_eq!(state.tasks().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_mutations_refetches_once() {
    let server = Arc::new(MemoryServer::default());
    let state = Arc::new(TaskBoardState::new());

    let mut refresher = Refresher::new(server.clone(), state.clone(), MIN_POLL_INTERVAL);
    let board = TaskBoard::new(server.clone(), state.clone(), refresher.trigger());
    refresher.start(None);
    elapse(Duration::from_millis(1)).await;

    for i in 0..5 {
        board
            .create_task(NewTask {
                title: format!("Task {}", i),
                ..Default::default()
            })
            .await
            .unwrap();
    }

    elapse(Duration::from_millis(1)).await;
    assert_eq!(server.lists(), 2);
    assert_eq!(state.tasks().await.len(), 5);

    let first = state.tasks().await[0].id;
    board
        .update_task(first, TaskUpdate::status(TaskStatus::InProgress))
        .await
        .unwrap();
    board.delete_task(first).await.unwrap();

    elapse(Duration::from_millis(1)).await;
    assert_eq!(server.lists(), 3);
    assert_eq!(state.tasks().await.len(), 4);
}
