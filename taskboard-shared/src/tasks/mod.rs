//! Task rules and store operations
//!
//! - `canonical`: priority/status alias mapping
//! - `due_date`: offset-aware due-date parsing
//! - `visibility`: who may see a task
//! - `lifecycle`: who may change a task and which status moves are legal
//! - `store`: the authorized CRUD operations built on the above

pub mod canonical;
pub mod due_date;
pub mod lifecycle;
pub mod store;
pub mod visibility;

pub use store::{
    assign_task, create_task, delete_task, get_task, list_tasks, task_history, transition_task,
    update_task, CreateTaskInput, TaskFilter, TaskPatch, TaskRules, TaskView,
};
