/// Database models and their queries
///
/// - `organization`: tenants and their settings
/// - `user`: identities with role and credential digest
/// - `password_reset`: one-time reset token digests
/// - `task`: tasks, status and priority enums
/// - `assignment`: task ↔ user assignment rows
/// - `task_history`: append-only edit log

pub mod assignment;
pub mod organization;
pub mod password_reset;
pub mod task;
pub mod task_history;
pub mod user;
