//! Canonical priority and status values
//!
//! Clients send priorities and statuses as free-form strings, in English,
//! Spanish or Portuguese and in any case. Accented and unaccented spellings
//! are both accepted. This is the one place those strings are mapped
//! onto [`TaskPriority`] and [`TaskStatus`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::task::{TaskPriority, TaskStatus};

/// What to do with a priority string that matches no alias
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityPolicy {
    /// Fall back to `medium`
    #[default]
    Lenient,

    /// Reject the request
    Strict,
}

impl FromStr for PriorityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(PriorityPolicy::Lenient),
            "strict" => Ok(PriorityPolicy::Strict),
            other => Err(format!("Unknown priority policy: {}", other)),
        }
    }
}

fn fold(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

/// Matches a priority alias; `None` when unrecognized
///
/// `high` is the legacy spelling of `urgent`.
pub fn parse_priority(input: &str) -> Option<TaskPriority> {
    match fold(input).as_str() {
        "low" | "baja" | "baixa" => Some(TaskPriority::Low),
        "medium" | "media" | "média" | "normal" => Some(TaskPriority::Medium),
        "urgent" | "urgente" | "high" | "alta" => Some(TaskPriority::Urgent),
        _ => None,
    }
}

/// Resolves the priority of a new or edited task
///
/// A missing or blank value is `medium`. An unrecognized value is `medium`
/// under [`PriorityPolicy::Lenient`] and an error under
/// [`PriorityPolicy::Strict`].
pub fn canonical_priority(
    input: Option<&str>,
    policy: PriorityPolicy,
) -> Result<TaskPriority, String> {
    let raw = match input.map(str::trim) {
        None | Some("") => return Ok(TaskPriority::Medium),
        Some(raw) => raw,
    };

    match (parse_priority(raw), policy) {
        (Some(priority), _) => Ok(priority),
        (None, PriorityPolicy::Lenient) => {
            debug!(priority = raw, "Unrecognized priority, defaulting to medium");
            Ok(TaskPriority::Medium)
        }
        (None, PriorityPolicy::Strict) => Err(format!("Unknown priority: {}", raw)),
    }
}

/// Matches a status alias; there is no fallback for statuses
pub fn parse_status(input: &str) -> Option<TaskStatus> {
    match fold(input).as_str() {
        "pending" | "pendiente" | "pendente" | "todo" => Some(TaskStatus::Pending),
        "in_progress" | "inprogress" | "en_progreso" | "en_curso" | "em_andamento"
        | "em_progresso" => Some(TaskStatus::InProgress),
        "completed" | "complete" | "done" | "completada" | "completado" | "concluída"
        | "concluida" | "concluído" | "concluido" => Some(TaskStatus::Completed),
        "cancelled" | "canceled" | "cancelada" | "cancelado" => Some(TaskStatus::Cancelled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_aliases() {
        assert_eq!(parse_priority("HIGH"), Some(TaskPriority::Urgent));
        assert_eq!(parse_priority("Alta"), Some(TaskPriority::Urgent));
        assert_eq!(parse_priority(" urgente "), Some(TaskPriority::Urgent));
        assert_eq!(parse_priority("Media"), Some(TaskPriority::Medium));
        assert_eq!(parse_priority("normal"), Some(TaskPriority::Medium));
        assert_eq!(parse_priority("baja"), Some(TaskPriority::Low));
        assert_eq!(parse_priority("LOW"), Some(TaskPriority::Low));
        assert_eq!(parse_priority("critical"), None);
    }

    #[test]
    fn test_portuguese_aliases() {
        assert_eq!(parse_priority("Baixa"), Some(TaskPriority::Low));
        assert_eq!(parse_priority("MÉDIA"), Some(TaskPriority::Medium));
        assert_eq!(parse_priority("média"), Some(TaskPriority::Medium));
        assert_eq!(parse_priority("alta"), Some(TaskPriority::Urgent));

        assert_eq!(parse_status("Pendente"), Some(TaskStatus::Pending));
        assert_eq!(parse_status("em andamento"), Some(TaskStatus::InProgress));
        assert_eq!(parse_status("Concluída"), Some(TaskStatus::Completed));
        assert_eq!(parse_status("concluido"), Some(TaskStatus::Completed));
        assert_eq!(parse_status("cancelado"), Some(TaskStatus::Cancelled));
    }

    #[test]
    fn test_canonical_priority_lenient() {
        assert_eq!(
            canonical_priority(Some("whatever"), PriorityPolicy::Lenient),
            Ok(TaskPriority::Medium)
        );
        assert_eq!(canonical_priority(None, PriorityPolicy::Lenient), Ok(TaskPriority::Medium));
        assert_eq!(
            canonical_priority(Some("high"), PriorityPolicy::Lenient),
            Ok(TaskPriority::Urgent)
        );
    }

    #[test]
    fn test_canonical_priority_strict() {
        assert!(canonical_priority(Some("whatever"), PriorityPolicy::Strict).is_err());
        assert_eq!(canonical_priority(Some("  "), PriorityPolicy::Strict), Ok(TaskPriority::Medium));
        assert_eq!(
            canonical_priority(Some("Baja"), PriorityPolicy::Strict),
            Ok(TaskPriority::Low)
        );
    }

    #[test]
    fn test_status_aliases() {
        assert_eq!(parse_status("In Progress"), Some(TaskStatus::InProgress));
        assert_eq!(parse_status("in-progress"), Some(TaskStatus::InProgress));
        assert_eq!(parse_status("DONE"), Some(TaskStatus::Completed));
        assert_eq!(parse_status("canceled"), Some(TaskStatus::Cancelled));
        assert_eq!(parse_status("pendiente"), Some(TaskStatus::Pending));
        assert_eq!(parse_status("archived"), None);
    }

    #[test]
    fn test_canonical_names_parse_to_themselves() {
        for status in TaskStatus::ALL {
            assert_eq!(parse_status(status.as_str()), Some(status));
        }
        for priority in [TaskPriority::Low, TaskPriority::Medium, TaskPriority::Urgent] {
            assert_eq!(parse_priority(priority.as_str()), Some(priority));
        }
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("STRICT".parse::<PriorityPolicy>(), Ok(PriorityPolicy::Strict));
        assert_eq!("lenient".parse::<PriorityPolicy>(), Ok(PriorityPolicy::Lenient));
        assert!("loose".parse::<PriorityPolicy>().is_err());
    }
}
