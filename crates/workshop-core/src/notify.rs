//! Supervisor notification events and the push collaborator trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::{IssueType, Priority};

/// Kind of dashboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A request was created and awaits review.
    NewRequest,
    /// A request was created with urgent priority.
    UrgentRequest,
}

/// Event pushed to supervisor dashboards when a request is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEvent {
    pub kind: EventKind,
    pub request_id: i64,
    pub priority: Priority,
    pub issue_type: IssueType,
    /// Originating phone, when the request came in over chat.
    pub phone: Option<String>,
    pub photo_count: usize,
    /// Short human-readable headline.
    pub title: String,
    /// One-line body for the notification toast.
    pub body: String,
}

impl RequestEvent {
    /// Build the event for a newly created request, choosing the urgent
    /// variant when the priority warrants it.
    pub fn for_new_request(
        request_id: i64,
        priority: Priority,
        issue_type: IssueType,
        phone: Option<String>,
        photo_count: usize,
        description: &str,
    ) -> Self {
        if priority == Priority::Urgent {
            let mut excerpt: String = description.chars().take(100).collect();
            if description.chars().count() > 100 {
                excerpt.push_str("...");
            }
            Self {
                kind: EventKind::UrgentRequest,
                request_id,
                priority,
                issue_type,
                phone,
                photo_count,
                title: format!("🚨 SOLICITUD URGENTE #{request_id}"),
                body: excerpt,
            }
        } else {
            Self {
                kind: EventKind::NewRequest,
                request_id,
                priority,
                issue_type,
                phone,
                photo_count,
                title: format!("Nueva Solicitud #{request_id}"),
                body: format!("{} - Prioridad: {}", issue_type, priority),
            }
        }
    }
}

/// Errors from the notification collaborator.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The event could not be delivered to any subscriber.
    #[error("publish failed: {0}")]
    PublishFailed(String),
}

/// Trait for pushing request events towards supervisor dashboards.
///
/// Delivery and fan-out are the implementation's responsibility; callers
/// emit exactly one event per created request and move on.
#[async_trait]
pub trait SupervisorNotifier: Send + Sync {
    async fn publish(&self, event: RequestEvent) -> Result<(), NotifyError>;
}

/// Notifier that drops every event. Used in tests.
#[derive(Debug, Clone, Default)]
pub struct NoOpNotifier;

#[async_trait]
impl SupervisorNotifier for NoOpNotifier {
    async fn publish(&self, _event: RequestEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgent_priority_selects_urgent_variant() {
        let event = RequestEvent::for_new_request(
            7,
            Priority::Urgent,
            IssueType::MechanicalFailure,
            Some("+56911112222".to_string()),
            2,
            "El camión no parte, quedó botado en ruta",
        );
        assert_eq!(event.kind, EventKind::UrgentRequest);
        assert!(event.title.contains("#7"));
        assert!(event.body.starts_with("El camión"));
    }

    #[test]
    fn test_urgent_body_truncates_long_descriptions() {
        let long = "x".repeat(150);
        let event =
            RequestEvent::for_new_request(1, Priority::Urgent, IssueType::Other, None, 0, &long);
        assert_eq!(event.body.chars().count(), 103); // 100 chars + ellipsis
    }

    #[test]
    fn test_normal_priority_selects_new_request_variant() {
        let event = RequestEvent::for_new_request(
            3,
            Priority::Medium,
            IssueType::Tires,
            None,
            0,
            "Neumático desgastado",
        );
        assert_eq!(event.kind, EventKind::NewRequest);
        assert_eq!(event.body, "neumaticos - Prioridad: media");
    }
}
