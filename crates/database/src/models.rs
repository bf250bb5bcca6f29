//! Database models.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use workshop_core::{Classification, IssueType, Priority};

/// Role of a user in the workshop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Driver,
    Mechanic,
    Supervisor,
    Admin,
}

/// A user: driver, mechanic, supervisor or admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// E.164 phone number; drivers are matched to conversations by it.
    pub phone: Option<String>,
    pub role: Role,
    pub active: bool,
}

/// A fleet vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: i64,
    /// License plate, stored uppercase.
    pub plate: String,
    pub brand: String,
    pub model: String,
}

/// Conversation lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Closed,
}

/// Step of the guided intake dialogue, with the fields captured so far.
///
/// Each step carries exactly the data that is valid at that point, so a
/// later step can never observe a missing earlier field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum IntakeState {
    #[default]
    Initial,
    AwaitingPlate,
    AwaitingProblem {
        plate: String,
        vehicle_id: Option<i64>,
    },
    Confirmation {
        plate: String,
        vehicle_id: Option<i64>,
        problem: String,
        photos: Vec<String>,
    },
    /// Transient: an intake just finished; the next message starts over.
    Completed,
}

/// A per-phone-number conversation with a driver.
#[derive(Debug, Clone, FromRow)]
pub struct Conversation {
    pub id: i64,
    pub phone: String,
    pub driver_id: Option<i64>,
    pub status: ConversationStatus,
    pub intake: Json<IntakeState>,
    pub last_greeting: Option<NaiveDateTime>,
    pub last_message: Option<NaiveDateTime>,
    /// Inbound messages since the last completed intake.
    pub idle_messages: i64,
    /// The request currently in flight for this number, if any.
    pub active_request_id: Option<i64>,
}

/// Maintenance request lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// Whether the request no longer blocks its conversation.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Completed | RequestStatus::Cancelled | RequestStatus::Rejected
        )
    }
}

/// A reported vehicle issue awaiting supervisor action.
#[derive(Debug, Clone, FromRow)]
pub struct MaintenanceRequest {
    pub id: i64,
    pub driver_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    /// Originating phone number, when the request came in over chat.
    pub phone: Option<String>,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub issue_type: IssueType,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub status: RequestStatus,
    pub photos: Json<Vec<String>>,
    /// Raw classifier result, kept for supervisor review.
    pub classification: Option<Json<Classification>>,
    pub supervisor_notes: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Work order lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    Assigned,
    InProgress,
    Completed,
    Paused,
    Cancelled,
}

/// The authorized unit of mechanical work derived from an approved request.
#[derive(Debug, Clone, FromRow)]
pub struct WorkOrder {
    pub id: i64,
    pub request_id: i64,
    pub mechanic_id: Option<i64>,
    pub supervisor_id: Option<i64>,
    pub assigned_at: NaiveDateTime,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
    pub diagnosis: Option<String>,
    pub work_performed: Option<String>,
    pub parts_used: Json<Vec<String>>,
    pub total_cost: f64,
    pub work_hours: f64,
    pub status: WorkOrderStatus,
    pub notes: Option<String>,
}

/// Appointment lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// States that occupy a (mechanic, date, slot) booking.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled
                | AppointmentStatus::Confirmed
                | AppointmentStatus::InProgress
        )
    }
}

/// How an appointment was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentOrigin {
    Automatic,
    Manual,
}

/// A scheduled (mechanic, date, time-slot) booking linked to a request.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Appointment {
    pub id: i64,
    pub request_id: i64,
    pub mechanic_id: i64,
    pub date: NaiveDate,
    /// One of the fixed workshop slots, "HH:MM".
    pub time: String,
    pub duration_minutes: i64,
    pub status: AppointmentStatus,
    pub origin: AppointmentOrigin,
    pub notes: Option<String>,
}

/// Direction of a logged chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// A logged chat message, kept for audit and context.
#[derive(Debug, Clone, FromRow)]
pub struct MessageEntry {
    pub id: i64,
    pub conversation_id: i64,
    pub phone: String,
    pub direction: MessageDirection,
    pub text: String,
    pub photo_count: i64,
    /// Whether this message completed an intake flow.
    pub completed_intake: bool,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intake_state_serializes_tagged() {
        let state = IntakeState::AwaitingProblem {
            plate: "AB1234".to_string(),
            vehicle_id: Some(3),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["step"], "awaiting_problem");
        assert_eq!(json["plate"], "AB1234");

        let back: IntakeState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn test_intake_state_default_matches_schema_default() {
        let parsed: IntakeState = serde_json::from_str(r#"{"step":"initial"}"#).unwrap();
        assert_eq!(parsed, IntakeState::default());
    }

    #[test]
    fn test_appointment_active_states() {
        assert!(AppointmentStatus::Scheduled.is_active());
        assert!(AppointmentStatus::Confirmed.is_active());
        assert!(AppointmentStatus::InProgress.is_active());
        assert!(!AppointmentStatus::Completed.is_active());
        assert!(!AppointmentStatus::Cancelled.is_active());
    }

    #[test]
    fn test_request_terminal_states() {
        assert!(RequestStatus::Completed.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::Approved.is_terminal());
        assert!(!RequestStatus::InProgress.is_terminal());
    }
}
