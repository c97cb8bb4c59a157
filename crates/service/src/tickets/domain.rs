use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ticket lifecycle states. Stored as lowercase strings, typed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    InProgress,
    Completed,
    OnHold,
}

impl TicketStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "inprogress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "onhold" => Some(Self::OnHold),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "inprogress",
            Self::Completed => "completed",
            Self::OnHold => "onhold",
        }
    }
}

/// Ticket row as the services see it.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub file_path: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub deleted_at: Option<DateTime<FixedOffset>>,
}

/// List row with the author and current assignee resolved to names.
#[derive(Debug, Clone, Serialize)]
pub struct TicketSummary {
    pub id: Uuid,
    pub title: String,
    pub status: TicketStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub author_name: String,
    /// `-` when nobody holds an open assignment.
    pub assignee_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Assignee {
    pub id: Uuid,
    pub name: String,
}

/// Full single-ticket view.
#[derive(Debug, Clone, Serialize)]
pub struct TicketDetail {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub file_path: Option<String>,
    pub created_by: Uuid,
    pub author_name: String,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub assignee: Option<Assignee>,
}

/// Create/update payload. `file_path` is an opaque reference; on update a
/// missing value keeps the stored one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveTicketInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_all_known_values() {
        for (raw, want) in [
            ("pending", TicketStatus::Pending),
            ("INPROGRESS", TicketStatus::InProgress),
            (" completed ", TicketStatus::Completed),
            ("onhold", TicketStatus::OnHold),
        ] {
            assert_eq!(TicketStatus::parse(raw), Some(want));
        }
        assert_eq!(TicketStatus::parse("done"), None);
    }

    #[test]
    fn status_round_trips_through_as_str() {
        for status in [
            TicketStatus::Pending,
            TicketStatus::InProgress,
            TicketStatus::Completed,
            TicketStatus::OnHold,
        ] {
            assert_eq!(TicketStatus::parse(status.as_str()), Some(status));
        }
    }
}
