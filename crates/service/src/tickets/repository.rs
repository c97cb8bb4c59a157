use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use uuid::Uuid;

use super::domain::{Ticket, TicketStatus, TicketSummary};
use crate::errors::ServiceError;

/// Hard cap on list queries; there is no pagination below this.
pub const MAX_LIST_ROWS: u64 = 500;

/// Placeholder shown when a ticket has no open assignment.
pub const NO_ASSIGNEE: &str = "-";

/// Repository abstraction for ticket persistence.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Non-deleted ticket by id.
    async fn find(&self, id: Uuid) -> Result<Option<Ticket>, ServiceError>;
    /// User holding the open assignment, if any.
    async fn current_assignee(&self, ticket_id: Uuid) -> Result<Option<Uuid>, ServiceError>;
    /// Tickets the user authored or is open-assigned to, newest first,
    /// capped at [`MAX_LIST_ROWS`]. `q` filters case-insensitively on title,
    /// description and author name.
    async fn list_visible(
        &self,
        user_id: Uuid,
        q: Option<&str>,
    ) -> Result<Vec<TicketSummary>, ServiceError>;

    async fn user_name(&self, id: Uuid) -> Result<Option<String>, ServiceError>;
    /// Whether the user exists and is not soft-deleted.
    async fn is_live_user(&self, id: Uuid) -> Result<bool, ServiceError>;

    async fn create(
        &self,
        created_by: Uuid,
        title: &str,
        description: &str,
        file_path: Option<String>,
    ) -> Result<Ticket, ServiceError>;
    /// `file_path` here is the final stored value, resolved by the service.
    async fn update(
        &self,
        id: Uuid,
        title: &str,
        description: &str,
        file_path: Option<String>,
    ) -> Result<Ticket, ServiceError>;
    async fn soft_delete(&self, id: Uuid) -> Result<(), ServiceError>;
    async fn set_status(
        &self,
        id: Uuid,
        status: TicketStatus,
        completed_at: Option<DateTime<FixedOffset>>,
    ) -> Result<(), ServiceError>;

    /// Closes any open assignment and opens one for `assigned_to`, atomically.
    async fn assign(&self, ticket_id: Uuid, assigned_to: Uuid) -> Result<(), ServiceError>;
    /// Closes the open assignment; a no-op when there is none.
    async fn unassign(&self, ticket_id: Uuid) -> Result<(), ServiceError>;
}

/// Simple in-memory mock repository for unit tests
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    pub struct MockAssignment {
        pub ticket_id: Uuid,
        pub assigned_to: Uuid,
        pub open: bool,
    }

    #[derive(Default)]
    pub struct MockTicketRepository {
        // insertion order doubles as created_at order
        tickets: Mutex<Vec<Ticket>>,
        assignments: Mutex<Vec<MockAssignment>>,
        users: Mutex<HashMap<Uuid, (String, bool)>>,
    }

    impl MockTicketRepository {
        pub fn seed_user(&self, id: Uuid, name: &str, live: bool) {
            self.users.lock().unwrap().insert(id, (name.to_string(), live));
        }

        /// Full history rows for a ticket, open and closed.
        pub fn assignment_rows(&self, ticket_id: Uuid) -> Vec<MockAssignment> {
            self.assignments
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.ticket_id == ticket_id)
                .cloned()
                .collect()
        }

        fn name_of(&self, id: Uuid) -> Option<String> {
            self.users.lock().unwrap().get(&id).map(|(name, _)| name.clone())
        }
    }

    #[async_trait]
    impl TicketRepository for MockTicketRepository {
        async fn find(&self, id: Uuid) -> Result<Option<Ticket>, ServiceError> {
            let tickets = self.tickets.lock().unwrap();
            Ok(tickets.iter().find(|t| t.id == id && t.deleted_at.is_none()).cloned())
        }

        async fn current_assignee(&self, ticket_id: Uuid) -> Result<Option<Uuid>, ServiceError> {
            let assignments = self.assignments.lock().unwrap();
            Ok(assignments
                .iter()
                .find(|a| a.ticket_id == ticket_id && a.open)
                .map(|a| a.assigned_to))
        }

        async fn list_visible(
            &self,
            user_id: Uuid,
            q: Option<&str>,
        ) -> Result<Vec<TicketSummary>, ServiceError> {
            let needle = q.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
            let tickets = self.tickets.lock().unwrap();
            let assignments = self.assignments.lock().unwrap();

            let open_for = |ticket_id: Uuid| {
                assignments
                    .iter()
                    .find(|a| a.ticket_id == ticket_id && a.open)
                    .map(|a| a.assigned_to)
            };

            let mut rows = Vec::new();
            for t in tickets.iter().rev() {
                if t.deleted_at.is_some() {
                    continue;
                }
                let assignee = open_for(t.id);
                if t.created_by != user_id && assignee != Some(user_id) {
                    continue;
                }
                let author_name = self.name_of(t.created_by).unwrap_or_else(|| NO_ASSIGNEE.into());
                if let Some(needle) = &needle {
                    let hit = t.title.to_lowercase().contains(needle)
                        || t.description.to_lowercase().contains(needle)
                        || author_name.to_lowercase().contains(needle);
                    if !hit {
                        continue;
                    }
                }
                let assignee_name = assignee
                    .and_then(|id| self.name_of(id))
                    .unwrap_or_else(|| NO_ASSIGNEE.into());
                rows.push(TicketSummary {
                    id: t.id,
                    title: t.title.clone(),
                    status: t.status,
                    created_by: t.created_by,
                    created_at: t.created_at,
                    updated_at: t.updated_at,
                    author_name,
                    assignee_name,
                });
                if rows.len() as u64 == MAX_LIST_ROWS {
                    break;
                }
            }
            Ok(rows)
        }

        async fn user_name(&self, id: Uuid) -> Result<Option<String>, ServiceError> {
            Ok(self.name_of(id))
        }

        async fn is_live_user(&self, id: Uuid) -> Result<bool, ServiceError> {
            Ok(self.users.lock().unwrap().get(&id).map(|(_, live)| *live).unwrap_or(false))
        }

        async fn create(
            &self,
            created_by: Uuid,
            title: &str,
            description: &str,
            file_path: Option<String>,
        ) -> Result<Ticket, ServiceError> {
            let now = Utc::now().into();
            let ticket = Ticket {
                id: Uuid::new_v4(),
                title: title.trim().to_string(),
                description: description.trim().to_string(),
                status: TicketStatus::Pending,
                file_path,
                created_by,
                created_at: now,
                updated_at: now,
                completed_at: None,
                deleted_at: None,
            };
            self.tickets.lock().unwrap().push(ticket.clone());
            Ok(ticket)
        }

        async fn update(
            &self,
            id: Uuid,
            title: &str,
            description: &str,
            file_path: Option<String>,
        ) -> Result<Ticket, ServiceError> {
            let mut tickets = self.tickets.lock().unwrap();
            let ticket = tickets
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| ServiceError::not_found("ticket"))?;
            ticket.title = title.trim().to_string();
            ticket.description = description.trim().to_string();
            ticket.file_path = file_path;
            ticket.updated_at = Utc::now().into();
            Ok(ticket.clone())
        }

        async fn soft_delete(&self, id: Uuid) -> Result<(), ServiceError> {
            let mut tickets = self.tickets.lock().unwrap();
            let ticket = tickets
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| ServiceError::not_found("ticket"))?;
            let now = Utc::now().into();
            ticket.deleted_at = Some(now);
            ticket.updated_at = now;
            Ok(())
        }

        async fn set_status(
            &self,
            id: Uuid,
            status: TicketStatus,
            completed_at: Option<DateTime<FixedOffset>>,
        ) -> Result<(), ServiceError> {
            let mut tickets = self.tickets.lock().unwrap();
            let ticket = tickets
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| ServiceError::not_found("ticket"))?;
            ticket.status = status;
            ticket.completed_at = completed_at;
            ticket.updated_at = Utc::now().into();
            Ok(())
        }

        async fn assign(&self, ticket_id: Uuid, assigned_to: Uuid) -> Result<(), ServiceError> {
            let mut assignments = self.assignments.lock().unwrap();
            for a in assignments.iter_mut() {
                if a.ticket_id == ticket_id {
                    a.open = false;
                }
            }
            assignments.push(MockAssignment { ticket_id, assigned_to, open: true });
            Ok(())
        }

        async fn unassign(&self, ticket_id: Uuid) -> Result<(), ServiceError> {
            let mut assignments = self.assignments.lock().unwrap();
            for a in assignments.iter_mut() {
                if a.ticket_id == ticket_id {
                    a.open = false;
                }
            }
            Ok(())
        }
    }
}
