//! Pure visibility predicates over already-loaded rows. Visibility governs
//! reads; authorship governs update/delete/assign/unassign; assignee-ship
//! governs status transitions.

use uuid::Uuid;

use super::domain::Ticket;

pub fn is_author(ticket: &Ticket, user: Uuid) -> bool {
    ticket.created_by == user
}

/// Only an open assignment counts; history rows do not.
pub fn is_assignee(current_assignee: Option<Uuid>, user: Uuid) -> bool {
    current_assignee == Some(user)
}

pub fn is_visible(ticket: &Ticket, current_assignee: Option<Uuid>, user: Uuid) -> bool {
    ticket.deleted_at.is_none() && (is_author(ticket, user) || is_assignee(current_assignee, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::domain::TicketStatus;
    use chrono::Utc;

    fn ticket(created_by: Uuid) -> Ticket {
        let now = Utc::now().into();
        Ticket {
            id: Uuid::new_v4(),
            title: "broken printer".into(),
            description: String::new(),
            status: TicketStatus::Pending,
            file_path: None,
            created_by,
            created_at: now,
            updated_at: now,
            completed_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn author_sees_own_ticket() {
        let author = Uuid::new_v4();
        assert!(is_visible(&ticket(author), None, author));
    }

    #[test]
    fn open_assignee_sees_ticket() {
        let author = Uuid::new_v4();
        let staff = Uuid::new_v4();
        assert!(is_visible(&ticket(author), Some(staff), staff));
    }

    #[test]
    fn unrelated_user_sees_nothing() {
        let author = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        assert!(!is_visible(&ticket(author), None, stranger));
        assert!(!is_visible(&ticket(author), Some(Uuid::new_v4()), stranger));
    }

    #[test]
    fn deleted_ticket_is_invisible_even_to_author() {
        let author = Uuid::new_v4();
        let mut t = ticket(author);
        t.deleted_at = Some(Utc::now().into());
        assert!(!is_visible(&t, None, author));
        assert!(is_author(&t, author));
    }
}
