use crate::db::connect;
use crate::{session, ticket, ticket_assignment, user};
use anyhow::Result;
use chrono::Utc;
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

/// Connect and migrate; `None` means the database is unavailable and the
/// test should be skipped.
async fn setup_test_db() -> Option<DatabaseConnection> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return None;
    }
    let db = match connect().await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("skip: cannot connect to db: {}", e);
            return None;
        }
    };
    if let Err(e) = migration::Migrator::up(&db, None).await {
        eprintln!("skip: migrate up failed: {}", e);
        return None;
    }
    Some(db)
}

#[tokio::test]
async fn test_user_crud() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let email = format!("crud_{}@example.com", Uuid::new_v4());
    let created = user::create(&db, "Crud User", &email, "x-hash", "user").await?;
    assert_eq!(created.email, email);
    assert!(created.is_active);
    assert!(created.deleted_at.is_none());

    // Email lookup is case-insensitive because storage lowercases
    let found = user::find_live_by_email(&db, &email.to_uppercase()).await?;
    assert_eq!(found.map(|u| u.id), Some(created.id));

    user::soft_delete(&db, created.id).await?;
    let after = user::Entity::find_by_id(created.id).one(&db).await?.unwrap();
    assert!(after.deleted_at.is_some());
    assert!(!after.is_active);
    // Soft-deleted users are invisible to live lookups
    assert!(user::find_live_by_email(&db, &email).await?.is_none());

    user::Entity::delete_by_id(created.id).exec(&db).await?;
    Ok(())
}

#[tokio::test]
async fn test_duplicate_live_email_rejected() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let email = format!("dup_{}@example.com", Uuid::new_v4());
    let first = user::create(&db, "First", &email, "h", "user").await?;
    // The partial unique index rejects a second live row regardless of case
    let second = user::create(&db, "Second", &email.to_uppercase(), "h", "user").await;
    assert!(second.is_err());

    user::Entity::delete_by_id(first.id).exec(&db).await?;
    Ok(())
}

#[tokio::test]
async fn test_session_lifecycle() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let email = format!("sess_{}@example.com", Uuid::new_v4());
    let u = user::create(&db, "Sess User", &email, "h", "staff").await?;

    let s = session::create(&db, u.id, 24).await?;
    assert!(s.cached_role.is_none());

    let found = session::find_valid(&db, s.id).await?;
    assert_eq!(found.map(|m| m.user_id), Some(u.id));

    session::cache_role(&db, s.id, "staff").await?;
    let cached = session::find_valid(&db, s.id).await?.unwrap();
    assert_eq!(cached.cached_role.as_deref(), Some("staff"));

    session::delete(&db, s.id).await?;
    assert!(session::find_valid(&db, s.id).await?.is_none());
    // deleting again is a no-op
    session::delete(&db, s.id).await?;

    user::Entity::delete_by_id(u.id).exec(&db).await?;
    Ok(())
}

#[tokio::test]
async fn test_ticket_and_assignment_history() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let author = user::create(&db, "Author", &format!("a_{}@example.com", Uuid::new_v4()), "h", "user").await?;
    let staff = user::create(&db, "Staff", &format!("s_{}@example.com", Uuid::new_v4()), "h", "staff").await?;

    let t = ticket::create(&db, "Printer jam", "Tray 2 again", None, author.id).await?;
    assert_eq!(t.status, "pending");
    assert!(t.completed_at.is_none());

    // Open an assignment, close it, open another: history accumulates,
    // only one row stays open.
    let a1 = ticket_assignment::open_row(t.id, staff.id).insert(&db).await?;
    let open = ticket_assignment::find_open(&db, t.id).await?.unwrap();
    assert_eq!(open.id, a1.id);

    let mut closing: ticket_assignment::ActiveModel = a1.into();
    closing.unassigned_at = Set(Some(Utc::now().into()));
    closing.update(&db).await?;

    let a2 = ticket_assignment::open_row(t.id, author.id).insert(&db).await?;
    let open = ticket_assignment::find_open(&db, t.id).await?.unwrap();
    assert_eq!(open.id, a2.id);

    let history = ticket_assignment::Entity::find()
        .filter(ticket_assignment::Column::TicketId.eq(t.id))
        .all(&db)
        .await?;
    assert_eq!(history.len(), 2);

    ticket::soft_delete(&db, t.id).await?;
    let after = ticket::Entity::find_by_id(t.id).one(&db).await?.unwrap();
    assert!(after.deleted_at.is_some());

    ticket_assignment::Entity::delete_many()
        .filter(ticket_assignment::Column::TicketId.eq(t.id))
        .exec(&db)
        .await?;
    ticket::Entity::delete_by_id(t.id).exec(&db).await?;
    user::Entity::delete_by_id(staff.id).exec(&db).await?;
    user::Entity::delete_by_id(author.id).exec(&db).await?;
    Ok(())
}

#[tokio::test]
async fn test_open_assignment_unique_per_ticket() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };

    let author = user::create(&db, "Author", &format!("u_{}@example.com", Uuid::new_v4()), "h", "user").await?;
    let t = ticket::create(&db, "Unique open", "", None, author.id).await?;

    ticket_assignment::open_row(t.id, author.id).insert(&db).await?;
    // Second open row violates the partial unique index
    let second = ticket_assignment::open_row(t.id, author.id).insert(&db).await;
    assert!(second.is_err());

    ticket_assignment::Entity::delete_many()
        .filter(ticket_assignment::Column::TicketId.eq(t.id))
        .exec(&db)
        .await?;
    ticket::Entity::delete_by_id(t.id).exec(&db).await?;
    user::Entity::delete_by_id(author.id).exec(&db).await?;
    Ok(())
}
