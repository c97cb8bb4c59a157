//! Business services on top of the models crate, independent of the web
//! framework.
//! - Each service is generic over a repository trait with a SeaORM adapter
//!   and an in-memory mock used by unit tests.
//! - Shared error taxonomy in `errors`; HTTP mapping lives in the server.

pub mod auth;
pub mod errors;
pub mod password;
pub mod tickets;
pub mod users;
