pub mod db;
pub mod errors;
pub mod session;
pub mod ticket;
pub mod ticket_assignment;
pub mod user;

#[cfg(test)]
mod tests;
