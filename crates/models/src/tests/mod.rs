/// CRUD operations tests for all models (require a reachable database)
pub mod crud_tests;
