pub mod domain;
pub mod repo;
pub mod repository;
pub mod service;
