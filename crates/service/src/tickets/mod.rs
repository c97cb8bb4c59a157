pub mod domain;
pub mod policy;
pub mod repo;
pub mod repository;
pub mod service;
