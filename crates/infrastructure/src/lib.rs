//! Infrastructure adapters for the connection resolution engine.

#![forbid(unsafe_code)]

mod in_memory_connection_repository;
mod postgres_connection_repository;

pub use in_memory_connection_repository::InMemoryConnectionRepository;
pub use postgres_connection_repository::PostgresConnectionRepository;
