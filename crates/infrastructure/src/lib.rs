//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_authorization_repository;
mod postgres_authorization_repository;
mod structured_criteria_matcher;

pub use in_memory_authorization_repository::InMemoryAuthorizationRepository;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use structured_criteria_matcher::StructuredCriteriaMatcher;
