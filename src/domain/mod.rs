//! Domain types and DTOs
//!
//! Data structures for LilySEO entities. Database rows are owned by
//! Postgres; these types carry the request/response contracts and the small
//! amount of business logic (tier limits, status vocabularies, batch
//! partitioning) the service enforces.

pub mod ai;
pub mod audits;
pub mod competitors;
pub mod notifications;
pub mod projects;
pub mod subscriptions;
pub mod teams;
pub mod todos;
pub mod white_label;
