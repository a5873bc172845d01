//! # Persistence
//!
//! The data-access port and its backends. Every public operation of the
//! orchestration core is one method on [`PersistencePort`]; the State
//! Machine, Configuration Store, Event Inbox and Scheduled Task Registry
//! semantics are implemented behind that capability interface so storage
//! engines can be substituted (the in-memory fake stands in for Postgres
//! in tests).

pub mod memory;
pub mod port;
pub mod postgres;

pub use memory::InMemoryPersistence;
pub use port::PersistencePort;
pub use postgres::PgPersistence;
