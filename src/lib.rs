#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Geopipe Core
//!
//! Persistence-backed orchestration core for pipelines of long-running,
//! externally executed geospatial processing stages.
//!
//! ## Overview
//!
//! The core tracks the lifecycle of processing work (jobs, their tasks and
//! each task's steps) together with an asynchronous event inbox and a
//! recurring-schedule registry that coordinate the producers and consumers
//! of that work. Job submitters, step executors, the event consumer and the
//! scheduler loop are all external processes; the core is the durable state
//! substrate they read and write concurrently.
//!
//! ## Architecture
//!
//! Every public operation is one method on the
//! [`persistence::PersistencePort`] capability interface. The production
//! backend ([`persistence::PgPersistence`]) implements each operation as a
//! single Postgres transaction routed through the
//! [`resilience::RetryExecutor`], which absorbs transient storage conflicts
//! by re-running the whole unit of work with fresh reads. Transition
//! legality lives in [`state_machine`] as pure rules shared by every
//! backend, including the [`persistence::InMemoryPersistence`] fake used
//! for testing against the port without a database.
//!
//! ## Concurrency Model
//!
//! The core is a synchronous request/response service: every operation
//! blocks its caller until the underlying transaction commits or fails, and
//! concurrency arises entirely from independent callers. There is no
//! in-process shared state; the durable store is the only shared mutable
//! resource, which keeps the core horizontally scalable behind any number
//! of stateless callers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geopipe_core::config::CoreConfig;
//! use geopipe_core::database::DatabaseConnection;
//! use geopipe_core::persistence::{PersistencePort, PgPersistence};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CoreConfig::from_env()?;
//! let db = DatabaseConnection::connect(&config.database).await?;
//! db.run_migrations().await?;
//!
//! let persistence = PgPersistence::new(db.pool().clone(), config.retry.clone());
//! let events = persistence.get_new_events().await?;
//! println!("{} events waiting", events.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod persistence;
pub mod resilience;
pub mod state_machine;

pub use config::{CoreConfig, DatabaseConfig, RetryConfig};
pub use error::{CoreError, Result};
pub use persistence::{InMemoryPersistence, PersistencePort, PgPersistence};
pub use resilience::RetryExecutor;
pub use state_machine::{ExecutionStatus, JobStatus};
