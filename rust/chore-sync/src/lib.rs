//! Chore Sync - schedule management for a multidimensional planning server
//!
//! A chore is a named, recurring schedule that runs a sequence of processes
//! on the server. This crate models chores locally and keeps the server's
//! copies in step with them:
//!
//! - **Model**: chores, their steps, frequencies and start times, with the
//!   exact wire encodings the server uses
//! - **Synchronization**: create, read, update, delete, activation and
//!   execution over the server's REST API
//! - **Search**: find chores by the processes they run or the parameter
//!   values they pass
//!
//! # Architecture
//!
//! - [`chore`]: Local chore model and wire encodings
//! - [`service`]: Remote operations over a pluggable transport
//! - [`paths`]: REST resource paths
//! - [`config`]: Connection and logging configuration
//! - [`logging`]: Structured operation logging
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chore_sync::{ChoreService, HttpTransport, config::ClientConfig};
//! use chore_sync::chore::{Chore, ExecutionMode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::load()?;
//!     chore_sync::logging::init_tracing(&config.logging);
//!
//!     let service = ChoreService::new(Arc::new(HttpTransport::new(&config.server)?));
//!
//!     let mut chore = Chore::new("Nightly Load", ExecutionMode::SingleCommit);
//!     chore.add_task("load.sales", []);
//!     service.update_or_create(&chore).await?;
//!     Ok(())
//! }
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod chore;
pub mod config;
pub mod error;
pub mod logging;
pub mod paths;
pub mod service;

pub use chore::{
    Chore, ChoreFrequency, ChoreStartTime, ChoreTask, ExecutionMode, ParameterValue,
    TaskParameter,
};
pub use error::{ChoreError, ChoreResult};
pub use service::{ChoreService, ExecutionAcknowledgement, HttpTransport, RestResponse, RestTransport};
