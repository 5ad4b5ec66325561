//! Recurring knowledge-refresh scheduler.
//!
//! This crate provides:
//! - Pure next-run computation for recurrence specs (incl. cron)
//! - Async store/registry traits with in-memory and JSON-file backends
//! - The execution engine that resolves, filters, and refreshes items
//! - A bounded run-history ledger embedded in each record
//! - The poller that claims and executes due updates on a fixed tick

pub mod engine;
pub mod file_store;
pub mod history;
pub mod memory_store;
pub mod poller;
pub mod recurrence;
pub mod service;
pub mod store;

pub use engine::ExecutionEngine;
pub use memory_store::{MemoryRegistry, MemoryStore};
pub use poller::SchedulerPoller;
pub use service::ScheduledUpdateService;
pub use store::{ContentRegistry, RegistryError, ScheduledUpdateStore, StoreError};
