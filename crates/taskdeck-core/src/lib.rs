//! Server-side domain for taskdeck: the JSON file store, the lock-protected
//! task service, configuration loading and tracing setup shared by both
//! binaries.

pub mod cli;
pub mod config;
pub mod datastore;
pub mod service;

pub use service::{ServiceError, TaskService};
