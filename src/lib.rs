//! jira-sync - Reconcile source tracker tickets onto a JIRA board
//!
//! jira-sync reads open (and optionally recently closed) tickets from Pagure,
//! GitHub, GitLab and Forgejo repositories and mirrors them as issues on one
//! JIRA project. Every run recomputes the desired board state from scratch,
//! so repeated runs converge without any local state.
//!
//! # Architecture
//!
//! - **config**: TOML configuration, inheritance and validation
//! - **model**: Tickets, board issues, scopes and embedded-link matching
//! - **mapping**: Status, user and story-point lookups
//! - **reconcile**: Pure decision core producing board actions
//! - **integrations**: Tracker adapters and the JIRA board client
//! - **sync**: Engine driving one pass per scope, run reports

// Core modules
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

// Decision logic
pub mod mapping;
pub mod reconcile;

// I/O
pub mod integrations;
pub mod sync;

// Re-exports
pub use error::{Result, SyncError};
