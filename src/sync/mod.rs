//! Sync orchestration
//!
//! [`SyncEngine`] walks every enabled instance, builds its scopes from the
//! configured and discovered repositories, reconciles each scope and applies
//! the resulting actions to the board. The outcome of a pass is a
//! [`SyncReport`].

mod engine;
mod report;

pub use engine::SyncEngine;
pub use report::{ActionFailure, RunMode, ScopeReport, SyncReport};
