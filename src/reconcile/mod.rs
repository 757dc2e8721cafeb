//! Reconciliation core
//!
//! Given the tickets of one scope and the board issues labeled for it, the
//! [`Reconciler`] decides which issues to create, update, transition or
//! close. Matching relies solely on the ticket URL embedded in the board
//! issue description:
//!
//! 1. Open tickets are matched against open board issues.
//! 2. Still unmatched open tickets are matched against closed board issues,
//!    so a ticket reopened upstream reuses its old issue.
//! 3. Open tickets left over are created.
//! 4. Recently closed tickets close the open issue they match.
//! 5. Open board issues no ticket claimed are closed as orphans.

mod action;
mod reconciler;

pub use action::{Action, CloseReason, NewIssue};
pub use reconciler::{issue_description, Reconciler};
