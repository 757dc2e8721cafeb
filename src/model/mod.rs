//! Data model shared by adapters, the reconciler and the sync engine
//!
//! - [`TicketRecord`]: a normalized source ticket
//! - [`BoardIssue`]: an issue on the board
//! - [`Scope`]: one (source instance, repository) pair

mod board;
mod link;
mod scope;
mod ticket;

pub use board::BoardIssue;
pub use link::contains_link;
pub use scope::Scope;
pub use ticket::{TicketRecord, TicketState};
