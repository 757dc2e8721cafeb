//! Lookup tables used by the reconciler
//!
//! Built once per instance from configuration and passed explicitly; none
//! of them performs I/O. A missing key is a normal outcome: no status
//! change, unassigned, or no story points.

mod status;
mod story_points;
mod usermap;

pub use status::StatusMap;
pub use story_points::StoryPointMapper;
pub use usermap::UserMapper;
