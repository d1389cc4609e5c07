pub mod git;
pub mod hook;
pub mod usage;

pub use git::GitInfo;
pub use hook::StatusInput;
pub use usage::{UsageSnapshot, UsageWindow};
