//! Data models

pub mod user;
pub mod pattern;
pub mod threat;
pub mod stats;

pub use user::*;
pub use pattern::*;
pub use threat::*;
pub use stats::*;
