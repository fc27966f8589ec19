//! Core traits defined in `vocab-core` and implemented by other crates.

pub mod clock;
pub mod local_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use local_store::LocalStore;
