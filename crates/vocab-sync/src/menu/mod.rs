//! Positioned menus: entries, the in-memory tree, and full-fetch sources.

pub mod entry;
pub mod source;
pub mod tree;

pub use entry::{MenuEntry, MenuId};
pub use source::{MenuListing, MenuSource};
pub use tree::{ApplyOutcome, MenuInconsistency, MenuNode, MenuTree};
