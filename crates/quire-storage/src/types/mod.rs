//! Type definitions for quire storage.

mod accounts;
mod groups;
mod ids;
mod invite_links;
mod invites;
mod members;

// Re-export all types from submodules
pub use accounts::*;
pub use groups::*;
pub use ids::*;
pub use invite_links::*;
pub use invites::*;
pub use members::*;
