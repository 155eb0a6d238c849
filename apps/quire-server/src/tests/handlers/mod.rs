//! RPC handler tests.
//!
//! These tests call the handler functions with already-extracted arguments.
//! They are organized by feature area.

mod accounts;
mod groups;
mod invite_links;
mod invites;
