//! Storage abstraction for quire.
//!
//! Backend crates (e.g., quire-store-sqlite) implement [`Store`] so the server
//! doesn't depend on any specific database engine or schema details.
//!
//! Every method that mutates a group takes the acting account and encodes the
//! authorization rule in the same atomic storage operation as the mutation.
//! A predicate that does not match is reported as [`StoreError::NotFound`], so
//! callers cannot tell "missing" apart from "not allowed".

mod store;
pub mod types;

pub use store::*;
pub use types::*;

use thiserror::Error;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
}
