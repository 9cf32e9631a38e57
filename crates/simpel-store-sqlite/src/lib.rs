//! SQLite backend for the SIMPEL-KTP portal.
//!
//! All statements run on the single connection thread owned by
//! [`tokio_rusqlite`], so writes are serialised. Multi-row writes use
//! `BEGIN IMMEDIATE` transactions.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
