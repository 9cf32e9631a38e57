//! Domain model of the SIMPEL-KTP identity-card portal.
//!
//! Holds the status workflow, slot and quota rules, the tracker projection
//! and the [`store::PortalStore`] trait. Nothing here talks HTTP or SQL; the
//! `simpel-store-sqlite` and `simpel-web` crates build on top of it.

pub mod application;
pub mod citizen;
pub mod document;
pub mod error;
pub mod history;
pub mod kelurahan;
pub mod officer;
pub mod scope;
pub mod slot;
pub mod status;
pub mod store;
pub mod tracker;

pub use error::{Error, Result};
