//! Error types for `simpel-core`.
//!
//! These are domain outcomes. Storage backends surface them unchanged so the
//! HTTP layer can tell a business-rule violation apart from an I/O failure.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("NIK must be exactly 16 digits")]
  InvalidNik,

  #[error("NIP must be exactly 18 digits")]
  InvalidNip,

  #[error("unknown application status: {0:?}")]
  InvalidStatus(String),

  #[error("unknown application kind: {0:?}")]
  InvalidKind(String),

  #[error("unknown session status: {0:?}")]
  InvalidSessionStatus(String),

  #[error("unknown document kind: {0:?}")]
  InvalidDocumentKind(String),

  #[error("unknown officer role: {0:?}")]
  InvalidRole(String),

  #[error("unknown sex: {0:?}")]
  InvalidSex(String),

  #[error("slot end time must be after its start time")]
  InvalidSlotTimes,

  #[error("citizen already has an application in progress")]
  ActiveApplicationExists,

  #[error("slot {0} has no remaining capacity or is closed")]
  SlotUnavailable(Uuid),

  #[error("slot not found: {0}")]
  SlotNotFound(Uuid),

  #[error("application not found: {0}")]
  ApplicationNotFound(Uuid),

  #[error("citizen not found: {0}")]
  CitizenNotFound(String),

  #[error("kelurahan not found: {0}")]
  KelurahanNotFound(i16),

  #[error("NIK already registered")]
  NikAlreadyRegistered,

  #[error("email already registered")]
  EmailAlreadyRegistered,

  #[error("a slot already exists at that date, time and location")]
  DuplicateSlot,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
