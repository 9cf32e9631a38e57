//! Append-only status history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::status::ApplicationStatus;

/// Shown when a transition was not made by an officer.
pub const SYSTEM_ACTOR: &str = "Sistem";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusHistoryEntry {
  pub history_id:     Uuid,
  pub application_id: Uuid,
  pub status:         ApplicationStatus,
  pub note:           Option<String>,
  pub officer_id:     Option<Uuid>,
  /// Joined officer name.
  pub officer_name:   Option<String>,
  pub changed_at:     DateTime<Utc>,
}

impl StatusHistoryEntry {
  pub fn actor(&self) -> &str {
    self.officer_name.as_deref().unwrap_or(SYSTEM_ACTOR)
  }
}
