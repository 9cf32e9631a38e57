//! Administrative scope of an officer.
//!
//! Every officer-facing read or write is filtered by a [`Scope`]. Backends
//! apply it inside the query so out-of-scope rows are never counted or
//! returned.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "level", content = "kelurahan_id", rename_all = "snake_case")]
pub enum Scope {
  /// District-wide visibility (kecamatan officer).
  District,
  /// Restricted to one kelurahan.
  Kelurahan(i16),
}

impl Scope {
  /// Scope derived from an officer's optional kelurahan reference.
  pub fn from_kelurahan(kelurahan_id: Option<i16>) -> Self {
    match kelurahan_id {
      Some(id) => Self::Kelurahan(id),
      None => Self::District,
    }
  }

  /// The kelurahan to filter on, or `None` for district-wide access.
  pub fn kelurahan_id(self) -> Option<i16> {
    match self {
      Self::District => None,
      Self::Kelurahan(id) => Some(id),
    }
  }

  pub fn is_district(self) -> bool { matches!(self, Self::District) }

  /// Whether a row located in `location` (`None` = district office) is
  /// visible from this scope.
  pub fn covers(self, location: Option<i16>) -> bool {
    match self {
      Self::District => true,
      Self::Kelurahan(id) => location == Some(id),
    }
  }
}
