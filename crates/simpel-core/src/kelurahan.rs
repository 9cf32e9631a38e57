//! Kelurahan: the smallest administrative area an officer can be scoped to.

use serde::{Deserialize, Serialize};

/// Reference data for a sub-district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kelurahan {
  pub kelurahan_id: i16,
  pub name:         String,
  /// Short area code, e.g. `PMB`. Unique.
  pub area_code:    String,
}

/// Input to [`crate::store::PortalStore::add_kelurahan`].
#[derive(Debug, Clone)]
pub struct NewKelurahan {
  pub name:      String,
  pub area_code: String,
}
