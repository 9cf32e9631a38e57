//! Officers (petugas). Provisioned by seeding only.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, scope::Scope};

/// An 18-digit employee number.
pub fn validate_nip(raw: &str) -> Result<&str> {
  let raw = raw.trim();
  if raw.len() == 18 && raw.bytes().all(|b| b.is_ascii_digit()) {
    Ok(raw)
  } else {
    Err(Error::InvalidNip)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfficerRole {
  /// District-level administrator.
  AdminKecamatan,
  /// Sub-district-level administrator.
  AdminKelurahan,
}

impl OfficerRole {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::AdminKecamatan => "ADMIN_KECAMATAN",
      Self::AdminKelurahan => "ADMIN_KELURAHAN",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "ADMIN_KECAMATAN" => Ok(Self::AdminKecamatan),
      "ADMIN_KELURAHAN" => Ok(Self::AdminKelurahan),
      other => Err(Error::InvalidRole(other.to_owned())),
    }
  }

  /// Human-readable label shown in the admin header.
  pub fn label(self) -> &'static str {
    match self {
      Self::AdminKecamatan => "Admin Kecamatan",
      Self::AdminKelurahan => "Admin Kelurahan",
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Officer {
  pub officer_id:    Uuid,
  pub nip:           String,
  pub name:          String,
  pub username:      String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub role:          OfficerRole,
  /// `None` means the officer works at district level.
  pub kelurahan_id:  Option<i16>,
}

impl Officer {
  pub fn scope(&self) -> Scope { Scope::from_kelurahan(self.kelurahan_id) }
}

/// Input to [`crate::store::PortalStore::add_officer`].
#[derive(Debug, Clone)]
pub struct NewOfficer {
  pub nip:           String,
  pub name:          String,
  pub username:      String,
  pub password_hash: String,
  pub kelurahan_id:  Option<i16>,
}

impl NewOfficer {
  /// District officers have no kelurahan.
  pub fn role(&self) -> OfficerRole {
    if self.kelurahan_id.is_some() {
      OfficerRole::AdminKelurahan
    } else {
      OfficerRole::AdminKecamatan
    }
  }
}
