//! Citizens (warga), the people who apply for identity cards.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, scope::Scope};

// ─── NIK ─────────────────────────────────────────────────────────────────────

/// A 16-digit national identity number. Immutable key of a citizen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nik(String);

impl Nik {
  pub const LEN: usize = 16;

  pub fn parse(raw: &str) -> Result<Self> {
    let raw = raw.trim();
    if raw.len() == Self::LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
      Ok(Self(raw.to_owned()))
    } else {
      Err(Error::InvalidNik)
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Nik {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::parse(&value) }
}

impl From<Nik> for String {
  fn from(nik: Nik) -> Self { nik.0 }
}

impl fmt::Display for Nik {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Sex ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
  LakiLaki,
  Perempuan,
}

impl Sex {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::LakiLaki => "LAKI_LAKI",
      Self::Perempuan => "PEREMPUAN",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "LAKI_LAKI" => Ok(Self::LakiLaki),
      "PEREMPUAN" => Ok(Self::Perempuan),
      other => Err(Error::InvalidSex(other.to_owned())),
    }
  }
}

// ─── Citizen ─────────────────────────────────────────────────────────────────

/// A citizen record as stored.
#[derive(Debug, Clone, Serialize)]
pub struct Citizen {
  pub nik:           Nik,
  pub full_name:     String,
  pub sex:           Sex,
  pub address:       Option<String>,
  pub phone:         Option<String>,
  pub email:         Option<String>,
  pub kelurahan_id:  Option<i16>,
  /// Argon2 PHC string. `None` for seeded accounts that cannot log in yet.
  #[serde(skip_serializing)]
  pub password_hash: Option<String>,
  pub created_at:    DateTime<Utc>,
}

impl Citizen {
  pub fn has_password(&self) -> bool {
    self.password_hash.as_deref().is_some_and(|h| !h.is_empty())
  }
}

/// A citizen joined with the name of their home kelurahan, for display.
#[derive(Debug, Clone, Serialize)]
pub struct CitizenProfile {
  pub nik:            Nik,
  pub full_name:      String,
  pub sex:            Sex,
  pub address:        Option<String>,
  pub phone:          Option<String>,
  pub email:          Option<String>,
  pub kelurahan_id:   Option<i16>,
  pub kelurahan_name: Option<String>,
}

/// Input to [`crate::store::PortalStore::register_citizen`].
#[derive(Debug, Clone)]
pub struct NewCitizen {
  pub nik:           Nik,
  pub full_name:     String,
  pub sex:           Sex,
  pub address:       Option<String>,
  pub phone:         Option<String>,
  pub email:         Option<String>,
  pub kelurahan_id:  Option<i16>,
  pub password_hash: Option<String>,
}

/// Parameters for [`crate::store::PortalStore::list_citizens`].
#[derive(Debug, Clone)]
pub struct CitizenQuery {
  pub scope:  Scope,
  /// Matched against NIK and name.
  pub search: Option<String>,
  pub limit:  Option<usize>,
}

/// Roster counters for the officer citizen page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CitizenStats {
  pub total:     u64,
  pub male:      u64,
  pub female:    u64,
}
