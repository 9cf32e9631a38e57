//! The application status state machine.
//!
//! ```text
//! TERDAFTAR ─▶ VERIFIKASI ─▶ PROSES ─▶ SIAP_AMBIL ─▶ SELESAI
//!                   │
//!                   └──────▶ DITOLAK
//! ```
//!
//! Officers may set any of the five officer-settable states directly; the
//! ordering is not enforced so that mistakes can be corrected by hand.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
  /// Just created; no officer has looked at it yet.
  Terdaftar,
  Verifikasi,
  Proses,
  SiapAmbil,
  Selesai,
  Ditolak,
}

impl ApplicationStatus {
  /// The states an officer may move an application into.
  pub const OFFICER_SETTABLE: [Self; 5] = [
    Self::Verifikasi,
    Self::Proses,
    Self::SiapAmbil,
    Self::Selesai,
    Self::Ditolak,
  ];

  /// States that block a citizen from opening another application. A fresh
  /// `TERDAFTAR` booking holds a seat just like one under review.
  pub const ACTIVE: [Self; 4] = [
    Self::Terdaftar,
    Self::Verifikasi,
    Self::Proses,
    Self::SiapAmbil,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Terdaftar => "TERDAFTAR",
      Self::Verifikasi => "VERIFIKASI",
      Self::Proses => "PROSES",
      Self::SiapAmbil => "SIAP_AMBIL",
      Self::Selesai => "SELESAI",
      Self::Ditolak => "DITOLAK",
    }
  }

  /// Parse any stored status value.
  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "TERDAFTAR" => Ok(Self::Terdaftar),
      "VERIFIKASI" => Ok(Self::Verifikasi),
      "PROSES" => Ok(Self::Proses),
      "SIAP_AMBIL" => Ok(Self::SiapAmbil),
      "SELESAI" => Ok(Self::Selesai),
      "DITOLAK" => Ok(Self::Ditolak),
      other => Err(Error::InvalidStatus(other.to_owned())),
    }
  }

  /// Parse a status submitted by an officer. `TERDAFTAR` is rejected.
  pub fn parse_officer_settable(s: &str) -> Result<Self> {
    match Self::parse(s.trim()) {
      Ok(status) if status.is_officer_settable() => Ok(status),
      _ => Err(Error::InvalidStatus(s.to_owned())),
    }
  }

  pub fn is_officer_settable(self) -> bool { !matches!(self, Self::Terdaftar) }

  pub fn is_active(self) -> bool { Self::ACTIVE.contains(&self) }

  pub fn is_terminal(self) -> bool { matches!(self, Self::Selesai | Self::Ditolak) }

  /// Display label used by the views.
  pub fn label(self) -> &'static str {
    match self {
      Self::Terdaftar => "Terdaftar",
      Self::Verifikasi => "Verifikasi",
      Self::Proses => "Proses",
      Self::SiapAmbil => "Siap Ambil",
      Self::Selesai => "Selesai",
      Self::Ditolak => "Ditolak",
    }
  }
}

impl fmt::Display for ApplicationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Per-status counters for dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
  pub total:      u64,
  pub terdaftar:  u64,
  pub verifikasi: u64,
  pub proses:     u64,
  pub siap_ambil: u64,
  pub selesai:    u64,
  pub ditolak:    u64,
}

impl StatusCounts {
  /// Add `n` applications in `status`.
  pub fn add(&mut self, status: ApplicationStatus, n: u64) {
    self.total += n;
    let slot = match status {
      ApplicationStatus::Terdaftar => &mut self.terdaftar,
      ApplicationStatus::Verifikasi => &mut self.verifikasi,
      ApplicationStatus::Proses => &mut self.proses,
      ApplicationStatus::SiapAmbil => &mut self.siap_ambil,
      ApplicationStatus::Selesai => &mut self.selesai,
      ApplicationStatus::Ditolak => &mut self.ditolak,
    };
    *slot += n;
  }

  pub fn active(&self) -> u64 {
    self.terdaftar + self.verifikasi + self.proses + self.siap_ambil
  }
}
