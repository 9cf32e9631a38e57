//! Reference data for a fresh installation: the district's kelurahan and one
//! officer account per office. Rows that already exist are left untouched.

use simpel_core::{
  kelurahan::NewKelurahan,
  officer::NewOfficer,
  store::PortalStore,
};
use thiserror::Error;

use crate::password;

pub const DEFAULT_PASSWORD: &str = "admin123";

const KELURAHAN: [(&str, &str); 3] = [
  ("Pademangan Barat", "PMB"),
  ("Pademangan Timur", "PMT"),
  ("Ancol", "ACL"),
];

/// NIP, name, username, and home area code (`None` for the district office).
const OFFICERS: [(&str, &str, &str, Option<&str>); 4] = [
  ("198501152010011001", "Budi Santoso", "admin.kecamatan", None),
  ("199003202015012001", "Siti Rahayu", "admin.pademanganbarat", Some("PMB")),
  ("198807112012011002", "Ahmad Hidayat", "admin.pademangantimur", Some("PMT")),
  ("199205182018012003", "Dewi Lestari", "admin.ancol", Some("ACL")),
];

#[derive(Debug, Error)]
pub enum SeedError {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("password hashing failed: {0}")]
  Hash(String),
  #[error("kelurahan {0} missing after seeding")]
  MissingKelurahan(&'static str),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
  pub kelurahan_created: u32,
  pub officers_created:  u32,
  pub skipped:           u32,
}

pub async fn run<S: PortalStore>(store: &S) -> Result<SeedReport, SeedError> {
  let store_err = |e: S::Error| SeedError::Store(Box::new(e));
  let mut report = SeedReport::default();

  for (name, code) in KELURAHAN {
    if store.kelurahan_by_code(code).await.map_err(store_err)?.is_some() {
      report.skipped += 1;
      continue;
    }
    let created = store
      .add_kelurahan(NewKelurahan { name: name.to_owned(), area_code: code.to_owned() })
      .await
      .map_err(store_err)?;
    tracing::info!(id = created.kelurahan_id, name, "created kelurahan");
    report.kelurahan_created += 1;
  }

  for (nip, name, username, area) in OFFICERS {
    if store.officer_by_nip(nip).await.map_err(store_err)?.is_some() {
      report.skipped += 1;
      continue;
    }
    let kelurahan_id = match area {
      Some(code) => Some(
        store
          .kelurahan_by_code(code)
          .await
          .map_err(store_err)?
          .ok_or(SeedError::MissingKelurahan(code))?
          .kelurahan_id,
      ),
      None => None,
    };
    let password_hash =
      password::hash(DEFAULT_PASSWORD).map_err(|e| SeedError::Hash(e.to_string()))?;
    let officer = store
      .add_officer(NewOfficer {
        nip: nip.to_owned(),
        name: name.to_owned(),
        username: username.to_owned(),
        password_hash,
        kelurahan_id,
      })
      .await
      .map_err(store_err)?;
    tracing::info!(username, role = officer.role.as_str(), "created officer");
    report.officers_created += 1;
  }

  Ok(report)
}
