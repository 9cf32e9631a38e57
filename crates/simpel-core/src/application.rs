//! Applications (permohonan) and their kind-specific details.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  citizen::{CitizenProfile, Nik},
  document::{Document, DocumentKind, NewDocument},
  history::StatusHistoryEntry,
  scope::Scope,
  slot::Slot,
  status::ApplicationStatus,
};

/// Officer list pages show this many rows.
pub const PAGE_SIZE: usize = 20;

// ─── Kind ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationKind {
  Baru,
  Hilang,
  Rusak,
  Update,
}

impl ApplicationKind {
  pub const ALL: [Self; 4] = [Self::Baru, Self::Hilang, Self::Rusak, Self::Update];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Baru => "BARU",
      Self::Hilang => "HILANG",
      Self::Rusak => "RUSAK",
      Self::Update => "UPDATE",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "BARU" => Ok(Self::Baru),
      "HILANG" => Ok(Self::Hilang),
      "RUSAK" => Ok(Self::Rusak),
      "UPDATE" => Ok(Self::Update),
      other => Err(Error::InvalidKind(other.to_owned())),
    }
  }

  /// URL segment of the form, e.g. `/permohonan/ubah`.
  pub fn slug(self) -> &'static str {
    match self {
      Self::Baru => "baru",
      Self::Hilang => "hilang",
      Self::Rusak => "rusak",
      Self::Update => "ubah",
    }
  }

  pub fn from_slug(slug: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|k| k.slug() == slug)
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Baru => "KTP Baru",
      Self::Hilang => "KTP Hilang",
      Self::Rusak => "KTP Rusak",
      Self::Update => "Perubahan Data KTP",
    }
  }

  /// Files the form must carry, in upload order.
  pub fn required_documents(self) -> &'static [DocumentKind] {
    match self {
      Self::Baru => &[DocumentKind::Kk],
      Self::Hilang => &[DocumentKind::SuratPolisi],
      Self::Rusak => &[DocumentKind::KtpRusak, DocumentKind::Kk],
      Self::Update => &[DocumentKind::Ktp, DocumentKind::Kk],
    }
  }

  /// Request body ceiling for the form, in bytes.
  pub fn body_limit(self) -> usize {
    const MB: usize = 1024 * 1024;
    if self.required_documents().len() > 1 { 20 * MB } else { 10 * MB }
  }
}

// ─── Details ─────────────────────────────────────────────────────────────────

/// Kind-specific data captured by each form. Stored as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplicationDetails {
  New,
  Lost {
    police_report_number: String,
    incident_date:        NaiveDate,
  },
  Damaged {
    damage_description: String,
  },
  DataChange {
    change_reason: String,
  },
}

impl ApplicationDetails {
  pub fn kind(&self) -> ApplicationKind {
    match self {
      Self::New => ApplicationKind::Baru,
      Self::Lost { .. } => ApplicationKind::Hilang,
      Self::Damaged { .. } => ApplicationKind::Rusak,
      Self::DataChange { .. } => ApplicationKind::Update,
    }
  }
}

// ─── Booking code ────────────────────────────────────────────────────────────

const BOOKING_CODE_DIGITS: usize = 12;

/// Short code a citizen uses to look an application up, e.g.
/// `KTP-3F9A12C4B7E0`. The first 12 hex digits of a v4 UUID are all random,
/// giving 48 bits against the `UNIQUE` column.
pub fn booking_code(application_id: Uuid) -> String {
  let hex = application_id.simple().to_string();
  format!("KTP-{}", hex[..BOOKING_CODE_DIGITS].to_ascii_uppercase())
}


// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
  pub application_id: Uuid,
  pub booking_code:   String,
  pub nik:            Nik,
  pub slot_id:        Uuid,
  pub kind:           ApplicationKind,
  pub details:        ApplicationDetails,
  pub status:         ApplicationStatus,
  /// 1-based position within the slot.
  pub queue_number:   u32,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::PortalStore::create_application`].
#[derive(Debug, Clone)]
pub struct NewApplication {
  pub nik:       Nik,
  pub slot_id:   Uuid,
  pub details:   ApplicationDetails,
  pub documents: Vec<NewDocument>,
  /// Slots dated before this day are refused.
  pub today:     NaiveDate,
}

/// One row of an application list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationSummary {
  pub application_id: Uuid,
  pub booking_code:   String,
  pub nik:            Nik,
  pub citizen_name:   String,
  pub kind:           ApplicationKind,
  pub status:         ApplicationStatus,
  pub queue_number:   u32,
  pub slot_date:      NaiveDate,
  pub slot_start:     NaiveTime,
  pub kelurahan_id:   Option<i16>,
  pub kelurahan_name: Option<String>,
  pub created_at:     DateTime<Utc>,
}

/// Everything shown on the detail and tracker pages.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationDetail {
  pub application: Application,
  pub citizen:     CitizenProfile,
  pub slot:        Slot,
  /// Oldest first.
  pub history:     Vec<StatusHistoryEntry>,
  pub documents:   Vec<Document>,
}

/// Parameters for [`crate::store::PortalStore::list_applications`].
#[derive(Debug, Clone)]
pub struct ApplicationQuery {
  pub scope:  Scope,
  /// Matched against NIK, citizen name and booking code.
  pub search: Option<String>,
  pub status: Option<ApplicationStatus>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl ApplicationQuery {
  /// The `page`-th page (1-based) of [`PAGE_SIZE`] rows.
  pub fn page(scope: Scope, page: usize) -> Self {
    Self {
      scope,
      search: None,
      status: None,
      limit: Some(PAGE_SIZE),
      offset: Some(page.saturating_sub(1).saturating_mul(PAGE_SIZE)),
    }
  }
}

/// An officer moving an application to a new status.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
  pub application_id: Uuid,
  pub status:         ApplicationStatus,
  pub note:           Option<String>,
  pub officer_id:     Uuid,
  pub scope:          Scope,
}

/// One position in a slot's queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
  pub queue_number:   u32,
  pub application_id: Uuid,
  pub booking_code:   String,
  pub nik:            Nik,
  pub citizen_name:   String,
  pub kind:           ApplicationKind,
  pub status:         ApplicationStatus,
}
