//! Conversions between domain types and the plain-text SQLite columns.
//!
//! Timestamps are RFC 3339 UTC with microsecond precision so they sort
//! lexically. Dates are `YYYY-MM-DD`, times `HH:MM`. UUIDs are hyphenated
//! lowercase strings. Application details are compact JSON.
//!
//! Each `Raw*` struct holds the strings read from one row; rows are pulled
//! inside the connection thread and decoded afterwards.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::Row;
use simpel_core::{
  application::{
    Application, ApplicationDetail, ApplicationDetails, ApplicationKind,
    ApplicationSummary, QueueEntry,
  },
  citizen::{Citizen, CitizenProfile, Nik, Sex},
  document::{Document, DocumentKind},
  history::StatusHistoryEntry,
  kelurahan::Kelurahan,
  officer::{Officer, OfficerRole},
  slot::{SessionStatus, Slot},
  status::ApplicationStatus,
};
use uuid::Uuid;

use crate::{Error, Result};

const TIME_FORMAT: &str = "%H:%M";

fn corrupt(e: simpel_core::Error) -> Error { Error::Corrupt(e.to_string()) }

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Corrupt(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Corrupt(format!("date {s:?}: {e}")))
}

pub fn encode_time(t: NaiveTime) -> String { t.format(TIME_FORMAT).to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, TIME_FORMAT)
    .map_err(|e| Error::Corrupt(format!("time {s:?}: {e}")))
}

fn decode_nik(s: &str) -> Result<Nik> { Nik::parse(s).map_err(corrupt) }

fn decode_status(s: &str) -> Result<ApplicationStatus> {
  ApplicationStatus::parse(s).map_err(corrupt)
}

fn decode_kind(s: &str) -> Result<ApplicationKind> {
  ApplicationKind::parse(s).map_err(corrupt)
}

pub fn encode_details(details: &ApplicationDetails) -> Result<String> {
  Ok(serde_json::to_string(details)?)
}

/// SQL list literal of the statuses that block a new application.
pub fn active_status_list() -> String {
  ApplicationStatus::ACTIVE
    .iter()
    .map(|s| format!("'{}'", s.as_str()))
    .collect::<Vec<_>>()
    .join(",")
}

// ─── Kelurahan ───────────────────────────────────────────────────────────────

pub const KELURAHAN_COLUMNS: &str = "kelurahan_id, name, area_code";

pub fn kelurahan_from_row(row: &Row<'_>) -> rusqlite::Result<Kelurahan> {
  Ok(Kelurahan {
    kelurahan_id: row.get(0)?,
    name:         row.get(1)?,
    area_code:    row.get(2)?,
  })
}

// ─── Citizens ────────────────────────────────────────────────────────────────

pub const CITIZEN_COLUMNS: &str = "nik, full_name, sex, address, phone, email, \
                                   kelurahan_id, password_hash, created_at";

pub struct RawCitizen {
  pub nik:           String,
  pub full_name:     String,
  pub sex:           String,
  pub address:       Option<String>,
  pub phone:         Option<String>,
  pub email:         Option<String>,
  pub kelurahan_id:  Option<i16>,
  pub password_hash: Option<String>,
  pub created_at:    String,
}

impl RawCitizen {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      nik:           row.get(0)?,
      full_name:     row.get(1)?,
      sex:           row.get(2)?,
      address:       row.get(3)?,
      phone:         row.get(4)?,
      email:         row.get(5)?,
      kelurahan_id:  row.get(6)?,
      password_hash: row.get(7)?,
      created_at:    row.get(8)?,
    })
  }

  pub fn into_citizen(self) -> Result<Citizen> {
    Ok(Citizen {
      nik:           decode_nik(&self.nik)?,
      full_name:     self.full_name,
      sex:           Sex::parse(&self.sex).map_err(corrupt)?,
      address:       self.address,
      phone:         self.phone,
      email:         self.email,
      kelurahan_id:  self.kelurahan_id,
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Citizen columns joined with the kelurahan name; alias `c` and `k`.
pub const PROFILE_SELECT: &str = "SELECT c.nik, c.full_name, c.sex, c.address, \
                                  c.phone, c.email, c.kelurahan_id, k.name
   FROM citizens c
   LEFT JOIN kelurahan k ON k.kelurahan_id = c.kelurahan_id";

pub struct RawProfile {
  pub nik:            String,
  pub full_name:      String,
  pub sex:            String,
  pub address:        Option<String>,
  pub phone:          Option<String>,
  pub email:          Option<String>,
  pub kelurahan_id:   Option<i16>,
  pub kelurahan_name: Option<String>,
}

impl RawProfile {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      nik:            row.get(0)?,
      full_name:      row.get(1)?,
      sex:            row.get(2)?,
      address:        row.get(3)?,
      phone:          row.get(4)?,
      email:          row.get(5)?,
      kelurahan_id:   row.get(6)?,
      kelurahan_name: row.get(7)?,
    })
  }

  pub fn into_profile(self) -> Result<CitizenProfile> {
    Ok(CitizenProfile {
      nik:            decode_nik(&self.nik)?,
      full_name:      self.full_name,
      sex:            Sex::parse(&self.sex).map_err(corrupt)?,
      address:        self.address,
      phone:          self.phone,
      email:          self.email,
      kelurahan_id:   self.kelurahan_id,
      kelurahan_name: self.kelurahan_name,
    })
  }
}

// ─── Officers ────────────────────────────────────────────────────────────────

pub const OFFICER_COLUMNS: &str =
  "officer_id, nip, name, username, password_hash, role, kelurahan_id";

pub struct RawOfficer {
  pub officer_id:    String,
  pub nip:           String,
  pub name:          String,
  pub username:      String,
  pub password_hash: String,
  pub role:          String,
  pub kelurahan_id:  Option<i16>,
}

impl RawOfficer {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      officer_id:    row.get(0)?,
      nip:           row.get(1)?,
      name:          row.get(2)?,
      username:      row.get(3)?,
      password_hash: row.get(4)?,
      role:          row.get(5)?,
      kelurahan_id:  row.get(6)?,
    })
  }

  pub fn into_officer(self) -> Result<Officer> {
    Ok(Officer {
      officer_id:    decode_uuid(&self.officer_id)?,
      nip:           self.nip,
      name:          self.name,
      username:      self.username,
      password_hash: self.password_hash,
      role:          OfficerRole::parse(&self.role).map_err(corrupt)?,
      kelurahan_id:  self.kelurahan_id,
    })
  }
}

// ─── Slots ───────────────────────────────────────────────────────────────────

/// Slot columns joined with the kelurahan name; alias `s` and `k`.
pub const SLOT_SELECT: &str = "SELECT s.slot_id, s.date, s.start_time, \
                               s.end_time, s.kelurahan_id, k.name, \
                               s.max_quota, s.filled_quota, s.session_status
   FROM slots s
   LEFT JOIN kelurahan k ON k.kelurahan_id = s.kelurahan_id";

pub struct RawSlot {
  pub slot_id:        String,
  pub date:           String,
  pub start_time:     String,
  pub end_time:       String,
  pub kelurahan_id:   Option<i16>,
  pub kelurahan_name: Option<String>,
  pub max_quota:      u32,
  pub filled_quota:   u32,
  pub session_status: String,
}

impl RawSlot {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      slot_id:        row.get(0)?,
      date:           row.get(1)?,
      start_time:     row.get(2)?,
      end_time:       row.get(3)?,
      kelurahan_id:   row.get(4)?,
      kelurahan_name: row.get(5)?,
      max_quota:      row.get(6)?,
      filled_quota:   row.get(7)?,
      session_status: row.get(8)?,
    })
  }

  pub fn into_slot(self) -> Result<Slot> {
    Ok(Slot {
      slot_id:        decode_uuid(&self.slot_id)?,
      date:           decode_date(&self.date)?,
      start_time:     decode_time(&self.start_time)?,
      end_time:       decode_time(&self.end_time)?,
      kelurahan_id:   self.kelurahan_id,
      kelurahan_name: self.kelurahan_name,
      max_quota:      self.max_quota,
      filled_quota:   self.filled_quota,
      session_status: SessionStatus::parse(&self.session_status)
        .map_err(corrupt)?,
    })
  }
}

// ─── Applications ────────────────────────────────────────────────────────────

pub const APPLICATION_SELECT: &str = "SELECT a.application_id, a.booking_code, \
                                      a.nik, a.slot_id, a.kind, a.details, \
                                      a.status, a.queue_number, a.created_at
   FROM applications a";

pub struct RawApplication {
  pub application_id: String,
  pub booking_code:   String,
  pub nik:            String,
  pub slot_id:        String,
  pub kind:           String,
  pub details:        String,
  pub status:         String,
  pub queue_number:   u32,
  pub created_at:     String,
}

impl RawApplication {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      application_id: row.get(0)?,
      booking_code:   row.get(1)?,
      nik:            row.get(2)?,
      slot_id:        row.get(3)?,
      kind:           row.get(4)?,
      details:        row.get(5)?,
      status:         row.get(6)?,
      queue_number:   row.get(7)?,
      created_at:     row.get(8)?,
    })
  }

  pub fn into_application(self) -> Result<Application> {
    let kind = decode_kind(&self.kind)?;
    let details: ApplicationDetails = serde_json::from_str(&self.details)?;
    if details.kind() != kind {
      return Err(Error::Corrupt(format!(
        "application {} is {} but carries {} details",
        self.application_id,
        kind.as_str(),
        details.kind().as_str(),
      )));
    }
    Ok(Application {
      application_id: decode_uuid(&self.application_id)?,
      booking_code: self.booking_code,
      nik: decode_nik(&self.nik)?,
      slot_id: decode_uuid(&self.slot_id)?,
      kind,
      details,
      status: decode_status(&self.status)?,
      queue_number: self.queue_number,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Applications joined with citizen and slot; alias `a`, `c`, `s` and `k`.
pub const SUMMARY_SELECT: &str = "SELECT a.application_id, a.booking_code, \
                                  a.nik, c.full_name, a.kind, a.status, \
                                  a.queue_number, s.date, s.start_time, \
                                  s.kelurahan_id, k.name, a.created_at
   FROM applications a
   JOIN citizens c ON c.nik = a.nik
   JOIN slots s ON s.slot_id = a.slot_id
   LEFT JOIN kelurahan k ON k.kelurahan_id = s.kelurahan_id";

/// The joins of [`SUMMARY_SELECT`] without the column list, for counting.
pub const SUMMARY_FROM: &str = "FROM applications a
   JOIN citizens c ON c.nik = a.nik
   JOIN slots s ON s.slot_id = a.slot_id";

pub struct RawSummary {
  pub application_id: String,
  pub booking_code:   String,
  pub nik:            String,
  pub citizen_name:   String,
  pub kind:           String,
  pub status:         String,
  pub queue_number:   u32,
  pub slot_date:      String,
  pub slot_start:     String,
  pub kelurahan_id:   Option<i16>,
  pub kelurahan_name: Option<String>,
  pub created_at:     String,
}

impl RawSummary {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      application_id: row.get(0)?,
      booking_code:   row.get(1)?,
      nik:            row.get(2)?,
      citizen_name:   row.get(3)?,
      kind:           row.get(4)?,
      status:         row.get(5)?,
      queue_number:   row.get(6)?,
      slot_date:      row.get(7)?,
      slot_start:     row.get(8)?,
      kelurahan_id:   row.get(9)?,
      kelurahan_name: row.get(10)?,
      created_at:     row.get(11)?,
    })
  }

  pub fn into_summary(self) -> Result<ApplicationSummary> {
    Ok(ApplicationSummary {
      application_id: decode_uuid(&self.application_id)?,
      booking_code:   self.booking_code,
      nik:            decode_nik(&self.nik)?,
      citizen_name:   self.citizen_name,
      kind:           decode_kind(&self.kind)?,
      status:         decode_status(&self.status)?,
      queue_number:   self.queue_number,
      slot_date:      decode_date(&self.slot_date)?,
      slot_start:     decode_time(&self.slot_start)?,
      kelurahan_id:   self.kelurahan_id,
      kelurahan_name: self.kelurahan_name,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawQueueEntry {
  pub queue_number:   u32,
  pub application_id: String,
  pub booking_code:   String,
  pub nik:            String,
  pub citizen_name:   String,
  pub kind:           String,
  pub status:         String,
}

impl RawQueueEntry {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      queue_number:   row.get(0)?,
      application_id: row.get(1)?,
      booking_code:   row.get(2)?,
      nik:            row.get(3)?,
      citizen_name:   row.get(4)?,
      kind:           row.get(5)?,
      status:         row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<QueueEntry> {
    Ok(QueueEntry {
      queue_number:   self.queue_number,
      application_id: decode_uuid(&self.application_id)?,
      booking_code:   self.booking_code,
      nik:            decode_nik(&self.nik)?,
      citizen_name:   self.citizen_name,
      kind:           decode_kind(&self.kind)?,
      status:         decode_status(&self.status)?,
    })
  }
}

// ─── History & documents ─────────────────────────────────────────────────────

/// History rows joined with the officer name; alias `h` and `o`.
pub const HISTORY_SELECT: &str = "SELECT h.history_id, h.application_id, \
                                  h.status, h.note, h.officer_id, o.name, \
                                  h.changed_at
   FROM status_history h
   LEFT JOIN officers o ON o.officer_id = h.officer_id";

pub struct RawHistory {
  pub history_id:     String,
  pub application_id: String,
  pub status:         String,
  pub note:           Option<String>,
  pub officer_id:     Option<String>,
  pub officer_name:   Option<String>,
  pub changed_at:     String,
}

impl RawHistory {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id:     row.get(0)?,
      application_id: row.get(1)?,
      status:         row.get(2)?,
      note:           row.get(3)?,
      officer_id:     row.get(4)?,
      officer_name:   row.get(5)?,
      changed_at:     row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<StatusHistoryEntry> {
    Ok(StatusHistoryEntry {
      history_id:     decode_uuid(&self.history_id)?,
      application_id: decode_uuid(&self.application_id)?,
      status:         decode_status(&self.status)?,
      note:           self.note,
      officer_id:     self.officer_id.as_deref().map(decode_uuid).transpose()?,
      officer_name:   self.officer_name,
      changed_at:     decode_dt(&self.changed_at)?,
    })
  }
}

pub const DOCUMENT_COLUMNS: &str =
  "document_id, application_id, kind, file_path, uploaded_at";

pub struct RawDocument {
  pub document_id:    String,
  pub application_id: String,
  pub kind:           String,
  pub file_path:      String,
  pub uploaded_at:    String,
}

impl RawDocument {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      document_id:    row.get(0)?,
      application_id: row.get(1)?,
      kind:           row.get(2)?,
      file_path:      row.get(3)?,
      uploaded_at:    row.get(4)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      document_id:    decode_uuid(&self.document_id)?,
      application_id: decode_uuid(&self.application_id)?,
      kind:           DocumentKind::parse(&self.kind).map_err(corrupt)?,
      file_path:      self.file_path,
      uploaded_at:    decode_dt(&self.uploaded_at)?,
    })
  }
}

// ─── Detail ──────────────────────────────────────────────────────────────────

pub struct RawDetail {
  pub application: RawApplication,
  pub citizen:     RawProfile,
  pub slot:        RawSlot,
  pub history:     Vec<RawHistory>,
  pub documents:   Vec<RawDocument>,
}

impl RawDetail {
  pub fn into_detail(self) -> Result<ApplicationDetail> {
    Ok(ApplicationDetail {
      application: self.application.into_application()?,
      citizen:     self.citizen.into_profile()?,
      slot:        self.slot.into_slot()?,
      history:     self
        .history
        .into_iter()
        .map(RawHistory::into_entry)
        .collect::<Result<_>>()?,
      documents:   self
        .documents
        .into_iter()
        .map(RawDocument::into_document)
        .collect::<Result<_>>()?,
    })
  }
}
