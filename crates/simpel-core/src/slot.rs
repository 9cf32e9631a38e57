//! Appointment slots (jadwal sesi) and the calendar rules around them.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, scope::Scope};

/// Quota used when an officer leaves it blank and by batch generation.
pub const DEFAULT_QUOTA: u32 = 50;

/// How many days ahead the batch generator plans, starting tomorrow.
pub const BATCH_DAYS: u64 = 30;

// ─── Session status ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
  /// Open for booking.
  Buka,
  /// Every seat is taken.
  Penuh,
  /// Temporarily closed by an officer.
  Istirahat,
}

impl SessionStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Buka => "BUKA",
      Self::Penuh => "PENUH",
      Self::Istirahat => "ISTIRAHAT",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "BUKA" => Ok(Self::Buka),
      "PENUH" => Ok(Self::Penuh),
      "ISTIRAHAT" => Ok(Self::Istirahat),
      other => Err(Error::InvalidSessionStatus(other.to_owned())),
    }
  }

  /// Parse a status an officer may toggle a slot into. `PENUH` is only ever
  /// set by booking.
  pub fn parse_toggle(s: &str) -> Result<Self> {
    match Self::parse(s.trim()) {
      Ok(status @ (Self::Buka | Self::Istirahat)) => Ok(status),
      _ => Err(Error::InvalidSessionStatus(s.to_owned())),
    }
  }
}

// ─── Slot ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
  pub slot_id:        Uuid,
  pub date:           NaiveDate,
  pub start_time:     NaiveTime,
  pub end_time:       NaiveTime,
  /// `None` means the district office.
  pub kelurahan_id:   Option<i16>,
  /// Joined from the kelurahan table; `None` for the district office.
  pub kelurahan_name: Option<String>,
  pub max_quota:      u32,
  pub filled_quota:   u32,
  pub session_status: SessionStatus,
}

impl Slot {
  pub fn remaining(&self) -> u32 {
    self.max_quota.saturating_sub(self.filled_quota)
  }

  /// Whether a citizen could book this slot on `today`.
  pub fn is_bookable(&self, today: NaiveDate) -> bool {
    self.session_status == SessionStatus::Buka
      && self.remaining() > 0
      && self.date >= today
  }

  /// Display name of where the session takes place.
  pub fn location<'a>(&'a self, district_office: &'a str) -> &'a str {
    self.kelurahan_name.as_deref().unwrap_or(district_office)
  }

  /// e.g. `03 Mar 2025 - 09:00 (Ancol, sisa 12 kuota)`.
  pub fn label(&self, district_office: &str) -> String {
    format!(
      "{} - {} ({}, sisa {} kuota)",
      self.date.format("%d %b %Y"),
      self.start_time.format("%H:%M"),
      self.location(district_office),
      self.remaining(),
    )
  }
}

/// Input to [`crate::store::PortalStore::add_slot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSlot {
  pub date:         NaiveDate,
  pub start_time:   NaiveTime,
  pub end_time:     NaiveTime,
  pub kelurahan_id: Option<i16>,
  pub max_quota:    u32,
}

impl NewSlot {
  /// Build a slot definition, applying the default quota when `max_quota`
  /// is zero.
  pub fn new(
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    kelurahan_id: Option<i16>,
    max_quota: u32,
  ) -> Result<Self> {
    if end_time <= start_time {
      return Err(Error::InvalidSlotTimes);
    }
    let max_quota = if max_quota == 0 { DEFAULT_QUOTA } else { max_quota };
    Ok(Self { date, start_time, end_time, kelurahan_id, max_quota })
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Location filter on the booking pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotLocation {
  #[default]
  Any,
  DistrictOffice,
  Kelurahan(i16),
}

impl SlotLocation {
  /// Interpret the `lokasi` query value: `0` is the district office.
  pub fn from_param(lokasi: Option<i16>) -> Self {
    match lokasi {
      None => Self::Any,
      Some(0) => Self::DistrictOffice,
      Some(id) => Self::Kelurahan(id),
    }
  }
}

/// Parameters for [`crate::store::PortalStore::list_slots`].
#[derive(Debug, Clone)]
pub struct SlotQuery {
  pub scope: Scope,
  pub from:  NaiveDate,
  /// Inclusive.
  pub to:    NaiveDate,
}

/// Parameters for [`crate::store::PortalStore::bookable_slots`].
#[derive(Debug, Clone)]
pub struct BookableQuery {
  pub location: SlotLocation,
  pub from:     NaiveDate,
  pub to:       NaiveDate,
}

impl BookableQuery {
  /// Everything bookable from `today` until the end of next month.
  pub fn window(today: NaiveDate, location: SlotLocation) -> Self {
    let (from, to) = booking_window(today);
    Self { location, from, to }
  }
}

/// Result of a batch generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
  pub created: u32,
  /// Sessions that already existed at the same date, time and location.
  pub skipped: u32,
}

// ─── Calendar rules ──────────────────────────────────────────────────────────

/// The two daily sessions created by batch generation.
pub fn session_times() -> [(NaiveTime, NaiveTime); 2] {
  let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
  [(hm(9, 0), hm(12, 0)), (hm(13, 0), hm(15, 0))]
}

/// Booking window: `today` through the last day of next month.
pub fn booking_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
  let first_of_month = today.with_day(1).unwrap_or(today);
  let end = first_of_month
    .checked_add_months(Months::new(2))
    .and_then(|d| d.pred_opt())
    .unwrap_or(today);
  (today, end)
}

/// Sessions for every weekday in the [`BATCH_DAYS`] days after `today`.
pub fn batch_plan(today: NaiveDate, kelurahan_id: Option<i16>) -> Vec<NewSlot> {
  (1..=BATCH_DAYS)
    .filter_map(|n| today.checked_add_days(Days::new(n)))
    .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
    .flat_map(|date| {
      session_times().into_iter().map(move |(start_time, end_time)| NewSlot {
        date,
        start_time,
        end_time,
        kelurahan_id,
        max_quota: DEFAULT_QUOTA,
      })
    })
    .collect()
}

/// Monday and Sunday of the week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
  let week = date.week(Weekday::Mon);
  (week.first_day(), week.last_day())
}
