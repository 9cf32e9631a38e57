//! Appointment sessions for officers.
//!
//! New sessions are always placed at the officer's own location: their
//! kelurahan office, or the district office for district officers.

use axum::{
  Extension, Form, Json,
  extract::{Path, Query, State},
  response::{IntoResponse, Response},
};
use chrono::{Datelike, Days, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use simpel_core::{
  application::QueueEntry,
  slot::{self, NewSlot, SessionStatus, Slot, SlotQuery},
  store::PortalStore,
};
use uuid::Uuid;

use super::{form_page, hx_events, non_empty, redirect, today};
use crate::{
  AppState,
  actor::{HxRequest, OfficerActor},
  csrf::CsrfToken,
  error::{Error, FieldErrors, Result},
  handlers::admin::OfficerHeader,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

fn slot_not_found(htmx: bool) -> Error {
  Error::not_found("Jadwal tidak ditemukan").fragment(htmx)
}

fn parse_slot_id(raw: &str, htmx: bool) -> Result<Uuid> {
  Uuid::parse_str(raw.trim()).map_err(|_| slot_not_found(htmx))
}

// ─── Weekly calendar ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
  pub ref_date: Option<String>,
  pub week:     Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CalendarDay {
  pub date:  NaiveDate,
  pub slots: Vec<Slot>,
}

#[derive(Debug, Serialize)]
pub struct Calendar {
  pub officer:    OfficerHeader,
  pub week_start: NaiveDate,
  pub week_end:   NaiveDate,
  pub week_label: String,
  pub days:       Vec<CalendarDay>,
}

/// Monday of the week to show: the week of `ref_date` (today when absent or
/// malformed), shifted by `week=prev|next`.
fn week_start(ref_date: Option<String>, week: Option<String>) -> NaiveDate {
  let reference = non_empty(ref_date)
    .and_then(|raw| NaiveDate::parse_from_str(&raw, DATE_FORMAT).ok())
    .unwrap_or_else(today);
  let (monday, _) = slot::week_bounds(reference);
  match non_empty(week).as_deref() {
    Some("prev") => monday.checked_sub_days(Days::new(7)).unwrap_or(monday),
    Some("next") => monday.checked_add_days(Days::new(7)).unwrap_or(monday),
    _ => monday,
  }
}

fn group_by_day(week_start: NaiveDate, slots: Vec<Slot>) -> Vec<CalendarDay> {
  let mut days: Vec<CalendarDay> = week_start
    .iter_days()
    .take(7)
    .map(|date| CalendarDay { date, slots: Vec::new() })
    .collect();
  for slot in slots {
    let index = slot.date.weekday().num_days_from_monday() as usize;
    if let Some(day) = days.get_mut(index) {
      day.slots.push(slot);
    }
  }
  days
}

/// `GET /admin/jadwal?ref_date=YYYY-MM-DD&week=prev|next`
pub async fn calendar<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: OfficerActor,
  Extension(CsrfToken(csrf)): Extension<CsrfToken>,
  Query(query): Query<CalendarQuery>,
) -> Result<Response> {
  let from = week_start(query.ref_date, query.week);
  let (_, to) = slot::week_bounds(from);
  let slots = state
    .store
    .list_slots(&SlotQuery { scope: actor.scope(), from, to })
    .await
    .map_err(Error::from_store)?;

  Ok(form_page("admin_schedule", csrf, Calendar {
    officer: OfficerHeader::from(&actor),
    week_start: from,
    week_end: to,
    week_label: format!("{} - {}", from.format("%-d %b"), to.format("%-d %b %Y")),
    days: group_by_day(from, slots),
  })
  .into_response())
}

// ─── Manual creation ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateSlotForm {
  pub tanggal:        String,
  pub jam_mulai:      String,
  pub jam_selesai:    String,
  pub kuota_maksimal: String,
}

/// `POST /admin/jadwal`. An empty or non-positive quota falls back to the
/// default of 50.
pub async fn create<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: OfficerActor,
  HxRequest(htmx): HxRequest,
  Form(form): Form<CreateSlotForm>,
) -> Result<Response> {
  let mut errors = FieldErrors::new();
  let date = NaiveDate::parse_from_str(form.tanggal.trim(), DATE_FORMAT)
    .map_err(|_| errors.insert("tanggal", "Format tanggal salah".into()))
    .ok();
  let start = NaiveTime::parse_from_str(form.jam_mulai.trim(), TIME_FORMAT)
    .map_err(|_| errors.insert("jam_mulai", "Format jam mulai salah".into()))
    .ok();
  let end = NaiveTime::parse_from_str(form.jam_selesai.trim(), TIME_FORMAT)
    .map_err(|_| errors.insert("jam_selesai", "Format jam selesai salah".into()))
    .ok();
  let (Some(date), Some(start), Some(end)) = (date, start, end) else {
    return Err(Error::Validation(errors));
  };

  let quota = form
    .kuota_maksimal
    .trim()
    .parse::<i64>()
    .ok()
    .filter(|&q| q > 0)
    .and_then(|q| u32::try_from(q).ok())
    .unwrap_or(0);

  let location = actor.scope().kelurahan_id();
  let new_slot = NewSlot::new(date, start, end, location, quota).map_err(Error::from_store)?;
  let slot = state.store.add_slot(new_slot).await.map_err(Error::from_store)?;
  tracing::info!(slot = %slot.slot_id, date = %slot.date, ?location, "slot created");

  let mut response = redirect("/admin/jadwal", htmx);
  if htmx {
    let events = serde_json::json!({ "closeDialog": "create-jadwal-dialog", "refreshJadwal": true });
    if let Ok(value) = events.to_string().parse() {
      response.headers_mut().insert("hx-trigger", value);
    }
  }
  Ok(response)
}

// ─── Batch generation ────────────────────────────────────────────────────────

/// `POST /admin/jadwal/generate`: two sessions per weekday for the next 30
/// days. Existing sessions are skipped and counted.
pub async fn generate<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: OfficerActor,
) -> Result<Response> {
  let location = actor.scope().kelurahan_id();
  let plan = slot::batch_plan(today(), location);
  let outcome = state.store.generate_slots(plan).await.map_err(Error::from_store)?;
  tracing::info!(
    created = outcome.created,
    skipped = outcome.skipped,
    ?location,
    "slots generated"
  );
  Ok(([("hx-redirect", "/admin/jadwal")], Json(outcome)).into_response())
}

// ─── Queue and status toggle ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SlotQueue {
  pub slot:    Slot,
  pub label:   String,
  pub entries: Vec<QueueEntry>,
}

/// `GET /admin/jadwal/{id}/antrian`
pub async fn queue<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: OfficerActor,
  HxRequest(htmx): HxRequest,
  Path(id): Path<String>,
) -> Result<Response> {
  let slot_id = parse_slot_id(&id, htmx)?;
  let scope = actor.scope();
  let slot = state
    .store
    .get_slot(slot_id, scope)
    .await
    .map_err(Error::from_store)?
    .ok_or_else(|| slot_not_found(htmx))?;
  let entries = state
    .store
    .slot_queue(slot_id, scope)
    .await
    .map_err(Error::from_store)?;

  let label = slot.label(&state.config.district_office_name);
  Ok(super::page("admin_slot_queue", SlotQueue { slot, label, entries }).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SlotStatusForm {
  pub status: String,
}

/// `POST /admin/jadwal/{id}/status`: open (`BUKA`) or pause (`ISTIRAHAT`).
pub async fn set_status<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: OfficerActor,
  HxRequest(htmx): HxRequest,
  Path(id): Path<String>,
  Form(form): Form<SlotStatusForm>,
) -> Result<Response> {
  let slot_id = parse_slot_id(&id, htmx)?;
  let status = SessionStatus::parse_toggle(&form.status)
    .map_err(|_| Error::field("status", "Status sesi tidak valid"))?;

  let slot = state
    .store
    .set_slot_status(slot_id, status, actor.scope())
    .await
    .map_err(|e| Error::from_store(e).fragment(htmx))?;
  tracing::info!(slot = %slot.slot_id, status = status.as_str(), "slot status changed");

  let events = serde_json::json!({ "refreshJadwal": true });
  Ok((hx_events(events), Json(slot)).into_response())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

  #[test]
  fn week_navigation_moves_by_seven_days() {
    // 2025-03-05 is a Wednesday.
    let start = week_start(Some("2025-03-05".into()), None);
    assert_eq!(start, ymd(2025, 3, 3));
    assert_eq!(week_start(Some("2025-03-05".into()), Some("prev".into())), ymd(2025, 2, 24));
    assert_eq!(week_start(Some("2025-03-05".into()), Some("next".into())), ymd(2025, 3, 10));
  }

  #[test]
  fn malformed_reference_date_means_this_week() {
    let expected = slot::week_bounds(today()).0;
    assert_eq!(week_start(Some("05/03/2025".into()), None), expected);
  }

  #[test]
  fn slots_are_grouped_by_weekday() {
    let monday = ymd(2025, 3, 3);
    let hm = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
    let slot = |date| Slot {
      slot_id:        Uuid::new_v4(),
      date,
      start_time:     hm(9),
      end_time:       hm(12),
      kelurahan_id:   None,
      kelurahan_name: None,
      max_quota:      50,
      filled_quota:   0,
      session_status: SessionStatus::Buka,
    };
    let days = group_by_day(monday, vec![slot(ymd(2025, 3, 3)), slot(ymd(2025, 3, 7))]);
    assert_eq!(days.len(), 7);
    assert_eq!(days[0].slots.len(), 1);
    assert_eq!(days[4].slots.len(), 1);
    assert_eq!(days[6].date, ymd(2025, 3, 9));
    assert!(days[6].slots.is_empty());
  }
}
