//! Officer back-office: dashboard, citizen roster and application review.
//!
//! Every read and write here takes the signed-in officer's [`Scope`]; rows
//! outside it behave exactly like rows that do not exist.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin` | Counts, 5 recent, today's sessions |
//! | `GET`  | `/admin/penduduk?search=` | Citizen roster |
//! | `GET`  | `/admin/permohonan?page=&search=&status=` | 20 per page |
//! | `GET`  | `/admin/permohonan/{id}` | Detail fragment |
//! | `GET`  | `/admin/permohonan/{id}/status` | Status dialog fragment |
//! | `POST` | `/admin/permohonan/update-status` | `id`, `status`, `catatan` |

use axum::{
  Extension, Form, Json,
  extract::{Path, Query, State},
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use simpel_core::{
  application::{
    ApplicationDetail, ApplicationQuery, ApplicationSummary, PAGE_SIZE, StatusUpdate,
  },
  citizen::{CitizenProfile, CitizenQuery, CitizenStats},
  scope::Scope,
  slot::{Slot, SlotQuery},
  status::{ApplicationStatus, StatusCounts},
  store::PortalStore,
};
use uuid::Uuid;

use super::{form_page, hx_events, non_empty, page, today};
use crate::{
  AppState,
  actor::{HxRequest, OfficerActor},
  csrf::CsrfToken,
  error::{Error, Result},
};

const RECENT: usize = 5;
const ROSTER_LIMIT: usize = 100;

/// Header block shared by every back-office page.
#[derive(Debug, Serialize)]
pub struct OfficerHeader {
  pub name:  String,
  pub role:  &'static str,
  pub scope: Scope,
}

impl From<&OfficerActor> for OfficerHeader {
  fn from(actor: &OfficerActor) -> Self {
    Self {
      name:  actor.officer.name.clone(),
      role:  actor.officer.role.label(),
      scope: actor.scope(),
    }
  }
}

fn parse_id(raw: &str, htmx: bool) -> Result<Uuid> {
  Uuid::parse_str(raw.trim())
    .map_err(|_| Error::not_found("Permohonan tidak ditemukan").fragment(htmx))
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AdminDashboard {
  pub officer:     OfficerHeader,
  pub stats:       StatusCounts,
  pub recent:      Vec<ApplicationSummary>,
  pub today_slots: Vec<Slot>,
}

/// `GET /admin`
pub async fn dashboard<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: OfficerActor,
) -> Result<Response> {
  let scope = actor.scope();
  let stats = state.store.status_counts(scope).await.map_err(Error::from_store)?;

  let mut recent_query = ApplicationQuery::page(scope, 1);
  recent_query.limit = Some(RECENT);
  let recent = state
    .store
    .list_applications(&recent_query)
    .await
    .map_err(Error::from_store)?;

  let day = today();
  let today_slots = state
    .store
    .list_slots(&SlotQuery { scope, from: day, to: day })
    .await
    .map_err(Error::from_store)?;

  Ok(page("admin_dashboard", AdminDashboard {
    officer: OfficerHeader::from(&actor),
    stats,
    recent,
    today_slots,
  })
  .into_response())
}

// ─── Citizens ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
  pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Roster {
  pub officer:  OfficerHeader,
  pub search:   Option<String>,
  pub stats:    CitizenStats,
  pub citizens: Vec<CitizenProfile>,
}

/// `GET /admin/penduduk`
pub async fn citizens<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: OfficerActor,
  Query(query): Query<SearchQuery>,
) -> Result<Response> {
  let scope = actor.scope();
  let query = CitizenQuery {
    scope,
    search: non_empty(query.search),
    limit: Some(ROSTER_LIMIT),
  };
  let citizens = state.store.list_citizens(&query).await.map_err(Error::from_store)?;
  let stats = state.store.citizen_stats(scope).await.map_err(Error::from_store)?;

  Ok(page("admin_citizens", Roster {
    officer: OfficerHeader::from(&actor),
    search: query.search,
    stats,
    citizens,
  })
  .into_response())
}

// ─── Applications ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListQuery {
  pub page:   Option<String>,
  pub search: Option<String>,
  pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationList {
  pub officer:      OfficerHeader,
  pub applications: Vec<ApplicationSummary>,
  pub current_page: usize,
  pub total_pages:  u64,
  pub total:        u64,
  pub search:       Option<String>,
  pub status:       Option<ApplicationStatus>,
}

/// `GET /admin/permohonan`
///
/// A missing or unparseable `page` is page 1; an unknown `status` filter is
/// rejected rather than silently ignored.
pub async fn applications<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: OfficerActor,
  Query(query): Query<ListQuery>,
) -> Result<Response> {
  let page_no = non_empty(query.page)
    .and_then(|p| p.parse::<usize>().ok())
    .filter(|&p| p > 0)
    .unwrap_or(1);
  let status = non_empty(query.status)
    .map(|s| ApplicationStatus::parse(&s))
    .transpose()
    .map_err(|_| Error::field("status", "Status tidak valid"))?;

  let mut list_query = ApplicationQuery::page(actor.scope(), page_no);
  list_query.search = non_empty(query.search);
  list_query.status = status;

  let applications = state
    .store
    .list_applications(&list_query)
    .await
    .map_err(Error::from_store)?;
  let total = state
    .store
    .count_applications(&list_query)
    .await
    .map_err(Error::from_store)?;

  Ok(page("admin_applications", ApplicationList {
    officer: OfficerHeader::from(&actor),
    applications,
    current_page: page_no,
    total_pages: total.div_ceil(PAGE_SIZE as u64).max(1),
    total,
    search: list_query.search,
    status,
  })
  .into_response())
}

/// `GET /admin/permohonan/{id}`
pub async fn application_detail<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: OfficerActor,
  HxRequest(htmx): HxRequest,
  Path(id): Path<String>,
) -> Result<Json<super::Page<ApplicationDetail>>> {
  let id = parse_id(&id, htmx)?;
  let detail = state
    .store
    .application_detail(id, actor.scope())
    .await
    .map_err(Error::from_store)?
    .ok_or_else(|| Error::not_found("Permohonan tidak ditemukan").fragment(htmx))?;
  Ok(page("admin_application_detail", detail))
}

// ─── Status changes ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusOption {
  pub value:    ApplicationStatus,
  pub label:    &'static str,
  pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusForm {
  pub application_id: Uuid,
  pub current:        ApplicationStatus,
  pub options:        Vec<StatusOption>,
}

/// `GET /admin/permohonan/{id}/status`
pub async fn status_form<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: OfficerActor,
  HxRequest(htmx): HxRequest,
  Extension(CsrfToken(csrf)): Extension<CsrfToken>,
  Path(id): Path<String>,
) -> Result<Response> {
  let id = parse_id(&id, htmx)?;
  let current = state
    .store
    .application_status(id, actor.scope())
    .await
    .map_err(Error::from_store)?
    .ok_or_else(|| Error::not_found("Permohonan tidak ditemukan").fragment(htmx))?;

  let options = ApplicationStatus::OFFICER_SETTABLE
    .into_iter()
    .map(|value| StatusOption { value, label: value.label(), selected: value == current })
    .collect();

  Ok(form_page("admin_status_form", csrf, StatusForm {
    application_id: id,
    current,
    options,
  })
  .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StatusUpdateForm {
  pub id:      String,
  pub status:  String,
  pub catatan: String,
}

/// `POST /admin/permohonan/update-status`
///
/// Answers with HTMX events that close the dialog and refresh the list; the
/// body carries the new history entry.
pub async fn update_status<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: OfficerActor,
  Form(form): Form<StatusUpdateForm>,
) -> Result<Response> {
  let application_id =
    Uuid::parse_str(form.id.trim()).map_err(|_| Error::field("id", "ID tidak valid"))?;
  let status = ApplicationStatus::parse_officer_settable(form.status.trim())
    .map_err(|_| Error::field("status", "Status tidak valid"))?;

  let entry = state
    .store
    .update_status(StatusUpdate {
      application_id,
      status,
      note: non_empty(Some(form.catatan)),
      officer_id: actor.id(),
      scope: actor.scope(),
    })
    .await
    .map_err(Error::from_store)?;

  tracing::info!(
    application = %application_id,
    status = status.as_str(),
    officer = %actor.id(),
    "application status updated"
  );
  let events = serde_json::json!({ "closeDialog": "status-dialog", "refreshPermohonan": true });
  Ok((hx_events(events), Json(entry)).into_response())
}
