//! Citizen dashboard and the status tracker.

use axum::{
  extract::{Query, State},
  response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use simpel_core::{
  application::{ApplicationDetail, ApplicationSummary},
  citizen::Nik,
  status::StatusCounts,
  store::PortalStore,
  tracker::{self, Progress},
};

use super::{non_empty, page};
use crate::{
  AppState,
  actor::{CitizenActor, HxRequest},
  error::{Error, Result},
};

const RECENT: usize = 5;

#[derive(Debug, Serialize)]
pub struct Dashboard {
  pub name:   String,
  pub nik:    Nik,
  pub stats:  StatusCounts,
  pub recent: Vec<ApplicationSummary>,
}

/// `GET /dashboard`
pub async fn dashboard<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: CitizenActor,
) -> Result<Response> {
  let stats = state
    .store
    .citizen_status_counts(&actor.nik)
    .await
    .map_err(Error::from_store)?;
  let recent = state
    .store
    .citizen_applications(&actor.nik, RECENT)
    .await
    .map_err(Error::from_store)?;

  Ok(page("dashboard", Dashboard { name: actor.name, nik: actor.nik, stats, recent })
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct TrackQuery {
  pub kode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Tracker {
  pub detail:   ApplicationDetail,
  pub progress: Progress,
}

/// `GET /lacak-status[?kode=KTP-XXXXXXXXXXXX]`
///
/// Without a code the citizen's most recent application is shown; a citizen
/// with no applications is sent back to the dashboard.
pub async fn track<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: CitizenActor,
  HxRequest(htmx): HxRequest,
  Query(query): Query<TrackQuery>,
) -> Result<Response> {
  let missing = || Error::not_found("Permohonan tidak ditemukan").fragment(htmx);

  let detail = match non_empty(query.kode) {
    Some(code) => state
      .store
      .citizen_application_by_code(&actor.nik, &code)
      .await
      .map_err(Error::from_store)?
      .ok_or_else(missing)?,
    None => {
      let latest = state
        .store
        .citizen_applications(&actor.nik, 1)
        .await
        .map_err(Error::from_store)?;
      let Some(latest) = latest.first() else {
        return Ok(Redirect::to("/dashboard").into_response());
      };
      state
        .store
        .citizen_application(&actor.nik, latest.application_id)
        .await
        .map_err(Error::from_store)?
        .ok_or_else(missing)?
    }
  };

  let progress = tracker::progress(detail.application.status);
  Ok(page("tracker", Tracker { detail, progress }).into_response())
}
