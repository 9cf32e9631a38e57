//! Landing page and the not-found fallback.

use axum::{
  extract::State,
  response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use simpel_core::store::PortalStore;

use super::page;
use crate::{
  AppState,
  actor::{HxRequest, MaybeActor},
  assets::{SCRIPT_ENTRY, STYLE_ENTRY},
  error::Error,
};

#[derive(Debug, Serialize)]
pub struct Landing {
  pub script:   String,
  pub style:    String,
  pub dev_mode: bool,
}

/// `GET /`. Signed-in actors go straight to their dashboard.
pub async fn index<S: PortalStore>(
  State(state): State<AppState<S>>,
  MaybeActor(session): MaybeActor,
) -> Response {
  if let Some(session) = session {
    return Redirect::to(session.home()).into_response();
  }
  page("landing", Landing {
    script:   state.assets.asset_path(SCRIPT_ENTRY),
    style:    state.assets.asset_path(STYLE_ENTRY),
    dev_mode: state.assets.is_dev(),
  })
  .into_response()
}

pub async fn not_found(HxRequest(htmx): HxRequest) -> Error {
  Error::not_found("Halaman tidak ditemukan").fragment(htmx)
}
