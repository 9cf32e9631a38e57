pub mod admin;
pub mod auth;
pub mod citizen;
pub mod home;
pub mod jadwal;
pub mod permohonan;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Redirect, Response},
};
use chrono::{Local, NaiveDate};
use serde::Serialize;

/// Envelope for every rendered page: the page name, the CSRF token forms
/// must echo, and the page's own view model.
#[derive(Debug, Serialize)]
pub struct Page<T: Serialize> {
  pub page:       &'static str,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub csrf_token: Option<String>,
  #[serde(flatten)]
  pub data:       T,
}

pub(crate) fn page<T: Serialize>(name: &'static str, data: T) -> Json<Page<T>> {
  Json(Page { page: name, csrf_token: None, data })
}

pub(crate) fn form_page<T: Serialize>(
  name: &'static str,
  csrf_token: String,
  data: T,
) -> Json<Page<T>> {
  Json(Page { page: name, csrf_token: Some(csrf_token), data })
}

/// Navigate after a successful action. HTMX follows `HX-Redirect`; plain
/// browsers get a 303.
pub(crate) fn redirect(to: &str, htmx: bool) -> Response {
  if htmx {
    (
      StatusCode::OK,
      [("hx-redirect", to.to_owned())],
      Json(serde_json::json!({ "redirect": to })),
    )
      .into_response()
  } else {
    Redirect::to(to).into_response()
  }
}

/// Calendar date at the office.
pub(crate) fn today() -> NaiveDate { Local::now().date_naive() }

/// Empty query parameters count as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

/// Headers for an HTMX action that fires client-side events and leaves the
/// page content in place.
pub(crate) fn hx_events(events: serde_json::Value) -> [(&'static str, String); 2] {
  [("hx-trigger", events.to_string()), ("hx-reswap", "none".to_owned())]
}
