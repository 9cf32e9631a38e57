//! Error types and axum `IntoResponse` implementation.
//!
//! Every handler failure lands in one of the categories below. Store errors
//! are classified by [`Error::from_store`]; anything that is not a domain
//! refusal becomes [`Error::Internal`] and is only described in the logs.

use std::collections::BTreeMap;

use axum::{
  Json,
  http::{HeaderValue, StatusCode},
  response::{Html, IntoResponse, Redirect, Response},
};
use serde_json::json;
use simpel_core::store::StoreError;
use thiserror::Error;

/// Form field name to message. `general` addresses the form as a whole.
pub type FieldErrors = BTreeMap<&'static str, String>;

pub const GENERAL: &str = "general";

const INTERNAL_MESSAGE: &str = "Terjadi kesalahan, silakan coba lagi";

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0:?}")]
  Validation(FieldErrors),

  /// `fragment` renders an HTML snippet for HTMX swaps instead of JSON.
  #[error("not found: {message}")]
  NotFound { message: &'static str, fragment: bool },

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unauthorized: {0}")]
  Unauthorized(&'static str),

  #[error("not signed in")]
  NotSignedIn { login: &'static str, htmx: bool },

  #[error("forbidden: {0}")]
  Forbidden(&'static str),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn field(field: &'static str, message: impl Into<String>) -> Self {
    Self::Validation(FieldErrors::from([(field, message.into())]))
  }

  pub fn general(message: impl Into<String>) -> Self {
    Self::field(GENERAL, message)
  }

  pub fn not_found(message: &'static str) -> Self {
    Self::NotFound { message, fragment: false }
  }

  pub fn internal(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Internal(Box::new(e))
  }

  /// Map a store failure onto an HTTP category.
  ///
  /// Raw database text never leaves this function except through the log.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    use simpel_core::Error as Domain;

    let Some(domain) = e.domain() else {
      return Self::internal(e);
    };
    match domain {
      Domain::ActiveApplicationExists => Self::Conflict(
        "Anda masih memiliki permohonan yang sedang berjalan \
         (Status: Terdaftar/Verifikasi/Proses/Siap Ambil)"
          .to_owned(),
      ),
      Domain::SlotUnavailable(_) => Self::Conflict(
        "Jadwal yang dipilih sudah penuh atau tidak tersedia".to_owned(),
      ),
      Domain::NikAlreadyRegistered => Self::Conflict("NIK sudah terdaftar".to_owned()),
      Domain::EmailAlreadyRegistered => Self::Conflict("Email sudah terdaftar".to_owned()),
      Domain::DuplicateSlot => Self::Conflict(
        "Jadwal pada tanggal, jam dan lokasi tersebut sudah ada".to_owned(),
      ),
      Domain::SlotNotFound(_) => Self::not_found("Jadwal tidak ditemukan"),
      Domain::ApplicationNotFound(_) => Self::not_found("Permohonan tidak ditemukan"),
      Domain::CitizenNotFound(_) => Self::not_found("Penduduk tidak ditemukan"),
      Domain::KelurahanNotFound(_) => {
        Self::field("kelurahan_id", "Kelurahan tidak ditemukan")
      }
      Domain::InvalidSlotTimes => {
        Self::field("jam_selesai", "Jam selesai harus setelah jam mulai")
      }
      other => Self::general(other.to_string()),
    }
  }

  /// Render not-found as an HTML fragment when the request came from HTMX.
  pub fn fragment(self, htmx: bool) -> Self {
    match self {
      Self::NotFound { message, .. } => Self::NotFound { message, fragment: htmx },
      other => other,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Validation(errors) => {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": errors })))
          .into_response()
      }
      Error::NotFound { message, fragment: true } => (
        StatusCode::NOT_FOUND,
        Html(format!(
          r#"<div class="text-center py-8 text-slate-500"><p>{message}</p></div>"#
        )),
      )
        .into_response(),
      Error::NotFound { message, fragment: false } => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
      }
      Error::Conflict(msg) => {
        (StatusCode::CONFLICT, Json(json!({ "errors": { GENERAL: msg } })))
          .into_response()
      }
      Error::Unauthorized(msg) => {
        (StatusCode::UNAUTHORIZED, Json(json!({ "errors": { GENERAL: msg } })))
          .into_response()
      }
      Error::NotSignedIn { login, htmx: true } => {
        let mut res = StatusCode::UNAUTHORIZED.into_response();
        res.headers_mut().insert("hx-redirect", HeaderValue::from_static(login));
        res
      }
      Error::NotSignedIn { login, htmx: false } => Redirect::to(login).into_response(),
      Error::Forbidden(msg) => (StatusCode::FORBIDDEN, msg).into_response(),
      Error::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "error": INTERNAL_MESSAGE })),
        )
          .into_response()
      }
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
