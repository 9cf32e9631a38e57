//! Sign-in, registration and sign-out.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/login`, `/petugas/login`, `/register` | Redirect when signed in |
//! | `POST` | `/auth/login` | NIK + password |
//! | `POST` | `/auth/login/petugas` | NIP + password |
//! | `POST` | `/auth/register` | Signs the new citizen in |
//! | `POST` | `/auth/logout` | |

use axum::{
  Extension, Form,
  extract::State,
  response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use simpel_core::{
  citizen::{NewCitizen, Nik, Sex},
  kelurahan::Kelurahan,
  officer::validate_nip,
  store::PortalStore,
};

use super::{form_page, redirect};
use crate::{
  AppState,
  actor::{HxRequest, MaybeActor},
  auth::{self, Outcome},
  csrf::CsrfToken,
  error::{Error, FieldErrors, Result},
  password,
  session::{self, Session},
};

const INVALID_CITIZEN: &str = "NIK atau password salah";
const INVALID_OFFICER: &str = "NIP atau password salah";
const NO_PASSWORD: &str = "Akun belum memiliki password. Silakan hubungi petugas.";
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Serialize)]
struct Empty {}

// ─── Pages ───────────────────────────────────────────────────────────────────

/// `GET /login`
pub async fn citizen_login_page(
  MaybeActor(session): MaybeActor,
  Extension(CsrfToken(csrf)): Extension<CsrfToken>,
) -> Response {
  match session {
    Some(session) => Redirect::to(session.home()).into_response(),
    None => form_page("login", csrf, Empty {}).into_response(),
  }
}

/// `GET /petugas/login`
pub async fn officer_login_page(
  MaybeActor(session): MaybeActor,
  Extension(CsrfToken(csrf)): Extension<CsrfToken>,
) -> Response {
  match session {
    Some(session) => Redirect::to(session.home()).into_response(),
    None => form_page("officer_login", csrf, Empty {}).into_response(),
  }
}

#[derive(Debug, Serialize)]
pub struct RegisterPage {
  pub kelurahan: Vec<Kelurahan>,
}

/// `GET /register`
pub async fn register_page<S: PortalStore>(
  State(state): State<AppState<S>>,
  MaybeActor(session): MaybeActor,
  Extension(CsrfToken(csrf)): Extension<CsrfToken>,
) -> Result<Response> {
  if let Some(session) = session {
    return Ok(Redirect::to(session.home()).into_response());
  }
  let kelurahan = state.store.list_kelurahan().await.map_err(Error::from_store)?;
  Ok(form_page("register", csrf, RegisterPage { kelurahan }).into_response())
}

// ─── Citizen login ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CitizenLoginForm {
  #[serde(default)]
  pub nik:      String,
  #[serde(default)]
  pub password: String,
  pub remember: Option<String>,
}

/// `POST /auth/login`
pub async fn citizen_login<S: PortalStore>(
  State(state): State<AppState<S>>,
  HxRequest(htmx): HxRequest,
  jar: PrivateCookieJar,
  Form(form): Form<CitizenLoginForm>,
) -> Result<Response> {
  let raw = form.nik.trim();
  if raw.is_empty() || form.password.is_empty() {
    return Err(Error::general("NIK dan password harus diisi"));
  }
  let nik = Nik::parse(raw).map_err(|_| Error::field("nik", "NIK harus 16 digit"))?;

  let citizen = match auth::citizen(&*state.store, &nik, &form.password)
    .await
    .map_err(Error::from_store)?
  {
    Outcome::Accepted(citizen) => citizen,
    Outcome::NoPasswordSet if state.config.reveal_unset_password => {
      tracing::warn!("citizen login refused: no password set");
      return Err(Error::Unauthorized(NO_PASSWORD));
    }
    Outcome::NoPasswordSet | Outcome::InvalidCredentials => {
      tracing::warn!("citizen login refused");
      return Err(Error::Unauthorized(INVALID_CITIZEN));
    }
  };

  let now = Utc::now();
  let remember = form.remember.as_deref() == Some("on");
  let session = Session::citizen(&citizen.nik, &citizen.full_name, remember, now);
  let jar = session::write(jar, &session, now, state.config.cookie_secure)?;
  tracing::info!(remember, "citizen signed in");
  Ok((jar, redirect(session.home(), htmx)).into_response())
}

// ─── Officer login ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OfficerLoginForm {
  #[serde(default)]
  pub nip:      String,
  #[serde(default)]
  pub password: String,
  pub remember: Option<String>,
}

/// `POST /auth/login/petugas`
pub async fn officer_login<S: PortalStore>(
  State(state): State<AppState<S>>,
  HxRequest(htmx): HxRequest,
  jar: PrivateCookieJar,
  Form(form): Form<OfficerLoginForm>,
) -> Result<Response> {
  if form.nip.trim().is_empty() || form.password.is_empty() {
    return Err(Error::general("NIP dan password harus diisi"));
  }
  let nip = validate_nip(&form.nip).map_err(|_| Error::field("nip", "NIP harus 18 digit"))?;

  let Outcome::Accepted(officer) = auth::officer(&*state.store, nip, &form.password)
    .await
    .map_err(Error::from_store)?
  else {
    tracing::warn!("officer login refused");
    return Err(Error::Unauthorized(INVALID_OFFICER));
  };

  let now = Utc::now();
  let remember = form.remember.as_deref() == Some("on");
  let session = Session::officer(&officer, remember, now);
  let jar = session::write(jar, &session, now, state.config.cookie_secure)?;
  tracing::info!(officer = %officer.officer_id, role = officer.role.as_str(), "officer signed in");
  Ok((jar, redirect(session.home(), htmx)).into_response())
}

// ─── Registration ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
  pub nik:           String,
  pub nama_lengkap:  String,
  pub email:         String,
  pub password:      String,
  pub alamat:        String,
  pub no_hp:         String,
  pub jenis_kelamin: String,
  pub kelurahan_id:  String,
}

fn optional(value: &str) -> Option<String> {
  let value = value.trim();
  (!value.is_empty()).then(|| value.to_owned())
}

/// `POST /auth/register`
pub async fn register<S: PortalStore>(
  State(state): State<AppState<S>>,
  HxRequest(htmx): HxRequest,
  jar: PrivateCookieJar,
  Form(form): Form<RegisterForm>,
) -> Result<Response> {
  let mut errors = FieldErrors::new();

  let nik = match form.nik.trim() {
    "" => {
      errors.insert("nik", "NIK harus diisi".into());
      None
    }
    raw => Nik::parse(raw)
      .map_err(|_| errors.insert("nik", "NIK harus 16 digit".into()))
      .ok(),
  };

  let full_name = form.nama_lengkap.trim();
  if full_name.is_empty() {
    errors.insert("nama_lengkap", "Nama lengkap harus diisi".into());
  }

  if form.password.is_empty() {
    errors.insert("password", "Password harus diisi".into());
  } else if form.password.chars().count() < MIN_PASSWORD_LEN {
    errors.insert("password", "Password minimal 8 karakter".into());
  }

  let email = optional(&form.email);
  if email.as_deref().is_some_and(|e| !e.contains('@')) {
    errors.insert("email", "Format email tidak valid".into());
  }

  let sex = Sex::parse(form.jenis_kelamin.trim())
    .map_err(|_| errors.insert("jenis_kelamin", "Jenis kelamin tidak valid".into()))
    .ok();

  let kelurahan_id = match form.kelurahan_id.trim() {
    "" => {
      errors.insert("kelurahan_id", "Kelurahan harus dipilih".into());
      None
    }
    raw => raw
      .parse::<i16>()
      .map_err(|_| errors.insert("kelurahan_id", "ID Kelurahan tidak valid".into()))
      .ok(),
  };

  let (Some(nik), Some(sex), Some(kelurahan_id)) = (nik, sex, kelurahan_id) else {
    return Err(Error::Validation(errors));
  };
  if !errors.is_empty() {
    return Err(Error::Validation(errors));
  }

  let password_hash =
    password::hash(&form.password).map_err(|e| Error::Internal(e.to_string().into()))?;

  let citizen = state
    .store
    .register_citizen(NewCitizen {
      nik,
      full_name: full_name.to_owned(),
      sex,
      address: optional(&form.alamat),
      phone: optional(&form.no_hp),
      email,
      kelurahan_id: Some(kelurahan_id),
      password_hash: Some(password_hash),
    })
    .await
    .map_err(Error::from_store)?;
  tracing::info!(kelurahan_id, "citizen registered");

  let now = Utc::now();
  let session = Session::citizen(&citizen.nik, &citizen.full_name, false, now);
  let jar = session::write(jar, &session, now, state.config.cookie_secure)?;
  Ok((jar, redirect(session.home(), htmx)).into_response())
}

// ─── Logout ──────────────────────────────────────────────────────────────────

/// `POST /auth/logout`
pub async fn logout(HxRequest(htmx): HxRequest, jar: PrivateCookieJar) -> Response {
  (session::clear(jar), redirect("/", htmx)).into_response()
}
