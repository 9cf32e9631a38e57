//! Request extractors identifying who is calling.
//!
//! Handlers take the actor as an explicit parameter: a handler that needs a
//! signed-in citizen asks for [`CitizenActor`], and the extractor refuses the
//! request before the handler runs otherwise.

use std::convert::Infallible;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::Utc;
use simpel_core::{citizen::Nik, officer::Officer, scope::Scope, store::PortalStore};
use uuid::Uuid;

use crate::{
  AppState,
  error::Error,
  session::{self, ActorType, Session},
};

pub const CITIZEN_LOGIN: &str = "/login";
pub const OFFICER_LOGIN: &str = "/petugas/login";

pub fn is_htmx(headers: &HeaderMap) -> bool {
  headers.get("hx-request").is_some_and(|v| v == "true")
}

fn current_session<S: PortalStore>(parts: &Parts, state: &AppState<S>) -> Option<Session> {
  let jar = PrivateCookieJar::from_headers(&parts.headers, state.key.clone());
  session::read(&jar, Utc::now())
}

// ─── HxRequest ───────────────────────────────────────────────────────────────

/// Whether the request was issued by HTMX (`HX-Request: true`).
#[derive(Debug, Clone, Copy)]
pub struct HxRequest(pub bool);

impl<T: Send + Sync> FromRequestParts<T> for HxRequest {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _: &T) -> Result<Self, Self::Rejection> {
    Ok(Self(is_htmx(&parts.headers)))
  }
}

// ─── MaybeActor ──────────────────────────────────────────────────────────────

/// The session if someone is signed in. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeActor(pub Option<Session>);

impl<S: PortalStore> FromRequestParts<AppState<S>> for MaybeActor {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(Self(current_session(parts, state)))
  }
}

// ─── CitizenActor ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CitizenActor {
  pub nik:  Nik,
  pub name: String,
}

impl<S: PortalStore> FromRequestParts<AppState<S>> for CitizenActor {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let signed_out = || Error::NotSignedIn {
      login: CITIZEN_LOGIN,
      htmx:  is_htmx(&parts.headers),
    };
    let session = current_session(parts, state)
      .filter(|s| s.actor_type == ActorType::Citizen)
      .ok_or_else(signed_out)?;
    let nik = Nik::parse(&session.actor_id).map_err(|_| signed_out())?;
    Ok(Self { nik, name: session.name })
  }
}

// ─── OfficerActor ────────────────────────────────────────────────────────────

/// A signed-in officer, re-read from the store on every request so that the
/// access scope always reflects the current assignment.
#[derive(Debug, Clone)]
pub struct OfficerActor {
  pub officer: Officer,
}

impl OfficerActor {
  pub fn scope(&self) -> Scope { self.officer.scope() }

  pub fn id(&self) -> Uuid { self.officer.officer_id }
}

impl<S: PortalStore> FromRequestParts<AppState<S>> for OfficerActor {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let htmx = is_htmx(&parts.headers);
    let signed_out = Error::NotSignedIn { login: OFFICER_LOGIN, htmx };

    let Some(officer_id) = current_session(parts, state)
      .filter(|s| s.actor_type == ActorType::Officer)
      .and_then(|s| Uuid::parse_str(&s.actor_id).ok())
    else {
      return Err(signed_out);
    };

    match state.store.get_officer(officer_id).await.map_err(Error::from_store)? {
      Some(officer) => Ok(Self { officer }),
      None => Err(signed_out),
    }
  }
}
