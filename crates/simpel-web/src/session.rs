//! Signed-in sessions, carried in an encrypted and authenticated cookie.
//!
//! There is no server-side session table: the cookie holds everything the
//! server needs and is sealed with the key derived from `session_secret`.

use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use simpel_core::{
  citizen::Nik,
  officer::{Officer, OfficerRole},
};

use crate::error::Error;

pub const COOKIE_NAME: &str = "simpel_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
  Citizen,
  Officer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  /// NIK for citizens, officer UUID for officers.
  pub actor_id:   String,
  pub actor_type: ActorType,
  pub name:       String,
  pub role:       Option<OfficerRole>,
  pub expires_at: DateTime<Utc>,
}

/// 24 hours, or 30 days with "remember me".
pub fn lifetime(remember: bool) -> Duration {
  if remember { Duration::days(30) } else { Duration::hours(24) }
}

impl Session {
  pub fn citizen(nik: &Nik, name: &str, remember: bool, now: DateTime<Utc>) -> Self {
    Self {
      actor_id:   nik.to_string(),
      actor_type: ActorType::Citizen,
      name:       name.to_owned(),
      role:       None,
      expires_at: now + lifetime(remember),
    }
  }

  pub fn officer(officer: &Officer, remember: bool, now: DateTime<Utc>) -> Self {
    Self {
      actor_id:   officer.officer_id.to_string(),
      actor_type: ActorType::Officer,
      name:       officer.name.clone(),
      role:       Some(officer.role),
      expires_at: now + lifetime(remember),
    }
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }

  /// Landing page for this kind of actor.
  pub fn home(&self) -> &'static str {
    match self.actor_type {
      ActorType::Citizen => "/dashboard",
      ActorType::Officer => "/admin",
    }
  }
}

/// The live session in `jar`, if any. Expired or undecodable cookies count
/// as signed out.
pub fn read(jar: &PrivateCookieJar, now: DateTime<Utc>) -> Option<Session> {
  let cookie = jar.get(COOKIE_NAME)?;
  let session: Session = serde_json::from_str(cookie.value()).ok()?;
  (!session.is_expired(now)).then_some(session)
}

pub fn write(
  jar: PrivateCookieJar,
  session: &Session,
  now: DateTime<Utc>,
  secure: bool,
) -> Result<PrivateCookieJar, Error> {
  let value = serde_json::to_string(session).map_err(Error::internal)?;
  let max_age = (session.expires_at - now).num_seconds().max(0);
  let cookie = Cookie::build((COOKIE_NAME, value))
    .path("/")
    .http_only(true)
    .secure(secure)
    .same_site(SameSite::Lax)
    .max_age(time::Duration::seconds(max_age));
  Ok(jar.add(cookie))
}

pub fn clear(jar: PrivateCookieJar) -> PrivateCookieJar {
  jar.remove(Cookie::build(COOKIE_NAME).path("/"))
}
