//! HTTP layer for the SIMPEL-KTP portal.
//!
//! Exposes an axum [`Router`] serving the citizen pages, the officer
//! back-office and the HTMX fragments both use, backed by any
//! [`PortalStore`]. Pages are rendered as JSON view models; unknown routes,
//! CSRF failures and internal errors follow the categories in [`error`].

pub mod actor;
pub mod assets;
pub mod auth;
pub mod csrf;
pub mod error;
pub mod handlers;
pub mod password;
pub mod seed;
pub mod session;
pub mod upload;

#[cfg(test)]
mod tests;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Extension, Router,
  extract::{DefaultBodyLimit, FromRef, Multipart, Query, State},
  http::{HeaderValue, header},
  middleware,
  routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use serde::Deserialize;
use sha2::{Digest, Sha512};
use simpel_core::{application::ApplicationKind, store::PortalStore};
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use actor::CitizenActor;
use csrf::CsrfToken;
use assets::AssetManifest;
use handlers::{admin, auth as auth_pages, citizen, home, jadwal, permohonan};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SIMPEL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub store_path:            PathBuf,
  /// Seed for the session cookie key. At least 32 characters.
  pub session_secret:        String,
  pub cookie_secure:         bool,
  pub upload_dir:            PathBuf,
  pub static_dir:            PathBuf,
  pub asset_manifest:        PathBuf,
  pub asset_dev_server:      String,
  /// Extra origins accepted for state-changing requests, e.g.
  /// `http://localhost:3000` while the Vite dev server proxies.
  pub allowed_origins:       Vec<String>,
  /// Tell citizens that their account has no password instead of showing
  /// the generic login failure.
  pub reveal_unset_password: bool,
  pub district_office_name:  String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  "127.0.0.1".to_owned(),
      port:                  8080,
      store_path:            PathBuf::from("simpel.db"),
      session_secret:        String::new(),
      cookie_secure:         false,
      upload_dir:            PathBuf::from("uploads"),
      static_dir:            PathBuf::from("static"),
      asset_manifest:        PathBuf::from("static/.vite/manifest.json"),
      asset_dev_server:      "http://localhost:3000".to_owned(),
      allowed_origins:       Vec::new(),
      reveal_unset_password: false,
      district_office_name:  "Kecamatan Pademangan".to_owned(),
    }
  }
}

pub const MIN_SECRET_LEN: usize = 32;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: PortalStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub assets: Arc<AssetManifest>,
  pub key:    Key,
}

impl<S: PortalStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig, assets: AssetManifest) -> Self {
    let key = session_key(&config.session_secret);
    Self {
      store: Arc::new(store),
      config: Arc::new(config),
      assets: Arc::new(assets),
      key,
    }
  }
}

impl<S: PortalStore> FromRef<AppState<S>> for Key {
  fn from_ref(state: &AppState<S>) -> Self { state.key.clone() }
}

/// Stretch the configured secret to the 64 bytes the cookie key needs.
pub fn session_key(secret: &str) -> Key {
  Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

// ─── Router ───────────────────────────────────────────────────────────────────

const CSP: &str = "default-src 'self'; \
  script-src 'self' 'unsafe-inline' 'unsafe-eval' https://unpkg.com; \
  style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
  font-src 'self' https://fonts.gstatic.com; \
  img-src 'self' data: https://*;";

/// Build the portal [`Router`].
pub fn router<S: PortalStore>(state: AppState<S>) -> Router {
  let mut app = Router::new()
    .route("/",                   get(home::index::<S>))
    // Authentication
    .route("/login",              get(auth_pages::citizen_login_page))
    .route("/petugas/login",      get(auth_pages::officer_login_page))
    .route("/register",           get(auth_pages::register_page::<S>))
    .route("/auth/login",         post(auth_pages::citizen_login::<S>))
    .route("/auth/login/petugas", post(auth_pages::officer_login::<S>))
    .route("/auth/register",      post(auth_pages::register::<S>))
    .route("/auth/logout",        post(auth_pages::logout))
    // Citizen
    .route("/dashboard",          get(citizen::dashboard::<S>))
    .route("/lacak-status",       get(citizen::track::<S>))
    .route("/permohonan/sukses",  get(permohonan::success::<S>))
    // Officer
    .route("/admin",                              get(admin::dashboard::<S>))
    .route("/admin/penduduk",                     get(admin::citizens::<S>))
    .route("/admin/permohonan",                   get(admin::applications::<S>))
    .route("/admin/permohonan/update-status",     post(admin::update_status::<S>))
    .route("/admin/permohonan/{id}",              get(admin::application_detail::<S>))
    .route("/admin/permohonan/{id}/status",       get(admin::status_form::<S>))
    .route("/admin/jadwal",                       get(jadwal::calendar::<S>).post(jadwal::create::<S>))
    .route("/admin/jadwal/generate",              post(jadwal::generate::<S>))
    .route("/admin/jadwal/{id}/antrian",          get(jadwal::queue::<S>))
    .route("/admin/jadwal/{id}/status",           post(jadwal::set_status::<S>));

  for kind in ApplicationKind::ALL {
    app = app.route(
      &format!("/permohonan/{}", kind.slug()),
      get(
        move |st: State<AppState<S>>,
              actor: CitizenActor,
              csrf: Extension<CsrfToken>,
              q: Query<permohonan::FormQuery>| {
          permohonan::form::<S>(st, actor, csrf, q, kind)
        },
      )
      .post(
        move |st: State<AppState<S>>, actor: CitizenActor, multipart: Multipart| {
          permohonan::submit::<S>(st, actor, multipart, kind)
        },
      )
      .layer(DefaultBodyLimit::max(kind.body_limit())),
    );
  }

  let config = state.config.clone();
  app
    .nest_service("/static", ServeDir::new(&state.config.static_dir))
    .fallback(home::not_found)
    .with_state(state)
    .layer(middleware::from_fn_with_state(config, csrf::protect))
    .layer(SetResponseHeaderLayer::overriding(
      header::X_FRAME_OPTIONS,
      HeaderValue::from_static("DENY"),
    ))
    .layer(SetResponseHeaderLayer::overriding(
      header::X_CONTENT_TYPE_OPTIONS,
      HeaderValue::from_static("nosniff"),
    ))
    .layer(SetResponseHeaderLayer::overriding(
      header::STRICT_TRANSPORT_SECURITY,
      HeaderValue::from_static("max-age=63072000; includeSubDomains"),
    ))
    .layer(SetResponseHeaderLayer::overriding(
      header::CONTENT_SECURITY_POLICY,
      HeaderValue::from_static(CSP),
    ))
    .layer(TraceLayer::new_for_http())
}
