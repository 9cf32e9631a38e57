//! Double-submit CSRF protection with an origin check.
//!
//! Every response to a request without a `csrf_token` cookie issues one.
//! State-changing requests must echo it in `X-CSRF-Token` or, for
//! url-encoded and multipart forms, in a `csrf_token` field, and must
//! originate from the request host or a configured origin.

use std::sync::Arc;

use axum::{
  body::Body,
  extract::{Request, State},
  http::{HeaderMap, Method, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use bytes::Bytes;
use rand_core::{OsRng, RngCore};
use subtle::ConstantTimeEq;

use crate::{ServerConfig, error::Error};

pub const COOKIE_NAME: &str = "csrf_token";
pub const HEADER_NAME: &str = "x-csrf-token";
pub const FORM_FIELD: &str = "csrf_token";

const FORM_LIMIT: usize = 64 * 1024;
/// The largest upload form plus room for its text fields.
const MULTIPART_LIMIT: usize = 20 * 1024 * 1024 + FORM_LIMIT;
const MISMATCH: &str = "CSRF token mismatch";
const BAD_ORIGIN: &str = "Origin/Referer invalid";

/// The token in force for this request, for pages that embed it in forms.
#[derive(Debug, Clone)]
pub struct CsrfToken(pub String);

/// 32 random bytes, base64url without padding.
pub fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// Middleware entry point, installed with `from_fn_with_state`.
pub async fn protect(
  State(config): State<Arc<ServerConfig>>,
  mut request: Request,
  next: Next,
) -> Response {
  let jar = CookieJar::from_headers(request.headers());
  let existing = jar
    .get(COOKIE_NAME)
    .map(|c| c.value().to_owned())
    .filter(|v| !v.is_empty());
  let issued = existing.is_none();
  let token = existing.unwrap_or_else(generate_token);

  request.extensions_mut().insert(CsrfToken(token.clone()));

  let response = if is_safe(request.method()) {
    next.run(request).await
  } else {
    match verify(&config, &token, request).await {
      Ok(request) => next.run(request).await,
      Err(e) => {
        tracing::warn!(reason = %e, "rejected state-changing request");
        e.into_response()
      }
    }
  };

  if issued {
    let cookie = Cookie::build((COOKIE_NAME, token))
      .path("/")
      .http_only(true)
      .secure(config.cookie_secure)
      .same_site(SameSite::Lax)
      .max_age(time::Duration::hours(24));
    (jar.add(cookie), response).into_response()
  } else {
    response
  }
}

fn is_safe(method: &Method) -> bool {
  matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

/// Check origin and token, handing the request back intact on success.
async fn verify(config: &ServerConfig, expected: &str, request: Request) -> Result<Request, Error> {
  if !origin_allowed(&request, &config.allowed_origins) {
    return Err(Error::Forbidden(BAD_ORIGIN));
  }

  let from_header = request
    .headers()
    .get(HEADER_NAME)
    .and_then(|v| v.to_str().ok())
    .map(str::to_owned);

  let (submitted, request) = match from_header {
    Some(token) => (Some(token), request),
    None if is_urlencoded(request.headers()) => {
      let (parts, body) = request.into_parts();
      let bytes = axum::body::to_bytes(body, FORM_LIMIT)
        .await
        .map_err(|_| Error::Forbidden(MISMATCH))?;
      let token = form_field(&bytes, FORM_FIELD);
      (token, Request::from_parts(parts, Body::from(bytes)))
    }
    None if is_multipart(request.headers()) => {
      let (parts, body) = request.into_parts();
      let bytes = axum::body::to_bytes(body, MULTIPART_LIMIT).await.map_err(|_| {
        Error::general("Gagal memproses form. Pastikan file tidak lebih dari 20MB.")
      })?;
      let token = multipart_field(&parts.headers, bytes.clone(), FORM_FIELD).await;
      (token, Request::from_parts(parts, Body::from(bytes)))
    }
    None => (None, request),
  };

  match submitted {
    Some(token) if tokens_match(&token, expected) => Ok(request),
    _ => Err(Error::Forbidden(MISMATCH)),
  }
}

fn tokens_match(submitted: &str, expected: &str) -> bool {
  submitted.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
  headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
}

fn is_urlencoded(headers: &HeaderMap) -> bool {
  content_type(headers).is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn is_multipart(headers: &HeaderMap) -> bool {
  content_type(headers).is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Text of the part called `name` in a buffered multipart body. Parts before
/// it, file uploads included, are skipped unread.
async fn multipart_field(headers: &HeaderMap, body: Bytes, name: &str) -> Option<String> {
  let boundary = multer::parse_boundary(content_type(headers)?).ok()?;
  let mut multipart = multer::Multipart::new(Body::from(body).into_data_stream(), boundary);
  while let Some(field) = multipart.next_field().await.ok()? {
    if field.name() == Some(name) {
      return field.text().await.ok();
    }
  }
  None
}

/// Raw value of `name` in a url-encoded body. Tokens are base64url, so no
/// percent-decoding is needed to compare them.
fn form_field(body: &[u8], name: &str) -> Option<String> {
  std::str::from_utf8(body)
    .ok()?
    .split('&')
    .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
    .map(str::to_owned)
}

/// `Origin`, falling back to `Referer`, must name the request host or an
/// allow-listed origin. Requests carrying neither are refused.
fn origin_allowed(request: &Request, allowed: &[String]) -> bool {
  let headers = request.headers();
  let Some(source) = headers
    .get(header::ORIGIN)
    .or_else(|| headers.get(header::REFERER))
    .and_then(|v| v.to_str().ok())
  else {
    return false;
  };
  let Some(host) = host_of(source) else {
    return false;
  };

  let request_host = headers
    .get(header::HOST)
    .and_then(|v| v.to_str().ok())
    .or_else(|| request.uri().authority().map(|a| a.as_str()));

  request_host == Some(host) || allowed.iter().any(|a| host_of(a) == Some(host))
}

/// `host[:port]` of a URL, or the input itself when it has no scheme.
fn host_of(url: &str) -> Option<&str> {
  let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
  let host = rest.split(['/', '?', '#']).next()?;
  (!host.is_empty()).then_some(host)
}
