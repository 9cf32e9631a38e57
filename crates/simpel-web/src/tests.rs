//! Router-level tests: requests go through the full middleware stack
//! (CSRF, security headers, session cookies) against an in-memory store.

use std::path::Path;

use axum::{
  body::Body,
  http::{HeaderMap, Request, StatusCode, header},
  response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use chrono::{Days, Local, NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use simpel_core::{
  application::{ApplicationDetails, NewApplication, StatusUpdate},
  citizen::{NewCitizen, Nik, Sex},
  document::{DocumentKind, NewDocument},
  kelurahan::{Kelurahan, NewKelurahan},
  officer::{NewOfficer, Officer},
  scope::Scope,
  slot::{NewSlot, SessionStatus, Slot, SlotQuery},
  status::ApplicationStatus,
  store::PortalStore,
};
use simpel_store_sqlite::SqliteStore;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
  AppState, ServerConfig, assets::AssetManifest, password, router,
  session::{self, Session},
};

const CSRF: &str = "test-csrf-token";
const CITIZEN_NIK: &str = "3172010101800001";
const BOUNDARY: &str = "simpel-test-boundary";

// ─── Fixtures ────────────────────────────────────────────────────────────────

async fn make_state(upload_dir: &Path) -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let config = ServerConfig {
    session_secret: "a-test-secret-that-is-long-enough-to-use".to_owned(),
    upload_dir: upload_dir.to_path_buf(),
    static_dir: upload_dir.join("static"),
    ..ServerConfig::default()
  };
  AppState::new(store, config, AssetManifest::dev("http://localhost:3000"))
}

fn tomorrow() -> NaiveDate {
  Local::now().date_naive().checked_add_days(Days::new(1)).unwrap()
}

fn hm(h: u32) -> NaiveTime { NaiveTime::from_hms_opt(h, 0, 0).unwrap() }

fn nik(n: u32) -> Nik { Nik::parse(&format!("31720101019{n:05}")).unwrap() }

async fn kelurahan(state: &AppState<SqliteStore>, name: &str, code: &str) -> Kelurahan {
  state
    .store
    .add_kelurahan(NewKelurahan { name: name.into(), area_code: code.into() })
    .await
    .unwrap()
}

async fn citizen(
  state: &AppState<SqliteStore>,
  nik: &Nik,
  kelurahan_id: i16,
  password_hash: Option<String>,
) {
  state
    .store
    .register_citizen(NewCitizen {
      nik: nik.clone(),
      full_name: format!("Warga {nik}"),
      sex: Sex::LakiLaki,
      address: None,
      phone: None,
      email: None,
      kelurahan_id: Some(kelurahan_id),
      password_hash,
    })
    .await
    .unwrap();
}

async fn officer(state: &AppState<SqliteStore>, nip: &str, kelurahan_id: Option<i16>) -> Officer {
  state
    .store
    .add_officer(NewOfficer {
      nip: nip.into(),
      name: format!("Petugas {nip}"),
      username: format!("petugas{nip}"),
      password_hash: password::hash("rahasia123").unwrap(),
      kelurahan_id,
    })
    .await
    .unwrap()
}

async fn slot(state: &AppState<SqliteStore>, kelurahan_id: Option<i16>, quota: u32) -> Slot {
  state
    .store
    .add_slot(NewSlot::new(tomorrow(), hm(9), hm(12), kelurahan_id, quota).unwrap())
    .await
    .unwrap()
}

/// Book `slot_id` for a freshly registered citizen `n`.
async fn book(state: &AppState<SqliteStore>, n: u32, kelurahan_id: i16, slot_id: Uuid) -> Uuid {
  let nik = nik(n);
  citizen(state, &nik, kelurahan_id, None).await;
  state
    .store
    .create_application(NewApplication {
      nik,
      slot_id,
      details: ApplicationDetails::New,
      documents: vec![NewDocument { kind: DocumentKind::Kk, file_path: format!("/tmp/{n}.pdf") }],
      today: Local::now().date_naive(),
    })
    .await
    .unwrap()
    .application_id
}

/// `name=value` pair for a session cookie signed with the state's key.
fn session_cookie(state: &AppState<SqliteStore>, session: &Session) -> String {
  let jar = PrivateCookieJar::new(state.key.clone());
  let jar = session::write(jar, session, Utc::now(), false).unwrap();
  let res = (jar, ()).into_response();
  let set = res.headers()[header::SET_COOKIE].to_str().unwrap();
  set.split(';').next().unwrap().to_owned()
}

fn citizen_cookie(state: &AppState<SqliteStore>, nik: &Nik) -> String {
  session_cookie(state, &Session::citizen(nik, "Budi", false, Utc::now()))
}

fn officer_cookie(state: &AppState<SqliteStore>, officer: &Officer) -> String {
  session_cookie(state, &Session::officer(officer, false, Utc::now()))
}

// ─── Request helpers ─────────────────────────────────────────────────────────

/// A same-origin request carrying the CSRF cookie and header, plus an
/// optional session cookie.
fn request(method: &str, uri: &str, session: Option<&str>) -> axum::http::request::Builder {
  let cookie = match session {
    Some(session) => format!("csrf_token={CSRF}; {session}"),
    None => format!("csrf_token={CSRF}"),
  };
  Request::builder()
    .method(method)
    .uri(uri)
    .header(header::HOST, "localhost")
    .header(header::ORIGIN, "http://localhost")
    .header(header::COOKIE, cookie)
    .header("x-csrf-token", CSRF)
}

async fn send(state: &AppState<SqliteStore>, req: Request<Body>) -> Response {
  router(state.clone()).oneshot(req).await.unwrap()
}

async fn json(res: Response) -> Value {
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn location(res: &Response) -> &str {
  res.headers()[header::LOCATION].to_str().unwrap()
}

fn multipart(fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
  let mut body = Vec::new();
  for (name, value) in fields {
    body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
      )
      .as_bytes(),
    );
  }
  for (name, file_name, bytes) in files {
    body.extend_from_slice(
      format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
         filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
      )
      .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
  body
}

fn multipart_request(uri: &str, session: &str, body: Vec<u8>) -> Request<Body> {
  request("POST", uri, Some(session))
    .header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={BOUNDARY}"),
    )
    .body(Body::from(body))
    .unwrap()
}

const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF\n";

// ─── Booking ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_card_submission_books_last_seat() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let nik = Nik::parse(CITIZEN_NIK).unwrap();
  citizen(&state, &nik, pmb.kelurahan_id, None).await;

  let slot = slot(&state, Some(pmb.kelurahan_id), 50).await;
  for n in 0..49 {
    book(&state, n, pmb.kelurahan_id, slot.slot_id).await;
  }

  let body = multipart(
    &[("jadwal_sesi_id", slot.slot_id.to_string().as_str())],
    &[("kartu_keluarga", "kk.pdf", PDF)],
  );
  let cookie = citizen_cookie(&state, &nik);
  let res = send(&state, multipart_request("/permohonan/baru", &cookie, body)).await;

  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  let target = location(&res).to_owned();
  let id = target
    .strip_prefix("/permohonan/sukses?id=")
    .and_then(|rest| rest.strip_suffix("&type=baru"))
    .unwrap_or_else(|| panic!("unexpected redirect: {target}"));
  let id = Uuid::parse_str(id).unwrap();

  let detail = state.store.citizen_application(&nik, id).await.unwrap().unwrap();
  assert_eq!(detail.application.status, ApplicationStatus::Terdaftar);
  assert_eq!(detail.application.queue_number, 50);
  assert_eq!(detail.documents.len(), 1);
  assert_eq!(detail.documents[0].kind, DocumentKind::Kk);
  assert!(Path::new(&detail.documents[0].file_path).exists());

  let slot = state.store.get_slot(slot.slot_id, Scope::District).await.unwrap().unwrap();
  assert_eq!(slot.filled_quota, 50);
  assert_eq!(slot.session_status, SessionStatus::Penuh);

  let res = send(&state, request("GET", &target, Some(&cookie)).body(Body::empty()).unwrap()).await;
  assert_eq!(res.status(), StatusCode::OK);
  let page = json(res).await;
  assert_eq!(page["queue_number"], 50);
  assert_eq!(page["kind"], "BARU");
}

#[tokio::test]
async fn full_slot_is_rejected_and_upload_removed() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let nik = Nik::parse(CITIZEN_NIK).unwrap();
  citizen(&state, &nik, pmb.kelurahan_id, None).await;

  let slot = slot(&state, Some(pmb.kelurahan_id), 1).await;
  book(&state, 1, pmb.kelurahan_id, slot.slot_id).await;

  let body = multipart(
    &[("jadwal_sesi_id", slot.slot_id.to_string().as_str())],
    &[("kartu_keluarga", "kk.pdf", PDF)],
  );
  let cookie = citizen_cookie(&state, &nik);
  let res = send(&state, multipart_request("/permohonan/baru", &cookie, body)).await;

  assert_eq!(res.status(), StatusCode::CONFLICT);
  let body = json(res).await;
  assert!(body["errors"]["general"].is_string());

  let citizen_dir = dir.path().join(CITIZEN_NIK);
  let leftovers = std::fs::read_dir(&citizen_dir).map(|d| d.count()).unwrap_or(0);
  assert_eq!(leftovers, 0);
  assert!(state.store.citizen_applications(&nik, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn second_submission_while_first_is_open_is_refused() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let nik = Nik::parse(CITIZEN_NIK).unwrap();
  citizen(&state, &nik, pmb.kelurahan_id, None).await;
  let slot = slot(&state, Some(pmb.kelurahan_id), 50).await;
  let cookie = citizen_cookie(&state, &nik);

  let submit = || {
    let body = multipart(
      &[("jadwal_sesi_id", slot.slot_id.to_string().as_str())],
      &[("kartu_keluarga", "kk.pdf", PDF)],
    );
    multipart_request("/permohonan/baru", &cookie, body)
  };

  let res = send(&state, submit()).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);

  let res = send(&state, submit()).await;
  assert_eq!(res.status(), StatusCode::CONFLICT);
  let body = json(res).await;
  assert!(
    body["errors"]["general"]
      .as_str()
      .unwrap()
      .starts_with("Anda masih memiliki permohonan")
  );

  let slot = state.store.get_slot(slot.slot_id, Scope::District).await.unwrap().unwrap();
  assert_eq!(slot.filled_quota, 1);
  let own = state.store.citizen_applications(&nik, 10).await.unwrap();
  assert_eq!(own.len(), 1);

  let detail = state
    .store
    .citizen_application(&nik, own[0].application_id)
    .await
    .unwrap()
    .unwrap();
  assert!(Path::new(&detail.documents[0].file_path).exists());
  let stored = std::fs::read_dir(dir.path().join(CITIZEN_NIK)).unwrap().count();
  assert_eq!(stored, 1);
}

#[tokio::test]
async fn unknown_slot_is_reported_on_the_slot_field() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let nik = Nik::parse(CITIZEN_NIK).unwrap();
  citizen(&state, &nik, pmb.kelurahan_id, None).await;

  let body = multipart(
    &[("jadwal_sesi_id", Uuid::new_v4().to_string().as_str())],
    &[("kartu_keluarga", "kk.pdf", PDF)],
  );
  let cookie = citizen_cookie(&state, &nik);
  let res = send(&state, multipart_request("/permohonan/baru", &cookie, body)).await;

  assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body = json(res).await;
  assert_eq!(body["errors"]["jadwal_sesi_id"], "Jadwal tidak ditemukan");
  assert!(state.store.citizen_applications(&nik, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn submission_reports_missing_fields() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let nik = Nik::parse(CITIZEN_NIK).unwrap();
  citizen(&state, &nik, pmb.kelurahan_id, None).await;

  let cookie = citizen_cookie(&state, &nik);
  let body = multipart(&[("nomor_laporan", "")], &[]);
  let res = send(&state, multipart_request("/permohonan/hilang", &cookie, body)).await;

  assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body = json(res).await;
  let errors = &body["errors"];
  assert_eq!(errors["jadwal_sesi_id"], "Pilih jadwal kedatangan");
  assert_eq!(errors["nomor_laporan"], "Nomor laporan polisi wajib diisi");
  assert_eq!(errors["tanggal_kejadian"], "Tanggal kejadian wajib diisi");
  assert_eq!(errors["surat_polisi"], "File Surat Keterangan Polisi wajib diunggah");
}

#[tokio::test]
async fn disguised_upload_is_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let nik = Nik::parse(CITIZEN_NIK).unwrap();
  citizen(&state, &nik, pmb.kelurahan_id, None).await;
  let slot = slot(&state, Some(pmb.kelurahan_id), 10).await;

  let body = multipart(
    &[("jadwal_sesi_id", slot.slot_id.to_string().as_str())],
    &[("kartu_keluarga", "kk.pdf", &b"MZ\x90\x00 not a pdf"[..])],
  );
  let cookie = citizen_cookie(&state, &nik);
  let res = send(&state, multipart_request("/permohonan/baru", &cookie, body)).await;

  assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body = json(res).await;
  assert!(body["errors"]["kartu_keluarga"].is_string());
  let slot = state.store.get_slot(slot.slot_id, Scope::District).await.unwrap().unwrap();
  assert_eq!(slot.filled_quota, 0);
}

#[tokio::test]
async fn form_page_lists_bookable_slots() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let nik = Nik::parse(CITIZEN_NIK).unwrap();
  citizen(&state, &nik, pmb.kelurahan_id, None).await;
  slot(&state, Some(pmb.kelurahan_id), 10).await;
  slot(&state, None, 10).await;

  let cookie = citizen_cookie(&state, &nik);
  let uri = format!("/permohonan/baru?lokasi={}", pmb.kelurahan_id);
  let res = send(&state, request("GET", &uri, Some(&cookie)).body(Body::empty()).unwrap()).await;

  assert_eq!(res.status(), StatusCode::OK);
  let page = json(res).await;
  assert_eq!(page["page"], "application_form");
  assert_eq!(page["csrf_token"], CSRF);
  assert_eq!(page["slots"].as_array().unwrap().len(), 1);
  assert_eq!(page["locations"][0]["label"], "Kecamatan Pademangan");
  assert_eq!(page["profile"]["nik"], CITIZEN_NIK);
}

// ─── Officer views ───────────────────────────────────────────────────────────

#[tokio::test]
async fn district_officer_lists_rejections_across_kelurahan() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let acl = kelurahan(&state, "Ancol", "ACL").await;
  let district = officer(&state, "198501152010011001", None).await;
  let local = officer(&state, "199003202015022002", Some(pmb.kelurahan_id)).await;

  let pmb_slot = slot(&state, Some(pmb.kelurahan_id), 10).await;
  let acl_slot = slot(&state, Some(acl.kelurahan_id), 10).await;
  let rejected = [
    book(&state, 1, pmb.kelurahan_id, pmb_slot.slot_id).await,
    book(&state, 2, acl.kelurahan_id, acl_slot.slot_id).await,
  ];
  book(&state, 3, acl.kelurahan_id, acl_slot.slot_id).await;
  for application_id in rejected {
    state
      .store
      .update_status(StatusUpdate {
        application_id,
        status: ApplicationStatus::Ditolak,
        note: Some("Dokumen tidak lengkap".into()),
        officer_id: district.officer_id,
        scope: Scope::District,
      })
      .await
      .unwrap();
  }

  let cookie = officer_cookie(&state, &district);
  let res = send(
    &state,
    request("GET", "/admin/permohonan?status=DITOLAK", Some(&cookie))
      .body(Body::empty())
      .unwrap(),
  )
  .await;
  assert_eq!(res.status(), StatusCode::OK);
  let page = json(res).await;
  assert_eq!(page["total"], 2);
  assert_eq!(page["applications"].as_array().unwrap().len(), 2);

  let cookie = officer_cookie(&state, &local);
  let res = send(
    &state,
    request("GET", "/admin/permohonan?status=DITOLAK", Some(&cookie))
      .body(Body::empty())
      .unwrap(),
  )
  .await;
  let page = json(res).await;
  assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn page_far_past_the_end_is_empty() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let district = officer(&state, "198501152010011001", None).await;
  let pmb_slot = slot(&state, Some(pmb.kelurahan_id), 10).await;
  book(&state, 1, pmb.kelurahan_id, pmb_slot.slot_id).await;

  let cookie = officer_cookie(&state, &district);
  let res = send(
    &state,
    request("GET", "/admin/permohonan?page=1000000000000000000", Some(&cookie))
      .body(Body::empty())
      .unwrap(),
  )
  .await;
  assert_eq!(res.status(), StatusCode::OK);
  let page = json(res).await;
  assert_eq!(page["current_page"], 1_000_000_000_000_000_000u64);
  assert!(page["applications"].as_array().unwrap().is_empty());
  assert_eq!(page["total"], 1);
}

#[tokio::test]
async fn rereading_a_detail_changes_nothing() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let district = officer(&state, "198501152010011001", None).await;
  let pmb_slot = slot(&state, Some(pmb.kelurahan_id), 10).await;
  let id = book(&state, 1, pmb.kelurahan_id, pmb_slot.slot_id).await;
  state
    .store
    .update_status(StatusUpdate {
      application_id: id,
      status:         ApplicationStatus::Proses,
      note:           None,
      officer_id:     district.officer_id,
      scope:          Scope::District,
    })
    .await
    .unwrap();

  let cookie = officer_cookie(&state, &district);
  let uri = format!("/admin/permohonan/{id}");
  let read = || request("GET", &uri, Some(&cookie)).body(Body::empty()).unwrap();

  let first = json(send(&state, read()).await).await;
  let second = json(send(&state, read()).await).await;
  assert_eq!(first, second);
  assert_eq!(first["application"]["status"], "PROSES");
  assert_eq!(first["history"].as_array().unwrap().len(), 2);
  assert_eq!(first["documents"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_status_filter_is_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let district = officer(&state, "198501152010011001", None).await;

  let cookie = officer_cookie(&state, &district);
  let res = send(
    &state,
    request("GET", "/admin/permohonan?status=HILANG", Some(&cookie))
      .body(Body::empty())
      .unwrap(),
  )
  .await;
  assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn status_update_records_history_and_respects_scope() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let acl = kelurahan(&state, "Ancol", "ACL").await;
  let pmb_officer = officer(&state, "199003202015022002", Some(pmb.kelurahan_id)).await;
  let acl_officer = officer(&state, "199205102018031003", Some(acl.kelurahan_id)).await;
  let pmb_slot = slot(&state, Some(pmb.kelurahan_id), 10).await;
  let id = book(&state, 1, pmb.kelurahan_id, pmb_slot.slot_id).await;

  let form = |status: &str| format!("id={id}&status={status}&catatan=Berkas+lengkap");
  let post = |cookie: &str, body: String| {
    request("POST", "/admin/permohonan/update-status", Some(cookie))
      .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
      .body(Body::from(body))
      .unwrap()
  };

  let outsider = officer_cookie(&state, &acl_officer);
  let res = send(&state, post(&outsider, form("PROSES"))).await;
  assert_eq!(res.status(), StatusCode::NOT_FOUND);

  let cookie = officer_cookie(&state, &pmb_officer);
  let res = send(&state, post(&cookie, form("TERDAFTAR"))).await;
  assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

  let res = send(&state, post(&cookie, form("PROSES"))).await;
  assert_eq!(res.status(), StatusCode::OK);
  let trigger = res.headers()["hx-trigger"].to_str().unwrap().to_owned();
  assert!(trigger.contains("closeDialog"));
  assert_eq!(res.headers()["hx-reswap"], "none");

  let detail = state
    .store
    .application_detail(id, Scope::District)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(detail.application.status, ApplicationStatus::Proses);
  let last = detail.history.last().unwrap();
  assert_eq!(last.status, ApplicationStatus::Proses);
  assert_eq!(last.note.as_deref(), Some("Berkas lengkap"));
  assert_eq!(last.officer_id, Some(pmb_officer.officer_id));
}

#[tokio::test]
async fn form_field_token_is_accepted() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let district = officer(&state, "198501152010011001", None).await;
  let cookie = officer_cookie(&state, &district);

  let req = Request::builder()
    .method("POST")
    .uri("/admin/jadwal")
    .header(header::HOST, "localhost")
    .header(header::ORIGIN, "http://localhost")
    .header(header::COOKIE, format!("csrf_token={CSRF}; {cookie}"))
    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
    .body(Body::from(format!(
      "csrf_token={CSRF}&tanggal=2030-01-07&jam_mulai=09:00&jam_selesai=12:00&kuota_maksimal=0"
    )))
    .unwrap();
  let res = send(&state, req).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/admin/jadwal");
}

// ─── Schedule ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_generation_runs_once_per_session() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let local = officer(&state, "199003202015022002", Some(pmb.kelurahan_id)).await;
  let cookie = officer_cookie(&state, &local);
  let generate = || {
    request("POST", "/admin/jadwal/generate", Some(&cookie))
      .body(Body::empty())
      .unwrap()
  };

  let res = send(&state, generate()).await;
  assert_eq!(res.status(), StatusCode::OK);
  assert_eq!(res.headers()["hx-redirect"], "/admin/jadwal");
  let first = json(res).await;
  let created = first["created"].as_u64().unwrap();
  assert!(created > 0);
  assert_eq!(first["skipped"], 0);

  let res = send(&state, generate()).await;
  let second = json(res).await;
  assert_eq!(second["created"], 0);
  assert_eq!(second["skipped"], created);

  let scope = Scope::Kelurahan(pmb.kelurahan_id);
  let slots = state
    .store
    .list_slots(&SlotQuery { scope, from: tomorrow(), to: tomorrow() + Days::new(30) })
    .await
    .unwrap();
  assert_eq!(slots.len() as u64, created);
  assert!(slots.iter().all(|s| s.kelurahan_id == Some(pmb.kelurahan_id)));
}

#[tokio::test]
async fn slot_toggle_is_scoped_and_limited_to_open_or_break() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let acl = kelurahan(&state, "Ancol", "ACL").await;
  let pmb_officer = officer(&state, "199003202015022002", Some(pmb.kelurahan_id)).await;
  let acl_officer = officer(&state, "199205102018031003", Some(acl.kelurahan_id)).await;
  let pmb_slot = slot(&state, Some(pmb.kelurahan_id), 10).await;

  let uri = format!("/admin/jadwal/{}/status", pmb_slot.slot_id);
  let toggle = |cookie: &str, status: &str| {
    request("POST", &uri, Some(cookie))
      .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
      .body(Body::from(format!("status={status}")))
      .unwrap()
  };

  let outsider = officer_cookie(&state, &acl_officer);
  let res = send(&state, toggle(&outsider, "ISTIRAHAT")).await;
  assert_eq!(res.status(), StatusCode::NOT_FOUND);

  let cookie = officer_cookie(&state, &pmb_officer);
  let res = send(&state, toggle(&cookie, "PENUH")).await;
  assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

  let res = send(&state, toggle(&cookie, "ISTIRAHAT")).await;
  assert_eq!(res.status(), StatusCode::OK);
  assert!(res.headers()["hx-trigger"].to_str().unwrap().contains("refreshJadwal"));
  assert_eq!(json(res).await["session_status"], "ISTIRAHAT");

  let stored = state.store.get_slot(pmb_slot.slot_id, Scope::District).await.unwrap().unwrap();
  assert_eq!(stored.session_status, SessionStatus::Istirahat);
}

// ─── Authentication ──────────────────────────────────────────────────────────

#[tokio::test]
async fn citizen_login_sets_session_and_redirects() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let nik = Nik::parse(CITIZEN_NIK).unwrap();
  citizen(&state, &nik, pmb.kelurahan_id, Some(password::hash("rahasia123").unwrap())).await;

  let login = |password: &str| {
    request("POST", "/auth/login", None)
      .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
      .body(Body::from(format!("nik={CITIZEN_NIK}&password={password}")))
      .unwrap()
  };

  let res = send(&state, login("salah")).await;
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(json(res).await["errors"]["general"], "NIK atau password salah");

  let res = send(&state, login("rahasia123")).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/dashboard");
  let session = res
    .headers()
    .get_all(header::SET_COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .find(|v| v.starts_with("simpel_session="))
    .map(|v| v.split(';').next().unwrap().to_owned())
    .expect("session cookie");

  let res = send(&state, request("GET", "/dashboard", Some(&session)).body(Body::empty()).unwrap())
    .await;
  assert_eq!(res.status(), StatusCode::OK);
  let page = json(res).await;
  assert_eq!(page["page"], "dashboard");
  assert_eq!(page["stats"]["total"], 0);
}

fn register_request(body: &str) -> Request<Body> {
  request("POST", "/auth/register", None)
    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
    .body(Body::from(body.to_owned()))
    .unwrap()
}

#[tokio::test]
async fn registration_reports_every_invalid_field() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;

  let res = send(
    &state,
    register_request("nik=12345&nama_lengkap=&password=pendek&email=budi&jenis_kelamin=X"),
  )
  .await;
  assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body = json(res).await;
  let errors = &body["errors"];
  assert_eq!(errors["nik"], "NIK harus 16 digit");
  assert_eq!(errors["nama_lengkap"], "Nama lengkap harus diisi");
  assert_eq!(errors["password"], "Password minimal 8 karakter");
  assert_eq!(errors["email"], "Format email tidak valid");
  assert_eq!(errors["jenis_kelamin"], "Jenis kelamin tidak valid");
  assert_eq!(errors["kelurahan_id"], "Kelurahan harus dipilih");
}

#[tokio::test]
async fn registration_signs_in_and_refuses_duplicates() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let form = |nik: &str, email: &str, kelurahan_id: i16| {
    format!(
      "nik={nik}&nama_lengkap=Budi+Santoso&email={email}&password=rahasia123\
       &jenis_kelamin=LAKI_LAKI&kelurahan_id={kelurahan_id}"
    )
  };

  let res = send(&state, register_request(&form(CITIZEN_NIK, "budi%40example.com", 99))).await;
  assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(json(res).await["errors"]["kelurahan_id"], "Kelurahan tidak ditemukan");

  let res = send(
    &state,
    register_request(&form(CITIZEN_NIK, "budi%40example.com", pmb.kelurahan_id)),
  )
  .await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/dashboard");
  let session = res
    .headers()
    .get_all(header::SET_COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .find(|v| v.starts_with("simpel_session="))
    .map(|v| v.split(';').next().unwrap().to_owned())
    .expect("session cookie");
  let res = send(&state, request("GET", "/dashboard", Some(&session)).body(Body::empty()).unwrap())
    .await;
  assert_eq!(res.status(), StatusCode::OK);
  assert_eq!(json(res).await["name"], "Budi Santoso");

  let res = send(
    &state,
    register_request(&form(CITIZEN_NIK, "lain%40example.com", pmb.kelurahan_id)),
  )
  .await;
  assert_eq!(res.status(), StatusCode::CONFLICT);
  assert_eq!(json(res).await["errors"]["general"], "NIK sudah terdaftar");

  let res = send(
    &state,
    register_request(&form("3172010101800002", "budi%40example.com", pmb.kelurahan_id)),
  )
  .await;
  assert_eq!(res.status(), StatusCode::CONFLICT);
  assert_eq!(json(res).await["errors"]["general"], "Email sudah terdaftar");
}

#[tokio::test]
async fn account_without_password_gets_generic_message() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let nik = Nik::parse(CITIZEN_NIK).unwrap();
  citizen(&state, &nik, pmb.kelurahan_id, None).await;

  let req = request("POST", "/auth/login", None)
    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
    .body(Body::from(format!("nik={CITIZEN_NIK}&password=apapun")))
    .unwrap();
  let res = send(&state, req).await;
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(json(res).await["errors"]["general"], "NIK atau password salah");
}

#[tokio::test]
async fn signed_out_citizen_is_sent_to_login() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;

  let res = send(&state, request("GET", "/dashboard", None).body(Body::empty()).unwrap()).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/login");

  let res = send(
    &state,
    request("GET", "/lacak-status", None)
      .header("hx-request", "true")
      .body(Body::empty())
      .unwrap(),
  )
  .await;
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(res.headers()["hx-redirect"], "/login");
}

#[tokio::test]
async fn officer_session_cannot_open_citizen_pages() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let district = officer(&state, "198501152010011001", None).await;

  let cookie = officer_cookie(&state, &district);
  let res = send(&state, request("GET", "/dashboard", Some(&cookie)).body(Body::empty()).unwrap())
    .await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn tracker_without_applications_returns_to_dashboard() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let nik = Nik::parse(CITIZEN_NIK).unwrap();
  citizen(&state, &nik, pmb.kelurahan_id, None).await;

  let cookie = citizen_cookie(&state, &nik);
  let res = send(&state, request("GET", "/lacak-status", Some(&cookie)).body(Body::empty()).unwrap())
    .await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  assert_eq!(location(&res), "/dashboard");
}

// ─── Middleware ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn post_without_token_is_forbidden() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;

  let req = Request::builder()
    .method("POST")
    .uri("/auth/logout")
    .header(header::HOST, "localhost")
    .header(header::ORIGIN, "http://localhost")
    .header(header::COOKIE, format!("csrf_token={CSRF}"))
    .body(Body::empty())
    .unwrap();
  assert_eq!(send(&state, req).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn multipart_form_field_token_is_accepted() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;
  let pmb = kelurahan(&state, "Pademangan Barat", "PMB").await;
  let nik = Nik::parse(CITIZEN_NIK).unwrap();
  citizen(&state, &nik, pmb.kelurahan_id, None).await;
  let slot = slot(&state, Some(pmb.kelurahan_id), 10).await;
  let cookie = citizen_cookie(&state, &nik);

  let submit = |token: &str| {
    let body = multipart(
      &[("jadwal_sesi_id", slot.slot_id.to_string().as_str()), ("csrf_token", token)],
      &[("kartu_keluarga", "kk.pdf", PDF)],
    );
    let mut req = multipart_request("/permohonan/baru", &cookie, body);
    req.headers_mut().remove("x-csrf-token");
    req
  };

  let res = send(&state, submit("token-lain")).await;
  assert_eq!(res.status(), StatusCode::FORBIDDEN);

  let res = send(&state, submit(CSRF)).await;
  assert_eq!(res.status(), StatusCode::SEE_OTHER);
  let slot = state.store.get_slot(slot.slot_id, Scope::District).await.unwrap().unwrap();
  assert_eq!(slot.filled_quota, 1);
}

#[tokio::test]
async fn cross_origin_post_is_forbidden() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;

  let mut req = request("POST", "/auth/logout", None).body(Body::empty()).unwrap();
  req
    .headers_mut()
    .insert(header::ORIGIN, "https://evil.example".parse().unwrap());
  assert_eq!(send(&state, req).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn responses_carry_security_headers_and_csrf_cookie() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;

  let req = Request::builder().uri("/login").body(Body::empty()).unwrap();
  let res = send(&state, req).await;
  assert_eq!(res.status(), StatusCode::OK);

  let headers: &HeaderMap = res.headers();
  assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
  assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
  assert!(headers.contains_key(header::STRICT_TRANSPORT_SECURITY));
  assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
  assert!(
    headers
      .get_all(header::SET_COOKIE)
      .iter()
      .any(|v| v.to_str().unwrap().starts_with("csrf_token="))
  );
}

#[tokio::test]
async fn unknown_route_is_not_found() {
  let dir = tempfile::tempdir().unwrap();
  let state = make_state(dir.path()).await;

  let req = Request::builder().uri("/tidak-ada").body(Body::empty()).unwrap();
  assert_eq!(send(&state, req).await.status(), StatusCode::NOT_FOUND);
}
