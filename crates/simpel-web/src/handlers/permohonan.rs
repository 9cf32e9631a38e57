//! Identity-card application forms and the confirmation page.
//!
//! One GET/POST pair per [`ApplicationKind`], mounted at
//! `/permohonan/{baru,hilang,rusak,ubah}` with a body limit sized to the
//! number of files the form carries.

use std::{collections::HashMap, path::PathBuf};

use axum::{
  Extension,
  extract::{Multipart, Query, State, multipart::MultipartError},
  response::{IntoResponse, Redirect, Response},
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use simpel_core::{
  application::{ApplicationDetails, ApplicationKind, NewApplication},
  citizen::CitizenProfile,
  document::{DocumentKind, NewDocument},
  slot::{BookableQuery, SlotLocation},
  status::ApplicationStatus,
  store::{PortalStore, StoreError as _},
};
use uuid::Uuid;

use super::{form_page, page, today};
use crate::{
  AppState,
  actor::CitizenActor,
  csrf::CsrfToken,
  error::{Error, FieldErrors, Result},
  upload::{self, UploadedFile},
};

// ─── Form page ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FormQuery {
  /// `0` for the district office, a kelurahan id, or absent for all.
  pub lokasi: Option<i16>,
}

#[derive(Debug, Serialize)]
pub struct Location {
  pub id:    i16,
  pub label: String,
}

#[derive(Debug, Serialize)]
pub struct SlotOption {
  pub slot_id:    Uuid,
  pub date:       NaiveDate,
  pub start_time: NaiveTime,
  pub end_time:   NaiveTime,
  pub location:   String,
  pub remaining:  u32,
  pub label:      String,
}

#[derive(Debug, Serialize)]
pub struct ApplicationForm {
  pub kind:      ApplicationKind,
  pub title:     &'static str,
  pub documents: Vec<&'static str>,
  pub profile:   CitizenProfile,
  pub locations: Vec<Location>,
  pub lokasi:    Option<i16>,
  pub slots:     Vec<SlotOption>,
}

/// `GET /permohonan/{kind}`: profile prefill, locations and bookable slots.
pub async fn form<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: CitizenActor,
  Extension(CsrfToken(csrf)): Extension<CsrfToken>,
  Query(query): Query<FormQuery>,
  kind: ApplicationKind,
) -> Result<Response> {
  let profile = state
    .store
    .citizen_profile(&actor.nik)
    .await
    .map_err(Error::from_store)?
    .ok_or(Error::not_found("Penduduk tidak ditemukan"))?;

  let office = state.config.district_office_name.as_str();
  let mut locations = vec![Location { id: 0, label: office.to_owned() }];
  locations.extend(
    state
      .store
      .list_kelurahan()
      .await
      .map_err(Error::from_store)?
      .into_iter()
      .map(|k| Location { id: k.kelurahan_id, label: k.name }),
  );

  let bookable = BookableQuery::window(today(), SlotLocation::from_param(query.lokasi));
  let slots = state
    .store
    .bookable_slots(&bookable)
    .await
    .map_err(Error::from_store)?
    .into_iter()
    .map(|slot| SlotOption {
      slot_id:    slot.slot_id,
      date:       slot.date,
      start_time: slot.start_time,
      end_time:   slot.end_time,
      location:   slot.location(office).to_owned(),
      remaining:  slot.remaining(),
      label:      slot.label(office),
    })
    .collect();

  Ok(form_page("application_form", csrf, ApplicationForm {
    kind,
    title: kind.label(),
    documents: kind.required_documents().iter().map(|d| d.field_name()).collect(),
    profile,
    locations,
    lokasi: query.lokasi,
    slots,
  })
  .into_response())
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// Multipart body split into text fields and uploaded files.
#[derive(Debug, Default)]
struct Submission {
  fields: HashMap<String, String>,
  files:  HashMap<String, UploadedFile>,
}

impl Submission {
  async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
    let mut submission = Self::default();
    while let Some(field) = multipart.next_field().await? {
      let Some(name) = field.name().map(str::to_owned) else {
        continue;
      };
      match field.file_name().map(str::to_owned) {
        Some(file_name) => {
          let bytes = field.bytes().await?;
          if !file_name.is_empty() && !bytes.is_empty() {
            submission.files.insert(name, UploadedFile { file_name, bytes });
          }
        }
        None => {
          let text = field.text().await?;
          submission.fields.insert(name, text.trim().to_owned());
        }
      }
    }
    Ok(submission)
  }

  fn text(&self, name: &str) -> Option<&str> {
    self.fields.get(name).map(String::as_str).filter(|v| !v.is_empty())
  }
}

fn missing_file_message(kind: DocumentKind) -> &'static str {
  match kind {
    DocumentKind::Kk => "File Kartu Keluarga wajib diunggah",
    DocumentKind::SuratPolisi => "File Surat Keterangan Polisi wajib diunggah",
    DocumentKind::KtpRusak => "Foto KTP rusak wajib diunggah",
    DocumentKind::Ktp => "Foto KTP lama wajib diunggah",
  }
}

/// Kind-specific fields, with their validation messages.
fn details(
  kind: ApplicationKind,
  form: &Submission,
  errors: &mut FieldErrors,
) -> Option<ApplicationDetails> {
  let mut required = |field: &'static str, message: &str| -> Option<String> {
    let value = form.text(field).map(str::to_owned);
    if value.is_none() {
      errors.insert(field, message.to_owned());
    }
    value
  };

  match kind {
    ApplicationKind::Baru => Some(ApplicationDetails::New),
    ApplicationKind::Hilang => {
      let report = required("nomor_laporan", "Nomor laporan polisi wajib diisi");
      let date = required("tanggal_kejadian", "Tanggal kejadian wajib diisi");
      let incident_date = match date {
        Some(raw) => match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
          Ok(d) if d <= today() => Some(d),
          Ok(_) => {
            errors.insert("tanggal_kejadian", "Tanggal kejadian tidak boleh di masa depan".into());
            None
          }
          Err(_) => {
            errors.insert("tanggal_kejadian", "Format tanggal salah".into());
            None
          }
        },
        None => None,
      };
      Some(ApplicationDetails::Lost {
        police_report_number: report?,
        incident_date:        incident_date?,
      })
    }
    ApplicationKind::Rusak => Some(ApplicationDetails::Damaged {
      damage_description: required("deskripsi_kerusakan", "Deskripsi kerusakan wajib diisi")?,
    }),
    ApplicationKind::Update => Some(ApplicationDetails::DataChange {
      change_reason: required("alasan_perubahan", "Alasan perubahan wajib diisi")?,
    }),
  }
}

/// `POST /permohonan/{kind}`: validate, store the files, then book the slot
/// and create the application in one store transaction.
pub async fn submit<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: CitizenActor,
  multipart: Multipart,
  kind: ApplicationKind,
) -> Result<Response> {
  let form = Submission::read(multipart).await.map_err(|e| {
    tracing::warn!(error = %e, "unreadable application form");
    let limit_mb = kind.body_limit() / (1024 * 1024);
    Error::general(format!(
      "Gagal memproses form. Pastikan file tidak lebih dari {limit_mb}MB."
    ))
  })?;

  let mut errors = FieldErrors::new();

  let slot_id = form
    .text("jadwal_sesi_id")
    .and_then(|raw| Uuid::parse_str(raw).ok());
  if slot_id.is_none() {
    errors.insert("jadwal_sesi_id", "Pilih jadwal kedatangan".into());
  }

  let details = details(kind, &form, &mut errors);

  let mut files = Vec::new();
  for &doc in kind.required_documents() {
    let field = doc.field_name();
    match form.files.get(field) {
      None => {
        errors.insert(field, missing_file_message(doc).into());
      }
      Some(file) => match file.validate() {
        Ok(ext) => files.push((doc, file, ext)),
        Err(e) => {
          errors.insert(field, e.to_string());
        }
      },
    }
  }

  let (Some(slot_id), Some(details)) = (slot_id, details) else {
    return Err(Error::Validation(errors));
  };
  if !errors.is_empty() {
    return Err(Error::Validation(errors));
  }

  let now = Utc::now();
  let mut saved: Vec<PathBuf> = Vec::with_capacity(files.len());
  let mut documents = Vec::with_capacity(files.len());
  for (doc, file, ext) in files {
    match upload::save(&state.config.upload_dir, &actor.nik, doc, file, &ext, now).await {
      Ok(path) => {
        documents.push(NewDocument { kind: doc, file_path: path.to_string_lossy().into_owned() });
        saved.push(path);
      }
      Err(e) => {
        upload::cleanup(&saved).await;
        return Err(Error::internal(e));
      }
    }
  }

  let created = state
    .store
    .create_application(NewApplication {
      nik: actor.nik.clone(),
      slot_id,
      details,
      documents,
      today: today(),
    })
    .await;

  let application = match created {
    Ok(application) => application,
    Err(e) => {
      upload::cleanup(&saved).await;
      return Err(if matches!(e.domain(), Some(simpel_core::Error::SlotNotFound(_))) {
        Error::field("jadwal_sesi_id", "Jadwal tidak ditemukan")
      } else {
        Error::from_store(e)
      });
    }
  };

  tracing::info!(
    application = %application.application_id,
    kind = kind.as_str(),
    queue = application.queue_number,
    "application submitted"
  );
  Ok(
    Redirect::to(&format!(
      "/permohonan/sukses?id={}&type={}",
      application.application_id,
      kind.slug()
    ))
    .into_response(),
  )
}

// ─── Confirmation ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
  pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Confirmation {
  pub application_id: Uuid,
  pub booking_code:   String,
  pub kind:           ApplicationKind,
  pub title:          &'static str,
  pub status:         ApplicationStatus,
  pub queue_number:   u32,
  pub slot:           String,
}

/// `GET /permohonan/sukses?id=<uuid>&type=<slug>`. Only the owner may view.
pub async fn success<S: PortalStore>(
  State(state): State<AppState<S>>,
  actor: CitizenActor,
  Query(query): Query<SuccessQuery>,
) -> Result<Response> {
  let missing = || Error::not_found("Permohonan tidak ditemukan");
  let id = query
    .id
    .as_deref()
    .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    .ok_or_else(missing)?;

  let detail = state
    .store
    .citizen_application(&actor.nik, id)
    .await
    .map_err(Error::from_store)?
    .ok_or_else(missing)?;

  let app = detail.application;
  Ok(page("application_success", Confirmation {
    application_id: app.application_id,
    booking_code:   app.booking_code,
    kind:           app.kind,
    title:          app.kind.label(),
    status:         app.status,
    queue_number:   app.queue_number,
    slot:           detail.slot.label(&state.config.district_office_name),
  })
  .into_response())
}
