//! The `PortalStore` trait.
//!
//! Implemented by storage backends (e.g. `simpel-store-sqlite`). The web
//! layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  application::{
    Application, ApplicationDetail, ApplicationQuery, ApplicationSummary,
    NewApplication, QueueEntry, StatusUpdate,
  },
  citizen::{Citizen, CitizenProfile, CitizenQuery, CitizenStats, NewCitizen, Nik},
  history::StatusHistoryEntry,
  kelurahan::{Kelurahan, NewKelurahan},
  officer::{NewOfficer, Officer},
  scope::Scope,
  slot::{BatchOutcome, BookableQuery, NewSlot, SessionStatus, Slot, SlotQuery},
  status::{ApplicationStatus, StatusCounts},
};

/// Backend errors that may wrap a domain outcome.
///
/// Lets callers tell a rule violation (slot full, not found, ...) apart from
/// an I/O failure without knowing the backend's error type.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&crate::Error>;
}

impl StoreError for crate::Error {
  fn domain(&self) -> Option<&crate::Error> { Some(self) }
}

/// Abstraction over a SIMPEL-KTP storage backend.
///
/// Every officer-facing read and write takes a [`Scope`] and applies it
/// inside the query. Operations that touch more than one row run in a single
/// transaction: either all of their effects persist or none do.
///
/// All methods return `Send` futures so the trait can be used behind `axum`.
pub trait PortalStore: Clone + Send + Sync + 'static {
  type Error: StoreError;

  // ── Kelurahan ─────────────────────────────────────────────────────────

  fn add_kelurahan(
    &self,
    input: NewKelurahan,
  ) -> impl Future<Output = Result<Kelurahan, Self::Error>> + Send + '_;

  /// All kelurahan ordered by name.
  fn list_kelurahan(
    &self,
  ) -> impl Future<Output = Result<Vec<Kelurahan>, Self::Error>> + Send + '_;

  fn get_kelurahan(
    &self,
    kelurahan_id: i16,
  ) -> impl Future<Output = Result<Option<Kelurahan>, Self::Error>> + Send + '_;

  fn kelurahan_by_code<'a>(
    &'a self,
    area_code: &'a str,
  ) -> impl Future<Output = Result<Option<Kelurahan>, Self::Error>> + Send + 'a;

  // ── Citizens ──────────────────────────────────────────────────────────

  /// Fails with [`crate::Error::NikAlreadyRegistered`] or
  /// [`crate::Error::EmailAlreadyRegistered`] on duplicates.
  fn register_citizen(
    &self,
    input: NewCitizen,
  ) -> impl Future<Output = Result<Citizen, Self::Error>> + Send + '_;

  fn get_citizen<'a>(
    &'a self,
    nik: &'a Nik,
  ) -> impl Future<Output = Result<Option<Citizen>, Self::Error>> + Send + 'a;

  fn citizen_profile<'a>(
    &'a self,
    nik: &'a Nik,
  ) -> impl Future<Output = Result<Option<CitizenProfile>, Self::Error>> + Send + 'a;

  /// Citizens whose home kelurahan lies in the query scope.
  fn list_citizens<'a>(
    &'a self,
    query: &'a CitizenQuery,
  ) -> impl Future<Output = Result<Vec<CitizenProfile>, Self::Error>> + Send + 'a;

  fn citizen_stats(
    &self,
    scope: Scope,
  ) -> impl Future<Output = Result<CitizenStats, Self::Error>> + Send + '_;

  // ── Officers ──────────────────────────────────────────────────────────

  fn add_officer(
    &self,
    input: NewOfficer,
  ) -> impl Future<Output = Result<Officer, Self::Error>> + Send + '_;

  fn officer_by_nip<'a>(
    &'a self,
    nip: &'a str,
  ) -> impl Future<Output = Result<Option<Officer>, Self::Error>> + Send + 'a;

  fn get_officer(
    &self,
    officer_id: Uuid,
  ) -> impl Future<Output = Result<Option<Officer>, Self::Error>> + Send + '_;

  // ── Slots ─────────────────────────────────────────────────────────────

  /// Fails with [`crate::Error::DuplicateSlot`] when a slot already exists
  /// at the same date, start time and location.
  fn add_slot(
    &self,
    input: NewSlot,
  ) -> impl Future<Output = Result<Slot, Self::Error>> + Send + '_;

  /// Insert every slot in `plan`, skipping duplicates, in one transaction.
  fn generate_slots(
    &self,
    plan: Vec<NewSlot>,
  ) -> impl Future<Output = Result<BatchOutcome, Self::Error>> + Send + '_;

  fn get_slot(
    &self,
    slot_id: Uuid,
    scope: Scope,
  ) -> impl Future<Output = Result<Option<Slot>, Self::Error>> + Send + '_;

  /// All slots in a date range regardless of status, for officer calendars.
  fn list_slots<'a>(
    &'a self,
    query: &'a SlotQuery,
  ) -> impl Future<Output = Result<Vec<Slot>, Self::Error>> + Send + 'a;

  /// Open slots with remaining capacity, ordered by date and start time.
  fn bookable_slots<'a>(
    &'a self,
    query: &'a BookableQuery,
  ) -> impl Future<Output = Result<Vec<Slot>, Self::Error>> + Send + 'a;

  /// Fails with [`crate::Error::SlotNotFound`] when the slot is missing or
  /// out of scope.
  fn set_slot_status(
    &self,
    slot_id: Uuid,
    status: SessionStatus,
    scope: Scope,
  ) -> impl Future<Output = Result<Slot, Self::Error>> + Send + '_;

  /// Applications booked into a slot, by queue number.
  fn slot_queue(
    &self,
    slot_id: Uuid,
    scope: Scope,
  ) -> impl Future<Output = Result<Vec<QueueEntry>, Self::Error>> + Send + '_;

  // ── Applications ──────────────────────────────────────────────────────

  /// Book a seat and create the application with its documents and initial
  /// history entry.
  ///
  /// Fails with [`crate::Error::ActiveApplicationExists`] if the citizen
  /// already has one in progress, and [`crate::Error::SlotUnavailable`] if
  /// the slot is full, closed or in the past. Nothing is written on failure.
  fn create_application(
    &self,
    input: NewApplication,
  ) -> impl Future<Output = Result<Application, Self::Error>> + Send + '_;

  /// Set the status and append a history entry atomically.
  ///
  /// Fails with [`crate::Error::ApplicationNotFound`] when the application
  /// is missing or out of scope.
  fn update_status(
    &self,
    update: StatusUpdate,
  ) -> impl Future<Output = Result<StatusHistoryEntry, Self::Error>> + Send + '_;

  fn application_detail(
    &self,
    application_id: Uuid,
    scope: Scope,
  ) -> impl Future<Output = Result<Option<ApplicationDetail>, Self::Error>> + Send + '_;

  fn application_status(
    &self,
    application_id: Uuid,
    scope: Scope,
  ) -> impl Future<Output = Result<Option<ApplicationStatus>, Self::Error>> + Send + '_;

  /// Newest first.
  fn list_applications<'a>(
    &'a self,
    query: &'a ApplicationQuery,
  ) -> impl Future<Output = Result<Vec<ApplicationSummary>, Self::Error>> + Send + 'a;

  /// Row count of `query` ignoring its limit and offset.
  fn count_applications<'a>(
    &'a self,
    query: &'a ApplicationQuery,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  fn status_counts(
    &self,
    scope: Scope,
  ) -> impl Future<Output = Result<StatusCounts, Self::Error>> + Send + '_;

  // ── Citizen-owned reads ───────────────────────────────────────────────

  fn citizen_status_counts<'a>(
    &'a self,
    nik: &'a Nik,
  ) -> impl Future<Output = Result<StatusCounts, Self::Error>> + Send + 'a;

  /// Newest first.
  fn citizen_applications<'a>(
    &'a self,
    nik: &'a Nik,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ApplicationSummary>, Self::Error>> + Send + 'a;

  /// `None` unless the application belongs to `nik`.
  fn citizen_application<'a>(
    &'a self,
    nik: &'a Nik,
    application_id: Uuid,
  ) -> impl Future<Output = Result<Option<ApplicationDetail>, Self::Error>> + Send + 'a;

  /// `None` unless the application belongs to `nik`.
  fn citizen_application_by_code<'a>(
    &'a self,
    nik: &'a Nik,
    booking_code: &'a str,
  ) -> impl Future<Output = Result<Option<ApplicationDetail>, Self::Error>> + Send + 'a;
}
