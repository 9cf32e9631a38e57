//! [`SqliteStore`], the SQLite implementation of [`PortalStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use simpel_core::{
  application::{
    Application, ApplicationDetail, ApplicationQuery, ApplicationSummary,
    NewApplication, QueueEntry, StatusUpdate, booking_code,
  },
  citizen::{Citizen, CitizenProfile, CitizenQuery, CitizenStats, NewCitizen, Nik},
  history::StatusHistoryEntry,
  kelurahan::{Kelurahan, NewKelurahan},
  officer::{NewOfficer, Officer},
  scope::Scope,
  slot::{
    BatchOutcome, BookableQuery, NewSlot, SessionStatus, Slot, SlotLocation,
    SlotQuery,
  },
  status::{ApplicationStatus, StatusCounts},
  store::PortalStore,
};

use crate::{
  Result,
  encode::{
    APPLICATION_SELECT, CITIZEN_COLUMNS, DOCUMENT_COLUMNS, HISTORY_SELECT,
    KELURAHAN_COLUMNS, OFFICER_COLUMNS, PROFILE_SELECT, RawApplication,
    RawCitizen, RawDetail, RawDocument, RawHistory, RawOfficer, RawProfile,
    RawQueueEntry, RawSlot, RawSummary, SLOT_SELECT, SUMMARY_FROM,
    SUMMARY_SELECT, active_status_list, encode_date, encode_details, encode_dt,
    encode_time, encode_uuid, kelurahan_from_row,
  },
  error::Error,
  schema::SCHEMA,
};

/// Closure result that may carry a business-rule refusal. Returning the
/// inner `Err` from inside a transaction drops it uncommitted.
type Checked<T> = tokio_rusqlite::Result<simpel_core::Result<T>>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// The portal database, backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection handle is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread, surfacing an inner domain refusal as
  /// [`Error::Domain`].
  async fn call_checked<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Checked<T> + Send + 'static,
  {
    Ok(self.conn.call(f).await??)
  }

  async fn summaries(&self, filter: SummaryFilter) -> Result<Vec<ApplicationSummary>> {
    let raws: Vec<RawSummary> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{SUMMARY_SELECT}
           WHERE {}
           ORDER BY a.created_at DESC, a.rowid DESC
           LIMIT ?5 OFFSET ?6",
          SummaryFilter::WHERE
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            params![
              filter.kelurahan_id,
              filter.status,
              filter.pattern,
              filter.nik,
              filter.limit,
              filter.offset,
            ],
            RawSummary::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSummary::into_summary).collect()
  }

  async fn counts(&self, filter: SummaryFilter) -> Result<StatusCounts> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT a.status, COUNT(*) {SUMMARY_FROM}
           WHERE {}
           GROUP BY a.status",
          SummaryFilter::WHERE
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            params![filter.kelurahan_id, filter.status, filter.pattern, filter.nik],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut counts = StatusCounts::default();
    for (status, n) in rows {
      let status = ApplicationStatus::parse(&status)
        .map_err(|e| Error::Corrupt(e.to_string()))?;
      counts.add(status, u64::try_from(n).unwrap_or(0));
    }
    Ok(counts)
  }

  /// Resolve an application id with `lookup`, then load its detail.
  async fn detail<F>(&self, lookup: F) -> Result<Option<ApplicationDetail>>
  where
    F: FnOnce(&Connection) -> rusqlite::Result<Option<String>> + Send + 'static,
  {
    let raw: Option<RawDetail> = self
      .conn
      .call(move |conn| {
        let Some(application_id) = lookup(conn)? else {
          return Ok(None);
        };
        Ok(read_detail(conn, &application_id)?)
      })
      .await?;

    raw.map(RawDetail::into_detail).transpose()
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

/// Bound filter over [`SUMMARY_SELECT`]. Every parameter is always bound;
/// `NULL` disables its clause.
struct SummaryFilter {
  kelurahan_id: Option<i16>,
  status:       Option<&'static str>,
  pattern:      Option<String>,
  nik:          Option<String>,
  limit:        i64,
  offset:       i64,
}

impl SummaryFilter {
  const WHERE: &'static str = "(?1 IS NULL OR s.kelurahan_id = ?1)
       AND (?2 IS NULL OR a.status = ?2)
       AND (?3 IS NULL OR a.nik LIKE ?3 OR c.full_name LIKE ?3
            OR a.booking_code LIKE ?3)
       AND (?4 IS NULL OR a.nik = ?4)";

  fn from_query(query: &ApplicationQuery) -> Self {
    Self {
      kelurahan_id: query.scope.kelurahan_id(),
      status:       query.status.map(ApplicationStatus::as_str),
      pattern:      like_pattern(query.search.as_deref()),
      nik:          None,
      limit:        sql_limit(query.limit),
      offset:       sql_offset(query.offset),
    }
  }

  fn citizen(nik: &Nik, limit: Option<usize>) -> Self {
    Self {
      kelurahan_id: None,
      status:       None,
      pattern:      None,
      nik:          Some(nik.as_str().to_owned()),
      limit:        sql_limit(limit),
      offset:       0,
    }
  }
}

/// `%term%` for a non-blank search term.
fn like_pattern(search: Option<&str>) -> Option<String> {
  search
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| format!("%{s}%"))
}

/// SQLite treats a negative limit as unbounded.
fn sql_limit(limit: Option<usize>) -> i64 {
  limit.map(|n| i64::try_from(n).unwrap_or(i64::MAX)).unwrap_or(-1)
}

/// Offsets past `i64::MAX` clamp there; a negative offset would read as zero.
fn sql_offset(offset: Option<usize>) -> i64 {
  offset.map(|n| i64::try_from(n).unwrap_or(i64::MAX)).unwrap_or(0)
}

fn exists(conn: &Connection, sql: &str, param: &dyn rusqlite::ToSql) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, params![param], |_| Ok(())).optional()?.is_some())
}

fn read_slot(conn: &Connection, slot_id: &str) -> rusqlite::Result<RawSlot> {
  conn.query_row(
    &format!("{SLOT_SELECT} WHERE s.slot_id = ?1"),
    params![slot_id],
    RawSlot::from_row,
  )
}

fn read_detail(conn: &Connection, application_id: &str) -> rusqlite::Result<Option<RawDetail>> {
  let Some(application) = conn
    .query_row(
      &format!("{APPLICATION_SELECT} WHERE a.application_id = ?1"),
      params![application_id],
      RawApplication::from_row,
    )
    .optional()?
  else {
    return Ok(None);
  };

  let citizen = conn.query_row(
    &format!("{PROFILE_SELECT} WHERE c.nik = ?1"),
    params![application.nik],
    RawProfile::from_row,
  )?;

  let slot = read_slot(conn, &application.slot_id)?;

  let history = conn
    .prepare(&format!(
      "{HISTORY_SELECT} WHERE h.application_id = ?1 ORDER BY h.changed_at, h.rowid"
    ))?
    .query_map(params![application_id], RawHistory::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let documents = conn
    .prepare(&format!(
      "SELECT {DOCUMENT_COLUMNS} FROM documents
       WHERE application_id = ?1 ORDER BY uploaded_at, rowid"
    ))?
    .query_map(params![application_id], RawDocument::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some(RawDetail { application, citizen, slot, history, documents }))
}

// ─── PortalStore impl ────────────────────────────────────────────────────────

impl PortalStore for SqliteStore {
  type Error = Error;

  // ── Kelurahan ─────────────────────────────────────────────────────────────

  async fn add_kelurahan(&self, input: NewKelurahan) -> Result<Kelurahan> {
    let NewKelurahan { name, area_code } = input;
    let kelurahan = self
      .conn
      .call(move |conn| {
        let kelurahan_id: i16 = conn.query_row(
          "INSERT INTO kelurahan (name, area_code) VALUES (?1, ?2)
           RETURNING kelurahan_id",
          params![name, area_code],
          |row| row.get(0),
        )?;
        Ok(Kelurahan { kelurahan_id, name, area_code })
      })
      .await?;
    Ok(kelurahan)
  }

  async fn list_kelurahan(&self) -> Result<Vec<Kelurahan>> {
    let rows = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {KELURAHAN_COLUMNS} FROM kelurahan ORDER BY name"
        ))?;
        let rows = stmt
          .query_map([], kelurahan_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn get_kelurahan(&self, kelurahan_id: i16) -> Result<Option<Kelurahan>> {
    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {KELURAHAN_COLUMNS} FROM kelurahan WHERE kelurahan_id = ?1"),
              params![kelurahan_id],
              kelurahan_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  async fn kelurahan_by_code(&self, area_code: &str) -> Result<Option<Kelurahan>> {
    let area_code = area_code.to_owned();
    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {KELURAHAN_COLUMNS} FROM kelurahan WHERE area_code = ?1"),
              params![area_code],
              kelurahan_from_row,
            )
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  // ── Citizens ──────────────────────────────────────────────────────────────

  async fn register_citizen(&self, input: NewCitizen) -> Result<Citizen> {
    let citizen = Citizen {
      nik:           input.nik,
      full_name:     input.full_name,
      sex:           input.sex,
      address:       input.address,
      phone:         input.phone,
      email:         input.email,
      kelurahan_id:  input.kelurahan_id,
      password_hash: input.password_hash,
      created_at:    Utc::now(),
    };

    let nik = citizen.nik.as_str().to_owned();
    let full_name = citizen.full_name.clone();
    let sex = citizen.sex.as_str();
    let address = citizen.address.clone();
    let phone = citizen.phone.clone();
    let email = citizen.email.clone();
    let kelurahan_id = citizen.kelurahan_id;
    let password_hash = citizen.password_hash.clone();
    let created_at = encode_dt(citizen.created_at);

    self
      .call_checked(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if exists(&tx, "SELECT 1 FROM citizens WHERE nik = ?1", &nik)? {
          return Ok(Err(simpel_core::Error::NikAlreadyRegistered));
        }
        if let Some(email) = &email {
          if exists(&tx, "SELECT 1 FROM citizens WHERE email = ?1", email)? {
            return Ok(Err(simpel_core::Error::EmailAlreadyRegistered));
          }
        }
        if let Some(id) = kelurahan_id {
          if !exists(&tx, "SELECT 1 FROM kelurahan WHERE kelurahan_id = ?1", &id)? {
            return Ok(Err(simpel_core::Error::KelurahanNotFound(id)));
          }
        }

        tx.execute(
          &format!(
            "INSERT INTO citizens ({CITIZEN_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
          ),
          params![
            nik,
            full_name,
            sex,
            address,
            phone,
            email,
            kelurahan_id,
            password_hash,
            created_at,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    Ok(citizen)
  }

  async fn get_citizen(&self, nik: &Nik) -> Result<Option<Citizen>> {
    let nik = nik.as_str().to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CITIZEN_COLUMNS} FROM citizens WHERE nik = ?1"),
              params![nik],
              RawCitizen::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawCitizen::into_citizen).transpose()
  }

  async fn citizen_profile(&self, nik: &Nik) -> Result<Option<CitizenProfile>> {
    let nik = nik.as_str().to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{PROFILE_SELECT} WHERE c.nik = ?1"),
              params![nik],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_citizens(&self, query: &CitizenQuery) -> Result<Vec<CitizenProfile>> {
    let kelurahan_id = query.scope.kelurahan_id();
    let pattern = like_pattern(query.search.as_deref());
    let limit = sql_limit(query.limit);

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{PROFILE_SELECT}
           WHERE (?1 IS NULL OR c.kelurahan_id = ?1)
             AND (?2 IS NULL OR c.nik LIKE ?2 OR c.full_name LIKE ?2)
           ORDER BY c.full_name, c.nik
           LIMIT ?3"
        ))?;
        let rows = stmt
          .query_map(params![kelurahan_id, pattern, limit], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  async fn citizen_stats(&self, scope: Scope) -> Result<CitizenStats> {
    let kelurahan_id = scope.kelurahan_id();
    let (total, male, female): (i64, i64, i64) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*),
                  COALESCE(SUM(sex = 'LAKI_LAKI'), 0),
                  COALESCE(SUM(sex = 'PEREMPUAN'), 0)
           FROM citizens
           WHERE (?1 IS NULL OR kelurahan_id = ?1)",
          params![kelurahan_id],
          |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?)
      })
      .await?;

    let n = |v: i64| u64::try_from(v).unwrap_or(0);
    Ok(CitizenStats { total: n(total), male: n(male), female: n(female) })
  }

  // ── Officers ──────────────────────────────────────────────────────────────

  async fn add_officer(&self, input: NewOfficer) -> Result<Officer> {
    let officer = Officer {
      officer_id:    Uuid::new_v4(),
      role:          input.role(),
      nip:           input.nip,
      name:          input.name,
      username:      input.username,
      password_hash: input.password_hash,
      kelurahan_id:  input.kelurahan_id,
    };

    let id = encode_uuid(officer.officer_id);
    let nip = officer.nip.clone();
    let name = officer.name.clone();
    let username = officer.username.clone();
    let hash = officer.password_hash.clone();
    let role = officer.role.as_str();
    let kelurahan_id = officer.kelurahan_id;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO officers ({OFFICER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
          ),
          params![id, nip, name, username, hash, role, kelurahan_id],
        )?;
        Ok(())
      })
      .await?;

    Ok(officer)
  }

  async fn officer_by_nip(&self, nip: &str) -> Result<Option<Officer>> {
    let nip = nip.to_owned();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {OFFICER_COLUMNS} FROM officers WHERE nip = ?1"),
              params![nip],
              RawOfficer::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawOfficer::into_officer).transpose()
  }

  async fn get_officer(&self, officer_id: Uuid) -> Result<Option<Officer>> {
    let id = encode_uuid(officer_id);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {OFFICER_COLUMNS} FROM officers WHERE officer_id = ?1"),
              params![id],
              RawOfficer::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawOfficer::into_officer).transpose()
  }

  // ── Slots ─────────────────────────────────────────────────────────────────

  async fn add_slot(&self, input: NewSlot) -> Result<Slot> {
    let slot_id = encode_uuid(Uuid::new_v4());
    let date = encode_date(input.date);
    let start = encode_time(input.start_time);
    let end = encode_time(input.end_time);
    let kelurahan_id = input.kelurahan_id;
    let max_quota = input.max_quota;

    let raw = self
      .call_checked(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(id) = kelurahan_id {
          if !exists(&tx, "SELECT 1 FROM kelurahan WHERE kelurahan_id = ?1", &id)? {
            return Ok(Err(simpel_core::Error::KelurahanNotFound(id)));
          }
        }

        let inserted = tx.execute(
          "INSERT OR IGNORE INTO slots
             (slot_id, date, start_time, end_time, kelurahan_id, max_quota)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![slot_id, date, start, end, kelurahan_id, max_quota],
        )?;
        if inserted == 0 {
          return Ok(Err(simpel_core::Error::DuplicateSlot));
        }

        let raw = read_slot(&tx, &slot_id)?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    raw.into_slot()
  }

  async fn generate_slots(&self, plan: Vec<NewSlot>) -> Result<BatchOutcome> {
    let rows: Vec<_> = plan
      .into_iter()
      .map(|s| {
        (
          encode_uuid(Uuid::new_v4()),
          encode_date(s.date),
          encode_time(s.start_time),
          encode_time(s.end_time),
          s.kelurahan_id,
          s.max_quota,
        )
      })
      .collect();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut outcome = BatchOutcome::default();
        {
          let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO slots
               (slot_id, date, start_time, end_time, kelurahan_id, max_quota)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          )?;
          for (id, date, start, end, kelurahan_id, quota) in rows {
            match stmt.execute(params![id, date, start, end, kelurahan_id, quota])? {
              0 => outcome.skipped += 1,
              _ => outcome.created += 1,
            }
          }
        }
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    tracing::debug!(created = outcome.created, skipped = outcome.skipped, "slots generated");
    Ok(outcome)
  }

  async fn get_slot(&self, slot_id: Uuid, scope: Scope) -> Result<Option<Slot>> {
    let id = encode_uuid(slot_id);
    let kelurahan_id = scope.kelurahan_id();
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "{SLOT_SELECT}
                 WHERE s.slot_id = ?1 AND (?2 IS NULL OR s.kelurahan_id = ?2)"
              ),
              params![id, kelurahan_id],
              RawSlot::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSlot::into_slot).transpose()
  }

  async fn list_slots(&self, query: &SlotQuery) -> Result<Vec<Slot>> {
    let kelurahan_id = query.scope.kelurahan_id();
    let from = encode_date(query.from);
    let to = encode_date(query.to);

    let raws: Vec<RawSlot> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{SLOT_SELECT}
           WHERE s.date BETWEEN ?1 AND ?2
             AND (?3 IS NULL OR s.kelurahan_id = ?3)
           ORDER BY s.date, s.start_time, k.name"
        ))?;
        let rows = stmt
          .query_map(params![from, to, kelurahan_id], RawSlot::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSlot::into_slot).collect()
  }

  async fn bookable_slots(&self, query: &BookableQuery) -> Result<Vec<Slot>> {
    let (mode, kelurahan_id): (i64, Option<i16>) = match query.location {
      SlotLocation::Any => (0, None),
      SlotLocation::DistrictOffice => (1, None),
      SlotLocation::Kelurahan(id) => (2, Some(id)),
    };
    let from = encode_date(query.from);
    let to = encode_date(query.to);

    let raws: Vec<RawSlot> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{SLOT_SELECT}
           WHERE s.date BETWEEN ?1 AND ?2
             AND s.session_status = 'BUKA'
             AND s.filled_quota < s.max_quota
             AND (?3 = 0
                  OR (?3 = 1 AND s.kelurahan_id IS NULL)
                  OR (?3 = 2 AND s.kelurahan_id = ?4))
           ORDER BY s.date, s.start_time, k.name"
        ))?;
        let rows = stmt
          .query_map(params![from, to, mode, kelurahan_id], RawSlot::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSlot::into_slot).collect()
  }

  async fn set_slot_status(
    &self,
    slot_id: Uuid,
    status: SessionStatus,
    scope: Scope,
  ) -> Result<Slot> {
    let id = encode_uuid(slot_id);
    let kelurahan_id = scope.kelurahan_id();
    let status = status.as_str();

    let raw = self
      .call_checked(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        // A full slot stays full when reopened.
        let changed = tx.execute(
          "UPDATE slots
           SET session_status = CASE
                 WHEN ?1 = 'BUKA' AND filled_quota >= max_quota THEN 'PENUH'
                 ELSE ?1
               END
           WHERE slot_id = ?2 AND (?3 IS NULL OR kelurahan_id = ?3)",
          params![status, id, kelurahan_id],
        )?;
        if changed == 0 {
          return Ok(Err(simpel_core::Error::SlotNotFound(slot_id)));
        }
        let raw = read_slot(&tx, &id)?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    raw.into_slot()
  }

  async fn slot_queue(&self, slot_id: Uuid, scope: Scope) -> Result<Vec<QueueEntry>> {
    let id = encode_uuid(slot_id);
    let kelurahan_id = scope.kelurahan_id();

    let raws: Vec<RawQueueEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT a.queue_number, a.application_id, a.booking_code, a.nik,
                  c.full_name, a.kind, a.status
           FROM applications a
           JOIN citizens c ON c.nik = a.nik
           JOIN slots s ON s.slot_id = a.slot_id
           WHERE a.slot_id = ?1 AND (?2 IS NULL OR s.kelurahan_id = ?2)
           ORDER BY a.queue_number",
        )?;
        let rows = stmt
          .query_map(params![id, kelurahan_id], RawQueueEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQueueEntry::into_entry).collect()
  }

  // ── Applications ──────────────────────────────────────────────────────────

  async fn create_application(&self, input: NewApplication) -> Result<Application> {
    let application_id = Uuid::new_v4();
    let created_at = Utc::now();
    let kind = input.details.kind();
    let status = ApplicationStatus::Terdaftar;
    let code = booking_code(application_id);

    let app_id_str = encode_uuid(application_id);
    let nik_str = input.nik.as_str().to_owned();
    let slot_id = input.slot_id;
    let slot_id_str = encode_uuid(slot_id);
    let details_json = encode_details(&input.details)?;
    let today = encode_date(input.today);
    let at_str = encode_dt(created_at);
    let history_id = encode_uuid(Uuid::new_v4());
    let code_str = code.clone();
    let documents: Vec<_> = input
      .documents
      .iter()
      .map(|d| (encode_uuid(Uuid::new_v4()), d.kind.as_str(), d.file_path.clone()))
      .collect();

    let queue_number = self
      .call_checked(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !exists(&tx, "SELECT 1 FROM citizens WHERE nik = ?1", &nik_str)? {
          return Ok(Err(simpel_core::Error::CitizenNotFound(nik_str)));
        }

        let active: i64 = tx.query_row(
          &format!(
            "SELECT COUNT(*) FROM applications
             WHERE nik = ?1 AND status IN ({})",
            active_status_list()
          ),
          params![nik_str],
          |row| row.get(0),
        )?;
        if active > 0 {
          return Ok(Err(simpel_core::Error::ActiveApplicationExists));
        }

        // Check and take a seat in one statement. SET expressions see the
        // pre-update row.
        let taken = tx.execute(
          "UPDATE slots
           SET filled_quota   = filled_quota + 1,
               session_status = CASE
                 WHEN filled_quota + 1 >= max_quota THEN 'PENUH'
                 ELSE session_status
               END
           WHERE slot_id = ?1
             AND session_status = 'BUKA'
             AND filled_quota < max_quota
             AND date >= ?2",
          params![slot_id_str, today],
        )?;
        if taken == 0 {
          let known = exists(&tx, "SELECT 1 FROM slots WHERE slot_id = ?1", &slot_id_str)?;
          return Ok(Err(if known {
            simpel_core::Error::SlotUnavailable(slot_id)
          } else {
            simpel_core::Error::SlotNotFound(slot_id)
          }));
        }

        let queue_number: u32 = tx.query_row(
          "SELECT COALESCE(MAX(queue_number), 0) + 1 FROM applications WHERE slot_id = ?1",
          params![slot_id_str],
          |row| row.get(0),
        )?;

        tx.execute(
          "INSERT INTO applications (
             application_id, booking_code, nik, slot_id, kind, details,
             status, queue_number, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          params![
            app_id_str,
            code_str,
            nik_str,
            slot_id_str,
            kind.as_str(),
            details_json,
            status.as_str(),
            queue_number,
            at_str,
          ],
        )?;

        for (document_id, doc_kind, file_path) in documents {
          tx.execute(
            "INSERT INTO documents (document_id, application_id, kind, file_path, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![document_id, app_id_str, doc_kind, file_path, at_str],
          )?;
        }

        tx.execute(
          "INSERT INTO status_history (history_id, application_id, status, note, officer_id, changed_at)
           VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
          params![history_id, app_id_str, status.as_str(), "Permohonan diterima", at_str],
        )?;

        tx.commit()?;
        Ok(Ok(queue_number))
      })
      .await?;

    tracing::info!(
      application_id = %application_id,
      slot_id = %slot_id,
      queue_number,
      "application created"
    );

    Ok(Application {
      application_id,
      booking_code: code,
      nik: input.nik,
      slot_id,
      kind,
      details: input.details,
      status,
      queue_number,
      created_at,
    })
  }

  async fn update_status(&self, update: StatusUpdate) -> Result<StatusHistoryEntry> {
    let StatusUpdate { application_id, status, note, officer_id, scope } = update;
    let changed_at = Utc::now();
    let history_id = Uuid::new_v4();

    let app_id_str = encode_uuid(application_id);
    let officer_str = encode_uuid(officer_id);
    let history_str = encode_uuid(history_id);
    let at_str = encode_dt(changed_at);
    let kelurahan_id = scope.kelurahan_id();
    let note_param = note.clone();

    let officer_name = self
      .call_checked(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
          "UPDATE applications SET status = ?1
           WHERE application_id = ?2
             AND (?3 IS NULL OR slot_id IN
                  (SELECT slot_id FROM slots WHERE kelurahan_id = ?3))",
          params![status.as_str(), app_id_str, kelurahan_id],
        )?;
        if changed == 0 {
          return Ok(Err(simpel_core::Error::ApplicationNotFound(application_id)));
        }

        tx.execute(
          "INSERT INTO status_history (history_id, application_id, status, note, officer_id, changed_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![history_str, app_id_str, status.as_str(), note_param, officer_str, at_str],
        )?;

        let officer_name: Option<String> = tx
          .query_row(
            "SELECT name FROM officers WHERE officer_id = ?1",
            params![officer_str],
            |row| row.get(0),
          )
          .optional()?;

        tx.commit()?;
        Ok(Ok(officer_name))
      })
      .await?;

    tracing::info!(
      application_id = %application_id,
      officer_id = %officer_id,
      status = %status,
      "application status updated"
    );

    Ok(StatusHistoryEntry {
      history_id,
      application_id,
      status,
      note,
      officer_id: Some(officer_id),
      officer_name,
      changed_at,
    })
  }

  async fn application_detail(
    &self,
    application_id: Uuid,
    scope: Scope,
  ) -> Result<Option<ApplicationDetail>> {
    let id = encode_uuid(application_id);
    let kelurahan_id = scope.kelurahan_id();
    self
      .detail(move |conn| {
        conn
          .query_row(
            "SELECT a.application_id FROM applications a
             JOIN slots s ON s.slot_id = a.slot_id
             WHERE a.application_id = ?1 AND (?2 IS NULL OR s.kelurahan_id = ?2)",
            params![id, kelurahan_id],
            |row| row.get(0),
          )
          .optional()
      })
      .await
  }

  async fn application_status(
    &self,
    application_id: Uuid,
    scope: Scope,
  ) -> Result<Option<ApplicationStatus>> {
    let id = encode_uuid(application_id);
    let kelurahan_id = scope.kelurahan_id();
    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT a.status FROM applications a
               JOIN slots s ON s.slot_id = a.slot_id
               WHERE a.application_id = ?1 AND (?2 IS NULL OR s.kelurahan_id = ?2)",
              params![id, kelurahan_id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|s| ApplicationStatus::parse(&s).map_err(|e| Error::Corrupt(e.to_string())))
      .transpose()
  }

  async fn list_applications(
    &self,
    query: &ApplicationQuery,
  ) -> Result<Vec<ApplicationSummary>> {
    self.summaries(SummaryFilter::from_query(query)).await
  }

  async fn count_applications(&self, query: &ApplicationQuery) -> Result<u64> {
    Ok(self.counts(SummaryFilter::from_query(query)).await?.total)
  }

  async fn status_counts(&self, scope: Scope) -> Result<StatusCounts> {
    let query = ApplicationQuery {
      scope,
      search: None,
      status: None,
      limit: None,
      offset: None,
    };
    self.counts(SummaryFilter::from_query(&query)).await
  }

  // ── Citizen-owned reads ───────────────────────────────────────────────────

  async fn citizen_status_counts(&self, nik: &Nik) -> Result<StatusCounts> {
    self.counts(SummaryFilter::citizen(nik, None)).await
  }

  async fn citizen_applications(
    &self,
    nik: &Nik,
    limit: usize,
  ) -> Result<Vec<ApplicationSummary>> {
    self.summaries(SummaryFilter::citizen(nik, Some(limit))).await
  }

  async fn citizen_application(
    &self,
    nik: &Nik,
    application_id: Uuid,
  ) -> Result<Option<ApplicationDetail>> {
    let id = encode_uuid(application_id);
    let nik = nik.as_str().to_owned();
    self
      .detail(move |conn| {
        conn
          .query_row(
            "SELECT application_id FROM applications
             WHERE application_id = ?1 AND nik = ?2",
            params![id, nik],
            |row| row.get(0),
          )
          .optional()
      })
      .await
  }

  async fn citizen_application_by_code(
    &self,
    nik: &Nik,
    code: &str,
  ) -> Result<Option<ApplicationDetail>> {
    let code = code.trim().to_ascii_uppercase();
    let nik = nik.as_str().to_owned();
    self
      .detail(move |conn| {
        conn
          .query_row(
            "SELECT application_id FROM applications
             WHERE booking_code = ?1 AND nik = ?2",
            params![code, nik],
            |row| row.get(0),
          )
          .optional()
      })
      .await
  }
}
