//! SQL schema for the SIMPEL-KTP SQLite store.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS kelurahan (
    kelurahan_id INTEGER PRIMARY KEY,
    name         TEXT NOT NULL,
    area_code    TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS citizens (
    nik           TEXT PRIMARY KEY,          -- 16 digits, never updated
    full_name     TEXT NOT NULL,
    sex           TEXT NOT NULL,             -- 'LAKI_LAKI' | 'PEREMPUAN'
    address       TEXT,
    phone         TEXT,
    email         TEXT UNIQUE,
    kelurahan_id  INTEGER REFERENCES kelurahan(kelurahan_id),
    password_hash TEXT,                      -- NULL blocks login
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS officers (
    officer_id    TEXT PRIMARY KEY,
    nip           TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,             -- 'ADMIN_KECAMATAN' | 'ADMIN_KELURAHAN'
    kelurahan_id  INTEGER REFERENCES kelurahan(kelurahan_id)
);

-- kelurahan_id NULL is the district office.
CREATE TABLE IF NOT EXISTS slots (
    slot_id        TEXT PRIMARY KEY,
    date           TEXT NOT NULL,            -- YYYY-MM-DD
    start_time     TEXT NOT NULL,            -- HH:MM
    end_time       TEXT NOT NULL,
    kelurahan_id   INTEGER REFERENCES kelurahan(kelurahan_id),
    max_quota      INTEGER NOT NULL CHECK (max_quota > 0),
    filled_quota   INTEGER NOT NULL DEFAULT 0,
    session_status TEXT NOT NULL DEFAULT 'BUKA',
    CHECK (filled_quota BETWEEN 0 AND max_quota),
    CHECK (end_time > start_time)
);

CREATE UNIQUE INDEX IF NOT EXISTS slots_session_idx
    ON slots(date, start_time, COALESCE(kelurahan_id, 0));

CREATE TABLE IF NOT EXISTS applications (
    application_id TEXT PRIMARY KEY,
    booking_code   TEXT NOT NULL UNIQUE,
    nik            TEXT NOT NULL REFERENCES citizens(nik),
    slot_id        TEXT NOT NULL REFERENCES slots(slot_id),
    kind           TEXT NOT NULL,
    details        TEXT NOT NULL,            -- JSON ApplicationDetails
    status         TEXT NOT NULL,
    queue_number   INTEGER NOT NULL,
    created_at     TEXT NOT NULL,
    UNIQUE (slot_id, queue_number)
);

-- Append-only.
CREATE TABLE IF NOT EXISTS status_history (
    history_id     TEXT PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(application_id),
    status         TEXT NOT NULL,
    note           TEXT,
    officer_id     TEXT REFERENCES officers(officer_id),
    changed_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    document_id    TEXT PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(application_id),
    kind           TEXT NOT NULL,
    file_path      TEXT NOT NULL,
    uploaded_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS applications_nik_idx    ON applications(nik);
CREATE INDEX IF NOT EXISTS applications_slot_idx   ON applications(slot_id);
CREATE INDEX IF NOT EXISTS applications_status_idx ON applications(status);
CREATE INDEX IF NOT EXISTS slots_date_idx          ON slots(date);
CREATE INDEX IF NOT EXISTS history_app_idx         ON status_history(application_id);
CREATE INDEX IF NOT EXISTS documents_app_idx       ON documents(application_id);

PRAGMA user_version = 1;
";
