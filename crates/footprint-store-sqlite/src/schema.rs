//! SQL schema for the footprint SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS activity_entries (
    entry_id        TEXT PRIMARY KEY,
    company_id      TEXT NOT NULL,
    facility_id     TEXT,
    scope           INTEGER NOT NULL CHECK (scope IN (1, 2, 3)),
    category        TEXT NOT NULL,   -- category wire key
    value           TEXT NOT NULL,   -- decimal string, never negative
    unit            TEXT NOT NULL,
    is_renewable    INTEGER NOT NULL DEFAULT 0,
    source          TEXT NOT NULL DEFAULT 'manual',
    month           TEXT,            -- YYYY-MM-01
    recorded_at     TEXT NOT NULL,   -- RFC 3339 UTC; server-assigned
    last_sync_date  TEXT
);

-- At most one automated entry per (company, scope, category). Sync relies on
-- this for insert-or-skip.
CREATE UNIQUE INDEX IF NOT EXISTS entries_automated_key
    ON activity_entries(company_id, scope, category)
    WHERE source = 'automated_from_operations';

CREATE INDEX IF NOT EXISTS entries_company_idx ON activity_entries(company_id, scope);

CREATE TABLE IF NOT EXISTS facilities (
    facility_id TEXT PRIMARY KEY,
    company_id  TEXT NOT NULL,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS facilities_company_idx ON facilities(company_id);

-- Upserted, never deleted. A NULL facility_id is a company-wide record.
CREATE TABLE IF NOT EXISTS monthly_facility_records (
    record_id         TEXT PRIMARY KEY,
    company_id        TEXT NOT NULL,
    facility_id       TEXT,
    month             TEXT NOT NULL,   -- YYYY-MM-01
    electricity_kwh   TEXT,
    natural_gas_m3    TEXT,
    water_m3          TEXT,
    production_volume TEXT,
    updated_at        TEXT NOT NULL
);

-- NULLs are distinct in a plain UNIQUE constraint, hence the COALESCE.
CREATE UNIQUE INDEX IF NOT EXISTS records_key
    ON monthly_facility_records(company_id, COALESCE(facility_id, ''), month);

CREATE TABLE IF NOT EXISTS company_profiles (
    company_id     TEXT PRIMARY KEY,
    industry       TEXT NOT NULL DEFAULT 'other',
    employee_count INTEGER,
    annual_revenue TEXT,
    updated_at     TEXT NOT NULL
);

PRAGMA user_version = 1;
";
