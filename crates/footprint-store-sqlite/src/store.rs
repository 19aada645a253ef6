//! [`SqliteStore`]: the SQLite implementation of [`FootprintStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use footprint_core::{
  category::{Scope, Unit},
  company::{CompanyProfile, NewCompanyProfile},
  entry::{ActivityEntry, NewEntry},
  facility::{Facility, MonthlyFacilityRecord, NewFacilityRecord},
  store::{FacilityFilter, FootprintStore, RecordQuery},
};

use crate::{
  encode::{
    ENTRY_COLUMNS, FACILITY_COLUMNS, RECORD_COLUMNS, RawEntry, RawFacility, RawProfile, RawRecord, decode_uuid,
    encode_decimal, encode_dt, encode_month, encode_source, encode_uuid,
  },
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A footprint store backed by a single SQLite file.
///
/// Clones share one connection thread.
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

  /// Build the row for `input` without writing it.
  fn materialise(input: NewEntry) -> ActivityEntry {
    ActivityEntry {
      entry_id:       Uuid::new_v4(),
      company_id:     input.company_id,
      facility_id:    input.facility_id,
      scope:          input.scope(),
      category:       input.category,
      value:          input.value,
      unit:           input.unit,
      is_renewable:   input.is_renewable,
      source:         input.source,
      month:          input.month,
      recorded_at:    Utc::now(),
      last_sync_date: input.last_sync_date,
    }
  }

  /// Insert `entry`. With `skip_on_conflict`, a unique-index collision
  /// leaves the table untouched and yields `false`.
  async fn insert_entry(&self, entry: &ActivityEntry, skip_on_conflict: bool) -> Result<bool> {
    let entry_id_str    = encode_uuid(entry.entry_id);
    let company_id_str  = encode_uuid(entry.company_id);
    let facility_id_str = entry.facility_id.map(encode_uuid);
    let scope           = entry.scope.number();
    let category        = entry.category.key();
    let value_str       = encode_decimal(entry.value);
    let unit_str        = entry.unit.to_string();
    let is_renewable    = entry.is_renewable;
    let source          = encode_source(entry.source);
    let month_str       = entry.month.map(encode_month);
    let recorded_at_str = encode_dt(entry.recorded_at);
    let synced_str      = entry.last_sync_date.map(encode_dt);

    let sql = if skip_on_conflict {
      "INSERT INTO activity_entries (
         entry_id, company_id, facility_id, scope, category, value, unit,
         is_renewable, source, month, recorded_at, last_sync_date
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
       ON CONFLICT DO NOTHING"
    } else {
      "INSERT INTO activity_entries (
         entry_id, company_id, facility_id, scope, category, value, unit,
         is_renewable, source, month, recorded_at, last_sync_date
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    };

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          sql,
          rusqlite::params![
            entry_id_str,
            company_id_str,
            facility_id_str,
            scope,
            category,
            value_str,
            unit_str,
            is_renewable,
            source,
            month_str,
            recorded_at_str,
            synced_str,
          ],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }
}

// ─── FootprintStore impl ─────────────────────────────────────────────────────

impl FootprintStore for SqliteStore {
  type Error = crate::Error;

  // ── Activity entries ──────────────────────────────────────────────────────

  async fn record_entry(&self, input: NewEntry) -> Result<ActivityEntry> {
    let entry = Self::materialise(input);
    self.insert_entry(&entry, false).await?;
    Ok(entry)
  }

  async fn record_automated_entry(&self, input: NewEntry) -> Result<Option<ActivityEntry>> {
    let entry = Self::materialise(input);
    let inserted = self.insert_entry(&entry, true).await?;
    if !inserted {
      debug!(company_id = %entry.company_id, category = %entry.category, "automated entry conflict, insert skipped");
    }
    Ok(inserted.then_some(entry))
  }

  async fn replace_automated_value(
    &self,
    entry_id: Uuid,
    value: Decimal,
    unit: Unit,
    synced_at: DateTime<Utc>,
  ) -> Result<Option<ActivityEntry>> {
    let id_str     = encode_uuid(entry_id);
    let value_str  = encode_decimal(value);
    let unit_str   = unit.to_string();
    let synced_str = encode_dt(synced_at);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE activity_entries
           SET value = ?2, unit = ?3, last_sync_date = ?4
           WHERE entry_id = ?1 AND source = 'automated_from_operations'",
          rusqlite::params![id_str, value_str, unit_str, synced_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_entry(entry_id).await
  }

  async fn get_entry(&self, entry_id: Uuid) -> Result<Option<ActivityEntry>> {
    let id_str = encode_uuid(entry_id);

    let raw: Option<RawEntry> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM activity_entries WHERE entry_id = ?1"),
            rusqlite::params![id_str],
            RawEntry::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawEntry::into_entry).transpose()
  }

  async fn list_entries(
    &self,
    company_id: Uuid,
    scope: Option<Scope>,
  ) -> Result<Vec<ActivityEntry>> {
    let company_id_str = encode_uuid(company_id);
    let scope_num      = scope.map(Scope::number);

    let raws: Vec<RawEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ENTRY_COLUMNS} FROM activity_entries
           WHERE company_id = ?1 AND (?2 IS NULL OR scope = ?2)
           ORDER BY recorded_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![company_id_str, scope_num], RawEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }

  async fn delete_entry(&self, entry_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(entry_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM activity_entries WHERE entry_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Facilities ────────────────────────────────────────────────────────────

  async fn add_facility(&self, company_id: Uuid, name: String) -> Result<Facility> {
    let facility = Facility {
      facility_id: Uuid::new_v4(),
      company_id,
      name,
      created_at: Utc::now(),
    };

    let id_str      = encode_uuid(facility.facility_id);
    let company_str = encode_uuid(company_id);
    let name        = facility.name.clone();
    let at_str      = encode_dt(facility.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO facilities (facility_id, company_id, name, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, company_str, name, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(facility)
  }

  async fn list_facilities(&self, company_id: Uuid) -> Result<Vec<Facility>> {
    let company_str = encode_uuid(company_id);

    let raws: Vec<RawFacility> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FACILITY_COLUMNS} FROM facilities
           WHERE company_id = ?1 ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![company_str], RawFacility::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFacility::into_facility).collect()
  }

  async fn get_facility(&self, facility_id: Uuid) -> Result<Option<Facility>> {
    let id_str = encode_uuid(facility_id);

    let raw: Option<RawFacility> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {FACILITY_COLUMNS} FROM facilities WHERE facility_id = ?1"),
            rusqlite::params![id_str],
            RawFacility::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawFacility::into_facility).transpose()
  }

  // ── Monthly facility records ──────────────────────────────────────────────

  async fn upsert_facility_record(&self, input: NewFacilityRecord) -> Result<MonthlyFacilityRecord> {
    let company_str  = encode_uuid(input.company_id);
    let facility_str = input.facility_id.map(encode_uuid);
    let month_str    = encode_month(input.month);
    let readings     = &input.readings;
    let electricity  = readings.electricity_kwh.map(encode_decimal);
    let gas          = readings.natural_gas_m3.map(encode_decimal);
    let water        = readings.water_m3.map(encode_decimal);
    let production   = readings.production_volume.map(encode_decimal);
    let updated_at   = Utc::now();
    let updated_str  = encode_dt(updated_at);
    let fresh_id     = Uuid::new_v4();
    let fresh_id_str = encode_uuid(fresh_id);

    // Select-then-write inside one transaction; `IS` matches NULL facilities.
    let existing: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing: Option<String> = tx
          .query_row(
            "SELECT record_id FROM monthly_facility_records
             WHERE company_id = ?1 AND facility_id IS ?2 AND month = ?3",
            rusqlite::params![company_str, facility_str, month_str],
            |r| r.get(0),
          )
          .optional()?;

        match &existing {
          Some(record_id) => {
            tx.execute(
              "UPDATE monthly_facility_records
               SET electricity_kwh = ?2, natural_gas_m3 = ?3, water_m3 = ?4,
                   production_volume = ?5, updated_at = ?6
               WHERE record_id = ?1",
              rusqlite::params![record_id, electricity, gas, water, production, updated_str],
            )?;
          }
          None => {
            tx.execute(
              "INSERT INTO monthly_facility_records (
                 record_id, company_id, facility_id, month, electricity_kwh,
                 natural_gas_m3, water_m3, production_volume, updated_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
              rusqlite::params![
                fresh_id_str,
                company_str,
                facility_str,
                month_str,
                electricity,
                gas,
                water,
                production,
                updated_str,
              ],
            )?;
          }
        }
        tx.commit()?;
        Ok(existing)
      })
      .await?;

    let record_id = match existing {
      Some(id) => decode_uuid(&id)?,
      None => fresh_id,
    };

    Ok(MonthlyFacilityRecord {
      record_id,
      company_id: input.company_id,
      facility_id: input.facility_id,
      month: input.month,
      readings: input.readings,
      updated_at,
    })
  }

  async fn list_facility_records(&self, query: RecordQuery) -> Result<Vec<MonthlyFacilityRecord>> {
    let company_str = encode_uuid(query.company_id);
    let (filter, facility_str) = match query.facility {
      FacilityFilter::All => ("all", None),
      FacilityFilter::CompanyWide => ("company", None),
      FacilityFilter::Facility(id) => ("facility", Some(encode_uuid(id))),
    };
    let from_str = query.from.map(encode_month);
    let to_str   = query.to.map(encode_month);

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM monthly_facility_records
           WHERE company_id = ?1
             AND (?2 = 'all'
                  OR (?2 = 'company' AND facility_id IS NULL)
                  OR (?2 = 'facility' AND facility_id = ?3))
             AND (?4 IS NULL OR month >= ?4)
             AND (?5 IS NULL OR month <= ?5)
           ORDER BY month, rowid"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![company_str, filter, facility_str, from_str, to_str],
            RawRecord::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  // ── Company profiles ──────────────────────────────────────────────────────

  async fn put_profile(&self, company_id: Uuid, input: NewCompanyProfile) -> Result<CompanyProfile> {
    let profile = CompanyProfile {
      company_id,
      industry: input.industry,
      employee_count: input.employee_count,
      annual_revenue: input.annual_revenue,
      updated_at: Utc::now(),
    };

    let id_str       = encode_uuid(company_id);
    let industry_str = profile.industry.to_string();
    let employees    = profile.employee_count;
    let revenue_str  = profile.annual_revenue.map(encode_decimal);
    let at_str       = encode_dt(profile.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO company_profiles (company_id, industry, employee_count, annual_revenue, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(company_id) DO UPDATE SET
             industry       = excluded.industry,
             employee_count = excluded.employee_count,
             annual_revenue = excluded.annual_revenue,
             updated_at     = excluded.updated_at",
          rusqlite::params![id_str, industry_str, employees, revenue_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(profile)
  }

  async fn get_profile(&self, company_id: Uuid) -> Result<Option<CompanyProfile>> {
    let id_str = encode_uuid(company_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT company_id, industry, employee_count, annual_revenue, updated_at
             FROM company_profiles WHERE company_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawProfile {
                company_id:     row.get(0)?,
                industry:       row.get(1)?,
                employee_count: row.get(2)?,
                annual_revenue: row.get(3)?,
                updated_at:     row.get(4)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }
}
