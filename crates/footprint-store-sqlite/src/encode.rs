//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings and months are `YYYY-MM-01`. Decimals are
//! stored as their canonical string so no precision is lost to REAL columns.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveDate, Utc};
use footprint_core::{
  category::{Category, Scope, Unit},
  company::{CompanyProfile, Industry},
  entry::{ActivityEntry, EntrySource},
  facility::{Facility, MonthlyFacilityRecord, MonthlyReadings},
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Error, Result};

const MONTH_FORMAT: &str = "%Y-%m-%d";

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_month(d: NaiveDate) -> String { d.format(MONTH_FORMAT).to_string() }

pub fn decode_month(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, MONTH_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_decimal(d: Decimal) -> String { d.normalize().to_string() }

pub fn decode_decimal(s: &str) -> Result<Decimal> { Ok(Decimal::from_str(s)?) }

// ─── Domain enums ────────────────────────────────────────────────────────────

pub fn encode_source(s: EntrySource) -> &'static str {
  match s {
    EntrySource::Manual => "manual",
    EntrySource::AutomatedFromOperations => "automated_from_operations",
  }
}

pub fn decode_source(s: &str) -> Result<EntrySource> {
  match s {
    "manual" => Ok(EntrySource::Manual),
    "automated_from_operations" => Ok(EntrySource::AutomatedFromOperations),
    other => Err(Error::Decode { column: "source", value: other.to_owned() }),
  }
}

pub fn decode_scope(n: u8) -> Result<Scope> { Ok(Scope::try_from(n)?) }

pub fn decode_category(s: &str) -> Result<Category> {
  Category::from_key(s).ok_or_else(|| Error::Decode { column: "category", value: s.to_owned() })
}

pub fn decode_unit(s: &str) -> Result<Unit> {
  s.parse().map_err(|_| Error::Decode { column: "unit", value: s.to_owned() })
}

pub fn decode_industry(s: &str) -> Result<Industry> {
  s.parse().map_err(|_| Error::Decode { column: "industry", value: s.to_owned() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawEntry::from_row`].
pub const ENTRY_COLUMNS: &str = "entry_id, company_id, facility_id, scope, category, value, unit,
   is_renewable, source, month, recorded_at, last_sync_date";

/// Raw strings read directly from an `activity_entries` row.
pub struct RawEntry {
  pub entry_id:       String,
  pub company_id:     String,
  pub facility_id:    Option<String>,
  pub scope:          u8,
  pub category:       String,
  pub value:          String,
  pub unit:           String,
  pub is_renewable:   bool,
  pub source:         String,
  pub month:          Option<String>,
  pub recorded_at:    String,
  pub last_sync_date: Option<String>,
}

impl RawEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:       row.get(0)?,
      company_id:     row.get(1)?,
      facility_id:    row.get(2)?,
      scope:          row.get(3)?,
      category:       row.get(4)?,
      value:          row.get(5)?,
      unit:           row.get(6)?,
      is_renewable:   row.get(7)?,
      source:         row.get(8)?,
      month:          row.get(9)?,
      recorded_at:    row.get(10)?,
      last_sync_date: row.get(11)?,
    })
  }

  pub fn into_entry(self) -> Result<ActivityEntry> {
    let category = decode_category(&self.category)?;
    let scope = decode_scope(self.scope)?;
    if category.scope() != scope {
      return Err(Error::Decode { column: "scope", value: self.scope.to_string() });
    }

    Ok(ActivityEntry {
      entry_id: decode_uuid(&self.entry_id)?,
      company_id: decode_uuid(&self.company_id)?,
      facility_id: self.facility_id.as_deref().map(decode_uuid).transpose()?,
      scope,
      category,
      value: decode_decimal(&self.value)?,
      unit: decode_unit(&self.unit)?,
      is_renewable: self.is_renewable,
      source: decode_source(&self.source)?,
      month: self.month.as_deref().map(decode_month).transpose()?,
      recorded_at: decode_dt(&self.recorded_at)?,
      last_sync_date: self.last_sync_date.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from a `facilities` row.
pub struct RawFacility {
  pub facility_id: String,
  pub company_id:  String,
  pub name:        String,
  pub created_at:  String,
}

pub const FACILITY_COLUMNS: &str = "facility_id, company_id, name, created_at";

impl RawFacility {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      facility_id: row.get(0)?,
      company_id:  row.get(1)?,
      name:        row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_facility(self) -> Result<Facility> {
    Ok(Facility {
      facility_id: decode_uuid(&self.facility_id)?,
      company_id:  decode_uuid(&self.company_id)?,
      name:        self.name,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const RECORD_COLUMNS: &str = "record_id, company_id, facility_id, month, electricity_kwh,
   natural_gas_m3, water_m3, production_volume, updated_at";

/// Raw strings read directly from a `monthly_facility_records` row.
pub struct RawRecord {
  pub record_id:         String,
  pub company_id:        String,
  pub facility_id:       Option<String>,
  pub month:             String,
  pub electricity_kwh:   Option<String>,
  pub natural_gas_m3:    Option<String>,
  pub water_m3:          Option<String>,
  pub production_volume: Option<String>,
  pub updated_at:        String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:         row.get(0)?,
      company_id:        row.get(1)?,
      facility_id:       row.get(2)?,
      month:             row.get(3)?,
      electricity_kwh:   row.get(4)?,
      natural_gas_m3:    row.get(5)?,
      water_m3:          row.get(6)?,
      production_volume: row.get(7)?,
      updated_at:        row.get(8)?,
    })
  }

  pub fn into_record(self) -> Result<MonthlyFacilityRecord> {
    let reading = |s: Option<String>| s.as_deref().map(decode_decimal).transpose();
    Ok(MonthlyFacilityRecord {
      record_id: decode_uuid(&self.record_id)?,
      company_id: decode_uuid(&self.company_id)?,
      facility_id: self.facility_id.as_deref().map(decode_uuid).transpose()?,
      month: decode_month(&self.month)?,
      readings: MonthlyReadings {
        electricity_kwh:   reading(self.electricity_kwh)?,
        natural_gas_m3:    reading(self.natural_gas_m3)?,
        water_m3:          reading(self.water_m3)?,
        production_volume: reading(self.production_volume)?,
      },
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `company_profiles` row.
pub struct RawProfile {
  pub company_id:     String,
  pub industry:       String,
  pub employee_count: Option<u32>,
  pub annual_revenue: Option<String>,
  pub updated_at:     String,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<CompanyProfile> {
    Ok(CompanyProfile {
      company_id:     decode_uuid(&self.company_id)?,
      industry:       decode_industry(&self.industry)?,
      employee_count: self.employee_count,
      annual_revenue: self.annual_revenue.as_deref().map(decode_decimal).transpose()?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;

  use super::*;

  #[test]
  fn decimals_keep_their_precision() {
    let d = dec!(0.18288);
    assert_eq!(decode_decimal(&encode_decimal(d)).unwrap(), d);
    assert_eq!(encode_decimal(dec!(3300.00)), "3300");
  }

  #[test]
  fn months_round_trip_as_iso_dates() {
    let m = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    assert_eq!(encode_month(m), "2024-03-01");
    assert_eq!(decode_month("2024-03-01").unwrap(), m);
    assert!(decode_month("March").is_err());
  }

  #[test]
  fn unknown_source_is_a_decode_error() {
    assert!(matches!(
      decode_source("imported"),
      Err(Error::Decode { column: "source", .. })
    ));
  }
}
