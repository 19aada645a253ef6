//! Facilities and their monthly operational records.
//!
//! A [`MonthlyFacilityRecord`] is keyed by `(company_id, facility_id, month)`
//! and is upserted, never deleted. `facility_id = None` denotes a
//! company-wide aggregate record. `month` is always the first day of the
//! calendar month.

use chrono::{DateTime, Datelike as _, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Months ──────────────────────────────────────────────────────────────────

/// Normalise any date to the first day of its month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
  date.with_day(1).unwrap_or(date)
}

/// Longest reporting window accepted anywhere, ten years.
pub const MAX_WINDOW_MONTHS: u32 = 120;

/// Reject windows that are empty or longer than [`MAX_WINDOW_MONTHS`].
pub fn check_window(months: u32) -> crate::Result<u32> {
  if (1..=MAX_WINDOW_MONTHS).contains(&months) {
    Ok(months)
  } else {
    Err(crate::Error::InvalidWindow(months))
  }
}

/// The `count` consecutive month starts ending at (and including) the month
/// containing `end`, oldest first. Stops early at the start of the calendar.
pub fn trailing_months(end: NaiveDate, count: u32) -> Vec<NaiveDate> {
  let end = month_start(end);
  let mut months: Vec<NaiveDate> = (0..count)
    .map_while(|back| end.checked_sub_months(Months::new(back)))
    .collect();
  months.reverse();
  months
}

// ─── Facility ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
  pub facility_id: Uuid,
  pub company_id:  Uuid,
  pub name:        String,
  pub created_at:  DateTime<Utc>,
}

// ─── Monthly records ─────────────────────────────────────────────────────────

/// The operational quantities reported for one month. Every field is
/// optional; `None` means "not reported", which is distinct from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyReadings {
  #[serde(default)]
  pub electricity_kwh:   Option<Decimal>,
  #[serde(default)]
  pub natural_gas_m3:    Option<Decimal>,
  #[serde(default)]
  pub water_m3:          Option<Decimal>,
  #[serde(default)]
  pub production_volume: Option<Decimal>,
}

impl MonthlyReadings {
  /// `true` when no field was reported at all.
  pub fn is_empty(&self) -> bool {
    self.electricity_kwh.is_none()
      && self.natural_gas_m3.is_none()
      && self.water_m3.is_none()
      && self.production_volume.is_none()
  }

  /// The field-wise sum of `self` and `other`, or `None` if any field
  /// overflows. Unreported fields contribute nothing; a field reported in
  /// either operand is reported in the sum.
  pub fn checked_add(&self, other: &MonthlyReadings) -> Option<MonthlyReadings> {
    fn add(acc: Option<Decimal>, v: Option<Decimal>) -> Option<Option<Decimal>> {
      match (acc, v) {
        (acc, None) => Some(acc),
        (acc, Some(v)) => acc.unwrap_or_default().checked_add(v).map(Some),
      }
    }
    Some(MonthlyReadings {
      electricity_kwh:   add(self.electricity_kwh, other.electricity_kwh)?,
      natural_gas_m3:    add(self.natural_gas_m3, other.natural_gas_m3)?,
      water_m3:          add(self.water_m3, other.water_m3)?,
      production_volume: add(self.production_volume, other.production_volume)?,
    })
  }

  /// The first negative reading, if any.
  pub fn first_negative(&self) -> Option<Decimal> {
    [
      self.electricity_kwh,
      self.natural_gas_m3,
      self.water_m3,
      self.production_volume,
    ]
    .into_iter()
    .flatten()
    .find(|v| *v < Decimal::ZERO)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyFacilityRecord {
  pub record_id:   Uuid,
  pub company_id:  Uuid,
  pub facility_id: Option<Uuid>,
  /// First day of the month.
  pub month:       NaiveDate,
  #[serde(flatten)]
  pub readings:    MonthlyReadings,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::FootprintStore::upsert_facility_record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFacilityRecord {
  pub company_id:  Uuid,
  pub facility_id: Option<Uuid>,
  pub month:       NaiveDate,
  pub readings:    MonthlyReadings,
}

impl NewFacilityRecord {
  /// Builds a record input with `month` normalised to day 1.
  pub fn new(
    company_id: Uuid,
    facility_id: Option<Uuid>,
    month: NaiveDate,
    readings: MonthlyReadings,
  ) -> Self {
    Self { company_id, facility_id, month: month_start(month), readings }
  }
}
