//! The monthly aggregator.
//!
//! Rolls per-facility monthly records up into a company-level view over a
//! trailing window. Missing months are a reported result, not a failure:
//! aggregation is total over whatever data exists.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::facility::{MonthlyFacilityRecord, MonthlyReadings, month_start, trailing_months};

// ─── Quality ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
  High,
  Medium,
  Low,
}

/// Missing-month thresholds for each quality band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
  /// At most this many missing months still rates `high`.
  pub high_max_missing:   usize,
  /// At most this many missing months rates `medium`; more is `low`.
  pub medium_max_missing: usize,
}

impl Default for QualityThresholds {
  fn default() -> Self { Self { high_max_missing: 0, medium_max_missing: 2 } }
}

impl QualityThresholds {
  pub fn classify(&self, missing: usize) -> DataQuality {
    if missing <= self.high_max_missing {
      DataQuality::High
    } else if missing <= self.medium_max_missing {
      DataQuality::Medium
    } else {
      DataQuality::Low
    }
  }
}

// ─── Result ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
  pub start: NaiveDate,
  pub end:   NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAggregatedData {
  pub company_id:              Uuid,
  pub window_months:           u32,
  /// First and last month of the window; `None` for an empty window.
  pub date_range:              Option<DateRange>,
  pub total_electricity_kwh:   Decimal,
  pub total_natural_gas_m3:    Decimal,
  pub total_water_m3:          Decimal,
  pub total_production_volume: Decimal,
  /// Months in the window with at least one reported field.
  pub month_count:             usize,
  pub record_count:            usize,
  pub facility_count:          usize,
  /// Expected months with no data, oldest first.
  pub missing_months:          Vec<NaiveDate>,
  pub latest_data_month:       Option<NaiveDate>,
  /// Share of expected months with data, as a percentage.
  pub completeness:            Decimal,
  pub data_quality:            DataQuality,
  /// Per-month sums across facilities.
  pub months:                  BTreeMap<NaiveDate, MonthlyReadings>,
  /// Records left out because adding them would overflow a total.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub excluded_records:        Vec<Uuid>,
}

/// Aggregate `records` for `company_id` over the `window_months` months
/// ending with the month containing `window_end`.
///
/// Records for other companies or outside the window are ignored. Unreported
/// fields count as zero in the totals but a month whose records are all
/// empty is still missing.
pub fn aggregate(
  company_id: Uuid,
  records: &[MonthlyFacilityRecord],
  window_end: NaiveDate,
  window_months: u32,
  thresholds: &QualityThresholds,
) -> MonthlyAggregatedData {
  let expected = trailing_months(window_end, window_months);
  let expected_set: BTreeSet<NaiveDate> = expected.iter().copied().collect();

  let in_window: Vec<&MonthlyFacilityRecord> = records
    .iter()
    .filter(|r| r.company_id == company_id)
    .filter(|r| expected_set.contains(&month_start(r.month)))
    .collect();

  let mut months: BTreeMap<NaiveDate, MonthlyReadings> = BTreeMap::new();
  let mut totals = MonthlyReadings::default();
  let mut facilities: HashSet<Option<Uuid>> = HashSet::new();
  let mut excluded_records = Vec::new();
  for record in &in_window {
    facilities.insert(record.facility_id);
    if record.readings.is_empty() {
      continue;
    }
    let month = month_start(record.month);
    let slot = months.get(&month).cloned().unwrap_or_default();
    match (slot.checked_add(&record.readings), totals.checked_add(&record.readings)) {
      (Some(slot), Some(sum)) => {
        months.insert(month, slot);
        totals = sum;
      }
      _ => {
        warn!(record_id = %record.record_id, %month, "readings overflow the window totals, excluding record");
        excluded_records.push(record.record_id);
      }
    }
  }

  let missing_months: Vec<NaiveDate> = expected
    .iter()
    .copied()
    .filter(|m| !months.contains_key(m))
    .collect();

  let completeness = if expected.is_empty() {
    dec!(100)
  } else {
    (Decimal::from(months.len()) * dec!(100) / Decimal::from(expected.len())).round_dp(1)
  };

  MonthlyAggregatedData {
    company_id,
    window_months,
    date_range: match (expected.first(), expected.last()) {
      (Some(&start), Some(&end)) => Some(DateRange { start, end }),
      _ => None,
    },
    total_electricity_kwh: totals.electricity_kwh.unwrap_or_default(),
    total_natural_gas_m3: totals.natural_gas_m3.unwrap_or_default(),
    total_water_m3: totals.water_m3.unwrap_or_default(),
    total_production_volume: totals.production_volume.unwrap_or_default(),
    month_count: months.len(),
    record_count: in_window.len(),
    facility_count: facilities.len(),
    data_quality: thresholds.classify(missing_months.len()),
    missing_months,
    latest_data_month: months.keys().next_back().copied(),
    completeness,
    months,
    excluded_records,
  }
}
