//! Company profile data and the industry benchmark table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Industry {
  Manufacturing,
  Retail,
  Technology,
  Hospitality,
  FoodAndBeverage,
  Logistics,
  Construction,
  ProfessionalServices,
  #[default]
  Other,
}

/// The profile fields the engine needs for intensity metrics. Absent
/// fields mean "unknown"; nothing is ever computed against a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
  pub company_id:     Uuid,
  #[serde(default)]
  pub industry:       Industry,
  pub employee_count: Option<u32>,
  /// Annual revenue in the reporting currency.
  pub annual_revenue: Option<Decimal>,
  pub updated_at:     DateTime<Utc>,
}

/// Input to [`crate::store::FootprintStore::put_profile`]; `updated_at` is
/// set by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCompanyProfile {
  #[serde(default)]
  pub industry:       Industry,
  #[serde(default)]
  pub employee_count: Option<u32>,
  #[serde(default)]
  pub annual_revenue: Option<Decimal>,
}

// ─── Benchmarks ──────────────────────────────────────────────────────────────

/// Tonnes CO2e per employee per year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkBand {
  pub low:     Decimal,
  pub average: Decimal,
  pub high:    Decimal,
}

#[derive(Debug, Clone)]
pub struct BenchmarkTable {
  bands: HashMap<Industry, BenchmarkBand>,
}

impl BenchmarkTable {
  pub fn new(bands: impl IntoIterator<Item = (Industry, BenchmarkBand)>) -> Self {
    Self { bands: bands.into_iter().collect() }
  }

  pub fn band(&self, industry: Industry) -> Option<&BenchmarkBand> { self.bands.get(&industry) }

  pub fn builtin() -> Self {
    let band = |low, average, high| BenchmarkBand { low, average, high };
    Self::new([
      (Industry::Manufacturing, band(dec!(5), dec!(12), dec!(25))),
      (Industry::Retail, band(dec!(2), dec!(5), dec!(10))),
      (Industry::Technology, band(dec!(1), dec!(3), dec!(6))),
      (Industry::Hospitality, band(dec!(3), dec!(7), dec!(14))),
      (Industry::FoodAndBeverage, band(dec!(4), dec!(10), dec!(20))),
      (Industry::Logistics, band(dec!(8), dec!(20), dec!(40))),
      (Industry::Construction, band(dec!(5), dec!(12), dec!(24))),
      (Industry::ProfessionalServices, band(dec!(1), dec!(2.5), dec!(5))),
      (Industry::Other, band(dec!(2), dec!(6), dec!(12))),
    ])
  }
}
