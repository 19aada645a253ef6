//! The footprint summary builder.
//!
//! Combines every activity entry of a company (manual and automated) into
//! per-scope totals in kg CO2e, attaches the data-quality verdict of the
//! operations aggregate, and derives intensity metrics, an industry
//! benchmark, and ranked reduction recommendations.
//!
//! A summary is recomputed on every request and never cached.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
  aggregate::{DataQuality, DateRange, MonthlyAggregatedData},
  calculate::{Calculator, ElectricityMethod},
  category::Scope,
  company::{BenchmarkTable, CompanyProfile, Industry},
  entry::ActivityEntry,
};

// ─── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeTotals {
  pub scope:        Scope,
  pub manual_kg:    Decimal,
  pub automated_kg: Decimal,
  pub total_kg:     Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intensity {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub kg_per_employee:        Option<Decimal>,
  /// kg CO2e per unit of annual revenue.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub kg_per_revenue:         Option<Decimal>,
  /// kg CO2e per unit of production volume over the operations window.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub kg_per_production_unit: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkRating {
  /// At or below the industry's low band.
  Leading,
  /// At or below the industry average.
  BelowAverage,
  /// Above average, at or below the high band.
  AboveAverage,
  /// Above the high band.
  High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benchmark {
  pub industry:             Industry,
  pub tonnes_per_employee:  Decimal,
  pub industry_low:         Decimal,
  pub industry_average:     Decimal,
  pub industry_high:        Decimal,
  pub rating:               BenchmarkRating,
  pub guidance:             String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
  /// 1 is the most impactful.
  pub rank:        usize,
  pub scope:       Scope,
  pub title:       String,
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FootprintSummary {
  pub company_id:             Uuid,
  pub generated_at:           DateTime<Utc>,
  pub factor_table_version:   String,
  pub electricity_method:     ElectricityMethod,
  pub scope1_total:           Decimal,
  pub scope2_total:           Decimal,
  pub scope3_total:           Decimal,
  /// Always `scope1_total + scope2_total + scope3_total`.
  pub total:                  Decimal,
  /// Scope 2 valued with grid-average factors, for dual reporting.
  pub scope2_location_based:  Decimal,
  pub breakdown:              Vec<ScopeTotals>,
  /// The reporting window shared by the entry totals and the operations
  /// aggregate.
  pub date_range:             Option<DateRange>,
  /// Entries whose reporting month falls inside `date_range`.
  pub entry_count:            usize,
  /// In-window entries that could not be priced, or whose emissions would
  /// overflow a total. They contribute nothing to the totals.
  pub uncalculated_entries:   Vec<Uuid>,
  pub data_quality:           DataQuality,
  pub missing_months:         Vec<NaiveDate>,
  pub intensity:              Intensity,
  pub benchmark:              Option<Benchmark>,
  pub recommendations:        Vec<Recommendation>,
}

// ─── Builder ─────────────────────────────────────────────────────────────────

pub struct SummaryInput<'a> {
  pub company_id: Uuid,
  pub entries:    &'a [ActivityEntry],
  pub operations: &'a MonthlyAggregatedData,
  pub profile:    Option<&'a CompanyProfile>,
  pub benchmarks: &'a BenchmarkTable,
}

/// Build the summary for the window covered by `input.operations`. Entries
/// are counted by [`ActivityEntry::reporting_month`]; those outside the
/// window are ignored.
pub fn summarize(calc: &Calculator<'_>, input: SummaryInput<'_>) -> FootprintSummary {
  let location = calc.with_method(ElectricityMethod::LocationBased);

  let mut breakdown: Vec<ScopeTotals> = Scope::ALL
    .iter()
    .map(|&scope| ScopeTotals {
      scope,
      manual_kg: Decimal::ZERO,
      automated_kg: Decimal::ZERO,
      total_kg: Decimal::ZERO,
    })
    .collect();
  let mut scope2_location_based = Decimal::ZERO;
  let mut uncalculated_entries = Vec::new();

  let date_range = input.operations.date_range;
  let entries: Vec<&ActivityEntry> = input
    .entries
    .iter()
    .filter(|e| e.company_id == input.company_id)
    .filter(|e| {
      date_range.is_none_or(|r| (r.start..=r.end).contains(&e.reporting_month()))
    })
    .collect();

  let mut total = Decimal::ZERO;
  for entry in &entries {
    let co2e = match calc.calculate(*entry) {
      Ok(kg) => kg,
      Err(e) => {
        warn!(entry_id = %entry.entry_id, error = %e, "entry excluded from summary");
        uncalculated_entries.push(entry.entry_id);
        continue;
      }
    };
    let location_kg = if entry.scope == Scope::Two {
      // Location-based pricing can only differ by ignoring the renewable
      // override, so a factor that priced above prices here too.
      location.calculate(*entry).unwrap_or(co2e)
    } else {
      Decimal::ZERO
    };

    let slot = &breakdown[usize::from(entry.scope.number() - 1)];
    let (manual, automated) = if entry.source.is_automated() {
      (Some(slot.manual_kg), slot.automated_kg.checked_add(co2e))
    } else {
      (slot.manual_kg.checked_add(co2e), Some(slot.automated_kg))
    };
    let next = (
      manual,
      automated,
      slot.total_kg.checked_add(co2e),
      total.checked_add(co2e),
      scope2_location_based.checked_add(location_kg),
    );
    let (Some(manual), Some(automated), Some(slot_total), Some(next_total), Some(next_location)) =
      next
    else {
      warn!(entry_id = %entry.entry_id, "emissions overflow the summary totals, entry excluded");
      uncalculated_entries.push(entry.entry_id);
      continue;
    };

    let slot = &mut breakdown[usize::from(entry.scope.number() - 1)];
    slot.manual_kg = manual;
    slot.automated_kg = automated;
    slot.total_kg = slot_total;
    total = next_total;
    scope2_location_based = next_location;
  }

  let [scope1_total, scope2_total, scope3_total] = [0, 1, 2].map(|i| breakdown[i].total_kg);

  let intensity = intensity(total, input.profile, input.operations);
  let benchmark = input
    .profile
    .and_then(|p| benchmark(total, input.operations.window_months, p, input.benchmarks));
  let recommendations = recommendations(&breakdown);

  FootprintSummary {
    company_id: input.company_id,
    generated_at: Utc::now(),
    factor_table_version: calc.table().version().to_owned(),
    electricity_method: calc.method(),
    scope1_total,
    scope2_total,
    scope3_total,
    total,
    scope2_location_based,
    breakdown,
    date_range,
    entry_count: entries.len(),
    uncalculated_entries,
    data_quality: input.operations.data_quality,
    missing_months: input.operations.missing_months.clone(),
    intensity,
    benchmark,
    recommendations,
  }
}

fn intensity(
  total: Decimal,
  profile: Option<&CompanyProfile>,
  operations: &MonthlyAggregatedData,
) -> Intensity {
  let per = |denominator: Decimal| total.checked_div(denominator).map(|v| v.round_dp(4));
  Intensity {
    kg_per_employee: profile
      .and_then(|p| p.employee_count)
      .filter(|&n| n > 0)
      .and_then(|n| per(Decimal::from(n))),
    kg_per_revenue: profile
      .and_then(|p| p.annual_revenue)
      .filter(|r| *r > Decimal::ZERO)
      .and_then(|r| total.checked_div(r))
      .map(|v| v.round_dp(6)),
    kg_per_production_unit: Some(operations.total_production_volume)
      .filter(|v| *v > Decimal::ZERO)
      .and_then(per),
  }
}

/// Rate the window's emissions against the industry's annual bands. Windows
/// other than twelve months are scaled to a yearly rate first.
fn benchmark(
  total_kg: Decimal,
  window_months: u32,
  profile: &CompanyProfile,
  table: &BenchmarkTable,
) -> Option<Benchmark> {
  let employees = profile.employee_count.filter(|&n| n > 0)?;
  let band = table.band(profile.industry)?;
  if window_months == 0 {
    return None;
  }
  let tonnes_per_employee = total_kg
    .checked_mul(dec!(12))?
    .checked_div(Decimal::from(window_months))?
    .checked_div(dec!(1000))?
    .checked_div(Decimal::from(employees))?
    .round_dp(2);

  let rating = if tonnes_per_employee <= band.low {
    BenchmarkRating::Leading
  } else if tonnes_per_employee <= band.average {
    BenchmarkRating::BelowAverage
  } else if tonnes_per_employee <= band.high {
    BenchmarkRating::AboveAverage
  } else {
    BenchmarkRating::High
  };

  let industry = profile.industry.to_string().replace('_', " ");
  let guidance = match rating {
    BenchmarkRating::Leading => format!(
      "At {tonnes_per_employee} t CO2e per employee you are among the lowest emitters in {industry} (low band {}). Focus on maintaining performance and verifying data.",
      band.low
    ),
    BenchmarkRating::BelowAverage => format!(
      "At {tonnes_per_employee} t CO2e per employee you are below the {industry} average of {}. Targeted efficiency work can move you into the leading band.",
      band.average
    ),
    BenchmarkRating::AboveAverage => format!(
      "At {tonnes_per_employee} t CO2e per employee you are above the {industry} average of {}. Prioritise the recommendations for your largest scope.",
      band.average
    ),
    BenchmarkRating::High => format!(
      "At {tonnes_per_employee} t CO2e per employee you exceed the {industry} high band of {}. A structured reduction plan is recommended.",
      band.high
    ),
  };

  Some(Benchmark {
    industry: profile.industry,
    tonnes_per_employee,
    industry_low: band.low,
    industry_average: band.average,
    industry_high: band.high,
    rating,
    guidance,
  })
}

// ─── Recommendations ─────────────────────────────────────────────────────────

const SCOPE1_ACTIONS: &[(&str, &str)] = &[
  (
    "Electrify heating",
    "Replace gas boilers with heat pumps to remove on-site combustion.",
  ),
  (
    "Transition the vehicle fleet",
    "Move company vehicles to electric or hybrid models as leases renew.",
  ),
  (
    "Run refrigerant leak checks",
    "Schedule leak detection on cooling equipment and plan moves to low-GWP refrigerants.",
  ),
];

const SCOPE2_ACTIONS: &[(&str, &str)] = &[
  (
    "Switch to a renewable electricity tariff",
    "Procure certified renewable electricity to cut market-based Scope 2 emissions.",
  ),
  (
    "Upgrade lighting and controls",
    "Install LED lighting with occupancy and daylight sensors.",
  ),
  (
    "Install sub-metering",
    "Meter major loads separately to find and fix waste.",
  ),
];

const SCOPE3_ACTIONS: &[(&str, &str)] = &[
  (
    "Engage key suppliers",
    "Ask your largest suppliers for product-level carbon data and reduction targets.",
  ),
  (
    "Adopt a sustainable travel policy",
    "Prefer rail over short-haul flights and encourage low-carbon commuting.",
  ),
  (
    "Reduce and divert waste",
    "Separate recyclables and food waste to keep material out of landfill.",
  ),
];

/// Templates for every scope with a nonzero total, largest scope first.
fn recommendations(breakdown: &[ScopeTotals]) -> Vec<Recommendation> {
  let mut scopes: Vec<&ScopeTotals> =
    breakdown.iter().filter(|s| s.total_kg > Decimal::ZERO).collect();
  scopes.sort_by(|a, b| b.total_kg.cmp(&a.total_kg).then(a.scope.cmp(&b.scope)));

  scopes
    .into_iter()
    .flat_map(|s| {
      let actions = match s.scope {
        Scope::One => SCOPE1_ACTIONS,
        Scope::Two => SCOPE2_ACTIONS,
        Scope::Three => SCOPE3_ACTIONS,
      };
      actions.iter().map(move |(title, description)| (s.scope, *title, *description))
    })
    .enumerate()
    .map(|(i, (scope, title, description))| Recommendation {
      rank: i + 1,
      scope,
      title: title.to_owned(),
      description: description.to_owned(),
    })
    .collect()
}
