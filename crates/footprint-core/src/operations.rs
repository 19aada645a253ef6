//! Automated candidates derived from facility operations data.

use crate::{
  aggregate::MonthlyAggregatedData,
  category::{Category, Unit},
  reconcile::AutomatedCandidate,
};

/// Turn an aggregate into sync candidates: electricity becomes Scope 2
/// `electricity` (kWh), natural gas becomes Scope 1 `natural_gas` (m³), and
/// water becomes Scope 3 `water_supply` (m³). Zero totals yield nothing.
pub fn candidates_from_operations(agg: &MonthlyAggregatedData) -> Vec<AutomatedCandidate> {
  [
    (Category::ELECTRICITY, agg.total_electricity_kwh, Unit::Kwh),
    (Category::NATURAL_GAS, agg.total_natural_gas_m3, Unit::M3),
    (Category::WATER_SUPPLY, agg.total_water_m3, Unit::M3),
  ]
  .into_iter()
  .filter(|(_, total, _)| !total.is_zero())
  .map(|(category, total, unit)| AutomatedCandidate {
    month: agg.latest_data_month,
    ..AutomatedCandidate::new(category, total, unit)
  })
  .collect()
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use rust_decimal_macros::dec;
  use uuid::Uuid;

  use super::*;
  use crate::{
    aggregate::{QualityThresholds, aggregate},
    facility::{MonthlyFacilityRecord, MonthlyReadings},
  };

  #[test]
  fn only_nonzero_totals_become_candidates() {
    let company = Uuid::new_v4();
    let month = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let records = vec![MonthlyFacilityRecord {
      record_id: Uuid::new_v4(),
      company_id: company,
      facility_id: None,
      month,
      readings: MonthlyReadings {
        electricity_kwh: Some(dec!(3300)),
        water_m3: Some(dec!(12)),
        ..Default::default()
      },
      updated_at: chrono::Utc::now(),
    }];
    let agg = aggregate(company, &records, month, 1, &QualityThresholds::default());
    let candidates = candidates_from_operations(&agg);

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].category, Category::ELECTRICITY);
    assert_eq!(candidates[0].value, dec!(3300));
    assert_eq!(candidates[0].month, Some(month));
    assert_eq!(candidates[1].category, Category::WATER_SUPPLY);
    assert!(candidates.iter().all(|c| c.validate().is_ok()));
  }
}
