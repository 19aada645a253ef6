//! The emission factor table.
//!
//! A [`FactorTable`] is an immutable, versioned snapshot mapping
//! `(category, unit)` to kg CO2e per unit. Tables are built once and shared
//! behind an `Arc`; a newer edition supersedes the whole table rather than
//! being merged into it.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  category::{Category, Scope1Category as S1, Scope2Category as S2, Scope3Category as S3, Unit},
};

/// Cubic metres of natural gas to kWh (gross calorific value) assumed by the
/// built-in table. The two natural-gas factors are kept consistent with it.
pub const NATURAL_GAS_KWH_PER_M3: Decimal = dec!(11.1);

// ─── EmissionFactor ──────────────────────────────────────────────────────────

/// One immutable reference datum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionFactor {
  pub category:         Category,
  pub unit:             Unit,
  /// kg CO2e per `unit`.
  pub factor:           Decimal,
  /// Replacement factor for renewable supply under market-based accounting.
  /// Only legal on renewable-capable categories.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub renewable_factor: Option<Decimal>,
}

impl EmissionFactor {
  pub fn new(category: Category, unit: Unit, factor: Decimal) -> Self {
    Self { category, unit, factor, renewable_factor: None }
  }

  pub fn with_renewable(mut self, renewable_factor: Decimal) -> Self {
    self.renewable_factor = Some(renewable_factor);
    self
  }
}

// ─── FactorTable ─────────────────────────────────────────────────────────────

/// Serialised form of a factor table file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorTableFile {
  pub version: String,
  pub factors: Vec<EmissionFactor>,
}

#[derive(Debug, Clone)]
pub struct FactorTable {
  version: String,
  factors: HashMap<(Category, Unit), EmissionFactor>,
}

impl FactorTable {
  /// Build a table, rejecting duplicate `(category, unit)` pairs, units the
  /// category does not accept, negative factors, and renewable factors on
  /// categories without a renewable option.
  pub fn new(
    version: impl Into<String>,
    factors: impl IntoIterator<Item = EmissionFactor>,
  ) -> Result<Self> {
    let mut map = HashMap::new();
    for ef in factors {
      if !ef.category.supports_unit(ef.unit) || ef.unit.is_co2e() {
        return Err(Error::UnsupportedUnit {
          category: ef.category,
          unit:     ef.unit.to_string(),
        });
      }
      for value in std::iter::once(ef.factor).chain(ef.renewable_factor) {
        if value < Decimal::ZERO {
          return Err(Error::NegativeFactor { category: ef.category, factor: value });
        }
      }
      if ef.renewable_factor.is_some() && !ef.category.renewable_option() {
        return Err(Error::RenewableFactorNotAllowed(ef.category));
      }
      let key = (ef.category, ef.unit);
      if map.contains_key(&key) {
        return Err(Error::DuplicateFactor { category: ef.category, unit: ef.unit });
      }
      map.insert(key, ef);
    }
    Ok(Self { version: version.into(), factors: map })
  }

  /// Parse a versioned JSON table (see [`FactorTableFile`]).
  pub fn from_json(json: &str) -> Result<Self> {
    let file: FactorTableFile = serde_json::from_str(json)?;
    Self::new(file.version, file.factors)
  }

  pub fn version(&self) -> &str { &self.version }

  /// Fails closed: an unknown pair is an error, never an implied zero.
  pub fn lookup(&self, category: Category, unit: Unit) -> Result<&EmissionFactor> {
    self
      .factors
      .get(&(category, unit))
      .ok_or(Error::FactorNotFound { category, unit })
  }

  pub fn len(&self) -> usize { self.factors.len() }

  pub fn is_empty(&self) -> bool { self.factors.is_empty() }

  /// A stable, sorted snapshot suitable for serialisation.
  pub fn snapshot(&self) -> FactorTableFile {
    let mut factors: Vec<EmissionFactor> = self.factors.values().cloned().collect();
    factors.sort_by_key(|ef| (ef.category, ef.unit));
    FactorTableFile { version: self.version.clone(), factors }
  }

  /// The table compiled into the binary. Deployments with an authoritative
  /// source should load it with [`FactorTable::from_json`] instead.
  pub fn builtin() -> Self {
    use Category::{Scope1, Scope2, Scope3};

    let gas_m3 = dec!(2.03);
    let elec_kwh = dec!(0.22535);

    let factors = vec![
      // Scope 1
      EmissionFactor::new(Scope1(S1::NaturalGas), Unit::M3, gas_m3),
      EmissionFactor::new(
        Scope1(S1::NaturalGas),
        Unit::Kwh,
        (gas_m3 / NATURAL_GAS_KWH_PER_M3).round_dp(5),
      ),
      EmissionFactor::new(Scope1(S1::Diesel), Unit::Litres, dec!(2.51279)),
      EmissionFactor::new(Scope1(S1::Petrol), Unit::Litres, dec!(2.0844)),
      EmissionFactor::new(Scope1(S1::Lpg), Unit::Litres, dec!(1.55713)),
      EmissionFactor::new(Scope1(S1::Lpg), Unit::Kg, dec!(2.93929)),
      EmissionFactor::new(Scope1(S1::HeatingOil), Unit::Litres, dec!(2.54015)),
      EmissionFactor::new(Scope1(S1::Coal), Unit::Tonnes, dec!(2403.84)),
      EmissionFactor::new(Scope1(S1::Coal), Unit::Kg, dec!(2.40384)),
      EmissionFactor::new(Scope1(S1::RefrigerantR410a), Unit::Kg, dec!(2088)),
      EmissionFactor::new(Scope1(S1::RefrigerantR134a), Unit::Kg, dec!(1430)),
      EmissionFactor::new(Scope1(S1::RefrigerantR32), Unit::Kg, dec!(675)),
      // Scope 2
      EmissionFactor::new(Scope2(S2::Electricity), Unit::Kwh, elec_kwh)
        .with_renewable(Decimal::ZERO),
      EmissionFactor::new(Scope2(S2::Electricity), Unit::Mwh, elec_kwh * dec!(1000))
        .with_renewable(Decimal::ZERO),
      EmissionFactor::new(Scope2(S2::Steam), Unit::Kwh, dec!(0.17965)),
      EmissionFactor::new(Scope2(S2::Heat), Unit::Kwh, dec!(0.17965)),
      EmissionFactor::new(Scope2(S2::Cooling), Unit::Kwh, dec!(0.07621)),
      // Scope 3
      EmissionFactor::new(Scope3(S3::Waste), Unit::Tonnes, dec!(467.05)),
      EmissionFactor::new(Scope3(S3::Waste), Unit::Kg, dec!(0.46705)),
      EmissionFactor::new(Scope3(S3::BusinessTravel), Unit::PassengerKm, dec!(0.15102)),
      EmissionFactor::new(Scope3(S3::BusinessTravel), Unit::Km, dec!(0.16984)),
      EmissionFactor::new(Scope3(S3::EmployeeCommuting), Unit::PassengerKm, dec!(0.10312)),
      EmissionFactor::new(Scope3(S3::EmployeeCommuting), Unit::Km, dec!(0.16984)),
      EmissionFactor::new(Scope3(S3::Freight), Unit::TonneKm, dec!(0.10749)),
      EmissionFactor::new(Scope3(S3::CapitalGoods), Unit::Gbp, dec!(0.35)),
      EmissionFactor::new(Scope3(S3::WaterSupply), Unit::M3, dec!(0.1913)),
      EmissionFactor::new(Scope3(S3::WaterTreatment), Unit::M3, dec!(0.17088)),
    ];

    // The literal set above is validated by the unit tests.
    match Self::new("builtin-2024", factors) {
      Ok(table) => table,
      Err(e) => unreachable!("built-in factor table is invalid: {e}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtin_covers_every_non_automated_unit() {
    let table = FactorTable::builtin();
    for category in Category::all().filter(|c| !c.automated()) {
      for &unit in category.units() {
        assert!(table.lookup(category, unit).is_ok(), "{category} {unit}");
      }
    }
  }

  #[test]
  fn unknown_pair_fails_closed() {
    let table = FactorTable::builtin();
    let err = table.lookup(Category::ELECTRICITY, Unit::Litres).unwrap_err();
    assert!(matches!(err, Error::FactorNotFound { unit: Unit::Litres, .. }));
  }

  #[test]
  fn duplicate_pair_rejected() {
    let err = FactorTable::new("test", vec![
      EmissionFactor::new(Category::NATURAL_GAS, Unit::M3, dec!(2.03)),
      EmissionFactor::new(Category::NATURAL_GAS, Unit::M3, dec!(2.04)),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateFactor { .. }));
  }

  #[test]
  fn renewable_factor_only_on_eligible_categories() {
    let err = FactorTable::new("test", vec![
      EmissionFactor::new(Category::NATURAL_GAS, Unit::M3, dec!(2.03))
        .with_renewable(Decimal::ZERO),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::RenewableFactorNotAllowed(_)));
  }

  #[test]
  fn illegal_unit_rejected() {
    let err = FactorTable::new("test", vec![EmissionFactor::new(
      Category::ELECTRICITY,
      Unit::Litres,
      dec!(1),
    )])
    .unwrap_err();
    assert!(matches!(err, Error::UnsupportedUnit { .. }));
  }

  #[test]
  fn json_roundtrip_preserves_version() {
    let table = FactorTable::builtin();
    let json = serde_json::to_string(&table.snapshot()).unwrap();
    let parsed = FactorTable::from_json(&json).unwrap();
    assert_eq!(parsed.version(), "builtin-2024");
    assert_eq!(parsed.len(), table.len());
    assert_eq!(
      parsed.lookup(Category::ELECTRICITY, Unit::Kwh).unwrap().factor,
      dec!(0.22535)
    );
  }

  #[test]
  fn json_with_unknown_category_is_rejected() {
    let json = r#"{"version":"x","factors":[{"category":"plutonium","unit":"kg","factor":"1"}]}"#;
    assert!(matches!(
      FactorTable::from_json(json).unwrap_err(),
      Error::Serialization(_)
    ));
  }
}
