//! The emission calculator: `co2e_kg = value × factor(category, unit)`.
//!
//! All arithmetic is exact decimal arithmetic. Pre-computed CO2e quantities
//! (`kg_co2e`, `t_co2e`) bypass the factor table but are always normalised
//! to kilograms here, so nothing downstream ever adds tonnes to kilograms.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  category::{Category, Unit},
  entry::{ActivityEntry, NewEntry},
  factor::FactorTable,
};

/// How purchased electricity is valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectricityMethod {
  /// Contractual instruments (renewable tariffs, certificates) are honoured.
  #[default]
  MarketBased,
  /// Grid-average factor regardless of contracts.
  LocationBased,
}

/// Anything the calculator can price.
pub trait Activity {
  fn category(&self) -> Category;
  fn unit(&self) -> Unit;
  fn value(&self) -> Decimal;
  fn is_renewable(&self) -> bool;
}

impl Activity for ActivityEntry {
  fn category(&self) -> Category { self.category }
  fn unit(&self) -> Unit { self.unit }
  fn value(&self) -> Decimal { self.value }
  fn is_renewable(&self) -> bool { self.is_renewable }
}

impl Activity for NewEntry {
  fn category(&self) -> Category { self.category }
  fn unit(&self) -> Unit { self.unit }
  fn value(&self) -> Decimal { self.value }
  fn is_renewable(&self) -> bool { self.is_renewable }
}

/// Convert a pre-computed emission mass to kilograms. `None` for units that
/// are not a mass of CO2e, or when the result does not fit a `Decimal`.
pub fn co2e_to_kg(value: Decimal, unit: Unit) -> Option<Decimal> {
  match unit {
    Unit::KgCo2e => Some(value),
    Unit::TonneCo2e => value.checked_mul(dec!(1000)),
    _ => None,
  }
}

fn overflow(value: Decimal, unit: Unit) -> Error {
  Error::InvalidQuantity(format!("{value} {unit} overflows the emissions range"))
}

#[derive(Debug, Clone, Copy)]
pub struct Calculator<'a> {
  table:  &'a FactorTable,
  method: ElectricityMethod,
}

impl<'a> Calculator<'a> {
  pub fn new(table: &'a FactorTable) -> Self {
    Self { table, method: ElectricityMethod::default() }
  }

  pub fn with_method(mut self, method: ElectricityMethod) -> Self {
    self.method = method;
    self
  }

  pub fn method(&self) -> ElectricityMethod { self.method }

  pub fn table(&self) -> &'a FactorTable { self.table }

  /// kg CO2e for `activity`. Unknown `(category, unit)` pairs fail with
  /// [`Error::FactorNotFound`]; a zero quantity prices to zero. A product
  /// too large for a `Decimal` fails with [`Error::InvalidQuantity`].
  pub fn calculate(&self, activity: &impl Activity) -> Result<Decimal> {
    let category = activity.category();
    let unit = activity.unit();
    let value = activity.value();

    if unit.is_co2e() {
      if !category.supports_unit(unit) {
        return Err(Error::UnsupportedUnit { category, unit: unit.to_string() });
      }
      return co2e_to_kg(value, unit).ok_or_else(|| overflow(value, unit));
    }

    let ef = self.table.lookup(category, unit)?;
    let renewable_applies = activity.is_renewable()
      && category.renewable_option()
      && self.method == ElectricityMethod::MarketBased;

    let factor = if renewable_applies {
      ef.renewable_factor.unwrap_or(Decimal::ZERO)
    } else {
      ef.factor
    };

    value.checked_mul(factor).ok_or_else(|| overflow(value, unit))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    category::{Scope1Category, Scope3Category},
    entry::EntrySource,
    factor::{EmissionFactor, NATURAL_GAS_KWH_PER_M3},
  };

  fn entry(category: Category, value: Decimal, unit: Unit) -> NewEntry {
    NewEntry {
      company_id: uuid::Uuid::nil(),
      facility_id: None,
      category,
      value,
      unit,
      is_renewable: false,
      source: EntrySource::Manual,
      month: None,
      last_sync_date: None,
    }
  }

  #[test]
  fn natural_gas_by_volume() {
    let table = FactorTable::builtin();
    let calc = Calculator::new(&table);
    let co2e = calc.calculate(&entry(Category::NATURAL_GAS, dec!(100), Unit::M3)).unwrap();
    assert_eq!(co2e, dec!(203));
  }

  #[test]
  fn renewable_electricity_is_zero_under_market_based() {
    let table = FactorTable::builtin();
    let calc = Calculator::new(&table);

    let mut e = entry(Category::ELECTRICITY, dec!(10000), Unit::Kwh);
    assert_eq!(calc.calculate(&e).unwrap(), dec!(2253.5));

    e.is_renewable = true;
    assert_eq!(calc.calculate(&e).unwrap(), Decimal::ZERO);

    for value in [dec!(0), dec!(1), dec!(123456.789)] {
      e.value = value;
      assert_eq!(calc.calculate(&e).unwrap(), Decimal::ZERO);
    }
  }

  #[test]
  fn renewable_flag_ignored_under_location_based() {
    let table = FactorTable::builtin();
    let calc = Calculator::new(&table).with_method(ElectricityMethod::LocationBased);
    let mut e = entry(Category::ELECTRICITY, dec!(10000), Unit::Kwh);
    e.is_renewable = true;
    assert_eq!(calc.calculate(&e).unwrap(), dec!(2253.5));
  }

  #[test]
  fn configured_renewable_factor_is_used() {
    let table = FactorTable::new("test", vec![
      EmissionFactor::new(Category::ELECTRICITY, Unit::Kwh, dec!(0.2))
        .with_renewable(dec!(0.01)),
    ])
    .unwrap();
    let mut e = entry(Category::ELECTRICITY, dec!(1000), Unit::Kwh);
    e.is_renewable = true;
    assert_eq!(Calculator::new(&table).calculate(&e).unwrap(), dec!(10));
  }

  #[test]
  fn equivalent_quantities_in_different_units_converge() {
    let table = FactorTable::builtin();
    let calc = Calculator::new(&table);

    let by_volume = calc.calculate(&entry(Category::NATURAL_GAS, dec!(100), Unit::M3)).unwrap();
    let by_energy = calc
      .calculate(&entry(Category::NATURAL_GAS, dec!(100) * NATURAL_GAS_KWH_PER_M3, Unit::Kwh))
      .unwrap();
    assert!((by_volume - by_energy).abs() < dec!(0.01), "{by_volume} vs {by_energy}");

    let kwh = calc.calculate(&entry(Category::ELECTRICITY, dec!(2500), Unit::Kwh)).unwrap();
    let mwh = calc.calculate(&entry(Category::ELECTRICITY, dec!(2.5), Unit::Mwh)).unwrap();
    assert_eq!(kwh, mwh);

    let waste = Category::Scope3(Scope3Category::Waste);
    let tonnes = calc.calculate(&entry(waste, dec!(1.2), Unit::Tonnes)).unwrap();
    let kg = calc.calculate(&entry(waste, dec!(1200), Unit::Kg)).unwrap();
    assert_eq!(tonnes, kg);

    let coal = Category::Scope1(Scope1Category::Coal);
    let tonnes = calc.calculate(&entry(coal, dec!(3), Unit::Tonnes)).unwrap();
    let kg = calc.calculate(&entry(coal, dec!(3000), Unit::Kg)).unwrap();
    assert_eq!(tonnes, kg);
  }

  #[test]
  fn zero_quantity_prices_to_zero() {
    let table = FactorTable::builtin();
    let co2e = Calculator::new(&table)
      .calculate(&entry(Category::NATURAL_GAS, Decimal::ZERO, Unit::M3))
      .unwrap();
    assert!(co2e.is_zero());
  }

  #[test]
  fn missing_factor_is_an_error_not_zero() {
    let table = FactorTable::new("empty", Vec::new()).unwrap();
    let err = Calculator::new(&table)
      .calculate(&entry(Category::NATURAL_GAS, dec!(100), Unit::M3))
      .unwrap_err();
    assert!(matches!(err, Error::FactorNotFound { .. }));
  }

  #[test]
  fn precomputed_tonnes_are_converted_to_kg() {
    let table = FactorTable::builtin();
    let calc = Calculator::new(&table);
    let goods = Category::Scope3(Scope3Category::PurchasedGoods);
    assert_eq!(calc.calculate(&entry(goods, dec!(1.5), Unit::TonneCo2e)).unwrap(), dec!(1500));
    assert_eq!(calc.calculate(&entry(goods, dec!(1.5), Unit::KgCo2e)).unwrap(), dec!(1.5));

    let err = calc
      .calculate(&entry(Category::ELECTRICITY, dec!(1), Unit::KgCo2e))
      .unwrap_err();
    assert!(matches!(err, Error::UnsupportedUnit { .. }));
  }

  #[test]
  fn products_beyond_decimal_range_are_rejected() {
    let table = FactorTable::builtin();
    let calc = Calculator::new(&table);
    let err = calc
      .calculate(&entry(Category::ELECTRICITY, dec!(1000000000000000000000000000), Unit::Mwh))
      .unwrap_err();
    assert!(matches!(err, Error::InvalidQuantity(_)));

    let goods = Category::Scope3(Scope3Category::PurchasedGoods);
    let err = calc.calculate(&entry(goods, dec!(100000000000000000000000000), Unit::TonneCo2e)).unwrap_err();
    assert!(matches!(err, Error::InvalidQuantity(_)));
  }
}
