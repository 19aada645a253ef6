//! The closed emission-category taxonomy.
//!
//! Every category belongs to exactly one GHG Protocol scope and declares the
//! units it may be reported in, whether a renewable (market-based) override is
//! available, and whether it is populated exclusively by automated
//! calculators. Categories are addressed on the wire by a snake_case key that
//! is unique across all three scopes.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::Error;

// ─── Scope ───────────────────────────────────────────────────────────────────

/// GHG Protocol scope. Serialised as the bare number `1`, `2` or `3`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Scope {
  /// Direct emissions from owned or controlled sources.
  One,
  /// Indirect emissions from purchased energy.
  Two,
  /// All other value-chain emissions.
  Three,
}

impl Scope {
  pub const ALL: [Scope; 3] = [Scope::One, Scope::Two, Scope::Three];

  pub fn number(self) -> u8 {
    match self {
      Self::One => 1,
      Self::Two => 2,
      Self::Three => 3,
    }
  }
}

impl From<Scope> for u8 {
  fn from(scope: Scope) -> Self { scope.number() }
}

impl TryFrom<u8> for Scope {
  type Error = Error;

  fn try_from(n: u8) -> Result<Self, Self::Error> {
    match n {
      1 => Ok(Self::One),
      2 => Ok(Self::Two),
      3 => Ok(Self::Three),
      other => Err(Error::InvalidScope(other)),
    }
  }
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "scope {}", self.number())
  }
}

// ─── Unit ────────────────────────────────────────────────────────────────────

/// A unit of activity. `kg_co2e` and `t_co2e` are reserved for pre-computed
/// emissions supplied by external calculators.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(try_from = "String", into = "&'static str")]
#[strum(ascii_case_insensitive)]
pub enum Unit {
  #[strum(to_string = "kWh")]
  Kwh,
  #[strum(to_string = "MWh")]
  Mwh,
  #[strum(to_string = "m3")]
  M3,
  #[strum(to_string = "litres")]
  Litres,
  #[strum(to_string = "kg")]
  Kg,
  #[strum(to_string = "tonnes")]
  Tonnes,
  #[strum(to_string = "km")]
  Km,
  #[strum(to_string = "passenger_km")]
  PassengerKm,
  #[strum(to_string = "tonne_km")]
  TonneKm,
  #[strum(to_string = "gbp")]
  Gbp,
  #[strum(to_string = "kg_co2e")]
  KgCo2e,
  #[strum(to_string = "t_co2e")]
  TonneCo2e,
}

impl Unit {
  /// `true` for units that already express an emission mass.
  pub fn is_co2e(self) -> bool { matches!(self, Self::KgCo2e | Self::TonneCo2e) }
}

impl TryFrom<String> for Unit {
  type Error = strum::ParseError;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

// ─── Per-scope categories ────────────────────────────────────────────────────

/// Scope 1: stationary/mobile combustion and fugitive refrigerants.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Scope1Category {
  NaturalGas,
  Diesel,
  Petrol,
  Lpg,
  HeatingOil,
  Coal,
  RefrigerantR410a,
  RefrigerantR134a,
  RefrigerantR32,
}

/// Scope 2: purchased energy.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Scope2Category {
  Electricity,
  Steam,
  Heat,
  Cooling,
}

/// Scope 3: the fixed value-chain category list.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Scope3Category {
  Waste,
  BusinessTravel,
  EmployeeCommuting,
  Freight,
  PurchasedGoods,
  CapitalGoods,
  FuelAndEnergyRelated,
  WaterSupply,
  WaterTreatment,
}

// ─── Category ────────────────────────────────────────────────────────────────

/// A category tagged with the scope it belongs to.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Category {
  Scope1(Scope1Category),
  Scope2(Scope2Category),
  Scope3(Scope3Category),
}

const PRECOMPUTED: &[Unit] = &[Unit::KgCo2e, Unit::TonneCo2e];

impl Category {
  pub const ELECTRICITY: Category = Category::Scope2(Scope2Category::Electricity);
  pub const NATURAL_GAS: Category = Category::Scope1(Scope1Category::NaturalGas);
  pub const WATER_SUPPLY: Category = Category::Scope3(Scope3Category::WaterSupply);

  /// Every category, in scope order.
  pub fn all() -> impl Iterator<Item = Category> {
    Scope1Category::iter()
      .map(Category::Scope1)
      .chain(Scope2Category::iter().map(Category::Scope2))
      .chain(Scope3Category::iter().map(Category::Scope3))
  }

  /// Resolve a wire key (e.g. `"natural_gas"`) regardless of scope.
  pub fn from_key(key: &str) -> Option<Self> {
    let key = key.trim();
    key
      .parse()
      .map(Category::Scope1)
      .or_else(|_| key.parse().map(Category::Scope2))
      .or_else(|_| key.parse().map(Category::Scope3))
      .ok()
  }

  pub fn key(self) -> &'static str {
    match self {
      Self::Scope1(c) => c.into(),
      Self::Scope2(c) => c.into(),
      Self::Scope3(c) => c.into(),
    }
  }

  pub fn scope(self) -> Scope {
    match self {
      Self::Scope1(_) => Scope::One,
      Self::Scope2(_) => Scope::Two,
      Self::Scope3(_) => Scope::Three,
    }
  }

  /// The units this category may be reported in. The first unit is the
  /// canonical one.
  pub fn units(self) -> &'static [Unit] {
    use Scope1Category as S1;
    use Scope2Category as S2;
    use Scope3Category as S3;

    match self {
      Self::Scope1(c) => match c {
        S1::NaturalGas => &[Unit::M3, Unit::Kwh],
        S1::Diesel | S1::Petrol | S1::HeatingOil => &[Unit::Litres],
        S1::Lpg => &[Unit::Litres, Unit::Kg],
        S1::Coal => &[Unit::Tonnes, Unit::Kg],
        S1::RefrigerantR410a | S1::RefrigerantR134a | S1::RefrigerantR32 => {
          &[Unit::Kg]
        }
      },
      Self::Scope2(c) => match c {
        S2::Electricity => &[Unit::Kwh, Unit::Mwh],
        S2::Steam | S2::Heat | S2::Cooling => &[Unit::Kwh],
      },
      Self::Scope3(c) => match c {
        S3::Waste => &[Unit::Tonnes, Unit::Kg],
        S3::BusinessTravel | S3::EmployeeCommuting => {
          &[Unit::PassengerKm, Unit::Km]
        }
        S3::Freight => &[Unit::TonneKm],
        S3::CapitalGoods => &[Unit::Gbp],
        S3::WaterSupply | S3::WaterTreatment => &[Unit::M3],
        S3::PurchasedGoods | S3::FuelAndEnergyRelated => PRECOMPUTED,
      },
    }
  }

  pub fn supports_unit(self, unit: Unit) -> bool { self.units().contains(&unit) }

  /// Whether a market-based renewable override may apply.
  pub fn renewable_option(self) -> bool {
    matches!(self, Self::Scope2(Scope2Category::Electricity))
  }

  /// Automated categories are fed only by external calculators as
  /// pre-computed CO2e and never accept manual entries.
  pub fn automated(self) -> bool {
    matches!(
      self,
      Self::Scope3(
        Scope3Category::PurchasedGoods | Scope3Category::FuelAndEnergyRelated
      )
    )
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

impl From<Category> for &'static str {
  fn from(category: Category) -> Self { category.key() }
}

impl TryFrom<String> for Category {
  type Error = Error;

  fn try_from(key: String) -> Result<Self, Self::Error> {
    Category::from_key(&key).ok_or(Error::UnknownCategory(key))
  }
}
