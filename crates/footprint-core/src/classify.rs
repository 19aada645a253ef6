//! The activity classifier.
//!
//! Turns a [`RawActivity`] into a [`NewEntry`], or rejects it. Nothing is
//! reclassified: a category submitted under the wrong scope is an error, as
//! is a unit the category does not declare.

use std::str::FromStr as _;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
  Error, Result,
  category::{Category, Scope, Unit},
  entry::{EntrySource, NewEntry, RawActivity, RawQuantity},
  facility::month_start,
};

/// Resolve `key` and check it belongs to the declared scope.
pub fn classify(declared_scope: u8, key: &str) -> Result<Category> {
  let declared = Scope::try_from(declared_scope)?;
  let category =
    Category::from_key(key).ok_or_else(|| Error::UnknownCategory(key.to_owned()))?;
  if category.scope() != declared {
    return Err(Error::InvalidCategoryForScope { category, declared });
  }
  Ok(category)
}

/// Parse `unit` and check the category accepts it.
pub fn parse_unit(category: Category, unit: &str) -> Result<Unit> {
  let unsupported = || Error::UnsupportedUnit { category, unit: unit.to_owned() };
  let parsed = Unit::from_str(unit.trim()).map_err(|_| unsupported())?;
  if !category.supports_unit(parsed) {
    return Err(unsupported());
  }
  Ok(parsed)
}

/// Missing or blank quantities are zero. Negative and non-numeric ones are
/// rejected.
pub fn parse_quantity(raw: Option<&RawQuantity>) -> Result<Decimal> {
  let value = match raw {
    None => Decimal::ZERO,
    Some(RawQuantity::Number(d)) => *d,
    Some(RawQuantity::Text(t)) if t.trim().is_empty() => Decimal::ZERO,
    Some(RawQuantity::Text(t)) => Decimal::from_str(t.trim())
      .map_err(|_| Error::InvalidQuantity(format!("{t:?} is not a number")))?,
  };
  if value < Decimal::ZERO {
    return Err(Error::InvalidQuantity(format!("{value} is negative")));
  }
  Ok(value)
}

/// Validate a user-submitted activity for `company_id`.
pub fn validate_manual(company_id: Uuid, raw: &RawActivity) -> Result<NewEntry> {
  let category = classify(raw.scope, &raw.category)?;
  if category.automated() {
    return Err(Error::ManualEntryForAutomatedCategory(category));
  }
  let unit = parse_unit(category, &raw.unit)?;
  let value = parse_quantity(raw.value.as_ref())?;
  if raw.is_renewable && !category.renewable_option() {
    return Err(Error::RenewableNotSupported(category));
  }

  Ok(NewEntry {
    company_id,
    facility_id: raw.facility_id,
    category,
    value,
    unit,
    is_renewable: raw.is_renewable,
    source: EntrySource::Manual,
    month: raw.month.map(month_start),
    last_sync_date: None,
  })
}

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;

  use super::*;

  fn company() -> Uuid { Uuid::nil() }

  #[test]
  fn accepts_category_in_declared_scope() {
    let entry =
      validate_manual(company(), &RawActivity::new(1, "natural_gas", dec!(100), "m3"))
        .unwrap();
    assert_eq!(entry.category, Category::NATURAL_GAS);
    assert_eq!(entry.scope(), Scope::One);
    assert_eq!(entry.unit, Unit::M3);
    assert_eq!(entry.source, EntrySource::Manual);
  }

  #[test]
  fn rejects_category_in_wrong_scope() {
    let err = classify(1, "electricity").unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidCategoryForScope { category: Category::ELECTRICITY, declared: Scope::One }
    ));
  }

  #[test]
  fn rejects_unknown_category_and_scope() {
    assert!(matches!(classify(3, "teleportation"), Err(Error::UnknownCategory(_))));
    assert!(matches!(classify(4, "electricity"), Err(Error::InvalidScope(4))));
    assert!(matches!(classify(0, "electricity"), Err(Error::InvalidScope(0))));
  }

  #[test]
  fn rejects_manual_entry_for_automated_category() {
    let raw = RawActivity::new(3, "purchased_goods", dec!(12), "kg_co2e");
    assert!(matches!(
      validate_manual(company(), &raw),
      Err(Error::ManualEntryForAutomatedCategory(_))
    ));
  }

  #[test]
  fn rejects_unit_not_declared_for_category() {
    let raw = RawActivity::new(2, "electricity", dec!(10), "litres");
    assert!(matches!(
      validate_manual(company(), &raw),
      Err(Error::UnsupportedUnit { .. })
    ));
    let raw = RawActivity::new(2, "electricity", dec!(10), "furlongs");
    assert!(matches!(
      validate_manual(company(), &raw),
      Err(Error::UnsupportedUnit { .. })
    ));
  }

  #[test]
  fn rejects_negative_and_non_numeric_quantities() {
    let raw = RawActivity::new(1, "diesel", dec!(-1), "litres");
    assert!(matches!(validate_manual(company(), &raw), Err(Error::InvalidQuantity(_))));

    let mut raw = RawActivity::new(1, "diesel", dec!(0), "litres");
    raw.value = Some(RawQuantity::Text("lots".into()));
    assert!(matches!(validate_manual(company(), &raw), Err(Error::InvalidQuantity(_))));
  }

  #[test]
  fn missing_or_blank_quantity_is_zero() {
    let mut raw = RawActivity::new(1, "diesel", dec!(0), "litres");
    raw.value = None;
    assert_eq!(validate_manual(company(), &raw).unwrap().value, Decimal::ZERO);

    raw.value = Some(RawQuantity::Text("  ".into()));
    assert_eq!(validate_manual(company(), &raw).unwrap().value, Decimal::ZERO);

    raw.value = Some(RawQuantity::Text("12.50".into()));
    assert_eq!(validate_manual(company(), &raw).unwrap().value, dec!(12.5));
  }

  #[test]
  fn renewable_flag_only_on_eligible_categories() {
    let raw = RawActivity::new(1, "natural_gas", dec!(1), "m3").renewable(true);
    assert!(matches!(
      validate_manual(company(), &raw),
      Err(Error::RenewableNotSupported(_))
    ));
    let raw = RawActivity::new(2, "electricity", dec!(1), "kWh").renewable(true);
    assert!(validate_manual(company(), &raw).unwrap().is_renewable);
  }

  #[test]
  fn month_is_normalised_to_first_day() {
    let mut raw = RawActivity::new(2, "electricity", dec!(1), "kWh");
    raw.month = chrono::NaiveDate::from_ymd_opt(2024, 3, 17);
    let entry = validate_manual(company(), &raw).unwrap();
    assert_eq!(entry.month, chrono::NaiveDate::from_ymd_opt(2024, 3, 1));
  }

  #[test]
  fn raw_quantity_accepts_numbers_and_strings() {
    let q: RawQuantity = serde_json::from_str("100").unwrap();
    assert_eq!(parse_quantity(Some(&q)).unwrap(), dec!(100));
    let q: RawQuantity = serde_json::from_str("\"2.5\"").unwrap();
    assert_eq!(parse_quantity(Some(&q)).unwrap(), dec!(2.5));
    let q: RawQuantity = serde_json::from_str("\"n/a\"").unwrap();
    assert!(parse_quantity(Some(&q)).is_err());
  }
}
