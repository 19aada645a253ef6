//! Error types for `footprint-core`.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::category::{Category, Scope, Unit};

#[derive(Debug, Error)]
pub enum Error {
  #[error("no emission factor for {category} in {unit}")]
  FactorNotFound { category: Category, unit: Unit },

  #[error("category {category} does not belong to {declared}")]
  InvalidCategoryForScope { category: Category, declared: Scope },

  #[error("invalid quantity: {0}")]
  InvalidQuantity(String),

  #[error("window of {0} months is outside 1..={max}", max = crate::facility::MAX_WINDOW_MONTHS)]
  InvalidWindow(u32),

  #[error("facility {0} does not belong to this company")]
  UnknownFacility(Uuid),

  #[error("invalid scope: {0} (expected 1, 2 or 3)")]
  InvalidScope(u8),

  #[error("unknown category: {0:?}")]
  UnknownCategory(String),

  #[error("unit {unit:?} is not accepted for {category}")]
  UnsupportedUnit { category: Category, unit: String },

  #[error("{0} has no renewable option")]
  RenewableNotSupported(Category),

  #[error("{0} is populated automatically and does not accept manual entries")]
  ManualEntryForAutomatedCategory(Category),

  #[error("duplicate emission factor for {category} in {unit}")]
  DuplicateFactor { category: Category, unit: Unit },

  #[error("{0} cannot carry a renewable factor")]
  RenewableFactorNotAllowed(Category),

  #[error("negative emission factor {factor} for {category}")]
  NegativeFactor { category: Category, factor: Decimal },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
