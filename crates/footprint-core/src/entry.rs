//! Activity entries: one reported quantity of a resource each.
//!
//! Manual entries are typed in by users. Automated entries are regenerated on
//! every sync cycle from facility operations data and reconciled against
//! what is already stored; they are never edited by hand.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::{Category, Scope, Unit};

// ─── Provenance ──────────────────────────────────────────────────────────────

/// How an entry entered the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
  /// Typed in by a user.
  #[default]
  Manual,
  /// Synthesised from monthly facility operations data.
  AutomatedFromOperations,
}

impl EntrySource {
  pub fn is_automated(self) -> bool { matches!(self, Self::AutomatedFromOperations) }
}

// ─── ActivityEntry ───────────────────────────────────────────────────────────

/// A persisted activity entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub entry_id:       Uuid,
  pub company_id:     Uuid,
  pub facility_id:    Option<Uuid>,
  pub scope:          Scope,
  pub category:       Category,
  /// Always `>= 0`.
  pub value:          Decimal,
  pub unit:           Unit,
  pub is_renewable:   bool,
  pub source:         EntrySource,
  /// The reporting month this entry belongs to, normalised to day 1.
  pub month:          Option<NaiveDate>,
  /// Server-assigned creation timestamp.
  pub recorded_at:    DateTime<Utc>,
  /// Set on automated entries by the sync cycle that wrote them.
  pub last_sync_date: Option<DateTime<Utc>>,
}

impl ActivityEntry {
  /// The month this entry reports on. Entries without an explicit month
  /// report on the month they were recorded in.
  pub fn reporting_month(&self) -> NaiveDate {
    self
      .month
      .unwrap_or_else(|| crate::facility::month_start(self.recorded_at.date_naive()))
  }
}

// ─── NewEntry ────────────────────────────────────────────────────────────────

/// A validated entry ready to be written. Only the classifier and the
/// reconciler construct these; `entry_id` and `recorded_at` are assigned by
/// the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
  pub company_id:     Uuid,
  pub facility_id:    Option<Uuid>,
  pub category:       Category,
  pub value:          Decimal,
  pub unit:           Unit,
  pub is_renewable:   bool,
  pub source:         EntrySource,
  pub month:          Option<NaiveDate>,
  pub last_sync_date: Option<DateTime<Utc>>,
}

impl NewEntry {
  pub fn scope(&self) -> Scope { self.category.scope() }
}

// ─── Raw input ───────────────────────────────────────────────────────────────

/// An unvalidated quantity as received from a client: either something that
/// parses as a decimal, or arbitrary text that will be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawQuantity {
  Number(Decimal),
  Text(String),
}

impl From<Decimal> for RawQuantity {
  fn from(d: Decimal) -> Self { Self::Number(d) }
}

/// An activity as submitted by a client, before classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawActivity {
  pub scope:        u8,
  pub category:     String,
  /// Missing means zero.
  #[serde(default)]
  pub value:        Option<RawQuantity>,
  pub unit:         String,
  #[serde(default)]
  pub is_renewable: bool,
  #[serde(default)]
  pub facility_id:  Option<Uuid>,
  #[serde(default)]
  pub month:        Option<NaiveDate>,
}

impl RawActivity {
  /// Convenience constructor with optional fields left empty.
  pub fn new(
    scope: u8,
    category: impl Into<String>,
    value: Decimal,
    unit: impl Into<String>,
  ) -> Self {
    Self {
      scope,
      category: category.into(),
      value: Some(RawQuantity::Number(value)),
      unit: unit.into(),
      is_renewable: false,
      facility_id: None,
      month: None,
    }
  }

  pub fn renewable(mut self, is_renewable: bool) -> Self {
    self.is_renewable = is_renewable;
    self
  }
}
