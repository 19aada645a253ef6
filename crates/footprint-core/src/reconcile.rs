//! The automated/manual reconciler.
//!
//! Each sync cycle produces a fresh list of [`AutomatedCandidate`]s. The
//! reconciler compares them with the entries already stored for the company
//! and decides, per candidate, whether to insert it, skip it as a duplicate,
//! or (under [`ResyncPolicy::ReplaceAutomated`]) refresh an existing
//! automated entry in place. Manual entries are never modified.
//!
//! Duplicate detection, first match wins:
//!
//! 1. an automated entry with the same `(scope, category)`;
//! 2. any entry with the same `(scope, category)` and an equal numeric
//!    value (covers rows written before entries carried a source tag).
//!
//! # Resync behaviour
//!
//! Under the default [`ResyncPolicy::KeepExisting`], an automated entry is
//! never refreshed once written: if next month's operations data changes the
//! electricity total, the stored value stays stale until that row is deleted.
//! This is the long-standing behaviour and downstream reports may rely on it.
//! [`ResyncPolicy::ReplaceAutomated`] opts into in-place refresh instead.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  category::{Category, Scope, Unit},
  entry::{ActivityEntry, EntrySource, NewEntry},
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// What to do when a candidate matches an existing automated entry whose
/// value differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncPolicy {
  /// Discard the candidate; the stored entry keeps its original value.
  #[default]
  KeepExisting,
  /// Overwrite the stored automated entry's value and unit.
  ReplaceAutomated,
}

/// An automated entry proposed by the operations subsystem or an external
/// calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomatedCandidate {
  pub category:    Category,
  pub value:       Decimal,
  pub unit:        Unit,
  #[serde(default)]
  pub facility_id: Option<Uuid>,
  #[serde(default)]
  pub month:       Option<NaiveDate>,
}

impl AutomatedCandidate {
  pub fn new(category: Category, value: Decimal, unit: Unit) -> Self {
    Self { category, value, unit, facility_id: None, month: None }
  }

  pub fn scope(&self) -> Scope { self.category.scope() }

  fn key(&self) -> (Scope, Category) { (self.scope(), self.category) }

  /// Candidates are machine-generated, but they still go through the same
  /// unit and quantity checks as manual input.
  pub fn validate(&self) -> Result<()> {
    if !self.category.supports_unit(self.unit) {
      return Err(Error::UnsupportedUnit {
        category: self.category,
        unit:     self.unit.to_string(),
      });
    }
    if self.value < Decimal::ZERO {
      return Err(Error::InvalidQuantity(format!("{} is negative", self.value)));
    }
    Ok(())
  }
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

/// Why a candidate was treated as a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReason {
  /// An automated entry for the same `(scope, category)` exists.
  AutomatedEntryExists,
  /// An entry for the same `(scope, category)` has the same value.
  MatchingValue,
  /// An earlier candidate in the same batch already claimed the key.
  RepeatedInBatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
  Insert(NewEntry),
  Skip {
    candidate: AutomatedCandidate,
    existing:  Option<Uuid>,
    reason:    DuplicateReason,
  },
  Replace {
    entry_id: Uuid,
    value:    Decimal,
    unit:     Unit,
  },
}

// ─── Planning ────────────────────────────────────────────────────────────────

fn find_duplicate<'a>(
  existing: &'a [ActivityEntry],
  candidate: &AutomatedCandidate,
) -> Option<(&'a ActivityEntry, DuplicateReason)> {
  let same_key = |e: &&ActivityEntry| e.scope == candidate.scope() && e.category == candidate.category;

  existing
    .iter()
    .filter(same_key)
    .find(|e| e.source.is_automated())
    .map(|e| (e, DuplicateReason::AutomatedEntryExists))
    .or_else(|| {
      existing
        .iter()
        .filter(same_key)
        .find(|e| e.value == candidate.value)
        .map(|e| (e, DuplicateReason::MatchingValue))
    })
}

/// Decide what to do with each candidate. Pure: the caller applies the
/// actions, under a per-company lock.
///
/// Every candidate must already have passed [`AutomatedCandidate::validate`].
pub fn plan(
  company_id: Uuid,
  existing: &[ActivityEntry],
  candidates: Vec<AutomatedCandidate>,
  policy: ResyncPolicy,
  synced_at: DateTime<Utc>,
) -> Vec<ReconcileAction> {
  let existing: Vec<ActivityEntry> =
    existing.iter().filter(|e| e.company_id == company_id).cloned().collect();
  let mut claimed: HashSet<(Scope, Category)> = HashSet::new();

  candidates
    .into_iter()
    .map(|candidate| {
      if !claimed.insert(candidate.key()) {
        return ReconcileAction::Skip {
          candidate,
          existing: None,
          reason: DuplicateReason::RepeatedInBatch,
        };
      }

      match find_duplicate(&existing, &candidate) {
        Some((entry, DuplicateReason::AutomatedEntryExists))
          if policy == ResyncPolicy::ReplaceAutomated
            && (entry.value != candidate.value || entry.unit != candidate.unit) =>
        {
          ReconcileAction::Replace {
            entry_id: entry.entry_id,
            value:    candidate.value,
            unit:     candidate.unit,
          }
        }
        Some((entry, reason)) => ReconcileAction::Skip {
          candidate,
          existing: Some(entry.entry_id),
          reason,
        },
        None => ReconcileAction::Insert(NewEntry {
          company_id,
          facility_id: candidate.facility_id,
          category: candidate.category,
          value: candidate.value,
          unit: candidate.unit,
          is_renewable: false,
          source: EntrySource::AutomatedFromOperations,
          month: candidate.month,
          last_sync_date: Some(synced_at),
        }),
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;

  use super::*;

  fn stored(
    company_id: Uuid,
    category: Category,
    value: Decimal,
    unit: Unit,
    source: EntrySource,
  ) -> ActivityEntry {
    ActivityEntry {
      entry_id: Uuid::new_v4(),
      company_id,
      facility_id: None,
      scope: category.scope(),
      category,
      value,
      unit,
      is_renewable: false,
      source,
      month: None,
      recorded_at: Utc::now(),
      last_sync_date: None,
    }
  }

  fn inserted(actions: &[ReconcileAction]) -> Vec<&NewEntry> {
    actions
      .iter()
      .filter_map(|a| match a {
        ReconcileAction::Insert(e) => Some(e),
        _ => None,
      })
      .collect()
  }

  #[test]
  fn inserts_when_nothing_matches() {
    let company = Uuid::new_v4();
    let now = Utc::now();
    let actions = plan(
      company,
      &[],
      vec![AutomatedCandidate::new(Category::ELECTRICITY, dec!(3300), Unit::Kwh)],
      ResyncPolicy::KeepExisting,
      now,
    );
    let ins = inserted(&actions);
    assert_eq!(ins.len(), 1);
    assert_eq!(ins[0].source, EntrySource::AutomatedFromOperations);
    assert_eq!(ins[0].last_sync_date, Some(now));
    assert_eq!(ins[0].company_id, company);
  }

  #[test]
  fn skips_when_automated_entry_exists() {
    let company = Uuid::new_v4();
    let existing = vec![stored(
      company,
      Category::ELECTRICITY,
      dec!(3300),
      Unit::Kwh,
      EntrySource::AutomatedFromOperations,
    )];
    let actions = plan(
      company,
      &existing,
      vec![AutomatedCandidate::new(Category::ELECTRICITY, dec!(3300), Unit::Kwh)],
      ResyncPolicy::KeepExisting,
      Utc::now(),
    );
    assert!(matches!(
      &actions[..],
      [ReconcileAction::Skip { reason: DuplicateReason::AutomatedEntryExists, existing: Some(id), .. }]
        if *id == existing[0].entry_id
    ));
  }

  #[test]
  fn keep_existing_leaves_stale_automated_value() {
    let company = Uuid::new_v4();
    let existing = vec![stored(
      company,
      Category::ELECTRICITY,
      dec!(3300),
      Unit::Kwh,
      EntrySource::AutomatedFromOperations,
    )];
    let actions = plan(
      company,
      &existing,
      vec![AutomatedCandidate::new(Category::ELECTRICITY, dec!(4100), Unit::Kwh)],
      ResyncPolicy::KeepExisting,
      Utc::now(),
    );
    assert!(matches!(&actions[..], [ReconcileAction::Skip { .. }]));
  }

  #[test]
  fn replace_policy_refreshes_changed_automated_value() {
    let company = Uuid::new_v4();
    let existing = vec![stored(
      company,
      Category::ELECTRICITY,
      dec!(3300),
      Unit::Kwh,
      EntrySource::AutomatedFromOperations,
    )];
    let actions = plan(
      company,
      &existing,
      vec![
        AutomatedCandidate::new(Category::ELECTRICITY, dec!(4100), Unit::Kwh),
      ],
      ResyncPolicy::ReplaceAutomated,
      Utc::now(),
    );
    assert_eq!(actions, vec![ReconcileAction::Replace {
      entry_id: existing[0].entry_id,
      value:    dec!(4100),
      unit:     Unit::Kwh,
    }]);

    let unchanged = plan(
      company,
      &existing,
      vec![AutomatedCandidate::new(Category::ELECTRICITY, dec!(3300), Unit::Kwh)],
      ResyncPolicy::ReplaceAutomated,
      Utc::now(),
    );
    assert!(matches!(&unchanged[..], [ReconcileAction::Skip { .. }]));
  }

  #[test]
  fn manual_entry_with_equal_value_suppresses_candidate() {
    let company = Uuid::new_v4();
    let existing =
      vec![stored(company, Category::NATURAL_GAS, dec!(250.0), Unit::M3, EntrySource::Manual)];
    let actions = plan(
      company,
      &existing,
      vec![AutomatedCandidate::new(Category::NATURAL_GAS, dec!(250), Unit::M3)],
      ResyncPolicy::ReplaceAutomated,
      Utc::now(),
    );
    assert!(matches!(
      &actions[..],
      [ReconcileAction::Skip { reason: DuplicateReason::MatchingValue, .. }]
    ));
  }

  #[test]
  fn manual_entry_with_different_value_does_not_suppress() {
    let company = Uuid::new_v4();
    let existing =
      vec![stored(company, Category::NATURAL_GAS, dec!(100), Unit::M3, EntrySource::Manual)];
    let actions = plan(
      company,
      &existing,
      vec![AutomatedCandidate::new(Category::NATURAL_GAS, dec!(250), Unit::M3)],
      ResyncPolicy::KeepExisting,
      Utc::now(),
    );
    assert_eq!(inserted(&actions).len(), 1);
  }

  #[test]
  fn repeated_candidates_in_one_batch_insert_once() {
    let company = Uuid::new_v4();
    let candidate = AutomatedCandidate::new(Category::ELECTRICITY, dec!(10), Unit::Kwh);
    let actions = plan(
      company,
      &[],
      vec![candidate.clone(), candidate],
      ResyncPolicy::KeepExisting,
      Utc::now(),
    );
    assert_eq!(inserted(&actions).len(), 1);
    assert!(matches!(
      actions[1],
      ReconcileAction::Skip { reason: DuplicateReason::RepeatedInBatch, .. }
    ));
  }

  #[test]
  fn other_companies_entries_are_ignored() {
    let company = Uuid::new_v4();
    let existing = vec![stored(
      Uuid::new_v4(),
      Category::ELECTRICITY,
      dec!(10),
      Unit::Kwh,
      EntrySource::AutomatedFromOperations,
    )];
    let actions = plan(
      company,
      &existing,
      vec![AutomatedCandidate::new(Category::ELECTRICITY, dec!(10), Unit::Kwh)],
      ResyncPolicy::KeepExisting,
      Utc::now(),
    );
    assert_eq!(inserted(&actions).len(), 1);
  }

  #[test]
  fn candidate_validation() {
    assert!(AutomatedCandidate::new(Category::ELECTRICITY, dec!(1), Unit::Kwh).validate().is_ok());
    assert!(matches!(
      AutomatedCandidate::new(Category::ELECTRICITY, dec!(1), Unit::M3).validate(),
      Err(Error::UnsupportedUnit { .. })
    ));
    assert!(matches!(
      AutomatedCandidate::new(Category::ELECTRICITY, dec!(-1), Unit::Kwh).validate(),
      Err(Error::InvalidQuantity(_))
    ));
  }
}
