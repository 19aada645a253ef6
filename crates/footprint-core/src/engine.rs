//! [`FootprintEngine`], request-scoped orchestration over a store.
//!
//! The engine holds no mutable domain state of its own. Every call reads the
//! current persisted data, computes, and returns. The two pieces of shared
//! state are the factor table (swapped wholesale, never mutated) and the
//! per-company locks that serialise reconciliation.

use std::{
  collections::BTreeSet,
  sync::{Arc, PoisonError, RwLock},
};

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  aggregate::{MonthlyAggregatedData, QualityThresholds, aggregate},
  calculate::{Calculator, ElectricityMethod},
  category::{Category, Scope, Unit},
  classify::validate_manual,
  company::BenchmarkTable,
  entry::{ActivityEntry, RawActivity},
  facility::{MonthlyFacilityRecord, NewFacilityRecord, check_window, trailing_months},
  factor::FactorTable,
  operations::candidates_from_operations,
  reconcile::{AutomatedCandidate, DuplicateReason, ReconcileAction, ResyncPolicy, plan},
  store::{FacilityFilter, FootprintStore, RecordQuery},
  summary::{FootprintSummary, SummaryInput, summarize},
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Trailing months considered by aggregation and summaries.
  pub window_months:      u32,
  pub quality:            QualityThresholds,
  pub resync_policy:      ResyncPolicy,
  pub electricity_method: ElectricityMethod,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      window_months:      12,
      quality:            QualityThresholds::default(),
      resync_policy:      ResyncPolicy::default(),
      electricity_method: ElectricityMethod::default(),
    }
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError<E> {
  /// The input was rejected; nothing was written.
  #[error("validation failed: {0}")]
  Validation(#[from] crate::Error),

  #[error("store error: {0}")]
  Store(#[source] E),
}

pub type EngineResult<T, E> = std::result::Result<T, EngineError<E>>;

// ─── Results ─────────────────────────────────────────────────────────────────

/// A priced activity that was not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedActivity {
  pub scope:                Scope,
  pub category:             Category,
  pub value:                Decimal,
  pub unit:                 Unit,
  pub is_renewable:         bool,
  pub co2e_kg:              Decimal,
  pub factor_table_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCandidate {
  pub category: Category,
  pub value:    Decimal,
  pub unit:     Unit,
  /// The stored entry the candidate collided with, when known.
  pub existing: Option<Uuid>,
  pub reason:   DuplicateReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
  pub company_id: Uuid,
  pub synced_at:  DateTime<Utc>,
  pub inserted:   Vec<ActivityEntry>,
  pub replaced:   Vec<ActivityEntry>,
  pub skipped:    Vec<SkippedCandidate>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct FootprintEngine<S> {
  store:      Arc<S>,
  factors:    RwLock<Arc<FactorTable>>,
  benchmarks: Arc<BenchmarkTable>,
  config:     EngineConfig,
  locks:      DashMap<Uuid, Arc<Mutex<()>>>,
}

impl<S: FootprintStore> FootprintEngine<S> {
  pub fn new(store: Arc<S>, factors: FactorTable, config: EngineConfig) -> Self {
    Self {
      store,
      factors: RwLock::new(Arc::new(factors)),
      benchmarks: Arc::new(BenchmarkTable::builtin()),
      config,
      locks: DashMap::new(),
    }
  }

  pub fn with_benchmarks(mut self, benchmarks: BenchmarkTable) -> Self {
    self.benchmarks = Arc::new(benchmarks);
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  /// The factor table in effect right now.
  pub fn factor_table(&self) -> Arc<FactorTable> {
    self.factors.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Supersede the factor table. In-flight calls keep the table they
  /// started with. Returns the previous table.
  pub fn replace_factor_table(&self, table: FactorTable) -> Arc<FactorTable> {
    let mut guard = self.factors.write().unwrap_or_else(PoisonError::into_inner);
    info!(from = guard.version(), to = table.version(), "factor table replaced");
    std::mem::replace(&mut *guard, Arc::new(table))
  }

  fn company_lock(&self, company_id: Uuid) -> Arc<Mutex<()>> {
    self.locks.entry(company_id).or_default().clone()
  }

  /// Drop the company's lock once nobody else holds or waits on it. Callers
  /// must have released their own guard and handle first.
  fn release_company_lock(&self, company_id: Uuid) {
    self.locks.remove_if(&company_id, |_, lock| Arc::strong_count(lock) == 1);
  }

  /// Companies with a reconciliation running or queued.
  pub fn locked_companies(&self) -> usize { self.locks.len() }

  /// Fail unless `facility_id` is absent or names a facility registered to
  /// `company_id`.
  async fn check_facility(
    &self,
    company_id: Uuid,
    facility_id: Option<Uuid>,
  ) -> EngineResult<(), S::Error> {
    let Some(facility_id) = facility_id else {
      return Ok(());
    };
    match self.store.get_facility(facility_id).await.map_err(EngineError::Store)? {
      Some(facility) if facility.company_id == company_id => Ok(()),
      _ => Err(crate::Error::UnknownFacility(facility_id).into()),
    }
  }

  fn default_window_end() -> NaiveDate { Utc::now().date_naive() }

  // ── Stateless calculation ───────────────────────────────────────────────

  /// Validate and price `raw` without storing it.
  pub fn calculate(&self, raw: &RawActivity) -> crate::Result<CalculatedActivity> {
    let entry = validate_manual(Uuid::nil(), raw)?;
    let table = self.factor_table();
    let co2e_kg = Calculator::new(&table)
      .with_method(self.config.electricity_method)
      .calculate(&entry)?;
    Ok(CalculatedActivity {
      scope: entry.scope(),
      category: entry.category,
      value: entry.value,
      unit: entry.unit,
      is_renewable: entry.is_renewable,
      co2e_kg,
      factor_table_version: table.version().to_owned(),
    })
  }

  // ── Writes ───────────────────────────────────────────────────────────────

  /// Validate and store a manual entry. An entry the current factor table
  /// cannot price is rejected rather than stored.
  pub async fn record_manual_entry(
    &self,
    company_id: Uuid,
    raw: &RawActivity,
  ) -> EngineResult<ActivityEntry, S::Error> {
    let entry = validate_manual(company_id, raw)?;
    Calculator::new(&self.factor_table()).calculate(&entry)?;
    self.check_facility(company_id, entry.facility_id).await?;
    let stored = self.store.record_entry(entry).await.map_err(EngineError::Store)?;
    debug!(entry_id = %stored.entry_id, %company_id, category = %stored.category, "manual entry recorded");
    Ok(stored)
  }

  pub async fn upsert_monthly_record(
    &self,
    input: NewFacilityRecord,
  ) -> EngineResult<MonthlyFacilityRecord, S::Error> {
    if let Some(v) = input.readings.first_negative() {
      return Err(crate::Error::InvalidQuantity(format!("{v} is negative")).into());
    }
    self.check_facility(input.company_id, input.facility_id).await?;
    let input = NewFacilityRecord::new(
      input.company_id,
      input.facility_id,
      input.month,
      input.readings,
    );
    self.store.upsert_facility_record(input).await.map_err(EngineError::Store)
  }

  // ── Aggregation ─────────────────────────────────────────────────────────

  /// Roll up the company's monthly records over the trailing window ending
  /// at `window_end` (default: the current month). The window must be
  /// between one and [`MAX_WINDOW_MONTHS`](crate::facility::MAX_WINDOW_MONTHS)
  /// months long.
  pub async fn aggregate(
    &self,
    company_id: Uuid,
    window_end: Option<NaiveDate>,
    window_months: Option<u32>,
  ) -> EngineResult<MonthlyAggregatedData, S::Error> {
    let window_end = window_end.unwrap_or_else(Self::default_window_end);
    let window_months = check_window(window_months.unwrap_or(self.config.window_months))?;
    let months = trailing_months(window_end, window_months);

    let records = match (months.first(), months.last()) {
      (Some(&from), Some(&to)) => self
        .store
        .list_facility_records(RecordQuery {
          company_id,
          facility: FacilityFilter::All,
          from: Some(from),
          to: Some(to),
        })
        .await
        .map_err(EngineError::Store)?,
      _ => Vec::new(),
    };

    Ok(aggregate(company_id, &records, window_end, window_months, &self.config.quality))
  }

  // ── Reconciliation ──────────────────────────────────────────────────────

  /// One sync cycle: aggregate operations data, derive candidates, append
  /// any externally computed ones, and reconcile.
  pub async fn sync_automated(
    &self,
    company_id: Uuid,
    window_end: Option<NaiveDate>,
    external: Vec<AutomatedCandidate>,
  ) -> EngineResult<SyncReport, S::Error> {
    let operations = self.aggregate(company_id, window_end, None).await?;
    let mut candidates = candidates_from_operations(&operations);
    candidates.extend(external);
    self.reconcile(company_id, candidates).await
  }

  /// Insert each candidate at most once. Serialised per company; candidates
  /// are validated up front so an invalid batch writes nothing.
  pub async fn reconcile(
    &self,
    company_id: Uuid,
    candidates: Vec<AutomatedCandidate>,
  ) -> EngineResult<SyncReport, S::Error> {
    for candidate in &candidates {
      candidate.validate()?;
    }
    let facilities: BTreeSet<Uuid> = candidates.iter().filter_map(|c| c.facility_id).collect();
    for facility_id in facilities {
      self.check_facility(company_id, Some(facility_id)).await?;
    }

    let lock = self.company_lock(company_id);
    let guard = lock.lock().await;
    let report = self.reconcile_locked(company_id, candidates).await;
    drop(guard);
    drop(lock);
    self.release_company_lock(company_id);
    report
  }

  /// The body of [`Self::reconcile`]; the caller holds the company lock.
  async fn reconcile_locked(
    &self,
    company_id: Uuid,
    candidates: Vec<AutomatedCandidate>,
  ) -> EngineResult<SyncReport, S::Error> {
    let synced_at = Utc::now();
    let existing = self
      .store
      .list_entries(company_id, None)
      .await
      .map_err(EngineError::Store)?;

    let mut report = SyncReport {
      company_id,
      synced_at,
      inserted: Vec::new(),
      replaced: Vec::new(),
      skipped: Vec::new(),
    };

    for action in plan(company_id, &existing, candidates, self.config.resync_policy, synced_at) {
      match action {
        ReconcileAction::Insert(entry) => {
          let (category, value, unit) = (entry.category, entry.value, entry.unit);
          match self.store.record_automated_entry(entry).await.map_err(EngineError::Store)? {
            Some(stored) => report.inserted.push(stored),
            None => {
              debug!(%company_id, %category, "automated entry already stored");
              report.skipped.push(SkippedCandidate {
                category,
                value,
                unit,
                existing: None,
                reason: DuplicateReason::AutomatedEntryExists,
              });
            }
          }
        }
        ReconcileAction::Replace { entry_id, value, unit } => {
          match self
            .store
            .replace_automated_value(entry_id, value, unit, synced_at)
            .await
            .map_err(EngineError::Store)?
          {
            Some(updated) => report.replaced.push(updated),
            None => warn!(%entry_id, "automated entry vanished before it could be refreshed"),
          }
        }
        ReconcileAction::Skip { candidate, existing, reason } => {
          debug!(%company_id, category = %candidate.category, ?reason, "duplicate automated entry suppressed");
          report.skipped.push(SkippedCandidate {
            category: candidate.category,
            value: candidate.value,
            unit: candidate.unit,
            existing,
            reason,
          });
        }
      }
    }

    info!(
      %company_id,
      inserted = report.inserted.len(),
      replaced = report.replaced.len(),
      skipped = report.skipped.len(),
      "automated sync complete"
    );
    Ok(report)
  }

  // ── Summary ──────────────────────────────────────────────────────────────

  /// Build the company's footprint summary from current stored data.
  pub async fn summarize(
    &self,
    company_id: Uuid,
    window_end: Option<NaiveDate>,
  ) -> EngineResult<FootprintSummary, S::Error> {
    let entries = self
      .store
      .list_entries(company_id, None)
      .await
      .map_err(EngineError::Store)?;
    let profile = self.store.get_profile(company_id).await.map_err(EngineError::Store)?;
    let operations = self.aggregate(company_id, window_end, None).await?;

    let table = self.factor_table();
    let calc = Calculator::new(&table).with_method(self.config.electricity_method);
    Ok(summarize(&calc, SummaryInput {
      company_id,
      entries: &entries,
      operations: &operations,
      profile: profile.as_ref(),
      benchmarks: &self.benchmarks,
    }))
  }
}
