//! The `FootprintStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `footprint-store-sqlite`). The engine and the HTTP layer depend on this
//! abstraction, not on any concrete backend. Storage failures are returned
//! as-is; nothing at this layer retries.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
  category::{Scope, Unit},
  company::{CompanyProfile, NewCompanyProfile},
  entry::{ActivityEntry, NewEntry},
  facility::{Facility, MonthlyFacilityRecord, NewFacilityRecord},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Which facility's records to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FacilityFilter {
  /// Records for every facility plus company-wide records.
  #[default]
  All,
  /// Only records with no facility (company-wide aggregates).
  CompanyWide,
  Facility(Uuid),
}

/// Parameters for [`FootprintStore::list_facility_records`]. Bounds are
/// inclusive month starts.
#[derive(Debug, Clone)]
pub struct RecordQuery {
  pub company_id: Uuid,
  pub facility:   FacilityFilter,
  pub from:       Option<NaiveDate>,
  pub to:         Option<NaiveDate>,
}

impl RecordQuery {
  pub fn company(company_id: Uuid) -> Self {
    Self { company_id, facility: FacilityFilter::All, from: None, to: None }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a footprint store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait FootprintStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Activity entries ──────────────────────────────────────────────────

  /// Persist a validated entry. `entry_id` and `recorded_at` are assigned
  /// by the store.
  fn record_entry(
    &self,
    input: NewEntry,
  ) -> impl Future<Output = Result<ActivityEntry, Self::Error>> + Send + '_;

  /// Insert-or-skip for automated entries. Returns `None` when an automated
  /// entry for the same `(company_id, scope, category)` already exists; the
  /// backend must make this check atomic with the insert.
  fn record_automated_entry(
    &self,
    input: NewEntry,
  ) -> impl Future<Output = Result<Option<ActivityEntry>, Self::Error>> + Send + '_;

  /// Overwrite the value and unit of an automated entry and stamp
  /// `last_sync_date`. Returns `None` if no automated entry has that id.
  fn replace_automated_value(
    &self,
    entry_id: Uuid,
    value: Decimal,
    unit: Unit,
    synced_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<ActivityEntry>, Self::Error>> + Send + '_;

  fn get_entry(
    &self,
    entry_id: Uuid,
  ) -> impl Future<Output = Result<Option<ActivityEntry>, Self::Error>> + Send + '_;

  /// All entries for a company, oldest first, optionally for one scope.
  fn list_entries(
    &self,
    company_id: Uuid,
    scope: Option<Scope>,
  ) -> impl Future<Output = Result<Vec<ActivityEntry>, Self::Error>> + Send + '_;

  /// Delete one entry, manual or automated. Returns `false` if it did not
  /// exist.
  fn delete_entry(
    &self,
    entry_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Facilities ────────────────────────────────────────────────────────

  fn add_facility(
    &self,
    company_id: Uuid,
    name: String,
  ) -> impl Future<Output = Result<Facility, Self::Error>> + Send + '_;

  fn list_facilities(
    &self,
    company_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Facility>, Self::Error>> + Send + '_;

  fn get_facility(
    &self,
    facility_id: Uuid,
  ) -> impl Future<Output = Result<Option<Facility>, Self::Error>> + Send + '_;

  // ── Monthly facility records ──────────────────────────────────────────

  /// Insert or update the record keyed by `(company_id, facility_id,
  /// month)`. `month` must already be a month start.
  fn upsert_facility_record(
    &self,
    input: NewFacilityRecord,
  ) -> impl Future<Output = Result<MonthlyFacilityRecord, Self::Error>> + Send + '_;

  /// Records matching `query`, ordered by month.
  fn list_facility_records(
    &self,
    query: RecordQuery,
  ) -> impl Future<Output = Result<Vec<MonthlyFacilityRecord>, Self::Error>> + Send + '_;

  // ── Company profiles ──────────────────────────────────────────────────

  fn put_profile(
    &self,
    company_id: Uuid,
    input: NewCompanyProfile,
  ) -> impl Future<Output = Result<CompanyProfile, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    company_id: Uuid,
  ) -> impl Future<Output = Result<Option<CompanyProfile>, Self::Error>> + Send + '_;
}
