//! Handlers for facilities, monthly operations records, and their aggregate.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/companies/:company_id/facilities` | |
//! | `POST` | `/companies/:company_id/facilities` | Body: `{"name":"..."}`; returns 201 |
//! | `GET`  | `/companies/:company_id/monthly-records` | Optional `facility_id` (or `company`), `from`, `to` |
//! | `PUT`  | `/companies/:company_id/monthly-records` | Body: [`RecordBody`]; upsert on `(facility, month)` |
//! | `GET`  | `/companies/:company_id/aggregate` | Optional `window_end`, `window_months` (1 to 120) |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use footprint_core::{
  aggregate::MonthlyAggregatedData,
  facility::{
    Facility, MAX_WINDOW_MONTHS, MonthlyFacilityRecord, MonthlyReadings, NewFacilityRecord,
    check_window, month_start,
  },
  store::{FacilityFilter, FootprintStore, RecordQuery},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{Engine, error::ApiError};

// ─── Facilities ───────────────────────────────────────────────────────────────

/// `GET /companies/:company_id/facilities`
pub async fn list<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(company_id): Path<Uuid>,
) -> Result<Json<Vec<Facility>>, ApiError> {
  let facilities = engine
    .store()
    .list_facilities(company_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(facilities))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name: String,
}

/// `POST /companies/:company_id/facilities`
pub async fn create<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(company_id): Path<Uuid>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let name = body.name.trim();
  if name.is_empty() {
    return Err(ApiError::BadRequest("facility name must not be empty".into()));
  }
  let facility = engine
    .store()
    .add_facility(company_id, name.to_owned())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(facility)))
}

// ─── Monthly records ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecordParams {
  /// Restrict to one facility's records.
  pub facility_id: Option<Uuid>,
  /// If `true`, only company-wide records (no facility). Default `false`.
  #[serde(default)]
  pub company:     bool,
  pub from:        Option<NaiveDate>,
  pub to:          Option<NaiveDate>,
}

/// `GET /companies/:company_id/monthly-records`
pub async fn list_records<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(company_id): Path<Uuid>,
  Query(params): Query<RecordParams>,
) -> Result<Json<Vec<MonthlyFacilityRecord>>, ApiError> {
  let facility = match (params.facility_id, params.company) {
    (Some(_), true) => {
      return Err(ApiError::BadRequest("facility_id and company are exclusive".into()));
    }
    (Some(id), false) => FacilityFilter::Facility(id),
    (None, true) => FacilityFilter::CompanyWide,
    (None, false) => FacilityFilter::All,
  };
  let records = engine
    .store()
    .list_facility_records(RecordQuery {
      company_id,
      facility,
      from: params.from.map(month_start),
      to: params.to.map(month_start),
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

/// JSON body accepted by `PUT /companies/:company_id/monthly-records`.
#[derive(Debug, Deserialize)]
pub struct RecordBody {
  #[serde(default)]
  pub facility_id: Option<Uuid>,
  /// Any day of the month; normalised to day 1.
  pub month:       NaiveDate,
  #[serde(flatten)]
  pub readings:    MonthlyReadings,
}

/// `PUT /companies/:company_id/monthly-records`
pub async fn upsert_record<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(company_id): Path<Uuid>,
  Json(body): Json<RecordBody>,
) -> Result<Json<MonthlyFacilityRecord>, ApiError> {
  // The facility must belong to the company in the path; checked by the engine.
  let record = engine
    .upsert_monthly_record(NewFacilityRecord::new(
      company_id,
      body.facility_id,
      body.month,
      body.readings,
    ))
    .await?;
  Ok(Json(record))
}

// ─── Aggregate ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AggregateParams {
  /// Last month of the window. Defaults to the current month.
  pub window_end:    Option<NaiveDate>,
  pub window_months: Option<u32>,
}

/// `GET /companies/:company_id/aggregate`
pub async fn aggregate<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(company_id): Path<Uuid>,
  Query(params): Query<AggregateParams>,
) -> Result<Json<MonthlyAggregatedData>, ApiError> {
  if let Some(months) = params.window_months {
    check_window(months).map_err(|_| {
      ApiError::BadRequest(format!("window_months must be between 1 and {MAX_WINDOW_MONTHS}"))
    })?;
  }
  let agg = engine
    .aggregate(company_id, params.window_end, params.window_months)
    .await?;
  Ok(Json(agg))
}
