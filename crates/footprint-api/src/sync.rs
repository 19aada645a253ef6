//! Handler for `POST /companies/:company_id/sync`.
//!
//! Runs one reconciliation cycle: candidates are derived from the company's
//! operations data over the configured window, and any externally computed
//! candidates in the body are appended. Returns the [`SyncReport`].
//!
//! Body (all fields optional): `{"window_end":"2024-03-01","candidates":[...]}`

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::NaiveDate;
use footprint_core::{engine::SyncReport, reconcile::AutomatedCandidate, store::FootprintStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::{Engine, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SyncBody {
  pub window_end: Option<NaiveDate>,
  pub candidates: Vec<AutomatedCandidate>,
}

/// `POST /companies/:company_id/sync`
pub async fn handler<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(company_id): Path<Uuid>,
  Json(body): Json<SyncBody>,
) -> Result<Json<SyncReport>, ApiError> {
  let report = engine
    .sync_automated(company_id, body.window_end, body.candidates)
    .await?;
  Ok(Json(report))
}
