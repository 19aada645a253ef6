//! Handlers for the footprint summary, stateless calculation, and the factor
//! table snapshot.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/companies/:company_id/summary` | Optional `window_end` for data-quality fields |
//! | `POST` | `/calculate` | Body: [`RawActivity`]; nothing is stored |
//! | `GET`  | `/factors` | The factor table currently in effect |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::NaiveDate;
use footprint_core::{
  engine::CalculatedActivity,
  entry::RawActivity,
  factor::FactorTableFile,
  store::FootprintStore,
  summary::FootprintSummary,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{Engine, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  pub window_end: Option<NaiveDate>,
}

/// `GET /companies/:company_id/summary`
pub async fn summary<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(company_id): Path<Uuid>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<FootprintSummary>, ApiError> {
  Ok(Json(engine.summarize(company_id, params.window_end).await?))
}

/// `POST /calculate`
pub async fn calculate<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Json(body): Json<RawActivity>,
) -> Result<Json<CalculatedActivity>, ApiError> {
  Ok(Json(engine.calculate(&body)?))
}

/// `GET /factors`
pub async fn factors<S: FootprintStore>(State(engine): State<Engine<S>>) -> Json<FactorTableFile> {
  Json(engine.factor_table().snapshot())
}
