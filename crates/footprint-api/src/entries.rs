//! Handlers for activity entry endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/companies/:company_id/entries` | Optional `?scope=1\|2\|3` |
//! | `POST`   | `/companies/:company_id/entries` | Body: [`RawActivity`]; returns 201 |
//! | `GET`    | `/entries/:id` | 404 if not found |
//! | `DELETE` | `/entries/:id` | 204, or 404 if not found |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use footprint_core::{
  category::Scope,
  entry::{ActivityEntry, RawActivity},
  store::FootprintStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{Engine, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub scope: Option<u8>,
}

/// `GET /companies/:company_id/entries[?scope=<n>]`
pub async fn list<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(company_id): Path<Uuid>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
  let scope = params
    .scope
    .map(Scope::try_from)
    .transpose()
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
  let entries = engine
    .store()
    .list_entries(company_id, scope)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(entries))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /companies/:company_id/entries`. The entry must be priceable by
/// the current factor table.
pub async fn create<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(company_id): Path<Uuid>,
  Json(body): Json<RawActivity>,
) -> Result<impl IntoResponse, ApiError> {
  let entry = engine.record_manual_entry(company_id, &body).await?;
  Ok((StatusCode::CREATED, Json(entry)))
}

// ─── Get / delete ─────────────────────────────────────────────────────────────

/// `GET /entries/:id`
pub async fn get_one<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ActivityEntry>, ApiError> {
  let entry = engine
    .store()
    .get_entry(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("entry {id} not found")))?;
  Ok(Json(entry))
}

/// `DELETE /entries/:id`. A deleted automated entry is recreated by the
/// next sync.
pub async fn delete_one<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if engine.store().delete_entry(id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("entry {id} not found")))
  }
}
