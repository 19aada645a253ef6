//! Handlers for `/companies/:company_id/profile`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/companies/:company_id/profile` | 404 if never set |
//! | `PUT`  | `/companies/:company_id/profile` | Body: [`NewCompanyProfile`]; replaces the profile |

use axum::{
  Json,
  extract::{Path, State},
};
use footprint_core::{
  company::{CompanyProfile, NewCompanyProfile},
  store::FootprintStore,
};
use uuid::Uuid;

use crate::{Engine, error::ApiError};

/// `GET /companies/:company_id/profile`
pub async fn get_one<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(company_id): Path<Uuid>,
) -> Result<Json<CompanyProfile>, ApiError> {
  let profile = engine
    .store()
    .get_profile(company_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no profile for company {company_id}")))?;
  Ok(Json(profile))
}

/// `PUT /companies/:company_id/profile`
pub async fn put_one<S: FootprintStore>(
  State(engine): State<Engine<S>>,
  Path(company_id): Path<Uuid>,
  Json(body): Json<NewCompanyProfile>,
) -> Result<Json<CompanyProfile>, ApiError> {
  let profile = engine
    .store()
    .put_profile(company_id, body)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(profile))
}
