//! JSON REST API for the footprint engine.
//!
//! Exposes an axum [`Router`] backed by a [`FootprintEngine`] over any
//! [`footprint_core::store::FootprintStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", footprint_api::api_router(engine.clone()))
//! ```

pub mod entries;
pub mod error;
pub mod facilities;
pub mod footprint;
pub mod profile;
pub mod sync;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use footprint_core::{FootprintEngine, store::FootprintStore};

pub use error::ApiError;

/// Shared handler state.
pub type Engine<S> = Arc<FootprintEngine<S>>;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Engine<S>) -> Router<()>
where
  S: FootprintStore + 'static,
{
  Router::new()
    // Activity entries
    .route(
      "/companies/{company_id}/entries",
      get(entries::list::<S>).post(entries::create::<S>),
    )
    .route("/entries/{id}", get(entries::get_one::<S>).delete(entries::delete_one::<S>))
    // Company profile
    .route(
      "/companies/{company_id}/profile",
      get(profile::get_one::<S>).put(profile::put_one::<S>),
    )
    // Facilities and operations data
    .route(
      "/companies/{company_id}/facilities",
      get(facilities::list::<S>).post(facilities::create::<S>),
    )
    .route(
      "/companies/{company_id}/monthly-records",
      get(facilities::list_records::<S>).put(facilities::upsert_record::<S>),
    )
    .route("/companies/{company_id}/aggregate", get(facilities::aggregate::<S>))
    // Reconciliation
    .route("/companies/{company_id}/sync", post(sync::handler::<S>))
    // Footprint
    .route("/companies/{company_id}/summary", get(footprint::summary::<S>))
    .route("/calculate", post(footprint::calculate::<S>))
    .route("/factors", get(footprint::factors::<S>))
    .with_state(engine)
}

#[cfg(test)]
mod tests;
