//! Router tests over an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Method, Request, StatusCode},
};
use footprint_core::{EngineConfig, FootprintEngine, factor::FactorTable};
use footprint_store_sqlite::SqliteStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::api_router;

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let engine = FootprintEngine::new(Arc::new(store), FactorTable::builtin(), EngineConfig::default());
  api_router(Arc::new(engine))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let request = Request::builder().method(method).uri(uri);
  let request = match body {
    Some(body) => request
      .header("content-type", "application/json")
      .body(Body::from(body.to_string())),
    None => request.body(Body::empty()),
  }
  .unwrap();

  let response = app.clone().oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, value)
}

fn decimal(v: &Value) -> Decimal {
  match v {
    Value::String(s) => s.parse().unwrap(),
    other => other.to_string().parse().unwrap(),
  }
}

#[tokio::test]
async fn create_list_and_delete_entry() {
  let app = app().await;
  let company = Uuid::new_v4();
  let entries = format!("/companies/{company}/entries");

  let (status, created) = send(
    &app,
    Method::POST,
    &entries,
    Some(json!({ "scope": 1, "category": "natural_gas", "value": "100", "unit": "m3" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(created["source"], "manual");
  let id = created["entry_id"].as_str().unwrap().to_owned();

  let (status, listed) = send(&app, Method::GET, &format!("{entries}?scope=1"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(listed.as_array().unwrap().len(), 1);

  let (status, listed) = send(&app, Method::GET, &format!("{entries}?scope=2"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(listed.as_array().unwrap().is_empty());

  let (status, _) = send(&app, Method::DELETE, &format!("/entries/{id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, body) = send(&app, Method::GET, &format!("/entries/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn invalid_entries_are_unprocessable() {
  let app = app().await;
  let entries = format!("/companies/{}/entries", Uuid::new_v4());

  for body in [
    json!({ "scope": 1, "category": "electricity", "value": 10, "unit": "kWh" }),
    json!({ "scope": 3, "category": "unicorns", "value": 10, "unit": "kg" }),
    json!({ "scope": 1, "category": "natural_gas", "value": "a lot", "unit": "m3" }),
  ] {
    let (status, body) = send(&app, Method::POST, &entries, Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
  }

  let (_, listed) = send(&app, Method::GET, &entries, None).await;
  assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn bad_scope_filter_is_a_bad_request() {
  let app = app().await;
  let (status, _) =
    send(&app, Method::GET, &format!("/companies/{}/entries?scope=4", Uuid::new_v4()), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn calculate_does_not_store() {
  let app = app().await;
  let (status, body) = send(
    &app,
    Method::POST,
    "/calculate",
    Some(json!({ "scope": 2, "category": "electricity", "value": 10000, "unit": "kWh", "is_renewable": true })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(decimal(&body["co2e_kg"]), Decimal::ZERO);
  assert_eq!(body["factor_table_version"], "builtin-2024");
}

#[tokio::test]
async fn monthly_records_sync_and_summary() {
  let app = app().await;
  let company = Uuid::new_v4();
  let records = format!("/companies/{company}/monthly-records");

  for (month, kwh) in [("2024-01-15", 1000), ("2024-02-01", 1200), ("2024-03-31", 1100)] {
    let (status, body) =
      send(&app, Method::PUT, &records, Some(json!({ "month": month, "electricity_kwh": kwh }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
  }

  let (_, listed) = send(&app, Method::GET, &format!("{records}?from=2024-02-01"), None).await;
  assert_eq!(listed.as_array().unwrap().len(), 2);

  let (status, agg) = send(
    &app,
    Method::GET,
    &format!("/companies/{company}/aggregate?window_end=2024-03-01&window_months=3"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(decimal(&agg["total_electricity_kwh"]), dec!(3300));
  assert_eq!(agg["month_count"], 3);

  let sync = format!("/companies/{company}/sync");
  let body = json!({ "window_end": "2024-03-01" });
  let (status, first) = send(&app, Method::POST, &sync, Some(body.clone())).await;
  assert_eq!(status, StatusCode::OK, "{first}");
  assert_eq!(first["inserted"].as_array().unwrap().len(), 1);
  let (_, second) = send(&app, Method::POST, &sync, Some(body)).await;
  assert!(second["inserted"].as_array().unwrap().is_empty());
  assert_eq!(second["skipped"][0]["reason"], "automated_entry_exists");

  let (status, summary) =
    send(&app, Method::GET, &format!("/companies/{company}/summary?window_end=2024-03-01"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(decimal(&summary["scope2_total"]), dec!(743.655));
  assert_eq!(decimal(&summary["total"]), dec!(743.655));
}

#[tokio::test]
async fn negative_readings_are_rejected() {
  let app = app().await;
  let (status, _) = send(
    &app,
    Method::PUT,
    &format!("/companies/{}/monthly-records", Uuid::new_v4()),
    Some(json!({ "month": "2024-01-01", "natural_gas_m3": -5 })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn profile_and_facilities() {
  let app = app().await;
  let company = Uuid::new_v4();
  let profile = format!("/companies/{company}/profile");

  let (status, _) = send(&app, Method::GET, &profile, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, stored) =
    send(&app, Method::PUT, &profile, Some(json!({ "industry": "retail", "employee_count": 12 }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stored["industry"], "retail");

  let facilities = format!("/companies/{company}/facilities");
  let (status, _) = send(&app, Method::POST, &facilities, Some(json!({ "name": "  " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = send(&app, Method::POST, &facilities, Some(json!({ "name": "Depot" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  let (_, listed) = send(&app, Method::GET, &facilities, None).await;
  assert_eq!(listed[0]["name"], "Depot");
}

#[tokio::test]
async fn factor_snapshot_lists_builtin_table() {
  let app = app().await;
  let (status, body) = send(&app, Method::GET, "/factors", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["version"], "builtin-2024");
  assert!(!body["factors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn aggregate_window_is_bounded() {
  let app = app().await;
  let aggregate = format!("/companies/{}/aggregate?window_end=2024-03-01", Uuid::new_v4());

  for months in [0, 121, u32::MAX] {
    let (status, body) =
      send(&app, Method::GET, &format!("{aggregate}&window_months={months}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{months}: {body}");
  }
  let (status, body) = send(&app, Method::GET, &format!("{aggregate}&window_months=120"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["missing_months"].as_array().unwrap().len(), 120);
}

#[tokio::test]
async fn facilities_of_other_companies_are_rejected() {
  let app = app().await;
  let (owner, intruder) = (Uuid::new_v4(), Uuid::new_v4());
  let (_, facility) = send(
    &app,
    Method::POST,
    &format!("/companies/{owner}/facilities"),
    Some(json!({ "name": "Plant" })),
  )
  .await;
  let facility_id = facility["facility_id"].as_str().unwrap().to_owned();

  let records = format!("/companies/{intruder}/monthly-records");
  let (status, _) = send(
    &app,
    Method::PUT,
    &records,
    Some(json!({ "facility_id": facility_id, "month": "2024-01-01", "electricity_kwh": 10 })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  let (_, listed) = send(&app, Method::GET, &records, None).await;
  assert!(listed.as_array().unwrap().is_empty());

  let entries = format!("/companies/{intruder}/entries");
  let (status, _) = send(
    &app,
    Method::POST,
    &entries,
    Some(json!({
      "scope": 1, "category": "natural_gas", "value": 5, "unit": "m3", "facility_id": facility_id
    })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  let (_, listed) = send(&app, Method::GET, &entries, None).await;
  assert!(listed.as_array().unwrap().is_empty());

  let (status, _) = send(
    &app,
    Method::PUT,
    &format!("/companies/{owner}/monthly-records"),
    Some(json!({ "facility_id": facility_id, "month": "2024-01-01", "electricity_kwh": 10 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
}
