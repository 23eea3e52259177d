//! Integration tests for the HTTP exposition.

#![cfg(feature = "api")]

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use prometheus::Registry;
use tower::util::ServiceExt;

use solar_farm_sim::api::{AppState, router, serve};
use solar_farm_sim::sink::PrometheusSink;

use common::{baseline_engine, june_first, quiet_rng, steady_config};

/// Runs one cycle of the baseline fleet into a fresh registry.
fn build_api_state() -> Arc<AppState> {
    let registry = Arc::new(Registry::new());
    let sink = PrometheusSink::new(Arc::clone(&registry)).expect("fresh registry");
    let mut engine = baseline_engine(steady_config(), quiet_rng(), june_first(12));
    engine.publish_initial(&sink);
    engine.run_cycle(june_first(12), &sink);

    let farm_ids = engine.farms().iter().map(|f| f.id.clone()).collect();
    let state = Arc::new(AppState::new(farm_ids, registry));
    state.mark_ready();
    state
}

async fn get_text(state: Arc<AppState>, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn metrics_cover_every_farm_and_series() {
    let (status, text) = get_text(build_api_state(), "/metrics").await;
    assert_eq!(status, StatusCode::OK);

    for farm in ["provence", "occitanie", "aquitaine"] {
        assert!(text.contains(&format!(r#"solar_farm_total_power_watts{{farm="{farm}"}}"#)));
        assert!(text.contains(&format!(
            r#"solar_power_watts{{farm="{farm}",panel_id="P005"}}"#
        )));
    }
    for name in [
        "solar_irradiance_wm2",
        "solar_panel_temperature_celsius",
        "solar_inverter_status",
        "solar_daily_revenue_euros_total",
        "solar_efficiency_percent",
        "solar_availability_ratio",
    ] {
        assert!(text.contains(&format!("# TYPE {name}")), "{name} missing");
    }
    assert!(text.contains(r#"solar_farm_total_power_watts{farm="provence"} 1479850"#));
    assert!(text.contains(r#"solar_efficiency_percent{farm="provence"} 73.99"#));
    // nothing injected yet
    assert!(!text.contains("solar_anomalies_total{"));
}

#[tokio::test]
async fn health_and_ready() {
    let state = build_api_state();

    let (status, body) = get_text(Arc::clone(&state), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["farms"].as_array().map(Vec::len), Some(3));

    let (status, body) = get_text(state, "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ready"}"#);
}

#[tokio::test]
async fn not_ready_before_first_cycle() {
    let state = Arc::new(AppState::new(vec!["provence".into()], Arc::new(Registry::new())));
    let (status, body) = get_text(state, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, r#"{"status":"not ready"}"#);
}

#[tokio::test]
async fn bind_failure_leaves_no_ticking_task() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();

    let registry = Arc::new(Registry::new());
    let sink = PrometheusSink::new(Arc::clone(&registry)).expect("fresh registry");
    let engine = baseline_engine(steady_config(), quiet_rng(), june_first(12));

    let err = serve(engine, sink, addr).await.unwrap_err();
    assert!(err.to_string().contains("failed to bind"));
    // the engine and its sink were dropped with the failed call
    assert_eq!(Arc::strong_count(&registry), 1);
}
