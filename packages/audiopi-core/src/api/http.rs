//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to services for business logic.

use std::collections::BTreeMap;
use std::num::IntErrorKind;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::services::{ServeDir, ServeFile};

use crate::api::response::{api_error, api_success};
use crate::api::AppState;
use crate::audio::SelectionSource;
use crate::error::AudioPiResult;
use crate::services::{LogicalService, MultiroomMode, UnitState};
use crate::SERVICE_ID;

// ─────────────────────────────────────────────────────────────────────────────
// Request Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct WifiConnectRequest {
    #[serde(default)]
    ssid: String,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Deserialize)]
struct DeviceNameRequest {
    #[serde(default)]
    name: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct AudioInfo {
    card: u32,
    mixer: String,
    source: SelectionSource,
    strategy: &'static str,
}

#[derive(Serialize)]
struct DeviceState {
    device_name: String,
    volume: u8,
    audio: AudioInfo,
    services: BTreeMap<LogicalService, UnitState>,
    enabled: BTreeMap<LogicalService, UnitState>,
    /// `null` when both Snapcast units are engaged.
    multiroom: Option<MultiroomMode>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
///
/// When a static directory is configured, `/` serves its `index.html` and
/// `/static/*` serves the rest of it.
pub fn create_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/api/state", get(get_state))
        .route("/api/volume/{value}", post(set_volume))
        .route("/api/service/{name}/{action}", post(service_action))
        .route("/api/multiroom/{mode}", post(set_multiroom))
        .route("/api/wifi/scan", get(wifi_scan))
        .route("/api/wifi/connect", post(wifi_connect))
        .route("/api/device-name", post(set_device_name))
        .route("/api/reboot", post(reboot));

    let router = match static_dir {
        Some(dir) => {
            log::info!("[Server] Serving UI from {}", dir.display());
            router
                .route_service("/", ServeFile::new(dir.join("index.html")))
                .nest_service("/static", ServeDir::new(dir))
        }
        None => router,
    };

    router.with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe. Runs no commands.
async fn health_check() -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/state
///
/// Aggregate device state. Mixer, volume, and every unit are queried
/// concurrently; nothing here fails, unreadable parts degrade to `unknown`
/// or 0.
async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    let (volume, snapshot) = futures::join!(state.volume.get_volume(), state.registry.snapshot());
    let selection = state.volume.mixer().locate().await;
    let device_name = state.device_config.device_name();

    let engaged = |service: LogicalService| {
        snapshot.services.get(&service).is_some_and(UnitState::is_active)
            || snapshot.enabled.get(&service).is_some_and(UnitState::is_enabled)
    };
    let multiroom = MultiroomMode::derive(
        engaged(LogicalService::Snapserver),
        engaged(LogicalService::Snapclient),
    );

    api_success(DeviceState {
        device_name,
        volume,
        audio: AudioInfo {
            card: selection.card,
            mixer: selection.control,
            source: selection.source,
            strategy: state.volume.strategy(),
        },
        services: snapshot.services,
        enabled: snapshot.enabled,
        multiroom,
    })
}

/// Parses a volume path segment. Integers too large for `i64` saturate so
/// they clamp like any other out-of-range value.
fn parse_volume_segment(segment: &str) -> Result<i64, String> {
    segment.trim().parse::<i64>().or_else(|e| match e.kind() {
        IntErrorKind::PosOverflow => Ok(i64::MAX),
        IntErrorKind::NegOverflow => Ok(i64::MIN),
        _ => Err(format!("Invalid volume '{}': {}", segment, e)),
    })
}

/// POST /api/volume/{value}
///
/// Out-of-range values are clamped; a non-integer segment is a 400.
async fn set_volume(State(state): State<AppState>, Path(segment): Path<String>) -> Response {
    let value = match parse_volume_segment(&segment) {
        Ok(value) => value,
        Err(message) => {
            return api_error(StatusCode::BAD_REQUEST, "invalid_request", message).into_response()
        }
    };

    let change = state.volume.set_volume(value).await;
    api_success(json!({ "ok": change.ok, "volume": change.volume })).into_response()
}

/// POST /api/service/{name}/{action}
async fn service_action(
    State(state): State<AppState>,
    Path((name, action)): Path<(String, String)>,
) -> AudioPiResult<impl IntoResponse> {
    let report = state.registry.apply(&name, &action).await?;
    Ok(api_success(report))
}

/// POST /api/multiroom/{mode}
async fn set_multiroom(
    State(state): State<AppState>,
    Path(mode): Path<String>,
) -> AudioPiResult<impl IntoResponse> {
    let mode: MultiroomMode = mode.parse()?;
    Ok(api_success(state.multiroom.transition(mode).await))
}

/// GET /api/wifi/scan
async fn wifi_scan(State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.wifi.scan().await)
}

/// POST /api/wifi/connect
async fn wifi_connect(
    State(state): State<AppState>,
    Json(payload): Json<WifiConnectRequest>,
) -> AudioPiResult<impl IntoResponse> {
    let result = state
        .wifi
        .connect(&payload.ssid, payload.password.as_deref())
        .await?;
    Ok(api_success(result))
}

/// POST /api/device-name
async fn set_device_name(
    State(state): State<AppState>,
    Json(payload): Json<DeviceNameRequest>,
) -> AudioPiResult<impl IntoResponse> {
    let device_name = state.device_config.set_device_name(&payload.name)?;
    Ok(api_success(json!({ "ok": true, "device_name": device_name })))
}

/// POST /api/reboot
async fn reboot(State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.system.reboot().await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;
    use crate::bootstrap::bootstrap_with_runner;
    use crate::state::Config;
    use crate::test_fixtures::{FakeReply, FakeRunner, AMIXER_GET_PCM, APLAY_PI};

    fn app_state(runner: Arc<FakeRunner>, dir: &std::path::Path) -> AppState {
        let config = Config {
            device_config_path: dir.join("config.json"),
            ..Default::default()
        };
        let services = bootstrap_with_runner(config, runner).unwrap();
        AppState::new(&services)
    }

    async fn body_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn state_aggregates_mixer_services_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        runner
            .on("aplay -l", FakeReply::ok(APLAY_PI))
            .on("-c 1 scontrols", FakeReply::ok("Simple mixer control 'PCM',0\n"))
            .on("-c 1 get PCM", FakeReply::ok(AMIXER_GET_PCM));
        runner.set_unit("shairport-sync", "active", "enabled");
        runner.set_unit("snapclient", "active", "enabled");

        let state = app_state(runner, dir.path());
        let (status, body) = body_json(get_state(State(state)).await.into_response()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["device_name"], "Audio-Pi");
        assert_eq!(body["audio"]["card"], 1);
        assert_eq!(body["audio"]["mixer"], "PCM");
        assert_eq!(body["audio"]["strategy"], "decibel");
        assert_eq!(body["services"]["airplay"], "active");
        assert_eq!(body["enabled"]["spotify"], "disabled");
        assert_eq!(body["multiroom"], "client");
        assert!(body["volume"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn state_survives_total_executor_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        runner.on("/usr/bin", FakeReply::Timeout);

        let state = app_state(runner, dir.path());
        let (status, body) = body_json(get_state(State(state)).await.into_response()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["volume"], 0);
        assert_eq!(body["audio"]["card"], 0);
        assert_eq!(body["audio"]["source"], "fallback");
        assert_eq!(body["services"]["bluetooth"], "unknown");
        assert_eq!(body["enabled"]["snapserver"], "unknown");
    }

    #[tokio::test]
    async fn unknown_service_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let state = app_state(runner.clone(), dir.path());

        let response = service_action(
            State(state),
            Path(("unknown-service".to_string(), "start".to_string())),
        )
        .await
        .into_response();
        let (status, body) = body_json(response).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn service_action_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let state = app_state(runner, dir.path());

        let response = service_action(
            State(state),
            Path(("spotify".to_string(), "start".to_string())),
        )
        .await
        .into_response();
        let (status, body) = body_json(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["status"], "active");
        assert_eq!(body["detail"]["code"], 0);
    }

    #[tokio::test]
    async fn unknown_multiroom_mode_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(FakeRunner::new(), dir.path());
        let response = set_multiroom(State(state), Path("both".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn volume_is_clamped_and_realized() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(FakeRunner::new(), dir.path());

        let (_, body) = body_json(set_volume(State(state.clone()), Path("140".into())).await).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["volume"], 100);

        let (_, body) = body_json(set_volume(State(state), Path("-3".into())).await).await;
        assert_eq!(body["volume"], 0);
    }

    #[tokio::test]
    async fn overflowing_volume_saturates_before_clamping() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(FakeRunner::new(), dir.path());

        let huge = "99999999999999999999".to_string();
        let (status, body) = body_json(set_volume(State(state.clone()), Path(huge)).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["volume"], 100);

        let tiny = "-99999999999999999999".to_string();
        let (_, body) = body_json(set_volume(State(state), Path(tiny)).await).await;
        assert_eq!(body["volume"], 0);
    }

    #[tokio::test]
    async fn non_integer_volume_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let state = app_state(runner.clone(), dir.path());

        let (status, body) =
            body_json(set_volume(State(state), Path("loud".into())).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn volume_segment_parsing() {
        assert_eq!(parse_volume_segment("42"), Ok(42));
        assert_eq!(parse_volume_segment("-7"), Ok(-7));
        assert_eq!(parse_volume_segment("123456789012345678901234"), Ok(i64::MAX));
        assert!(parse_volume_segment("4.5").is_err());
        assert!(parse_volume_segment("").is_err());
    }

    #[tokio::test]
    async fn volume_failure_is_ok_false() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        runner.on(" set ", FakeReply::Timeout);
        let state = app_state(runner, dir.path());

        let (status, body) = body_json(set_volume(State(state), Path("50".into())).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn rename_round_trips_through_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(FakeRunner::new(), dir.path());

        let response = set_device_name(
            State(state.clone()),
            Json(DeviceNameRequest {
                name: "Kitchen".into(),
            }),
        )
        .await
        .into_response();
        let (_, body) = body_json(response).await;
        assert_eq!(body["device_name"], "Kitchen");

        let (_, body) = body_json(get_state(State(state)).await.into_response()).await;
        assert_eq!(body["device_name"], "Kitchen");
    }

    #[tokio::test]
    async fn blank_device_name_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let state = app_state(FakeRunner::new(), dir.path());
        let response = set_device_name(
            State(state),
            Json(DeviceNameRequest { name: " ".into() }),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_ssid_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeRunner::new();
        let state = app_state(runner.clone(), dir.path());
        let response = wifi_connect(
            State(state),
            Json(WifiConnectRequest {
                ssid: String::new(),
                password: Some("secret".into()),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn health_reports_service_id() {
        let (status, body) = body_json(health_check().await.into_response()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], SERVICE_ID);
    }
}
