// core/tests/test_strava.rs
use corsascore_core::strava::{
    authorize_url, streams_to_workout, ActivitySummary, StravaSession, StreamSet, TokenResponse,
};
use corsascore_core::{CorsaError, StravaConfig, WorkoutSource};
use serde_json::json;

fn config() -> StravaConfig {
    StravaConfig {
        client_id: "4242".into(),
        client_secret: "secret".into(),
        redirect_uri: "https://corsaappalpha.streamlit.app".into(),
    }
}

#[test]
fn authorize_url_carries_client_redirect_and_scope() {
    let url = authorize_url(&config());
    assert!(url.starts_with("https://www.strava.com/oauth/authorize?"));
    assert!(url.contains("client_id=4242"));
    assert!(url.contains("response_type=code"));
    assert!(url.contains("redirect_uri=https%3A%2F%2Fcorsaappalpha.streamlit.app"));
    assert!(url.contains("scope=activity%3Aread_all"));
    assert!(!url.contains("secret"));
}

#[test]
fn token_response_becomes_session() {
    let body = json!({
        "token_type": "Bearer",
        "expires_at": 1_718_000_000,
        "expires_in": 21600,
        "refresh_token": "refresh-me",
        "access_token": "access-me",
        "athlete": {"id": 1}
    });
    let token: TokenResponse = serde_json::from_value(body).unwrap();
    let session: StravaSession = token.into();
    assert_eq!(session.access_token, "access-me");
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-me"));
    assert_eq!(session.expires_at, Some(1_718_000_000));
}

#[test]
fn activity_list_parses_and_filters_runs() {
    let body = json!([
        {"id": 1, "name": "Morning Run", "type": "Run", "sport_type": "Run",
         "start_date": "2024-06-01T05:12:00Z", "elapsed_time": 3120,
         "distance": 10012.3, "total_elevation_gain": 84.0},
        {"id": 2, "name": "Commute", "type": "Ride", "sport_type": "Ride",
         "start_date": "2024-06-01T16:00:00Z"},
        {"id": 3, "name": "Hills", "type": "Run", "sport_type": "TrailRun"},
        {"id": 4, "name": "Treadmill", "type": "VirtualRun"}
    ]);
    let all: Vec<ActivitySummary> = serde_json::from_value(body).unwrap();
    let runs: Vec<u64> = all.iter().filter(|a| a.is_run()).map(|a| a.id).collect();
    assert_eq!(runs, vec![1, 3, 4]);

    let meta = all[0].meta();
    assert_eq!(meta.name.as_deref(), Some("Morning Run"));
    assert_eq!(meta.distance_m, Some(10012.3));
    assert_eq!(meta.source, WorkoutSource::Strava { activity_id: 1 });
    assert_eq!(
        meta.start_time.map(|t| t.to_rfc3339()),
        Some("2024-06-01T05:12:00+00:00".to_string())
    );
}

#[test]
fn streams_convert_to_workout_with_activity_meta() {
    let activity: ActivitySummary = serde_json::from_value(json!({
        "id": 77, "name": "Long Run", "type": "Run",
        "distance": 20000.0, "total_elevation_gain": 100.0
    }))
    .unwrap();
    let streams: StreamSet = serde_json::from_value(json!({
        "time": {"data": [0, 1, 2, 3], "series_type": "distance", "original_size": 4, "resolution": "high"},
        "watts": {"data": [240, 245, null, 250]},
        "heartrate": {"data": [140, 142, 143, 144]}
    }))
    .unwrap();

    let w = streams_to_workout(&activity, &streams).unwrap();
    assert_eq!(w.len(), 3);
    assert_eq!(w.label(), "Long Run");
    assert!((w.meta().grade() - 0.005).abs() < 1e-12);
    assert_eq!(w.samples()[2].timestamp, 3.0);
    assert_eq!(w.samples()[2].heart_rate, 144);
}

#[test]
fn streams_without_heart_rate_are_rejected() {
    let activity: ActivitySummary =
        serde_json::from_value(json!({"id": 5, "type": "Run"})).unwrap();
    let streams: StreamSet = serde_json::from_value(json!({
        "time": {"data": [0, 1]},
        "watts": {"data": [200, 210]},
        "heartrate": {"data": [null, null]}
    }))
    .unwrap();
    match streams_to_workout(&activity, &streams) {
        Err(CorsaError::MissingStream { label, stream }) => {
            assert_eq!(label, "strava:5");
            assert_eq!(stream, "heart rate");
        }
        other => panic!("expected MissingStream, got {other:?}"),
    }
}
