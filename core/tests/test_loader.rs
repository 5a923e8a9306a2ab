// core/tests/test_loader.rs
use std::io::Write;
use std::path::Path;

use corsascore_core::loader::{detect_format, WorkoutFormat};
use corsascore_core::{
    load_workout_file, parse_workout_csv, parse_workout_json, CorsaError, ScoreCalculator,
    WorkoutSource,
};
use serde_json::json;

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn device_log_derives_heart_rate_from_rr_intervals() {
    let w = load_workout_file(&fixture("devicelog_run.json")).expect("load device log");

    // Sample uten Power og duplikat tid er borte
    assert_eq!(w.len(), 8);
    let times: Vec<f64> = w.samples().iter().map(|s| s.timestamp).collect();
    assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);

    let hr: Vec<u32> = w.samples().iter().map(|s| s.heart_rate).collect();
    assert_eq!(hr, vec![120, 120, 120, 150, 150, 150, 150, 160]);

    let power: Vec<f64> = w.samples().iter().map(|s| s.power).collect();
    assert_eq!(power[0], 200.0);
    assert_eq!(power[7], 270.0, "duplicate timestamp keeps the first sample");

    let meta = w.meta();
    assert_eq!(meta.duration_s, Some(8.0));
    assert_eq!(w.duration_s(), 8.0, "header Duration wins over sample span");
    assert_eq!(meta.distance_m, Some(2000.0));
    assert_eq!(meta.ascent_m, Some(20.0));
    assert!((meta.grade() - 0.01).abs() < 1e-12);
    assert_eq!(
        meta.start_time.map(|t| t.to_rfc3339()),
        Some("2024-05-04T05:30:00+00:00".to_string())
    );
    assert!(matches!(meta.source, WorkoutSource::File { .. }));
}

#[test]
fn device_log_sample_hr_in_hz_without_times() {
    let payload = json!({
        "DeviceLog": {
            "Header": {},
            "Samples": [
                {"Power": 200, "HR": 2.5},
                {"Power": 210, "HR": 2.6},
                {"Power": 220, "HR": 2.7}
            ]
        }
    });
    let w = parse_workout_json(&payload.to_string(), WorkoutSource::Unknown).unwrap();
    let got: Vec<(f64, u32)> = w.samples().iter().map(|s| (s.timestamp, s.heart_rate)).collect();
    // 1 Hz fallback; 2.5 Hz = 150 bpm
    assert_eq!(got, vec![(0.0, 150), (1.0, 156), (2.0, 162)]);
    assert_eq!(w.meta().start_time, None);
}

#[test]
fn device_log_without_times_spreads_samples_over_header_duration() {
    // 12 wattsamples over en time, R-R 500 ms (120 bpm) hele veien
    let samples: Vec<serde_json::Value> = (0..12)
        .map(|i| json!({"Power": if i < 6 { 260 } else { 240 }}))
        .collect();
    let rr = vec![500.0; 7200];
    let payload = json!({
        "DeviceLog": {
            "Header": {"Duration": 3600},
            "Samples": samples,
            "R-R": {"Data": rr}
        }
    });
    let w = parse_workout_json(&payload.to_string(), WorkoutSource::Unknown).unwrap();

    let times: Vec<f64> = w.samples().iter().map(|s| s.timestamp).collect();
    let expected: Vec<f64> = (0..12).map(|i| i as f64 * 300.0).collect();
    assert_eq!(times, expected);
    assert!(w.samples().iter().all(|s| s.heart_rate == 120));
    assert_eq!(w.duration_s(), 3600.0);

    let r = ScoreCalculator::default().score(&w).unwrap();
    assert_eq!(r.duration_s, 3600.0);
    // én time → straffen er decoupling / 100 uten sqrt-skalering
    let expected_raw = (r.efficiency_ratio - 2.0) * (1.0 - r.decoupling_pct / 100.0);
    assert!((r.raw_score - expected_raw).abs() < 1e-9, "raw={}", r.raw_score);
}

#[test]
fn device_log_without_times_or_duration_uses_rr_total() {
    let payload = json!({
        "DeviceLog": {
            "Header": {},
            "Samples": [{"Power": 200}, {"Power": 210}, {"Power": 220}, {"Power": 230}],
            "R-R": {"Data": vec![600.0; 2000]}
        }
    });
    let w = parse_workout_json(&payload.to_string(), WorkoutSource::Unknown).unwrap();
    let times: Vec<f64> = w.samples().iter().map(|s| s.timestamp).collect();
    assert_eq!(times, vec![0.0, 300.0, 600.0, 900.0]);
    assert_eq!(w.samples()[0].heart_rate, 100);
    assert_eq!(w.meta().duration_s, None);
}

#[test]
fn device_log_rr_is_aligned_to_log_start_not_first_power_sample() {
    // 11 s uten watt først; R-R: 10 slag à 1000 ms, deretter 500 ms
    let mut samples: Vec<serde_json::Value> = (0..11)
        .map(|i| json!({"TimeISO8601": format!("2024-05-04T07:30:{i:02}.000Z"), "Altitude": 10}))
        .collect();
    for (i, p) in [(11, 200), (12, 205), (13, 210), (14, 215)] {
        samples.push(json!({"TimeISO8601": format!("2024-05-04T07:30:{i:02}.000Z"), "Power": p}));
    }
    let mut rr = vec![1000.0; 10];
    rr.extend(vec![500.0; 20]);
    let payload = json!({
        "DeviceLog": {"Header": {}, "Samples": samples, "R-R": {"Data": rr}}
    });

    let w = parse_workout_json(&payload.to_string(), WorkoutSource::Unknown).unwrap();
    let got: Vec<(f64, u32)> = w.samples().iter().map(|s| (s.timestamp, s.heart_rate)).collect();
    assert_eq!(got, vec![(11.0, 120), (12.0, 120), (13.0, 120), (14.0, 120)]);
}

#[test]
fn device_log_without_power_or_hr_is_missing_stream() {
    let no_power = json!({"DeviceLog": {"Header": {}, "Samples": [{"HR": 2.5}], "R-R": {"Data": [500]}}});
    match parse_workout_json(&no_power.to_string(), WorkoutSource::Unknown) {
        Err(CorsaError::MissingStream { stream, .. }) => assert_eq!(stream, "power"),
        other => panic!("expected MissingStream(power), got {other:?}"),
    }

    let no_hr = json!({"DeviceLog": {"Header": {}, "Samples": [{"Power": 200}], "R-R": {"Data": [0, 0]}}});
    match parse_workout_json(&no_hr.to_string(), WorkoutSource::Unknown) {
        Err(CorsaError::MissingStream { stream, .. }) => assert_eq!(stream, "heart rate"),
        other => panic!("expected MissingStream(heart rate), got {other:?}"),
    }
}

#[test]
fn canonical_sample_array_and_object() {
    let arr = json!([
        {"timestamp": 0, "heart_rate": 140, "power": 200.0},
        {"timestamp": 60, "heart_rate": 142, "power": 202.0}
    ]);
    let w = parse_workout_json(&arr.to_string(), WorkoutSource::Unknown).unwrap();
    assert_eq!(w.len(), 2);
    assert_eq!(w.duration_s(), 60.0);

    // Kortnavn t/hr/watts aksepteres også
    let obj = json!({
        "meta": {"name": "Tempo", "distance_m": 5000.0, "ascent_m": 50.0},
        "samples": [
            {"t": 0, "hr": 150, "watts": 250},
            {"t": 1, "hr": 151, "watts": 251}
        ]
    });
    let w = parse_workout_json(&obj.to_string(), WorkoutSource::Unknown).unwrap();
    assert_eq!(w.label(), "Tempo");
    assert_eq!(w.samples()[1].heart_rate, 151);
    assert!((w.meta().grade() - 0.01).abs() < 1e-12);
}

#[test]
fn strava_stream_json_is_accepted_in_both_layouts() {
    let keyed = json!({
        "time": {"data": [0, 1, 2, 3]},
        "watts": {"data": [200, null, 210, 215]},
        "heartrate": {"data": [140, 141, 0, 143]}
    });
    let w = parse_workout_json(&keyed.to_string(), WorkoutSource::Strava { activity_id: 7 }).unwrap();
    // null-watt og puls 0 droppes
    let times: Vec<f64> = w.samples().iter().map(|s| s.timestamp).collect();
    assert_eq!(times, vec![0.0, 3.0]);
    assert_eq!(w.label(), "strava:7");

    let list = json!([
        {"type": "time", "data": [0, 1]},
        {"type": "distance", "data": [0.0, 3.1]},
        {"type": "watts", "data": [200, 201]},
        {"type": "heartrate", "data": [140, 141]}
    ]);
    let w = parse_workout_json(&list.to_string(), WorkoutSource::Unknown).unwrap();
    assert_eq!(w.len(), 2);
}

#[test]
fn malformed_json_reports_path() {
    let bad = json!([{"timestamp": 0, "heart_rate": "fast", "power": 200}]);
    match parse_workout_json(&bad.to_string(), WorkoutSource::Unknown) {
        Err(CorsaError::Parse { path, .. }) => assert!(path.contains("heart_rate"), "path={path}"),
        other => panic!("expected Parse error, got {other:?}"),
    }

    assert!(matches!(
        parse_workout_json("42", WorkoutSource::Unknown),
        Err(CorsaError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        parse_workout_json("{not json", WorkoutSource::Unknown),
        Err(CorsaError::Parse { .. })
    ));
}

#[test]
fn csv_samples_from_reader_and_file() {
    let text = "timestamp,heart_rate,power\n0,140,200\n60,142,202\n120,150,190\n";
    let w = parse_workout_csv(text.as_bytes(), WorkoutSource::Unknown).unwrap();
    assert_eq!(w.len(), 3);
    assert_eq!(w.samples()[2].power, 190.0);

    let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    f.write_all(text.as_bytes()).unwrap();
    let w = load_workout_file(f.path()).unwrap();
    assert_eq!(w.len(), 3);
    assert_eq!(w.duration_s(), 120.0);

    // Samme innhold uten .csv går til JSON-parseren
    let mut g = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    g.write_all(text.as_bytes()).unwrap();
    assert!(matches!(load_workout_file(g.path()), Err(CorsaError::Parse { .. })));
}

#[test]
fn detect_format_on_fixture() {
    let text = std::fs::read_to_string(fixture("devicelog_run.json")).unwrap();
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(detect_format(&v), Some(WorkoutFormat::DeviceLog));
}
