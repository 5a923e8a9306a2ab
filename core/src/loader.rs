//! Adaptere fra leverandørformater til kanonisk `Workout`.
//!
//! All formatspesifikk forgrening bor her; scorekjernen ser bare
//! `WorkoutSample`-sekvenser.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use serde_path_to_error as spte;

use crate::error::{CorsaError, Result};
use crate::strava::{StreamSet, TypedStream};
use crate::types::{Workout, WorkoutMeta, WorkoutSample, WorkoutSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkoutFormat {
    /// `{"DeviceLog": {"Header", "Samples", "R-R"}}`
    DeviceLog,
    /// `[{timestamp, heart_rate, power}]` eller `{"samples": [...], "meta": {...}}`
    Samples,
    /// Strava streams, key_by_type (objekt) eller liste.
    StravaStreams,
}

// ──────────────────────────────────────────────────────────────────────────────
// DEVICE LOG (Header / Samples / R-R)
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DeviceLogFile {
    #[serde(rename = "DeviceLog")]
    device_log: DeviceLog,
}

#[derive(Debug, Deserialize)]
struct DeviceLog {
    #[serde(rename = "Header", default)]
    header: DeviceHeader,
    #[serde(rename = "Samples")]
    samples: Vec<DeviceSample>,
    #[serde(rename = "R-R", default)]
    rr: Option<RrBlock>,
}

#[derive(Debug, Deserialize, Default)]
struct DeviceHeader {
    #[serde(rename = "DateTime", default)]
    date_time: Option<String>,
    #[serde(rename = "Distance", default)]
    distance: Option<f64>,
    #[serde(rename = "Ascent", default)]
    ascent: Option<f64>,
    // sekunder
    #[serde(rename = "Duration", default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DeviceSample {
    #[serde(rename = "Power", default)]
    power: Option<f64>,
    // Hz (slag per sekund)
    #[serde(rename = "HR", default)]
    hr_hz: Option<f64>,
    #[serde(rename = "TimeISO8601", default)]
    time: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RrBlock {
    #[serde(rename = "Data", default)]
    data: Vec<f64>, // ms
}

/// Finn format ut fra JSON-formen.
pub fn detect_format(v: &Value) -> Option<WorkoutFormat> {
    match v {
        Value::Object(obj) if obj.contains_key("DeviceLog") => Some(WorkoutFormat::DeviceLog),
        Value::Object(obj) if obj.contains_key("samples") => Some(WorkoutFormat::Samples),
        Value::Object(obj)
            if obj.contains_key("time")
                && (obj.contains_key("watts") || obj.contains_key("heartrate")) =>
        {
            Some(WorkoutFormat::StravaStreams)
        }
        Value::Array(items) => match items.first() {
            None => Some(WorkoutFormat::Samples),
            Some(Value::Object(o)) if o.contains_key("type") && o.contains_key("data") => {
                Some(WorkoutFormat::StravaStreams)
            }
            Some(Value::Object(_)) => Some(WorkoutFormat::Samples),
            _ => None,
        },
        _ => None,
    }
}

pub fn parse_workout_json(text: &str, source: WorkoutSource) -> Result<Workout> {
    let mut de = serde_json::Deserializer::from_str(text);
    let value: Value = spte::deserialize(&mut de).map_err(|e| CorsaError::parse("json", e))?;
    parse_workout_value(value, source)
}

pub fn parse_workout_value(value: Value, source: WorkoutSource) -> Result<Workout> {
    let label = source_label(&source);
    let format = detect_format(&value)
        .ok_or_else(|| CorsaError::UnsupportedFormat(format!("`{label}`: unknown JSON layout")))?;
    debug!("[loader] {label}: format {format:?}");

    match format {
        WorkoutFormat::DeviceLog => {
            let file: DeviceLogFile =
                spte::deserialize(value).map_err(|e| CorsaError::parse("device log", e))?;
            device_log_to_workout(file.device_log, source, &label)
        }
        WorkoutFormat::Samples => {
            #[derive(Deserialize)]
            struct SamplesFile {
                samples: Vec<WorkoutSample>,
                #[serde(default)]
                meta: WorkoutMeta,
            }

            let (samples, mut meta) = if value.is_array() {
                let samples: Vec<WorkoutSample> =
                    spte::deserialize(value).map_err(|e| CorsaError::parse("samples", e))?;
                (samples, WorkoutMeta::default())
            } else {
                let f: SamplesFile =
                    spte::deserialize(value).map_err(|e| CorsaError::parse("samples", e))?;
                (f.samples, f.meta)
            };
            meta.source = source;
            Ok(Workout::with_meta(samples, meta))
        }
        WorkoutFormat::StravaStreams => {
            let streams = if value.is_array() {
                let list: Vec<TypedStream> =
                    spte::deserialize(value).map_err(|e| CorsaError::parse("streams", e))?;
                StreamSet::from_list(list)
            } else {
                spte::deserialize(value).map_err(|e| CorsaError::parse("streams", e))?
            };
            let samples = streams.to_samples(&label)?;
            let meta = WorkoutMeta {
                source,
                ..WorkoutMeta::default()
            };
            Ok(Workout::with_meta(samples, meta))
        }
    }
}

/// CSV med kolonnene `timestamp,heart_rate,power` (alias `t,hr,watts`).
pub fn parse_workout_csv<R: Read>(reader: R, source: WorkoutSource) -> Result<Workout> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut samples = Vec::new();
    for row in rdr.deserialize() {
        let s: WorkoutSample = row?;
        samples.push(s);
    }
    let meta = WorkoutMeta {
        source,
        ..WorkoutMeta::default()
    };
    Ok(Workout::with_meta(samples, meta))
}

/// Leser en fil; `.csv` som CSV, alt annet som JSON.
pub fn load_workout_file(path: &Path) -> Result<Workout> {
    let source = WorkoutSource::File {
        path: path.display().to_string(),
    };
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let workout = if is_csv {
        parse_workout_csv(File::open(path)?, source)?
    } else {
        let text = std::fs::read_to_string(path)?;
        parse_workout_json(&text, source)?
    };
    info!("📂 {} lastet ({} samples)", path.display(), workout.len());
    Ok(workout)
}

fn source_label(source: &WorkoutSource) -> String {
    match source {
        WorkoutSource::File { path } => path.clone(),
        WorkoutSource::Strava { activity_id } => format!("strava:{activity_id}"),
        WorkoutSource::Unknown => "workout".to_string(),
    }
}

/// RFC 3339, eller naiv ISO-tid (tolkes som UTC).
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|n| n.and_utc())
}

fn device_log_to_workout(log: DeviceLog, source: WorkoutSource, label: &str) -> Result<Workout> {
    // Indeks i hele loggen beholdes: R-R og tidsaksen starter ved loggstart,
    // ikke ved første sample med watt.
    let power_samples: Vec<(usize, &DeviceSample)> = log
        .samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.power.is_some())
        .collect();
    if power_samples.is_empty() {
        return Err(CorsaError::MissingStream {
            label: label.to_string(),
            stream: "power",
        });
    }

    let rr: Vec<f64> = log
        .rr
        .map(|b| b.data.into_iter().filter(|r| *r > 0.0).collect())
        .unwrap_or_default();
    let declared = log.header.duration.filter(|d| d.is_finite() && *d > 0.0);

    let times = sample_times(&log.samples, &power_samples, declared, &rr, label);
    let rr_hr = hr_from_rr(&rr, &times);
    let has_sample_hr = power_samples
        .iter()
        .any(|(_, s)| s.hr_hz.map(|h| h > 0.0).unwrap_or(false));

    if rr_hr.is_none() && !has_sample_hr {
        return Err(CorsaError::MissingStream {
            label: label.to_string(),
            stream: "heart rate",
        });
    }

    let mut samples: Vec<WorkoutSample> = Vec::with_capacity(power_samples.len());
    let mut skipped = 0usize;
    for (i, (_, s)) in power_samples.iter().enumerate() {
        let t = times[i];
        let hr = match s.hr_hz {
            Some(hz) if hz > 0.0 => Some((hz * 60.0).round() as u32),
            _ => rr_hr.as_ref().map(|v| v[i]),
        };
        let Some(hr) = hr else {
            skipped += 1;
            continue;
        };
        // Duplikate tidsstempler: behold første
        if samples.last().map(|p| p.timestamp == t).unwrap_or(false) {
            skipped += 1;
            continue;
        }
        samples.push(WorkoutSample::new(t, hr, s.power.unwrap_or(0.0)));
    }
    if skipped > 0 {
        debug!("[loader] {label}: hoppet over {skipped} samples");
    }

    let meta = WorkoutMeta {
        name: None,
        start_time: log.header.date_time.as_deref().and_then(parse_datetime),
        distance_m: log.header.distance,
        ascent_m: log.header.ascent,
        duration_s: declared,
        source,
    };
    Ok(Workout::with_meta(samples, meta))
}

/// Sekunder fra loggstart for hver wattsample.
///
/// Med `TimeISO8601` på alle wattsamples regnes tiden fra første sample i
/// loggen som har tid. Uten tider fordeles hele loggen jevnt over oppgitt
/// varighet, ellers over summen av R-R, ellers 1 Hz.
fn sample_times(
    all: &[DeviceSample],
    power_samples: &[(usize, &DeviceSample)],
    declared: Option<f64>,
    rr_ms: &[f64],
    label: &str,
) -> Vec<f64> {
    let origin = all
        .iter()
        .find_map(|s| s.time.as_deref().and_then(parse_datetime));
    let parsed: Option<Vec<DateTime<Utc>>> = power_samples
        .iter()
        .map(|(_, s)| s.time.as_deref().and_then(parse_datetime))
        .collect();
    if let (Some(t0), Some(ts)) = (origin, parsed) {
        return ts
            .iter()
            .map(|t| (*t - t0).num_milliseconds() as f64 / 1000.0)
            .collect();
    }

    let rr_total = rr_ms.iter().sum::<f64>() / 1000.0;
    let span = declared.or((rr_total > 0.0).then_some(rr_total));
    let step = match span {
        Some(d) => d / all.len() as f64,
        None => {
            debug!("[loader] {label}: mangler TimeISO8601 og varighet, antar 1 Hz");
            1.0
        }
    };
    power_samples.iter().map(|(idx, _)| *idx as f64 * step).collect()
}

/// Puls (bpm) pr sampletid fra R-R-intervaller (ms).
///
/// Hver sample får siste slag som endte på eller før sampletiden; før første
/// slag er ferdig brukes første slag.
pub fn hr_from_rr(rr_ms: &[f64], times: &[f64]) -> Option<Vec<u32>> {
    if rr_ms.is_empty() {
        return None;
    }
    let mut ends = Vec::with_capacity(rr_ms.len());
    let mut acc = 0.0;
    for r in rr_ms {
        acc += r / 1000.0;
        ends.push(acc);
    }

    let mut j = 0usize;
    let mut out = Vec::with_capacity(times.len());
    for &t in times {
        while j + 1 < ends.len() && ends[j + 1] <= t {
            j += 1;
        }
        out.push((60_000.0 / rr_ms[j]).round() as u32);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rr_to_hr_follows_latest_beat() {
        // 1000 ms = 60 bpm, 500 ms = 120 bpm
        let rr = [1000.0, 1000.0, 500.0, 500.0];
        let hr = hr_from_rr(&rr, &[0.0, 1.0, 2.0, 2.5, 3.0]).unwrap();
        assert_eq!(hr, vec![60, 60, 60, 120, 120]);
    }

    #[test]
    fn rr_empty_gives_none() {
        assert!(hr_from_rr(&[], &[0.0, 1.0]).is_none());
    }

    #[test]
    fn detects_formats() {
        assert_eq!(
            detect_format(&json!({"DeviceLog": {}})),
            Some(WorkoutFormat::DeviceLog)
        );
        assert_eq!(
            detect_format(&json!([{"timestamp": 0, "heart_rate": 1, "power": 2}])),
            Some(WorkoutFormat::Samples)
        );
        assert_eq!(
            detect_format(&json!({"time": {"data": []}, "watts": {"data": []}})),
            Some(WorkoutFormat::StravaStreams)
        );
        assert_eq!(
            detect_format(&json!([{"type": "time", "data": []}])),
            Some(WorkoutFormat::StravaStreams)
        );
        assert_eq!(detect_format(&json!("nope")), None);
    }

    #[test]
    fn naive_datetime_is_utc() {
        let dt = parse_datetime("2024-03-10T08:15:00.000").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-10T08:15:00+00:00");
        let dt = parse_datetime("2024-03-10T09:15:00+01:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-10T08:15:00+00:00");
    }
}
