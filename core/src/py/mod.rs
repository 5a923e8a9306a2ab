// Python-binding for dashboardet. Alt går inn og ut som JSON-strenger slik at
// vi slipper pyo3 sin serde-feature.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;
use serde_path_to_error as spte;

use crate::error::CorsaError;
use crate::loader::parse_workout_json;
use crate::models::CorsaConfig;
use crate::score::ScoreCalculator;
use crate::session::analyze_files as analyze_paths;
use crate::strava::authorize_url;
use crate::types::WorkoutSource;

// ──────────────────────────────────────────────────────────────────────────────
// HJELPERE
// ──────────────────────────────────────────────────────────────────────────────

fn to_py_err(e: CorsaError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_config(config_json: Option<&str>) -> Result<CorsaConfig, CorsaError> {
    let cfg = match config_json {
        Some(txt) if !txt.trim().is_empty() => {
            let mut de = serde_json::Deserializer::from_str(txt);
            spte::deserialize(&mut de).map_err(|e| CorsaError::parse("config", e))?
        }
        _ => CorsaConfig::default(),
    };
    cfg.validate()?;
    Ok(cfg)
}

fn calculator(cfg: &CorsaConfig) -> ScoreCalculator {
    ScoreCalculator::new(cfg.athlete.clone(), cfg.policy.clone())
}

fn to_json<T: serde::Serialize>(v: &T) -> PyResult<String> {
    serde_json::to_string(v).map_err(|e| PyValueError::new_err(format!("serialize: {e}")))
}

// ──────────────────────────────────────────────────────────────────────────────
// FUNKSJONER
// ──────────────────────────────────────────────────────────────────────────────

/// Scorer én økt (alle støttede JSON-formater) → ScoreResult som JSON.
#[pyfunction]
#[pyo3(signature = (payload, config_json=None))]
fn score_workout_json(payload: &str, config_json: Option<&str>) -> PyResult<String> {
    let cfg = parse_config(config_json).map_err(to_py_err)?;
    let workout = parse_workout_json(payload, WorkoutSource::Unknown).map_err(to_py_err)?;
    let result = calculator(&cfg)
        .score(&workout)
        .map_err(|e| to_py_err(e.into()))?;
    to_json(&result)
}

/// Leser og scorer filer → SessionReport som JSON.
#[pyfunction]
#[pyo3(signature = (paths, config_json=None))]
fn analyze_files(paths: Vec<String>, config_json: Option<&str>) -> PyResult<String> {
    let cfg = parse_config(config_json).map_err(to_py_err)?;
    let report = analyze_paths(&calculator(&cfg), &paths);
    to_json(&report)
}

#[pyfunction]
fn strava_authorize_url(config_json: &str) -> PyResult<String> {
    let cfg = parse_config(Some(config_json)).map_err(to_py_err)?;
    let strava = cfg
        .strava
        .as_ref()
        .ok_or_else(|| PyValueError::new_err("strava section missing in config"))?;
    Ok(authorize_url(strava))
}

// ──────────────────────────────────────────────────────────────────────────────
// PyO3-MODUL
// ──────────────────────────────────────────────────────────────────────────────

#[pymodule]
fn corsascore_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(score_workout_json, m)?)?;
    m.add_function(wrap_pyfunction!(analyze_files, m)?)?;
    m.add_function(wrap_pyfunction!(strava_authorize_url, m)?)?;
    Ok(())
}
