use std::io::Write;
use std::path::Path;

use log::{info, warn};
use serde_path_to_error as spte;

use crate::error::{CorsaError, Result};
use crate::models::CorsaConfig;
use crate::session::SessionRow;
use crate::strava::StravaSession;

/// Leser inn konfig fra disk (JSON).
/// Hvis filen ikke finnes, returneres default-konfig.
pub fn load_config(path: &Path) -> Result<CorsaConfig> {
    if path.exists() {
        let contents = std::fs::read_to_string(path)?;
        let mut de = serde_json::Deserializer::from_str(&contents);
        let config: CorsaConfig =
            spte::deserialize(&mut de).map_err(|e| CorsaError::parse("config", e))?;
        config.validate()?;
        info!(
            "📂 Konfig lastet fra {} (strava={})",
            path.display(),
            config.strava.is_some()
        );
        Ok(config)
    } else {
        warn!(
            "⚠️ Fant ikke konfig på {}, bruker default",
            path.display()
        );
        Ok(CorsaConfig::default())
    }
}

/// Lagrer konfig til disk som JSON (pretty-print).
pub fn save_config(config: &CorsaConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| CorsaError::Config(e.to_string()))?;
    std::fs::write(path, json)?;
    info!("✅ Konfig lagret til {}", path.display());
    Ok(())
}

pub fn load_session(path: &Path) -> Result<StravaSession> {
    let contents = std::fs::read_to_string(path)?;
    let mut de = serde_json::Deserializer::from_str(&contents);
    spte::deserialize(&mut de).map_err(|e| CorsaError::parse("strava session", e))
}

pub fn save_session(session: &StravaSession, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(session)
        .map_err(|e| CorsaError::Config(e.to_string()))?;
    std::fs::write(path, json)?;
    info!("✅ Strava-token lagret til {}", path.display());
    Ok(())
}

/// Skriver økt-tabellen som CSV.
pub fn write_sessions_csv<W: Write>(rows: &[SessionRow], out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_sessions_csv(rows: &[SessionRow], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_sessions_csv(rows, file)?;
    info!("✅ {} økter skrevet til {}", rows.len(), path.display());
    Ok(())
}
