use serde::{Deserialize, Serialize};

use crate::error::CorsaError;

/// Standard redirect for dashboardet.
pub const DEFAULT_REDIRECT_URI: &str = "https://corsaappalpha.streamlit.app";

/// Median for peer-gruppen (Score 2.0).
pub const PEER_MEDIAN: f64 = 1.40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteProfile {
    #[serde(alias = "weight")]
    pub weight_kg: f64,
    pub hr_rest: u32,
    pub hr_max: u32,
}

impl Default for AthleteProfile {
    fn default() -> Self {
        Self {
            weight_kg: 74.0,
            hr_rest: 60,
            hr_max: 185,
        }
    }
}

impl AthleteProfile {
    pub fn validate(&self) -> Result<(), CorsaError> {
        if !(self.weight_kg.is_finite() && self.weight_kg > 0.0) {
            return Err(CorsaError::Config(format!(
                "weight_kg must be positive, got {}",
                self.weight_kg
            )));
        }
        if self.hr_max <= self.hr_rest {
            return Err(CorsaError::Config(format!(
                "hr_max ({}) must be above hr_rest ({})",
                self.hr_max, self.hr_rest
            )));
        }
        Ok(())
    }

    /// Pulsreserve (bpm).
    pub fn hr_reserve(&self) -> f64 {
        self.hr_max as f64 - self.hr_rest as f64
    }
}

/// Policy for Score 2.0 / CorsaScore. Vektene er ikke publisert noe sted,
/// så alt som påvirker tallet ligger her og kan overstyres fra konfig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorePolicy {
    /// Trekkes fra effektivitetsratioen før decoupling-straff.
    pub base_offset: f64,
    /// Peer-median for Score 2.0; havner på 50 i CorsaScore.
    pub peer_median: f64,
    pub min_samples: usize,
    /// Juster snitt-watt med stigning (ascent/distance).
    pub grade_adjustment: bool,
    /// Del decoupling-straffen på sqrt(timer).
    pub duration_penalty: bool,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            base_offset: 2.0,
            peer_median: PEER_MEDIAN,
            min_samples: 2,
            grade_adjustment: true,
            duration_penalty: true,
        }
    }
}

impl ScorePolicy {
    pub fn validate(&self) -> Result<(), CorsaError> {
        if !(self.peer_median.is_finite() && self.peer_median > 0.0) {
            return Err(CorsaError::Config(format!(
                "peer_median must be positive, got {}",
                self.peer_median
            )));
        }
        if !self.base_offset.is_finite() {
            return Err(CorsaError::Config("base_offset must be finite".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

/// Hele konfigfila (`corsascore.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorsaConfig {
    pub athlete: AthleteProfile,
    pub policy: ScorePolicy,
    pub strava: Option<StravaConfig>,
}

impl CorsaConfig {
    pub fn validate(&self) -> Result<(), CorsaError> {
        self.athlete.validate()?;
        self.policy.validate()
    }

    /// Miljøvariabler overstyrer Strava-nøkler fra fil.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let id = lookup("CORSASCORE_STRAVA_CLIENT_ID");
        let secret = lookup("CORSASCORE_STRAVA_CLIENT_SECRET");
        let redirect = lookup("CORSASCORE_STRAVA_REDIRECT_URI");

        if let Some(cfg) = self.strava.as_mut() {
            if let Some(id) = id {
                cfg.client_id = id;
            }
            if let Some(secret) = secret {
                cfg.client_secret = secret;
            }
        } else if let (Some(client_id), Some(client_secret)) = (id, secret) {
            // Begge må finnes for å lage en ny Strava-seksjon
            self.strava = Some(StravaConfig {
                client_id,
                client_secret,
                redirect_uri: default_redirect_uri(),
            });
        }

        if let (Some(cfg), Some(uri)) = (self.strava.as_mut(), redirect) {
            cfg.redirect_uri = uri;
        }
    }
}
