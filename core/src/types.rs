use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSample {
    #[serde(alias = "t")]
    pub timestamp: f64, // sekunder fra start
    #[serde(alias = "hr")]
    pub heart_rate: u32, // bpm
    #[serde(alias = "watts")]
    pub power: f64, // watt
}

impl WorkoutSample {
    pub fn new(timestamp: f64, heart_rate: u32, power: f64) -> Self {
        Self {
            timestamp,
            heart_rate,
            power,
        }
    }
}

/// Hvor økta kom fra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkoutSource {
    #[default]
    Unknown,
    File { path: String },
    Strava { activity_id: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorkoutMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub distance_m: Option<f64>,
    #[serde(default)]
    pub ascent_m: Option<f64>,
    /// Oppgitt varighet i sekunder (f.eks. `Header.Duration` fra klokka).
    #[serde(default)]
    pub duration_s: Option<f64>,
    #[serde(default)]
    pub source: WorkoutSource,
}

impl WorkoutMeta {
    /// Stigning = ascent / distance (0 hvis distanse mangler).
    pub fn grade(&self) -> f64 {
        match (self.ascent_m, self.distance_m) {
            (Some(a), Some(d)) if d > 0.0 && a.is_finite() => a / d,
            _ => 0.0,
        }
    }
}

/// En innlest økt. Uforanderlig etter lasting: samples og meta er kun lesbare.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workout {
    samples: Vec<WorkoutSample>,
    meta: WorkoutMeta,
}

impl Workout {
    pub fn new(samples: Vec<WorkoutSample>) -> Self {
        Self::with_meta(samples, WorkoutMeta::default())
    }

    pub fn with_meta(samples: Vec<WorkoutSample>, meta: WorkoutMeta) -> Self {
        Self { samples, meta }
    }

    pub fn samples(&self) -> &[WorkoutSample] {
        &self.samples
    }

    pub fn meta(&self) -> &WorkoutMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Varighet i sekunder: oppgitt varighet fra meta når den finnes, ellers
    /// første til siste tidsstempel.
    pub fn duration_s(&self) -> f64 {
        if let Some(d) = self.meta.duration_s.filter(|d| d.is_finite() && *d > 0.0) {
            return d;
        }
        match (self.samples.first(), self.samples.last()) {
            (Some(a), Some(b)) => b.timestamp - a.timestamp,
            _ => 0.0,
        }
    }

    /// Navn til visning: meta.name, ellers kilde.
    pub fn label(&self) -> String {
        if let Some(name) = &self.meta.name {
            return name.clone();
        }
        match &self.meta.source {
            WorkoutSource::File { path } => path.clone(),
            WorkoutSource::Strava { activity_id } => format!("strava:{activity_id}"),
            WorkoutSource::Unknown => "workout".to_string(),
        }
    }

    /// Sjekker lengde, tidsrekkefølge og verdier.
    pub fn validate(&self, min_samples: usize) -> Result<(), InputError> {
        let n = self.samples.len();
        if n == 0 {
            return Err(InputError::Empty);
        }
        let min = min_samples.max(2);
        if n < min {
            return Err(InputError::TooFewSamples { len: n, min });
        }

        let mut prev: Option<f64> = None;
        for (index, s) in self.samples.iter().enumerate() {
            if !s.timestamp.is_finite() || s.timestamp < 0.0 {
                return Err(InputError::InvalidValue {
                    index,
                    field: "timestamp",
                    value: s.timestamp,
                });
            }
            if !s.power.is_finite() || s.power < 0.0 {
                return Err(InputError::InvalidValue {
                    index,
                    field: "power",
                    value: s.power,
                });
            }
            if let Some(p) = prev {
                if s.timestamp <= p {
                    return Err(InputError::NonMonotonic {
                        index,
                        prev: p,
                        t: s.timestamp,
                    });
                }
            }
            prev = Some(s.timestamp);
        }
        Ok(())
    }
}

/// Resultat av én scoreberegning. Avledet, aldri lagret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoreResult {
    /// Aerob decoupling i prosent (EF første halvdel mot andre).
    pub decoupling_pct: f64,
    /// EF for hele økta = snitt watt / snitt puls.
    pub efficiency_factor: f64,
    pub ef_first: f64,
    pub ef_second: f64,
    pub avg_power: f64,
    /// Snitt watt justert for stigning.
    pub adjusted_power: f64,
    pub avg_hr: f64,
    /// %HRR i prosent.
    pub hrr_pct: f64,
    /// (W_adj/kg) per %HRR-enhet.
    pub efficiency_ratio: f64,
    /// Score 2.0, ubegrenset.
    pub raw_score: f64,
    /// CorsaScore, 0–100.
    pub corsa_score: f64,
    pub duration_s: f64,
}
