use std::path::Path;

use chrono::{DateTime, Utc};
use log::{info, warn};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{CorsaError, Result};
use crate::loader::load_workout_file;
use crate::metrics::RoundTo;
use crate::score::ScoreCalculator;
use crate::strava::{ActivitySource, StravaSession};
use crate::telemetry;
use crate::types::{ScoreResult, Workout};

/// Én rad i økt-tabellen (avrundet for visning).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRow {
    pub date: Option<DateTime<Utc>>,
    pub label: String,
    pub watt_adj: f64,
    pub hr_avg: f64,
    pub hrr_pct: f64,
    pub decoupling_pct: f64,
    pub score_2: f64,
    pub corsa_score: f64,
    pub duration_min: f64,
}

impl SessionRow {
    pub fn new(workout: &Workout, r: &ScoreResult) -> Self {
        Self {
            date: workout.meta().start_time,
            label: workout.label(),
            watt_adj: r.adjusted_power.round_to(1),
            hr_avg: r.avg_hr.round_to(1),
            hrr_pct: r.hrr_pct.round_to(1),
            decoupling_pct: r.decoupling_pct.round_to(2),
            score_2: r.raw_score.round_to(3),
            corsa_score: r.corsa_score.round_to(1),
            duration_min: (r.duration_s / 60.0).round_to(0),
        }
    }
}

/// Økt som ikke kunne scores, og hvorfor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skipped {
    pub label: String,
    pub reason: String,
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub sessions: usize,
    pub mean_corsa_score: f64,
    pub mean_score_2: f64,
    pub mean_decoupling_pct: f64,
    pub mean_watt_adj: f64,
    pub mean_hrr_pct: f64,
    pub median_score_2: f64,
    pub peer_median: f64,
    pub above_peer: bool,
}

impl SessionSummary {
    pub fn from_rows(rows: &[SessionRow], peer_median: f64) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let n = rows.len() as f64;
        let mean = |f: fn(&SessionRow) -> f64| rows.iter().map(f).sum::<f64>() / n;
        let mean_score_2 = mean(|r| r.score_2);

        Some(Self {
            sessions: rows.len(),
            mean_corsa_score: mean(|r| r.corsa_score),
            mean_score_2,
            mean_decoupling_pct: mean(|r| r.decoupling_pct),
            mean_watt_adj: mean(|r| r.watt_adj),
            mean_hrr_pct: mean(|r| r.hrr_pct),
            median_score_2: median(rows.iter().map(|r| r.score_2)),
            peer_median,
            above_peer: mean_score_2 > peer_median,
        })
    }

    pub fn insight(&self) -> String {
        if self.above_peer {
            format!(
                "Great work! Your average score ({:.2}) is above the group median ({:.2}).",
                self.mean_score_2, self.peer_median
            )
        } else {
            format!(
                "Room to improve. Your average score ({:.2}) is below the group median ({:.2}). Focus on the aerobic base.",
                self.mean_score_2, self.peer_median
            )
        }
    }
}

fn median<I: Iterator<Item = f64>>(xs: I) -> f64 {
    let mut v: Vec<OrderedFloat<f64>> = xs.map(OrderedFloat).collect();
    if v.is_empty() {
        return 0.0;
    }
    v.sort();
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2].0
    } else {
        (v[n / 2 - 1].0 + v[n / 2].0) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    /// Sortert på dato; udaterte sist i innlest rekkefølge.
    pub rows: Vec<SessionRow>,
    pub skipped: Vec<Skipped>,
    pub summary: Option<SessionSummary>,
}

/// Samler resultater for en batch. Feil blir til `Skipped`, batchen stopper ikke.
pub struct SessionAnalyzer<'a> {
    calc: &'a ScoreCalculator,
    rows: Vec<SessionRow>,
    skipped: Vec<Skipped>,
}

impl<'a> SessionAnalyzer<'a> {
    pub fn new(calc: &'a ScoreCalculator) -> Self {
        Self {
            calc,
            rows: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn add(&mut self, workout: &Workout) -> Option<ScoreResult> {
        match self.calc.score(workout) {
            Ok(r) => {
                telemetry::workout_scored(r.decoupling_pct);
                self.rows.push(SessionRow::new(workout, &r));
                Some(r)
            }
            Err(e) => {
                self.skip(workout.label(), &CorsaError::from(e));
                None
            }
        }
    }

    pub fn skip(&mut self, label: String, err: &CorsaError) {
        let kind = err.reason_key();
        telemetry::workout_rejected(kind);
        warn!("Hoppet over {label}: {err}");
        self.skipped.push(Skipped {
            label,
            reason: err.to_string(),
            kind,
        });
    }

    pub fn finish(self) -> SessionReport {
        let mut rows = self.rows;
        rows.sort_by_key(|r| (r.date.is_none(), r.date));
        let summary = SessionSummary::from_rows(&rows, self.calc.policy().peer_median);
        info!(
            "Analyse ferdig: {} scoret, {} hoppet over",
            rows.len(),
            self.skipped.len()
        );
        SessionReport {
            rows,
            skipped: self.skipped,
            summary,
        }
    }
}

pub fn analyze_workouts<'w, I>(calc: &ScoreCalculator, workouts: I) -> SessionReport
where
    I: IntoIterator<Item = &'w Workout>,
{
    let mut analyzer = SessionAnalyzer::new(calc);
    for w in workouts {
        analyzer.add(w);
    }
    analyzer.finish()
}

/// Leser og scorer filer; filer som ikke kan leses havner i `skipped`.
pub fn analyze_files<P: AsRef<Path>>(calc: &ScoreCalculator, paths: &[P]) -> SessionReport {
    let mut analyzer = SessionAnalyzer::new(calc);
    for p in paths {
        let path = p.as_ref();
        match load_workout_file(path) {
            Ok(w) => {
                analyzer.add(&w);
            }
            Err(e) => analyzer.skip(path.display().to_string(), &e),
        }
    }
    analyzer.finish()
}

/// Henter siste løpeturer fra en kilde og scorer dem.
///
/// Avvist token avbryter hele importen slik at kalleren kan be om ny
/// innlogging; andre feil pr aktivitet blir `Skipped`.
pub fn import_from_source<S: ActivitySource + ?Sized>(
    source: &S,
    session: &StravaSession,
    limit: usize,
    calc: &ScoreCalculator,
) -> Result<SessionReport> {
    let runs = source.list_runs(session, limit)?;
    if runs.is_empty() {
        info!("Ingen løpeturer blant de siste {limit} aktivitetene");
    }

    let mut analyzer = SessionAnalyzer::new(calc);
    for activity in &runs {
        match source.fetch_workout(session, activity) {
            Ok(w) => {
                analyzer.add(&w);
            }
            Err(CorsaError::Unauthorized) => return Err(CorsaError::Unauthorized),
            Err(e) => analyzer.skip(format!("{} ({})", activity.name, activity.id), &e),
        }
    }
    Ok(analyzer.finish())
}
