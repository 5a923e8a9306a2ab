use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Prosess-globale tellere. Registreres ved grensen (batch, Strava),
/// aldri inne i selve scoreberegningen.
pub struct Metrics {
    pub registry: Registry,
    pub workouts_scored: IntCounter,
    pub workouts_rejected: IntCounterVec,
    pub strava_requests: IntCounterVec,
    pub decoupling_pct: Histogram,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let workouts_scored =
            IntCounter::new("corsascore_workouts_scored_total", "Workouts scored")?;
        let workouts_rejected = IntCounterVec::new(
            Opts::new("corsascore_workouts_rejected_total", "Workouts skipped"),
            &["reason"],
        )?;
        let strava_requests = IntCounterVec::new(
            Opts::new("corsascore_strava_requests_total", "Strava API calls"),
            &["endpoint", "outcome"],
        )?;
        let decoupling_pct = Histogram::with_opts(
            HistogramOpts::new("corsascore_decoupling_pct", "Aerobic decoupling (%)")
                .buckets(vec![-5.0, 0.0, 2.5, 5.0, 7.5, 10.0, 15.0, 20.0]),
        )?;

        registry.register(Box::new(workouts_scored.clone()))?;
        registry.register(Box::new(workouts_rejected.clone()))?;
        registry.register(Box::new(strava_requests.clone()))?;
        registry.register(Box::new(decoupling_pct.clone()))?;

        Ok(Self {
            registry,
            workouts_scored,
            workouts_rejected,
            strava_requests,
            decoupling_pct,
        })
    }

    /// Prometheus tekstformat.
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            log::warn!("[metrics] encode feilet: {e}");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

pub static METRICS: Lazy<Metrics> =
    Lazy::new(|| Metrics::new().expect("static metric definitions are valid"));

pub fn workout_scored(decoupling_pct: f64) {
    METRICS.workouts_scored.inc();
    if decoupling_pct.is_finite() {
        METRICS.decoupling_pct.observe(decoupling_pct);
    }
}

pub fn workout_rejected(reason: &str) {
    METRICS.workouts_rejected.with_label_values(&[reason]).inc();
}

pub fn strava_request(endpoint: &str, outcome: &str) {
    METRICS
        .strava_requests
        .with_label_values(&[endpoint, outcome])
        .inc();
}

pub fn render() -> String {
    METRICS.render()
}
