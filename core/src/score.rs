use crate::error::{ComputationError, Half, ScoreError};
use crate::metrics::{
    aerobic_decoupling, avg_hr, avg_power, efficiency_factor, grade_adjusted_power, hrr_fraction,
    split_halves,
};
use crate::models::{AthleteProfile, ScorePolicy};
use crate::types::{ScoreResult, Workout, WorkoutSample};

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

/// Regner ut Score 2.0 og CorsaScore for én økt.
///
/// Ren funksjon av (utøver, policy, økt): ingen tilstand, ingen IO. To kall
/// på samme økt gir identisk resultat.
#[derive(Debug, Clone, Default)]
pub struct ScoreCalculator {
    athlete: AthleteProfile,
    policy: ScorePolicy,
}

impl ScoreCalculator {
    pub fn new(athlete: AthleteProfile, policy: ScorePolicy) -> Self {
        Self { athlete, policy }
    }

    pub fn athlete(&self) -> &AthleteProfile {
        &self.athlete
    }

    pub fn policy(&self) -> &ScorePolicy {
        &self.policy
    }

    pub fn score(&self, workout: &Workout) -> Result<ScoreResult, ScoreError> {
        workout.validate(self.policy.min_samples)?;
        let samples = workout.samples();

        // 1) EF pr halvdel → decoupling
        let (first, second) = split_halves(samples);
        let ef_first = half_efficiency(first, Half::First)?;
        let ef_second = half_efficiency(second, Half::Second)?;
        let decoupling_pct =
            aerobic_decoupling(ef_first, ef_second).ok_or(ComputationError::ZeroEfficiency)?;

        // 2) Snitt for hele økta
        let p = avg_power(samples).unwrap_or(0.0);
        let hr = avg_hr(samples).unwrap_or(0.0);
        let efficiency = efficiency_factor(Some(p), Some(hr)).unwrap_or(0.0);

        let grade = if self.policy.grade_adjustment {
            workout.meta().grade()
        } else {
            0.0
        };
        let adjusted_power = grade_adjusted_power(p, grade);

        // 3) Score 2.0
        let hrr = hrr_fraction(hr, &self.athlete);
        let efficiency_ratio = efficiency_ratio(adjusted_power, self.athlete.weight_kg, hrr);
        let duration_s = workout.duration_s();
        let penalty = decoupling_penalty(decoupling_pct, duration_s, self.policy.duration_penalty);
        let raw_score = (efficiency_ratio - self.policy.base_offset) * (1.0 - penalty);

        Ok(ScoreResult {
            decoupling_pct,
            efficiency_factor: efficiency,
            ef_first,
            ef_second,
            avg_power: p,
            adjusted_power,
            avg_hr: hr,
            hrr_pct: hrr * 100.0,
            efficiency_ratio,
            raw_score,
            corsa_score: normalize_score(raw_score, self.policy.peer_median),
            duration_s,
        })
    }
}

/// Snarvei for engangskall.
pub fn score_workout(
    workout: &Workout,
    athlete: &AthleteProfile,
    policy: &ScorePolicy,
) -> Result<ScoreResult, ScoreError> {
    ScoreCalculator::new(athlete.clone(), policy.clone()).score(workout)
}

fn half_efficiency(half: &[WorkoutSample], which: Half) -> Result<f64, ScoreError> {
    let hr = avg_hr(half).unwrap_or(0.0);
    if hr <= 0.0 {
        return Err(ComputationError::ZeroHeartRate(which).into());
    }
    Ok(efficiency_factor(avg_power(half), Some(hr)).unwrap_or(0.0))
}

/// (W_adj / kg) per %HRR-enhet; 0 når pulsen ligger på eller under hvile.
pub fn efficiency_ratio(adjusted_power: f64, weight_kg: f64, hrr_frac: f64) -> f64 {
    if hrr_frac <= 0.0 || weight_kg <= 0.0 {
        return 0.0;
    }
    (adjusted_power / weight_kg) / hrr_frac
}

/// Decoupling-straff som brøk. Med varighetsnormalisering deles den på
/// sqrt(timer): lange økter med lav drift belønnes mer enn korte.
pub fn decoupling_penalty(decoupling_pct: f64, duration_s: f64, per_sqrt_hour: bool) -> f64 {
    let d = decoupling_pct / 100.0;
    if !per_sqrt_hour {
        return d;
    }
    let hours = duration_s / 3600.0;
    if hours > 0.0 {
        d / hours.sqrt()
    } else {
        0.0
    }
}

/// Score 2.0 → 0–100. Peer-medianen havner på 50, dobbel median på 100.
pub fn normalize_score(raw_score: f64, peer_median: f64) -> f64 {
    if !raw_score.is_finite() || peer_median <= 0.0 {
        return SCORE_MIN;
    }
    let val = raw_score / (2.0 * peer_median) * SCORE_MAX;
    val.clamp(SCORE_MIN, SCORE_MAX)
}
