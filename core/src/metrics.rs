use crate::models::AthleteProfile;
use crate::types::WorkoutSample;

pub trait RoundTo {
    fn round_to(self, dp: u32) -> f64;
}

impl RoundTo for f64 {
    #[inline]
    fn round_to(self, dp: u32) -> f64 {
        if dp == 0 {
            return self.round();
        }
        let factor = 10_f64.powi(dp as i32);
        (self * factor).round() / factor
    }
}

pub fn avg_power(samples: &[WorkoutSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().map(|s| s.power).sum();
    Some(sum / samples.len() as f64)
}

pub fn avg_hr(samples: &[WorkoutSample]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().map(|s| s.heart_rate as f64).sum();
    Some(sum / samples.len() as f64)
}

/// EF = AvgPower / AvgHR (watt per slag/min).
pub fn efficiency_factor(avg_p: Option<f64>, avg_hr: Option<f64>) -> Option<f64> {
    match (avg_p, avg_hr) {
        (Some(p), Some(h)) if h > 0.0 => Some(p / h),
        _ => None,
    }
}

/// Del økta i to sammenhengende halvdeler etter tid.
///
/// `mid = t0 + (tN - t0) / 2`; første halvdel er `t < mid`, resten havner i
/// andre. Midtre sample i en jevnt samplet odde serie ligger på `mid` og går
/// dermed til andre halvdel (samme som `split_at(n / 2)`).
pub fn split_halves(samples: &[WorkoutSample]) -> (&[WorkoutSample], &[WorkoutSample]) {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(a), Some(b)) => (a.timestamp, b.timestamp),
        _ => return samples.split_at(0),
    };
    let mid = first + (last - first) / 2.0;
    let idx = samples.partition_point(|s| s.timestamp < mid);
    samples.split_at(idx)
}

/// Decoupling (%) = (EF1 - EF2) / EF1 * 100. Positiv = pulsen drifter opp.
pub fn aerobic_decoupling(ef_first: f64, ef_second: f64) -> Option<f64> {
    if ef_first <= 0.0 || !ef_first.is_finite() {
        return None;
    }
    Some((ef_first - ef_second) / ef_first * 100.0)
}

/// %HRR som brøk: (HR - hvile) / (maks - hvile). 0 uten pulsreserve.
pub fn hrr_fraction(avg_hr: f64, profile: &AthleteProfile) -> f64 {
    let range = profile.hr_reserve();
    if range > 0.0 {
        (avg_hr - profile.hr_rest as f64) / range
    } else {
        0.0
    }
}

/// W_adj = snitt watt * (1 + stigning)
#[inline]
pub fn grade_adjusted_power(avg_p: f64, grade: f64) -> f64 {
    avg_p * (1.0 + grade)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(t: f64) -> WorkoutSample {
        WorkoutSample::new(t, 150, 200.0)
    }

    #[test]
    fn split_even_series() {
        let xs = [s(0.0), s(1.0), s(2.0), s(3.0)];
        let (a, b) = split_halves(&xs);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn split_odd_series_puts_middle_in_second_half() {
        let xs = [s(0.0), s(1.0), s(2.0), s(3.0), s(4.0)];
        let (a, b) = split_halves(&xs);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 3);
        assert_eq!(b[0].timestamp, 2.0);
    }

    #[test]
    fn split_uses_elapsed_time_not_index() {
        // Tett sampling i starten: tid, ikke antall, bestemmer delingen
        let xs = [s(0.0), s(1.0), s(2.0), s(3.0), s(10.0)];
        let (a, b) = split_halves(&xs);
        assert_eq!(a.len(), 4);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn round_to_dp() {
        assert_eq!(1.23456_f64.round_to(2), 1.23);
        assert_eq!(2.5_f64.round_to(0), 3.0);
    }

    #[test]
    fn hrr_without_reserve_is_zero() {
        let p = AthleteProfile {
            weight_kg: 70.0,
            hr_rest: 60,
            hr_max: 60,
        };
        assert_eq!(hrr_fraction(150.0, &p), 0.0);
    }
}
