//! Eye-channel attention from gaze, blink rate and EAR.

const GAZE_STEEPNESS: f64 = 8.0;
const GAZE_WEIGHT: f64 = 0.6;
const BLINK_WEIGHT: f64 = 0.25;
const EAR_WEIGHT: f64 = 0.15;

/// Maps blinks/minute to a [0.1, 1.0] factor peaking at 14-18 bpm.
///
/// A rate of exactly zero means no rate is available yet and maps to a
/// neutral 0.5.
pub fn blink_rate_factor(rate: f64) -> f64 {
    if rate == 0.0 {
        0.5
    } else if (14.0..=18.0).contains(&rate) {
        1.0
    } else if (10.0..=22.0).contains(&rate) {
        0.9
    } else if (8.0..10.0).contains(&rate) || (rate > 22.0 && rate <= 28.0) {
        0.7
    } else if (6.0..8.0).contains(&rate) || (rate > 28.0 && rate <= 35.0) {
        0.4
    } else if rate < 6.0 {
        0.3
    } else {
        (0.4 - (rate - 35.0) / 20.0).max(0.1)
    }
}

/// Linear map of EAR from [0.12, 0.4] onto [0.1, 1.0], clamped.
pub fn ear_factor(ear: f64) -> f64 {
    const LOW: f64 = 0.12;
    const HIGH: f64 = 0.4;
    let t = ((ear - LOW) / (HIGH - LOW)).clamp(0.0, 1.0);
    if t.is_nan() {
        return 0.1;
    }
    0.1 + t * 0.9
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-GAZE_STEEPNESS * x).exp())
}

/// Eye attention in [0, 1].
pub fn eye_attention(gaze: f64, blink_rate: f64, ear: f64) -> f64 {
    let gaze = if gaze.is_finite() { gaze } else { 0.5 };
    let mut attention = logistic(gaze - 0.5) * GAZE_WEIGHT
        + blink_rate_factor(blink_rate) * BLINK_WEIGHT
        + ear_factor(ear) * EAR_WEIGHT;

    if gaze > 0.8 {
        attention = (attention * 1.1).min(1.0);
    } else if gaze < 0.3 {
        attention *= 0.8;
    }
    attention.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blink_factor_peaks_in_normal_range() {
        assert_eq!(blink_rate_factor(16.0), 1.0);
        assert_eq!(blink_rate_factor(12.0), 0.9);
        assert_eq!(blink_rate_factor(9.0), 0.7);
        assert_eq!(blink_rate_factor(25.0), 0.7);
        assert_eq!(blink_rate_factor(7.0), 0.4);
        assert_eq!(blink_rate_factor(30.0), 0.4);
        assert_eq!(blink_rate_factor(3.0), 0.3);
        assert_eq!(blink_rate_factor(100.0), 0.1);
        assert_eq!(blink_rate_factor(0.0), 0.5);
    }

    #[test]
    fn blink_factor_decreases_away_from_peak() {
        let mut previous = 1.0;
        let mut rate = 18.0;
        while rate < 120.0 {
            let factor = blink_rate_factor(rate);
            assert!(factor <= previous, "rate {rate}: {factor} > {previous}");
            assert!(factor >= 0.1);
            previous = factor;
            rate += 0.25;
        }

        let mut previous = 1.0;
        let mut rate = 14.0;
        while rate > 0.1 {
            let factor = blink_rate_factor(rate);
            assert!(factor <= previous, "rate {rate}: {factor} > {previous}");
            previous = factor;
            rate -= 0.25;
        }
    }

    #[test]
    fn ear_factor_is_clamped_linear() {
        assert_eq!(ear_factor(0.05), 0.1);
        assert_eq!(ear_factor(0.5), 1.0);
        assert!((ear_factor(0.26) - 0.55).abs() < 1e-9);
    }

    #[test]
    fn attention_stays_in_unit_range() {
        for gi in 0..=20 {
            for bi in 0..=30 {
                for ei in 0..=12 {
                    let gaze = gi as f64 / 20.0;
                    let blink = bi as f64 * 3.0;
                    let ear = ei as f64 * 0.05;
                    let a = eye_attention(gaze, blink, ear);
                    assert!((0.0..=1.0).contains(&a), "{gaze} {blink} {ear} -> {a}");
                }
            }
        }
        assert!((0.0..=1.0).contains(&eye_attention(f64::NAN, 15.0, f64::NAN)));
    }

    #[test]
    fn strong_gaze_is_boosted_and_weak_gaze_penalized() {
        let focused = eye_attention(0.9, 16.0, 0.3);
        let away = eye_attention(0.2, 16.0, 0.3);
        assert!(focused > 0.9);
        assert!(away < 0.4);
    }
}
