//! Decibel estimation and the noise attention step function.

use crate::config::NoiseConfig;

/// RMS of signed 16-bit PCM samples.
pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|s| f64::from(*s).powi(2)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Sound level relative to the configured reference, floored at `min_db`.
pub fn decibels(samples: &[i16], config: &NoiseConfig) -> f64 {
    let rms = rms(samples);
    if rms < 1.0 {
        return config.min_db;
    }
    let db = config.reference_spl + 20.0 * (rms / config.reference_rms).log10();
    if db.is_finite() {
        db.max(config.min_db)
    } else {
        config.min_db
    }
}

/// Step mapping from ambient level to attention.
pub fn noise_attention(db: f64) -> f64 {
    if db < 40.0 {
        100.0
    } else if db < 50.0 {
        85.0
    } else if db < 60.0 {
        60.0
    } else if db < 65.0 {
        40.0
    } else if db < 70.0 {
        20.0
    } else {
        5.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_room_scores_full_attention() {
        for db in [30.0, 30.0, 30.0] {
            assert_eq!(noise_attention(db), 100.0);
        }
        assert_eq!(noise_attention(72.0), 5.0);
    }

    #[test]
    fn attention_steps() {
        assert_eq!(noise_attention(39.9), 100.0);
        assert_eq!(noise_attention(40.0), 85.0);
        assert_eq!(noise_attention(55.0), 60.0);
        assert_eq!(noise_attention(64.0), 40.0);
        assert_eq!(noise_attention(69.9), 20.0);
        assert_eq!(noise_attention(70.0), 5.0);
    }

    #[test]
    fn silence_is_floored() {
        let config = NoiseConfig::default();
        assert_eq!(decibels(&[0; 1024], &config), 35.0);
        assert_eq!(decibels(&[], &config), 35.0);
    }

    #[test]
    fn full_scale_square_wave_hits_reference_spl() {
        let config = NoiseConfig::default();
        let samples: Vec<i16> = (0..1000)
            .map(|i| if i % 2 == 0 { 32767 } else { -32767 })
            .collect();
        assert!((decibels(&samples, &config) - 94.0).abs() < 1e-9);
    }

    #[test]
    fn rms_handles_extremes() {
        let samples = [i16::MIN, i16::MIN];
        assert_eq!(rms(&samples), 32768.0);
    }
}
