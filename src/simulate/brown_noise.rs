use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Brown noise generator (integrated white noise), producing 16-bit PCM.
/// `amplitude` scales full scale; 0.3 is a busy room, 0.005 a quiet one.
pub struct BrownNoise {
    last_value: f64,
    amplitude: f64,
    rng: StdRng,
}

impl BrownNoise {
    pub fn new(amplitude: f64, seed: Option<u64>) -> Self {
        Self {
            last_value: 0.0,
            amplitude: amplitude.clamp(0.0, 1.0),
            rng: seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64),
        }
    }

    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.amplitude = amplitude.clamp(0.0, 1.0);
    }

    pub fn chunk(&mut self, len: usize) -> Vec<i16> {
        self.take(len).collect()
    }
}

impl Iterator for BrownNoise {
    type Item = i16;

    fn next(&mut self) -> Option<Self::Item> {
        let white: f64 = self.rng.gen_range(-1.0..1.0);

        self.last_value += white * 0.02;
        self.last_value = self.last_value.clamp(-1.0, 1.0);

        // Decay keeps the walk centered.
        self.last_value *= 0.9999;

        Some((self.last_value * self.amplitude * f64::from(i16::MAX)) as i16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NoiseConfig;
    use crate::noise::decibels;

    #[test]
    fn louder_noise_reads_higher() {
        let config = NoiseConfig::default();
        let quiet = BrownNoise::new(0.001, Some(7)).chunk(48_000);
        let loud = BrownNoise::new(1.0, Some(7)).chunk(48_000);
        assert_eq!(quiet.len(), 48_000);
        assert!(decibels(&loud, &config) > decibels(&quiet, &config));
    }

    #[test]
    fn silent_generator_is_floored() {
        let config = NoiseConfig::default();
        let silent = BrownNoise::new(0.0, Some(1)).chunk(1_000);
        assert_eq!(decibels(&silent, &config), config.min_db);
    }
}
