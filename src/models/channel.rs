use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// The four fused signal channels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Posture,
    Eye,
    Face,
    Noise,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Posture, Channel::Eye, Channel::Face, Channel::Noise];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Posture => "posture",
            Channel::Eye => "eye",
            Channel::Face => "face",
            Channel::Noise => "noise",
        }
    }

    fn slot(self) -> usize {
        match self {
            Channel::Posture => 0,
            Channel::Eye => 1,
            Channel::Face => 2,
            Channel::Noise => 3,
        }
    }
}

/// One value per [`Channel`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ChannelScores([f64; 4]);

impl ChannelScores {
    pub fn new(posture: f64, eye: f64, face: f64, noise: f64) -> Self {
        Self([posture, eye, face, noise])
    }

    pub fn uniform(value: f64) -> Self {
        Self([value; 4])
    }

    /// Weighted sum of `self` under `weights`.
    pub fn weighted_sum(&self, weights: &ChannelScores) -> f64 {
        Channel::ALL
            .iter()
            .map(|channel| self[*channel] * weights[*channel])
            .sum()
    }
}

impl Index<Channel> for ChannelScores {
    type Output = f64;

    fn index(&self, channel: Channel) -> &f64 {
        &self.0[channel.slot()]
    }
}

impl IndexMut<Channel> for ChannelScores {
    fn index_mut(&mut self, channel: Channel) -> &mut f64 {
        &mut self.0[channel.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_sum_uses_each_channel_once() {
        let scores = ChannelScores::new(100.0, 80.0, 90.0, 100.0);
        let weights = ChannelScores::uniform(0.25);
        assert!((scores.weighted_sum(&weights) - 92.5).abs() < 1e-9);
    }

    #[test]
    fn index_by_channel() {
        let mut scores = ChannelScores::default();
        scores[Channel::Face] = 42.0;
        assert_eq!(scores[Channel::Face], 42.0);
        assert_eq!(scores[Channel::Noise], 0.0);
    }
}
