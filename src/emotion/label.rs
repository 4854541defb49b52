use serde::{Deserialize, Serialize};

/// Emotion labels produced by the classifier. Labels outside the known set
/// collapse to `Unknown`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Surprise,
    Fear,
    Angry,
    Disgust,
    Sad,
    Unknown,
}

impl Emotion {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "neutral" => Emotion::Neutral,
            "happy" => Emotion::Happy,
            "surprise" => Emotion::Surprise,
            "fear" => Emotion::Fear,
            "angry" => Emotion::Angry,
            "disgust" => Emotion::Disgust,
            "sad" => Emotion::Sad,
            _ => Emotion::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Surprise => "surprise",
            Emotion::Fear => "fear",
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Sad => "sad",
            Emotion::Unknown => "unknown",
        }
    }

    /// Face-channel attention associated with the label.
    pub fn weight(&self) -> f64 {
        match self {
            Emotion::Neutral => 90.0,
            Emotion::Happy => 85.0,
            Emotion::Surprise => 80.0,
            Emotion::Fear | Emotion::Angry | Emotion::Disgust => 50.0,
            Emotion::Sad => 45.0,
            Emotion::Unknown => 65.0,
        }
    }
}

impl Default for Emotion {
    fn default() -> Self {
        Emotion::Neutral
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
