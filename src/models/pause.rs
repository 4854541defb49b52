use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PauseSpan {
    pub started_at: f64,
    pub ended_at: Option<f64>,
}

impl PauseSpan {
    pub fn open(started_at: f64) -> Self {
        Self {
            started_at,
            ended_at: None,
        }
    }

    pub fn close(&mut self, ended_at: f64) {
        if self.ended_at.is_none() {
            self.ended_at = Some(ended_at.max(self.started_at));
        }
    }

    /// Length of the pause; an open pause runs until `now_secs`.
    pub fn duration_secs(&self, now_secs: f64) -> f64 {
        let end = self.ended_at.unwrap_or(now_secs);
        (end - self.started_at).max(0.0)
    }
}
