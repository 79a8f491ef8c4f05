use serde::Serialize;

use crate::utils::iso_timestamp_utc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Excellent,
    Good,
    KeepPracticing,
}

/// Answer counters for one user session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total_answered: u64,
    pub correct: u64,
    pub incorrect: u64,
    /// RFC3339 timestamp of the first question served in this session.
    pub started_at: Option<String>,
}

impl UserStats {
    pub fn mark_started(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(iso_timestamp_utc());
        }
    }

    pub fn record(&mut self, correct: bool) {
        self.mark_started();
        self.total_answered += 1;
        if correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
    }

    /// Percentage of correct answers, `None` before the first answer.
    pub fn accuracy(&self) -> Option<f64> {
        if self.total_answered == 0 {
            return None;
        }
        Some(self.correct as f64 * 100.0 / self.total_answered as f64)
    }

    pub fn rating(&self) -> Option<Rating> {
        let pct = self.accuracy()?;
        Some(if pct >= 80.0 {
            Rating::Excellent
        } else if pct >= 60.0 {
            Rating::Good
        } else {
            Rating::KeepPracticing
        })
    }
}
