use crate::domain::analysis::Sentiment;
use serde::{Deserialize, Serialize};

pub const SUCCESS_EXPLANATION: &str = "성공: 예측 방향과 실제 주가 움직임이 일치";
pub const FAILURE_EXPLANATION: &str = "실패: 예측 방향과 실제 주가 움직임이 불일치";

/// Next-day check of one published prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub ticker: String,
    pub predicted: Sentiment,
    /// Percent, rounded to 2 decimals.
    pub actual_change_pct: f64,
    pub correct: bool,
    pub explanation: String,
}

impl Verdict {
    /// Returns `None` for non-directional predictions; those are never scored.
    pub fn evaluate(ticker: &str, predicted: Sentiment, change_pct: f64) -> Option<Self> {
        if !predicted.is_directional() {
            return None;
        }

        let correct = is_direction_correct(predicted, change_pct);
        let explanation = if correct {
            SUCCESS_EXPLANATION
        } else {
            FAILURE_EXPLANATION
        };

        Some(Self {
            ticker: ticker.to_string(),
            predicted,
            actual_change_pct: round2(change_pct),
            correct,
            explanation: explanation.to_string(),
        })
    }
}

/// A flat move counts as a miss for both directions.
pub fn is_direction_correct(predicted: Sentiment, change_pct: f64) -> bool {
    match predicted {
        Sentiment::Positive => change_pct > 0.0,
        Sentiment::Negative => change_pct < 0.0,
        Sentiment::Neutral => false,
    }
}

pub fn percent_change(previous_close: f64, last_close: f64) -> Option<f64> {
    if previous_close == 0.0 || !previous_close.is_finite() || !last_close.is_finite() {
        return None;
    }
    Some((last_close - previous_close) / previous_close * 100.0)
}

pub fn accuracy_rate(successful: usize, failed: usize) -> String {
    let total = successful + failed;
    let pct = if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64 * 100.0
    };
    format!("{pct:.1}%")
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// A verdict as read back from the feedback database for the weekly review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictEntry {
    pub ticker: String,
    pub prediction: Option<String>,
    pub actual_change: Option<f64>,
    pub reason: String,
    #[serde(skip)]
    pub correct: bool,
}

/// Written only when the weekly review reports a systematic failure pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub title: String,
    pub accuracy_rate: String,
    pub key_takeaway: String,
    pub failure_analysis: String,
    pub success_pattern: String,
    pub prompt_suggestion: String,
}
