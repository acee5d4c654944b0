use crate::domain::analysis::{AnalysisResult, Sentiment};
use crate::domain::verdict::WeeklySummary;
use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};

/// One element of the batch-analysis array, as the model emits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAnalysisItem {
    #[serde(default)]
    pub article_index: Option<i64>,
    #[serde(default, alias = "korean_title")]
    pub translated_title: Option<String>,
    #[serde(default)]
    pub mentioned_tickers: Vec<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub conviction_score: Option<f64>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub risk_factors: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl LlmAnalysisItem {
    pub fn validate_and_into_result(self) -> anyhow::Result<AnalysisResult> {
        let sentiment = match self.sentiment.as_deref() {
            None => Sentiment::Neutral,
            Some(label) => match Sentiment::parse_label(label) {
                Some(s) => s,
                None => bail!("unknown sentiment label: {label:?}"),
            },
        };

        let score = self.conviction_score.unwrap_or(0.0);
        ensure!(
            score.is_finite() && (0.0..=10.0).contains(&score),
            "conviction_score must be between 0 and 10 (got {score})"
        );

        let mut tickers: Vec<String> = Vec::with_capacity(self.mentioned_tickers.len());
        for t in self.mentioned_tickers {
            let t = t.trim().trim_start_matches('$').to_ascii_uppercase();
            if !t.is_empty() && !tickers.contains(&t) {
                tickers.push(t);
            }
        }

        Ok(AnalysisResult {
            article_index: self.article_index,
            translated_title: non_empty(self.translated_title),
            tickers,
            sentiment,
            // Truncated so a fractional score never reaches the next whole cutoff.
            conviction_score: score.floor() as u8,
            summary: self.summary.map(|s| s.trim().to_string()).unwrap_or_default(),
            risk: non_empty(self.risk_factors),
            category: non_empty(self.category),
            article: None,
        })
    }
}

/// Weekly self-review object. Only `actionable_improvement` is mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmWeeklyReport {
    #[serde(default)]
    pub weekly_summary: LlmWeeklySummary,
    #[serde(default)]
    pub failure_analysis: LlmFailureAnalysis,
    #[serde(default)]
    pub success_analysis: LlmSuccessAnalysis,
    pub actionable_improvement: LlmImprovement,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmWeeklySummary {
    #[serde(default)]
    pub total_predictions: Option<u32>,
    #[serde(default)]
    pub correct_predictions: Option<u32>,
    #[serde(default)]
    pub accuracy_rate: Option<String>,
    #[serde(default)]
    pub key_takeaway: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmFailureAnalysis {
    #[serde(default)]
    pub recurring_theme: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub root_cause: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmSuccessAnalysis {
    #[serde(default)]
    pub common_pattern: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmImprovement {
    pub needed: bool,
    #[serde(default)]
    pub problem: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
    #[serde(default)]
    pub expected_impact: Option<String>,
}

impl LlmWeeklyReport {
    /// `Ok(None)` when the model does not see a systematic issue.
    ///
    /// `accuracy_rate` is the locally computed figure; the model's own number is ignored.
    pub fn validate_and_into_summary(
        self,
        title: String,
        accuracy_rate: String,
    ) -> anyhow::Result<Option<WeeklySummary>> {
        if !self.actionable_improvement.needed {
            return Ok(None);
        }

        let solution = non_empty(self.actionable_improvement.solution);
        if solution.is_none() {
            tracing::warn!("improvement flagged as needed without a solution");
        }

        let theme = or_na(self.failure_analysis.recurring_theme);
        let root_cause = or_na(self.failure_analysis.root_cause);
        let mut prompt_suggestion = or_na(solution);
        if let Some(problem) = non_empty(self.actionable_improvement.problem) {
            prompt_suggestion = format!("{prompt_suggestion}\n문제: {problem}");
        }

        Ok(Some(WeeklySummary {
            title,
            accuracy_rate,
            key_takeaway: or_na(self.weekly_summary.key_takeaway),
            failure_analysis: format!("{theme}\n근본 원인: {root_cause}"),
            success_pattern: or_na(self.success_analysis.common_pattern),
            prompt_suggestion,
        }))
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn or_na(s: Option<String>) -> String {
    non_empty(s).unwrap_or_else(|| "N/A".to_string())
}
