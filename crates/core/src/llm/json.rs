use crate::domain::analysis::AnalysisResult;
use crate::domain::contract::{LlmAnalysisItem, LlmWeeklyReport};
use crate::llm::error::{LlmDiagnosticsError, Stage};
use serde_json::Value;

/// The JSON payload of a model reply.
///
/// Code fences (with or without a language tag, on one line or several) and surrounding prose are
/// dropped. The payload runs from the first `[` or `{` to the last matching closer.
pub fn extract_json(text: &str) -> Option<&str> {
    let body = strip_fence(text.trim());
    let start = body.find(|c: char| c == '[' || c == '{')?;
    let close = if body[start..].starts_with('[') { ']' } else { '}' };
    let end = body.rfind(close)?;
    (end > start).then(|| &body[start..=end])
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // The tag ends at the payload or at the end of the fence line, whichever comes first.
    let tag_end = rest
        .find(|c: char| c == '\n' || c == '[' || c == '{')
        .unwrap_or(rest.len());
    let rest = rest[tag_end..].trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse one batch response. Any failure rejects the whole batch.
pub fn parse_analysis_batch(text: &str) -> anyhow::Result<Vec<AnalysisResult>> {
    let json_str = extract_json(text).unwrap_or(text.trim());

    let value = serde_json::from_str::<Value>(json_str).map_err(|e| {
        LlmDiagnosticsError::malformed(Stage::Parse, format!("batch output is not valid JSON: {e}"), text)
    })?;

    // A lone object is tolerated as a one-element batch.
    let value = match value {
        Value::Object(_) => Value::Array(vec![value]),
        other => other,
    };

    let items = serde_json::from_value::<Vec<LlmAnalysisItem>>(value).map_err(|e| {
        LlmDiagnosticsError::malformed(
            Stage::Schema,
            format!("batch output does not match the analysis schema: {e}"),
            text,
        )
    })?;

    items
        .into_iter()
        .enumerate()
        .map(|(pos, item)| {
            item.validate_and_into_result().map_err(|e| {
                LlmDiagnosticsError::malformed(Stage::Schema, format!("item {pos}: {e:#}"), text).into()
            })
        })
        .collect()
}

pub fn parse_weekly_report(text: &str) -> anyhow::Result<LlmWeeklyReport> {
    let json_str = extract_json(text).unwrap_or(text.trim());

    let value = serde_json::from_str::<Value>(json_str).map_err(|e| {
        LlmDiagnosticsError::malformed(Stage::Parse, format!("weekly output is not valid JSON: {e}"), text)
    })?;

    serde_json::from_value::<LlmWeeklyReport>(value).map_err(|e| {
        LlmDiagnosticsError::malformed(
            Stage::Schema,
            format!("weekly output does not match the report schema: {e}"),
            text,
        )
        .into()
    })
}
