//! Notion property layout of the three databases, and decoding of the rows we read back.
//!
//! Property names must match the databases exactly; Notion rejects unknown properties.

use crate::domain::analysis::{truncate_chars, PublishedRecord, Sentiment, MAX_BODY_CHARS};
use crate::domain::verdict::{Verdict, VerdictEntry, WeeklySummary};
use crate::storage::Page;
use serde_json::{json, Map, Value};
use uuid::Uuid;

pub mod analysis {
    pub const TITLE: &str = "기사 제목";
    pub const TICKERS: &str = "언급된 종목";
    pub const SENTIMENT: &str = "감성분석";
    pub const CONVICTION: &str = "AI 확신 점수";
    pub const SUMMARY: &str = "AI 분석 요약";
    pub const URL: &str = "URL";
}

pub mod feedback {
    pub const TICKER: &str = "종목";
    pub const PREDICTED: &str = "예측 방향";
    pub const ACTUAL_CHANGE: &str = "실제 변동";
    pub const CORRECT: &str = "예측 정확";
    pub const REASON: &str = "원인 분석";
}

pub mod report {
    pub const TITLE: &str = "보고서 기간";
    pub const ACCURACY: &str = "정확도";
    pub const KEY_TAKEAWAY: &str = "핵심 요약";
    pub const FAILURE: &str = "실패 원인 분석";
    pub const SUCCESS: &str = "성공 비결 분석";
    pub const PROMPT: &str = "개선된 프롬프트 제안";
}

fn text_items(s: &str) -> Value {
    json!([{"text": {"content": truncate_chars(s, MAX_BODY_CHARS)}}])
}

fn title(s: &str) -> Value {
    json!({"title": text_items(s)})
}

fn rich_text(s: &str) -> Value {
    json!({"rich_text": text_items(s)})
}

fn select(name: &str) -> Value {
    json!({"select": {"name": name}})
}

fn heading(s: &str) -> Value {
    json!({"object": "block", "type": "heading_2", "heading_2": {"rich_text": text_items(s)}})
}

fn paragraph(s: &str) -> Value {
    json!({"object": "block", "type": "paragraph", "paragraph": {"rich_text": text_items(s)}})
}

pub fn analysis_properties(record: &PublishedRecord) -> Value {
    let mut props = Map::new();
    props.insert(analysis::TITLE.to_string(), title(&record.title));
    props.insert(analysis::TICKERS.to_string(), rich_text(&record.tickers_text()));
    props.insert(analysis::SENTIMENT.to_string(), select(record.sentiment.as_str()));
    props.insert(
        analysis::CONVICTION.to_string(),
        json!({"number": record.conviction_score}),
    );
    props.insert(analysis::SUMMARY.to_string(), rich_text(&record.summary));
    props.insert(analysis::URL.to_string(), json!({"url": record.link}));
    Value::Object(props)
}

/// Page body: the source summary, then risk and category when the model gave them.
pub fn analysis_children(record: &PublishedRecord) -> Vec<Value> {
    let mut blocks = vec![
        heading("기사 원문 요약"),
        paragraph(&record.article_summary),
    ];
    if let Some(risk) = &record.risk {
        blocks.push(heading("리스크 요인"));
        blocks.push(paragraph(risk));
    }
    if let Some(category) = &record.category {
        blocks.push(paragraph(&format!("분류: {category}")));
    }
    blocks
}

pub fn verdict_properties(verdict: &Verdict) -> Value {
    let mut props = Map::new();
    props.insert(feedback::TICKER.to_string(), title(&verdict.ticker));
    props.insert(feedback::PREDICTED.to_string(), select(verdict.predicted.as_str()));
    props.insert(
        feedback::ACTUAL_CHANGE.to_string(),
        json!({"number": verdict.actual_change_pct}),
    );
    props.insert(feedback::CORRECT.to_string(), json!({"checkbox": verdict.correct}));
    props.insert(feedback::REASON.to_string(), rich_text(&verdict.explanation));
    Value::Object(props)
}

pub fn weekly_summary_properties(summary: &WeeklySummary) -> Value {
    let mut props = Map::new();
    props.insert(report::TITLE.to_string(), title(&summary.title));
    props.insert(report::ACCURACY.to_string(), rich_text(&summary.accuracy_rate));
    props.insert(report::KEY_TAKEAWAY.to_string(), rich_text(&summary.key_takeaway));
    props.insert(report::FAILURE.to_string(), rich_text(&summary.failure_analysis));
    props.insert(report::SUCCESS.to_string(), rich_text(&summary.success_pattern));
    props.insert(report::PROMPT.to_string(), rich_text(&summary.prompt_suggestion));
    Value::Object(props)
}

/// A published analysis row, reduced to what the next-day check needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedPrediction {
    pub page_id: Uuid,
    pub tickers_text: String,
    pub sentiment_label: Option<String>,
}

impl PublishedPrediction {
    pub fn first_ticker(&self) -> Option<&str> {
        self.tickers_text
            .split(',')
            .next()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn sentiment(&self) -> Option<Sentiment> {
        self.sentiment_label.as_deref().and_then(Sentiment::parse_label)
    }
}

pub fn decode_prediction(page: &Page) -> PublishedPrediction {
    PublishedPrediction {
        page_id: page.id,
        tickers_text: plain_text(page.properties.get(analysis::TICKERS)),
        sentiment_label: select_name(page.properties.get(analysis::SENTIMENT)),
    }
}

pub fn decode_verdict(page: &Page) -> VerdictEntry {
    let props = &page.properties;
    VerdictEntry {
        ticker: plain_text(props.get(feedback::TICKER)),
        prediction: select_name(props.get(feedback::PREDICTED)),
        actual_change: props
            .get(feedback::ACTUAL_CHANGE)
            .and_then(|p| p.get("number"))
            .and_then(Value::as_f64),
        reason: plain_text(props.get(feedback::REASON)),
        correct: props
            .get(feedback::CORRECT)
            .and_then(|p| p.get("checkbox"))
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

/// Concatenated text of a `title` or `rich_text` property. Missing or empty yields "".
fn plain_text(prop: Option<&Value>) -> String {
    let Some(prop) = prop else {
        return String::new();
    };
    let items = prop
        .get("title")
        .or_else(|| prop.get("rich_text"))
        .and_then(Value::as_array);

    let mut out = String::new();
    for item in items.into_iter().flatten() {
        let text = item
            .get("plain_text")
            .and_then(Value::as_str)
            .or_else(|| item.pointer("/text/content").and_then(Value::as_str));
        if let Some(text) = text {
            out.push_str(text);
        }
    }
    out
}

fn select_name(prop: Option<&Value>) -> Option<String> {
    prop?
        .get("select")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: Vec<(&str, Value)>) -> Value {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn page(properties: Value) -> Page {
        serde_json::from_value(json!({
            "id": "16fd2706-8baf-433b-82eb-8c7fada847da",
            "properties": properties
        }))
        .unwrap()
    }

    fn record() -> PublishedRecord {
        PublishedRecord {
            title: "엔비디아 신제품".to_string(),
            tickers: vec!["NVDA".to_string(), "AMD".to_string()],
            sentiment: Sentiment::Positive,
            conviction_score: 8,
            summary: "요약".to_string(),
            risk: Some("수요 둔화".to_string()),
            category: None,
            link: None,
            article_summary: "body".to_string(),
        }
    }

    #[test]
    fn analysis_properties_match_layout() {
        let props = analysis_properties(&record());
        assert_eq!(props[analysis::TITLE]["title"][0]["text"]["content"], "엔비디아 신제품");
        assert_eq!(props[analysis::TICKERS]["rich_text"][0]["text"]["content"], "NVDA, AMD");
        assert_eq!(props[analysis::SENTIMENT]["select"]["name"], "Positive");
        assert_eq!(props[analysis::CONVICTION]["number"], 8);
        assert!(props[analysis::URL]["url"].is_null());
    }

    #[test]
    fn children_include_risk_only_when_present() {
        assert_eq!(analysis_children(&record()).len(), 4);
        let mut r = record();
        r.risk = None;
        r.category = Some("product".to_string());
        let blocks = analysis_children(&r);
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[2]["paragraph"]["rich_text"][0]["text"]["content"], "분류: product");
    }

    #[test]
    fn decodes_published_prediction() {
        let p = page(props(vec![
            (analysis::TICKERS, json!({"type": "rich_text", "rich_text": [{"plain_text": " TSLA, F"}]})),
            (analysis::SENTIMENT, json!({"type": "select", "select": {"name": "Negative"}})),
        ]));
        let pred = decode_prediction(&p);
        assert_eq!(pred.first_ticker(), Some("TSLA"));
        assert_eq!(pred.sentiment(), Some(Sentiment::Negative));
    }

    #[test]
    fn decodes_empty_or_missing_properties() {
        let p = page(props(vec![
            (analysis::TICKERS, json!({"type": "rich_text", "rich_text": []})),
            (analysis::SENTIMENT, json!({"type": "select", "select": null})),
        ]));
        let pred = decode_prediction(&p);
        assert_eq!(pred.first_ticker(), None);
        assert_eq!(pred.sentiment(), None);

        let pred = decode_prediction(&page(json!({})));
        assert_eq!(pred.tickers_text, "");
    }

    #[test]
    fn verdict_round_trips_through_properties() {
        let verdict = Verdict::evaluate("AAPL", Sentiment::Positive, 1.234).unwrap();
        let props = verdict_properties(&verdict);
        let entry = decode_verdict(&page(props));
        assert_eq!(entry.ticker, "AAPL");
        assert_eq!(entry.prediction.as_deref(), Some("Positive"));
        assert_eq!(entry.actual_change, Some(1.23));
        assert!(entry.correct);
        assert_eq!(entry.reason, verdict.explanation);
    }
}
