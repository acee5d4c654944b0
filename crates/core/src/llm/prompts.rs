use crate::domain::article::Article;
use crate::domain::verdict::VerdictEntry;

pub fn batch_analysis_prompt(articles: &[Article]) -> String {
    let mut inputs = String::new();
    for (i, article) in articles.iter().enumerate() {
        inputs.push_str(&format!(
            "<article index=\"{i}\"><title>{}</title><content>{}</content></article>\n",
            article.title.trim(),
            article.summary.trim()
        ));
    }

    let instructions = [
        "You are a senior equity analyst. Predict the short-term (next trading day) stock move implied by each news article.",
        "",
        "For every article:",
        "1. Materiality: does it carry concrete, price-moving information? Rehashed or generic news is low conviction.",
        "2. Cause: what happened, how large is it, and how does it compare with market expectations?",
        "3. Direction: bullish catalysts (beats, share gains, favorable regulation), bearish catalysts (guidance cuts, losses, regulatory headwinds), or neutral (nothing new, priced in, offsetting).",
        "4. Conviction: 8-10 clear quantified catalyst; 5-7 important but vague or mixed; 1-4 speculative or minor.",
        "",
        "Only name specific publicly traded tickers. Separate facts from analyst opinion.",
        "",
        "Output schema (one object per article):",
        "{",
        "  \"article_index\": 0,",
        "  \"translated_title\": \"기사 제목의 한국어 번역\",",
        "  \"mentioned_tickers\": [\"AAPL\"],",
        "  \"sentiment\": \"Positive|Negative|Neutral\",",
        "  \"conviction_score\": 7,",
        "  \"summary\": \"한국어 3-4문장: 핵심 사건(수치 포함), 주가 영향 논리, 시간 프레임\",",
        "  \"risk_factors\": \"한국어 1문장: 반대 시나리오 (없으면 null)\",",
        "  \"category\": \"earnings|guidance|product|regulation|macro|m&a|other\"",
        "}",
        "",
        "Return ONLY a valid JSON array. No markdown, no prose outside the JSON.",
    ]
    .join("\n");

    format!("{instructions}\n\n### Articles\n{inputs}")
}

pub fn weekly_review_prompt(
    failed: &[VerdictEntry],
    successful: &[VerdictEntry],
    accuracy_rate: &str,
) -> String {
    let total = failed.len() + successful.len();
    let failed_json = serde_json::to_string(failed).unwrap_or_else(|_| "[]".to_string());
    let successful_json = serde_json::to_string(successful).unwrap_or_else(|_| "[]".to_string());

    format!(
        "You are auditing an AI that predicts next-day stock direction from news.\n\n\
### Performance data\n\
- Failed predictions: {failed_json}\n\
- Successful predictions: {successful_json}\n\
- Accuracy: {accuracy_rate} ({correct}/{total})\n\n\
Look for SYSTEMATIC, recurring failure patterns (not random noise). Return ONLY this JSON object:\n\
{{\n\
  \"weekly_summary\": {{\n\
    \"total_predictions\": {total},\n\
    \"correct_predictions\": {correct},\n\
    \"accuracy_rate\": \"{accuracy_rate}\",\n\
    \"key_takeaway\": \"한 문장 요약 (한국어)\"\n\
  }},\n\
  \"failure_analysis\": {{\n\
    \"recurring_theme\": \"반복되는 실패 패턴 (한국어)\",\n\
    \"examples\": [\"TSLA\"],\n\
    \"root_cause\": \"실패 원인 (한국어)\"\n\
  }},\n\
  \"success_analysis\": {{\n\
    \"common_pattern\": \"성공 예측의 공통점 (한국어)\",\n\
    \"examples\": [\"NVDA\"]\n\
  }},\n\
  \"actionable_improvement\": {{\n\
    \"needed\": true,\n\
    \"problem\": \"핵심 약점 (한국어)\",\n\
    \"solution\": \"Concrete change to the analysis prompt\",\n\
    \"expected_impact\": \"기대 효과 (한국어)\"\n\
  }}\n\
}}\n\n\
Set \"needed\" to false when accuracy is above 70% or the failures look random.",
        correct = successful.len(),
    )
}
