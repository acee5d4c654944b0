use crate::domain::analysis::AnalysisResult;
use crate::domain::article::Article;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json::parse_analysis_batch;
use crate::llm::prompts::batch_analysis_prompt;
use crate::pipeline::context::RunContext;

/// Analyze articles in fixed-size batches, one model call per batch.
///
/// A failed batch contributes nothing and the remaining batches still run.
pub async fn analyze_articles(ctx: &mut RunContext, articles: &[Article]) -> Vec<AnalysisResult> {
    let batch_size = ctx.options.batch_size.max(1);
    let batches = articles.len().div_ceil(batch_size);

    let mut results = Vec::new();
    for (i, chunk) in articles.chunks(batch_size).enumerate() {
        let batch = i + 1;
        tracing::info!(batch, batches, articles = chunk.len(), "analyzing batch");

        let prompt = batch_analysis_prompt(chunk);
        let parsed = match ctx.generate(&prompt).await {
            Ok(text) => parse_analysis_batch(&text),
            Err(err) => Err(err),
        };

        match parsed {
            Ok(batch_results) => {
                tracing::info!(batch, results = batch_results.len(), "batch analyzed");
                results.extend(batch_results.into_iter().map(|r| attach_article(r, chunk)));
            }
            Err(err) => log_batch_failure(batch, &err),
        }
    }

    results
}

fn attach_article(mut result: AnalysisResult, chunk: &[Article]) -> AnalysisResult {
    result.article = result
        .article_index
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| chunk.get(i))
        .cloned();
    if result.article.is_none() {
        tracing::debug!(article_index = ?result.article_index, "result has no matching article");
    }
    result
}

fn log_batch_failure(batch: usize, err: &anyhow::Error) {
    match err.downcast_ref::<LlmDiagnosticsError>() {
        Some(diag) if diag.is_malformed_output() => tracing::error!(
            batch,
            stage = %diag.stage,
            detail = %diag.detail,
            raw_output = diag.raw_output.as_deref().unwrap_or(""),
            "batch output rejected"
        ),
        _ => tracing::error!(batch, error = %format!("{err:#}"), "batch analysis failed"),
    }
}
