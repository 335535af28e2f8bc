use adapter::SentimentScorer;
use domain::trend::round2;
use domain::{ClassifiedComment, EnrichedComment, PipelineError};
use tracing::{debug, info};

/// Scores every comment through `scorer`, one call at a time, in input order.
///
/// Any scorer error or out-of-range score fails the whole batch.
pub async fn annotate(
    scorer: &dyn SentimentScorer,
    comments: Vec<ClassifiedComment>,
) -> Result<Vec<EnrichedComment>, PipelineError> {
    let total = comments.len();
    let mut enriched = Vec::with_capacity(total);

    for (index, comment) in comments.into_iter().enumerate() {
        let raw = scorer
            .score(&comment.comment.text)
            .await
            .map_err(|e| PipelineError::ScorerFailure {
                index,
                reason: format!("{:#}", e),
            })?;

        if !raw.is_finite() || !(-1.0..=1.0).contains(&raw) {
            return Err(PipelineError::ScorerFailure {
                index,
                reason: format!("score {} outside [-1, 1]", raw),
            });
        }

        let score = round2(raw);
        debug!("comment {}/{} scored {}", index + 1, total, score);
        enriched.push(comment.enrich(score));
    }

    info!("Annotated {} comments", total);
    Ok(enriched)
}
