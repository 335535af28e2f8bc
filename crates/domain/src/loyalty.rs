use chrono::{DateTime, Duration, FixedOffset};

use crate::error::PipelineError;
use crate::models::{ClassifiedComment, Comment, ReaderLoyalty};

/// Readers who comment within this window after the earliest captured
/// comment count as loyal.
pub const LOYALTY_WINDOW_HOURS: i64 = 12;

/// `posted_at` of the earliest comment plus the loyalty window.
///
/// The batch must be newest-first, so the earliest comment is the last one.
/// Ordering is checked rather than assumed.
pub fn threshold_time(comments: &[Comment]) -> Result<DateTime<FixedOffset>, PipelineError> {
    let earliest = comments.last().ok_or(PipelineError::EmptyBatch)?;

    if let Some(index) = comments
        .windows(2)
        .position(|pair| pair[1].posted_at > pair[0].posted_at)
    {
        return Err(PipelineError::OrderingViolation { index: index + 1 });
    }

    earliest
        .posted_at
        .checked_add_signed(Duration::hours(LOYALTY_WINDOW_HOURS))
        .ok_or_else(|| PipelineError::MalformedTimestamp {
            index: comments.len() - 1,
            value: earliest.posted_at.to_rfc3339(),
        })
}

pub fn classify(comment: &Comment, threshold: DateTime<FixedOffset>) -> ReaderLoyalty {
    if comment.posted_at <= threshold {
        ReaderLoyalty::Loyal
    } else {
        ReaderLoyalty::Casual
    }
}

/// Derives the threshold once and labels every comment, keeping order.
pub fn classify_batch(comments: Vec<Comment>) -> Result<Vec<ClassifiedComment>, PipelineError> {
    let threshold = threshold_time(&comments)?;
    Ok(comments
        .into_iter()
        .map(|c| {
            let loyalty = classify(&c, threshold);
            c.classify(loyalty)
        })
        .collect())
}
