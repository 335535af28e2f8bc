mod drivers;
mod traits;

pub use drivers::files::{JsonCommentSource, JsonEpisodeCatalog};
pub use drivers::scorer::{HttpSentimentScorer, ScorerConfig};
pub use traits::{CommentSource, EpisodeCatalog, SentimentScorer};
