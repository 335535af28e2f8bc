mod annotator;
mod orchestrator;
mod trend;

#[cfg(test)]
mod testing;

pub use annotator::annotate;
pub use orchestrator::{BackfillReport, Orchestrator};
pub use trend::TrendAggregator;
