//! Logging infrastructure: structured insight logging.
//!
//! Provides [`JsonlInsightLogger`], a JSONL file writer that implements
//! the [`InsightObserver`](toolwise_application::InsightObserver) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlInsightLogger;
