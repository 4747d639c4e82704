//! Invocation context: value model, flattening and similarity.
//!
//! - [`value::Context`] / [`value::ContextValue`]: recursive context snapshot
//! - [`similarity::context_similarity`]: structural similarity in `[0, 1]`

pub mod similarity;
pub mod value;

pub use similarity::{SimilarityWeights, context_similarity};
pub use value::{Context, ContextValue};
