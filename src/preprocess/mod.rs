pub mod dedupe;
pub mod flatten;
pub mod normalize;
pub mod sanitize;
pub mod transform;

pub use dedupe::Deduplicator;
pub use flatten::{flatten_record, WorkRecord};
pub use normalize::{NormalizeError, NormalizedRecord, Normalizer, PipelineRecord};
pub use sanitize::sanitize_record;
pub use transform::{TransformOutcome, TransformSummary, Transformer};
