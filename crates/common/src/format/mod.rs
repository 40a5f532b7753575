// Formatting: segment → operation translation and batching helpers.

pub mod builder;

pub use builder::build_formatting_operations;

use crate::types::{MutationOperation, Range};

/// Splits `operations` into batches of at most `batch_size`, preserving order.
pub fn batch_operations(
    operations: &[MutationOperation],
    batch_size: usize,
) -> Vec<&[MutationOperation]> {
    operations.chunks(batch_size.max(1)).collect()
}

/// Smallest range covering every addressed operation in `operations`.
pub fn covering_range(operations: &[MutationOperation]) -> Option<Range> {
    operations.iter().filter_map(MutationOperation::range).reduce(|acc, range| {
        Range::new(acc.start.min(range.start), acc.end.max(range.end))
    })
}
