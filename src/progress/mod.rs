//! Progress trackers for historical sync.
//!
//! [`RangeProgress`] tracks how much of a source's target block range has
//! been fetched; [`BlockProgress`] tracks which block bodies have been
//! persisted. Both expose a monotone checkpoint.

mod block;
mod range;

pub use block::{BlockCheckpoint, BlockProgress};
pub use range::{ProgressUpdate, RangeProgress};
