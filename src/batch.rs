//! Batch planning over manifest index space.

use std::ops::Range;

use log::debug;

use crate::error::{Error, Result};

/// Ordered half-open index ranges covering `[0, total)` exactly once.
///
/// Planning is a pure function of `(total, batch_size, min_batch)`, so the
/// fit and transform passes derive identical plans independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    ranges: Vec<Range<usize>>,
}

impl BatchPlan {
    /// Number of planned batches.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Ranges in processing order.
    pub fn iter(&self) -> std::slice::Iter<'_, Range<usize>> {
        self.ranges.iter()
    }
}

impl<'a> IntoIterator for &'a BatchPlan {
    type Item = &'a Range<usize>;
    type IntoIter = std::slice::Iter<'a, Range<usize>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

/// Partitions `total` samples into ranges of `batch_size`, absorbing a
/// trailing remainder into the last range whenever it would come out
/// smaller than `min_batch`.
///
/// The lookahead is evaluated on the sample count remaining past the
/// unclamped candidate end, so a remainder of exactly `min_batch` still
/// becomes its own range. A stride below `min_batch` is widened to
/// `min_batch`, since every emitted range has to be viable on its own. The
/// one exception is a dataset smaller than `min_batch`: it yields a single
/// undersized range, because there is no predecessor to merge into, and
/// whether that range is usable is the caller's call.
pub fn plan(total: usize, batch_size: usize, min_batch: usize) -> Result<BatchPlan> {
    if batch_size == 0 {
        return Err(Error::InvalidConfiguration("batch size must be at least 1".into()));
    }
    if min_batch == 0 {
        return Err(Error::InvalidConfiguration(
            "minimum batch size must be at least 1".into(),
        ));
    }
    let stride = batch_size.max(min_batch);
    if stride > batch_size {
        debug!("batch size {batch_size} is below the minimum {min_batch}, widening to {stride}");
    }

    let mut ranges = Vec::new();
    let mut start = 0;
    while start < total {
        let mut end = total.min(start + stride);
        if total.saturating_sub(start + stride) < min_batch {
            if end < total {
                debug!("absorbing trailing remainder [{end}, {total}) into the batch at {start}");
            }
            end = total;
        }
        ranges.push(start..end);
        start = end;
    }
    Ok(BatchPlan { ranges })
}
