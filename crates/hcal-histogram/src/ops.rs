//! Additive operations on distributions

use crate::types::Distribution;
use hcal_core::{Error, Result};

/// Operations that combine distributions sharing one layout
pub trait DistributionOps {
    /// Check whether two distributions have identical layouts
    fn is_compatible(&self, other: &Self) -> bool;

    /// Add `other` bin-wise into `self`
    ///
    /// Per-cell sums of weights and of squared weights, the entry count and
    /// the moment accumulators all add linearly.
    fn merge(&mut self, other: &Self) -> Result<()>;
}

impl DistributionOps for Distribution {
    fn is_compatible(&self, other: &Self) -> bool {
        self.x_axis() == other.x_axis()
            && self.y_axis() == other.y_axis()
            && self.stat_overflows() == other.stat_overflows()
    }

    fn merge(&mut self, other: &Self) -> Result<()> {
        if !self.is_compatible(other) {
            return Err(Error::InvalidParameter(format!(
                "cannot merge {other} into {self}: layouts differ"
            )));
        }
        self.merge_storage(other);
        Ok(())
    }
}

/// Sum a sequence of distributions in iteration order
///
/// Returns `None` for an empty sequence.
pub fn sum_all<'a, I>(parts: I) -> Result<Option<Distribution>>
where
    I: IntoIterator<Item = &'a Distribution>,
{
    let mut iter = parts.into_iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    let mut total = first.clone();
    for part in iter {
        total.merge(part)?;
    }
    Ok(Some(total))
}
