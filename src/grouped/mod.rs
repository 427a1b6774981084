//! Per-group statistics, routed by a label array over the opposite dimension.
//!
//! Group labels must lie in `[0, G)`; label arrays are validated before any
//! parallel work starts. `apply` entry points write a flat index-major table
//! of `G` entries per output index; the `by_row`/`by_column` wrappers return
//! one vector per group.

pub mod medians;
pub mod sums;
pub mod variances;

/// Splits a flat index-major `dim x num_groups` table into per-group vectors.
pub(crate) fn split_by_group<T: Copy>(flat: &[T], num_groups: usize) -> Vec<Vec<T>> {
    if num_groups == 0 {
        return Vec::new();
    }
    let dim = flat.len() / num_groups;
    (0..num_groups)
        .map(|g| (0..dim).map(|i| flat[i * num_groups + g]).collect())
        .collect()
}
