//! Per-group medians.
//!
//! There is no incremental update formula for a median, so every
//! (output index, group) pair collects its contributing values into a
//! per-group workspace and runs the median engine on it. Sparse slices only
//! collect stored values; the structural zeros of each group are recovered
//! from the group size.

use log::debug;
use num_traits::Zero;

use crate::matrix::MatrixAccess;
use crate::median;
use crate::utils::{
    run_blocks_strided, tabulate_groups, validate_groups, validate_output_len, Direction, Options,
};

use super::split_by_group;

/// Computes per-group medians for every row or column of `matrix`.
/// `group_sizes` holds the number of opposite-dimension indices per group,
/// as produced by `tabulate_groups`; `output` is a flat index-major table
/// with one entry per (index, group) pair.
pub fn apply<M>(
    direction: Direction,
    matrix: &M,
    group: &[usize],
    group_sizes: &[usize],
    output: &mut [M::Value],
    opt: &Options,
) -> anyhow::Result<()>
where
    M: MatrixAccess + Sync,
{
    let dim = matrix.dimension_len(direction);
    let otherdim = matrix.dimension_len(direction.flip());
    let num_groups = group_sizes.len();
    validate_groups(group, otherdim, num_groups)?;
    validate_output_len(output.len(), dim * num_groups)?;
    if num_groups == 0 {
        return Ok(());
    }

    debug!(
        "computing {:?} grouped medians over {} indices x {} groups",
        direction, dim, num_groups
    );

    run_blocks_strided(output, num_groups, opt.threads, |start, chunk| {
        let mut workspace: Vec<Vec<M::Value>> = group_sizes
            .iter()
            .map(|&size| Vec::with_capacity(size))
            .collect();
        let mut values = Vec::with_capacity(otherdim);
        let mut indices = Vec::with_capacity(otherdim);
        let mut buffer = vec![M::Value::zero(); otherdim];

        for (k, slots) in chunk.chunks_mut(num_groups).enumerate() {
            if matrix.is_sparse() {
                matrix.extract_sparse(direction, start + k, 0..otherdim, &mut values, &mut indices);
                for (&val, &idx) in values.iter().zip(indices.iter()) {
                    workspace[group[idx]].push(val);
                }
                for (g, w) in workspace.iter_mut().enumerate() {
                    slots[g] = median::compute_sparse(w, group_sizes[g], opt.skip_nan);
                    w.clear();
                }
            } else {
                matrix.extract_dense(direction, start + k, 0..otherdim, &mut buffer);
                for (j, &val) in buffer.iter().enumerate() {
                    workspace[group[j]].push(val);
                }
                for (g, w) in workspace.iter_mut().enumerate() {
                    slots[g] = median::compute(w, opt.skip_nan);
                    w.clear();
                }
            }
        }
        Ok(())
    })
}

/// Per-group row medians, one vector per group.
pub fn by_row<M>(
    matrix: &M,
    group: &[usize],
    opt: &Options,
) -> anyhow::Result<Vec<Vec<M::Value>>>
where
    M: MatrixAccess + Sync,
{
    let group_sizes = tabulate_groups(group);
    let mut flat = vec![M::Value::zero(); matrix.nrows() * group_sizes.len()];
    apply(Direction::ROW, matrix, group, &group_sizes, &mut flat, opt)?;
    Ok(split_by_group(&flat, group_sizes.len()))
}

/// Per-group column medians, one vector per group.
pub fn by_column<M>(
    matrix: &M,
    group: &[usize],
    opt: &Options,
) -> anyhow::Result<Vec<Vec<M::Value>>>
where
    M: MatrixAccess + Sync,
{
    let group_sizes = tabulate_groups(group);
    let mut flat = vec![M::Value::zero(); matrix.ncols() * group_sizes.len()];
    apply(Direction::COLUMN, matrix, group, &group_sizes, &mut flat, opt)?;
    Ok(split_by_group(&flat, group_sizes.len()))
}
