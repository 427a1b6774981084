//! Per-group sample variances.

use log::debug;
use num_traits::Zero;

use crate::matrix::MatrixAccess;
use crate::utils::{
    run_blocks_strided, tabulate_groups, validate_groups, validate_output_len, Direction, FloatOps,
    Options,
};
use crate::variance;

use super::split_by_group;

/// Labelled two-pass mean/variance over one dense slice; writes one variance
/// per group into `slots`.
fn direct_dense<T: FloatOps>(
    values: &[T],
    group: &[usize],
    slots: &mut [T],
    skip_nan: bool,
    scratch: &mut GroupScratch<T>,
) {
    scratch.reset(slots.len());
    for (j, &val) in values.iter().enumerate() {
        if skip_nan && val.is_nan() {
            continue;
        }
        let g = group[j];
        scratch.total[g] += val;
        scratch.count[g] += 1;
    }
    for g in 0..slots.len() {
        if scratch.count[g] > 0 {
            scratch.mean[g] = scratch.total[g] / T::from(scratch.count[g]).unwrap();
        }
    }
    for (j, &val) in values.iter().enumerate() {
        if skip_nan && val.is_nan() {
            continue;
        }
        let g = group[j];
        let delta = val - scratch.mean[g];
        scratch.sumsq[g] += delta * delta;
    }
    for g in 0..slots.len() {
        slots[g] = variance::finalize(scratch.mean[g], scratch.sumsq[g], scratch.count[g]).1;
    }
}

/// Sparse counterpart: only stored values are visited; each group's
/// structural zeros enter as `zeros * mean^2`, with the zero count derived
/// from the group size and the stored entries routed to that group.
fn direct_sparse<T: FloatOps>(
    values: &[T],
    indices: &[usize],
    group: &[usize],
    group_sizes: &[usize],
    slots: &mut [T],
    skip_nan: bool,
    scratch: &mut GroupScratch<T>,
) {
    scratch.reset(slots.len());
    for (&val, &idx) in values.iter().zip(indices.iter()) {
        let g = group[idx];
        scratch.stored[g] += 1;
        if skip_nan && val.is_nan() {
            scratch.lost[g] += 1;
            continue;
        }
        scratch.total[g] += val;
    }
    for g in 0..slots.len() {
        scratch.count[g] = group_sizes[g] - scratch.lost[g];
        if scratch.count[g] > 0 {
            scratch.mean[g] = scratch.total[g] / T::from(scratch.count[g]).unwrap();
        }
    }
    for (&val, &idx) in values.iter().zip(indices.iter()) {
        if skip_nan && val.is_nan() {
            continue;
        }
        let g = group[idx];
        let delta = val - scratch.mean[g];
        scratch.sumsq[g] += delta * delta;
    }
    for g in 0..slots.len() {
        let zeros = group_sizes[g] - scratch.stored[g];
        if zeros > 0 {
            scratch.sumsq[g] += T::from(zeros).unwrap() * scratch.mean[g] * scratch.mean[g];
        }
        slots[g] = variance::finalize(scratch.mean[g], scratch.sumsq[g], scratch.count[g]).1;
    }
}

struct GroupScratch<T> {
    total: Vec<T>,
    mean: Vec<T>,
    sumsq: Vec<T>,
    count: Vec<usize>,
    stored: Vec<usize>,
    lost: Vec<usize>,
}

impl<T: FloatOps> GroupScratch<T> {
    fn new() -> Self {
        GroupScratch {
            total: Vec::new(),
            mean: Vec::new(),
            sumsq: Vec::new(),
            count: Vec::new(),
            stored: Vec::new(),
            lost: Vec::new(),
        }
    }

    fn reset(&mut self, num_groups: usize) {
        self.total.clear();
        self.total.resize(num_groups, T::zero());
        self.mean.clear();
        self.mean.resize(num_groups, T::zero());
        self.sumsq.clear();
        self.sumsq.resize(num_groups, T::zero());
        self.count.clear();
        self.count.resize(num_groups, 0);
        self.stored.clear();
        self.stored.resize(num_groups, 0);
        self.lost.clear();
        self.lost.resize(num_groups, 0);
    }
}

/// Computes per-group sample variances for every row or column of `matrix`
/// into a flat index-major table with one entry per (index, group) pair.
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

    let direct = matrix.prefers_rows() == (direction == Direction::ROW);
    debug!(
        "computing {:?} grouped variances over {} indices x {} groups ({})",
        direction,
        dim,
        num_groups,
        if direct { "direct" } else { "running" }
    );

    if direct {
        run_blocks_strided(output, num_groups, opt.threads, |start, chunk| {
            let mut scratch = GroupScratch::new();
            let mut values = Vec::with_capacity(otherdim);
            let mut indices = Vec::with_capacity(otherdim);
            let mut buffer = vec![M::Value::zero(); otherdim];
            for (k, slots) in chunk.chunks_mut(num_groups).enumerate() {
                if matrix.is_sparse() {
                    matrix.extract_sparse(direction, start + k, 0..otherdim, &mut values, &mut indices);
                    direct_sparse(
                        &values,
                        &indices,
                        group,
                        group_sizes,
                        slots,
                        opt.skip_nan,
                        &mut scratch,
                    );
                } else {
                    matrix.extract_dense(direction, start + k, 0..otherdim, &mut buffer);
                    direct_dense(&buffer, group, slots, opt.skip_nan, &mut scratch);
                }
            }
            Ok(())
        })
    } else {
        run_blocks_strided(output, num_groups, opt.threads, |start, chunk| {
            let len = chunk.len() / num_groups;
            let mut locals = vec![vec![M::Value::zero(); len]; num_groups];

            if matrix.is_sparse() {
                let mut runners: Vec<variance::RunningSparse<'_, M::Value>> = locals
                    .iter_mut()
                    .map(|buf| variance::RunningSparse::new(buf, opt.skip_nan, start))
                    .collect();
                let mut values = Vec::with_capacity(len);
                let mut indices = Vec::with_capacity(len);
                for i in 0..otherdim {
                    matrix.extract_sparse(
                        direction.flip(),
                        i,
                        start..start + len,
                        &mut values,
                        &mut indices,
                    );
                    runners[group[i]].add(&values, &indices);
                }
                for runner in runners.iter_mut() {
                    runner.finish();
                }
            } else {
                let mut runners: Vec<variance::RunningDense<'_, M::Value>> = locals
                    .iter_mut()
                    .map(|buf| variance::RunningDense::new(buf, opt.skip_nan))
                    .collect();
                let mut buffer = vec![M::Value::zero(); len];
                for i in 0..otherdim {
                    matrix.extract_dense(direction.flip(), i, start..start + len, &mut buffer);
                    runners[group[i]].add(&buffer);
                }
                for runner in runners.iter_mut() {
                    runner.finish();
                }
            }

            for (k, slots) in chunk.chunks_mut(num_groups).enumerate() {
                for (g, local) in locals.iter().enumerate() {
                    slots[g] = local[k];
                }
            }
            Ok(())
        })
    }
}

/// Per-group row variances, one vector per group.
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

/// Per-group column variances, one vector per group.
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

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};
    use ndarray::array;

    use super::*;

    #[test]
    fn test_grouped_row_variances_dense() {
        let matrix = array![[1.0, 2.0, 3.0, 4.0]];
        let groups = vec![0, 1, 0, 1];
        let result = by_row(&matrix, &groups, &Options::default()).unwrap();
        // Group 0 holds {1, 3}, group 1 holds {2, 4}; both have variance 2.
        assert_relative_eq!(result[0][0], 2.0);
        assert_relative_eq!(result[1][0], 2.0);
    }

    #[test]
    fn test_grouped_variances_sparse_matches_dense() {
        // [0 0 2 0]
        // [1 0 0 3]
        let mut coo = CooMatrix::new(2, 4);
        coo.push(0, 2, 2.0);
        coo.push(1, 0, 1.0);
        coo.push(1, 3, 3.0);
        let csr = CsrMatrix::from(&coo);
        let csc = CscMatrix::from(&coo);
        let dense = array![[0.0, 0.0, 2.0, 0.0], [1.0, 0.0, 0.0, 3.0]];
        let groups = vec![0, 0, 1, 1];

        let reference = by_row(&dense, &groups, &Options::default()).unwrap();
        for result in [
            by_row(&csr, &groups, &Options::default()).unwrap(),
            by_row(&csc, &groups, &Options::default()).unwrap(),
        ] {
            for g in 0..2 {
                for i in 0..2 {
                    assert_relative_eq!(result[g][i], reference[g][i], max_relative = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_singleton_group_is_nan() {
        let matrix: ndarray::Array2<f64> = array![[1.0, 2.0, 3.0]];
        let groups = vec![0, 0, 1];
        let result = by_row(&matrix, &groups, &Options::default()).unwrap();
        assert_relative_eq!(result[0][0], 0.5);
        assert!(result[1][0].is_nan());
    }
}
