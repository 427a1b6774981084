//! Per-group sums in a single traversal.

use log::debug;
use num_traits::{Float, Zero};

use crate::matrix::MatrixAccess;
use crate::sum;
use crate::utils::{
    run_blocks_strided, total_groups, validate_groups, validate_output_len, Direction, Options,
};

use super::split_by_group;

/// Computes per-group sums for every row or column of `matrix`. `group` holds
/// one label per opposite-dimension index, in `[0, num_groups)`; `output` is a
/// flat index-major table with `num_groups` entries per output index.
pub fn apply<M>(
    direction: Direction,
    matrix: &M,
    group: &[usize],
    num_groups: usize,
    output: &mut [M::Value],
    opt: &Options,
) -> anyhow::Result<()>
where
    M: MatrixAccess + Sync,
{
    let dim = matrix.dimension_len(direction);
    let otherdim = matrix.dimension_len(direction.flip());
    validate_groups(group, otherdim, num_groups)?;
    validate_output_len(output.len(), dim * num_groups)?;
    if num_groups == 0 {
        return Ok(());
    }

    let direct = matrix.prefers_rows() == (direction == Direction::ROW);
    debug!(
        "computing {:?} grouped sums over {} indices x {} groups ({})",
        direction,
        dim,
        num_groups,
        if direct { "direct" } else { "running" }
    );

    if direct {
        run_blocks_strided(output, num_groups, opt.threads, |start, chunk| {
            let mut values = Vec::with_capacity(otherdim);
            let mut indices = Vec::with_capacity(otherdim);
            let mut buffer = vec![M::Value::zero(); otherdim];
            let mut errors = vec![M::Value::zero(); num_groups];
            for (k, slots) in chunk.chunks_mut(num_groups).enumerate() {
                slots.fill(M::Value::zero());
                errors.fill(M::Value::zero());
                if matrix.is_sparse() {
                    matrix.extract_sparse(direction, start + k, 0..otherdim, &mut values, &mut indices);
                    for (&val, &idx) in values.iter().zip(indices.iter()) {
                        if opt.skip_nan && val.is_nan() {
                            continue;
                        }
                        let g = group[idx];
                        sum::add_neumaier(&mut slots[g], &mut errors[g], val);
                    }
                } else {
                    matrix.extract_dense(direction, start + k, 0..otherdim, &mut buffer);
                    for (j, &val) in buffer.iter().enumerate() {
                        if opt.skip_nan && val.is_nan() {
                            continue;
                        }
                        let g = group[j];
                        sum::add_neumaier(&mut slots[g], &mut errors[g], val);
                    }
                }
                for (s, &e) in slots.iter_mut().zip(errors.iter()) {
                    *s += e;
                }
            }
            Ok(())
        })
    } else {
        run_blocks_strided(output, num_groups, opt.threads, |start, chunk| {
            let len = chunk.len() / num_groups;
            let mut locals = vec![vec![M::Value::zero(); len]; num_groups];

            if matrix.is_sparse() {
                let mut runners: Vec<sum::RunningSparse<'_, M::Value>> = locals
                    .iter_mut()
                    .map(|buf| sum::RunningSparse::new(buf, opt.skip_nan, start))
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
                let mut runners: Vec<sum::RunningDense<'_, M::Value>> = locals
                    .iter_mut()
                    .map(|buf| sum::RunningDense::new(buf, opt.skip_nan))
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

/// Per-group row sums, one vector per group.
pub fn by_row<M>(
    matrix: &M,
    group: &[usize],
    opt: &Options,
) -> anyhow::Result<Vec<Vec<M::Value>>>
where
    M: MatrixAccess + Sync,
{
    let num_groups = total_groups(group);
    let mut flat = vec![M::Value::zero(); matrix.nrows() * num_groups];
    apply(Direction::ROW, matrix, group, num_groups, &mut flat, opt)?;
    Ok(split_by_group(&flat, num_groups))
}

/// Per-group column sums, one vector per group.
pub fn by_column<M>(
    matrix: &M,
    group: &[usize],
    opt: &Options,
) -> anyhow::Result<Vec<Vec<M::Value>>>
where
    M: MatrixAccess + Sync,
{
    let num_groups = total_groups(group);
    let mut flat = vec![M::Value::zero(); matrix.ncols() * num_groups];
    apply(Direction::COLUMN, matrix, group, num_groups, &mut flat, opt)?;
    Ok(split_by_group(&flat, num_groups))
}

#[cfg(test)]
mod tests {
    use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};
    use ndarray::array;

    use super::*;

    #[test]
    fn test_grouped_column_sums() {
        // Single column [1, 2, 3, 4] with row groups [0, 1, 0, 1].
        let matrix = array![[1.0], [2.0], [3.0], [4.0]];
        let groups = vec![0, 1, 0, 1];
        let result = by_column(&matrix, &groups, &Options::default()).unwrap();
        assert_eq!(result[0], vec![4.0]);
        assert_eq!(result[1], vec![6.0]);
    }

    #[test]
    fn test_grouped_row_sums_sparse() {
        // [1 0 2]
        // [0 0 0]
        // [3 4 0]
        // [0 5 6]
        let mut coo = CooMatrix::new(4, 3);
        coo.push(0, 0, 1.0);
        coo.push(0, 2, 2.0);
        coo.push(2, 0, 3.0);
        coo.push(2, 1, 4.0);
        coo.push(3, 1, 5.0);
        coo.push(3, 2, 6.0);
        let csr = CsrMatrix::from(&coo);
        let csc = CscMatrix::from(&coo);
        let groups = vec![0, 1, 1];

        for result in [
            by_row(&csr, &groups, &Options::default()).unwrap(),
            by_row(&csc, &groups, &Options::default()).unwrap(),
        ] {
            assert_eq!(result[0], vec![1.0, 0.0, 3.0, 0.0]);
            assert_eq!(result[1], vec![2.0, 0.0, 4.0, 11.0]);
        }
    }

    #[test]
    fn test_group_validation() {
        let matrix = array![[1.0, 2.0], [3.0, 4.0]];
        let opt = Options::default();

        // Wrong label array length.
        assert!(by_row(&matrix, &[0], &opt).is_err());

        // Out-of-range label against an explicit group count.
        let mut flat = vec![0.0; 2];
        assert!(apply(Direction::ROW, &matrix, &[0, 1], 1, &mut flat, &opt).is_err());
    }

    #[test]
    fn test_grouped_sum_compensation() {
        // Group 0 cancels a huge intermediate; naive accumulation returns 0.
        let matrix = array![[1.0, 5.0, 1e100, 1.0, -1e100]];
        let groups = vec![0, 1, 0, 0, 0];
        let result = by_row(&matrix, &groups, &Options::default()).unwrap();
        assert_eq!(result[0], vec![2.0]);
        assert_eq!(result[1], vec![5.0]);
    }

    #[test]
    fn test_single_group_matches_plain_sums() {
        let matrix = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let groups = vec![0, 0, 0];
        let result = by_row(&matrix, &groups, &Options::default()).unwrap();
        assert_eq!(result[0], crate::sum::by_row(&matrix, &Options::default()).unwrap());
    }
}
