//! Dimension-wise occurrence counts for a caller-supplied predicate, with
//! NaN-count and zero-count wrappers.
//!
//! Sparse slices only test their stored values; when the predicate accepts
//! zero, the structural zeros are added in closed form from the stored-entry
//! count. Structural zeros are finite by construction, so they can never
//! contribute to a NaN count.

use log::debug;
use num_traits::{Float, Zero};

use crate::matrix::MatrixAccess;
use crate::utils::{run_blocks, validate_output_len, Direction};

/// Counts, for every row or column, the values satisfying `condition`. The
/// predicate must handle NaN itself if NaNs may be present.
pub fn apply<M, F>(
    direction: Direction,
    matrix: &M,
    output: &mut [usize],
    threads: usize,
    condition: F,
) -> anyhow::Result<()>
where
    M: MatrixAccess + Sync,
    F: Fn(M::Value) -> bool + Send + Sync,
{
    let dim = matrix.dimension_len(direction);
    let otherdim = matrix.dimension_len(direction.flip());
    validate_output_len(output.len(), dim)?;

    let direct = matrix.prefers_rows() == (direction == Direction::ROW);
    debug!(
        "counting over {:?} for {} indices ({}, {} threads)",
        direction,
        dim,
        if direct { "direct" } else { "running" },
        threads
    );

    if matrix.is_sparse() {
        let count_zero = condition(M::Value::zero());
        if direct {
            run_blocks(output, threads, |start, chunk| {
                let mut values = Vec::with_capacity(otherdim);
                let mut indices = Vec::with_capacity(otherdim);
                for (k, out) in chunk.iter_mut().enumerate() {
                    matrix.extract_sparse(direction, start + k, 0..otherdim, &mut values, &mut indices);
                    let mut total = values.iter().filter(|&&v| condition(v)).count();
                    if count_zero {
                        total += otherdim - values.len();
                    }
                    *out = total;
                }
                Ok(())
            })
        } else {
            run_blocks(output, threads, |start, chunk| {
                let len = chunk.len();
                chunk.fill(0);
                let mut values = Vec::with_capacity(len);
                let mut indices = Vec::with_capacity(len);
                let mut nonzero = vec![0usize; len];
                let mut seen = 0usize;
                for i in 0..otherdim {
                    matrix.extract_sparse(
                        direction.flip(),
                        i,
                        start..start + len,
                        &mut values,
                        &mut indices,
                    );
                    seen += 1;
                    for (&val, &idx) in values.iter().zip(indices.iter()) {
                        let ri = idx - start;
                        if condition(val) {
                            chunk[ri] += 1;
                        }
                        nonzero[ri] += 1;
                    }
                }
                if count_zero {
                    for (out, &nz) in chunk.iter_mut().zip(nonzero.iter()) {
                        *out += seen - nz;
                    }
                }
                Ok(())
            })
        }
    } else if direct {
        run_blocks(output, threads, |start, chunk| {
            let mut buffer = vec![M::Value::zero(); otherdim];
            for (k, out) in chunk.iter_mut().enumerate() {
                matrix.extract_dense(direction, start + k, 0..otherdim, &mut buffer);
                *out = buffer.iter().filter(|&&v| condition(v)).count();
            }
            Ok(())
        })
    } else {
        run_blocks(output, threads, |start, chunk| {
            let len = chunk.len();
            chunk.fill(0);
            let mut buffer = vec![M::Value::zero(); len];
            for i in 0..otherdim {
                matrix.extract_dense(direction.flip(), i, start..start + len, &mut buffer);
                for (out, &val) in chunk.iter_mut().zip(buffer.iter()) {
                    if condition(val) {
                        *out += 1;
                    }
                }
            }
            Ok(())
        })
    }
}

/// Number of NaN values in every row or column.
pub fn nan_counts<M>(direction: Direction, matrix: &M, threads: usize) -> anyhow::Result<Vec<usize>>
where
    M: MatrixAccess + Sync,
{
    let mut output = vec![0usize; matrix.dimension_len(direction)];
    apply(direction, matrix, &mut output, threads, |v: M::Value| {
        v.is_nan()
    })?;
    Ok(output)
}

/// Number of zero values (stored or structural) in every row or column.
pub fn zero_counts<M>(direction: Direction, matrix: &M, threads: usize) -> anyhow::Result<Vec<usize>>
where
    M: MatrixAccess + Sync,
{
    let mut output = vec![0usize; matrix.dimension_len(direction)];
    apply(direction, matrix, &mut output, threads, |v: M::Value| {
        v == M::Value::zero()
    })?;
    Ok(output)
}

pub fn row_nan_counts<M>(matrix: &M, threads: usize) -> anyhow::Result<Vec<usize>>
where
    M: MatrixAccess + Sync,
{
    nan_counts(Direction::ROW, matrix, threads)
}

pub fn column_nan_counts<M>(matrix: &M, threads: usize) -> anyhow::Result<Vec<usize>>
where
    M: MatrixAccess + Sync,
{
    nan_counts(Direction::COLUMN, matrix, threads)
}

pub fn row_zero_counts<M>(matrix: &M, threads: usize) -> anyhow::Result<Vec<usize>>
where
    M: MatrixAccess + Sync,
{
    zero_counts(Direction::ROW, matrix, threads)
}

pub fn column_zero_counts<M>(matrix: &M, threads: usize) -> anyhow::Result<Vec<usize>>
where
    M: MatrixAccess + Sync,
{
    zero_counts(Direction::COLUMN, matrix, threads)
}

#[cfg(test)]
mod tests {
    use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};
    use ndarray::array;

    use super::*;

    #[test]
    fn test_dense_counts() {
        let matrix = array![[1.0, 0.0, f64::NAN], [0.0, 0.0, 2.0]];
        assert_eq!(row_nan_counts(&matrix, 1).unwrap(), vec![1, 0]);
        assert_eq!(row_zero_counts(&matrix, 1).unwrap(), vec![1, 2]);
        assert_eq!(column_zero_counts(&matrix, 1).unwrap(), vec![1, 2, 0]);
        assert_eq!(column_nan_counts(&matrix, 1).unwrap(), vec![0, 0, 1]);
    }

    #[test]
    fn test_sparse_structural_zeros() {
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

        let expected_rows = vec![1, 3, 1, 1];
        assert_eq!(row_zero_counts(&csr, 1).unwrap(), expected_rows);
        assert_eq!(row_zero_counts(&csc, 1).unwrap(), expected_rows);

        let expected_cols = vec![2, 2, 2];
        assert_eq!(column_zero_counts(&csr, 1).unwrap(), expected_cols);
        assert_eq!(column_zero_counts(&csc, 1).unwrap(), expected_cols);

        assert_eq!(row_nan_counts(&csr, 1).unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_stored_zero_counted_once() {
        let mut coo = CooMatrix::new(1, 3);
        coo.push(0, 0, 0.0); // explicitly stored zero
        coo.push(0, 2, 7.0);
        let csr = CsrMatrix::from(&coo);
        // One stored zero plus one structural zero.
        assert_eq!(row_zero_counts(&csr, 1).unwrap(), vec![2]);
    }

    #[test]
    fn test_empty_dimension_counts() {
        let matrix = ndarray::Array2::<f64>::zeros((0, 4));
        assert!(row_nan_counts(&matrix, 1).unwrap().is_empty());
        assert_eq!(column_zero_counts(&matrix, 1).unwrap(), vec![0, 0, 0, 0]);
    }
}
