//! Dimension-wise minima and maxima.
//!
//! An index that contributes no values reports +inf as its minimum and -inf
//! as its maximum; the first contributing value replaces the placeholder. NaN
//! values never become an extreme because every comparison against them is
//! false, which also covers the NaN-skipping mode.

use log::debug;
use num_traits::Zero;

use crate::matrix::MatrixAccess;
use crate::utils::{run_blocks_pair, validate_output_len, Direction, FloatOps, Options};

/// Minimum and maximum of a dense slice, or the placeholders when empty.
pub fn compute<T: FloatOps>(values: &[T]) -> (T, T) {
    let mut min = T::infinity();
    let mut max = T::neg_infinity();
    for &val in values {
        if val < min {
            min = val;
        }
        if val > max {
            max = val;
        }
    }
    (min, max)
}

/// Minimum and maximum of a sparse slice with `num_all` logical entries. Any
/// structural zero forces `min <= 0 <= max`.
pub fn compute_sparse<T: FloatOps>(values: &[T], num_all: usize) -> (T, T) {
    if values.is_empty() {
        if num_all > 0 {
            return (T::zero(), T::zero());
        }
        return (T::infinity(), T::neg_infinity());
    }
    let (mut min, mut max) = compute(values);
    if values.len() < num_all {
        if min > T::zero() {
            min = T::zero();
        }
        if max < T::zero() {
            max = T::zero();
        }
    }
    (min, max)
}

/// Running extremes over dense observed slices.
pub struct RunningDense<'a, T> {
    min: &'a mut [T],
    max: &'a mut [T],
}

impl<'a, T: FloatOps> RunningDense<'a, T> {
    pub fn new(min: &'a mut [T], max: &'a mut [T]) -> Self {
        min.fill(T::infinity());
        max.fill(T::neg_infinity());
        RunningDense { min, max }
    }

    pub fn add(&mut self, values: &[T]) {
        for (i, &val) in values.iter().enumerate() {
            if val < self.min[i] {
                self.min[i] = val;
            }
            if val > self.max[i] {
                self.max[i] = val;
            }
        }
    }
}

/// Running extremes over sparse observed slices; `finish` restores the
/// structural-zero clamp for indices that were not stored in every slice.
pub struct RunningSparse<'a, T> {
    min: &'a mut [T],
    max: &'a mut [T],
    nonzero: Vec<usize>,
    count: usize,
    subtract: usize,
}

impl<'a, T: FloatOps> RunningSparse<'a, T> {
    pub fn new(min: &'a mut [T], max: &'a mut [T], subtract: usize) -> Self {
        min.fill(T::infinity());
        max.fill(T::neg_infinity());
        let num = min.len();
        RunningSparse {
            min,
            max,
            nonzero: vec![0; num],
            count: 0,
            subtract,
        }
    }

    pub fn add(&mut self, values: &[T], indices: &[usize]) {
        self.count += 1;
        for (&val, &idx) in values.iter().zip(indices.iter()) {
            let ri = idx - self.subtract;
            if val < self.min[ri] {
                self.min[ri] = val;
            }
            if val > self.max[ri] {
                self.max[ri] = val;
            }
            self.nonzero[ri] += 1;
        }
    }

    pub fn finish(&mut self) {
        if self.count == 0 {
            return;
        }
        for i in 0..self.min.len() {
            if self.nonzero[i] < self.count {
                if self.min[i] > T::zero() {
                    self.min[i] = T::zero();
                }
                if self.max[i] < T::zero() {
                    self.max[i] = T::zero();
                }
            }
        }
    }
}

/// Computes the minimum and maximum of every row or column of `matrix` into
/// `min_out` and `max_out`.
pub fn apply<M>(
    direction: Direction,
    matrix: &M,
    min_out: &mut [M::Value],
    max_out: &mut [M::Value],
    opt: &Options,
) -> anyhow::Result<()>
where
    M: MatrixAccess + Sync,
{
    let dim = matrix.dimension_len(direction);
    let otherdim = matrix.dimension_len(direction.flip());
    validate_output_len(min_out.len(), dim)?;
    validate_output_len(max_out.len(), dim)?;

    let direct = matrix.prefers_rows() == (direction == Direction::ROW);
    debug!(
        "computing {:?} ranges over {} indices ({}, {} threads)",
        direction,
        dim,
        if direct { "direct" } else { "running" },
        opt.threads
    );

    if matrix.is_sparse() {
        if direct {
            run_blocks_pair(min_out, max_out, opt.threads, |start, mins, maxs| {
                let mut values = Vec::with_capacity(otherdim);
                let mut indices = Vec::with_capacity(otherdim);
                for k in 0..mins.len() {
                    matrix.extract_sparse(direction, start + k, 0..otherdim, &mut values, &mut indices);
                    let (min, max) = compute_sparse(&values, otherdim);
                    mins[k] = min;
                    maxs[k] = max;
                }
                Ok(())
            })
        } else {
            run_blocks_pair(min_out, max_out, opt.threads, |start, mins, maxs| {
                let len = mins.len();
                let mut values = Vec::with_capacity(len);
                let mut indices = Vec::with_capacity(len);
                let mut runner = RunningSparse::new(mins, maxs, start);
                for i in 0..otherdim {
                    matrix.extract_sparse(
                        direction.flip(),
                        i,
                        start..start + len,
                        &mut values,
                        &mut indices,
                    );
                    runner.add(&values, &indices);
                }
                runner.finish();
                Ok(())
            })
        }
    } else if direct {
        run_blocks_pair(min_out, max_out, opt.threads, |start, mins, maxs| {
            let mut buffer = vec![M::Value::zero(); otherdim];
            for k in 0..mins.len() {
                matrix.extract_dense(direction, start + k, 0..otherdim, &mut buffer);
                let (min, max) = compute(&buffer);
                mins[k] = min;
                maxs[k] = max;
            }
            Ok(())
        })
    } else {
        run_blocks_pair(min_out, max_out, opt.threads, |start, mins, maxs| {
            let len = mins.len();
            let mut buffer = vec![M::Value::zero(); len];
            let mut runner = RunningDense::new(mins, maxs);
            for i in 0..otherdim {
                matrix.extract_dense(direction.flip(), i, start..start + len, &mut buffer);
                runner.add(&buffer);
            }
            Ok(())
        })
    }
}

/// Per-row (minimum, maximum) pairs.
pub fn by_row<M>(matrix: &M, opt: &Options) -> anyhow::Result<(Vec<M::Value>, Vec<M::Value>)>
where
    M: MatrixAccess + Sync,
{
    let mut mins = vec![M::Value::zero(); matrix.nrows()];
    let mut maxs = vec![M::Value::zero(); matrix.nrows()];
    apply(Direction::ROW, matrix, &mut mins, &mut maxs, opt)?;
    Ok((mins, maxs))
}

/// Per-column (minimum, maximum) pairs.
pub fn by_column<M>(matrix: &M, opt: &Options) -> anyhow::Result<(Vec<M::Value>, Vec<M::Value>)>
where
    M: MatrixAccess + Sync,
{
    let mut mins = vec![M::Value::zero(); matrix.ncols()];
    let mut maxs = vec![M::Value::zero(); matrix.ncols()];
    apply(Direction::COLUMN, matrix, &mut mins, &mut maxs, opt)?;
    Ok((mins, maxs))
}

pub fn row_mins<M>(matrix: &M, opt: &Options) -> anyhow::Result<Vec<M::Value>>
where
    M: MatrixAccess + Sync,
{
    Ok(by_row(matrix, opt)?.0)
}

pub fn row_maxs<M>(matrix: &M, opt: &Options) -> anyhow::Result<Vec<M::Value>>
where
    M: MatrixAccess + Sync,
{
    Ok(by_row(matrix, opt)?.1)
}

pub fn column_mins<M>(matrix: &M, opt: &Options) -> anyhow::Result<Vec<M::Value>>
where
    M: MatrixAccess + Sync,
{
    Ok(by_column(matrix, opt)?.0)
}

pub fn column_maxs<M>(matrix: &M, opt: &Options) -> anyhow::Result<Vec<M::Value>>
where
    M: MatrixAccess + Sync,
{
    Ok(by_column(matrix, opt)?.1)
}

#[cfg(test)]
mod tests {
    use nalgebra_sparse::{CooMatrix, CscMatrix, CsrMatrix};
    use ndarray::array;

    use super::*;

    #[test]
    fn test_dense_ranges() {
        let matrix = array![[3.0, -1.0, 2.0], [5.0, 5.0, 5.0]];
        let (mins, maxs) = by_row(&matrix, &Options::default()).unwrap();
        assert_eq!(mins, vec![-1.0, 5.0]);
        assert_eq!(maxs, vec![3.0, 5.0]);

        let (mins, maxs) = by_column(&matrix, &Options::default()).unwrap();
        assert_eq!(mins, vec![3.0, -1.0, 2.0]);
        assert_eq!(maxs, vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_nan_values_never_win() {
        let matrix = array![[1.0, 2.0, f64::NAN, 4.0]];
        let opt = Options {
            skip_nan: true,
            threads: 1,
        };
        let (mins, maxs) = by_row(&matrix, &opt).unwrap();
        assert_eq!(mins[0], 1.0);
        assert_eq!(maxs[0], 4.0);
    }

    #[test]
    fn test_sparse_zero_clamp() {
        // [5 0]
        // [0 -2]
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, 5.0);
        coo.push(1, 1, -2.0);
        let csr = CsrMatrix::from(&coo);
        let csc = CscMatrix::from(&coo);

        for (mins, maxs) in [
            by_row(&csr, &Options::default()).unwrap(),
            by_row(&csc, &Options::default()).unwrap(),
        ] {
            assert_eq!(mins, vec![0.0, -2.0]);
            assert_eq!(maxs, vec![5.0, 0.0]);
        }
    }

    #[test]
    fn test_empty_dimension_placeholders() {
        let matrix = ndarray::Array2::<f64>::zeros((2, 0));
        let (mins, maxs) = by_row(&matrix, &Options::default()).unwrap();
        assert_eq!(mins, vec![f64::INFINITY, f64::INFINITY]);
        assert_eq!(maxs, vec![f64::NEG_INFINITY, f64::NEG_INFINITY]);
    }

    #[test]
    fn test_all_zero_sparse_row() {
        let mut coo = CooMatrix::new(2, 3);
        coo.push(0, 1, 4.0);
        let csr = CsrMatrix::from(&coo);
        let (mins, maxs) = by_row(&csr, &Options::default()).unwrap();
        assert_eq!(mins[1], 0.0);
        assert_eq!(maxs[1], 0.0);
    }
}
