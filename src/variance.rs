//! Dimension-wise sample variances.
//!
//! Direct extraction uses the two-pass mean/sum-of-squares form; running
//! passes use Welford's update so a single traversal of the matrix in its
//! preferred order stays numerically stable. Sparse data is finalized with a
//! closed-form correction for structural zeros keyed only on the stored
//! counts, never by iterating the zeros themselves.

use log::debug;
use num_traits::Zero;

use crate::matrix::MatrixAccess;
use crate::utils::{run_blocks, validate_output_len, Direction, FloatOps, Options};

/// One Welford step: `count` must already include `value`.
pub(crate) fn add_welford<T: FloatOps>(mean: &mut T, sumsq: &mut T, value: T, count: usize) {
    let delta = value - *mean;
    *mean += delta / T::from(count).unwrap();
    *sumsq += delta * (value - *mean);
}

/// Folds `count - nonzero` exact-zero observations into running statistics
/// accumulated from `nonzero` stored values.
pub(crate) fn add_welford_zeros<T: FloatOps>(
    mean: &mut T,
    sumsq: &mut T,
    nonzero: usize,
    count: usize,
) {
    if count == 0 {
        return;
    }
    let ratio = T::from(nonzero).unwrap() / T::from(count).unwrap();
    *sumsq += *mean * *mean * ratio * T::from(count - nonzero).unwrap();
    *mean = *mean * ratio;
}

/// Converts accumulated statistics into the (mean, sample variance) pair,
/// with NaN sentinels for degenerate counts: both NaN when nothing
/// contributed, variance NaN when only one value did.
pub(crate) fn finalize<T: FloatOps>(mean: T, sumsq: T, count: usize) -> (T, T) {
    if count == 0 {
        (T::nan(), T::nan())
    } else if count == 1 {
        (mean, T::nan())
    } else {
        (mean, sumsq / T::from(count - 1).unwrap())
    }
}

/// Two-pass mean and sample variance of a dense slice.
pub fn compute<T: FloatOps>(values: &[T], skip_nan: bool) -> (T, T) {
    let mut total = T::zero();
    let mut lost = 0usize;
    for &val in values {
        if skip_nan && val.is_nan() {
            lost += 1;
            continue;
        }
        total += val;
    }
    let count = values.len() - lost;
    if count == 0 {
        return (T::nan(), T::nan());
    }

    let mean = total / T::from(count).unwrap();
    let mut sumsq = T::zero();
    for &val in values {
        if skip_nan && val.is_nan() {
            continue;
        }
        sumsq += (val - mean) * (val - mean);
    }
    finalize(mean, sumsq, count)
}

/// Two-pass mean and sample variance of a sparse slice with `num_all` logical
/// entries, of which only `values.len()` are stored. The structural zeros are
/// folded in as `zeros * mean^2`.
pub fn compute_sparse<T: FloatOps>(values: &[T], num_all: usize, skip_nan: bool) -> (T, T) {
    let mut total = T::zero();
    let mut lost = 0usize;
    for &val in values {
        if skip_nan && val.is_nan() {
            lost += 1;
            continue;
        }
        total += val;
    }
    let count = num_all - lost;
    if count == 0 {
        return (T::nan(), T::nan());
    }

    let mean = total / T::from(count).unwrap();
    let mut sumsq = T::zero();
    for &val in values {
        if skip_nan && val.is_nan() {
            continue;
        }
        sumsq += (val - mean) * (val - mean);
    }
    let zeros = num_all - values.len();
    if zeros > 0 {
        sumsq += T::from(zeros).unwrap() * mean * mean;
    }
    finalize(mean, sumsq, count)
}

/// Running Welford variances over dense observed slices.
pub struct RunningDense<'a, T> {
    mean: Vec<T>,
    variance: &'a mut [T],
    count: Vec<usize>,
    skip_nan: bool,
}

impl<'a, T: FloatOps> RunningDense<'a, T> {
    pub fn new(variance: &'a mut [T], skip_nan: bool) -> Self {
        variance.fill(T::zero());
        let num = variance.len();
        RunningDense {
            mean: vec![T::zero(); num],
            variance,
            count: vec![0; num],
            skip_nan,
        }
    }

    pub fn add(&mut self, values: &[T]) {
        for (i, &val) in values.iter().enumerate() {
            if self.skip_nan && val.is_nan() {
                continue;
            }
            self.count[i] += 1;
            add_welford(&mut self.mean[i], &mut self.variance[i], val, self.count[i]);
        }
    }

    pub fn finish(&mut self) {
        for i in 0..self.variance.len() {
            let (mean, var) = finalize(self.mean[i], self.variance[i], self.count[i]);
            self.mean[i] = mean;
            self.variance[i] = var;
        }
    }

    /// Per-index means; only meaningful after `finish`.
    pub fn means(&self) -> &[T] {
        &self.mean
    }
}

/// Running Welford variances over sparse observed slices. Stored values are
/// folded in one at a time; the structural zeros of each index are folded in
/// at `finish` via the closed-form correction.
pub struct RunningSparse<'a, T> {
    mean: Vec<T>,
    variance: &'a mut [T],
    nonzero: Vec<usize>,
    nan: Vec<usize>,
    count: usize,
    subtract: usize,
    skip_nan: bool,
}

impl<'a, T: FloatOps> RunningSparse<'a, T> {
    pub fn new(variance: &'a mut [T], skip_nan: bool, subtract: usize) -> Self {
        variance.fill(T::zero());
        let num = variance.len();
        RunningSparse {
            mean: vec![T::zero(); num],
            variance,
            nonzero: vec![0; num],
            nan: vec![0; num],
            count: 0,
            subtract,
            skip_nan,
        }
    }

    pub fn add(&mut self, values: &[T], indices: &[usize]) {
        self.count += 1;
        for (&val, &idx) in values.iter().zip(indices.iter()) {
            let ri = idx - self.subtract;
            if self.skip_nan && val.is_nan() {
                self.nan[ri] += 1;
                continue;
            }
            self.nonzero[ri] += 1;
            add_welford(&mut self.mean[ri], &mut self.variance[ri], val, self.nonzero[ri]);
        }
    }

    pub fn finish(&mut self) {
        for i in 0..self.variance.len() {
            let count = self.count - self.nan[i];
            if count >= 2 {
                add_welford_zeros(
                    &mut self.mean[i],
                    &mut self.variance[i],
                    self.nonzero[i],
                    count,
                );
            }
            let (mean, var) = finalize(self.mean[i], self.variance[i], count);
            self.mean[i] = mean;
            self.variance[i] = var;
        }
    }

    /// Per-index means; only meaningful after `finish`.
    pub fn means(&self) -> &[T] {
        &self.mean
    }
}

/// Computes the sample variance of every row or column of `matrix` into
/// `output`. Indices with fewer than two contributing values are reported as
/// NaN rather than aborting the call.
pub fn apply<M>(
    direction: Direction,
    matrix: &M,
    output: &mut [M::Value],
    opt: &Options,
) -> anyhow::Result<()>
where
    M: MatrixAccess + Sync,
{
    let dim = matrix.dimension_len(direction);
    let otherdim = matrix.dimension_len(direction.flip());
    validate_output_len(output.len(), dim)?;

    let direct = matrix.prefers_rows() == (direction == Direction::ROW);
    debug!(
        "computing {:?} variances over {} indices ({}, {} threads)",
        direction,
        dim,
        if direct { "direct" } else { "running" },
        opt.threads
    );

    if matrix.is_sparse() {
        if direct {
            run_blocks(output, opt.threads, |start, chunk| {
                let mut values = Vec::with_capacity(otherdim);
                let mut indices = Vec::with_capacity(otherdim);
                for (k, out) in chunk.iter_mut().enumerate() {
                    matrix.extract_sparse(direction, start + k, 0..otherdim, &mut values, &mut indices);
                    *out = compute_sparse(&values, otherdim, opt.skip_nan).1;
                }
                Ok(())
            })
        } else {
            run_blocks(output, opt.threads, |start, chunk| {
                let len = chunk.len();
                let mut values = Vec::with_capacity(len);
                let mut indices = Vec::with_capacity(len);
                let mut runner = RunningSparse::new(chunk, opt.skip_nan, start);
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
        run_blocks(output, opt.threads, |start, chunk| {
            let mut buffer = vec![M::Value::zero(); otherdim];
            for (k, out) in chunk.iter_mut().enumerate() {
                matrix.extract_dense(direction, start + k, 0..otherdim, &mut buffer);
                *out = compute(&buffer, opt.skip_nan).1;
            }
            Ok(())
        })
    } else {
        run_blocks(output, opt.threads, |start, chunk| {
            let len = chunk.len();
            let mut buffer = vec![M::Value::zero(); len];
            let mut runner = RunningDense::new(chunk, opt.skip_nan);
            for i in 0..otherdim {
                matrix.extract_dense(direction.flip(), i, start..start + len, &mut buffer);
                runner.add(&buffer);
            }
            runner.finish();
            Ok(())
        })
    }
}

pub fn by_row<M>(matrix: &M, opt: &Options) -> anyhow::Result<Vec<M::Value>>
where
    M: MatrixAccess + Sync,
{
    let mut output = vec![M::Value::zero(); matrix.nrows()];
    apply(Direction::ROW, matrix, &mut output, opt)?;
    Ok(output)
}

pub fn by_column<M>(matrix: &M, opt: &Options) -> anyhow::Result<Vec<M::Value>>
where
    M: MatrixAccess + Sync,
{
    let mut output = vec![M::Value::zero(); matrix.ncols()];
    apply(Direction::COLUMN, matrix, &mut output, opt)?;
    Ok(output)
}
