//! Dimension-wise sums with Neumaier-compensated accumulation.

use log::debug;
use num_traits::Zero;

use crate::matrix::MatrixAccess;
use crate::utils::{run_blocks, validate_output_len, Direction, FloatOps, Options};

/// Folds `val` into a compensated sum. `sum` and `error` should start at zero;
/// the final result is `sum + error`.
pub fn add_neumaier<T: FloatOps>(sum: &mut T, error: &mut T, val: T) {
    let t = *sum + val;
    if sum.abs() >= val.abs() {
        *error += (*sum - t) + val;
    } else {
        *error += (val - t) + *sum;
    }
    *sum = t;
}

/// Compensated sum of a dense slice. Structural zeros contribute nothing to a
/// sum, so this doubles as the sparse kernel applied to the stored values.
pub fn compute<T: FloatOps>(values: &[T], skip_nan: bool) -> T {
    let mut sum = T::zero();
    let mut error = T::zero();
    for &val in values {
        if skip_nan && val.is_nan() {
            continue;
        }
        add_neumaier(&mut sum, &mut error, val);
    }
    sum + error
}

/// Running sums over dense observed slices. Each call to `add` folds one slice
/// into the per-index sums; `finish` resolves the compensation terms.
pub struct RunningDense<'a, T> {
    sum: &'a mut [T],
    error: Vec<T>,
    skip_nan: bool,
}

impl<'a, T: FloatOps> RunningDense<'a, T> {
    pub fn new(sum: &'a mut [T], skip_nan: bool) -> Self {
        sum.fill(T::zero());
        let error = vec![T::zero(); sum.len()];
        RunningDense {
            sum,
            error,
            skip_nan,
        }
    }

    pub fn add(&mut self, values: &[T]) {
        for (i, &val) in values.iter().enumerate() {
            if self.skip_nan && val.is_nan() {
                continue;
            }
            add_neumaier(&mut self.sum[i], &mut self.error[i], val);
        }
    }

    pub fn finish(&mut self) {
        for (s, &e) in self.sum.iter_mut().zip(self.error.iter()) {
            *s += e;
        }
    }
}

/// Running sums over sparse observed slices. `subtract` is the offset of the
/// thread's index block, removed from each absolute index before storing.
pub struct RunningSparse<'a, T> {
    sum: &'a mut [T],
    error: Vec<T>,
    subtract: usize,
    skip_nan: bool,
}

impl<'a, T: FloatOps> RunningSparse<'a, T> {
    pub fn new(sum: &'a mut [T], skip_nan: bool, subtract: usize) -> Self {
        sum.fill(T::zero());
        let error = vec![T::zero(); sum.len()];
        RunningSparse {
            sum,
            error,
            subtract,
            skip_nan,
        }
    }

    pub fn add(&mut self, values: &[T], indices: &[usize]) {
        for (&val, &idx) in values.iter().zip(indices.iter()) {
            if self.skip_nan && val.is_nan() {
                continue;
            }
            let ri = idx - self.subtract;
            add_neumaier(&mut self.sum[ri], &mut self.error[ri], val);
        }
    }

    pub fn finish(&mut self) {
        for (s, &e) in self.sum.iter_mut().zip(self.error.iter()) {
            *s += e;
        }
    }
}

/// Computes the sum of every row or column of `matrix` into `output`, which
/// must have one slot per requested-dimension index.
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
        "computing {:?} sums over {} indices ({}, {} threads)",
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
                    *out = compute(&values, opt.skip_nan);
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
                *out = compute(&buffer, opt.skip_nan);
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
