//! Dimension-wise medians via partial selection.
//!
//! Medians need the full set of values for an index, so they are always
//! computed by per-index extraction regardless of the matrix's preferred
//! dimension. The sparse kernel reconstructs the median of the conceptual
//! sequence (stored values plus interleaved structural zeros) by rank
//! arithmetic over three segments, without ever allocating a buffer of the
//! logical length.

use std::cmp::Ordering;

use log::debug;
use num_traits::Zero;

use crate::matrix::MatrixAccess;
use crate::utils::{run_blocks, validate_output_len, Direction, FloatOps, Options};

fn order<T: FloatOps>(a: &T, b: &T) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Swaps NaNs to the front of the buffer; returns how many were found.
fn translocate_nans<T: FloatOps>(values: &mut [T]) -> usize {
    let mut pos = 0;
    for i in 0..values.len() {
        if values[i].is_nan() {
            values.swap(i, pos);
            pos += 1;
        }
    }
    pos
}

/// The `rank`-th smallest element of `values`, by partial selection.
fn select<T: FloatOps>(values: &mut [T], rank: usize) -> T {
    *values.select_nth_unstable_by(rank, order).1
}

/// Median of a dense buffer; the buffer is reordered in the process. Returns
/// NaN when no (non-NaN) values remain.
pub fn compute<T: FloatOps>(values: &mut [T], skip_nan: bool) -> T {
    let mut work = values;
    if skip_nan {
        let lost = translocate_nans(work);
        work = &mut work[lost..];
    }
    let num = work.len();
    if num == 0 {
        return T::nan();
    }

    let halfway = num / 2;
    let upper = select(work, halfway);
    if num % 2 == 1 {
        return upper;
    }
    // After selection, everything left of `halfway` is <= upper, so the other
    // middle element is the maximum of that partition.
    let lower = work[..halfway]
        .iter()
        .copied()
        .fold(T::neg_infinity(), T::max);
    (upper + lower) / T::from(2).unwrap()
}

/// Median of a sparse buffer whose conceptual sequence has `num_all` entries,
/// of which only the `values` are stored. The sorted conceptual sequence is
/// [negatives | structural zeros | non-negatives]; each target rank is
/// resolved against those segment boundaries, selecting within a segment only
/// when the rank lands inside it.
pub fn compute_sparse<T: FloatOps>(values: &mut [T], num_all: usize, skip_nan: bool) -> T {
    let mut work = values;
    let mut num_all = num_all;
    if skip_nan {
        let lost = translocate_nans(work);
        work = &mut work[lost..];
        num_all -= lost;
    }

    let num_nonzero = work.len();
    if num_nonzero == num_all {
        return compute(work, false);
    }
    if num_nonzero * 2 < num_all {
        // More than half of the sequence is zero.
        return T::zero();
    }

    let mut neg = 0;
    for i in 0..num_nonzero {
        if work[i] < T::zero() {
            work.swap(i, neg);
            neg += 1;
        }
    }
    let zeros = num_all - num_nonzero;

    let mut resolve = |rank: usize| -> T {
        if rank < neg {
            select(&mut work[..neg], rank)
        } else if rank < neg + zeros {
            T::zero()
        } else {
            let within = rank - neg - zeros;
            select(&mut work[neg..], within)
        }
    };

    let halfway = num_all / 2;
    if num_all % 2 == 1 {
        resolve(halfway)
    } else {
        (resolve(halfway) + resolve(halfway - 1)) / T::from(2).unwrap()
    }
}

/// Computes the median of every row or column of `matrix` into `output`.
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

    debug!(
        "computing {:?} medians over {} indices ({} threads)",
        direction, dim, opt.threads
    );

    if matrix.is_sparse() {
        run_blocks(output, opt.threads, |start, chunk| {
            let mut values = Vec::with_capacity(otherdim);
            let mut indices = Vec::with_capacity(otherdim);
            for (k, out) in chunk.iter_mut().enumerate() {
                matrix.extract_sparse(direction, start + k, 0..otherdim, &mut values, &mut indices);
                *out = compute_sparse(&mut values, otherdim, opt.skip_nan);
            }
            Ok(())
        })
    } else {
        run_blocks(output, opt.threads, |start, chunk| {
            let mut buffer = vec![M::Value::zero(); otherdim];
            for (k, out) in chunk.iter_mut().enumerate() {
                matrix.extract_dense(direction, start + k, 0..otherdim, &mut buffer);
                *out = compute(&mut buffer, opt.skip_nan);
            }
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
