use std::fmt::Debug;
use std::ops::AddAssign;

use anyhow::{anyhow, bail};
use num_traits::{Float, NumCast};
use rayon::prelude::*;

/// Which dimension of the matrix a statistic is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum Direction {
    ROW,
    COLUMN,
}

impl Direction {
    pub(crate) fn flip(self) -> Self {
        match self {
            Direction::ROW => Direction::COLUMN,
            Direction::COLUMN => Direction::ROW,
        }
    }
}

/// Blanket trait for the floating-point element types the statistics operate on.
pub trait FloatOps: Float + NumCast + AddAssign + Send + Sync + Debug + 'static {}

impl<T> FloatOps for T where T: Float + NumCast + AddAssign + Send + Sync + Debug + 'static {}

/// Options shared by all statistic entry points.
///
/// `skip_nan` omits non-finite values from the calculation; when false, NaNs
/// are assumed to be absent and the result is unspecified if they are not.
/// `threads` is the number of contiguous output blocks processed in parallel,
/// defaulting to 1 (fully sequential).
#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub skip_nan: bool,
    pub threads: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            skip_nan: false,
            threads: 1,
        }
    }
}

/// Total number of groups implied by a label array, i.e. the largest label plus one.
pub fn total_groups(group: &[usize]) -> usize {
    group.iter().max().map_or(0, |&m| m + 1)
}

/// Number of occurrences of each group label in `[0, total_groups)`.
pub fn tabulate_groups(group: &[usize]) -> Vec<usize> {
    let mut sizes = vec![0usize; total_groups(group)];
    for &g in group {
        sizes[g] += 1;
    }
    sizes
}

pub(crate) fn validate_groups(
    group: &[usize],
    expected_len: usize,
    num_groups: usize,
) -> anyhow::Result<()> {
    if group.len() != expected_len {
        bail!(
            "group label array length {} does not match the opposite dimension size {}",
            group.len(),
            expected_len
        );
    }
    if let Some(&bad) = group.iter().find(|&&g| g >= num_groups) {
        bail!("group label {} is out of range for {} groups", bad, num_groups);
    }
    Ok(())
}

pub(crate) fn validate_output_len(actual: usize, expected: usize) -> anyhow::Result<()> {
    if actual != expected {
        return Err(anyhow!(
            "output buffer length {} does not match the requested dimension size {}",
            actual,
            expected
        ));
    }
    Ok(())
}

/// Splits the output index range into contiguous per-thread blocks and runs
/// `task(start, chunk)` on each. Each block exclusively owns its output slice,
/// so no synchronization is needed; a failing block aborts the whole call once
/// every block has stopped.
pub(crate) fn run_blocks<T, F>(output: &mut [T], threads: usize, task: F) -> anyhow::Result<()>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> anyhow::Result<()> + Send + Sync,
{
    if output.is_empty() {
        return Ok(());
    }
    let threads = threads.max(1);
    if threads == 1 {
        return task(0, output);
    }
    let block = output.len().div_ceil(threads);
    output
        .par_chunks_mut(block)
        .enumerate()
        .try_for_each(|(t, chunk)| task(t * block, chunk))
}

/// Same as `run_blocks` but for statistics with two equally sized outputs,
/// such as the minimum and maximum of a range.
pub(crate) fn run_blocks_pair<T, F>(
    first: &mut [T],
    second: &mut [T],
    threads: usize,
    task: F,
) -> anyhow::Result<()>
where
    T: Send,
    F: Fn(usize, &mut [T], &mut [T]) -> anyhow::Result<()> + Send + Sync,
{
    debug_assert_eq!(first.len(), second.len());
    if first.is_empty() {
        return Ok(());
    }
    let threads = threads.max(1);
    if threads == 1 {
        return task(0, first, second);
    }
    let block = first.len().div_ceil(threads);
    first
        .par_chunks_mut(block)
        .zip(second.par_chunks_mut(block))
        .enumerate()
        .try_for_each(|(t, (a, b))| task(t * block, a, b))
}

/// `run_blocks` for flat index-major tables of `stride` entries per output
/// index; `start` is counted in output indices, not table entries.
pub(crate) fn run_blocks_strided<T, F>(
    output: &mut [T],
    stride: usize,
    threads: usize,
    task: F,
) -> anyhow::Result<()>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> anyhow::Result<()> + Send + Sync,
{
    if output.is_empty() || stride == 0 {
        return Ok(());
    }
    debug_assert_eq!(output.len() % stride, 0);
    let threads = threads.max(1);
    if threads == 1 {
        return task(0, output);
    }
    let block = (output.len() / stride).div_ceil(threads);
    output
        .par_chunks_mut(block * stride)
        .enumerate()
        .try_for_each(|(t, chunk)| task(t * block, chunk))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_groups() {
        assert_eq!(total_groups(&[0, 1, 0, 2]), 3);
        assert_eq!(total_groups(&[]), 0);
    }

    #[test]
    fn test_tabulate_groups() {
        assert_eq!(tabulate_groups(&[0, 1, 0, 1, 3]), vec![2, 2, 0, 1]);
        assert!(tabulate_groups(&[]).is_empty());
    }

    #[test]
    fn test_validate_groups() {
        assert!(validate_groups(&[0, 1], 2, 2).is_ok());
        assert!(validate_groups(&[0, 1], 3, 2).is_err());
        assert!(validate_groups(&[0, 2], 2, 2).is_err());
    }

    #[test]
    fn test_run_blocks_partitioning() {
        let mut output = vec![0usize; 10];
        run_blocks(&mut output, 4, |start, chunk| {
            for (k, v) in chunk.iter_mut().enumerate() {
                *v = start + k;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(output, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_run_blocks_propagates_errors() {
        let mut output = vec![0usize; 8];
        let result = run_blocks(&mut output, 2, |start, _| {
            if start > 0 {
                bail!("boom");
            }
            Ok(())
        });
        assert!(result.is_err());
    }
}
