use std::ops::Range;

use crate::utils::{Direction, FloatOps};

mod dense;
mod sparse;

/// Capability interface consumed by the statistics engine.
///
/// A matrix declares its dimensions, whether its storage favors row or column
/// traversal, and whether it stores only nonzero entries. Extraction hands out
/// one row or column at a time, restricted to a contiguous `range` of the
/// opposite dimension so that a running pass only touches the index block
/// owned by the calling thread.
///
/// Implementations are provided for `ndarray::Array2`,
/// `nalgebra_sparse::CsrMatrix` and `nalgebra_sparse::CscMatrix`.
pub trait MatrixAccess {
    type Value: FloatOps;

    fn nrows(&self) -> usize;

    fn ncols(&self) -> usize;

    /// Whether consecutive rows are cheaper to extract than consecutive columns.
    fn prefers_rows(&self) -> bool;

    /// Whether extraction should go through the sparse interface.
    fn is_sparse(&self) -> bool;

    /// Copies the entries of row/column `index` at positions `range` into
    /// `buffer`, which must have length `range.len()`. Unstored entries of a
    /// sparse matrix are written as zero.
    fn extract_dense(
        &self,
        direction: Direction,
        index: usize,
        range: Range<usize>,
        buffer: &mut [Self::Value],
    );

    /// Clears `values`/`indices` and fills them with the stored entries of
    /// row/column `index` whose position lies in `range`. Indices are absolute
    /// positions within the opposite dimension, in ascending order.
    fn extract_sparse(
        &self,
        direction: Direction,
        index: usize,
        range: Range<usize>,
        values: &mut Vec<Self::Value>,
        indices: &mut Vec<usize>,
    );

    /// Size of the dimension a statistic is requested over.
    fn dimension_len(&self, direction: Direction) -> usize {
        match direction {
            Direction::ROW => self.nrows(),
            Direction::COLUMN => self.ncols(),
        }
    }
}
