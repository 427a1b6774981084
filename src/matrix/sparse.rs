use std::ops::Range;

use nalgebra_sparse::{CscMatrix, CsrMatrix};

use crate::utils::{Direction, FloatOps};

use super::MatrixAccess;

impl<T: FloatOps> MatrixAccess for CsrMatrix<T> {
    type Value = T;

    fn nrows(&self) -> usize {
        self.nrows()
    }

    fn ncols(&self) -> usize {
        self.ncols()
    }

    fn prefers_rows(&self) -> bool {
        true
    }

    fn is_sparse(&self) -> bool {
        true
    }

    fn extract_dense(
        &self,
        direction: Direction,
        index: usize,
        range: Range<usize>,
        buffer: &mut [T],
    ) {
        buffer.fill(T::zero());
        match direction {
            Direction::ROW => {
                let row = self.row(index);
                let cols = row.col_indices();
                let lo = cols.partition_point(|&c| c < range.start);
                let hi = cols.partition_point(|&c| c < range.end);
                for k in lo..hi {
                    buffer[cols[k] - range.start] = row.values()[k];
                }
            }
            Direction::COLUMN => {
                for (slot, i) in buffer.iter_mut().zip(range) {
                    let row = self.row(i);
                    if let Ok(pos) = row.col_indices().binary_search(&index) {
                        *slot = row.values()[pos];
                    }
                }
            }
        }
    }

    fn extract_sparse(
        &self,
        direction: Direction,
        index: usize,
        range: Range<usize>,
        values: &mut Vec<T>,
        indices: &mut Vec<usize>,
    ) {
        values.clear();
        indices.clear();
        match direction {
            Direction::ROW => {
                let row = self.row(index);
                let cols = row.col_indices();
                let lo = cols.partition_point(|&c| c < range.start);
                let hi = cols.partition_point(|&c| c < range.end);
                for k in lo..hi {
                    values.push(row.values()[k]);
                    indices.push(cols[k]);
                }
            }
            Direction::COLUMN => {
                // Rows of a CSR matrix keep their column indices sorted, so a
                // binary search per row recovers one column in O(R log k).
                for i in range {
                    let row = self.row(i);
                    if let Ok(pos) = row.col_indices().binary_search(&index) {
                        values.push(row.values()[pos]);
                        indices.push(i);
                    }
                }
            }
        }
    }
}

impl<T: FloatOps> MatrixAccess for CscMatrix<T> {
    type Value = T;

    fn nrows(&self) -> usize {
        self.nrows()
    }

    fn ncols(&self) -> usize {
        self.ncols()
    }

    fn prefers_rows(&self) -> bool {
        false
    }

    fn is_sparse(&self) -> bool {
        true
    }

    fn extract_dense(
        &self,
        direction: Direction,
        index: usize,
        range: Range<usize>,
        buffer: &mut [T],
    ) {
        buffer.fill(T::zero());
        match direction {
            Direction::COLUMN => {
                let col = self.col(index);
                let rows = col.row_indices();
                let lo = rows.partition_point(|&r| r < range.start);
                let hi = rows.partition_point(|&r| r < range.end);
                for k in lo..hi {
                    buffer[rows[k] - range.start] = col.values()[k];
                }
            }
            Direction::ROW => {
                for (slot, j) in buffer.iter_mut().zip(range) {
                    let col = self.col(j);
                    if let Ok(pos) = col.row_indices().binary_search(&index) {
                        *slot = col.values()[pos];
                    }
                }
            }
        }
    }

    fn extract_sparse(
        &self,
        direction: Direction,
        index: usize,
        range: Range<usize>,
        values: &mut Vec<T>,
        indices: &mut Vec<usize>,
    ) {
        values.clear();
        indices.clear();
        match direction {
            Direction::COLUMN => {
                let col = self.col(index);
                let rows = col.row_indices();
                let lo = rows.partition_point(|&r| r < range.start);
                let hi = rows.partition_point(|&r| r < range.end);
                for k in lo..hi {
                    values.push(col.values()[k]);
                    indices.push(rows[k]);
                }
            }
            Direction::ROW => {
                for j in range {
                    let col = self.col(j);
                    if let Ok(pos) = col.row_indices().binary_search(&index) {
                        values.push(col.values()[pos]);
                        indices.push(j);
                    }
                }
            }
        }
    }
}
