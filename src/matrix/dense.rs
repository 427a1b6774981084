use std::ops::Range;

use ndarray::Array2;

use crate::utils::{Direction, FloatOps};

use super::MatrixAccess;

impl<T: FloatOps> MatrixAccess for Array2<T> {
    type Value = T;

    fn nrows(&self) -> usize {
        self.nrows()
    }

    fn ncols(&self) -> usize {
        self.ncols()
    }

    fn prefers_rows(&self) -> bool {
        // Fortran-order arrays are cheaper to walk column by column.
        self.is_standard_layout()
    }

    fn is_sparse(&self) -> bool {
        false
    }

    fn extract_dense(
        &self,
        direction: Direction,
        index: usize,
        range: Range<usize>,
        buffer: &mut [T],
    ) {
        match direction {
            Direction::ROW => {
                for (slot, j) in buffer.iter_mut().zip(range) {
                    *slot = self[[index, j]];
                }
            }
            Direction::COLUMN => {
                for (slot, i) in buffer.iter_mut().zip(range) {
                    *slot = self[[i, index]];
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
        // A dense matrix has no structural zeros, so every entry is "stored".
        values.clear();
        indices.clear();
        match direction {
            Direction::ROW => {
                for j in range {
                    values.push(self[[index, j]]);
                    indices.push(j);
                }
            }
            Direction::COLUMN => {
                for i in range {
                    values.push(self[[i, index]]);
                    indices.push(i);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn test_dense_extraction() {
        let matrix = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        assert!(matrix.prefers_rows());
        assert!(!matrix.is_sparse());

        let mut buffer = vec![0.0; 3];
        matrix.extract_dense(Direction::ROW, 1, 0..3, &mut buffer);
        assert_eq!(buffer, vec![4.0, 5.0, 6.0]);

        let mut buffer = vec![0.0; 2];
        matrix.extract_dense(Direction::COLUMN, 2, 0..2, &mut buffer);
        assert_eq!(buffer, vec![3.0, 6.0]);

        let mut buffer = vec![0.0; 2];
        matrix.extract_dense(Direction::ROW, 0, 1..3, &mut buffer);
        assert_eq!(buffer, vec![2.0, 3.0]);
    }

    #[test]
    fn test_dense_sparse_view() {
        let matrix = array![[1.0, 0.0], [0.0, 4.0]];
        let mut values = Vec::new();
        let mut indices = Vec::new();
        matrix.extract_sparse(Direction::ROW, 0, 0..2, &mut values, &mut indices);
        assert_eq!(values, vec![1.0, 0.0]);
        assert_eq!(indices, vec![0, 1]);
    }
}
