use std::error::Error;
use std::fmt;
use std::iter::Sum;
use std::ops::{Index, IndexMut};

use num_traits::{One, Zero};
use serde::Serialize;

/// Row-major 2D table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Array2<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T> Array2<T> {
    /// Build from nested rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, ShapeError> {
        let nrows = rows.len();
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(nrows * ncols);
        for row in rows {
            if row.len() != ncols {
                return Err(ShapeError {
                    rows: nrows,
                    cols: ncols,
                    len: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            data,
            rows: nrows,
            cols: ncols,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "index ({}, {}) out of bounds for ({}, {})",
            row,
            col,
            self.rows,
            self.cols
        );
        row * self.cols + col
    }

    pub fn row_slice(&self, row: usize) -> &[T] {
        let start = self.offset(row, 0);
        &self.data[start..start + self.cols]
    }
}

impl<T> Array2<T>
where
    T: Clone + Zero,
{
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![T::zero(); rows * cols],
            rows,
            cols,
        }
    }
}

impl<T> Array2<T>
where
    T: Clone + Zero + One,
{
    /// Square matrix with zeros on the diagonal and ones elsewhere.
    pub fn off_diagonal_ones(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for r in 0..n {
            for c in 0..n {
                if r != c {
                    m[(r, c)] = T::one();
                }
            }
        }
        m
    }
}

impl<T> Array2<T>
where
    T: Copy + Sum<T>,
{
    pub fn sum(&self) -> T {
        self.data.iter().copied().sum()
    }

    pub fn row_sum(&self, row: usize) -> T {
        self.row_slice(row).iter().copied().sum()
    }

    pub fn column_sum(&self, col: usize) -> T {
        (0..self.rows).map(|r| self[(r, col)]).sum()
    }

    pub fn trace(&self) -> T {
        (0..self.rows.min(self.cols)).map(|i| self[(i, i)]).sum()
    }
}

impl<T> Index<(usize, usize)> for Array2<T> {
    type Output = T;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let offset = self.offset(index.0, index.1);
        &self.data[offset]
    }
}

impl<T> IndexMut<(usize, usize)> for Array2<T> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        let offset = self.offset(index.0, index.1);
        &mut self.data[offset]
    }
}

#[derive(Debug, Clone)]
pub struct ShapeError {
    rows: usize,
    cols: usize,
    len: usize,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid shape ({}, {}) for buffer of length {}",
            self.rows, self.cols, self.len
        )
    }
}

impl Error for ShapeError {}
