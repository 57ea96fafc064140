//! # State Matrix
//!
//! Dense, row-major `n × n` matrix of `f64`. Used both for an agent's State
//! Vector and for the additive deltas that move it forward.

use crate::errors::MatrixError;

/// Dense square matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct StateMatrix {
    dimension: usize,
    values: Vec<f64>,
}

impl StateMatrix {
    /// All-zero matrix (the neutral delta).
    pub fn zeros(dimension: usize) -> Self {
        Self {
            dimension,
            values: vec![0.0; dimension * dimension],
        }
    }

    /// Identity matrix (the genesis state).
    pub fn identity(dimension: usize) -> Self {
        let mut matrix = Self::zeros(dimension);
        for i in 0..dimension {
            matrix.set(i, i, 1.0);
        }
        matrix
    }

    /// Build from row-major values.
    pub fn from_values(dimension: usize, values: Vec<f64>) -> Result<Self, MatrixError> {
        if values.len() != dimension * dimension {
            return Err(MatrixError::ShapeMismatch {
                dimension,
                len: values.len(),
            });
        }
        Ok(Self { dimension, values })
    }

    /// Side length `n`.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Row-major view of all entries.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Entry at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.dimension + col]
    }

    /// Overwrite entry at (`row`, `col`).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.dimension + col] = value;
    }

    /// Add `value` to entry at (`row`, `col`).
    pub fn add_at(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.dimension + col] += value;
    }

    /// `self + other`, checking dimensions.
    pub fn checked_add(&self, other: &StateMatrix) -> Result<StateMatrix, MatrixError> {
        self.zip_with(other, |a, b| a + b)
    }

    /// `self - other`, checking dimensions.
    pub fn checked_sub(&self, other: &StateMatrix) -> Result<StateMatrix, MatrixError> {
        self.zip_with(other, |a, b| a - b)
    }

    /// In-place `self += other`, checking dimensions.
    pub fn add_assign_checked(&mut self, other: &StateMatrix) -> Result<(), MatrixError> {
        self.ensure_same_dimension(other)?;
        for (a, b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
        Ok(())
    }

    /// Multiply every entry by `factor`.
    pub fn scaled(&self, factor: f64) -> StateMatrix {
        StateMatrix {
            dimension: self.dimension,
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }

    /// Transposed copy.
    pub fn transpose(&self) -> StateMatrix {
        let mut out = StateMatrix::zeros(self.dimension);
        for row in 0..self.dimension {
            for col in 0..self.dimension {
                out.set(col, row, self.get(row, col));
            }
        }
        out
    }

    /// Matrix-vector product.
    pub fn mul_vec(&self, vector: &[f64]) -> Vec<f64> {
        (0..self.dimension)
            .map(|row| {
                let start = row * self.dimension;
                self.values[start..start + self.dimension]
                    .iter()
                    .zip(vector)
                    .map(|(a, b)| a * b)
                    .sum()
            })
            .collect()
    }

    /// True when no entry is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// True when every entry is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// Canonical big-endian encoding, used when hashing a delta.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.values.len() * 8);
        out.extend_from_slice(&(self.dimension as u16).to_be_bytes());
        for value in &self.values {
            out.extend_from_slice(&value.to_bits().to_be_bytes());
        }
        out
    }

    fn ensure_same_dimension(&self, other: &StateMatrix) -> Result<(), MatrixError> {
        if self.dimension != other.dimension {
            return Err(MatrixError::DimensionMismatch {
                left: self.dimension,
                right: other.dimension,
            });
        }
        Ok(())
    }

    fn zip_with(
        &self,
        other: &StateMatrix,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<StateMatrix, MatrixError> {
        self.ensure_same_dimension(other)?;
        Ok(StateMatrix {
            dimension: self.dimension,
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| f(*a, *b))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_diagonal() {
        let m = StateMatrix::identity(3);
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(1, 2), 0.0);
        assert_eq!(m.values().iter().sum::<f64>(), 3.0);
    }

    #[test]
    fn test_checked_add_rejects_dimension_mismatch() {
        let a = StateMatrix::zeros(3);
        let b = StateMatrix::zeros(4);
        assert!(matches!(
            a.checked_add(&b),
            Err(MatrixError::DimensionMismatch { left: 3, right: 4 })
        ));
    }

    #[test]
    fn test_add_then_sub_restores() {
        let base = StateMatrix::identity(4);
        let mut delta = StateMatrix::zeros(4);
        delta.add_at(0, 1, 0.125);
        delta.add_at(1, 0, 0.125);

        let moved = base.checked_add(&delta).unwrap();
        assert_eq!(moved.checked_sub(&delta).unwrap(), base);
    }

    #[test]
    fn test_transpose_and_mul_vec() {
        let m = StateMatrix::from_values(2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(m.transpose().values(), &[1.0, 3.0, 2.0, 4.0]);
        assert_eq!(m.mul_vec(&[1.0, 1.0]), vec![3.0, 7.0]);
    }

    #[test]
    fn test_from_values_shape_checked() {
        assert!(StateMatrix::from_values(2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_encoding_distinguishes_values() {
        let mut a = StateMatrix::zeros(2);
        let b = StateMatrix::zeros(2);
        a.set(1, 1, 0.5);
        assert_ne!(a.to_be_bytes(), b.to_be_bytes());
        assert_eq!(a.to_be_bytes().len(), 2 + 4 * 8);
    }
}
