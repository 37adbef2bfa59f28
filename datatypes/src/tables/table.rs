use crate::error::{self, Error};
use crate::util::Result;
use snafu::ensure;

/// A dense N-dimensional table stored in one row-major buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<const N: usize> {
    shape: [usize; N],
    data: Vec<f64>,
}

impl<const N: usize> Table<N> {
    pub fn new(shape: [usize; N], data: Vec<f64>) -> Result<Self> {
        let capacity = shape.iter().product::<usize>();
        ensure!(
            capacity == data.len(),
            error::DimensionCapacityDoesNotMatchDataCapacity {
                dimension_cap: capacity,
                data_cap: data.len()
            }
        );
        Ok(Self { shape, data })
    }

    pub fn new_filled(shape: [usize; N], value: f64) -> Self {
        Self {
            shape,
            data: vec![value; shape.iter().product()],
        }
    }

    pub fn shape(&self) -> [usize; N] {
        self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn strides(&self) -> [usize; N] {
        let mut strides = [1; N];
        for axis in (0..N.saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.shape[axis + 1];
        }
        strides
    }

    pub fn linear_index(&self, index: [usize; N]) -> Result<usize> {
        ensure!(
            index.iter().zip(self.shape).all(|(&i, size)| i < size),
            error::GridIndexOutOfBounds {
                index: index.iter().map(|&i| i as isize).collect::<Vec<_>>(),
                min_index: vec![0_isize; N],
                max_index: self.shape.iter().map(|&s| s as isize - 1).collect::<Vec<_>>()
            }
        );

        Ok(index
            .iter()
            .zip(self.strides())
            .map(|(&i, stride)| i * stride)
            .sum())
    }

    pub fn get(&self, index: [usize; N]) -> Result<f64> {
        Ok(self.data[self.linear_index(index)?])
    }

    pub fn set(&mut self, index: [usize; N], value: f64) -> Result<()> {
        let i = self.linear_index(index)?;
        self.data[i] = value;
        Ok(())
    }

    /// Cellwise combination of two tables of equal shape.
    pub fn zip_with<F>(&self, other: &Self, f: F) -> Result<Self>
    where
        F: Fn(f64, f64) -> f64,
    {
        if self.shape != other.shape {
            return Err(Error::TableShapeMismatch {
                expected: self.shape.to_vec(),
                found: other.shape.to_vec(),
            });
        }

        Ok(Self {
            shape: self.shape,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }
}
