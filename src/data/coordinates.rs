//! Geometry/coordinates storage for mesh entities.
//!
//! Coordinates are stored row-major in one flat buffer with a fixed dimension
//! per entity. Row `i` belongs to the entity with local index `i`.

use crate::mesh_error::MeshNumberingError;

/// Largest supported spatial dimension.
pub const MAX_DIMENSION: usize = 3;

/// Coordinate table with an attached dimension.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinates {
    dimension: usize,
    values: Vec<f64>,
}

impl Coordinates {
    /// Create an empty table for `dimension`-component rows.
    pub fn try_new(dimension: usize) -> Result<Self, MeshNumberingError> {
        validate_dimension(dimension)?;
        Ok(Self {
            dimension,
            values: Vec::new(),
        })
    }

    /// Wrap a flat row-major buffer, validating that it holds whole rows.
    pub fn from_flat(dimension: usize, values: Vec<f64>) -> Result<Self, MeshNumberingError> {
        validate_dimension(dimension)?;
        if values.len() % dimension != 0 {
            return Err(MeshNumberingError::CoordinateLengthMismatch {
                expected: dimension,
                found: values.len() % dimension,
            });
        }
        Ok(Self { dimension, values })
    }

    /// Build a table from rows; every row must have `dimension` components.
    pub fn from_rows<I, R>(dimension: usize, rows: I) -> Result<Self, MeshNumberingError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[f64]>,
    {
        let mut coords = Self::try_new(dimension)?;
        for row in rows {
            coords.try_push(row.as_ref())?;
        }
        Ok(coords)
    }

    /// Returns the spatial dimension per entity.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Append one row.
    pub fn try_push(&mut self, row: &[f64]) -> Result<usize, MeshNumberingError> {
        if row.len() != self.dimension {
            return Err(MeshNumberingError::CoordinateLengthMismatch {
                expected: self.dimension,
                found: row.len(),
            });
        }
        self.values.extend_from_slice(row);
        Ok(self.len() - 1)
    }

    /// Read-only view of row `i`.
    pub fn try_row(&self, i: usize) -> Result<&[f64], MeshNumberingError> {
        let start = i * self.dimension;
        self.values
            .get(start..start + self.dimension)
            .ok_or(MeshNumberingError::EntityIndexOutOfBounds {
                index: i,
                len: self.len(),
            })
    }

    /// Iterate over all rows in local-index order.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, f64> {
        self.values.chunks_exact(self.dimension)
    }

    /// The flat row-major buffer.
    pub fn as_flat(&self) -> &[f64] {
        &self.values
    }
}

fn validate_dimension(dimension: usize) -> Result<(), MeshNumberingError> {
    if (1..=MAX_DIMENSION).contains(&dimension) {
        Ok(())
    } else {
        Err(MeshNumberingError::InvalidDimension(dimension))
    }
}
