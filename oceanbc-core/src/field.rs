//! Scalar fields on the local partition of a grid.
//!
//! A [`ScalarField`] owns a dense `f64` array covering the cells owned by this
//! worker, optionally surrounded by a ring of ghost cells. Cells are addressed
//! by *global* `(i, j)` indices, so code iterating over [`Grid::points`] can
//! index any field allocated on the same grid directly.

use crate::dataset::{Dataset, ForcingReader, VariableData};
use crate::errors::{OceanError, OceanResult};
use crate::grid::{Grid, Partition};
use crate::timeseries::FloatValue;
use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Whether a field stores ghost cells around the owned partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ghosts {
    Without,
    /// Ghost ring of the given width.
    With(usize),
}

impl Ghosts {
    fn width(self) -> usize {
        match self {
            Ghosts::Without => 0,
            Ghosts::With(width) => width,
        }
    }
}

/// Name, description and units of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    pub long_name: String,
    pub units: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField {
    metadata: FieldMetadata,
    partition: Partition,
    global_shape: (usize, usize),
    ghost_width: usize,
    /// Indexed `[[j, i]]`, ghost cells included.
    data: Array2<FloatValue>,
}

impl ScalarField {
    /// Allocate a zero-filled field on the local partition of `grid`.
    pub fn new(grid: &Grid, name: &str, ghosts: Ghosts) -> Self {
        let partition = grid.partition();
        let width = ghosts.width();
        Self {
            metadata: FieldMetadata {
                name: name.to_string(),
                long_name: String::new(),
                units: "1".to_string(),
            },
            partition,
            global_shape: (grid.mx(), grid.my()),
            ghost_width: width,
            data: Array2::zeros((partition.ym + 2 * width, partition.xm + 2 * width)),
        }
    }

    /// Set the description and units.
    pub fn with_attrs(mut self, long_name: &str, units: &str) -> Self {
        self.metadata.long_name = long_name.to_string();
        self.metadata.units = units.to_string();
        self
    }

    /// Build a field holding `values` (shape `(ym, xm)` of the local partition).
    pub fn from_values(
        grid: &Grid,
        name: &str,
        units: &str,
        values: Array2<FloatValue>,
    ) -> OceanResult<Self> {
        let partition = grid.partition();
        let expected = [partition.ym, partition.xm];
        if values.shape() != expected {
            return Err(OceanError::ShapeMismatch {
                name: name.to_string(),
                expected: expected.to_vec(),
                found: values.shape().to_vec(),
            });
        }
        let mut field = Self::new(grid, name, Ghosts::Without).with_attrs("", units);
        field.data = values;
        Ok(field)
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn units(&self) -> &str {
        &self.metadata.units
    }

    pub fn long_name(&self) -> &str {
        &self.metadata.long_name
    }

    pub fn metadata(&self) -> &FieldMetadata {
        &self.metadata
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn ghost_width(&self) -> usize {
        self.ghost_width
    }

    /// Fields are compatible when they cover the same partition of the same grid.
    pub fn is_compatible(&self, other: &ScalarField) -> bool {
        self.partition == other.partition && self.global_shape == other.global_shape
    }

    fn local_index(&self, i: usize, j: usize) -> Option<(usize, usize)> {
        let w = self.ghost_width;
        let p = &self.partition;
        // shifted by the ghost width so that ghosts at index -1 stay non-negative
        let (li, lj) = ((i + w).checked_sub(p.xs)?, (j + w).checked_sub(p.ys)?);
        (li < p.xm + 2 * w && lj < p.ym + 2 * w).then_some((lj, li))
    }

    /// Value at global `(i, j)`, or `None` outside this partition (and its ghosts).
    pub fn get(&self, i: usize, j: usize) -> Option<FloatValue> {
        self.local_index(i, j).map(|(r, c)| self.data[[r, c]])
    }

    /// Set every cell, ghosts included.
    pub fn set(&mut self, value: FloatValue) {
        self.data.fill(value);
    }

    /// Owned cells, without ghosts, indexed `[[j - ys, i - xs]]`.
    pub fn values(&self) -> ArrayView2<'_, FloatValue> {
        let w = self.ghost_width;
        self.data.slice(s![w..w + self.partition.ym, w..w + self.partition.xm])
    }

    /// Copy of the owned cells.
    pub fn to_array(&self) -> Array2<FloatValue> {
        self.values().to_owned()
    }

    /// Apply `f` to every cell, ghosts included.
    pub fn map_inplace(&mut self, f: impl Fn(FloatValue) -> FloatValue) {
        self.data.mapv_inplace(f);
    }

    pub fn shift(&mut self, offset: FloatValue) {
        self.map_inplace(|v| v + offset);
    }

    pub fn scale(&mut self, factor: FloatValue) {
        self.map_inplace(|v| v * factor);
    }

    /// Add `other` cell by cell.
    pub fn add(&mut self, other: &ScalarField) -> OceanResult<()> {
        self.check_compatible(other)?;
        let w = self.ghost_width;
        let (ym, xm) = (self.partition.ym, self.partition.xm);
        let mut owned = self.data.slice_mut(s![w..w + ym, w..w + xm]);
        owned += &other.values();
        Ok(())
    }

    /// Copy the owned values of `other` into this field.
    pub fn copy_from(&mut self, other: &ScalarField) -> OceanResult<()> {
        self.check_compatible(other)?;
        let w = self.ghost_width;
        let (ym, xm) = (self.partition.ym, self.partition.xm);
        self.data
            .slice_mut(s![w..w + ym, w..w + xm])
            .assign(&other.values());
        Ok(())
    }

    fn check_compatible(&self, other: &ScalarField) -> OceanResult<()> {
        if self.is_compatible(other) {
            Ok(())
        } else {
            Err(OceanError::ShapeMismatch {
                name: self.metadata.name.clone(),
                expected: vec![self.partition.ym, self.partition.xm],
                found: vec![other.partition.ym, other.partition.xm],
            })
        }
    }

    /// Range `(min, max)` over owned cells.
    pub fn range(&self) -> (FloatValue, FloatValue) {
        self.values().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
    }

    /// True if every owned cell holds a finite value.
    pub fn is_finite(&self) -> bool {
        self.values().iter().all(|v| v.is_finite())
    }

    /// Store the owned cells in `dataset` as a single-record gridded variable.
    ///
    /// Cells owned by other partitions are left as they are in the dataset, so
    /// each worker can write its part of a shared global array.
    pub fn write(&self, dataset: &mut Dataset) -> OceanResult<()> {
        let (mx, my) = self.global_shape;
        let mut record = match dataset.gridded_record(&self.metadata.name, 0) {
            Some(existing) if existing.len() == mx * my => existing.to_vec(),
            _ => vec![0.0; mx * my],
        };
        let p = self.partition;
        for j in p.ys..p.ys + p.ym {
            for i in p.xs..p.xs + p.xm {
                record[j * mx + i] = self[(i, j)];
            }
        }
        dataset.insert_variable(
            &self.metadata.name,
            &self.metadata.units,
            &self.metadata.long_name,
            VariableData::Gridded(vec![record]),
        );
        Ok(())
    }

    /// Read the first record of a gridded variable, converted to `units`.
    pub fn read(grid: &Grid, reader: &dyn ForcingReader, name: &str, units: &str) -> OceanResult<Self> {
        let forcing = reader.read_gridded(name, units, grid)?;
        let mut field = Self::new(grid, name, Ghosts::Without).with_attrs(forcing.long_name(), units);
        forcing.record_into(0, &mut field)?;
        Ok(field)
    }

    pub(crate) fn values_mut(&mut self) -> ndarray::ArrayViewMut2<'_, FloatValue> {
        let w = self.ghost_width;
        let (ym, xm) = (self.partition.ym, self.partition.xm);
        self.data.slice_mut(s![w..w + ym, w..w + xm])
    }
}

impl Index<(usize, usize)> for ScalarField {
    type Output = FloatValue;

    /// Global `(i, j)` indexing; panics outside the partition and its ghosts.
    fn index(&self, (i, j): (usize, usize)) -> &FloatValue {
        let (r, c) = self
            .local_index(i, j)
            .unwrap_or_else(|| panic!("({i}, {j}) is outside the partition of '{}'", self.metadata.name));
        &self.data[[r, c]]
    }
}

impl IndexMut<(usize, usize)> for ScalarField {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut FloatValue {
        let (r, c) = self
            .local_index(i, j)
            .unwrap_or_else(|| panic!("({i}, {j}) is outside the partition of '{}'", self.metadata.name));
        &mut self.data[[r, c]]
    }
}
