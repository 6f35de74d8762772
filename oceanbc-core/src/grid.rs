//! The spatial domain shared by all models and fields.
//!
//! A [`Grid`] describes a regular 2D domain of `mx × my` cells. In a
//! domain-decomposed run each worker owns one rectangular [`Partition`]; fields
//! store only that partition (plus optional ghost cells) and models only ever
//! visit owned cells through [`Grid::points`]. Nothing in this crate
//! communicates between partitions.
//!
//! The grid also carries a [`Variables`] registry through which the driver
//! publishes fields that boundary models read, such as ice thickness.

use crate::errors::{OceanError, OceanResult};
use crate::field::ScalarField;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry name of the ice thickness field.
pub const ICE_THICKNESS: &str = "land_ice_thickness";

/// The rectangle of cells owned by one worker, in global indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub xs: usize,
    pub xm: usize,
    pub ys: usize,
    pub ym: usize,
}

impl Partition {
    pub fn contains(&self, i: usize, j: usize) -> bool {
        i >= self.xs && i < self.xs + self.xm && j >= self.ys && j < self.ys + self.ym
    }

    pub fn size(&self) -> usize {
        self.xm * self.ym
    }
}

/// Parameters describing the grid, usually read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParameters {
    /// Number of cells in x.
    pub mx: usize,
    /// Number of cells in y.
    pub my: usize,
    /// Half-width of the domain in x (m).
    pub lx: f64,
    /// Half-width of the domain in y (m).
    pub ly: f64,
    /// Rank of this worker.
    pub rank: usize,
    /// Total number of workers; the domain is split into strips along y.
    pub size: usize,
}

impl Default for GridParameters {
    fn default() -> Self {
        Self {
            mx: 3,
            my: 3,
            lx: 1500e3,
            ly: 1500e3,
            rank: 0,
            size: 1,
        }
    }
}

impl GridParameters {
    pub fn new(mx: usize, my: usize) -> Self {
        Self {
            mx,
            my,
            ..Default::default()
        }
    }

    /// The same grid, owned by worker `rank` out of `size`.
    pub fn partitioned(self, rank: usize, size: usize) -> Self {
        Self { rank, size, ..self }
    }

    fn partition(&self) -> OceanResult<Partition> {
        if self.mx == 0 || self.my == 0 {
            return Err(OceanError::InvalidConfiguration(format!(
                "grid must have at least one cell, got {}x{}",
                self.mx, self.my
            )));
        }
        if self.size == 0 || self.rank >= self.size {
            return Err(OceanError::InvalidConfiguration(format!(
                "rank {} is not valid for {} workers",
                self.rank, self.size
            )));
        }
        if self.size > self.my {
            return Err(OceanError::InvalidConfiguration(format!(
                "cannot split {} rows between {} workers",
                self.my, self.size
            )));
        }

        // Rows are distributed as evenly as possible, the first `extra`
        // workers getting one more.
        let base = self.my / self.size;
        let extra = self.my % self.size;
        let ym = base + usize::from(self.rank < extra);
        let ys = self.rank * base + self.rank.min(extra);

        Ok(Partition {
            xs: 0,
            xm: self.mx,
            ys,
            ym,
        })
    }
}

/// Shared, read-mostly registry of named input fields.
///
/// Entries are immutable snapshots: the driver replaces a field by calling
/// [`Variables::add`] again, and models pick up the new snapshot at their next
/// update.
#[derive(Debug, Default)]
pub struct Variables {
    fields: RwLock<HashMap<String, Arc<ScalarField>>>,
}

impl Variables {
    pub fn add(&self, field: ScalarField) {
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        fields.insert(field.name().to_string(), Arc::new(field));
    }

    pub fn get(&self, name: &str) -> Option<Arc<ScalarField>> {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        fields.get(name).cloned()
    }

    /// Like [`get`](Self::get), but a missing field is an error.
    pub fn require(&self, name: &str) -> OceanResult<Arc<ScalarField>> {
        self.get(name)
            .ok_or_else(|| OceanError::missing(name, "grid variable registry"))
    }

    pub fn contains(&self, name: &str) -> bool {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        fields.contains_key(name)
    }
}

/// A regular 2D grid and the partition owned by this worker.
#[derive(Debug)]
pub struct Grid {
    parameters: GridParameters,
    partition: Partition,
    variables: Variables,
}

impl Grid {
    pub fn new(parameters: GridParameters) -> OceanResult<Self> {
        let partition = parameters.partition()?;
        Ok(Self {
            parameters,
            partition,
            variables: Variables::default(),
        })
    }

    /// Build a grid wrapped for sharing between models.
    pub fn shared(parameters: GridParameters) -> OceanResult<Arc<Self>> {
        Self::new(parameters).map(Arc::new)
    }

    pub fn parameters(&self) -> &GridParameters {
        &self.parameters
    }

    pub fn mx(&self) -> usize {
        self.parameters.mx
    }

    pub fn my(&self) -> usize {
        self.parameters.my
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Grid spacing in x (m).
    pub fn dx(&self) -> f64 {
        spacing(self.parameters.lx, self.parameters.mx)
    }

    /// Grid spacing in y (m).
    pub fn dy(&self) -> f64 {
        spacing(self.parameters.ly, self.parameters.my)
    }

    /// Cell-centre x coordinate of column `i`.
    pub fn x(&self, i: usize) -> f64 {
        -self.parameters.lx + self.dx() * i as f64
    }

    /// Cell-centre y coordinate of row `j`.
    pub fn y(&self, j: usize) -> f64 {
        -self.parameters.ly + self.dy() * j as f64
    }

    /// Iterate over the `(i, j)` indices of the cells owned by this worker.
    pub fn points(&self) -> Points {
        Points {
            partition: self.partition,
            next: 0,
        }
    }
}

fn spacing(half_width: f64, n: usize) -> f64 {
    if n > 1 {
        2.0 * half_width / (n - 1) as f64
    } else {
        2.0 * half_width
    }
}

/// Iterator over owned cells, row by row.
#[derive(Debug, Clone)]
pub struct Points {
    partition: Partition,
    next: usize,
}

impl Iterator for Points {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.partition.size() {
            return None;
        }
        let i = self.partition.xs + self.next % self.partition.xm;
        let j = self.partition.ys + self.next / self.partition.xm;
        self.next += 1;
        Some((i, j))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.partition.size() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Points {}
