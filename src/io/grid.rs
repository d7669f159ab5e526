use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SadError;

/// One individual observed at a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub species: usize,
    pub x: usize,
    pub y: usize,
}

/// Dense species counts on a spatial grid, indexed `counts[y][x][species]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountGrid {
    /// Name of the table the counts came from
    pub name: String,
    pub counts: Vec<Vec<Vec<u32>>>,
}

/// Extent of a [`CountGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridShape {
    pub rows: usize,
    pub columns: usize,
    pub species: usize,
}

impl CountGrid {
    /// Dimensions of the grid, rejecting ragged rows or cells.
    pub fn shape(&self) -> Result<GridShape, SadError> {
        let rows = self.counts.len();
        let columns = self.counts.first().map_or(0, Vec::len);
        let species = self
            .counts
            .first()
            .and_then(|row| row.first())
            .map_or(0, Vec::len);

        for (y, row) in self.counts.iter().enumerate() {
            if row.len() != columns {
                return Err(SadError::ParseError(format!(
                    "grid '{}' row {y} has {} columns, expected {columns}",
                    self.name,
                    row.len()
                )));
            }
            if let Some(x) = row.iter().position(|cell| cell.len() != species) {
                return Err(SadError::ParseError(format!(
                    "grid '{}' cell ({x}, {y}) has {} species, expected {species}",
                    self.name,
                    row[x].len()
                )));
            }
        }

        Ok(GridShape {
            rows,
            columns,
            species,
        })
    }

    /// Individuals of each species across the whole grid.
    pub fn species_totals(&self) -> Result<Vec<u64>, SadError> {
        let shape = self.shape()?;
        let mut totals = vec![0u64; shape.species];
        for cell in self.counts.iter().flatten() {
            for (total, &count) in totals.iter_mut().zip(cell) {
                *total += u64::from(count);
            }
        }
        Ok(totals)
    }

    /// Total individuals in the grid.
    pub fn total(&self) -> Result<u64, SadError> {
        Ok(self.species_totals()?.iter().sum())
    }

    /// Expand counts into one observation per individual, lazily.
    ///
    /// Order is species, then x, then y. Zero cells produce nothing.
    pub fn observations(&self) -> Result<impl Iterator<Item = Observation> + '_, SadError> {
        let shape = self.shape()?;
        Ok((0..shape.species).flat_map(move |species| {
            (0..shape.columns).flat_map(move |x| {
                (0..shape.rows).flat_map(move |y| {
                    (0..self.counts[y][x][species]).map(move |_| Observation { species, x, y })
                })
            })
        }))
    }
}

/// Read a count grid from JSON: `{"name": "...", "counts": [[[...]]]}`.
pub fn read_grid_json(path: impl AsRef<Path>) -> Result<CountGrid, SadError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let grid: CountGrid = serde_json::from_str(&content)?;
    grid.shape()?;
    Ok(grid)
}

/// Conventional output path for a grid's observation table: `<dir>/<name>_xy.csv`.
pub fn xy_output_path(dir: impl AsRef<Path>, name: &str) -> PathBuf {
    dir.as_ref().join(format!("{}_xy.csv", name.trim_end()))
}

/// Write one `species,x,y` row per individual. Returns the rows written.
///
/// Rows are streamed to the writer, so memory does not grow with the total count.
pub fn write_xy_csv(grid: &CountGrid, path: impl AsRef<Path>) -> Result<u64, SadError> {
    let path = path.as_ref();
    let observations = grid.observations()?;
    let mut wtr = csv::Writer::from_path(path)?;
    let mut rows = 0u64;
    for observation in observations {
        wtr.serialize(observation)?;
        rows += 1;
    }
    wtr.flush()?;

    info!(rows, path = %path.display(), "wrote observation table");
    Ok(rows)
}

/// Individuals per species from a `species,x,y` observation table, in
/// ascending species-id order. Rows are counted as they are read.
pub fn read_xy_abundances(path: impl AsRef<Path>) -> Result<Vec<u64>, SadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;
    let mut counts = BTreeMap::new();
    for result in rdr.deserialize::<Observation>() {
        *counts.entry(result?.species).or_insert(0u64) += 1;
    }
    Ok(counts.into_values().collect())
}

/// Individuals per species, in ascending species-id order.
pub fn abundances_from_observations(
    observations: impl IntoIterator<Item = Observation>,
) -> Vec<u64> {
    observations
        .into_iter()
        .fold(BTreeMap::new(), |mut counts, observation| {
            *counts.entry(observation.species).or_insert(0u64) += 1;
            counts
        })
        .into_values()
        .collect()
}
