use crate::grid::{build_axis, normalize_longitude};
use crate::io::open_reader;
use hdd_core::error::{HddError, Result};
use ndarray::Array2;
use std::io::Read;
use std::path::Path;

/// Coordinates closer than this are the same grid point.
const COORDINATE_TOLERANCE: f64 = 1e-6;

/// Static population counts regridded onto one data-grid resolution.
///
/// Expected CSV columns (with headers): `latitude,longitude,population`.
/// Cells absent from the file weigh zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationGrid {
    pub latitudes: Vec<f64>,
    pub longitudes: Vec<f64>,
    /// Indexed (latitude, longitude).
    pub weights: Array2<f64>,
}

impl PopulationGrid {
    pub fn read_csv(path: &Path) -> Result<Self> {
        let grid = PopulationGrid::from_reader(open_reader(path)?)?;
        log::info!(
            "loaded population grid {} ({} x {}, total {:.0})",
            path.display(),
            grid.latitudes.len(),
            grid.longitudes.len(),
            grid.total()
        );
        Ok(grid)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut cells: Vec<(f64, f64, f64)> = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let r = result?;
            let parse = |idx: usize| -> Result<f64> {
                let raw = r.get(idx).unwrap_or("");
                raw.parse().map_err(|_| {
                    HddError::GridFormat(format!("population row {}: bad number {raw:?}", line + 2))
                })
            };
            let population = parse(2)?;
            cells.push((
                parse(0)?,
                normalize_longitude(parse(1)?),
                if population.is_finite() { population } else { 0.0 },
            ));
        }

        let latitudes = build_axis(cells.iter().map(|c| c.0));
        let longitudes = build_axis(cells.iter().map(|c| c.1));
        let mut weights = Array2::zeros((latitudes.len(), longitudes.len()));
        for (lat, lon, population) in cells {
            if let (Some(i), Some(j)) = (
                nearest_index(&latitudes, lat),
                nearest_index(&longitudes, lon),
            ) {
                weights[[i, j]] = population;
            }
        }
        Ok(PopulationGrid {
            latitudes,
            longitudes,
            weights,
        })
    }

    pub fn total(&self) -> f64 {
        self.weights.sum()
    }

    /// Weights laid out on a data grid's axes. Every data coordinate must exist
    /// in this grid, otherwise the two resolutions do not match.
    pub fn weights_for(&self, latitudes: &[f64], longitudes: &[f64]) -> Result<Array2<f64>> {
        let lat_idx = latitudes
            .iter()
            .map(|&lat| {
                nearest_index(&self.latitudes, lat).ok_or(HddError::PopulationMismatch {
                    axis: "latitude",
                    value: lat,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let lon_idx = longitudes
            .iter()
            .map(|&lon| {
                nearest_index(&self.longitudes, lon).ok_or(HddError::PopulationMismatch {
                    axis: "longitude",
                    value: lon,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Array2::from_shape_fn(
            (lat_idx.len(), lon_idx.len()),
            |(i, j)| self.weights[[lat_idx[i], lon_idx[j]]],
        ))
    }
}

fn nearest_index(axis: &[f64], value: f64) -> Option<usize> {
    let pos = axis.partition_point(|probe| *probe < value);
    [pos.checked_sub(1), Some(pos)]
        .into_iter()
        .flatten()
        .filter(|&idx| idx < axis.len())
        .find(|&idx| (axis[idx] - value).abs() <= COORDINATE_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POPULATION_CSV: &str = "\
latitude,longitude,population
40.0,250.0,100
40.0,260.0,300
45.0,250.0,50
";

    #[test]
    fn test_read_population_grid() {
        let grid = PopulationGrid::from_reader(POPULATION_CSV.as_bytes()).unwrap();
        assert_eq!(grid.latitudes, vec![40.0, 45.0]);
        assert_eq!(grid.longitudes, vec![-110.0, -100.0]);
        assert_eq!(grid.weights[[0, 1]], 300.0);
        // absent cell
        assert_eq!(grid.weights[[1, 1]], 0.0);
        assert_eq!(grid.total(), 450.0);
    }

    #[test]
    fn test_weights_for_subset() {
        let grid = PopulationGrid::from_reader(POPULATION_CSV.as_bytes()).unwrap();
        let weights = grid.weights_for(&[40.0], &[-100.0, -110.0 + 1e-9]).unwrap();
        assert_eq!(weights.dim(), (1, 2));
        assert_eq!(weights[[0, 0]], 300.0);
        assert_eq!(weights[[0, 1]], 100.0);
    }

    #[test]
    fn test_weights_for_mismatched_resolution() {
        let grid = PopulationGrid::from_reader(POPULATION_CSV.as_bytes()).unwrap();
        let result = grid.weights_for(&[40.25], &[-100.0]);
        assert!(matches!(
            result,
            Err(HddError::PopulationMismatch { axis: "latitude", .. })
        ));
    }
}
