//! Materialized rasters.
//!
//! The pipelines work on lazy, server-side image expressions. A [`Raster`] is
//! what comes back when one of those expressions is explicitly materialized:
//! a north-up grid in geographic coordinates with one or more named bands.
//!
//! No-data is represented by `NaN` in every band. Operations never divide by
//! zero or produce a number where an input was no-data; they write [`NO_DATA`].

use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::region::RegionOfInterest;

/// No-data marker for every band.
pub const NO_DATA: f64 = f64::NAN;

/// Affine placement of a north-up grid in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoTransform {
    /// Longitude of the west edge.
    pub west: f64,
    /// Latitude of the north edge.
    pub north: f64,
    /// Pixel width in degrees of longitude.
    pub pixel_width: f64,
    /// Pixel height in degrees of latitude (positive; rows run southwards).
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Grid of `rows` x `cols` pixels exactly covering `[west, south, east, north]`.
    pub fn covering(wsen: [f64; 4], rows: usize, cols: usize) -> Self {
        let [west, south, east, north] = wsen;
        Self {
            west,
            north,
            pixel_width: (east - west) / cols.max(1) as f64,
            pixel_height: (north - south) / rows.max(1) as f64,
        }
    }

    /// `(lon, lat)` of the center of pixel `(row, col)`.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.west + (col as f64 + 0.5) * self.pixel_width,
            self.north - (row as f64 + 0.5) * self.pixel_height,
        )
    }
}

/// A single named band, row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    pub name: String,
    pub data: Vec<f64>,
}

/// A multi-band grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Raster {
    rows: usize,
    cols: usize,
    transform: GeoTransform,
    bands: Vec<Band>,
}

impl Raster {
    /// Empty raster (no bands yet) with the given shape and placement.
    pub fn new(rows: usize, cols: usize, transform: GeoTransform) -> Self {
        Self {
            rows,
            cols,
            transform,
            bands: Vec::new(),
        }
    }

    /// Add a band, replacing any band with the same name.
    pub fn with_band(mut self, name: &str, data: Vec<f64>) -> Result<Self> {
        if data.len() != self.rows * self.cols {
            return Err(AnalysisError::validation(format!(
                "band {name} has {} values, expected {}x{}",
                data.len(),
                self.rows,
                self.cols
            )));
        }
        self.bands.retain(|b| b.name != name);
        self.bands.push(Band {
            name: name.to_string(),
            data,
        });
        Ok(self)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    /// Values of the named band.
    pub fn band(&self, name: &str) -> Result<&[f64]> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.data.as_slice())
            .ok_or_else(|| {
                AnalysisError::validation(format!(
                    "band {name} not present (available: {})",
                    self.band_names().join(", ")
                ))
            })
    }

    /// The first band, for single-band products.
    pub fn first_band(&self) -> Result<&[f64]> {
        self.bands
            .first()
            .map(|b| b.data.as_slice())
            .ok_or_else(|| AnalysisError::validation("raster has no bands"))
    }

    /// Number of pixels holding data in the first band.
    pub fn valid_count(&self) -> usize {
        self.bands
            .first()
            .map(|b| b.data.iter().filter(|v| !v.is_nan()).count())
            .unwrap_or(0)
    }

    /// Combine the first band of `self` and `other` pixel by pixel.
    ///
    /// No-data in either operand yields no-data without calling `f`.
    pub fn zip_first(
        &self,
        other: &Raster,
        name: &str,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Raster> {
        self.check_same_grid(other)?;
        let data = self
            .first_band()?
            .iter()
            .zip(other.first_band()?)
            .map(|(&a, &b)| {
                if a.is_nan() || b.is_nan() {
                    NO_DATA
                } else {
                    f(a, b)
                }
            })
            .collect();
        Raster::new(self.rows, self.cols, self.transform).with_band(name, data)
    }

    /// Mask every pixel whose center falls outside `region`.
    pub fn clip(&self, region: &RegionOfInterest) -> Raster {
        let inside: Vec<bool> = (0..self.rows * self.cols)
            .map(|i| {
                let (lon, lat) = self.transform.pixel_center(i / self.cols, i % self.cols);
                region.contains(lon, lat)
            })
            .collect();

        let bands = self
            .bands
            .iter()
            .map(|b| Band {
                name: b.name.clone(),
                data: b
                    .data
                    .iter()
                    .zip(&inside)
                    .map(|(&v, &keep)| if keep { v } else { NO_DATA })
                    .collect(),
            })
            .collect();

        Raster {
            rows: self.rows,
            cols: self.cols,
            transform: self.transform,
            bands,
        }
    }

    /// Per-pixel, per-band median across `scenes`, ignoring no-data.
    ///
    /// All scenes must share the grid of the first one; bands are those of the
    /// first scene. A pixel with no valid value in any scene is no-data.
    pub fn median(scenes: &[Raster]) -> Result<Raster> {
        let first = scenes
            .first()
            .ok_or_else(|| AnalysisError::validation("median of an empty scene list"))?;
        for scene in &scenes[1..] {
            first.check_same_grid(scene)?;
        }

        let mut out = Raster::new(first.rows, first.cols, first.transform);
        for band in &first.bands {
            let inputs = scenes
                .iter()
                .map(|s| s.band(&band.name))
                .collect::<Result<Vec<_>>>()?;

            let mut samples = Vec::with_capacity(scenes.len());
            let data = (0..first.rows * first.cols)
                .map(|i| {
                    samples.clear();
                    samples.extend(inputs.iter().map(|d| d[i]).filter(|v| !v.is_nan()));
                    median_of(&mut samples)
                })
                .collect();
            out = out.with_band(&band.name, data)?;
        }
        Ok(out)
    }

    fn check_same_grid(&self, other: &Raster) -> Result<()> {
        if self.shape() != other.shape() || self.transform != other.transform {
            return Err(AnalysisError::validation(format!(
                "raster grids differ: {}x{} vs {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        Ok(())
    }
}

fn median_of(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return NO_DATA;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}
