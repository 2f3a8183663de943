//! Normalized-difference and severity index computation.
//!
//! A normalized difference `(a - b) / (a + b)` is computed per pixel from two
//! bands. The severity index is the pre-event normalized difference minus the
//! post-event one. With the default near-infrared / shortwave-infrared pair
//! this is the differenced Normalized Burn Ratio (dNBR); other band pairs give
//! the same change index for vegetation (NDVI) or water (NDWI).
//!
//! The lazy functions build expressions for the remote service; the `*_raster`
//! functions apply the identical policy to materialized rasters. Pixels where
//! `a + b == 0`, or where any input is no-data, become no-data.

use serde::{Deserialize, Serialize};

use crate::catalog::ImageExpr;
use crate::composite::Composite;
use crate::error::{AnalysisError, Result};
use crate::model::VisParams;
use crate::raster::{NO_DATA, Raster};

/// Name of the band produced by a normalized difference.
pub const ND_BAND: &str = "nd";

/// Name of the band produced by the severity index.
pub const SEVERITY_BAND: &str = "severity";

/// The two bands of a normalized difference, `(a - b) / (a + b)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandPair {
    pub a: String,
    pub b: String,
}

impl BandPair {
    pub fn new(a: &str, b: &str) -> Result<Self> {
        if a.trim().is_empty() || b.trim().is_empty() {
            return Err(AnalysisError::validation("band names must not be empty"));
        }
        if a == b {
            return Err(AnalysisError::validation(format!(
                "normalized difference needs two distinct bands, got {a} twice"
            )));
        }
        Ok(Self {
            a: a.to_string(),
            b: b.to_string(),
        })
    }

    /// Normalized Burn Ratio: Sentinel-2 NIR (B8) and SWIR2 (B12).
    pub fn nbr() -> Self {
        Self {
            a: "B8".to_string(),
            b: "B12".to_string(),
        }
    }

    /// Vegetation index: Sentinel-2 NIR (B8) and red (B4).
    pub fn ndvi() -> Self {
        Self {
            a: "B8".to_string(),
            b: "B4".to_string(),
        }
    }

    /// Water index: Sentinel-2 green (B3) and NIR (B8).
    pub fn ndwi() -> Self {
        Self {
            a: "B3".to_string(),
            b: "B8".to_string(),
        }
    }

    /// Index name: `NBR`, `NDVI` or `NDWI` for the known pairs, otherwise
    /// `ND(a,b)`.
    pub fn label(&self) -> String {
        match (self.a.as_str(), self.b.as_str()) {
            ("B8", "B12") => "NBR".to_string(),
            ("B8", "B4") => "NDVI".to_string(),
            ("B3", "B8") => "NDWI".to_string(),
            (a, b) => format!("ND({a},{b})"),
        }
    }
}

impl Default for BandPair {
    fn default() -> Self {
        Self::nbr()
    }
}

/// A lazy single-band severity raster and how to display it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityIndex {
    pub image: ImageExpr,
    pub bands: BandPair,
    pub vis: VisParams,
}

/// Lazy normalized difference of one composite.
pub fn normalized_difference(image: &ImageExpr, bands: &BandPair) -> ImageExpr {
    image.clone().normalized_difference(&bands.a, &bands.b)
}

impl SeverityIndex {
    /// Map layer name, e.g. `Severity (dNBR)`.
    pub fn layer_name(&self) -> String {
        format!("Severity (d{})", self.bands.label())
    }
}

/// Lazy severity index `nd(pre) - nd(post)`.
///
/// The burn-severity ramp is only used for NBR; other pairs get a generic
/// difference ramp.
pub fn severity_index(pre: &Composite, post: &Composite, bands: &BandPair) -> SeverityIndex {
    let pre_nd = normalized_difference(&pre.image, bands);
    let image = pre_nd.subtract(normalized_difference(&post.image, bands));
    let vis = if *bands == BandPair::nbr() {
        VisParams::dnbr()
    } else {
        VisParams::difference()
    };
    SeverityIndex {
        image,
        bands: bands.clone(),
        vis,
    }
}

/// Normalized difference of one pixel; no-data for a zero sum or no-data input.
pub fn normalized_difference_value(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        return NO_DATA;
    }
    let sum = a + b;
    if sum == 0.0 {
        return NO_DATA;
    }
    (a - b) / sum
}

/// Materialized normalized difference, single band [`ND_BAND`].
pub fn normalized_difference_raster(image: &Raster, bands: &BandPair) -> Result<Raster> {
    let a = image.band(&bands.a)?;
    let b = image.band(&bands.b)?;
    let data = a
        .iter()
        .zip(b)
        .map(|(&a, &b)| normalized_difference_value(a, b))
        .collect();
    let (rows, cols) = image.shape();
    Raster::new(rows, cols, *image.transform()).with_band(ND_BAND, data)
}

/// Materialized severity index, single band [`SEVERITY_BAND`].
pub fn severity_index_raster(pre: &Raster, post: &Raster, bands: &BandPair) -> Result<Raster> {
    let nd_pre = normalized_difference_raster(pre, bands)?;
    let nd_post = normalized_difference_raster(post, bands)?;
    nd_pre.zip_first(&nd_post, SEVERITY_BAND, |a, b| a - b)
}

/// Burn severity classes for dNBR values (USGS FIREMON thresholds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityClass {
    EnhancedRegrowthHigh,
    EnhancedRegrowthLow,
    Unburned,
    Low,
    ModerateLow,
    ModerateHigh,
    High,
}

impl SeverityClass {
    pub const ALL: [SeverityClass; 7] = [
        SeverityClass::EnhancedRegrowthHigh,
        SeverityClass::EnhancedRegrowthLow,
        SeverityClass::Unburned,
        SeverityClass::Low,
        SeverityClass::ModerateLow,
        SeverityClass::ModerateHigh,
        SeverityClass::High,
    ];

    /// Classify a dNBR value; `None` for no-data.
    pub fn from_dnbr(value: f64) -> Option<Self> {
        if value.is_nan() {
            return None;
        }
        Some(if value < -0.25 {
            SeverityClass::EnhancedRegrowthHigh
        } else if value < -0.1 {
            SeverityClass::EnhancedRegrowthLow
        } else if value < 0.1 {
            SeverityClass::Unburned
        } else if value < 0.27 {
            SeverityClass::Low
        } else if value < 0.44 {
            SeverityClass::ModerateLow
        } else if value < 0.66 {
            SeverityClass::ModerateHigh
        } else {
            SeverityClass::High
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            SeverityClass::EnhancedRegrowthHigh => "Enhanced Regrowth, High",
            SeverityClass::EnhancedRegrowthLow => "Enhanced Regrowth, Low",
            SeverityClass::Unburned => "Unburned",
            SeverityClass::Low => "Low Severity",
            SeverityClass::ModerateLow => "Moderate-low Severity",
            SeverityClass::ModerateHigh => "Moderate-high Severity",
            SeverityClass::High => "High Severity",
        }
    }
}

/// Pixel counts per severity class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeveritySummary {
    pub valid_pixels: usize,
    pub nodata_pixels: usize,
    pub classes: Vec<ClassCount>,
    /// Mean dNBR over valid pixels, if any.
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassCount {
    pub class: SeverityClass,
    pub label: &'static str,
    pub pixels: usize,
}

impl SeveritySummary {
    /// Summarize the first band of a severity raster.
    pub fn from_raster(raster: &Raster) -> Result<Self> {
        let values = raster.first_band()?;
        let mut counts = [0usize; 7];
        let mut sum = 0.0;
        let valid = raster.valid_count();

        for &v in values {
            if let Some(class) = SeverityClass::from_dnbr(v) {
                counts[class as usize] += 1;
                sum += v;
            }
        }

        Ok(Self {
            valid_pixels: valid,
            nodata_pixels: values.len() - valid,
            classes: SeverityClass::ALL
                .iter()
                .map(|&class| ClassCount {
                    class,
                    label: class.label(),
                    pixels: counts[class as usize],
                })
                .collect(),
            mean: (valid > 0).then(|| sum / valid as f64),
        })
    }
}
