//! Remote geospatial processing collaborators.
//!
//! Scene collections and images are never held locally by the pipelines. They
//! are described by lazy expressions ([`CollectionHandle`], [`ImageExpr`]) that
//! the remote service evaluates on demand. Evaluation only happens through the
//! explicit operations of [`ImageCatalog`]: counting a collection, materializing
//! an image into a [`Raster`], or registering it as a map-tile layer.
//!
//! # Implementations
//!
//! - [`earth_engine`]: REST client for an Earth Engine style processing service
//! - [`local`]: in-memory evaluator of the same expressions over stored scenes

pub mod earth_engine;
pub mod local;

pub use earth_engine::EarthEngineClient;
pub use local::{LocalCatalog, LocalScene};

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::Result;
use crate::model::{DateRange, VisParams};
use crate::raster::Raster;
use crate::region::RegionOfInterest;
use crate::timelapse::TimelapseRequest;

/// A filter applied to a scene collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CollectionFilter {
    /// Scene footprint intersects the region.
    Bounds { region: RegionOfInterest },
    /// Scene acquisition date in `[start, end)`.
    Date { start: NaiveDate, end: NaiveDate },
    /// Numeric scene property strictly less than `value`.
    LessThan { property: String, value: f64 },
}

/// Lazy handle to a filtered, server-side scene collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionHandle {
    collection_id: String,
    filters: Vec<CollectionFilter>,
}

impl CollectionHandle {
    /// Unfiltered collection by catalog id, e.g. `COPERNICUS/S2_SR_HARMONIZED`.
    pub fn load(collection_id: &str) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            filters: Vec::new(),
        }
    }

    pub fn filter_bounds(mut self, region: &RegionOfInterest) -> Self {
        self.filters.push(CollectionFilter::Bounds {
            region: region.clone(),
        });
        self
    }

    pub fn filter_date(mut self, range: &DateRange) -> Self {
        self.filters.push(CollectionFilter::Date {
            start: range.start(),
            end: range.end(),
        });
        self
    }

    pub fn filter_lt(mut self, property: &str, value: f64) -> Self {
        self.filters.push(CollectionFilter::LessThan {
            property: property.to_string(),
            value,
        });
        self
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn filters(&self) -> &[CollectionFilter] {
        &self.filters
    }

    /// Per-pixel, per-band temporal median of the collection.
    pub fn median(self) -> ImageExpr {
        ImageExpr::Median(self)
    }
}

/// Lazy server-side image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ImageExpr {
    Median(CollectionHandle),
    Clip {
        image: Box<ImageExpr>,
        region: RegionOfInterest,
    },
    /// `(a - b) / (a + b)`, no-data where `a + b == 0`.
    NormalizedDifference {
        image: Box<ImageExpr>,
        band_a: String,
        band_b: String,
    },
    Subtract {
        left: Box<ImageExpr>,
        right: Box<ImageExpr>,
    },
}

impl ImageExpr {
    /// Mask everything outside the exact region geometry.
    pub fn clip(self, region: &RegionOfInterest) -> ImageExpr {
        ImageExpr::Clip {
            image: Box::new(self),
            region: region.clone(),
        }
    }

    pub fn normalized_difference(self, band_a: &str, band_b: &str) -> ImageExpr {
        ImageExpr::NormalizedDifference {
            image: Box::new(self),
            band_a: band_a.to_string(),
            band_b: band_b.to_string(),
        }
    }

    pub fn subtract(self, other: ImageExpr) -> ImageExpr {
        ImageExpr::Subtract {
            left: Box::new(self),
            right: Box::new(other),
        }
    }
}

/// Pixel grid requested when materializing an image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSpec {
    /// Area to sample.
    pub region: RegionOfInterest,
    /// Nominal pixel size in meters.
    pub scale_m: f64,
}

impl GridSpec {
    pub fn new(region: &RegionOfInterest, scale_m: f64) -> Self {
        Self {
            region: region.clone(),
            scale_m,
        }
    }
}

/// A map-tile layer registered with the remote service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub name: String,
    /// Tile URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub url_format: String,
    pub attribution: String,
    pub vis: VisParams,
}

/// The remote image catalog and processing service.
#[async_trait]
pub trait ImageCatalog: Send + Sync {
    /// Number of scenes in the collection. This is a remote round trip.
    async fn size(&self, collection: &CollectionHandle) -> Result<u64>;

    /// Evaluate the image and download its pixels.
    async fn materialize(&self, image: &ImageExpr, grid: &GridSpec) -> Result<Raster>;

    /// Register the image for tiled map display.
    async fn map_id(&self, image: &ImageExpr, name: &str, vis: &VisParams) -> Result<MapLayer>;
}

/// The remote timelapse rendering service.
#[async_trait]
pub trait TimelapseRenderer: Send + Sync {
    /// Render the requested animation into the file at `out`.
    async fn render(&self, request: &TimelapseRequest, out: &Path) -> Result<()>;
}
