//! In-memory image catalog.
//!
//! Holds scenes as materialized rasters and evaluates the same lazy
//! expressions the remote service would. Used for offline runs over
//! pre-downloaded scenes and as the collaborator in tests.
//!
//! Images are evaluated on the native grid of the stored scenes; the grid
//! requested in [`ImageCatalog::materialize`] only selects the region.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use geo::Intersects;

use super::{CollectionFilter, CollectionHandle, GridSpec, ImageCatalog, ImageExpr, MapLayer};
use crate::error::{AnalysisError, Result};
use crate::model::VisParams;
use crate::raster::Raster;
use crate::region::RegionOfInterest;
use crate::severity::{BandPair, normalized_difference_raster};

/// A stored scene with its metadata.
#[derive(Debug, Clone)]
pub struct LocalScene {
    pub date: NaiveDate,
    pub footprint: RegionOfInterest,
    pub properties: HashMap<String, f64>,
    pub raster: Raster,
}

impl LocalScene {
    pub fn new(date: NaiveDate, footprint: RegionOfInterest, raster: Raster) -> Self {
        Self {
            date,
            footprint,
            properties: HashMap::new(),
            raster,
        }
    }

    pub fn with_property(mut self, name: &str, value: f64) -> Self {
        self.properties.insert(name.to_string(), value);
        self
    }

    fn matches(&self, filter: &CollectionFilter) -> bool {
        match filter {
            CollectionFilter::Bounds { region } => {
                self.footprint.polygon().intersects(region.polygon())
            }
            CollectionFilter::Date { start, end } => *start <= self.date && self.date < *end,
            // scenes missing the property never pass a comparison
            CollectionFilter::LessThan { property, value } => self
                .properties
                .get(property)
                .is_some_and(|v| v < value),
        }
    }
}

/// Scene collections keyed by collection id.
#[derive(Debug, Default)]
pub struct LocalCatalog {
    collections: HashMap<String, Vec<LocalScene>>,
    size_calls: AtomicUsize,
    materialize_calls: AtomicUsize,
}

impl LocalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scene to a collection.
    pub fn insert(&mut self, collection_id: &str, scene: LocalScene) {
        self.collections
            .entry(collection_id.to_string())
            .or_default()
            .push(scene);
    }

    /// Number of `size` round trips served so far.
    pub fn size_calls(&self) -> usize {
        self.size_calls.load(Ordering::Relaxed)
    }

    /// Number of `materialize` round trips served so far.
    pub fn materialize_calls(&self) -> usize {
        self.materialize_calls.load(Ordering::Relaxed)
    }

    fn scenes(&self, collection: &CollectionHandle) -> Vec<&LocalScene> {
        self.collections
            .get(collection.collection_id())
            .map(|scenes| {
                scenes
                    .iter()
                    .filter(|s| collection.filters().iter().all(|f| s.matches(f)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Evaluate an expression on the stored scenes.
    pub fn evaluate(&self, image: &ImageExpr) -> Result<Raster> {
        match image {
            ImageExpr::Median(collection) => {
                let rasters: Vec<Raster> = self
                    .scenes(collection)
                    .into_iter()
                    .map(|s| s.raster.clone())
                    .collect();
                if rasters.is_empty() {
                    return Err(AnalysisError::remote(format!(
                        "collection {} is empty",
                        collection.collection_id()
                    )));
                }
                Raster::median(&rasters)
            }
            ImageExpr::Clip { image, region } => Ok(self.evaluate(image)?.clip(region)),
            ImageExpr::NormalizedDifference {
                image,
                band_a,
                band_b,
            } => {
                let bands = BandPair {
                    a: band_a.clone(),
                    b: band_b.clone(),
                };
                normalized_difference_raster(&self.evaluate(image)?, &bands)
            }
            ImageExpr::Subtract { left, right } => {
                let name = "difference";
                self.evaluate(left)?
                    .zip_first(&self.evaluate(right)?, name, |a, b| a - b)
            }
        }
    }
}

#[async_trait]
impl ImageCatalog for LocalCatalog {
    async fn size(&self, collection: &CollectionHandle) -> Result<u64> {
        self.size_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.scenes(collection).len() as u64)
    }

    async fn materialize(&self, image: &ImageExpr, grid: &GridSpec) -> Result<Raster> {
        self.materialize_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self.evaluate(image)?.clip(&grid.region))
    }

    async fn map_id(&self, _image: &ImageExpr, name: &str, vis: &VisParams) -> Result<MapLayer> {
        Ok(MapLayer {
            name: name.to_string(),
            url_format: format!("local://{}/{{z}}/{{x}}/{{y}}", urlencoding::encode(name)),
            attribution: "local scenes".to_string(),
            vis: vis.clone(),
        })
    }
}
