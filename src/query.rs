//! Scene query and cloud-quality filtering.
//!
//! A query narrows a remote scene collection to the region, the date range and
//! scenes whose cloud percentage is strictly below a threshold. The only remote
//! round trip is the final size check. A query that matches nothing is not an
//! error: it yields [`QueryOutcome::Empty`], which callers must handle.

use serde::Serialize;
use tracing::{info, instrument};

use crate::catalog::{CollectionHandle, ImageCatalog};
use crate::error::{AnalysisError, Result};
use crate::model::DateRange;
use crate::region::RegionOfInterest;

/// Sentinel-2 surface reflectance, harmonized across processing baselines.
pub const SENTINEL2_SR: &str = "COPERNICUS/S2_SR_HARMONIZED";

/// Per-scene cloud percentage property of Sentinel-2 collections.
pub const SENTINEL2_CLOUD_PROPERTY: &str = "CLOUDY_PIXEL_PERCENTAGE";

/// Default maximum cloud percentage.
pub const DEFAULT_MAX_CLOUD_PCT: f64 = 20.0;

/// Scenes are kept when `property < max_pct`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudFilter {
    pub property: String,
    pub max_pct: f64,
}

impl CloudFilter {
    /// Filter on the given property, threshold in `(0, 100]`.
    pub fn new(property: &str, max_pct: f64) -> Result<Self> {
        if !(max_pct > 0.0 && max_pct <= 100.0) {
            return Err(AnalysisError::validation(format!(
                "cloud threshold must be in (0, 100], got {max_pct}"
            )));
        }
        Ok(Self {
            property: property.to_string(),
            max_pct,
        })
    }

    /// Sentinel-2 cloud filter with the given threshold.
    pub fn sentinel2(max_pct: f64) -> Result<Self> {
        Self::new(SENTINEL2_CLOUD_PROPERTY, max_pct)
    }
}

impl Default for CloudFilter {
    fn default() -> Self {
        Self {
            property: SENTINEL2_CLOUD_PROPERTY.to_string(),
            max_pct: DEFAULT_MAX_CLOUD_PCT,
        }
    }
}

/// Result of a scene query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// No scene matched the filters.
    Empty,
    /// At least one scene matched.
    Scenes {
        collection: CollectionHandle,
        count: u64,
    },
}

impl QueryOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, QueryOutcome::Empty)
    }

    pub fn count(&self) -> u64 {
        match self {
            QueryOutcome::Empty => 0,
            QueryOutcome::Scenes { count, .. } => *count,
        }
    }
}

/// A bounded, dated, cloud-filtered scene query.
#[derive(Debug, Clone)]
pub struct SceneQuery {
    pub collection_id: String,
    pub region: RegionOfInterest,
    pub range: DateRange,
    pub cloud: CloudFilter,
}

impl SceneQuery {
    /// Query a collection with the default cloud filter.
    pub fn new(collection_id: &str, region: &RegionOfInterest, range: DateRange) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            region: region.clone(),
            range,
            cloud: CloudFilter::default(),
        }
    }

    pub fn with_cloud_filter(mut self, cloud: CloudFilter) -> Self {
        self.cloud = cloud;
        self
    }

    /// The lazy filtered collection. Nothing is sent to the service.
    pub fn collection(&self) -> CollectionHandle {
        CollectionHandle::load(&self.collection_id)
            .filter_bounds(&self.region)
            .filter_date(&self.range)
            .filter_lt(&self.cloud.property, self.cloud.max_pct)
    }

    /// Run the size check against the catalog.
    #[instrument(
        skip_all,
        fields(
            collection = %self.collection_id,
            start = %self.range.start(),
            end = %self.range.end()
        )
    )]
    pub async fn run(&self, catalog: &dyn ImageCatalog) -> Result<QueryOutcome> {
        let collection = self.collection();
        let count = catalog.size(&collection).await?;

        info!(
            count,
            max_cloud_pct = self.cloud.max_pct,
            "Scene query evaluated"
        );

        if count == 0 {
            Ok(QueryOutcome::Empty)
        } else {
            Ok(QueryOutcome::Scenes { collection, count })
        }
    }
}

/// Query `collection_id` over `region` and `range` keeping scenes below `max_cloud_pct`.
pub async fn query(
    catalog: &dyn ImageCatalog,
    collection_id: &str,
    region: &RegionOfInterest,
    range: DateRange,
    max_cloud_pct: f64,
) -> Result<QueryOutcome> {
    let cloud = CloudFilter::sentinel2(max_cloud_pct)?;
    SceneQuery::new(collection_id, region, range)
        .with_cloud_filter(cloud)
        .run(catalog)
        .await
}
