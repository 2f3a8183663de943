//! End-to-end burn-severity analysis.
//!
//! Queries pre- and post-event Sentinel-2 collections, reduces each to a
//! clipped median composite, and derives the severity index. A period without
//! qualifying scenes ends the run with [`AnalysisError::EmptyResult`] before
//! any reduction is requested.

use serde::Serialize;
use tracing::{info, instrument};

use crate::catalog::{GridSpec, ImageCatalog, MapLayer};
use crate::composite::{Composite, composite};
use crate::error::{AnalysisError, Result};
use crate::model::{DateRange, VisParams};
use crate::query::{CloudFilter, SENTINEL2_SR, SceneQuery};
use crate::raster::Raster;
use crate::region::RegionOfInterest;
use crate::severity::{BandPair, SeverityIndex, SeveritySummary, severity_index};

/// Pixel size used when materializing the index, in meters.
pub const DEFAULT_SCALE_M: f64 = 20.0;

/// Everything needed for one burn-severity run.
#[derive(Debug, Clone)]
pub struct BurnSeverityRequest {
    pub region: RegionOfInterest,
    pub pre: DateRange,
    pub post: DateRange,
    pub collection_id: String,
    pub cloud: CloudFilter,
    pub bands: BandPair,
    /// Materialize the index on this grid and summarize it.
    pub materialize: Option<GridSpec>,
}

impl BurnSeverityRequest {
    /// Sentinel-2 request with default cloud filter and band pair.
    pub fn new(region: RegionOfInterest, pre: DateRange, post: DateRange) -> Self {
        Self {
            region,
            pre,
            post,
            collection_id: SENTINEL2_SR.to_string(),
            cloud: CloudFilter::default(),
            bands: BandPair::default(),
            materialize: None,
        }
    }
}

/// Products of a burn-severity run, ready for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct BurnSeverityProduct {
    pub region: RegionOfInterest,
    pub pre: Composite,
    pub post: Composite,
    pub index: SeverityIndex,
    /// Pre-event, post-event and severity layers, in display order.
    pub layers: Vec<MapLayer>,
    #[serde(skip)]
    pub raster: Option<Raster>,
    pub summary: Option<SeveritySummary>,
}

/// Run the burn-severity pipeline.
#[instrument(skip_all, fields(pre = %request.pre.start(), post = %request.post.start()))]
pub async fn run_burn_severity(
    catalog: &dyn ImageCatalog,
    request: &BurnSeverityRequest,
) -> Result<BurnSeverityProduct> {
    let pre = composite_period(catalog, request, request.pre, "pre-fire").await?;
    let post = composite_period(catalog, request, request.post, "post-fire").await?;

    let index = severity_index(&pre, &post, &request.bands);

    let layers = vec![
        catalog
            .map_id(&pre.image, "Pre-fire image", &VisParams::true_color())
            .await?,
        catalog
            .map_id(&post.image, "Post-fire image", &VisParams::true_color())
            .await?,
        catalog
            .map_id(&index.image, &index.layer_name(), &index.vis)
            .await?,
    ];

    let (raster, summary) = match &request.materialize {
        Some(grid) => {
            let raster = catalog.materialize(&index.image, grid).await?;
            let summary = SeveritySummary::from_raster(&raster)?;
            (Some(raster), Some(summary))
        }
        None => (None, None),
    };

    info!(
        pre_scenes = pre.scene_count,
        post_scenes = post.scene_count,
        bands = %format!("{}/{}", request.bands.a, request.bands.b),
        "Burn severity computed"
    );

    Ok(BurnSeverityProduct {
        region: request.region.clone(),
        pre,
        post,
        index,
        layers,
        raster,
        summary,
    })
}

async fn composite_period(
    catalog: &dyn ImageCatalog,
    request: &BurnSeverityRequest,
    range: DateRange,
    period: &str,
) -> Result<Composite> {
    let outcome = SceneQuery::new(&request.collection_id, &request.region, range)
        .with_cloud_filter(request.cloud.clone())
        .run(catalog)
        .await?;

    composite(outcome, &request.region)
        .into_option()
        .ok_or_else(|| AnalysisError::EmptyResult {
            period: period.to_string(),
        })
}
