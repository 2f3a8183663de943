//! Earth Engine REST client.
//!
//! Lazy collection and image expressions are encoded as Earth Engine
//! expression graphs and evaluated server-side.
//!
//! # Endpoints Used
//!
//! - `POST v1/projects/{project}/value:compute`: collection sizes and pixel samples
//! - `POST v1/projects/{project}/maps`: map-tile layers
//! - `POST v1/projects/{project}/videoThumbnails` and `GET v1/{name}:getPixels`: animations
//!
//! # API Reference
//!
//! See: <https://developers.google.com/earth-engine/reference/rest>
//!
//! # Authentication
//!
//! The client receives an OAuth access token that was obtained out-of-band
//! (interactive login or a service account). It never handles key material.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use super::{
    CollectionFilter, CollectionHandle, GridSpec, ImageCatalog, ImageExpr, MapLayer,
    TimelapseRenderer,
};
use crate::error::{AnalysisError, Result};
use crate::model::VisParams;
use crate::raster::{GeoTransform, NO_DATA, Raster};
use crate::region::RegionOfInterest;
use crate::timelapse::TimelapseRequest;

/// Base URL for the Earth Engine REST API.
const EE_API_BASE: &str = "https://earthengine.googleapis.com";

/// Value written by `sampleRectangle` for masked pixels.
const SAMPLE_NODATA: f64 = -9999.0;

/// Upper bound on pixels returned by one `sampleRectangle` call.
const MAX_SAMPLE_PIXELS: f64 = 262_144.0;

/// Meters per degree of latitude.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Fire temperature RGB: 3.9 um, 2.2 um and 1.6 um reflectance/brightness.
const FIRE_RGB_BANDS: [&str; 3] = ["CMI_C07", "CMI_C06", "CMI_C05"];
const FIRE_RGB_MIN: [f64; 3] = [273.0, 0.0, 0.0];
const FIRE_RGB_MAX: [f64; 3] = [333.0, 1.0, 0.75];

/// FDC `Mask` codes for detected fire pixels, all confidence classes.
const FIRE_MASK_MIN: i32 = 10;
const FIRE_MASK_MAX: i32 = 35;
const FIRE_PALETTE: [&str; 1] = ["ff0000"];

/// Client for the Earth Engine REST API.
#[derive(Clone)]
pub struct EarthEngineClient {
    client: reqwest::Client,
    base_url: String,
    project: String,
    access_token: String,
}

impl EarthEngineClient {
    /// Create a new client for `project`.
    ///
    /// # Arguments
    ///
    /// * `project` - Cloud project id that is billed for the requests.
    /// * `access_token` - OAuth access token with the Earth Engine scope.
    pub fn new(project: &str, access_token: &str) -> Self {
        Self::with_base_url(EE_API_BASE, project, access_token)
    }

    /// Create a client with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str, project: &str, access_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            project: project.to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn project_url(&self, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/{}",
            self.base_url,
            urlencoding::encode(&self.project),
            method
        )
    }

    /// POST a JSON body and decode the JSON response, mapping service errors.
    async fn post_json<T: for<'de> Deserialize<'de>>(&self, url: &str, body: &Value) -> Result<T> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Evaluate an expression graph and return its `result` value.
    async fn compute_value(&self, expression: Value) -> Result<Value> {
        let body = json!({ "expression": expression });
        let data: ComputeValueResponse = self
            .post_json(&self.project_url("value:compute"), &body)
            .await?;
        Ok(data.result)
    }
}

#[async_trait]
impl ImageCatalog for EarthEngineClient {
    #[instrument(skip_all, fields(collection = %collection.collection_id()))]
    async fn size(&self, collection: &CollectionHandle) -> Result<u64> {
        let mut graph = ExpressionGraph::default();
        let node = encode_collection(&mut graph, collection);
        let size = graph.invoke("Collection.size", vec![("collection", node)]);

        let result = self.compute_value(graph.finish(size)).await?;
        result
            .as_u64()
            .ok_or_else(|| AnalysisError::remote(format!("non-numeric collection size {result}")))
    }

    #[instrument(skip_all, fields(scale_m = grid.scale_m))]
    async fn materialize(&self, image: &ImageExpr, grid: &GridSpec) -> Result<Raster> {
        let [west, south, east, north] = grid.region.wsen();
        let mid_lat = ((south + north) / 2.0).to_radians();
        let est_cols = (east - west) * METERS_PER_DEGREE * mid_lat.cos() / grid.scale_m;
        let est_rows = (north - south) * METERS_PER_DEGREE / grid.scale_m;
        if est_cols * est_rows > MAX_SAMPLE_PIXELS {
            return Err(AnalysisError::validation(format!(
                "sampling {:.0} pixels exceeds the {MAX_SAMPLE_PIXELS} pixel limit; \
                 use a coarser scale",
                est_cols * est_rows
            )));
        }

        let mut graph = ExpressionGraph::default();
        let node = encode_image(&mut graph, image);
        let projection = graph.invoke(
            "Projection",
            vec![("crs", constant(json!("EPSG:4326")))],
        );
        let reprojected = graph.invoke(
            "Image.reproject",
            vec![
                ("image", node),
                ("crs", projection),
                ("scale", constant(json!(grid.scale_m))),
            ],
        );
        let region = encode_geometry(&mut graph, &grid.region);
        let sample = graph.invoke(
            "Image.sampleRectangle",
            vec![
                ("image", reprojected),
                ("region", region),
                ("defaultValue", constant(json!(SAMPLE_NODATA))),
            ],
        );

        let result = self.compute_value(graph.finish(sample)).await?;
        let feature: SampledFeature = serde_json::from_value(result)?;
        feature.into_raster(grid.region.wsen())
    }

    #[instrument(skip_all, fields(layer = name))]
    async fn map_id(&self, image: &ImageExpr, name: &str, vis: &VisParams) -> Result<MapLayer> {
        let mut graph = ExpressionGraph::default();
        let mut node = encode_image(&mut graph, image);
        if let Some(bands) = &vis.bands {
            node = graph.invoke(
                "Image.select",
                vec![("input", node), ("bandSelectors", constant(json!(bands)))],
            );
        }

        let mut options = json!({ "ranges": [{ "min": vis.min, "max": vis.max }] });
        if !vis.palette.is_empty() {
            let colors: Vec<&str> = vis.palette.iter().map(|c| c.trim_start_matches('#')).collect();
            options["paletteColors"] = json!(colors);
        }

        let body = json!({
            "expression": graph.finish(node),
            "fileFormat": "PNG",
            "visualizationOptions": options,
        });
        let created: NamedResource = self.post_json(&self.project_url("maps"), &body).await?;

        info!(map = %created.name, "Map layer registered");

        Ok(MapLayer {
            name: name.to_string(),
            url_format: format!("{}/v1/{}/tiles/{{z}}/{{x}}/{{y}}", self.base_url, created.name),
            attribution: "Google Earth Engine".to_string(),
            vis: vis.clone(),
        })
    }
}

#[async_trait]
impl TimelapseRenderer for EarthEngineClient {
    #[instrument(
        skip_all,
        fields(source = %request.imagery_collection, frames = request.frame_count)
    )]
    async fn render(&self, request: &TimelapseRequest, out: &Path) -> Result<()> {
        let mut graph = ExpressionGraph::default();
        let frames = encode_timelapse_frames(&mut graph, request);

        let [west, south, east, north] = request.region.wsen();
        let aspect = (east - west) / (north - south);
        let (width, height) = if aspect >= 1.0 {
            (request.dimensions, ((request.dimensions as f64 / aspect).round() as u32).max(1))
        } else {
            (((request.dimensions as f64 * aspect).round() as u32).max(1), request.dimensions)
        };

        debug!(
            date_format = %request.date_format,
            "Frame labels are not drawn by the remote renderer"
        );

        let body = json!({
            "expression": graph.finish(frames),
            "fileFormat": "GIF",
            "videoOptions": { "framesPerSecond": request.frames_per_second },
            "grid": { "dimensions": { "width": width, "height": height } },
        });
        let created: NamedResource = self
            .post_json(&self.project_url("videoThumbnails"), &body)
            .await?;

        let url = format!("{}/v1/{}:getPixels", self.base_url, created.name);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let bytes = check_status(response).await?.bytes().await?;
        tokio::fs::write(out, &bytes).await?;

        info!(bytes = bytes.len(), "Animation downloaded");
        Ok(())
    }
}

/// Turn non-success responses into [`AnalysisError::RemoteService`] with the
/// service's own message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&text)
        .map(|e| e.error.message)
        .unwrap_or(text);
    Err(AnalysisError::RemoteService {
        status: Some(status.as_u16()),
        message,
    })
}

// ============================================================================
// Expression encoding
// ============================================================================

/// Builder for an expression graph: `{"values": {...}, "result": key}`.
#[derive(Default)]
struct ExpressionGraph {
    values: Map<String, Value>,
}

impl ExpressionGraph {
    /// Add a node and return a reference to it.
    fn push(&mut self, node: Value) -> Value {
        let key = self.values.len().to_string();
        self.values.insert(key.clone(), node);
        json!({ "valueReference": key })
    }

    /// Add a function invocation node.
    fn invoke(&mut self, function: &str, arguments: Vec<(&str, Value)>) -> Value {
        let arguments: Map<String, Value> = arguments
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        self.push(json!({
            "functionInvocationValue": {
                "functionName": function,
                "arguments": arguments,
            }
        }))
    }

    fn finish(self, result: Value) -> Value {
        let key = result["valueReference"].clone();
        json!({ "values": self.values, "result": key })
    }
}

fn constant(value: Value) -> Value {
    json!({ "constantValue": value })
}

fn encode_geometry(graph: &mut ExpressionGraph, region: &RegionOfInterest) -> Value {
    graph.invoke(
        "GeometryConstructors.Polygon",
        vec![
            ("coordinates", constant(json!([region.exterior()]))),
            ("geodesic", constant(json!(false))),
        ],
    )
}

fn encode_date_range(graph: &mut ExpressionGraph, start: String, end: String) -> Value {
    graph.invoke(
        "DateRange",
        vec![("start", constant(json!(start))), ("end", constant(json!(end)))],
    )
}

fn encode_collection(graph: &mut ExpressionGraph, collection: &CollectionHandle) -> Value {
    let mut node = graph.invoke(
        "ImageCollection.load",
        vec![("id", constant(json!(collection.collection_id())))],
    );

    for filter in collection.filters() {
        let filter = match filter {
            CollectionFilter::Bounds { region } => {
                let geometry = encode_geometry(graph, region);
                graph.invoke(
                    "Filter.intersects",
                    vec![
                        ("leftField", constant(json!(".all"))),
                        ("rightValue", geometry),
                    ],
                )
            }
            CollectionFilter::Date { start, end } => {
                let range = encode_date_range(graph, start.to_string(), end.to_string());
                graph.invoke(
                    "Filter.dateRangeContains",
                    vec![
                        ("leftValue", range),
                        ("rightField", constant(json!("system:time_start"))),
                    ],
                )
            }
            CollectionFilter::LessThan { property, value } => graph.invoke(
                "Filter.lessThan",
                vec![
                    ("leftField", constant(json!(property))),
                    ("rightValue", constant(json!(value))),
                ],
            ),
        };
        node = graph.invoke(
            "Collection.filter",
            vec![("collection", node), ("filter", filter)],
        );
    }
    node
}

fn encode_image(graph: &mut ExpressionGraph, image: &ImageExpr) -> Value {
    match image {
        ImageExpr::Median(collection) => {
            let collection = encode_collection(graph, collection);
            graph.invoke("reduce.median", vec![("collection", collection)])
        }
        ImageExpr::Clip { image, region } => {
            let input = encode_image(graph, image);
            let geometry = encode_geometry(graph, region);
            graph.invoke("Image.clip", vec![("input", input), ("geometry", geometry)])
        }
        ImageExpr::NormalizedDifference {
            image,
            band_a,
            band_b,
        } => {
            let input = encode_image(graph, image);
            graph.invoke(
                "Image.normalizedDifference",
                vec![
                    ("input", input),
                    ("bandNames", constant(json!([band_a, band_b]))),
                ],
            )
        }
        ImageExpr::Subtract { left, right } => {
            let image1 = encode_image(graph, left);
            let image2 = encode_image(graph, right);
            graph.invoke(
                "Image.subtract",
                vec![("image1", image1), ("image2", image2)],
            )
        }
    }
}

/// Visualized GOES frames: filter by time and region, keep every
/// `frame_step`-th scan, render fire temperature RGB with the fire detections
/// of the same scan blended on top, clipped to the region.
fn encode_timelapse_frames(graph: &mut ExpressionGraph, request: &TimelapseRequest) -> Value {
    let mut node = graph.invoke(
        "ImageCollection.load",
        vec![("id", constant(json!(request.imagery_collection)))],
    );

    let range = encode_date_range(graph, request.start.clone(), request.end.clone());
    node = filter_time_window(graph, node, range.clone());

    if request.frame_step > 1 {
        let scans = request.frame_count * request.frame_step;
        let list = graph.invoke(
            "Collection.toList",
            vec![("collection", node), ("count", constant(json!(scans)))],
        );
        let sliced = graph.invoke(
            "List.slice",
            vec![
                ("list", list),
                ("start", constant(json!(0))),
                ("end", constant(json!(scans))),
                ("step", constant(json!(request.frame_step))),
            ],
        );
        node = graph.invoke("ImageCollection.fromImages", vec![("images", sliced)]);
    }

    let fire = graph.invoke(
        "ImageCollection.load",
        vec![("id", constant(json!(request.fire_collection)))],
    );
    let fire = filter_time_window(graph, fire, range);

    let frame = json!({ "argumentReference": "_MAPPING_VAR_0_0" });
    let geometry = encode_geometry(graph, &request.region);
    let visualized = graph.invoke(
        "Image.visualize",
        vec![
            ("image", frame.clone()),
            ("bands", constant(json!(FIRE_RGB_BANDS))),
            ("min", constant(json!(FIRE_RGB_MIN))),
            ("max", constant(json!(FIRE_RGB_MAX))),
        ],
    );
    let detections = encode_fire_detections(graph, fire, frame);
    let blended = graph.invoke(
        "Image.blend",
        vec![("bottom", visualized), ("top", detections)],
    );
    let clipped = graph.invoke(
        "Image.clip",
        vec![("input", blended), ("geometry", geometry)],
    );
    let body = clipped["valueReference"].clone();
    let mapper = graph.push(json!({
        "functionDefinitionValue": {
            "argumentNames": ["_MAPPING_VAR_0_0"],
            "body": body,
        }
    }));

    graph.invoke(
        "Collection.map",
        vec![("collection", node), ("baseAlgorithm", mapper)],
    )
}

fn filter_time_window(graph: &mut ExpressionGraph, collection: Value, range: Value) -> Value {
    let by_date = graph.invoke(
        "Filter.dateRangeContains",
        vec![
            ("leftValue", range),
            ("rightField", constant(json!("system:time_start"))),
        ],
    );
    graph.invoke(
        "Collection.filter",
        vec![("collection", collection), ("filter", by_date)],
    )
}

/// Red fire pixels from the FDC scan taken at the same time as `frame`.
///
/// Mosaicking the matching scans yields a fully masked image when the
/// fire product has no scan for that time, so the frame still renders.
fn encode_fire_detections(graph: &mut ExpressionGraph, fire: Value, frame: Value) -> Value {
    let time = graph.invoke(
        "Element.get",
        vec![("object", frame), ("property", constant(json!("system:time_start")))],
    );
    let same_scan = graph.invoke(
        "Filter.equals",
        vec![
            ("leftField", constant(json!("system:time_start"))),
            ("rightValue", time),
        ],
    );
    let matching = graph.invoke(
        "Collection.filter",
        vec![("collection", fire), ("filter", same_scan)],
    );
    let scan = graph.invoke("ImageCollection.mosaic", vec![("collection", matching)]);
    let mask = graph.invoke(
        "Image.select",
        vec![("input", scan), ("bandSelectors", constant(json!(["Mask"])))],
    );

    let low = graph.invoke("Image.constant", vec![("value", constant(json!(FIRE_MASK_MIN)))]);
    let high = graph.invoke("Image.constant", vec![("value", constant(json!(FIRE_MASK_MAX)))]);
    let above = graph.invoke(
        "Image.gte",
        vec![("image1", mask.clone()), ("image2", low)],
    );
    let below = graph.invoke("Image.lte", vec![("image1", mask), ("image2", high)]);
    let burning = graph.invoke("Image.and", vec![("image1", above), ("image2", below)]);
    let burning = graph.invoke("Image.selfMask", vec![("image", burning)]);

    graph.invoke(
        "Image.visualize",
        vec![
            ("image", burning),
            ("palette", constant(json!(FIRE_PALETTE))),
        ],
    )
}

// ============================================================================
// Response types
// ============================================================================

/// Response from `value:compute`.
#[derive(Debug, Deserialize)]
struct ComputeValueResponse {
    #[serde(default)]
    result: Value,
}

/// A created server-side resource (map, video thumbnail).
#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
}

/// Error envelope of Google APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Feature returned by `Image.sampleRectangle`: one 2-D array per band.
#[derive(Debug, Deserialize)]
struct SampledFeature {
    #[serde(default)]
    properties: Map<String, Value>,
}

impl SampledFeature {
    fn into_raster(self, wsen: [f64; 4]) -> Result<Raster> {
        let mut bands: Vec<(String, Vec<Vec<f64>>)> = Vec::new();
        for (name, value) in self.properties {
            // non-array properties are image metadata
            if let Ok(rows) = serde_json::from_value::<Vec<Vec<f64>>>(value) {
                bands.push((name, rows));
            }
        }

        let (rows, cols) = bands
            .first()
            .map(|(_, r)| (r.len(), r.first().map(Vec::len).unwrap_or(0)))
            .ok_or_else(|| AnalysisError::remote("sample contained no bands"))?;

        let mut raster = Raster::new(rows, cols, GeoTransform::covering(wsen, rows, cols));
        for (name, data) in bands {
            let flat: Vec<f64> = data
                .into_iter()
                .flatten()
                .map(|v| if v == SAMPLE_NODATA { NO_DATA } else { v })
                .collect();
            raster = raster
                .with_band(&name, flat)
                .map_err(|e| AnalysisError::remote(format!("ragged sample: {e}")))?;
        }
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DateRange;
    use chrono::NaiveDate;

    fn region() -> RegionOfInterest {
        RegionOfInterest::from_bounds(-48.0, -16.0, -47.5, -15.5).unwrap()
    }

    fn functions(expression: &Value) -> Vec<String> {
        let mut names: Vec<String> = expression["values"]
            .as_object()
            .unwrap()
            .values()
            .filter_map(|v| v["functionInvocationValue"]["functionName"].as_str())
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_collection_encoding() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
        )
        .unwrap();
        let collection = CollectionHandle::load("COPERNICUS/S2_SR_HARMONIZED")
            .filter_bounds(&region())
            .filter_date(&range)
            .filter_lt("CLOUDY_PIXEL_PERCENTAGE", 20.0);

        let mut graph = ExpressionGraph::default();
        let node = encode_collection(&mut graph, &collection);
        let size = graph.invoke("Collection.size", vec![("collection", node)]);
        let expression = graph.finish(size);

        let names = functions(&expression);
        assert_eq!(names.iter().filter(|n| *n == "Collection.filter").count(), 3);
        assert!(names.contains(&"Filter.lessThan".to_string()));
        assert!(names.contains(&"Filter.dateRangeContains".to_string()));
        assert!(names.contains(&"Filter.intersects".to_string()));

        let result = expression["result"].as_str().unwrap();
        assert_eq!(
            expression["values"][result]["functionInvocationValue"]["functionName"],
            "Collection.size"
        );
    }

    #[test]
    fn test_severity_encoding() {
        let composite = CollectionHandle::load("S2").median().clip(&region());
        let index = composite
            .clone()
            .normalized_difference("B8", "B12")
            .subtract(composite.normalized_difference("B8", "B12"));

        let mut graph = ExpressionGraph::default();
        let node = encode_image(&mut graph, &index);
        let expression = graph.finish(node);

        let names = functions(&expression);
        assert_eq!(names.iter().filter(|n| *n == "reduce.median").count(), 2);
        assert_eq!(names.iter().filter(|n| *n == "Image.normalizedDifference").count(), 2);
        assert!(names.contains(&"Image.subtract".to_string()));
    }

    #[test]
    fn test_sampled_feature_to_raster() {
        let feature: SampledFeature = serde_json::from_value(json!({
            "type": "Feature",
            "properties": {
                "nd": [[0.5, -9999.0], [0.25, 0.0]],
                "system:index": "abc"
            }
        }))
        .unwrap();

        let raster = feature.into_raster([0.0, 0.0, 2.0, 2.0]).unwrap();
        assert_eq!(raster.shape(), (2, 2));
        let nd = raster.band("nd").unwrap();
        assert_eq!(nd[0], 0.5);
        assert!(nd[1].is_nan());
        assert_eq!(raster.band_names(), vec!["nd"]);
    }

    fn timelapse_request() -> TimelapseRequest {
        TimelapseRequest {
            region: region(),
            start: "2024-09-10T00:00".to_string(),
            end: "2024-09-10T02:00".to_string(),
            source: Default::default(),
            imagery_collection: "NOAA/GOES/19/MCMIPF".to_string(),
            fire_collection: "NOAA/GOES/19/FDCF".to_string(),
            cadence_secs: 1200,
            frame_step: 2,
            frame_count: 7,
            dimensions: 600,
            frames_per_second: 6,
            date_format: "YYYY-MM-dd HH:mm".to_string(),
        }
    }

    #[test]
    fn test_timelapse_frames_keep_every_nth_scan() {
        let request = timelapse_request();

        let mut graph = ExpressionGraph::default();
        let node = encode_timelapse_frames(&mut graph, &request);
        let expression = graph.finish(node);

        let names = functions(&expression);
        assert!(names.contains(&"List.slice".to_string()));
        assert!(names.contains(&"Image.visualize".to_string()));
        let result = expression["result"].as_str().unwrap();
        assert_eq!(
            expression["values"][result]["functionInvocationValue"]["functionName"],
            "Collection.map"
        );
    }

    #[test]
    fn test_timelapse_frames_overlay_fire_detections() {
        let request = timelapse_request();

        let mut graph = ExpressionGraph::default();
        let node = encode_timelapse_frames(&mut graph, &request);
        let expression = graph.finish(node);

        let loaded: Vec<&str> = expression["values"]
            .as_object()
            .unwrap()
            .values()
            .filter(|v| v["functionInvocationValue"]["functionName"] == "ImageCollection.load")
            .filter_map(|v| {
                v["functionInvocationValue"]["arguments"]["id"]["constantValue"].as_str()
            })
            .collect();
        assert!(loaded.contains(&"NOAA/GOES/19/MCMIPF"));
        assert!(loaded.contains(&"NOAA/GOES/19/FDCF"));

        let names = functions(&expression);
        assert!(names.contains(&"Image.blend".to_string()));
        assert!(names.contains(&"Image.selfMask".to_string()));
        assert!(names.contains(&"Filter.equals".to_string()));
        assert_eq!(names.iter().filter(|n| *n == "Image.visualize").count(), 2);
        assert_eq!(names.iter().filter(|n| *n == "Filter.dateRangeContains").count(), 2);
    }
}
