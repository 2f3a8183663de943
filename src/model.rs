//! Data models shared by the burnscope pipelines and the HTTP layer.
//!
//! Request bodies are deserialized as plain values and only turned into the
//! validated types ([`DateRange`], [`TimeRange`], [`RegionOfInterest`]) inside
//! the handlers, so malformed input is always reported as a validation error
//! before anything is sent to the remote service.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::region::RegionOfInterest;

/// Format used for timelapse start/end labels, `YYYY-MM-DDTHH:mm`.
pub const TIME_LABEL_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// A half-open calendar date range `[start, end)`.
///
/// Construction fails unless `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a date range, rejecting empty or inverted ranges.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(AnalysisError::validation(format!(
                "end date {end} must be after start date {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// A half-open date-time range used by the timelapse, minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TimeRange {
    /// Create a time range, rejecting `end <= start`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start >= end {
            return Err(AnalysisError::validation(
                "end time must be after start time",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    /// Start formatted as `YYYY-MM-DDTHH:mm`.
    pub fn start_label(&self) -> String {
        self.start.format(TIME_LABEL_FORMAT).to_string()
    }

    /// End formatted as `YYYY-MM-DDTHH:mm`.
    pub fn end_label(&self) -> String {
        self.end.format(TIME_LABEL_FORMAT).to_string()
    }
}

/// Visualization parameters handed to the presentation layer and to the
/// remote map-tile service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    /// Bands to render; `None` renders the single band of the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bands: Option<Vec<String>>,
    pub min: f64,
    pub max: f64,
    /// Color ramp from `min` to `max`, as `#rrggbb` strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub palette: Vec<String>,
}

impl VisParams {
    /// Burn-severity ramp, clipped to [-0.1, 0.66].
    pub fn dnbr() -> Self {
        Self {
            bands: None,
            min: -0.1,
            max: 0.66,
            palette: [
                "#7a8737", "#acbe4d", "#0ae042", "#fff70b", "#ffaf38", "#ff641b", "#a41fd6",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }

    /// Diverging loss/gain ramp for change in an arbitrary normalized
    /// difference, clipped to [-0.5, 0.5].
    pub fn difference() -> Self {
        Self {
            bands: None,
            min: -0.5,
            max: 0.5,
            palette: ["#1a9641", "#a6d96a", "#ffffbf", "#fdae61", "#d7191c"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }

    /// True-color preview of a Sentinel-2 surface reflectance composite.
    pub fn true_color() -> Self {
        Self {
            bands: Some(vec!["B4".to_string(), "B3".to_string(), "B2".to_string()]),
            min: 0.0,
            max: 3000.0,
            palette: vec![],
        }
    }
}

/// Region as supplied by the operator, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RegionSpec {
    /// Point plus buffer radius in meters.
    Point {
        lat: f64,
        lon: f64,
        #[serde(default = "default_radius_m")]
        radius_m: f64,
    },
    /// Bounding box in degrees.
    Bounds {
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    },
}

fn default_radius_m() -> f64 {
    5000.0
}

impl RegionSpec {
    /// Validate and build the region.
    ///
    /// With `envelope` set, a buffered point is replaced by its bounding box,
    /// which is how burn-severity areas are analyzed by default.
    pub fn build(&self, envelope: bool) -> Result<RegionOfInterest> {
        match *self {
            RegionSpec::Point { lat, lon, radius_m } => {
                let region = RegionOfInterest::from_point(lat, lon, radius_m)?;
                Ok(if envelope { region.bounds() } else { region })
            }
            RegionSpec::Bounds {
                west,
                south,
                east,
                north,
            } => RegionOfInterest::from_bounds(west, south, east, north),
        }
    }
}

/// Request body for POST /severity.
#[derive(Debug, Clone, Deserialize)]
pub struct SeverityRequestBody {
    pub region: RegionSpec,

    /// Analyze the bounding box of a buffered point (default: true).
    #[serde(default = "default_true")]
    pub envelope: bool,

    pub pre_start: NaiveDate,
    pub pre_end: NaiveDate,
    pub post_start: NaiveDate,
    pub post_end: NaiveDate,

    /// Maximum per-scene cloud percentage; server default when absent.
    pub max_cloud_pct: Option<f64>,

    /// First band of the normalized difference; server default when absent.
    pub band_a: Option<String>,

    /// Second band of the normalized difference; server default when absent.
    pub band_b: Option<String>,

    /// Also download the index raster and summarize it by severity class.
    #[serde(default)]
    pub materialize: bool,

    /// Session that owns the run (default: "default").
    #[serde(default = "default_session")]
    pub session: String,
}

/// Request body for POST /timelapse.
#[derive(Debug, Clone, Deserialize)]
pub struct TimelapseRequestBody {
    /// Region to render; server default (South America) when absent.
    pub region: Option<RegionSpec>,

    pub start: NaiveDateTime,
    pub end: NaiveDateTime,

    /// Satellite name such as "GOES-19"; server default when absent.
    pub satellite: Option<String>,

    /// Scan sector: "full_disk", "conus" or "mesoscale".
    pub scan: Option<String>,

    pub cadence_secs: Option<u32>,
    pub frames_per_second: Option<u32>,
    pub dimensions: Option<u32>,

    #[serde(default = "default_session")]
    pub session: String,
}

/// Query parameters selecting a session.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(default = "default_session")]
    pub session: String,
}

/// Query parameters for GET /runs/recent.
#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    /// Maximum number of runs to return (default: 20).
    #[serde(default = "default_runs_limit")]
    pub limit: u32,
}

fn default_true() -> bool {
    true
}

fn default_session() -> String {
    "default".to_string()
}

fn default_runs_limit() -> u32 {
    20
}

/// The kind of analysis a run performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    BurnSeverity,
    Timelapse,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::BurnSeverity => "burn_severity",
            RunKind::Timelapse => "timelapse",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "burn_severity" => Some(RunKind::BurnSeverity),
            "timelapse" => Some(RunKind::Timelapse),
            _ => None,
        }
    }
}

/// One entry of the run history.
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    pub session: String,
    pub kind: RunKind,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// "success" or the [`AnalysisError::kind`] of the failure.
    pub outcome: String,

    /// Human-readable summary or error message.
    pub message: String,
}

/// Response for GET /runs/recent.
#[derive(Debug, Clone, Serialize)]
pub struct RunsResponse {
    pub runs: Vec<RunRecord>,
}

/// Error body returned by every handler.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl From<&AnalysisError> for ErrorResponse {
    fn from(e: &AnalysisError) -> Self {
        Self {
            error: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}
