//! GOES fire timelapse assembly.
//!
//! Frame generation and encoding are delegated to a remote renderer. This
//! module validates the request, resolves the data source to collection ids,
//! owns the temporary output file while the renderer writes it, and hands the
//! finished animation to the session. A failed render never leaves its
//! temporary file behind.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::catalog::TimelapseRenderer;
use crate::error::{AnalysisError, Result};
use crate::model::TimeRange;
use crate::region::RegionOfInterest;
use crate::session::{Artifact, ArtifactKind, SessionRegistry};

/// Default animation size in pixels (longest side).
pub const DEFAULT_DIMENSIONS: u32 = 600;

/// Default playback rate.
pub const DEFAULT_FRAMES_PER_SECOND: u32 = 6;

/// Date label drawn on each frame (service-side pattern syntax).
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-dd HH:mm";

const MAX_DIMENSIONS: u32 = 2048;
const MAX_FRAMES_PER_SECOND: u32 = 30;
const MAX_FRAMES: i64 = 1000;

/// South America, the default timelapse area.
pub const SOUTH_AMERICA_WSEN: [f64; 4] = [-85.0, -56.0, -34.0, 13.0];

/// GOES-R series satellite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoesSatellite {
    #[serde(rename = "GOES-16")]
    Goes16,
    #[serde(rename = "GOES-17")]
    Goes17,
    #[serde(rename = "GOES-18")]
    Goes18,
    #[serde(rename = "GOES-19")]
    Goes19,
}

impl GoesSatellite {
    pub fn number(&self) -> u8 {
        match self {
            GoesSatellite::Goes16 => 16,
            GoesSatellite::Goes17 => 17,
            GoesSatellite::Goes18 => 18,
            GoesSatellite::Goes19 => 19,
        }
    }

    /// Parse "GOES-19", "goes19" or "19".
    pub fn parse(s: &str) -> Result<Self> {
        let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
        match digits.as_str() {
            "16" => Ok(GoesSatellite::Goes16),
            "17" => Ok(GoesSatellite::Goes17),
            "18" => Ok(GoesSatellite::Goes18),
            "19" => Ok(GoesSatellite::Goes19),
            _ => Err(AnalysisError::validation(format!(
                "unknown GOES satellite {s:?}"
            ))),
        }
    }
}

impl fmt::Display for GoesSatellite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GOES-{}", self.number())
    }
}

/// ABI scan sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoesScan {
    FullDisk,
    Conus,
    Mesoscale,
}

impl GoesScan {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "full_disk" | "full-disk" | "fulldisk" => Ok(GoesScan::FullDisk),
            "conus" => Ok(GoesScan::Conus),
            "mesoscale" | "meso" => Ok(GoesScan::Mesoscale),
            _ => Err(AnalysisError::validation(format!("unknown scan {s:?}"))),
        }
    }

    /// Collection id suffix letter.
    fn suffix(&self) -> char {
        match self {
            GoesScan::FullDisk => 'F',
            GoesScan::Conus => 'C',
            GoesScan::Mesoscale => 'M',
        }
    }

    /// Nominal repeat interval of the sector in seconds.
    pub fn scan_interval_secs(&self) -> u32 {
        match self {
            GoesScan::FullDisk => 600,
            GoesScan::Conus => 300,
            GoesScan::Mesoscale => 60,
        }
    }
}

/// Data source of a timelapse: satellite plus scan sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoesSource {
    pub satellite: GoesSatellite,
    pub scan: GoesScan,
}

impl GoesSource {
    /// Cloud and moisture imagery collection, e.g. `NOAA/GOES/19/MCMIPF`.
    pub fn imagery_collection(&self) -> String {
        format!(
            "NOAA/GOES/{}/MCMIP{}",
            self.satellite.number(),
            self.scan.suffix()
        )
    }

    /// Fire detection collection, e.g. `NOAA/GOES/19/FDCF`.
    pub fn fire_collection(&self) -> String {
        format!("NOAA/GOES/{}/FDC{}", self.satellite.number(), self.scan.suffix())
    }
}

impl Default for GoesSource {
    fn default() -> Self {
        Self {
            satellite: GoesSatellite::Goes19,
            scan: GoesScan::FullDisk,
        }
    }
}

/// Operator-facing timelapse parameters.
#[derive(Debug, Clone)]
pub struct TimelapseParams {
    pub region: RegionOfInterest,
    pub range: TimeRange,
    pub source: GoesSource,
    /// Seconds between consecutive frames.
    pub cadence_secs: u32,
    pub frames_per_second: u32,
    /// Longest side of the animation in pixels.
    pub dimensions: u32,
}

/// Request sent to the remote renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelapseRequest {
    pub region: RegionOfInterest,
    /// `YYYY-MM-DDTHH:mm`
    pub start: String,
    /// `YYYY-MM-DDTHH:mm`
    pub end: String,
    pub source: GoesSource,
    pub imagery_collection: String,
    pub fire_collection: String,
    pub cadence_secs: u32,
    /// Keep every n-th scan to honor the cadence.
    pub frame_step: u32,
    pub frame_count: u32,
    pub dimensions: u32,
    pub frames_per_second: u32,
    pub date_format: String,
}

/// A finished animation held by a session.
#[derive(Debug, Clone, Serialize)]
pub struct TimelapseAnimation {
    pub path: PathBuf,
    pub download_name: String,
    pub frames_per_second: u32,
    pub frame_count: u32,
    pub created_at: DateTime<Utc>,
    pub request: TimelapseRequest,
}

impl TimelapseParams {
    /// Default parameters over South America for the given time range.
    pub fn new(range: TimeRange) -> Result<Self> {
        let [w, s, e, n] = SOUTH_AMERICA_WSEN;
        Ok(Self {
            region: RegionOfInterest::from_bounds(w, s, e, n)?,
            range,
            source: GoesSource::default(),
            cadence_secs: GoesScan::FullDisk.scan_interval_secs(),
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            dimensions: DEFAULT_DIMENSIONS,
        })
    }

    /// Validate the parameters and build the renderer request.
    pub fn to_request(&self) -> Result<TimelapseRequest> {
        if !(1..=MAX_FRAMES_PER_SECOND).contains(&self.frames_per_second) {
            return Err(AnalysisError::validation(format!(
                "frames per second must be in 1..={MAX_FRAMES_PER_SECOND}, got {}",
                self.frames_per_second
            )));
        }
        if !(1..=MAX_DIMENSIONS).contains(&self.dimensions) {
            return Err(AnalysisError::validation(format!(
                "dimensions must be in 1..={MAX_DIMENSIONS}, got {}",
                self.dimensions
            )));
        }

        let interval = self.source.scan.scan_interval_secs();
        if self.cadence_secs < interval || self.cadence_secs % interval != 0 {
            return Err(AnalysisError::validation(format!(
                "cadence must be a multiple of the {interval} s scan interval, got {}",
                self.cadence_secs
            )));
        }

        let frames = self.range.duration_seconds() / i64::from(self.cadence_secs) + 1;
        if frames > MAX_FRAMES {
            return Err(AnalysisError::validation(format!(
                "{frames} frames requested, at most {MAX_FRAMES} allowed"
            )));
        }

        Ok(TimelapseRequest {
            region: self.region.clone(),
            start: self.range.start_label(),
            end: self.range.end_label(),
            source: self.source,
            imagery_collection: self.source.imagery_collection(),
            fire_collection: self.source.fire_collection(),
            cadence_secs: self.cadence_secs,
            frame_step: self.cadence_secs / interval,
            frame_count: frames as u32,
            dimensions: self.dimensions,
            frames_per_second: self.frames_per_second,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        })
    }
}

/// Render a timelapse into a fresh temporary file.
///
/// The returned artifact owns the file. If the renderer fails, the file is
/// removed before the error is returned.
#[instrument(
    skip_all,
    fields(start = %params.range.start_label(), end = %params.range.end_label())
)]
async fn render_timelapse(
    renderer: &dyn TimelapseRenderer,
    params: &TimelapseParams,
) -> Result<(Artifact, TimelapseAnimation)> {
    let request = params.to_request()?;

    let path = tempfile::Builder::new()
        .prefix("goes_fire_")
        .suffix(".gif")
        .tempfile()?
        .into_temp_path();

    if let Err(e) = renderer.render(&request, &path).await {
        let aborted = path.to_path_buf();
        if let Err(cleanup) = path.close() {
            let cleanup = AnalysisError::ResourceCleanup {
                path: aborted,
                source: cleanup,
            };
            warn!(error = %cleanup, "Failed to remove aborted timelapse");
        }
        warn!(error = %e, "Timelapse rendering failed");
        return Err(e);
    }

    let size = tokio::fs::metadata(&path).await?.len();
    if size == 0 {
        if let Err(cleanup) = path.close() {
            warn!(error = %cleanup, "Failed to remove empty timelapse");
        }
        return Err(AnalysisError::remote("renderer produced an empty animation"));
    }

    let animation = TimelapseAnimation {
        path: path.to_path_buf(),
        download_name: format!("goes_fire_{}.gif", request.start),
        frames_per_second: request.frames_per_second,
        frame_count: request.frame_count,
        created_at: Utc::now(),
        request,
    };

    info!(
        path = %animation.path.display(),
        bytes = size,
        frames = animation.frame_count,
        "Timelapse rendered"
    );

    let artifact = Artifact::new(path, ArtifactKind::Timelapse, &animation.download_name);
    Ok((artifact, animation))
}

/// Render a timelapse and make it the current artifact of `session_id`.
///
/// Rendering runs without holding the registry lock; only installing takes
/// it. The previous artifact, if any, is released. Failure to delete it is
/// logged and does not fail the new timelapse.
pub async fn assemble_timelapse(
    renderer: &dyn TimelapseRenderer,
    sessions: &Mutex<SessionRegistry>,
    session_id: &str,
    params: &TimelapseParams,
) -> Result<TimelapseAnimation> {
    let (artifact, animation) = render_timelapse(renderer, params).await?;
    sessions.lock().await.session(session_id).install(artifact);
    Ok(animation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::path::Path;

    /// Writes a fake GIF, or fails, and records every request.
    struct StubRenderer {
        fail: bool,
        requests: std::sync::Mutex<Vec<TimelapseRequest>>,
        outputs: std::sync::Mutex<Vec<PathBuf>>,
    }

    impl StubRenderer {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                requests: std::sync::Mutex::new(Vec::new()),
                outputs: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TimelapseRenderer for StubRenderer {
        async fn render(&self, request: &TimelapseRequest, out: &Path) -> Result<()> {
            self.requests.lock().unwrap().push(request.clone());
            self.outputs.lock().unwrap().push(out.to_path_buf());
            if self.fail {
                tokio::fs::write(out, b"partial").await?;
                return Err(AnalysisError::RemoteService {
                    status: Some(429),
                    message: "quota exceeded".to_string(),
                });
            }
            tokio::fs::write(out, b"GIF89a").await?;
            Ok(())
        }
    }

    fn range(start_h: u32, end_h: u32) -> Result<TimeRange> {
        let day = NaiveDate::from_ymd_opt(2024, 9, 10).unwrap();
        TimeRange::new(
            day.and_hms_opt(start_h, 0, 0).unwrap(),
            day.and_hms_opt(end_h, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_collection_ids() {
        let source = GoesSource::default();
        assert_eq!(source.imagery_collection(), "NOAA/GOES/19/MCMIPF");
        assert_eq!(source.fire_collection(), "NOAA/GOES/19/FDCF");

        let conus = GoesSource {
            satellite: GoesSatellite::parse("goes16").unwrap(),
            scan: GoesScan::parse("conus").unwrap(),
        };
        assert_eq!(conus.imagery_collection(), "NOAA/GOES/16/MCMIPC");
        assert!(GoesSatellite::parse("GOES-12").is_err());
    }

    #[test]
    fn test_request_contract() {
        let mut params = TimelapseParams::new(range(0, 2).unwrap()).unwrap();
        params.cadence_secs = 1200;
        let request = params.to_request().unwrap();

        assert_eq!(request.start, "2024-09-10T00:00");
        assert_eq!(request.end, "2024-09-10T02:00");
        assert_eq!(request.frame_step, 2);
        assert_eq!(request.frame_count, 7);
        assert_eq!(request.dimensions, 600);
        assert_eq!(request.frames_per_second, 6);
        assert_eq!(request.date_format, "YYYY-MM-dd HH:mm");
    }

    #[test]
    fn test_request_validation() {
        let base = TimelapseParams::new(range(0, 2).unwrap()).unwrap();

        let mut p = base.clone();
        p.frames_per_second = 0;
        assert!(p.to_request().is_err());

        let mut p = base.clone();
        p.dimensions = 5000;
        assert!(p.to_request().is_err());

        let mut p = base.clone();
        p.cadence_secs = 900;
        assert!(p.to_request().is_err());

        let mut p = base;
        p.source.scan = GoesScan::Mesoscale;
        p.range = TimeRange::new(
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 10).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        )
        .unwrap();
        p.cadence_secs = 60;
        assert!(p.to_request().is_err(), "too many frames");
    }

    #[tokio::test]
    async fn test_invalid_params_never_reach_renderer() {
        let renderer = StubRenderer::new(false);
        let sessions = Mutex::new(SessionRegistry::new());
        let mut params = TimelapseParams::new(range(0, 1).unwrap()).unwrap();
        params.frames_per_second = 0;

        let result = assemble_timelapse(&renderer, &sessions, "s", &params).await;

        assert!(matches!(result, Err(AnalysisError::Validation(_))));
        assert!(renderer.requests.lock().unwrap().is_empty());
        assert!(sessions.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_render_removes_temp_file() {
        let renderer = StubRenderer::new(true);
        let params = TimelapseParams::new(range(0, 1).unwrap()).unwrap();
        let sessions = Mutex::new(SessionRegistry::new());

        let result = assemble_timelapse(&renderer, &sessions, "s", &params).await;
        assert!(matches!(result, Err(AnalysisError::RemoteService { status: Some(429), .. })));
        assert!(sessions.lock().await.get("s").is_none());

        let outputs = renderer.outputs.lock().unwrap();
        assert_eq!(outputs.len(), 1);
        assert!(!outputs[0].exists());
    }

    #[tokio::test]
    async fn test_second_timelapse_supersedes_first() {
        let renderer = StubRenderer::new(false);
        let params = TimelapseParams::new(range(0, 1).unwrap()).unwrap();
        let sessions = Mutex::new(SessionRegistry::new());

        let first = assemble_timelapse(&renderer, &sessions, "s", &params).await.unwrap();
        assert!(first.path.exists());
        assert_eq!(first.download_name, "goes_fire_2024-09-10T00:00.gif");

        let second = assemble_timelapse(&renderer, &sessions, "s", &params).await.unwrap();
        assert!(!first.path.exists(), "first artifact released");
        assert!(second.path.exists());

        let registry = sessions.lock().await;
        let current = registry.get("s").unwrap().current().unwrap();
        assert_eq!(current.path(), second.path.as_path());
        assert_eq!(registry.len(), 1);
    }
}
