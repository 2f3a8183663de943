//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `BURNSCOPE_PORT` | 3000 |
//! | `BURNSCOPE_DATABASE_URL` | `sqlite:burnscope.db?mode=rwc` |
//! | `BURNSCOPE_EE_PROJECT` | required |
//! | `BURNSCOPE_EE_TOKEN` | required |
//! | `BURNSCOPE_EE_BASE_URL` | public Earth Engine endpoint |
//! | `BURNSCOPE_SERVICE_ACCOUNT` | none (logged only) |
//! | `BURNSCOPE_MAX_CLOUD_PCT` | 20 |
//! | `BURNSCOPE_BAND_A` / `BURNSCOPE_BAND_B` | `B8` / `B12` |

use std::env;

use anyhow::{Context, bail};

use crate::pipeline::DEFAULT_SCALE_M;
use crate::query::{CloudFilter, DEFAULT_MAX_CLOUD_PCT, SENTINEL2_SR};
use crate::severity::BandPair;

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
pub const DEFAULT_DB_PATH: &str = "sqlite:burnscope.db?mode=rwc";

/// Per-run options used when a request leaves them out.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisDefaults {
    pub collection_id: String,
    pub max_cloud_pct: f64,
    pub bands: BandPair,
    /// Pixel size for materialized indices, in meters.
    pub scale_m: f64,
}

impl Default for AnalysisDefaults {
    fn default() -> Self {
        Self {
            collection_id: SENTINEL2_SR.to_string(),
            max_cloud_pct: DEFAULT_MAX_CLOUD_PCT,
            bands: BandPair::default(),
            scale_m: DEFAULT_SCALE_M,
        }
    }
}

/// Earth Engine credentials and endpoint.
#[derive(Clone)]
pub struct EarthEngineConfig {
    pub project: String,
    pub access_token: String,
    pub base_url: Option<String>,
    pub service_account: Option<String>,
}

// the token stays out of logs
impl std::fmt::Debug for EarthEngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EarthEngineConfig")
            .field("project", &self.project)
            .field("base_url", &self.base_url)
            .field("service_account", &self.service_account)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub earth_engine: EarthEngineConfig,
    pub defaults: AnalysisDefaults,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("BURNSCOPE_PORT") {
            Some(p) => p
                .parse()
                .with_context(|| format!("BURNSCOPE_PORT is not a port number: {p:?}"))?,
            None => DEFAULT_PORT,
        };

        let database_url =
            var("BURNSCOPE_DATABASE_URL").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());

        let Some(project) = var("BURNSCOPE_EE_PROJECT") else {
            bail!("BURNSCOPE_EE_PROJECT must be set to the Earth Engine cloud project");
        };
        let Some(access_token) = var("BURNSCOPE_EE_TOKEN") else {
            bail!("BURNSCOPE_EE_TOKEN must be set to an Earth Engine access token");
        };

        let mut defaults = AnalysisDefaults::default();
        if let Some(pct) = var("BURNSCOPE_MAX_CLOUD_PCT") {
            let pct: f64 = pct
                .parse()
                .with_context(|| format!("BURNSCOPE_MAX_CLOUD_PCT is not a number: {pct:?}"))?;
            CloudFilter::sentinel2(pct).context("BURNSCOPE_MAX_CLOUD_PCT")?;
            defaults.max_cloud_pct = pct;
        }
        if var("BURNSCOPE_BAND_A").is_some() || var("BURNSCOPE_BAND_B").is_some() {
            let a = var("BURNSCOPE_BAND_A").unwrap_or_else(|| defaults.bands.a.clone());
            let b = var("BURNSCOPE_BAND_B").unwrap_or_else(|| defaults.bands.b.clone());
            defaults.bands = BandPair::new(&a, &b).context("BURNSCOPE_BAND_A/BURNSCOPE_BAND_B")?;
        }

        Ok(Self {
            port,
            database_url,
            earth_engine: EarthEngineConfig {
                project,
                access_token,
                base_url: var("BURNSCOPE_EE_BASE_URL"),
                service_account: var("BURNSCOPE_SERVICE_ACCOUNT"),
            },
            defaults,
        })
    }
}
