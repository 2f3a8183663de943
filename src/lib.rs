//! Burnscope - Wildfire burn-severity mapping and GOES fire timelapses.
//!
//! # Overview
//!
//! Burnscope compares cloud-filtered Sentinel-2 median composites from before
//! and after a fire and derives a difference of normalized burn ratios (dNBR)
//! over a region of interest. It also renders GOES fire-temperature
//! animations for a time window.
//!
//! Heavy lifting happens on a remote geospatial processing service. Scene
//! collections and images are lazy expressions; they are evaluated only when
//! counted, materialized, or registered as map layers.
//!
//! # Modules
//!
//! - [`error`]: The analysis error taxonomy
//! - [`model`]: Date ranges, visualization parameters, and API types
//! - [`region`]: Region of interest geometry
//! - [`raster`]: In-memory rasters with NaN as no-data
//! - [`catalog`]: Remote catalog and renderer traits plus implementations
//! - [`query`]: Cloud-filtered scene queries
//! - [`composite`]: Median composites
//! - [`severity`]: Normalized differences and the severity index
//! - [`timelapse`]: GOES timelapse requests and rendering
//! - [`session`]: Per-session artifact ownership
//! - [`pipeline`]: End-to-end burn-severity runs
//! - [`storage`]: SQLite run history
//! - [`config`]: Environment configuration
//! - [`api`]: HTTP API handlers

pub mod api;
pub mod catalog;
pub mod composite;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod raster;
pub mod region;
pub mod session;
pub mod severity;
pub mod storage;
pub mod timelapse;
