//! Temporal median compositing.
//!
//! A non-empty query outcome is reduced to a single representative image: the
//! per-pixel, per-band median of all matching scenes, clipped to the exact
//! region polygon. The median is robust to residual cloud and shadow left in
//! partially filtered scenes.

use serde::Serialize;

use crate::catalog::ImageExpr;
use crate::query::QueryOutcome;
use crate::region::RegionOfInterest;

/// A lazy median composite and the number of scenes it reduces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composite {
    pub image: ImageExpr,
    pub scene_count: u64,
}

/// Result of compositing a query outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositeOutcome {
    /// The collection had no qualifying scenes; nothing was reduced.
    Empty,
    Ready(Composite),
}

impl CompositeOutcome {
    pub fn into_option(self) -> Option<Composite> {
        match self {
            CompositeOutcome::Empty => None,
            CompositeOutcome::Ready(c) => Some(c),
        }
    }
}

/// Reduce a query outcome to its clipped median composite.
pub fn composite(outcome: QueryOutcome, region: &RegionOfInterest) -> CompositeOutcome {
    match outcome {
        QueryOutcome::Empty => CompositeOutcome::Empty,
        QueryOutcome::Scenes { collection, count } => CompositeOutcome::Ready(Composite {
            image: collection.median().clip(region),
            scene_count: count,
        }),
    }
}
