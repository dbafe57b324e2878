//! Adapted report shapes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "rows", rename_all = "snake_case")]
pub enum AdaptedResult {
    Traffic(Vec<DailyTraffic>),
    TopPages(Vec<PageViews>),
    SearchEngines(Vec<SearchEngineUsers>),
    PageDepth(Vec<DepthVisits>),
    Geo(Vec<RegionVisits>),
    Breakdown(Vec<BreakdownRow>),
}

impl AdaptedResult {
    /// Number of records
    pub fn len(&self) -> usize {
        match self {
            AdaptedResult::Traffic(rows) => rows.len(),
            AdaptedResult::TopPages(rows) => rows.len(),
            AdaptedResult::SearchEngines(rows) => rows.len(),
            AdaptedResult::PageDepth(rows) => rows.len(),
            AdaptedResult::Geo(rows) => rows.len(),
            AdaptedResult::Breakdown(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Traffic for one day. Metrics are `f64` because sampled responses are
/// extrapolated and may be fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTraffic {
    /// `YYYY-MM-DD`
    pub date: String,
    pub visits: f64,
    pub pageviews: f64,
    pub users: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageViews {
    pub path: String,
    pub title: Option<String>,
    pub pageviews: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEngineUsers {
    pub engine: String,
    pub users: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthVisits {
    pub visits: f64,
}

/// Visits for a region and, where the report has one, its subregion
/// (country/area for `geo-country`, area/city for `geo-area`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionVisits {
    pub region: String,
    pub subregion: Option<String>,
    pub visits: f64,
}

/// Preset report row: dimension names plus metrics keyed by short metric id
/// (`visits`, `bounceRate`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub dimensions: Vec<Option<String>>,
    pub metrics: BTreeMap<String, f64>,
}
