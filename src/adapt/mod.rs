//! Adaptation of raw tabular responses into named report structures.
//!
//! Each fixed-shape adapter declares the column ids its report asks for. The
//! column ids the API echoes in `query` must match them in order, every row
//! must carry that many cells, mandatory dimensions must be non-null and
//! metrics finite and non-negative. Anything else is an [`AdaptError`];
//! adapters never substitute defaults.

pub mod models;

pub use models::{
    AdaptedResult, BreakdownRow, DailyTraffic, DepthVisits, PageViews, RegionVisits,
    SearchEngineUsers,
};

use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{RawResult, ResultRow};
use crate::report::ReportKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdaptError {
    #[error(
        "{report}: row {row} has {found_dimensions} dimensions and {found_metrics} metrics, \
         expected {expected_dimensions} and {expected_metrics}"
    )]
    ShapeMismatch {
        report: ReportKind,
        row: usize,
        expected_dimensions: usize,
        expected_metrics: usize,
        found_dimensions: usize,
        found_metrics: usize,
    },

    #[error("{report}: response {axis} are [{found}], expected [{expected}]")]
    ColumnMismatch {
        report: ReportKind,
        /// `dimensions` or `metrics`
        axis: &'static str,
        expected: String,
        found: String,
    },

    #[error("{report}: row {row} has invalid {column} value {value}")]
    InvalidValue {
        report: ReportKind,
        row: usize,
        column: &'static str,
        value: String,
    },
}

pub type Adapter = fn(&RawResult) -> Result<AdaptedResult, AdaptError>;

/// Run the adapter registered for `kind`. `Ok(None)` when there is nothing to
/// adapt or no adapter is registered.
pub fn adapt(kind: ReportKind, raw: Option<&RawResult>) -> Result<Option<AdaptedResult>, AdaptError> {
    let (Some(raw), Some(adapter)) = (raw, kind.definition().adapter) else {
        return Ok(None);
    };

    adapter(raw).map(Some)
}

/// Column contract of a fixed-shape report, in request order
pub(crate) struct Columns {
    pub(crate) report: ReportKind,
    pub(crate) dimensions: &'static [&'static str],
    pub(crate) metrics: &'static [&'static str],
}

pub(crate) const TRAFFIC: Columns = Columns {
    report: ReportKind::VisitsViewsUsers,
    dimensions: &["ym:s:date"],
    metrics: &["ym:s:visits", "ym:s:pageviews", "ym:s:users"],
};

pub(crate) const TOP_PAGES: Columns = Columns {
    report: ReportKind::TopPagesViews,
    dimensions: &["ym:pv:URLPathFull", "ym:pv:title"],
    metrics: &["ym:pv:pageviews"],
};

pub(crate) const SEARCH_ENGINES: Columns = Columns {
    report: ReportKind::VisitsUsersSearchEngine,
    dimensions: &["ym:s:searchEngine"],
    metrics: &["ym:s:users"],
};

pub(crate) const PAGE_DEPTH: Columns = Columns {
    report: ReportKind::VisitsViewsPageDepth,
    dimensions: &[],
    metrics: &["ym:s:visits"],
};

pub(crate) const GEO_COUNTRY: Columns = Columns {
    report: ReportKind::GeoCountry,
    dimensions: &["ym:s:regionCountry", "ym:s:regionArea"],
    metrics: &["ym:s:visits"],
};

pub(crate) const GEO_AREA: Columns = Columns {
    report: ReportKind::GeoArea,
    dimensions: &["ym:s:regionArea", "ym:s:regionCity"],
    metrics: &["ym:s:visits"],
};

impl Columns {
    /// Rows of `raw` once the echoed column ids and every row's cell counts
    /// agree with this contract. An empty echo is not checked.
    fn rows<'a>(&self, raw: &'a RawResult) -> Result<&'a [ResultRow], AdaptError> {
        self.check_echo("dimensions", self.dimensions, &raw.query.dimensions)?;
        self.check_echo("metrics", self.metrics, &raw.query.metrics)?;
        check_cells(self.report, self.dimensions.len(), self.metrics.len(), raw)
    }

    fn check_echo(
        &self,
        axis: &'static str,
        expected: &[&str],
        found: &[String],
    ) -> Result<(), AdaptError> {
        if found.is_empty() || found.iter().map(String::as_str).eq(expected.iter().copied()) {
            return Ok(());
        }

        Err(AdaptError::ColumnMismatch {
            report: self.report,
            axis,
            expected: expected.join(","),
            found: found.join(","),
        })
    }

    /// Non-null dimension value
    fn name(&self, index: usize, row: &ResultRow, column: usize) -> Result<String, AdaptError> {
        row.dimensions[column]
            .name
            .clone()
            .ok_or_else(|| AdaptError::InvalidValue {
                report: self.report,
                row: index,
                column: self.dimensions[column],
                value: "null".to_string(),
            })
    }

    /// Finite, non-negative metric value
    fn metric(&self, index: usize, row: &ResultRow, column: usize) -> Result<f64, AdaptError> {
        let value = row.metrics[column];
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(AdaptError::InvalidValue {
                report: self.report,
                row: index,
                column: self.metrics[column],
                value: value.to_string(),
            })
        }
    }
}

fn check_cells(
    report: ReportKind,
    dimensions: usize,
    metrics: usize,
    raw: &RawResult,
) -> Result<&[ResultRow], AdaptError> {
    for (index, row) in raw.data.iter().enumerate() {
        if row.dimensions.len() != dimensions || row.metrics.len() != metrics {
            return Err(AdaptError::ShapeMismatch {
                report,
                row: index,
                expected_dimensions: dimensions,
                expected_metrics: metrics,
                found_dimensions: row.dimensions.len(),
                found_metrics: row.metrics.len(),
            });
        }
    }

    Ok(&raw.data)
}

/// `ym:s:bounceRate` -> `bounceRate`
fn short_metric_name(id: &str) -> &str {
    id.rsplit(':').next().unwrap_or(id)
}

pub(crate) fn daily_traffic(raw: &RawResult) -> Result<AdaptedResult, AdaptError> {
    let c = &TRAFFIC;
    let rows = c
        .rows(raw)?
        .iter()
        .enumerate()
        .map(|(i, row)| -> Result<DailyTraffic, AdaptError> {
            Ok(DailyTraffic {
                date: c.name(i, row, 0)?,
                visits: c.metric(i, row, 0)?,
                pageviews: c.metric(i, row, 1)?,
                users: c.metric(i, row, 2)?,
            })
        })
        .collect::<Result<Vec<_>, AdaptError>>()?;

    Ok(AdaptedResult::Traffic(rows))
}

pub(crate) fn top_pages(raw: &RawResult) -> Result<AdaptedResult, AdaptError> {
    let c = &TOP_PAGES;
    let rows = c
        .rows(raw)?
        .iter()
        .enumerate()
        .map(|(i, row)| -> Result<PageViews, AdaptError> {
            Ok(PageViews {
                path: c.name(i, row, 0)?,
                // Untitled pages come back as null
                title: row.dimensions[1].name.clone(),
                pageviews: c.metric(i, row, 0)?,
            })
        })
        .collect::<Result<Vec<_>, AdaptError>>()?;

    Ok(AdaptedResult::TopPages(rows))
}

pub(crate) fn search_engines(raw: &RawResult) -> Result<AdaptedResult, AdaptError> {
    let c = &SEARCH_ENGINES;
    let rows = c
        .rows(raw)?
        .iter()
        .enumerate()
        .map(|(i, row)| -> Result<SearchEngineUsers, AdaptError> {
            Ok(SearchEngineUsers {
                engine: c.name(i, row, 0)?,
                users: c.metric(i, row, 0)?,
            })
        })
        .collect::<Result<Vec<_>, AdaptError>>()?;

    Ok(AdaptedResult::SearchEngines(rows))
}

pub(crate) fn page_depth(raw: &RawResult) -> Result<AdaptedResult, AdaptError> {
    let c = &PAGE_DEPTH;
    let rows = c
        .rows(raw)?
        .iter()
        .enumerate()
        .map(|(i, row)| -> Result<DepthVisits, AdaptError> {
            Ok(DepthVisits {
                visits: c.metric(i, row, 0)?,
            })
        })
        .collect::<Result<Vec<_>, AdaptError>>()?;

    Ok(AdaptedResult::PageDepth(rows))
}

pub(crate) fn geo_country(raw: &RawResult) -> Result<AdaptedResult, AdaptError> {
    geo(&GEO_COUNTRY, raw)
}

pub(crate) fn geo_area(raw: &RawResult) -> Result<AdaptedResult, AdaptError> {
    geo(&GEO_AREA, raw)
}

fn geo(c: &Columns, raw: &RawResult) -> Result<AdaptedResult, AdaptError> {
    let rows = c
        .rows(raw)?
        .iter()
        .enumerate()
        .map(|(i, row)| -> Result<RegionVisits, AdaptError> {
            Ok(RegionVisits {
                region: c.name(i, row, 0)?,
                subregion: row.dimensions[1].name.clone(),
                visits: c.metric(i, row, 0)?,
            })
        })
        .collect::<Result<Vec<_>, AdaptError>>()?;

    Ok(AdaptedResult::Geo(rows))
}

pub(crate) fn sources_summary(raw: &RawResult) -> Result<AdaptedResult, AdaptError> {
    breakdown(ReportKind::SourcesSummary, raw)
}

pub(crate) fn search_phrases(raw: &RawResult) -> Result<AdaptedResult, AdaptError> {
    breakdown(ReportKind::SourcesSearchPhrases, raw)
}

pub(crate) fn tech_platforms(raw: &RawResult) -> Result<AdaptedResult, AdaptError> {
    breakdown(ReportKind::TechPlatforms, raw)
}

/// Preset reports choose their own columns; the contract is whatever the API
/// echoed back in `query`.
fn breakdown(report: ReportKind, raw: &RawResult) -> Result<AdaptedResult, AdaptError> {
    let rows = check_cells(report, raw.query.dimensions.len(), raw.query.metrics.len(), raw)?;
    let metric_names: Vec<&str> = raw
        .query
        .metrics
        .iter()
        .map(|id| short_metric_name(id))
        .collect();

    Ok(AdaptedResult::Breakdown(
        rows.iter()
            .map(|row| BreakdownRow {
                dimensions: row.dimensions.iter().map(|d| d.name.clone()).collect(),
                metrics: metric_names
                    .iter()
                    .zip(&row.metrics)
                    .map(|(name, value)| (name.to_string(), *value))
                    .collect::<BTreeMap<_, _>>(),
            })
            .collect(),
    ))
}
