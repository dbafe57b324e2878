//! Report registry
//!
//! Every report the client knows is a [`ReportKind`] with one static
//! [`ReportDefinition`]: its default day count, the extra parameters it
//! accepts, the function that builds its query and the adapter for its
//! response. Relative (`days`) and explicit-period requests both end up in the
//! same [`ReportRequest`], so each report has exactly one query builder.

pub mod catalog;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::adapt::Adapter;
use crate::error::{ReportError, ReportResult};
use crate::key::{derive_key, CacheKey, Discriminator};
use crate::models::QueryParameters;
use crate::period::{days_ago, Clock, Period};

/// Row limit parameter
pub const MAX_RESULTS: &str = "maxResults";
/// Page depth threshold parameter
pub const PAGES: &str = "pages";
/// Region country id parameter (225 is Russia, 187 Ukraine, ...)
pub const COUNTRY_ID: &str = "countryId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    VisitsViewsUsers,
    TopPagesViews,
    SourcesSummary,
    SourcesSearchPhrases,
    TechPlatforms,
    VisitsUsersSearchEngine,
    VisitsViewsPageDepth,
    GeoCountry,
    GeoArea,
}

impl ReportKind {
    pub const ALL: [ReportKind; 9] = [
        ReportKind::VisitsViewsUsers,
        ReportKind::TopPagesViews,
        ReportKind::SourcesSummary,
        ReportKind::SourcesSearchPhrases,
        ReportKind::TechPlatforms,
        ReportKind::VisitsUsersSearchEngine,
        ReportKind::VisitsViewsPageDepth,
        ReportKind::GeoCountry,
        ReportKind::GeoArea,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::VisitsViewsUsers => "visits-views-users",
            ReportKind::TopPagesViews => "top-pages-views",
            ReportKind::SourcesSummary => "sources-summary",
            ReportKind::SourcesSearchPhrases => "sources-search-phrases",
            ReportKind::TechPlatforms => "tech-platforms",
            ReportKind::VisitsUsersSearchEngine => "visits-users-search-engine",
            ReportKind::VisitsViewsPageDepth => "visits-views-page-depth",
            ReportKind::GeoCountry => "geo-country",
            ReportKind::GeoArea => "geo-area",
        }
    }

    pub fn definition(self) -> &'static ReportDefinition {
        catalog::definition(self)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ReportError::UnknownReport(s.to_string()))
    }
}

/// An extra knob a report accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: i64,
    /// Smallest accepted value
    pub min: i64,
    pub description: &'static str,
}

pub type QueryBuilder = fn(&str, &ReportRequest) -> QueryParameters;

pub struct ReportDefinition {
    pub kind: ReportKind,
    pub description: &'static str,
    /// Day count used when a relative request omits it
    pub default_days: i64,
    pub params: &'static [ParamSpec],
    pub build: QueryBuilder,
    pub adapter: Option<Adapter>,
}

impl ReportDefinition {
    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|spec| spec.name == name)
    }
}

impl fmt::Debug for ReportDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportDefinition")
            .field("kind", &self.kind)
            .field("default_days", &self.default_days)
            .field("params", &self.params)
            .field("adapter", &self.adapter.is_some())
            .finish()
    }
}

/// All registered reports, in catalog order
pub fn catalog() -> impl Iterator<Item = &'static ReportDefinition> {
    ReportKind::ALL.iter().map(|kind| kind.definition())
}

/// Look a report up by its identifier
pub fn resolve(name: &str) -> ReportResult<&'static ReportDefinition> {
    name.parse::<ReportKind>().map(ReportKind::definition)
}

/// A validated report invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    kind: ReportKind,
    period: Period,
    parameters: BTreeMap<String, i64>,
}

impl ReportRequest {
    /// Build a request for an explicit period. Parameters not overridden take
    /// the report's defaults.
    pub fn new(kind: ReportKind, period: Period, overrides: &[(&str, i64)]) -> ReportResult<Self> {
        let definition = kind.definition();

        let mut parameters: BTreeMap<String, i64> = definition
            .params
            .iter()
            .map(|spec| (spec.name.to_string(), spec.default))
            .collect();

        for &(name, value) in overrides {
            let spec = definition.param(name).ok_or_else(|| {
                ReportError::InvalidRequest(format!("report '{kind}' has no parameter '{name}'"))
            })?;

            if value < spec.min {
                return Err(ReportError::InvalidRequest(format!(
                    "{name} must be at least {}, got {value}",
                    spec.min
                )));
            }

            parameters.insert(name.to_string(), value);
        }

        Ok(Self {
            kind,
            period,
            parameters,
        })
    }

    /// Build a request for the `days` days up to today. `None` uses the
    /// report's default day count.
    pub fn relative(
        kind: ReportKind,
        clock: &dyn Clock,
        days: Option<i64>,
        overrides: &[(&str, i64)],
    ) -> ReportResult<Self> {
        let days = days.unwrap_or(kind.definition().default_days);
        let period = days_ago(clock, days)?;
        Self::new(kind, period, overrides)
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn parameters(&self) -> &BTreeMap<String, i64> {
        &self.parameters
    }

    /// Value of a declared parameter
    pub fn param(&self, name: &str) -> i64 {
        match self.parameters.get(name) {
            Some(value) => *value,
            None => self
                .kind
                .definition()
                .param(name)
                .map(|spec| spec.default)
                .unwrap_or_default(),
        }
    }

    /// Query parameters sent over the wire
    pub fn query(&self, counter_id: &str) -> QueryParameters {
        (self.kind.definition().build)(counter_id, self)
    }

    pub fn cache_key(&self, counter_id: &str) -> CacheKey {
        derive_key(
            counter_id,
            &Discriminator::Report(self.kind),
            Some(&self.period),
            &self.parameters,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryValue;
    use crate::period::FixedClock;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn clock() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    #[test]
    fn test_catalog_names_round_trip() {
        let mut seen = HashSet::new();
        for definition in catalog() {
            assert!(seen.insert(definition.kind.as_str()));
            assert_eq!(
                definition.kind.as_str().parse::<ReportKind>().unwrap(),
                definition.kind
            );
            assert_eq!(
                serde_json::to_value(definition.kind).unwrap(),
                serde_json::json!(definition.kind.as_str())
            );
        }
        assert_eq!(seen.len(), ReportKind::ALL.len());
    }

    #[test]
    fn test_resolve_unknown_report() {
        assert_eq!(
            resolve("bounce-rate").unwrap_err(),
            ReportError::UnknownReport("bounce-rate".to_string())
        );
    }

    #[test]
    fn test_relative_and_period_forms_build_identical_queries() {
        let clock = clock();
        for kind in ReportKind::ALL {
            let relative = ReportRequest::relative(kind, &clock, Some(30), &[]).unwrap();
            let period = days_ago(&clock, 30).unwrap();
            let explicit = ReportRequest::new(kind, period, &[]).unwrap();

            assert_eq!(relative, explicit, "{kind}");
            assert_eq!(relative.query("42"), explicit.query("42"), "{kind}");
            assert_eq!(relative.cache_key("42"), explicit.cache_key("42"), "{kind}");
        }
    }

    #[test]
    fn test_top_pages_query() {
        let request =
            ReportRequest::relative(ReportKind::TopPagesViews, &clock(), Some(30), &[(MAX_RESULTS, 5)])
                .unwrap();
        let query = request.query("42");

        assert_eq!(query.get("ids"), Some(&QueryValue::from("42")));
        assert_eq!(query.get("date1"), Some(&QueryValue::from("2024-05-16")));
        assert_eq!(query.get("date2"), Some(&QueryValue::from("2024-06-15")));
        assert_eq!(query.get("limit"), Some(&QueryValue::Int(5)));
        assert_eq!(query.get("sort"), Some(&QueryValue::from("-ym:pv:pageviews")));

        let again =
            ReportRequest::relative(ReportKind::TopPagesViews, &clock(), Some(30), &[(MAX_RESULTS, 5)])
                .unwrap();
        assert_eq!(
            serde_json::to_vec(&query).unwrap(),
            serde_json::to_vec(&again.query("42")).unwrap()
        );
    }

    #[test]
    fn test_default_day_counts() {
        let clock = clock();
        let geo = ReportRequest::relative(ReportKind::GeoCountry, &clock, None, &[]).unwrap();
        assert_eq!(geo.period().date1(), "2024-06-08");

        let visits = ReportRequest::relative(ReportKind::VisitsViewsUsers, &clock, None, &[]).unwrap();
        assert_eq!(visits.period().date1(), "2024-05-16");
    }

    #[test]
    fn test_defaults_fill_parameters() {
        let request = ReportRequest::relative(ReportKind::GeoArea, &clock(), None, &[]).unwrap();
        assert_eq!(request.param(MAX_RESULTS), 100);
        assert_eq!(request.param(COUNTRY_ID), 225);

        let query = request.query("42");
        assert_eq!(
            query.get("filters"),
            Some(&QueryValue::from("ym:s:regionCountry=='225'"))
        );
    }

    #[test]
    fn test_rejects_out_of_domain_parameter() {
        let err = ReportRequest::relative(ReportKind::TopPagesViews, &clock(), None, &[(MAX_RESULTS, -1)])
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidRequest(_)));
    }

    #[test]
    fn test_rejects_undeclared_parameter() {
        let err = ReportRequest::relative(ReportKind::SourcesSummary, &clock(), None, &[(PAGES, 3)])
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidRequest(_)));
    }

    #[test]
    fn test_override_order_does_not_change_key() {
        let clock = clock();
        let a = ReportRequest::relative(
            ReportKind::GeoArea,
            &clock,
            Some(7),
            &[(MAX_RESULTS, 20), (COUNTRY_ID, 187)],
        )
        .unwrap();
        let b = ReportRequest::relative(
            ReportKind::GeoArea,
            &clock,
            Some(7),
            &[(COUNTRY_ID, 187), (MAX_RESULTS, 20)],
        )
        .unwrap();

        assert_eq!(a.cache_key("42"), b.cache_key("42"));
    }

    #[test]
    fn test_explicit_default_matches_implicit_default() {
        let clock = clock();
        let implicit = ReportRequest::relative(ReportKind::TopPagesViews, &clock, None, &[]).unwrap();
        let explicit =
            ReportRequest::relative(ReportKind::TopPagesViews, &clock, None, &[(MAX_RESULTS, 10)])
                .unwrap();
        assert_eq!(implicit.cache_key("42"), explicit.cache_key("42"));
    }
}
