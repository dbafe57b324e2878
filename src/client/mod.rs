//! Report client: dispatch, cache-aside fetch and adaptation

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::adapt::{adapt, AdaptError, AdaptedResult};
use crate::cache::{build_store, CacheAside, CacheStore};
use crate::config::Config;
use crate::error::ReportResult;
use crate::key::{derive_key, CacheKey, Discriminator};
use crate::models::{QueryParameters, RawResult};
use crate::period::{Clock, Period, SystemClock};
use crate::report::{ReportKind, ReportRequest, COUNTRY_ID, MAX_RESULTS, PAGES};
use crate::transport::{fetch, ReqwestTransport, Transport};

/// Result of one report call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportResponse {
    /// `None` for raw requests
    pub report: Option<ReportKind>,
    pub cache_key: CacheKey,
    pub query: QueryParameters,
    pub cache_hit: bool,
    /// Absent when the fetch failed or returned no rows
    pub data: Option<RawResult>,
}

impl ReportResponse {
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Adapt `data` with the adapter registered for this report
    pub fn adapt(&self) -> Result<Option<AdaptedResult>, AdaptError> {
        match self.report {
            Some(kind) => adapt(kind, self.data.as_ref()),
            None => Ok(None),
        }
    }
}

/// Client for one Metrika counter.
///
/// Holds no per-call state, so one instance can serve concurrent callers.
pub struct MetrikaClient {
    counter_id: String,
    transport: Arc<dyn Transport>,
    cache: CacheAside,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MetrikaClient {
    pub fn new(
        counter_id: impl Into<String>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            counter_id: counter_id.into(),
            transport,
            cache: CacheAside::new(store),
            ttl,
            clock: Arc::new(SystemClock),
        }
    }

    /// Wire a client from configuration, opening the cache backend
    pub async fn from_config(config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(
            &config.metrika.api_url,
            &config.metrika.token,
            config.metrika.timeout(),
        )?;
        let store = build_store(&config.cache).await?;

        info!(
            "Metrika client ready for counter {} (cache TTL {}s)",
            config.metrika.counter_id, config.cache.ttl_secs
        );

        Ok(Self::new(
            config.metrika.counter_id.clone(),
            Arc::new(transport),
            store,
            config.cache.ttl(),
        ))
    }

    /// Replace the clock used for relative periods
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn counter_id(&self) -> &str {
        &self.counter_id
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Run a catalog report over the last `days` days (report default if `None`)
    pub async fn report(
        &self,
        kind: ReportKind,
        days: Option<i64>,
        overrides: &[(&str, i64)],
    ) -> ReportResult<ReportResponse> {
        let request = ReportRequest::relative(kind, self.clock.as_ref(), days, overrides)?;
        Ok(self.execute(&request).await)
    }

    /// Run a catalog report over an explicit period
    pub async fn report_for_period(
        &self,
        kind: ReportKind,
        period: Period,
        overrides: &[(&str, i64)],
    ) -> ReportResult<ReportResponse> {
        let request = ReportRequest::new(kind, period, overrides)?;
        Ok(self.execute(&request).await)
    }

    /// Run a report by identifier; unknown identifiers are an error
    pub async fn report_by_name(
        &self,
        name: &str,
        days: Option<i64>,
        overrides: &[(&str, i64)],
    ) -> ReportResult<ReportResponse> {
        let kind = name.parse::<ReportKind>()?;
        self.report(kind, days, overrides).await
    }

    pub async fn execute(&self, request: &ReportRequest) -> ReportResponse {
        let query = request.query(&self.counter_id);
        let key = request.cache_key(&self.counter_id);
        self.run(Some(request.kind()), key, query).await
    }

    /// Send arbitrary query parameters, bypassing the catalog
    pub async fn raw_request(&self, query: QueryParameters) -> ReportResponse {
        let key = derive_key(&self.counter_id, &Discriminator::Raw, None, query.as_map());
        self.run(None, key, query).await
    }

    async fn run(&self, report: Option<ReportKind>, key: CacheKey, query: QueryParameters) -> ReportResponse {
        let lookup = self
            .cache
            .get_or_fetch(&key, self.ttl, || fetch(self.transport.as_ref(), &query))
            .await;

        ReportResponse {
            report,
            cache_key: key,
            query,
            cache_hit: lookup.cache_hit,
            data: lookup.raw,
        }
    }

    pub async fn visits_views_users(&self, days: i64) -> ReportResult<ReportResponse> {
        self.report(ReportKind::VisitsViewsUsers, Some(days), &[]).await
    }

    pub async fn visits_views_users_for_period(&self, period: Period) -> ReportResult<ReportResponse> {
        self.report_for_period(ReportKind::VisitsViewsUsers, period, &[])
            .await
    }

    pub async fn top_pages_views(&self, days: i64, max_results: i64) -> ReportResult<ReportResponse> {
        self.report(ReportKind::TopPagesViews, Some(days), &[(MAX_RESULTS, max_results)])
            .await
    }

    pub async fn top_pages_views_for_period(
        &self,
        period: Period,
        max_results: i64,
    ) -> ReportResult<ReportResponse> {
        self.report_for_period(ReportKind::TopPagesViews, period, &[(MAX_RESULTS, max_results)])
            .await
    }

    pub async fn sources_summary(&self, days: i64) -> ReportResult<ReportResponse> {
        self.report(ReportKind::SourcesSummary, Some(days), &[]).await
    }

    pub async fn sources_summary_for_period(&self, period: Period) -> ReportResult<ReportResponse> {
        self.report_for_period(ReportKind::SourcesSummary, period, &[])
            .await
    }

    pub async fn sources_search_phrases(
        &self,
        days: i64,
        max_results: i64,
    ) -> ReportResult<ReportResponse> {
        self.report(
            ReportKind::SourcesSearchPhrases,
            Some(days),
            &[(MAX_RESULTS, max_results)],
        )
        .await
    }

    pub async fn sources_search_phrases_for_period(
        &self,
        period: Period,
        max_results: i64,
    ) -> ReportResult<ReportResponse> {
        self.report_for_period(
            ReportKind::SourcesSearchPhrases,
            period,
            &[(MAX_RESULTS, max_results)],
        )
        .await
    }

    pub async fn tech_platforms(&self, days: i64, max_results: i64) -> ReportResult<ReportResponse> {
        self.report(ReportKind::TechPlatforms, Some(days), &[(MAX_RESULTS, max_results)])
            .await
    }

    pub async fn tech_platforms_for_period(
        &self,
        period: Period,
        max_results: i64,
    ) -> ReportResult<ReportResponse> {
        self.report_for_period(ReportKind::TechPlatforms, period, &[(MAX_RESULTS, max_results)])
            .await
    }

    pub async fn visits_users_search_engine(
        &self,
        days: i64,
        max_results: i64,
    ) -> ReportResult<ReportResponse> {
        self.report(
            ReportKind::VisitsUsersSearchEngine,
            Some(days),
            &[(MAX_RESULTS, max_results)],
        )
        .await
    }

    pub async fn visits_users_search_engine_for_period(
        &self,
        period: Period,
        max_results: i64,
    ) -> ReportResult<ReportResponse> {
        self.report_for_period(
            ReportKind::VisitsUsersSearchEngine,
            period,
            &[(MAX_RESULTS, max_results)],
        )
        .await
    }

    pub async fn visits_views_page_depth(&self, days: i64, pages: i64) -> ReportResult<ReportResponse> {
        self.report(ReportKind::VisitsViewsPageDepth, Some(days), &[(PAGES, pages)])
            .await
    }

    pub async fn visits_views_page_depth_for_period(
        &self,
        period: Period,
        pages: i64,
    ) -> ReportResult<ReportResponse> {
        self.report_for_period(ReportKind::VisitsViewsPageDepth, period, &[(PAGES, pages)])
            .await
    }

    pub async fn geo_country(&self, days: i64, max_results: i64) -> ReportResult<ReportResponse> {
        self.report(ReportKind::GeoCountry, Some(days), &[(MAX_RESULTS, max_results)])
            .await
    }

    pub async fn geo_country_for_period(
        &self,
        period: Period,
        max_results: i64,
    ) -> ReportResult<ReportResponse> {
        self.report_for_period(ReportKind::GeoCountry, period, &[(MAX_RESULTS, max_results)])
            .await
    }

    /// `country_id` defaults to 225 (Russia)
    pub async fn geo_area(
        &self,
        days: i64,
        max_results: i64,
        country_id: Option<i64>,
    ) -> ReportResult<ReportResponse> {
        let overrides = geo_area_overrides(max_results, country_id);
        self.report(ReportKind::GeoArea, Some(days), &overrides).await
    }

    pub async fn geo_area_for_period(
        &self,
        period: Period,
        max_results: i64,
        country_id: Option<i64>,
    ) -> ReportResult<ReportResponse> {
        let overrides = geo_area_overrides(max_results, country_id);
        self.report_for_period(ReportKind::GeoArea, period, &overrides)
            .await
    }
}

fn geo_area_overrides(max_results: i64, country_id: Option<i64>) -> Vec<(&'static str, i64)> {
    let mut overrides = vec![(MAX_RESULTS, max_results)];
    if let Some(country_id) = country_id {
        overrides.push((COUNTRY_ID, country_id));
    }
    overrides
}
