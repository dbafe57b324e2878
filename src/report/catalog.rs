//! Built-in report definitions and their query builders

use super::{ParamSpec, ReportDefinition, ReportKind, ReportRequest, COUNTRY_ID, MAX_RESULTS, PAGES};
use crate::adapt;
use crate::models::QueryParameters;

const MAX_RESULTS_10: ParamSpec = ParamSpec {
    name: MAX_RESULTS,
    default: 10,
    min: 1,
    description: "maximum number of rows",
};

const MAX_RESULTS_100: ParamSpec = ParamSpec {
    default: 100,
    ..MAX_RESULTS_10
};

const PAGE_DEPTH: ParamSpec = ParamSpec {
    name: PAGES,
    default: 5,
    min: 0,
    description: "count visits that viewed more than this many pages",
};

const REGION_COUNTRY: ParamSpec = ParamSpec {
    name: COUNTRY_ID,
    default: 225,
    min: 1,
    description: "region country id (225 Russia, 187 Ukraine, ...)",
};

static VISITS_VIEWS_USERS: ReportDefinition = ReportDefinition {
    kind: ReportKind::VisitsViewsUsers,
    description: "Visits, page views and unique users per day",
    default_days: 30,
    params: &[],
    build: visits_views_users,
    adapter: Some(adapt::daily_traffic),
};

static TOP_PAGES_VIEWS: ReportDefinition = ReportDefinition {
    kind: ReportKind::TopPagesViews,
    description: "Most viewed pages",
    default_days: 30,
    params: &[MAX_RESULTS_10],
    build: top_pages_views,
    adapter: Some(adapt::top_pages),
};

static SOURCES_SUMMARY: ReportDefinition = ReportDefinition {
    kind: ReportKind::SourcesSummary,
    description: "Traffic sources summary",
    default_days: 30,
    params: &[],
    build: sources_summary,
    adapter: Some(adapt::sources_summary),
};

static SOURCES_SEARCH_PHRASES: ReportDefinition = ReportDefinition {
    kind: ReportKind::SourcesSearchPhrases,
    description: "Search phrases that led to the site",
    default_days: 30,
    params: &[MAX_RESULTS_10],
    build: sources_search_phrases,
    adapter: Some(adapt::search_phrases),
};

static TECH_PLATFORMS: ReportDefinition = ReportDefinition {
    kind: ReportKind::TechPlatforms,
    description: "Visits by browser",
    default_days: 30,
    params: &[MAX_RESULTS_10],
    build: tech_platforms,
    adapter: Some(adapt::tech_platforms),
};

static VISITS_USERS_SEARCH_ENGINE: ReportDefinition = ReportDefinition {
    kind: ReportKind::VisitsUsersSearchEngine,
    description: "Users arriving from organic search, by search engine",
    default_days: 30,
    params: &[MAX_RESULTS_10],
    build: visits_users_search_engine,
    adapter: Some(adapt::search_engines),
};

static VISITS_VIEWS_PAGE_DEPTH: ReportDefinition = ReportDefinition {
    kind: ReportKind::VisitsViewsPageDepth,
    description: "Visits deeper than a number of pages",
    default_days: 30,
    params: &[PAGE_DEPTH],
    build: visits_views_page_depth,
    adapter: Some(adapt::page_depth),
};

static GEO_COUNTRY: ReportDefinition = ReportDefinition {
    kind: ReportKind::GeoCountry,
    description: "Visits by country and region",
    default_days: 7,
    params: &[MAX_RESULTS_100],
    build: geo_country,
    adapter: Some(adapt::geo_country),
};

static GEO_AREA: ReportDefinition = ReportDefinition {
    kind: ReportKind::GeoArea,
    description: "Visits by region and city within one country",
    default_days: 7,
    params: &[MAX_RESULTS_100, REGION_COUNTRY],
    build: geo_area,
    adapter: Some(adapt::geo_area),
};

pub(crate) fn definition(kind: ReportKind) -> &'static ReportDefinition {
    match kind {
        ReportKind::VisitsViewsUsers => &VISITS_VIEWS_USERS,
        ReportKind::TopPagesViews => &TOP_PAGES_VIEWS,
        ReportKind::SourcesSummary => &SOURCES_SUMMARY,
        ReportKind::SourcesSearchPhrases => &SOURCES_SEARCH_PHRASES,
        ReportKind::TechPlatforms => &TECH_PLATFORMS,
        ReportKind::VisitsUsersSearchEngine => &VISITS_USERS_SEARCH_ENGINE,
        ReportKind::VisitsViewsPageDepth => &VISITS_VIEWS_PAGE_DEPTH,
        ReportKind::GeoCountry => &GEO_COUNTRY,
        ReportKind::GeoArea => &GEO_AREA,
    }
}

/// `ids`, `date1`, `date2`
fn base(counter_id: &str, request: &ReportRequest) -> QueryParameters {
    QueryParameters::new()
        .with("ids", counter_id)
        .with("date1", request.period().date1())
        .with("date2", request.period().date2())
}

fn visits_views_users(counter_id: &str, request: &ReportRequest) -> QueryParameters {
    base(counter_id, request)
        .with("metrics", "ym:s:visits,ym:s:pageviews,ym:s:users")
        .with("dimensions", "ym:s:date")
        .with("sort", "ym:s:date")
}

fn top_pages_views(counter_id: &str, request: &ReportRequest) -> QueryParameters {
    base(counter_id, request)
        .with("metrics", "ym:pv:pageviews")
        .with("dimensions", "ym:pv:URLPathFull,ym:pv:title")
        .with("sort", "-ym:pv:pageviews")
        .with("limit", request.param(MAX_RESULTS))
}

fn sources_summary(counter_id: &str, request: &ReportRequest) -> QueryParameters {
    base(counter_id, request).with("preset", "sources_summary")
}

fn sources_search_phrases(counter_id: &str, request: &ReportRequest) -> QueryParameters {
    base(counter_id, request)
        .with("preset", "sources_search_phrases")
        .with("limit", request.param(MAX_RESULTS))
}

fn tech_platforms(counter_id: &str, request: &ReportRequest) -> QueryParameters {
    base(counter_id, request)
        .with("preset", "tech_platforms")
        .with("dimensions", "ym:s:browser")
        .with("limit", request.param(MAX_RESULTS))
}

fn visits_users_search_engine(counter_id: &str, request: &ReportRequest) -> QueryParameters {
    base(counter_id, request)
        .with("metrics", "ym:s:users")
        .with("dimensions", "ym:s:searchEngine")
        .with("filters", "ym:s:trafficSource=='organic'")
        .with("limit", request.param(MAX_RESULTS))
}

fn visits_views_page_depth(counter_id: &str, request: &ReportRequest) -> QueryParameters {
    base(counter_id, request)
        .with("metrics", "ym:s:visits")
        .with("filters", format!("ym:s:pageViews>{}", request.param(PAGES)))
}

fn geo_country(counter_id: &str, request: &ReportRequest) -> QueryParameters {
    base(counter_id, request)
        .with("dimensions", "ym:s:regionCountry,ym:s:regionArea")
        .with("metrics", "ym:s:visits")
        .with("sort", "-ym:s:visits")
        .with("limit", request.param(MAX_RESULTS))
}

fn geo_area(counter_id: &str, request: &ReportRequest) -> QueryParameters {
    base(counter_id, request)
        .with("dimensions", "ym:s:regionArea,ym:s:regionCity")
        .with("metrics", "ym:s:visits")
        .with("sort", "-ym:s:visits")
        .with(
            "filters",
            format!("ym:s:regionCountry=='{}'", request.param(COUNTRY_ID)),
        )
        .with("limit", request.param(MAX_RESULTS))
}
