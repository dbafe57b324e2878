use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapt::AdaptedResult;
use crate::client::{MetrikaClient, ReportResponse};
use crate::error::ReportError;
use crate::models::QueryParameters;
use crate::period::{Period, DATE_FORMAT};
use crate::report::{self, ParamSpec, ReportKind};

pub struct AppState {
    pub client: Arc<MetrikaClient>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct CatalogEntry {
    pub key: ReportKind,
    pub description: &'static str,
    pub default_days: i64,
    pub params: &'static [ParamSpec],
}

#[derive(Serialize)]
pub struct ReportBody {
    #[serde(flatten)]
    pub response: ReportResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapted: Option<AdaptedResult>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn report_error(e: ReportError) -> ApiError {
    match e {
        ReportError::UnknownReport(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        ReportError::InvalidRequest(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// `/reports/{key}` query string, split into engine options and report parameters
#[derive(Debug, Default)]
struct ReportOptions {
    days: Option<i64>,
    period: Option<Period>,
    adapt: bool,
    overrides: Vec<(String, i64)>,
}

impl ReportOptions {
    fn from_query(mut params: BTreeMap<String, String>) -> Result<Self, ApiError> {
        let mut options = ReportOptions {
            adapt: params
                .remove("adapt")
                .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false),
            ..Default::default()
        };

        if let Some(days) = params.remove("days") {
            options.days = Some(parse_int("days", &days)?);
        }

        match (params.remove("date1"), params.remove("date2")) {
            (Some(start), Some(end)) => {
                if options.days.is_some() {
                    return Err(api_error(
                        StatusCode::BAD_REQUEST,
                        "use either days or date1/date2, not both",
                    ));
                }
                let period = Period::new(parse_date("date1", &start)?, parse_date("date2", &end)?)
                    .map_err(report_error)?;
                options.period = Some(period);
            }
            (None, None) => {}
            _ => {
                return Err(api_error(
                    StatusCode::BAD_REQUEST,
                    "date1 and date2 must be given together",
                ))
            }
        }

        for (name, value) in params {
            let value = parse_int(&name, &value)?;
            options.overrides.push((name, value));
        }

        Ok(options)
    }
}

fn parse_int(name: &str, value: &str) -> Result<i64, ApiError> {
    value.parse::<i64>().map_err(|_| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("{name} must be an integer, got '{value}'"),
        )
    })
}

fn parse_date(name: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("{name} must be a YYYY-MM-DD date, got '{value}'"),
        )
    })
}

/// List the report catalog
pub async fn list_reports() -> Json<Vec<CatalogEntry>> {
    Json(
        report::catalog()
            .map(|definition| CatalogEntry {
                key: definition.kind,
                description: definition.description,
                default_days: definition.default_days,
                params: definition.params,
            })
            .collect(),
    )
}

/// Run a catalog report
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<ReportBody>, ApiError> {
    let kind = name.parse::<ReportKind>().map_err(report_error)?;
    let options = ReportOptions::from_query(params)?;
    let overrides: Vec<(&str, i64)> = options
        .overrides
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .collect();

    let response = match options.period {
        Some(period) => {
            state
                .client
                .report_for_period(kind, period, &overrides)
                .await
        }
        None => state.client.report(kind, options.days, &overrides).await,
    }
    .map_err(report_error)?;

    let adapted = if options.adapt {
        response
            .adapt()
            .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?
    } else {
        None
    };

    Ok(Json(ReportBody { response, adapted }))
}

/// Pass an arbitrary query through to the API
pub async fn raw_request(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<ReportResponse>, ApiError> {
    if params.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "raw requests need at least one query parameter",
        ));
    }

    let query: QueryParameters = params.into_iter().collect();
    Ok(Json(state.client.raw_request(query).await))
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
