use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use metrika::config::Config;
use metrika::models::QueryParameters;
use metrika::period::Period;
use metrika::{api, report, MetrikaClient, ReportKind};

#[derive(Parser)]
#[command(name = "metrika")]
#[command(about = "Yandex Metrika report client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available reports
    List,
    /// Run a catalog report and print it as JSON
    Report {
        /// Report identifier, e.g. visits-views-users
        key: String,
        /// Number of days back from today (report default if omitted)
        #[arg(long, conflicts_with_all = ["from", "to"])]
        days: Option<i64>,
        /// Period start, YYYY-MM-DD
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        /// Period end, YYYY-MM-DD
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
        /// Report parameter as name=value, e.g. maxResults=5
        #[arg(long = "param", short = 'p')]
        params: Vec<String>,
        /// Print the adapted result instead of the raw response
        #[arg(long)]
        adapt: bool,
    },
    /// Send an arbitrary query to the API
    Raw {
        /// Query parameter as key=value, e.g. metrics=ym:s:visits
        #[arg(long = "param", short = 'p', required = true)]
        params: Vec<String>,
    },
    /// Serve reports over HTTP
    Serve,
}

fn split_param(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("parameter '{raw}' must look like name=value"))?;
    if name.is_empty() {
        bail!("parameter '{raw}' has an empty name");
    }
    Ok((name.to_string(), value.to_string()))
}

async fn connect() -> Result<(Config, MetrikaClient)> {
    let config = Config::from_env()?;
    let client = MetrikaClient::from_config(&config).await?;
    Ok((config, client))
}

fn print_catalog() {
    println!("{:<28} {:>5}  {:<32} {}", "Report", "Days", "Parameters", "Description");
    println!("{}", "-".repeat(100));
    for definition in report::catalog() {
        let params = definition
            .params
            .iter()
            .map(|p| format!("{}={}", p.name, p.default))
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:<28} {:>5}  {:<32} {}",
            definition.kind, definition.default_days, params, definition.description
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => print_catalog(),
        Commands::Report {
            key,
            days,
            from,
            to,
            params,
            adapt,
        } => {
            let kind: ReportKind = key.parse()?;
            let (_, client) = connect().await?;
            let mut overrides = Vec::with_capacity(params.len());
            for raw in &params {
                let (name, value) = split_param(raw)?;
                let value = value
                    .parse::<i64>()
                    .with_context(|| format!("{name} must be an integer"))?;
                overrides.push((name, value));
            }
            let overrides: Vec<(&str, i64)> = overrides
                .iter()
                .map(|(name, value)| (name.as_str(), *value))
                .collect();

            let response = match (from, to) {
                (Some(from), Some(to)) => {
                    client
                        .report_for_period(kind, Period::new(from, to)?, &overrides)
                        .await?
                }
                _ => client.report(kind, days, &overrides).await?,
            };

            if response.is_empty() {
                eprintln!("⚠ No data returned for {kind} (see log for details)");
            }

            let output = if adapt {
                json!({
                    "report": response.report,
                    "cache_hit": response.cache_hit,
                    "adapted": response.adapt()?,
                })
            } else {
                serde_json::to_value(&response)?
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Raw { params } => {
            let (_, client) = connect().await?;
            let mut query = QueryParameters::new();
            for raw in &params {
                let (name, value) = split_param(raw)?;
                query.insert(name, value);
            }

            let response = client.raw_request(query).await;
            if response.is_empty() {
                eprintln!("⚠ No data returned (see log for details)");
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Serve => {
            let (config, client) = connect().await?;
            let router = api::create_api_router(Arc::new(client));

            let addr = format!("{}:{}", config.api_server.host, config.api_server.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("🚀 Report server listening on http://{}", addr);
            info!("   - Catalog at http://{}/reports", addr);

            axum::serve(listener, router).await?;
        }
    }

    Ok(())
}
