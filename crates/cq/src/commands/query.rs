//! Query command implementation.
//!
//! Builds a query over untyped JSON records and sends it to the remote
//! endpoint, or prints the request with `--dry-run`.

use std::fs;
use std::time::Duration;

use crudquery_client::models::PagedResult;
use crudquery_client::{QueryBuilder, QueryClient, QueryService, SelectQueryBuilder};
use crudquery_core::{CaseSensitivity, Projection};
use serde_json::Value;
use tracing::debug;

use super::config::Config;
use super::{parse_descriptors, CommandContext, CommandError, Result};
use crate::cli::QueryArgs;
use crate::output::{
    format_dry_run_json, format_dry_run_table, format_page_json, format_page_table,
    format_records_json, format_records_table,
};

/// Where and how queries are sent.
pub struct Connection {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Option<Duration>,
    pub case_sensitivity: CaseSensitivity,
}

impl Connection {
    /// Resolves connection settings with priority: flag/env > config.
    ///
    /// # Errors
    ///
    /// Returns a config error when no base URL is available or the config's
    /// case sensitivity is invalid.
    pub fn resolve(base_url: Option<&str>, token: Option<&str>, config: &Config) -> Result<Self> {
        let base_url = base_url
            .map(str::to_string)
            .or_else(|| config.base_url.clone())
            .ok_or_else(|| {
                CommandError::Config(
                    "No base URL configured. Pass --base-url, set CQ_BASE_URL, or set base_url in the config file."
                        .to_string(),
                )
            })?;

        Ok(Self {
            base_url,
            token: token.map(str::to_string).or_else(|| config.token.clone()),
            timeout: config.timeout(),
            case_sensitivity: config.query.case_sensitivity()?,
        })
    }

    pub fn client(&self) -> QueryClient {
        let mut builder = QueryClient::builder(&self.base_url);
        if let Some(token) = &self.token {
            builder = builder.token(token);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

/// A query ready to send, with or without a projection.
pub enum PreparedQuery {
    Records(QueryBuilder<Value>),
    Projected(SelectQueryBuilder<Value, Value>),
}

impl PreparedQuery {
    pub fn endpoint(&self, paged: bool) -> String {
        match self {
            Self::Records(query) => query.endpoint(paged),
            Self::Projected(query) => query.endpoint(paged),
        }
    }

    /// The JSON body that would be posted.
    pub fn body(&self) -> Result<Value> {
        let (search, plain) = match self {
            Self::Records(query) => (query.to_search_request()?, query.to_query_request()?),
            Self::Projected(query) => (query.to_search_request()?, query.to_query_request()?),
        };
        Ok(match search {
            Some(request) => serde_json::to_value(request)?,
            None => serde_json::to_value(plain)?,
        })
    }

    pub async fn list(&self) -> Result<Vec<Value>> {
        Ok(match self {
            Self::Records(query) => query.to_list().await?,
            Self::Projected(query) => query.to_list().await?,
        })
    }

    pub async fn page(&self) -> Result<PagedResult<Value>> {
        Ok(match self {
            Self::Records(query) => query.to_paged_result().await?,
            Self::Projected(query) => query.to_paged_result().await?,
        })
    }
}

/// Applies the command-line options to a query over `args.type_name`.
///
/// Filter errors are carried by the builder and surface when the request is
/// built. Only reading the filter file fails here.
pub fn prepare(
    service: &QueryService,
    args: &QueryArgs,
    case_sensitivity: CaseSensitivity,
) -> Result<PreparedQuery> {
    let mut query = service
        .for_name::<Value>(args.type_name.as_str())
        .case_sensitivity(case_sensitivity);

    if let Some(path) = &args.filter_file {
        let json = fs::read_to_string(path)?;
        for filter in parse_descriptors(&json)? {
            query = query.filter_descriptor(filter);
        }
    }
    for text in &args.where_ {
        query = query.filter_text(text);
    }

    if let Some(path) = &args.order {
        query = query.order_by_path(path.as_str(), args.desc);
    }
    for path in &args.include {
        query = query.include_path(path.as_str());
    }
    if args.auto_include {
        query = query.auto_include();
    }
    if let Some(skip) = args.skip {
        query = query.skip(skip);
    }
    if let Some(take) = args.take {
        query = query.take(take);
    }
    if let Some(term) = &args.search {
        query = query.search(term.as_str()).in_field_paths(args.field.iter().cloned());
    }

    debug!(
        record = %args.type_name,
        filters = query.plan().filters.len(),
        projected = !args.select.is_empty(),
        "prepared query"
    );

    Ok(if args.select.is_empty() {
        PreparedQuery::Records(query)
    } else {
        PreparedQuery::Projected(query.select(Projection::fields(args.select.iter().cloned())))
    })
}

/// Executes the query command.
pub async fn execute(ctx: &CommandContext, args: &QueryArgs, connection: &Connection) -> Result<()> {
    let service = QueryService::new(connection.client());
    let query = prepare(&service, args, connection.case_sensitivity)?;

    if args.dry_run {
        let endpoint = query.endpoint(args.paged);
        let body = query.body()?;
        if ctx.json_output {
            println!("{}", format_dry_run_json(&endpoint, &body)?);
        } else if !ctx.quiet {
            print!("{}", format_dry_run_table(&endpoint, &body, ctx.use_colors)?);
        }
        return Ok(());
    }

    if args.paged {
        let page = query.page().await?;
        if ctx.json_output {
            println!("{}", format_page_json(&page)?);
        } else if !ctx.quiet {
            print!("{}", format_page_table(&page, ctx.use_colors));
        }
    } else {
        let records = query.list().await?;
        if ctx.json_output {
            println!("{}", format_records_json(&records)?);
        } else if !ctx.quiet {
            print!("{}", format_records_table(&records, ctx.use_colors));
        }
    }

    Ok(())
}
