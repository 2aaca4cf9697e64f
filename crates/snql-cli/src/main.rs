//! snql CLI
//!
//! Parses an MQL query, wraps it in a metrics query envelope and prints it
//! as an MQL request, SnQL, or the parsed tree.

use std::io::Read;

use anyhow::{Context, bail};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, ValueEnum};
use snql::{Direction, MetricsQuery, MetricsScope, QueryExpr, Rollup};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// MQL request payload as JSON
    Json,
    /// MQL string only
    Mql,
    /// SnQL, one clause per line
    Snql,
    /// Parsed Timeseries/Formula tree
    Ast,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Order {
    Asc,
    Desc,
}

#[derive(Parser)]
#[command(name = "snql")]
#[command(about = "Parse MQL and print it as an MQL request or SnQL")]
#[command(after_help = "\
EXAMPLES:
    # Serialize a query for the last hour, bucketed per minute
    snql 'sum(d:transactions/duration@millisecond){env:\"prod\"} by (transaction)' \\
        --org-id 1 --project-id 11 --use-case-id transactions

    # SnQL needs the storage entity and indexed metric id
    snql 'max(d:transactions/duration@millisecond)' --format snql \\
        --entity generic_metrics_distributions --metric-id 123 --org-id 1 --project-id 11

    # Read the query from stdin
    echo 'count(c:spans/count@none)' | snql --format ast
")]
struct Args {
    /// MQL query. Read from stdin when omitted.
    mql: Option<String>,

    #[arg(short, long, value_enum, default_value = "json")]
    format: Format,

    /// Range start (RFC 3339). Defaults to one hour before --end.
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Range end (RFC 3339). Defaults to now.
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    /// Bucket width in seconds
    #[arg(long, default_value = "60")]
    interval: u32,

    /// Storage granularity in seconds (10, 60, 3600 or 86400)
    #[arg(long, default_value = "60")]
    granularity: u32,

    /// Add totals across the whole range
    #[arg(long)]
    totals: bool,

    /// Order totals by aggregate value. Replaces the interval with totals.
    #[arg(long, value_enum)]
    orderby: Option<Order>,

    #[arg(long = "org-id")]
    org_ids: Vec<u64>,

    #[arg(long = "project-id")]
    project_ids: Vec<u64>,

    #[arg(long)]
    use_case_id: Option<String>,

    /// Entity to set on a single-timeseries query
    #[arg(long)]
    entity: Option<String>,

    /// Indexed metric id to set on a single-timeseries query
    #[arg(long)]
    metric_id: Option<u64>,

    #[arg(long)]
    limit: Option<u32>,

    #[arg(long)]
    offset: Option<u64>,

    /// Print the query as written, skipping the OR-to-IN rewrite
    #[arg(long)]
    no_optimize: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mql = match &args.mql {
        Some(mql) => mql.clone(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading MQL from stdin")?;
            buf
        }
    };

    let query = build_query(snql::parse_mql(&mql)?, &args)?;
    match args.format {
        Format::Json => {
            let request = if args.no_optimize {
                query.print()?
            } else {
                query.serialize()?
            };
            println!("{}", serde_json::to_string_pretty(&request.to_json())?);
        }
        Format::Mql => {
            let request = if args.no_optimize {
                query.print()?
            } else {
                query.serialize()?
            };
            println!("{}", request.mql);
        }
        Format::Snql => {
            let snql = if args.no_optimize {
                query.print_snql()?
            } else {
                query.serialize_snql()?
            };
            println!("{snql}");
        }
        Format::Ast => println!("{:#?}", query.query),
    }
    Ok(())
}

fn build_query(parsed: MetricsQuery, args: &Args) -> anyhow::Result<MetricsQuery> {
    let end = args.end.unwrap_or_else(Utc::now);
    let start = args.start.unwrap_or(end - Duration::hours(1));

    let rollup = match args.orderby {
        Some(order) => Rollup::totals(true).with_orderby(match order {
            Order::Asc => Direction::Asc,
            Order::Desc => Direction::Desc,
        }),
        None if args.totals => Rollup::interval(args.interval).with_totals(true),
        None => Rollup::interval(args.interval),
    }
    .with_granularity(args.granularity);

    let mut scope = MetricsScope::new(args.org_ids.clone(), args.project_ids.clone());
    if let Some(use_case_id) = &args.use_case_id {
        scope = scope.set_use_case_id(use_case_id.as_str());
    }

    let mut query = parsed
        .set_start(start)
        .set_end(end)
        .set_rollup(rollup)
        .set_scope(scope);
    if let Some(limit) = args.limit {
        query = query.set_limit(limit);
    }
    if let Some(offset) = args.offset {
        query = query.set_offset(offset);
    }

    if args.entity.is_some() || args.metric_id.is_some() {
        let Some(QueryExpr::Timeseries(series)) = query.query.clone() else {
            bail!("--entity and --metric-id only apply to a single timeseries query");
        };
        let mut metric = series.metric.clone();
        metric.entity = args.entity.clone().or(metric.entity);
        metric.id = args.metric_id.or(metric.id);
        log::info!("annotated metric: {metric:?}");
        query = query.set_query(series.set_metric(metric));
    }
    Ok(query)
}
