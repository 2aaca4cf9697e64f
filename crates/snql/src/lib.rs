//! snql - Metrics Query Language for Snuba
//!
//! Parses MQL strings into Timeseries/Formula trees, wraps them in a
//! `MetricsQuery` with a time range, rollup and scope, and prints the
//! result back out as an MQL request or as SnQL.
//!
//! ## Quick Start
//!
//! ```ignore
//! use snql::{MetricsQuery, MetricsScope, Rollup, parse_mql};
//!
//! let query = parse_mql(r#"sum(`d:transactions/duration@millisecond`){env:"prod"} by (transaction)"#)?
//!     .set_start(start)
//!     .set_end(end)
//!     .set_rollup(Rollup::interval(60).with_granularity(60))
//!     .set_scope(MetricsScope::new(vec![1], vec![11]));
//!
//! let request = query.serialize()?;
//! println!("{}", request.to_json());
//! ```
//!
//! ## Syntax
//!
//! - `sum(metric)`, `quantiles(0.5)(metric)` → aggregated timeseries
//! - `{tag:"value", !tag:[a, b], tag:prefix*}` → filters (`,`/`AND`, `OR`)
//! - `by (a, b)` → group by
//! - `+ - * /` between timeseries and numbers → formulas
//! - `apdex(sum(foo), 500)` → arbitrary function over a timeseries

pub mod ast;
mod optimize;
mod parse;
mod pretty;
mod query;
mod snql;
mod transform;

use thiserror::Error;

// ============ Primary Public API ============

pub use ast::ExpressionError;
pub use ast::Scalar;
pub use ast::core::{ArithmeticOperator, Formula, FormulaParameter, Metric, QueryExpr, Timeseries};
pub use ast::expr::{BooleanCondition, BooleanOp, Column, Condition, Expr, Filter, Function, Op};
pub use optimize::OrOptimizer;
pub use query::{
    Direction, IndexerMapping, MetricsQuery, MetricsScope, MqlContext, MqlRequest, Rollup,
    RollupContext,
};
pub use self::snql::SnqlPrinter;

/// Parse an MQL string into a `MetricsQuery` with only `query` set.
pub fn parse_mql(mql: &str) -> Result<MetricsQuery> {
    let surface = parse::parse(mql)?;
    let query = transform::transform(surface)?;
    log::debug!("parsed MQL {mql:?} into {}", kind(&query));
    Ok(MetricsQuery::new(query))
}

fn kind(query: &QueryExpr) -> &'static str {
    match query {
        QueryExpr::Timeseries(_) => "a timeseries",
        QueryExpr::Formula(_) => "a formula",
    }
}

// ============ Errors ============

#[derive(Error, Debug)]
pub enum SnqlError {
    #[error("Invalid metrics syntax: {0}")]
    Syntax(#[from] parse::ParseError),
    #[error("{0}")]
    InvalidQuery(String),
    #[error("{0}")]
    Expression(#[from] ExpressionError),
}

pub type Result<T> = std::result::Result<T, SnqlError>;

pub use parse::ParseError;

/// Lower-level passes for callers that need the intermediate trees.
pub mod advanced {
    pub use crate::parse::parse;
    pub use crate::pretty::{print_formula, print_query, print_timeseries};
    pub use crate::transform::transform;
}
