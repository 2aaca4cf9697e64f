//! Metrics query envelope
//!
//! `MetricsQuery` pairs a Timeseries/Formula root with the time range, rollup
//! and scope needed to run it. Setters consume the query and return an
//! updated copy.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::ExpressionError;
use crate::ast::core::QueryExpr;
use crate::optimize::OrOptimizer;
use crate::snql::SnqlPrinter;
use crate::{SnqlError, pretty};

type Result<T> = std::result::Result<T, SnqlError>;

pub const ALLOWED_GRANULARITIES: [u32; 4] = [10, 60, 3600, 86400];
pub const MAX_LIMIT: u32 = 10_000;

// ============ Rollup ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Time bucketing for a metrics query. Either `interval` buckets the
/// series over time, or `totals` collapses it to one value per group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rollup {
    pub interval: Option<u32>,
    pub totals: Option<bool>,
    pub orderby: Option<Direction>,
    pub granularity: Option<u32>,
}

impl Rollup {
    pub fn interval(interval: u32) -> Self {
        Rollup {
            interval: Some(interval),
            ..Rollup::default()
        }
    }

    pub fn totals(totals: bool) -> Self {
        Rollup {
            totals: Some(totals),
            ..Rollup::default()
        }
    }

    pub fn with_totals(self, totals: bool) -> Self {
        Rollup {
            totals: Some(totals),
            ..self
        }
    }

    pub fn with_orderby(self, orderby: Direction) -> Self {
        Rollup {
            orderby: Some(orderby),
            ..self
        }
    }

    pub fn with_granularity(self, granularity: u32) -> Self {
        Rollup {
            granularity: Some(granularity),
            ..self
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ExpressionError> {
        if let Some(granularity) = self.granularity
            && !ALLOWED_GRANULARITIES.contains(&granularity)
        {
            return Err(ExpressionError::Rollup(format!(
                "granularity must be an integer and one of {ALLOWED_GRANULARITIES:?}"
            )));
        }
        if let Some(interval) = self.interval {
            if interval < 10 {
                return Err(ExpressionError::Rollup(format!(
                    "interval '{interval}' must be at least 10"
                )));
            }
            if let Some(granularity) = self.granularity
                && interval < granularity
            {
                return Err(ExpressionError::Rollup(
                    "interval must be greater than or equal to granularity".to_string(),
                ));
            }
        }
        if self.interval.is_none() && self.totals.is_none() {
            return Err(ExpressionError::Rollup(
                "Rollup must have at least one of interval or totals".to_string(),
            ));
        }
        if self.interval.is_some() && self.orderby.is_some() {
            return Err(ExpressionError::Rollup(
                "Timeseries queries can't be ordered when using interval".to_string(),
            ));
        }
        Ok(())
    }
}

// ============ Scope ============

/// Which organizations, projects and use case a query may read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetricsScope {
    pub org_ids: Vec<u64>,
    pub project_ids: Vec<u64>,
    pub use_case_id: Option<String>,
}

impl MetricsScope {
    pub fn new(org_ids: Vec<u64>, project_ids: Vec<u64>) -> Self {
        MetricsScope {
            org_ids,
            project_ids,
            use_case_id: None,
        }
    }

    pub fn set_use_case_id(self, use_case_id: impl Into<String>) -> Self {
        MetricsScope {
            use_case_id: Some(use_case_id.into()),
            ..self
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ExpressionError> {
        if let Some(use_case_id) = &self.use_case_id
            && use_case_id.is_empty()
        {
            return Err(ExpressionError::Scope(
                "use_case_id must be a non-empty string".to_string(),
            ));
        }
        Ok(())
    }
}

// ============ Serialized payload ============

/// Indexer mapping value: a resolved string or integer id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexerMapping {
    String(String),
    Int(i64),
}

impl From<&str> for IndexerMapping {
    fn from(s: &str) -> Self {
        IndexerMapping::String(s.to_string())
    }
}

impl From<i64> for IndexerMapping {
    fn from(n: i64) -> Self {
        IndexerMapping::Int(n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollupContext {
    pub orderby: Option<Direction>,
    pub granularity: Option<u32>,
    pub interval: Option<u32>,
    pub with_totals: Option<String>,
}

impl From<&Rollup> for RollupContext {
    fn from(rollup: &Rollup) -> Self {
        RollupContext {
            orderby: rollup.orderby,
            granularity: rollup.granularity,
            interval: rollup.interval,
            with_totals: rollup
                .totals
                .map(|t| if t { "True" } else { "False" }.to_string()),
        }
    }
}

/// Everything about a metrics query that MQL text cannot carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqlContext {
    pub entity: Option<String>,
    pub start: String,
    pub end: String,
    pub rollup: RollupContext,
    pub scope: MetricsScope,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
    pub indexer_mappings: IndexMap<String, IndexerMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqlRequest {
    pub mql: String,
    pub mql_context: MqlContext,
}

impl MqlRequest {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "mql": self.mql,
            "mql_context": self.mql_context,
        })
    }
}

// ============ MetricsQuery ============

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsQuery {
    pub query: Option<QueryExpr>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub rollup: Option<Rollup>,
    pub scope: Option<MetricsScope>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
    pub indexer_mappings: IndexMap<String, IndexerMapping>,
}

impl MetricsQuery {
    pub fn new(query: impl Into<QueryExpr>) -> Self {
        MetricsQuery {
            query: Some(query.into()),
            ..MetricsQuery::default()
        }
    }

    pub fn set_query(self, query: impl Into<QueryExpr>) -> Self {
        MetricsQuery {
            query: Some(query.into()),
            ..self
        }
    }

    pub fn set_start(self, start: DateTime<Utc>) -> Self {
        MetricsQuery {
            start: Some(start),
            ..self
        }
    }

    pub fn set_end(self, end: DateTime<Utc>) -> Self {
        MetricsQuery {
            end: Some(end),
            ..self
        }
    }

    pub fn set_rollup(self, rollup: Rollup) -> Self {
        MetricsQuery {
            rollup: Some(rollup),
            ..self
        }
    }

    pub fn set_scope(self, scope: MetricsScope) -> Self {
        MetricsQuery {
            scope: Some(scope),
            ..self
        }
    }

    pub fn set_limit(self, limit: u32) -> Self {
        MetricsQuery {
            limit: Some(limit),
            ..self
        }
    }

    pub fn set_offset(self, offset: u64) -> Self {
        MetricsQuery {
            offset: Some(offset),
            ..self
        }
    }

    pub fn set_indexer_mappings(self, indexer_mappings: IndexMap<String, IndexerMapping>) -> Self {
        MetricsQuery {
            indexer_mappings,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        let query = self
            .query
            .as_ref()
            .ok_or_else(|| required("query"))?;
        query.validate()?;

        self.start.ok_or_else(|| required("start"))?;
        self.end.ok_or_else(|| required("end"))?;

        let rollup = self.rollup.as_ref().ok_or_else(|| required("rollup"))?;
        // Granularity has to be known before printing.
        if rollup.granularity.is_none() {
            return Err(SnqlError::InvalidQuery(
                "granularity must be set on the rollup".to_string(),
            ));
        }
        rollup.validate()?;

        self.scope.as_ref().ok_or_else(|| required("scope"))?.validate()?;

        if let Some(limit) = self.limit {
            if limit < 1 {
                return Err(SnqlError::InvalidQuery(format!(
                    "limit '{limit}' must be at least 1"
                )));
            }
            if limit > MAX_LIMIT {
                return Err(SnqlError::InvalidQuery(format!(
                    "limit '{limit}' is capped at 10,000"
                )));
            }
        }
        Ok(())
    }

    /// Validate, collapse OR-of-equality filters, and print the MQL payload.
    pub fn serialize(&self) -> Result<MqlRequest> {
        self.validate()?;
        let optimized = self.optimized();
        let request = optimized.mql_request()?;
        log::debug!("serialized metrics query: {}", request.mql);
        Ok(request)
    }

    /// Validate and print the MQL payload exactly as written.
    pub fn print(&self) -> Result<MqlRequest> {
        self.validate()?;
        self.mql_request()
    }

    /// Validate, optimize and print a single-line SnQL query.
    pub fn serialize_snql(&self) -> Result<String> {
        self.validate()?;
        SnqlPrinter::new().print(&self.optimized())
    }

    /// Validate and print newline-separated SnQL without optimizing.
    pub fn print_snql(&self) -> Result<String> {
        self.validate()?;
        SnqlPrinter::pretty().print(self)
    }

    fn optimized(&self) -> MetricsQuery {
        MetricsQuery {
            query: self
                .query
                .clone()
                .map(|q| OrOptimizer::new().optimize_query(q)),
            ..self.clone()
        }
    }

    fn mql_request(&self) -> Result<MqlRequest> {
        let query = self.query.as_ref().ok_or_else(|| required("query"))?;
        let start = self.start.ok_or_else(|| required("start"))?;
        let end = self.end.ok_or_else(|| required("end"))?;
        let rollup = self.rollup.as_ref().ok_or_else(|| required("rollup"))?;
        let scope = self.scope.clone().ok_or_else(|| required("scope"))?;

        Ok(MqlRequest {
            mql: pretty::print_query(query)?,
            mql_context: MqlContext {
                entity: query.entity().map(str::to_string),
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
                rollup: RollupContext::from(rollup),
                scope,
                limit: self.limit,
                offset: self.offset,
                indexer_mappings: self.indexer_mappings.clone(),
            },
        })
    }
}

fn required(field: &str) -> SnqlError {
    SnqlError::InvalidQuery(format!("{field} is required for a metrics query"))
}
