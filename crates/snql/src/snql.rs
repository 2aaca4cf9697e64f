//! SnQL printing
//!
//! Turns a validated `MetricsQuery` over a single Timeseries into the
//! clause-per-line SnQL string Snuba executes. Formulas have no SnQL form.

use chrono::{DateTime, Timelike, Utc};

use crate::SnqlError;
use crate::ast::Scalar;
use crate::ast::core::{QueryExpr, Timeseries};
use crate::ast::expr::{Column, Condition, Expr, Filter, Function, Op};
use crate::pretty::format_float;
use crate::query::{MetricsQuery, MetricsScope, Rollup};

type Result<T> = std::result::Result<T, SnqlError>;

const AGGREGATE_ALIAS: &str = "aggregate_value";
const TIME_ALIAS: &str = "time";

// ============ Expressions ============

pub fn scalar(value: &Scalar) -> String {
    match value {
        Scalar::Null => "NULL".to_string(),
        Scalar::Bool(true) => "TRUE".to_string(),
        Scalar::Bool(false) => "FALSE".to_string(),
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(n) => format_float(*n),
        Scalar::String(s) => {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('\'', "\\'")
                .replace('\n', "\\n");
            format!("'{escaped}'")
        }
        Scalar::Date(d) => format!("toDateTime('{}')", d.format("%Y-%m-%d")),
        Scalar::DateTime(dt) => {
            let utc = dt.naive_utc();
            let rendered = if utc.nanosecond() == 0 {
                utc.format("%Y-%m-%dT%H:%M:%S")
            } else {
                utc.format("%Y-%m-%dT%H:%M:%S%.6f")
            };
            format!("toDateTime('{rendered}')")
        }
        Scalar::Array(items) => format!("array({})", scalar_list(items)),
        Scalar::Tuple(items) => format!("tuple({})", scalar_list(items)),
    }
}

fn scalar_list(items: &[Scalar]) -> String {
    items.iter().map(scalar).collect::<Vec<_>>().join(", ")
}

pub fn expression(expr: &Expr) -> String {
    match expr {
        Expr::Column(c) => c.name.clone(),
        Expr::Function(f) => function(f),
        Expr::Scalar(s) => scalar(s),
    }
}

fn function(f: &Function) -> String {
    let mut out = f.function.clone();
    if let Some(initializers) = &f.initializers {
        out.push_str(&format!("({})", scalar_list(initializers)));
    }
    let params: Vec<String> = f.parameters.iter().map(expression).collect();
    out.push_str(&format!("({})", params.join(", ")));
    if let Some(alias) = &f.alias {
        out.push_str(&format!(" AS `{alias}`"));
    }
    out
}

pub fn condition(cond: &Condition) -> String {
    let lhs = expression(&cond.lhs);
    match &cond.rhs {
        Some(rhs) => format!("{lhs} {} {}", cond.op, expression(rhs)),
        None => format!("{lhs} {}", cond.op),
    }
}

pub fn filter(f: &Filter) -> String {
    match f {
        Filter::Condition(c) => condition(c),
        Filter::Boolean(b) => {
            let parts: Vec<String> = b.conditions.iter().map(filter).collect();
            format!("({})", parts.join(&format!(" {} ", b.op)))
        }
    }
}

// ============ Query ============

#[derive(Debug, Clone, Copy, Default)]
pub struct SnqlPrinter {
    pretty: bool,
}

impl SnqlPrinter {
    /// Single-line output.
    pub fn new() -> Self {
        SnqlPrinter { pretty: false }
    }

    /// One clause per line.
    pub fn pretty() -> Self {
        SnqlPrinter { pretty: true }
    }

    fn separator(&self) -> &'static str {
        if self.pretty { "\n" } else { " " }
    }

    pub fn print(&self, query: &MetricsQuery) -> Result<String> {
        let series = match query.query.as_ref() {
            Some(QueryExpr::Timeseries(t)) => t,
            Some(QueryExpr::Formula(_)) => {
                return Err(SnqlError::InvalidQuery(
                    "formula queries cannot be printed as SnQL".to_string(),
                ));
            }
            None => return Err(missing("query")),
        };
        let rollup = query.rollup.as_ref().ok_or_else(|| missing("rollup"))?;
        let scope = query.scope.as_ref().ok_or_else(|| missing("scope"))?;
        let start = query.start.ok_or_else(|| missing("start"))?;
        let end = query.end.ok_or_else(|| missing("end"))?;

        let entity = series.metric.entity.as_deref().ok_or_else(|| {
            SnqlError::InvalidQuery("metric.entity is required for serialization".to_string())
        })?;
        let metric_id = series.metric.id.ok_or_else(|| {
            SnqlError::InvalidQuery("metric.id is required for serialization".to_string())
        })?;

        let mut groupby = Vec::new();
        if let Some(interval) = rollup.interval {
            groupby.push(function(&time_bucket(interval)));
        }
        groupby.extend(series.groupby.iter().flatten().map(|c| c.name.clone()));

        let mut wheres = Vec::new();
        if let Some(granularity) = rollup.granularity {
            wheres.push(condition(&Condition::new(
                Column::new("granularity"),
                Op::Eq,
                granularity as i64,
            )));
        }
        wheres.push(condition(&Condition::new(
            Column::new("metric_id"),
            Op::Eq,
            metric_id,
        )));
        wheres.extend(series.filters.iter().flatten().map(filter));
        wheres.push(filter(&scope_filter(scope)));
        wheres.push(condition(&time_bound(Op::Gte, start)));
        wheres.push(condition(&time_bound(Op::Lt, end)));

        let mut clauses = vec![
            format!("MATCH ({entity})"),
            format!("SELECT {}", function(&select(series))),
        ];
        if !groupby.is_empty() {
            clauses.push(format!("BY {}", groupby.join(", ")));
        }
        clauses.push(format!("WHERE {}", wheres.join(" AND ")));
        if let Some(orderby) = orderby(rollup) {
            clauses.push(format!("ORDER BY {orderby}"));
        }
        if let Some(limit) = query.limit {
            clauses.push(format!("LIMIT {limit}"));
        }
        if let Some(offset) = query.offset {
            clauses.push(format!("OFFSET {offset}"));
        }
        if rollup.interval.is_some() && rollup.totals == Some(true) {
            clauses.push("TOTALS True".to_string());
        }

        let snql = clauses.join(self.separator());
        log::trace!("printed SnQL for {entity}: {snql}");
        Ok(snql)
    }
}

fn missing(field: &str) -> SnqlError {
    SnqlError::InvalidQuery(format!("{field} is required for a metrics query"))
}

fn select(series: &Timeseries) -> Function {
    let value = vec![Expr::Column(Column::new("value"))];
    let aggregate = match &series.aggregate_params {
        Some(params) => Function::curried(series.aggregate.as_str(), params.clone(), value),
        None => Function::new(series.aggregate.as_str(), value),
    };
    aggregate.alias(AGGREGATE_ALIAS)
}

fn time_bucket(interval: u32) -> Function {
    Function::new(
        "toStartOfInterval",
        vec![
            Column::new("timestamp").into(),
            Function::new("toIntervalSecond", vec![Expr::from(interval as i64)]).into(),
            "Universal".into(),
        ],
    )
    .alias(TIME_ALIAS)
}

fn orderby(rollup: &Rollup) -> Option<String> {
    if rollup.interval.is_some() {
        return Some(format!("{TIME_ALIAS} ASC"));
    }
    rollup
        .orderby
        .map(|direction| format!("{AGGREGATE_ALIAS} {}", direction.as_str()))
}

fn scope_filter(scope: &MetricsScope) -> Filter {
    let ids = |ids: &[u64]| Scalar::Array(ids.iter().map(|&id| Scalar::from(id)).collect());
    let mut conditions: Vec<Filter> = vec![
        Condition::new(Column::new("org_id"), Op::In, ids(&scope.org_ids)).into(),
        Condition::new(Column::new("project_id"), Op::In, ids(&scope.project_ids)).into(),
    ];
    if let Some(use_case_id) = &scope.use_case_id {
        conditions.push(Condition::new(Column::new("use_case_id"), Op::Eq, use_case_id.as_str()).into());
    }
    Filter::and(conditions)
}

fn time_bound(op: Op, at: DateTime<Utc>) -> Condition {
    Condition::new(
        Column::new("timestamp"),
        op,
        Scalar::DateTime(at.fixed_offset()),
    )
}
