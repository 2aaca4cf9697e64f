//! MQL printing
//!
//! Renders Timeseries and Formula trees back into MQL text that the parser
//! reads into the same tree. Tag values are always double-quoted.

use std::fmt::{self, Display};
use std::sync::LazyLock;

use regex::Regex;

use crate::SnqlError;
use crate::ast::Scalar;
use crate::ast::core::{
    ArithmeticOperator, Formula, FormulaParameter, Metric, NEGATE, QueryExpr, Timeseries,
};
use crate::ast::expr::{BooleanOp, Column, Condition, Expr, Filter, Op};

type Result<T> = std::result::Result<T, SnqlError>;

/// Values the parser reads back as a suffix wildcard: `abc*`.
static WILDCARD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[^,\[\]"{}()\s*]+\*$"#).expect("wildcard regex is valid")
});

/// Tag keys and group-by names the grammar accepts.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.]+$").expect("name regex is valid"));

// ============ Display for operator tags ============

impl Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.infix())
    }
}

/// Floats always keep a fractional digit so they reparse as floats.
pub(crate) fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{n:.1}")
    } else {
        format!("{n}")
    }
}

fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

// ============ Queries ============

/// Print a query root as MQL.
pub fn print_query(query: &QueryExpr) -> Result<String> {
    match query {
        QueryExpr::Timeseries(t) => print_timeseries(t),
        QueryExpr::Formula(f) => print_formula(f),
    }
}

pub fn print_timeseries(ts: &Timeseries) -> Result<String> {
    let metric = metric_ref(&ts.metric)?;
    let mut out = if ts.has_aggregate() {
        format!(
            "{}{}({metric})",
            ts.aggregate,
            aggregate_params(&ts.aggregate_params)?
        )
    } else {
        metric
    };
    out.push_str(&filters(&ts.filters)?);
    out.push_str(&groupby(&ts.groupby)?);
    Ok(out)
}

pub fn print_formula(formula: &Formula) -> Result<String> {
    let params = formula
        .parameters
        .iter()
        .map(parameter)
        .collect::<Result<Vec<_>>>()?;

    let suffix = format!(
        "{}{}",
        filters(&formula.filters)?,
        groupby(&formula.groupby)?
    );
    let out = match (formula.operator(), &formula.aggregate_params) {
        (Some(op), None) => format!("({})", params.join(&format!(" {op} "))),
        _ if formula.function_name == NEGATE => {
            let negated = format!(
                "-{}({})",
                aggregate_params(&formula.aggregate_params)?,
                params.join(", ")
            );
            // Braces directly after `-(x)` would bind to `x`.
            if suffix.is_empty() {
                negated
            } else {
                format!("({negated})")
            }
        }
        _ => format!(
            "{}{}({})",
            formula.function_name,
            aggregate_params(&formula.aggregate_params)?,
            params.join(", ")
        ),
    };
    Ok(out + &suffix)
}

fn parameter(param: &FormulaParameter) -> Result<String> {
    match param {
        FormulaParameter::Formula(f) => print_formula(f),
        FormulaParameter::Timeseries(t) => print_timeseries(t),
        FormulaParameter::Int(n) => Ok(n.to_string()),
        FormulaParameter::Float(n) => Ok(format_float(*n)),
        FormulaParameter::String(s) => Ok(quote(s)),
    }
}

fn metric_ref(metric: &Metric) -> Result<String> {
    if let Some(mri) = &metric.mri {
        let bare = mri
            .chars()
            .all(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '{' | '}' | '[' | ']' | '"' | '`' | ','));
        return Ok(if bare { mri.clone() } else { format!("`{mri}`") });
    }
    metric.public_name.clone().ok_or_else(|| {
        SnqlError::InvalidQuery(
            "metric.mri or metric.public_name is required for serialization".to_string(),
        )
    })
}

/// `(p1, p2)` after an aggregate name; empty when there are no params.
fn aggregate_params(params: &Option<Vec<Scalar>>) -> Result<String> {
    let Some(params) = params else {
        return Ok(String::new());
    };
    let rendered = params
        .iter()
        .map(|p| match p {
            Scalar::Int(n) => Ok(n.to_string()),
            Scalar::Float(n) => Ok(format_float(*n)),
            Scalar::String(s) => Ok(quote(s)),
            other => Err(SnqlError::InvalidQuery(format!(
                "aggregate parameter {other:?} cannot be printed as MQL"
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("({})", rendered.join(", ")))
}

// ============ Filters and group by ============

fn filters(filters: &Option<Vec<Filter>>) -> Result<String> {
    match filters {
        Some(list) if !list.is_empty() => {
            let rendered = list.iter().map(filter).collect::<Result<Vec<_>>>()?;
            Ok(format!("{{{}}}", rendered.join(" AND ")))
        }
        _ => Ok(String::new()),
    }
}

fn groupby(groupby: &Option<Vec<Column>>) -> Result<String> {
    match groupby {
        Some(columns) if !columns.is_empty() => {
            let names = columns
                .iter()
                .map(|c| mql_name(c, "group by"))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!(" by ({})", names.join(", ")))
        }
        _ => Ok(String::new()),
    }
}

fn mql_name<'a>(column: &'a Column, role: &str) -> Result<&'a str> {
    if NAME_RE.is_match(&column.name) {
        Ok(&column.name)
    } else {
        Err(SnqlError::InvalidQuery(format!(
            "column '{}' cannot be used as an MQL {role} name",
            column.name
        )))
    }
}

fn filter(filter: &Filter) -> Result<String> {
    match filter {
        Filter::Condition(c) => condition(c),
        Filter::Boolean(b) => {
            let parts = b.conditions.iter().map(self::filter).collect::<Result<Vec<_>>>()?;
            Ok(format!("({})", parts.join(&format!(" {} ", b.op))))
        }
    }
}

fn condition(cond: &Condition) -> Result<String> {
    let Expr::Column(column) = &cond.lhs else {
        return Err(SnqlError::InvalidQuery(
            "MQL filters only support column conditions".to_string(),
        ));
    };
    let Some(Expr::Scalar(rhs)) = &cond.rhs else {
        return Err(SnqlError::InvalidQuery(format!(
            "MQL filter on {} needs a literal value",
            column.name
        )));
    };
    let key = mql_name(column, "tag")?;
    let (negated, value) = match cond.op {
        Op::Eq => (false, exact_value(rhs)?),
        Op::Neq => (true, exact_value(rhs)?),
        Op::Like => (false, wildcard_value(rhs)?),
        Op::NotLike => (true, wildcard_value(rhs)?),
        Op::In => (false, tag_list(rhs)?),
        Op::NotIn => (true, tag_list(rhs)?),
        other => {
            return Err(SnqlError::InvalidQuery(format!(
                "operator {other} is not supported in MQL filters"
            )));
        }
    };
    let bang = if negated { "!" } else { "" };
    Ok(format!("{bang}{key}:{value}"))
}

/// MQL tag values are always strings.
fn tag_string(value: &Scalar) -> Result<&str> {
    match value {
        Scalar::String(s) => Ok(s),
        other => Err(SnqlError::InvalidQuery(format!(
            "{other:?} cannot be used as an MQL tag value, tag values are strings"
        ))),
    }
}

fn exact_value(value: &Scalar) -> Result<String> {
    let s = tag_string(value)?;
    if WILDCARD_RE.is_match(s) {
        return Err(SnqlError::InvalidQuery(format!(
            "value \"{s}\" would read back as a wildcard match"
        )));
    }
    Ok(quote(s))
}

/// Only `prefix*` patterns have an MQL form. They print unescaped since
/// the wildcard production reads the quoted text verbatim.
fn wildcard_value(value: &Scalar) -> Result<String> {
    let s = tag_string(value)?;
    if !WILDCARD_RE.is_match(s) {
        return Err(SnqlError::InvalidQuery(format!(
            "pattern \"{s}\" is not a prefix wildcard and has no MQL form"
        )));
    }
    Ok(format!("\"{s}\""))
}

fn tag_list(value: &Scalar) -> Result<String> {
    let (Scalar::Array(items) | Scalar::Tuple(items)) = value else {
        return Err(SnqlError::InvalidQuery(format!(
            "{value:?} cannot be used as an MQL tag list"
        )));
    };
    let rendered = items
        .iter()
        .map(|item| tag_string(item).map(quote))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!("[{}]", rendered.join(", ")))
}
