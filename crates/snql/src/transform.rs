//! Transform surface AST to core AST
//!
//! This pass:
//! - Attaches aggregate names to the metrics they wrap
//! - Prepends outer filters and group-bys ahead of inner ones
//! - Folds arithmetic into `plus`/`minus`/`multiply`/`divide` formulas
//! - Rejects variables and aggregate-less arbitrary functions

use crate::SnqlError;
use crate::ast::Scalar;
use crate::ast::core::{
    ArithmeticOperator, Formula, FormulaParameter, Metric, NEGATE, QueryExpr, Timeseries,
};
use crate::ast::expr::{Column, Condition, Filter, Op};
use crate::ast::surface::{
    Call, Coefficient, Expression, Filter as SurfaceFilter, FilterExpr, FilterFactor, FilterTerm,
    Function, InnerFilter, MetricRef, Number, Param, TagKey, TagValue, Target, Term, Unary,
};

type Result<T> = std::result::Result<T, SnqlError>;

const VARIABLES_UNSUPPORTED: &str = "Variables are not supported yet";

/// Reduce a parsed MQL expression to its Timeseries or Formula root.
pub fn transform(expr: Expression) -> Result<QueryExpr> {
    match transform_expression(expr)? {
        FormulaParameter::Timeseries(t) => Ok(QueryExpr::Timeseries(t)),
        FormulaParameter::Formula(f) => Ok(QueryExpr::Formula(f)),
        other => Err(invalid(format!(
            "MQL query must be a Timeseries or Formula, got {other:?}"
        ))),
    }
}

fn invalid(message: impl Into<String>) -> SnqlError {
    SnqlError::InvalidQuery(message.into())
}

// ============ Arithmetic ============

fn transform_expression(expr: Expression) -> Result<FormulaParameter> {
    let first = transform_term(expr.first)?;
    expr.rest.into_iter().try_fold(first, |lhs, (op, rhs)| {
        Ok(arithmetic(op, lhs, transform_term(rhs)?))
    })
}

fn transform_term(term: Term) -> Result<FormulaParameter> {
    let first = transform_unary(term.first)?;
    term.rest.into_iter().try_fold(first, |lhs, (op, rhs)| {
        Ok(arithmetic(op, lhs, transform_unary(rhs)?))
    })
}

fn arithmetic(
    op: ArithmeticOperator,
    lhs: FormulaParameter,
    rhs: FormulaParameter,
) -> FormulaParameter {
    FormulaParameter::Formula(Formula::new(op, vec![lhs, rhs]))
}

fn transform_unary(unary: Unary) -> Result<FormulaParameter> {
    let value = transform_coefficient(unary.coefficient)?;
    if !unary.negated {
        return Ok(value);
    }
    match value {
        FormulaParameter::Int(n) => Ok(FormulaParameter::Int(-n)),
        FormulaParameter::Float(n) => Ok(FormulaParameter::Float(-n)),
        series @ (FormulaParameter::Timeseries(_) | FormulaParameter::Formula(_)) => {
            Ok(FormulaParameter::Formula(Formula::new(NEGATE, vec![series])))
        }
        FormulaParameter::String(s) => Err(invalid(format!(
            "Unary expression not supported for string \"{s}\""
        ))),
    }
}

fn transform_coefficient(coefficient: Coefficient) -> Result<FormulaParameter> {
    match coefficient {
        Coefficient::Number(Number::Int(n)) => Ok(FormulaParameter::Int(n)),
        Coefficient::Number(Number::Float(n)) => Ok(FormulaParameter::Float(n)),
        Coefficient::String(s) => Ok(FormulaParameter::String(s)),
        Coefficient::Filter(filter) => transform_filter(filter).map(FormulaParameter::from),
    }
}

// ============ Filters and pushdown ============

fn transform_filter(filter: SurfaceFilter) -> Result<QueryExpr> {
    let target = transform_target(filter.target)?;
    let target = match filter.filters {
        Some(expr) => prepend_filter(target, transform_filter_expr(expr)?),
        None => target,
    };
    match filter.group_by {
        Some(names) => Ok(prepend_groupby(target, columns(names)?)),
        None => Ok(target),
    }
}

fn prepend_filter(target: QueryExpr, condition: Filter) -> QueryExpr {
    let mut filters = vec![condition];
    filters.extend(target.filters().cloned().unwrap_or_default());
    target.set_filters(Some(filters))
}

fn prepend_groupby(target: QueryExpr, mut groupby: Vec<Column>) -> QueryExpr {
    groupby.extend(target.groupby().cloned().unwrap_or_default());
    target.set_groupby(Some(groupby))
}

fn columns(names: Vec<String>) -> Result<Vec<Column>> {
    names
        .into_iter()
        .map(|name| {
            let column = Column::new(name);
            column.validate()?;
            Ok(column)
        })
        .collect()
}

/// OR of AND terms. A single term is returned unwrapped.
fn transform_filter_expr(expr: FilterExpr) -> Result<Filter> {
    let mut terms = expr
        .0
        .into_iter()
        .map(transform_filter_term)
        .collect::<Result<Vec<_>>>()?;
    if terms.len() == 1 {
        return Ok(terms.remove(0));
    }
    Ok(Filter::or(terms))
}

fn transform_filter_term(term: FilterTerm) -> Result<Filter> {
    let mut factors = term
        .0
        .into_iter()
        .map(transform_filter_factor)
        .collect::<Result<Vec<_>>>()?;
    if factors.len() == 1 {
        return Ok(factors.remove(0));
    }
    Ok(Filter::and(factors))
}

fn transform_filter_factor(factor: FilterFactor) -> Result<Filter> {
    let (negated, key, value) = match factor {
        FilterFactor::Nested(expr) => return transform_filter_expr(expr),
        FilterFactor::Condition {
            negated,
            key,
            value,
        } => (negated, key, value),
    };
    let TagKey::Name(key) = key else {
        return Err(invalid(VARIABLES_UNSUPPORTED));
    };
    let lhs = Column::new(key);
    lhs.validate()?;

    let (op, rhs) = match (negated, value) {
        (_, TagValue::Variable(_)) => return Err(invalid(VARIABLES_UNSUPPORTED)),
        (false, TagValue::String(s)) => (Op::Eq, Scalar::String(s)),
        (false, TagValue::List(items)) => (Op::In, Scalar::from(items)),
        (false, TagValue::Wildcard(s)) => (Op::Like, Scalar::String(s)),
        (true, TagValue::String(s)) => (Op::Neq, Scalar::String(s)),
        (true, TagValue::List(items)) => (Op::NotIn, Scalar::from(items)),
        (true, TagValue::Wildcard(s)) => (Op::NotLike, Scalar::String(s)),
    };
    Ok(Filter::Condition(Condition::new(lhs, op, rhs)))
}

// ============ Targets and calls ============

fn transform_target(target: Target) -> Result<QueryExpr> {
    match target {
        Target::Variable(_) => Err(invalid(VARIABLES_UNSUPPORTED)),
        Target::Nested(expr) => match transform_expression(*expr)? {
            FormulaParameter::Timeseries(t) => Ok(QueryExpr::Timeseries(t)),
            FormulaParameter::Formula(f) => Ok(QueryExpr::Formula(f)),
            other => Err(invalid(format!(
                "parenthesized expression must be a Timeseries or Formula, got {other:?}"
            ))),
        },
        Target::Function(function) => transform_function(*function),
        Target::Metric(metric) => Ok(QueryExpr::Timeseries(Timeseries::unaggregated(
            transform_metric(metric)?,
        ))),
    }
}

fn transform_metric(metric: MetricRef) -> Result<Metric> {
    let metric = match metric {
        MetricRef::Mri(mri) => Metric::mri(mri),
        MetricRef::PublicName(name) => Metric::public_name(name),
    };
    metric.validate()?;
    Ok(metric)
}

fn transform_function(function: Function) -> Result<QueryExpr> {
    let target = match function.call {
        Call::Aggregate { name, inner } => reduce_aggregate(name, transform_inner_filter(inner)?),
        Call::CurriedAggregate {
            name,
            params,
            inner,
        } => QueryExpr::Timeseries(
            transform_inner_filter(inner)?.set_aggregate(name, Some(parameters(params))),
        ),
        Call::Arbitrary { name, args } => reduce_arbitrary(name, arguments(args)?)?,
        Call::CurriedArbitrary { name, params, args } => {
            reduce_curried_arbitrary(name, parameters(params), arguments(args)?)?
        }
    };
    match function.group_by {
        Some(names) => Ok(prepend_groupby(target, columns(names)?)),
        None => Ok(target),
    }
}

fn transform_inner_filter(inner: InnerFilter) -> Result<Timeseries> {
    let filters = inner
        .filters
        .map(|expr| transform_filter_expr(expr).map(|f| vec![f]))
        .transpose()?;
    let groupby = inner.group_by.map(columns).transpose()?;
    Ok(Timeseries::unaggregated(transform_metric(inner.metric)?)
        .set_filters(filters)
        .set_groupby(groupby))
}

/// `name(target)`: names the placeholder aggregate, or wraps an already
/// aggregated series as a function call.
fn reduce_aggregate(name: String, target: Timeseries) -> QueryExpr {
    if target.has_aggregate() {
        QueryExpr::Formula(Formula::new(name, vec![target.into()]))
    } else {
        QueryExpr::Timeseries(target.set_aggregate(name, None))
    }
}

fn reduce_arbitrary(name: String, args: Vec<FormulaParameter>) -> Result<QueryExpr> {
    if let Some(FormulaParameter::Timeseries(t)) = args.first()
        && !t.has_aggregate()
    {
        return Err(invalid(
            "Cannot use arbitrary functions on a Timeseries without an aggregate",
        ));
    }
    Ok(QueryExpr::Formula(Formula::new(name, args)))
}

fn reduce_curried_arbitrary(
    name: String,
    params: Vec<Scalar>,
    mut args: Vec<FormulaParameter>,
) -> Result<QueryExpr> {
    if let Some(FormulaParameter::Timeseries(t)) = args.first()
        && !t.has_aggregate()
    {
        if args.len() > 1 {
            return Err(invalid(format!(
                "curried aggregate {name} takes a single timeseries argument"
            )));
        }
        if let Some(FormulaParameter::Timeseries(target)) = args.pop() {
            return Ok(QueryExpr::Timeseries(
                target.set_aggregate(name, Some(params)),
            ));
        }
    }
    Ok(QueryExpr::Formula(
        Formula::new(name, args).set_aggregate_params(Some(params)),
    ))
}

fn arguments(args: Vec<Expression>) -> Result<Vec<FormulaParameter>> {
    args.into_iter().map(transform_expression).collect()
}

fn parameters(params: Vec<Param>) -> Vec<Scalar> {
    params
        .into_iter()
        .map(|p| match p {
            Param::Number(Number::Int(n)) => Scalar::Int(n),
            Param::Number(Number::Float(n)) => Scalar::Float(n),
            Param::String(s) => Scalar::String(s),
        })
        .collect()
}
