//! Core AST - what the printers consume
//!
//! Timeseries and Formula nodes are immutable values. The `set_*` methods
//! consume the node and hand back an updated copy.

use std::sync::LazyLock;

use regex::Regex;

use super::expr::{Column, Filter};
use super::{ExpressionError, Scalar};

/// Aggregate name a Timeseries carries between reducing its metric and
/// reducing the enclosing aggregate call.
pub const AGGREGATE_PLACEHOLDER: &str = "AGGREGATE_PLACEHOLDER";

static MRI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^:]+:[^/]+/[^@]+@.+$").expect("mri regex is valid"));

// ============ Metric ============

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Metric {
    pub public_name: Option<String>,
    pub mri: Option<String>,
    pub id: Option<u64>,
    pub entity: Option<String>,
}

impl Metric {
    /// Build and validate a metric from any combination of identifiers.
    pub fn new(
        public_name: Option<String>,
        mri: Option<String>,
        id: Option<u64>,
    ) -> Result<Self, ExpressionError> {
        let metric = Metric {
            public_name,
            mri,
            id,
            entity: None,
        };
        metric.validate()?;
        Ok(metric)
    }

    pub fn public_name(name: impl Into<String>) -> Self {
        Metric {
            public_name: Some(name.into()),
            ..Metric::default()
        }
    }

    pub fn mri(mri: impl Into<String>) -> Self {
        Metric {
            mri: Some(mri.into()),
            ..Metric::default()
        }
    }

    pub fn id(id: u64) -> Self {
        Metric {
            id: Some(id),
            ..Metric::default()
        }
    }

    pub fn with_public_name(self, name: impl Into<String>) -> Self {
        Metric {
            public_name: Some(name.into()),
            ..self
        }
    }

    pub fn with_mri(self, mri: impl Into<String>) -> Self {
        Metric {
            mri: Some(mri.into()),
            ..self
        }
    }

    pub fn with_id(self, id: u64) -> Self {
        Metric {
            id: Some(id),
            ..self
        }
    }

    pub fn with_entity(self, entity: impl Into<String>) -> Self {
        Metric {
            entity: Some(entity.into()),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ExpressionError> {
        if self.public_name.is_none() && self.mri.is_none() && self.id.is_none() {
            return Err(ExpressionError::Metric(
                "Metric must have at least one of public_name, mri or id".to_string(),
            ));
        }
        if let Some(name) = &self.public_name
            && name.trim().is_empty()
        {
            return Err(ExpressionError::Metric(
                "public_name must be a non-empty string".to_string(),
            ));
        }
        if let Some(mri) = &self.mri
            && !MRI_RE.is_match(mri)
        {
            return Err(ExpressionError::Metric(format!(
                "mri '{mri}' must have the shape type:namespace/name@unit"
            )));
        }
        if let Some(entity) = &self.entity
            && entity.trim().is_empty()
        {
            return Err(ExpressionError::Metric(
                "entity must be a non-empty string".to_string(),
            ));
        }
        Ok(())
    }
}

// ============ Timeseries ============

#[derive(Debug, Clone, PartialEq)]
pub struct Timeseries {
    pub metric: Metric,
    pub aggregate: String,
    pub aggregate_params: Option<Vec<Scalar>>,
    pub filters: Option<Vec<Filter>>,
    pub groupby: Option<Vec<Column>>,
}

impl Timeseries {
    pub fn new(metric: Metric, aggregate: impl Into<String>) -> Self {
        Timeseries {
            metric,
            aggregate: aggregate.into(),
            aggregate_params: None,
            filters: None,
            groupby: None,
        }
    }

    /// A timeseries whose aggregate is attached later by an enclosing call.
    pub fn unaggregated(metric: Metric) -> Self {
        Timeseries::new(metric, AGGREGATE_PLACEHOLDER)
    }

    pub fn has_aggregate(&self) -> bool {
        self.aggregate != AGGREGATE_PLACEHOLDER
    }

    pub fn set_metric(self, metric: Metric) -> Self {
        Timeseries { metric, ..self }
    }

    pub fn set_aggregate(
        self,
        aggregate: impl Into<String>,
        aggregate_params: Option<Vec<Scalar>>,
    ) -> Self {
        Timeseries {
            aggregate: aggregate.into(),
            aggregate_params,
            ..self
        }
    }

    pub fn set_filters(self, filters: Option<Vec<Filter>>) -> Self {
        Timeseries { filters, ..self }
    }

    pub fn set_groupby(self, groupby: Option<Vec<Column>>) -> Self {
        Timeseries { groupby, ..self }
    }

    pub fn validate(&self) -> Result<(), ExpressionError> {
        self.metric.validate()?;
        if !self.has_aggregate() {
            return Err(ExpressionError::Timeseries(
                "aggregate must be set on a timeseries".to_string(),
            ));
        }
        if self.aggregate.is_empty() {
            return Err(ExpressionError::Timeseries(
                "aggregate must be a non-empty string".to_string(),
            ));
        }
        if let Some(params) = &self.aggregate_params
            && params.iter().any(|p| !p.is_parameter_literal())
        {
            return Err(ExpressionError::Timeseries(
                "aggregate_params can only be literal types".to_string(),
            ));
        }
        validate_filters_and_groupby(&self.filters, &self.groupby)
    }
}

fn validate_filters_and_groupby(
    filters: &Option<Vec<Filter>>,
    groupby: &Option<Vec<Column>>,
) -> Result<(), ExpressionError> {
    filters.iter().flatten().try_for_each(Filter::validate)?;
    groupby.iter().flatten().try_for_each(Column::validate)
}

// ============ Formula ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl ArithmeticOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            ArithmeticOperator::Plus => "plus",
            ArithmeticOperator::Minus => "minus",
            ArithmeticOperator::Multiply => "multiply",
            ArithmeticOperator::Divide => "divide",
        }
    }

    pub fn infix(self) -> &'static str {
        match self {
            ArithmeticOperator::Plus => "+",
            ArithmeticOperator::Minus => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "plus" => Some(ArithmeticOperator::Plus),
            "minus" => Some(ArithmeticOperator::Minus),
            "multiply" => Some(ArithmeticOperator::Multiply),
            "divide" => Some(ArithmeticOperator::Divide),
            _ => None,
        }
    }
}

impl From<ArithmeticOperator> for String {
    fn from(op: ArithmeticOperator) -> Self {
        op.as_str().to_string()
    }
}

/// Function name the parser gives unary minus over a series.
pub const NEGATE: &str = "negate";

#[derive(Debug, Clone, PartialEq)]
pub enum FormulaParameter {
    Formula(Formula),
    Timeseries(Timeseries),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<Formula> for FormulaParameter {
    fn from(f: Formula) -> Self {
        FormulaParameter::Formula(f)
    }
}

impl From<Timeseries> for FormulaParameter {
    fn from(t: Timeseries) -> Self {
        FormulaParameter::Timeseries(t)
    }
}

impl From<i64> for FormulaParameter {
    fn from(n: i64) -> Self {
        FormulaParameter::Int(n)
    }
}

impl From<i32> for FormulaParameter {
    fn from(n: i32) -> Self {
        FormulaParameter::Int(n.into())
    }
}

impl From<f64> for FormulaParameter {
    fn from(n: f64) -> Self {
        FormulaParameter::Float(n)
    }
}

impl From<&str> for FormulaParameter {
    fn from(s: &str) -> Self {
        FormulaParameter::String(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub function_name: String,
    pub aggregate_params: Option<Vec<Scalar>>,
    pub parameters: Vec<FormulaParameter>,
    pub filters: Option<Vec<Filter>>,
    pub groupby: Option<Vec<Column>>,
}

impl Formula {
    pub fn new(function_name: impl Into<String>, parameters: Vec<FormulaParameter>) -> Self {
        Formula {
            function_name: function_name.into(),
            aggregate_params: None,
            parameters,
            filters: None,
            groupby: None,
        }
    }

    pub fn arithmetic(
        op: ArithmeticOperator,
        lhs: impl Into<FormulaParameter>,
        rhs: impl Into<FormulaParameter>,
    ) -> Self {
        Formula::new(op, vec![lhs.into(), rhs.into()])
    }

    pub fn operator(&self) -> Option<ArithmeticOperator> {
        ArithmeticOperator::from_name(&self.function_name)
    }

    pub fn set_aggregate_params(self, aggregate_params: Option<Vec<Scalar>>) -> Self {
        Formula {
            aggregate_params,
            ..self
        }
    }

    pub fn set_parameters(self, parameters: Vec<FormulaParameter>) -> Self {
        Formula { parameters, ..self }
    }

    pub fn set_filters(self, filters: Option<Vec<Filter>>) -> Self {
        Formula { filters, ..self }
    }

    pub fn set_groupby(self, groupby: Option<Vec<Column>>) -> Self {
        Formula { groupby, ..self }
    }

    pub fn validate(&self) -> Result<(), ExpressionError> {
        if self.function_name.is_empty() {
            return Err(ExpressionError::Formula(
                "formula function_name must be a non-empty string".to_string(),
            ));
        }
        if self.parameters.is_empty() {
            return Err(ExpressionError::Formula(format!(
                "formula {} requires at least one parameter",
                self.function_name
            )));
        }
        if self.operator().is_some() && self.parameters.len() != 2 {
            return Err(ExpressionError::Formula(format!(
                "arithmetic formula {} requires exactly two parameters",
                self.function_name
            )));
        }
        if let Some(params) = &self.aggregate_params
            && params.iter().any(|p| !p.is_parameter_literal())
        {
            return Err(ExpressionError::Formula(
                "aggregate_params can only be literal types".to_string(),
            ));
        }
        for parameter in &self.parameters {
            match parameter {
                FormulaParameter::Formula(f) => f.validate()?,
                FormulaParameter::Timeseries(t) => t.validate()?,
                FormulaParameter::Float(n) if !n.is_finite() => {
                    return Err(ExpressionError::Formula(format!(
                        "formula parameter {n} is not a representable number"
                    )));
                }
                _ => {}
            }
        }
        validate_filters_and_groupby(&self.filters, &self.groupby)
    }

    /// Depth-first walk over every timeseries this formula reads.
    pub fn timeseries(&self) -> Vec<&Timeseries> {
        let mut out = Vec::new();
        for parameter in &self.parameters {
            match parameter {
                FormulaParameter::Timeseries(t) => out.push(t),
                FormulaParameter::Formula(f) => out.extend(f.timeseries()),
                _ => {}
            }
        }
        out
    }
}

// ============ Query root ============

/// The root of an MQL query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    Timeseries(Timeseries),
    Formula(Formula),
}

impl QueryExpr {
    pub fn filters(&self) -> Option<&Vec<Filter>> {
        match self {
            QueryExpr::Timeseries(t) => t.filters.as_ref(),
            QueryExpr::Formula(f) => f.filters.as_ref(),
        }
    }

    pub fn groupby(&self) -> Option<&Vec<Column>> {
        match self {
            QueryExpr::Timeseries(t) => t.groupby.as_ref(),
            QueryExpr::Formula(f) => f.groupby.as_ref(),
        }
    }

    pub fn set_filters(self, filters: Option<Vec<Filter>>) -> Self {
        match self {
            QueryExpr::Timeseries(t) => QueryExpr::Timeseries(t.set_filters(filters)),
            QueryExpr::Formula(f) => QueryExpr::Formula(f.set_filters(filters)),
        }
    }

    pub fn set_groupby(self, groupby: Option<Vec<Column>>) -> Self {
        match self {
            QueryExpr::Timeseries(t) => QueryExpr::Timeseries(t.set_groupby(groupby)),
            QueryExpr::Formula(f) => QueryExpr::Formula(f.set_groupby(groupby)),
        }
    }

    pub fn validate(&self) -> Result<(), ExpressionError> {
        match self {
            QueryExpr::Timeseries(t) => t.validate(),
            QueryExpr::Formula(f) => f.validate(),
        }
    }

    /// First metric entity found walking the query depth-first.
    pub fn entity(&self) -> Option<&str> {
        match self {
            QueryExpr::Timeseries(t) => t.metric.entity.as_deref(),
            QueryExpr::Formula(f) => f
                .timeseries()
                .into_iter()
                .find_map(|t| t.metric.entity.as_deref()),
        }
    }
}

impl From<Timeseries> for QueryExpr {
    fn from(t: Timeseries) -> Self {
        QueryExpr::Timeseries(t)
    }
}

impl From<Formula> for QueryExpr {
    fn from(f: Formula) -> Self {
        QueryExpr::Formula(f)
    }
}

impl From<QueryExpr> for FormulaParameter {
    fn from(q: QueryExpr) -> Self {
        match q {
            QueryExpr::Timeseries(t) => FormulaParameter::Timeseries(t),
            QueryExpr::Formula(f) => FormulaParameter::Formula(f),
        }
    }
}
