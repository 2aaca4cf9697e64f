//! Surface AST - what the MQL parser produces
//!
//! One node per grammar production, kept close to the source text so the
//! transformer can apply the merge rules in one bottom-up pass.

use super::core::ArithmeticOperator;

/// `expression := term (("+" | "-") term)*`
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub first: Term,
    pub rest: Vec<(ArithmeticOperator, Term)>,
}

/// `term := unary (("*" | "/") unary)*`
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub first: Unary,
    pub rest: Vec<(ArithmeticOperator, Unary)>,
}

/// `unary := "-"? coefficient`
#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
    pub negated: bool,
    pub coefficient: Coefficient,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Coefficient {
    Number(Number),
    String(String),
    Filter(Filter),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// `filter := target ("{" filter_expr? "}")? group_by?`
///
/// Empty braces leave `filters` as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub target: Target,
    pub filters: Option<FilterExpr>,
    pub group_by: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// `$name`
    Variable(String),
    /// `( expression )`
    Nested(Box<Expression>),
    Function(Box<Function>),
    Metric(MetricRef),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricRef {
    Mri(String),
    PublicName(String),
}

/// `function := (curried_aggregate | curried_arbitrary | aggregate | arbitrary) group_by?`
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub call: Call,
    pub group_by: Option<Vec<String>>,
}

/// The four call shapes, in the order the grammar tries them.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// `name(params?)(inner_filter)`
    CurriedAggregate {
        name: String,
        params: Vec<Param>,
        inner: InnerFilter,
    },
    /// `name(params?)(expression, ...)`
    CurriedArbitrary {
        name: String,
        params: Vec<Param>,
        args: Vec<Expression>,
    },
    /// `name(inner_filter)`
    Aggregate { name: String, inner: InnerFilter },
    /// `name(expression, ...)`
    Arbitrary { name: String, args: Vec<Expression> },
}

/// `inner_filter := metric ("{" filter_expr? "}")? group_by?`
#[derive(Debug, Clone, PartialEq)]
pub struct InnerFilter {
    pub metric: MetricRef,
    pub filters: Option<FilterExpr>,
    pub group_by: Option<Vec<String>>,
}

/// Curried parameter: `number | quoted_string | unquoted_string`
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Number(Number),
    String(String),
}

/// `filter_expr := filter_term (OR filter_term)*`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr(pub Vec<FilterTerm>);

/// `filter_term := filter_factor ((AND | ",")? filter_factor)*`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTerm(pub Vec<FilterFactor>);

#[derive(Debug, Clone, PartialEq)]
pub enum FilterFactor {
    /// `"!"? key ":" value`
    Condition {
        negated: bool,
        key: TagKey,
        value: TagValue,
    },
    /// `( filter_expr )`
    Nested(FilterExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagKey {
    Name(String),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Suffix wildcard, stored with its trailing `*`.
    Wildcard(String),
    String(String),
    List(Vec<String>),
    Variable(String),
}
