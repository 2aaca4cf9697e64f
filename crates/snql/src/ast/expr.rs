//! Plain expression nodes: columns, functions and conditions
//!
//! These are what MQL filters and group-bys reduce to, and what the SnQL
//! printer renders for the WHERE/BY clauses.

use std::sync::LazyLock;

use regex::Regex;

use super::{ExpressionError, Scalar};

static COLUMN_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_](\w|\.|:)*(\[([^\[\]]*)\])?$").expect("column regex is valid")
});

static ALIAS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][\w.:]*$").expect("alias regex is valid"));

static FUNCTION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("function regex is valid"));

// ============ Column ============

/// A tag or dimension reference. Equality and hashing go by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Column {
    pub name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Column { name: name.into() }
    }

    pub fn validate(&self) -> Result<(), ExpressionError> {
        if COLUMN_NAME_RE.is_match(&self.name) {
            Ok(())
        } else {
            Err(ExpressionError::Column(format!(
                "column '{}' is empty or contains invalid characters",
                self.name
            )))
        }
    }
}

// ============ Function ============

/// A SnQL function call, curried when `initializers` is set:
/// `quantile(0.5)(value)`.
#[derive(Debug, Clone)]
pub struct Function {
    pub function: String,
    pub initializers: Option<Vec<Scalar>>,
    pub parameters: Vec<Expr>,
    pub alias: Option<String>,
}

impl Function {
    pub fn new(function: impl Into<String>, parameters: Vec<Expr>) -> Self {
        Function {
            function: function.into(),
            initializers: None,
            parameters,
            alias: None,
        }
    }

    pub fn curried(
        function: impl Into<String>,
        initializers: Vec<Scalar>,
        parameters: Vec<Expr>,
    ) -> Self {
        Function {
            initializers: Some(initializers),
            ..Function::new(function, parameters)
        }
    }

    pub fn alias(self, alias: impl Into<String>) -> Self {
        Function {
            alias: Some(alias.into()),
            ..self
        }
    }

    pub fn validate(&self) -> Result<(), ExpressionError> {
        if !FUNCTION_NAME_RE.is_match(&self.function) {
            return Err(ExpressionError::Function(format!(
                "function name '{}' is invalid",
                self.function
            )));
        }
        if let Some(alias) = &self.alias
            && !ALIAS_RE.is_match(alias)
        {
            return Err(ExpressionError::Function(format!(
                "alias '{alias}' of function {} contains invalid characters",
                self.function
            )));
        }
        for initializer in self.initializers.iter().flatten() {
            initializer.validate()?;
        }
        self.parameters.iter().try_for_each(Expr::validate)
    }
}

// Aliases only label output; they never change what a function computes.
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.function == other.function
            && self.initializers == other.initializers
            && self.parameters == other.parameters
    }
}

// ============ Operands ============

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(Column),
    Function(Function),
    Scalar(Scalar),
}

impl Expr {
    pub fn validate(&self) -> Result<(), ExpressionError> {
        match self {
            Expr::Column(c) => c.validate(),
            Expr::Function(f) => f.validate(),
            Expr::Scalar(s) => s.validate(),
        }
    }
}

impl From<Column> for Expr {
    fn from(c: Column) -> Self {
        Expr::Column(c)
    }
}

impl From<Function> for Expr {
    fn from(f: Function) -> Self {
        Expr::Function(f)
    }
}

impl From<Scalar> for Expr {
    fn from(s: Scalar) -> Self {
        Expr::Scalar(s)
    }
}

macro_rules! expr_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(impl From<$ty> for Expr {
            fn from(value: $ty) -> Self {
                Expr::Scalar(Scalar::from(value))
            }
        })*
    };
}

expr_from_scalar!(&str, String, i32, i64, u64, f64, bool, Vec<&str>, Vec<String>, Vec<i64>);

// ============ Conditions ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Neq,
    In,
    NotIn,
    Like,
    NotLike,
    IsNull,
    IsNotNull,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Gt => ">",
            Op::Lt => "<",
            Op::Gte => ">=",
            Op::Lte => "<=",
            Op::Eq => "=",
            Op::Neq => "!=",
            Op::In => "IN",
            Op::NotIn => "NOT IN",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Op::IsNull | Op::IsNotNull)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub lhs: Expr,
    pub op: Op,
    pub rhs: Option<Expr>,
}

impl Condition {
    pub fn new(lhs: impl Into<Expr>, op: Op, rhs: impl Into<Expr>) -> Self {
        Condition {
            lhs: lhs.into(),
            op,
            rhs: Some(rhs.into()),
        }
    }

    /// `IS NULL` / `IS NOT NULL` style condition with no right-hand side.
    pub fn unary(lhs: impl Into<Expr>, op: Op) -> Self {
        Condition {
            lhs: lhs.into(),
            op,
            rhs: None,
        }
    }

    pub fn validate(&self) -> Result<(), ExpressionError> {
        if matches!(self.lhs, Expr::Scalar(_)) {
            return Err(ExpressionError::Condition(
                "invalid condition: LHS must be a Column or Function".to_string(),
            ));
        }
        self.lhs.validate()?;
        match (&self.rhs, self.op.is_unary()) {
            (Some(_), true) => Err(ExpressionError::Condition(format!(
                "invalid condition: unary operator {} cannot have a rhs",
                self.op.as_str()
            ))),
            (None, false) => Err(ExpressionError::Condition(format!(
                "invalid condition: operator {} requires a rhs",
                self.op.as_str()
            ))),
            (Some(rhs), false) => rhs.validate(),
            (None, true) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    And,
    Or,
}

impl BooleanOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BooleanOp::And => "AND",
            BooleanOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanCondition {
    pub op: BooleanOp,
    pub conditions: Vec<Filter>,
}

impl BooleanCondition {
    pub fn new(op: BooleanOp, conditions: Vec<Filter>) -> Self {
        BooleanCondition { op, conditions }
    }

    pub fn validate(&self) -> Result<(), ExpressionError> {
        if self.conditions.len() < 2 {
            return Err(ExpressionError::Condition(
                "invalid boolean: must supply at least two conditions".to_string(),
            ));
        }
        self.conditions.iter().try_for_each(Filter::validate)
    }
}

/// One entry of a filter list: a plain condition or an AND/OR group.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Condition(Condition),
    Boolean(BooleanCondition),
}

impl Filter {
    pub fn and(conditions: Vec<Filter>) -> Self {
        Filter::Boolean(BooleanCondition::new(BooleanOp::And, conditions))
    }

    pub fn or(conditions: Vec<Filter>) -> Self {
        Filter::Boolean(BooleanCondition::new(BooleanOp::Or, conditions))
    }

    pub fn validate(&self) -> Result<(), ExpressionError> {
        match self {
            Filter::Condition(c) => c.validate(),
            Filter::Boolean(b) => b.validate(),
        }
    }
}

impl From<Condition> for Filter {
    fn from(c: Condition) -> Self {
        Filter::Condition(c)
    }
}

impl From<BooleanCondition> for Filter {
    fn from(b: BooleanCondition) -> Self {
        Filter::Boolean(b)
    }
}
