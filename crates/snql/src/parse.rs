//! Parser for MQL expressions
//!
//! Produces surface::Expression which is then reduced to a Timeseries or
//! Formula by the transform pass. Every production is an ordered choice:
//! the first alternative that matches wins and is never revisited.

use winnow::ascii::digit1;
use winnow::combinator::{alt, delimited, not, opt, preceded, repeat, separated, terminated};
use winnow::error::{ContextError, ErrMode, StrContext};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::ast::core::ArithmeticOperator;
use crate::ast::surface::{
    Call, Coefficient, Expression, Filter, FilterExpr, FilterFactor, FilterTerm, Function,
    InnerFilter, MetricRef, Number, Param, TagKey, TagValue, Target, Term, Unary,
};

type PResult<T> = winnow::ModalResult<T>;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (line {}, column {}, offset {})",
            self.message, self.line, self.column, self.offset
        )
    }
}

impl std::error::Error for ParseError {}

/// Parse an MQL expression from a string
pub fn parse(input: &str) -> Result<Expression, ParseError> {
    let input = input.trim();
    let mut stream = input;
    match expression
        .context(StrContext::Label("MQL expression"))
        .parse_next(&mut stream)
    {
        Ok(parsed) => {
            if stream.is_empty() {
                Ok(parsed)
            } else {
                let offset = trailing_input_offset(input, stream);
                Err(build_parse_error(
                    "unexpected trailing input".to_string(),
                    input,
                    offset,
                ))
            }
        }
        Err(e) => {
            let offset = input.len().saturating_sub(stream.len());
            Err(build_parse_error(describe(&e), input, offset))
        }
    }
}

fn build_parse_error(message: String, input: &str, offset: usize) -> ParseError {
    let (line, column) = offset_to_line_column(input, offset);
    ParseError {
        message,
        offset,
        line,
        column,
    }
}

fn describe(err: &ErrMode<ContextError>) -> String {
    match err {
        ErrMode::Incomplete(_) => "unexpected end of input".to_string(),
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => {
            let rendered = e.to_string();
            if rendered.is_empty() {
                "expected a timeseries, formula or number".to_string()
            } else {
                rendered
            }
        }
    }
}

fn offset_to_line_column(input: &str, offset: usize) -> (usize, usize) {
    let bounded = offset.min(input.len());
    let mut line = 1usize;
    let mut column = 1usize;

    for ch in input[..bounded].chars() {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    (line, column)
}

fn trailing_input_offset(input: &str, trailing: &str) -> usize {
    let base = input.len().saturating_sub(trailing.len());
    let non_ws = trailing
        .char_indices()
        .find(|(_, ch)| !ch.is_whitespace())
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    base + non_ws
}

fn backtrack() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

fn ws(input: &mut &str) -> PResult<()> {
    take_while(0.., char::is_whitespace).void().parse_next(input)
}

// ============ Arithmetic (handles precedence) ============

fn expression(input: &mut &str) -> PResult<Expression> {
    let first = term.parse_next(input)?;
    let rest: Vec<(ArithmeticOperator, Term)> =
        repeat(0.., (ws, expr_op, ws, term).map(|(_, op, _, t)| (op, t))).parse_next(input)?;
    Ok(Expression { first, rest })
}

fn expr_op(input: &mut &str) -> PResult<ArithmeticOperator> {
    alt((
        '+'.value(ArithmeticOperator::Plus),
        '-'.value(ArithmeticOperator::Minus),
    ))
    .parse_next(input)
}

fn term(input: &mut &str) -> PResult<Term> {
    let first = unary.parse_next(input)?;
    let rest: Vec<(ArithmeticOperator, Unary)> =
        repeat(0.., (ws, term_op, ws, unary).map(|(_, op, _, u)| (op, u))).parse_next(input)?;
    Ok(Term { first, rest })
}

fn term_op(input: &mut &str) -> PResult<ArithmeticOperator> {
    alt((
        '*'.value(ArithmeticOperator::Multiply),
        '/'.value(ArithmeticOperator::Divide),
    ))
    .parse_next(input)
}

fn unary(input: &mut &str) -> PResult<Unary> {
    (opt('-'), coefficient)
        .map(|(sign, coefficient)| Unary {
            negated: sign.is_some(),
            coefficient,
        })
        .parse_next(input)
}

fn coefficient(input: &mut &str) -> PResult<Coefficient> {
    alt((
        number.map(Coefficient::Number),
        quoted_string.map(Coefficient::String),
        filter.map(Coefficient::Filter),
    ))
    .parse_next(input)
}

// ============ Filters ============

fn filter(input: &mut &str) -> PResult<Filter> {
    (target, opt(braces), opt(group_by))
        .map(|(target, filters, group_by)| Filter {
            target,
            filters: filters.flatten(),
            group_by,
        })
        .parse_next(input)
}

/// `"{" (ws filter_expr ws)? "}"`
fn braces(input: &mut &str) -> PResult<Option<FilterExpr>> {
    delimited('{', opt(delimited(ws, filter_expr, ws)), '}').parse_next(input)
}

fn filter_expr(input: &mut &str) -> PResult<FilterExpr> {
    let first = filter_term.parse_next(input)?;
    let rest: Vec<FilterTerm> =
        repeat(0.., preceded((ws, or_keyword, ws), filter_term)).parse_next(input)?;
    let mut terms = Vec::with_capacity(rest.len() + 1);
    terms.push(first);
    terms.extend(rest);
    Ok(FilterExpr(terms))
}

fn filter_term(input: &mut &str) -> PResult<FilterTerm> {
    let first = filter_factor.parse_next(input)?;
    // A key such as `and:x` is a factor, not a joint followed by junk.
    let rest: Vec<FilterFactor> = repeat(
        0..,
        preceded(
            ws,
            alt((preceded((joint_operator, ws), filter_factor), filter_factor)),
        ),
    )
    .parse_next(input)?;
    let mut factors = Vec::with_capacity(rest.len() + 1);
    factors.push(first);
    factors.extend(rest);
    Ok(FilterTerm(factors))
}

fn filter_factor(input: &mut &str) -> PResult<FilterFactor> {
    alt((
        (opt('!'), tag_key, ws, ':', ws, tag_value).map(|(bang, key, _, _, _, value)| {
            FilterFactor::Condition {
                negated: bang.is_some(),
                key,
                value,
            }
        }),
        delimited(('(', ws), filter_expr, (ws, ')')).map(FilterFactor::Nested),
    ))
    .parse_next(input)
}

fn joint_operator(input: &mut &str) -> PResult<()> {
    alt((','.void(), keyword("AND", "and"))).parse_next(input)
}

fn or_keyword(input: &mut &str) -> PResult<()> {
    keyword("OR", "or").parse_next(input)
}

/// Keyword in either case, not followed by more identifier characters.
fn keyword<'a>(
    upper: &'static str,
    lower: &'static str,
) -> impl Parser<&'a str, (), ErrMode<ContextError>> {
    terminated(alt((upper, lower)), not(one_of(is_name_char))).void()
}

fn tag_key(input: &mut &str) -> PResult<TagKey> {
    alt((
        variable.map(|v| TagKey::Variable(v.to_string())),
        name.map(|k| TagKey::Name(k.to_string())),
    ))
    .parse_next(input)
}

fn tag_value(input: &mut &str) -> PResult<TagValue> {
    alt((
        delimited('"', terminated(unquoted_string, '*'), '"')
            .map(|s| TagValue::Wildcard(format!("{s}*"))),
        terminated(unquoted_string, '*').map(|s| TagValue::Wildcard(format!("{s}*"))),
        quoted_string.map(TagValue::String),
        unquoted_string.map(|s| TagValue::String(s.to_string())),
        string_list.map(TagValue::List),
        variable.map(|v| TagValue::Variable(v.to_string())),
    ))
    .parse_next(input)
}

fn string_list(input: &mut &str) -> PResult<Vec<String>> {
    delimited(
        ('[', ws),
        separated(
            1..,
            alt((quoted_string, unquoted_string.map(String::from))),
            (ws, ',', ws),
        ),
        (ws, ']'),
    )
    .parse_next(input)
}

// ============ Group by ============

fn group_by(input: &mut &str) -> PResult<Vec<String>> {
    preceded(
        (ws, "by", ws),
        alt((
            name.map(|n| vec![n.to_string()]),
            delimited(
                ('(', ws),
                separated(1.., name.map(String::from), (ws, ',', ws)),
                (ws, ')'),
            ),
        )),
    )
    .parse_next(input)
}

// ============ Targets and function shapes ============

fn target(input: &mut &str) -> PResult<Target> {
    alt((
        variable.map(|v| Target::Variable(v.to_string())),
        delimited(('(', ws), expression, (ws, ')')).map(|e| Target::Nested(Box::new(e))),
        function.map(|f| Target::Function(Box::new(f))),
        metric.map(Target::Metric),
    ))
    .parse_next(input)
}

fn function(input: &mut &str) -> PResult<Function> {
    (
        alt((curried_aggregate, curried_arbitrary, aggregate, arbitrary)),
        opt(group_by),
    )
        .map(|(call, group_by)| Function { call, group_by })
        .parse_next(input)
}

/// `name(params?)` shared by both curried shapes
fn curried_head(input: &mut &str) -> PResult<(String, Vec<Param>)> {
    (function_name, '(', ws, opt(param_list), ws, ')')
        .map(|(name, _, _, params, _, _)| (name.to_string(), params.unwrap_or_default()))
        .parse_next(input)
}

fn curried_aggregate(input: &mut &str) -> PResult<Call> {
    (curried_head, delimited(('(', ws), inner_filter, (ws, ')')))
        .map(|((name, params), inner)| Call::CurriedAggregate {
            name,
            params,
            inner,
        })
        .parse_next(input)
}

fn curried_arbitrary(input: &mut &str) -> PResult<Call> {
    (curried_head, delimited(('(', ws), expression_list, (ws, ')')))
        .map(|((name, params), args)| Call::CurriedArbitrary { name, params, args })
        .parse_next(input)
}

fn aggregate(input: &mut &str) -> PResult<Call> {
    (function_name, delimited(('(', ws), inner_filter, (ws, ')')))
        .map(|(name, inner)| Call::Aggregate {
            name: name.to_string(),
            inner,
        })
        .parse_next(input)
}

fn arbitrary(input: &mut &str) -> PResult<Call> {
    (function_name, delimited(('(', ws), expression_list, (ws, ')')))
        .map(|(name, args)| Call::Arbitrary {
            name: name.to_string(),
            args,
        })
        .parse_next(input)
}

fn expression_list(input: &mut &str) -> PResult<Vec<Expression>> {
    separated(1.., expression, (ws, ',', ws)).parse_next(input)
}

fn param_list(input: &mut &str) -> PResult<Vec<Param>> {
    separated(1.., param, (ws, ',', ws)).parse_next(input)
}

fn param(input: &mut &str) -> PResult<Param> {
    alt((
        number.map(Param::Number),
        quoted_string.map(Param::String),
        unquoted_string.map(|s| Param::String(s.to_string())),
    ))
    .parse_next(input)
}

fn inner_filter(input: &mut &str) -> PResult<InnerFilter> {
    (metric, opt(braces), opt(group_by))
        .map(|(metric, filters, group_by)| InnerFilter {
            metric,
            filters: filters.flatten(),
            group_by,
        })
        .parse_next(input)
}

// ============ Metrics ============

fn metric(input: &mut &str) -> PResult<MetricRef> {
    alt((
        delimited('`', quoted_mri_body, '`').map(|m| MetricRef::Mri(m.to_string())),
        unquoted_mri.map(|m| MetricRef::Mri(m.to_string())),
        delimited('`', public_name, '`').map(|n| MetricRef::PublicName(n.to_string())),
        public_name.map(|n| MetricRef::PublicName(n.to_string())),
    ))
    .parse_next(input)
}

fn quoted_mri_body<'a>(input: &mut &'a str) -> PResult<&'a str> {
    (
        take_while(1.., |c: char| c != ':' && c != '`'),
        ':',
        take_while(1.., |c: char| c != '/' && c != '`'),
        '/',
        take_while(1.., |c: char| !matches!(c, '@' | ',' | '`')),
        '@',
        take_while(1.., |c: char| c != '`'),
    )
        .take()
        .parse_next(input)
}

fn is_mri_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '{' | '}' | '[' | ']' | '"' | '`' | ',')
}

/// `type:namespace/name@unit`, each segment free of the next delimiter
fn unquoted_mri<'a>(input: &mut &'a str) -> PResult<&'a str> {
    (
        take_while(1.., |c: char| is_mri_char(c) && c != ':'),
        ':',
        take_while(1.., |c: char| is_mri_char(c) && c != '/'),
        '/',
        take_while(1.., |c: char| is_mri_char(c) && c != '@'),
        '@',
        take_while(1.., is_mri_char),
    )
        .take()
        .parse_next(input)
}

fn is_public_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c == '_'
}

/// Dotted lowercase identifier: `transaction.duration`
fn public_name<'a>(input: &mut &'a str) -> PResult<&'a str> {
    (
        take_while(1.., is_public_name_char),
        repeat(0.., ('.', take_while(1.., is_public_name_char))).map(|_: ()| ()),
    )
        .take()
        .parse_next(input)
}

// ============ Identifiers ============

fn function_name<'a>(input: &mut &'a str) -> PResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Tag keys, variable names and group-by columns: `[a-zA-Z0-9_.]+`
fn name<'a>(input: &mut &'a str) -> PResult<&'a str> {
    take_while(1.., is_name_char).parse_next(input)
}

fn variable<'a>(input: &mut &'a str) -> PResult<&'a str> {
    preceded('$', name).parse_next(input)
}

// ============ Literals ============

fn number(input: &mut &str) -> PResult<Number> {
    alt((
        (digit1, '.', digit1)
            .take()
            .try_map(|s: &str| s.parse::<f64>())
            .map(Number::Float),
        digit1.try_map(|s: &str| s.parse::<i64>()).map(Number::Int),
    ))
    .parse_next(input)
}

fn unquoted_string<'a>(input: &mut &'a str) -> PResult<&'a str> {
    take_while(1.., |c: char| {
        !c.is_whitespace() && !matches!(c, ',' | '[' | ']' | '"' | '{' | '}' | '(' | ')' | '*')
    })
    .parse_next(input)
}

fn quoted_string(input: &mut &str) -> PResult<String> {
    delimited('"', quoted_contents, '"').parse_next(input)
}

/// Body of a double-quoted string. `\"` and `\\` are unescaped; any other
/// backslash sequence is kept as written.
fn quoted_contents(input: &mut &str) -> PResult<String> {
    let mut result = String::new();
    loop {
        let Some(c) = input.chars().next() else {
            return Err(backtrack());
        };
        match c {
            '"' => break,
            '\\' => {
                *input = &input[1..];
                let Some(escaped) = input.chars().next() else {
                    return Err(backtrack());
                };
                if escaped != '"' && escaped != '\\' {
                    result.push('\\');
                }
                result.push(escaped);
                *input = &input[escaped.len_utf8()..];
            }
            _ => {
                result.push(c);
                *input = &input[c.len_utf8()..];
            }
        }
    }
    Ok(result)
}
