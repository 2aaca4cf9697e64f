//! Or-Optimizer
//!
//! Collapses `a = x OR a = y OR a = z` into `a IN [x, y, z]`. Only the top
//! level of a filter list is inspected.

use crate::ast::Scalar;
use crate::ast::core::QueryExpr;
use crate::ast::expr::{BooleanOp, Condition, Expr, Filter, Op};

#[derive(Debug, Clone, Copy, Default)]
pub struct OrOptimizer;

impl OrOptimizer {
    pub fn new() -> Self {
        OrOptimizer
    }

    /// Rewrite every collapsible OR group. Returns `None` when nothing
    /// changed, otherwise the full list with only rewritten entries replaced.
    pub fn optimize(&self, filters: &[Filter]) -> Option<Vec<Filter>> {
        let mut rewritten = 0usize;
        let optimized = filters
            .iter()
            .map(|filter| match collapse_or(filter) {
                Some(condition) => {
                    rewritten += 1;
                    condition
                }
                None => filter.clone(),
            })
            .collect();
        if rewritten == 0 {
            return None;
        }
        log::debug!("collapsed {rewritten} OR group(s) into IN conditions");
        Some(optimized)
    }

    /// Apply [`OrOptimizer::optimize`] to the root filters of a query.
    pub fn optimize_query(&self, query: QueryExpr) -> QueryExpr {
        let optimized = query.filters().and_then(|filters| self.optimize(filters));
        match optimized {
            Some(filters) => query.set_filters(Some(filters)),
            None => query,
        }
    }
}

fn collapse_or(filter: &Filter) -> Option<Filter> {
    let Filter::Boolean(group) = filter else {
        return None;
    };
    if group.op != BooleanOp::Or {
        return None;
    }

    let mut shared_lhs: Option<&Expr> = None;
    let mut values = Vec::with_capacity(group.conditions.len());
    for child in &group.conditions {
        let Filter::Condition(condition) = child else {
            return None;
        };
        if condition.op != Op::Eq {
            return None;
        }
        match shared_lhs {
            Some(lhs) if *lhs != condition.lhs => return None,
            Some(_) => {}
            None => shared_lhs = Some(&condition.lhs),
        }
        let Some(Expr::Scalar(value)) = &condition.rhs else {
            return None;
        };
        values.push(value.clone());
    }

    let lhs = shared_lhs?.clone();
    Some(Filter::Condition(Condition::new(
        lhs,
        Op::In,
        Scalar::Array(values),
    )))
}
