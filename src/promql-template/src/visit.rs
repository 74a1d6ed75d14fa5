//! Mutable traversal of PromQL expression trees
//!
//! The parser crate ships a read-only visitor; rewriting a query needs
//! `&mut` access to selectors and aggregations, so this module provides the
//! mutable counterpart.

use promql_parser::parser::{AggregateExpr, Expr, VectorSelector};

/// Callbacks invoked by [`walk_expr_mut`] for the node kinds that templates rewrite
///
/// Both callbacks default to doing nothing.
pub trait ExprVisitorMut {
    type Error;

    fn visit_vector_selector(&mut self, _vs: &mut VectorSelector) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_aggregate(&mut self, _agg: &mut AggregateExpr) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Walk `expr` in pre-order, handing every selector and aggregation to `visitor`
///
/// The vector selector inside a matrix selector (`foo[5m]`) is visited like
/// any other. The walk stops at the first error.
pub fn walk_expr_mut<V: ExprVisitorMut>(visitor: &mut V, expr: &mut Expr) -> Result<(), V::Error> {
    match expr {
        Expr::VectorSelector(vs) => visitor.visit_vector_selector(vs),
        Expr::MatrixSelector(ms) => visitor.visit_vector_selector(&mut ms.vs),
        Expr::Aggregate(agg) => {
            visitor.visit_aggregate(agg)?;
            if let Some(param) = agg.param.as_mut() {
                walk_expr_mut(visitor, param)?;
            }
            walk_expr_mut(visitor, &mut agg.expr)
        }
        Expr::Call(call) => {
            for arg in call.args.args.iter_mut() {
                walk_expr_mut(visitor, arg)?;
            }
            Ok(())
        }
        Expr::Binary(bin) => {
            walk_expr_mut(visitor, &mut bin.lhs)?;
            walk_expr_mut(visitor, &mut bin.rhs)
        }
        Expr::Paren(paren) => walk_expr_mut(visitor, &mut paren.expr),
        Expr::Unary(unary) => walk_expr_mut(visitor, &mut unary.expr),
        Expr::Subquery(sq) => walk_expr_mut(visitor, &mut sq.expr),
        Expr::Extension(_) | Expr::NumberLiteral(_) | Expr::StringLiteral(_) => Ok(()),
    }
}
