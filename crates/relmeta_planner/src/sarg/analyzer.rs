use std::collections::BTreeMap;

use relmeta_types::field::Schema;
use relmeta_types::scalar::OwnedScalarValue;
use tracing::trace;

use super::interval::Interval;
use super::sequence::IntervalSequence;
use crate::expr::comparison_expr::{ComparisonExpr, ComparisonOperator};
use crate::expr::conjunction_expr::{ConjunctionExpr, ConjunctionOperator};
use crate::expr::is_expr::{IsExpr, IsOperator};
use crate::expr::negate_expr::{NegateExpr, NegateOperator};
use crate::expr::split::split_conjunction;
use crate::expr::Expression;

/// A predicate compiled to a set of values of a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct SargBinding {
    pub column: usize,
    pub sequence: IntervalSequence,
}

/// Result of splitting a predicate into sargable and residual parts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SargAnalysis {
    /// Sargable conjuncts, keyed by column. Conjuncts on the same column are
    /// intersected.
    pub bindings: BTreeMap<usize, IntervalSequence>,
    /// Conjuncts that could not be compiled, ANDed together.
    pub residual: Option<Expression>,
}

impl SargAnalysis {
    pub fn has_bindings(&self) -> bool {
        !self.bindings.is_empty()
    }
}

/// Compiles predicates into interval sequences over single columns.
///
/// The schema is used to reject comparisons between a column and a literal
/// from a different value domain.
#[derive(Debug, Clone, Copy)]
pub struct SargAnalyzer<'a> {
    schema: &'a Schema,
}

impl<'a> SargAnalyzer<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        SargAnalyzer { schema }
    }

    /// Compile the entire predicate into an interval sequence over one
    /// column.
    ///
    /// Returns None if any part of the predicate references a different
    /// column, a derived expression, or an unsupported operator.
    pub fn analyze(&self, expr: &Expression) -> Option<SargBinding> {
        let binding = self.analyze_inner(expr);
        trace!(%expr, ?binding, "sarg analysis");
        binding
    }

    /// Split the predicate on AND, compiling every conjunct that can be
    /// compiled and collecting the rest into a residual expression.
    pub fn analyze_all(&self, expr: &Expression) -> SargAnalysis {
        let mut conjuncts = Vec::new();
        split_conjunction(expr.clone(), &mut conjuncts);

        let mut analysis = SargAnalysis::default();
        let mut residual = Vec::new();

        for conjunct in conjuncts {
            if conjunct.is_always_true() {
                continue;
            }
            match self.analyze_inner(&conjunct) {
                Some(binding) => {
                    analysis
                        .bindings
                        .entry(binding.column)
                        .and_modify(|existing| *existing = existing.intersect(&binding.sequence))
                        .or_insert(binding.sequence);
                }
                None => residual.push(conjunct),
            }
        }

        analysis.residual = Expression::and_all(residual);
        analysis
    }

    fn analyze_inner(&self, expr: &Expression) -> Option<SargBinding> {
        match expr {
            Expression::Comparison(ComparisonExpr { left, right, op }) => {
                let (column, literal, op) = match (left.as_ref(), right.as_ref()) {
                    (Expression::Column(col), Expression::Literal(lit)) => {
                        (col.column, &lit.literal, *op)
                    }
                    (Expression::Literal(lit), Expression::Column(col)) => {
                        (col.column, &lit.literal, op.flip())
                    }
                    _ => return None,
                };
                self.check_comparable(column, literal)?;

                let interval = match op {
                    ComparisonOperator::Eq => Interval::point(literal.clone()),
                    ComparisonOperator::Lt => Interval::lt(literal.clone()),
                    ComparisonOperator::LtEq => Interval::le(literal.clone()),
                    ComparisonOperator::Gt => Interval::gt(literal.clone()),
                    ComparisonOperator::GtEq => Interval::ge(literal.clone()),
                    ComparisonOperator::NotEq => return None,
                };

                Some(SargBinding {
                    column,
                    sequence: interval.into(),
                })
            }
            Expression::Is(IsExpr {
                op: IsOperator::IsNull,
                input,
            }) => {
                let column = input.as_column()?;
                self.schema.field(column)?;
                Some(SargBinding {
                    column,
                    sequence: Interval::point(OwnedScalarValue::Null).into(),
                })
            }
            Expression::Conjunction(ConjunctionExpr { left, right, op }) => {
                let left = self.analyze_inner(left)?;
                let right = self.analyze_inner(right)?;
                if left.column != right.column {
                    return None;
                }
                let sequence = match op {
                    ConjunctionOperator::And => left.sequence.intersect(&right.sequence),
                    ConjunctionOperator::Or => left.sequence.union(&right.sequence),
                };
                Some(SargBinding {
                    column: left.column,
                    sequence,
                })
            }
            Expression::Negate(NegateExpr {
                op: NegateOperator::Not,
                expr,
            }) => {
                let inner = self.analyze_inner(expr)?;
                // A negated predicate never matches null. Either the inner
                // predicate matched null (IS NULL), or it evaluated to unknown
                // for null and so does its negation.
                let sequence = inner
                    .sequence
                    .complement()
                    .intersect(&Interval::non_null().into());
                Some(SargBinding {
                    column: inner.column,
                    sequence,
                })
            }
            _ => None,
        }
    }

    fn check_comparable(&self, column: usize, literal: &OwnedScalarValue) -> Option<()> {
        let field = self.schema.field(column)?;
        if literal.is_comparable_to(&field.datatype) {
            Some(())
        } else {
            trace!(column, %literal, datatype = %field.datatype, "literal not comparable to column");
            None
        }
    }
}
