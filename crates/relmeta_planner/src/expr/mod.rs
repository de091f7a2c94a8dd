pub mod arith_expr;
pub mod column_expr;
pub mod comparison_expr;
pub mod conjunction_expr;
pub mod is_expr;
pub mod literal_expr;
pub mod negate_expr;
pub mod scalar_function_expr;
pub mod selectivity_expr;
pub mod split;

use std::fmt;

use arith_expr::ArithExpr;
use column_expr::ColumnExpr;
use comparison_expr::{ComparisonExpr, ComparisonOperator};
use conjunction_expr::{ConjunctionExpr, ConjunctionOperator};
use is_expr::{IsExpr, IsOperator};
use literal_expr::LiteralExpr;
use negate_expr::{NegateExpr, NegateOperator};
use relmeta_error::{OptionExt, RelmetaError, Result};
use relmeta_types::datatype::DataType;
use relmeta_types::field::Schema;
use relmeta_types::scalar::{OwnedScalarValue, ScalarValue};
use scalar_function_expr::ScalarFunctionExpr;
use selectivity_expr::SelectivityExpr;
use smallvec::SmallVec;

/// Column indices referenced by an expression, sorted and deduplicated.
pub type ColumnRefs = SmallVec<[usize; 4]>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Arith(ArithExpr),
    Column(ColumnExpr),
    Comparison(ComparisonExpr),
    Conjunction(ConjunctionExpr),
    Is(IsExpr),
    Literal(LiteralExpr),
    Negate(NegateExpr),
    ScalarFunction(ScalarFunctionExpr),
    Selectivity(SelectivityExpr),
}

impl Expression {
    pub const fn column(column: usize) -> Self {
        Expression::Column(ColumnExpr { column })
    }

    pub fn literal(literal: impl Into<OwnedScalarValue>) -> Self {
        Expression::Literal(LiteralExpr {
            literal: literal.into(),
        })
    }

    pub const fn null() -> Self {
        Expression::Literal(LiteralExpr {
            literal: ScalarValue::Null,
        })
    }

    pub fn compare(op: ComparisonOperator, left: Expression, right: Expression) -> Self {
        Expression::Comparison(ComparisonExpr {
            left: Box::new(left),
            right: Box::new(right),
            op,
        })
    }

    pub fn arith(op: arith_expr::ArithOperator, left: Expression, right: Expression) -> Self {
        Expression::Arith(ArithExpr {
            left: Box::new(left),
            right: Box::new(right),
            op,
        })
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::Conjunction(ConjunctionExpr {
            left: Box::new(left),
            right: Box::new(right),
            op: ConjunctionOperator::And,
        })
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Conjunction(ConjunctionExpr {
            left: Box::new(left),
            right: Box::new(right),
            op: ConjunctionOperator::Or,
        })
    }

    pub fn not(expr: Expression) -> Self {
        Expression::Negate(NegateExpr {
            op: NegateOperator::Not,
            expr: Box::new(expr),
        })
    }

    pub fn is(op: IsOperator, input: Expression) -> Self {
        Expression::Is(IsExpr {
            op,
            input: Box::new(input),
        })
    }

    pub fn scalar_function(
        name: impl Into<String>,
        inputs: Vec<Expression>,
        return_type: DataType,
    ) -> Self {
        Expression::ScalarFunction(ScalarFunctionExpr {
            name: name.into(),
            inputs,
            return_type,
        })
    }

    pub const fn selectivity(selectivity: f64) -> Self {
        Expression::Selectivity(SelectivityExpr { selectivity })
    }

    /// ANDs all expressions, only returning None if iterator contains no
    /// expressions.
    pub fn and_all(exprs: impl IntoIterator<Item = Expression>) -> Option<Expression> {
        let mut exprs = exprs.into_iter();
        let left = exprs.next()?;
        Some(exprs.fold(left, Expression::and))
    }

    /// ORs all expressions, only returning None if iterator contains no
    /// expressions.
    pub fn or_all(exprs: impl IntoIterator<Item = Expression>) -> Option<Expression> {
        let mut exprs = exprs.into_iter();
        let left = exprs.next()?;
        Some(exprs.fold(left, Expression::or))
    }

    /// Compute the output type of this expression given the input schema.
    pub fn datatype(&self, input: &Schema) -> Result<DataType> {
        Ok(match self {
            Self::Arith(expr) => {
                let left = expr.left.datatype(input)?;
                let right = expr.right.datatype(input)?;
                match (left, right) {
                    (DataType::Float64, _) | (_, DataType::Float64) => DataType::Float64,
                    (DataType::Decimal128(meta), _) | (_, DataType::Decimal128(meta)) => {
                        DataType::Decimal128(meta)
                    }
                    (DataType::Int64, _) | (_, DataType::Int64) => DataType::Int64,
                    (DataType::Int32, DataType::Int32) => DataType::Int32,
                    (left, right) => {
                        return Err(RelmetaError::new(format!(
                            "Cannot apply '{}' to {left} and {right}",
                            expr.op
                        )))
                    }
                }
            }
            Self::Column(expr) => input
                .field(expr.column)
                .map(|f| f.datatype.clone())
                .required("column in input schema")?,
            Self::Comparison(_) => DataType::Boolean,
            Self::Conjunction(_) => DataType::Boolean,
            Self::Is(_) => DataType::Boolean,
            Self::Literal(expr) => expr.literal.datatype(),
            Self::Negate(expr) => match expr.op {
                NegateOperator::Not => DataType::Boolean,
                NegateOperator::Negate => expr.expr.datatype(input)?,
            },
            Self::ScalarFunction(expr) => expr.return_type.clone(),
            Self::Selectivity(_) => DataType::Boolean,
        })
    }

    pub fn for_each_child_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        match self {
            Self::Arith(arith) => {
                func(&mut arith.left)?;
                func(&mut arith.right)?;
            }
            Self::Column(_) => (),
            Self::Comparison(comp) => {
                func(&mut comp.left)?;
                func(&mut comp.right)?;
            }
            Self::Conjunction(conj) => {
                func(&mut conj.left)?;
                func(&mut conj.right)?;
            }
            Self::Is(is) => func(&mut is.input)?,
            Self::Literal(_) => (),
            Self::Negate(negate) => func(&mut negate.expr)?,
            Self::ScalarFunction(scalar) => {
                for input in &mut scalar.inputs {
                    func(input)?;
                }
            }
            Self::Selectivity(_) => (),
        }
        Ok(())
    }

    pub fn for_each_child<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        match self {
            Self::Arith(arith) => {
                func(&arith.left)?;
                func(&arith.right)?;
            }
            Self::Column(_) => (),
            Self::Comparison(comp) => {
                func(&comp.left)?;
                func(&comp.right)?;
            }
            Self::Conjunction(conj) => {
                func(&conj.left)?;
                func(&conj.right)?;
            }
            Self::Is(is) => func(&is.input)?,
            Self::Literal(_) => (),
            Self::Negate(negate) => func(&negate.expr)?,
            Self::ScalarFunction(scalar) => {
                for input in &scalar.inputs {
                    func(input)?;
                }
            }
            Self::Selectivity(_) => (),
        }
        Ok(())
    }

    pub fn children(&self) -> SmallVec<[&Expression; 2]> {
        match self {
            Self::Arith(arith) => [arith.left.as_ref(), arith.right.as_ref()].into(),
            Self::Comparison(comp) => [comp.left.as_ref(), comp.right.as_ref()].into(),
            Self::Conjunction(conj) => [conj.left.as_ref(), conj.right.as_ref()].into(),
            Self::Is(is) => std::iter::once(is.input.as_ref()).collect(),
            Self::Negate(negate) => std::iter::once(negate.expr.as_ref()).collect(),
            Self::ScalarFunction(scalar) => scalar.inputs.iter().collect(),
            Self::Column(_) | Self::Literal(_) | Self::Selectivity(_) => SmallVec::new(),
        }
    }

    /// Get all column indices this expression references.
    pub fn column_refs(&self) -> ColumnRefs {
        fn inner(expr: &Expression, refs: &mut ColumnRefs) {
            match expr {
                Expression::Column(col) => refs.push(col.column),
                other => {
                    for child in other.children() {
                        inner(child, refs);
                    }
                }
            }
        }

        let mut refs = ColumnRefs::new();
        inner(self, &mut refs);
        refs.sort_unstable();
        refs.dedup();
        refs
    }

    pub const fn is_column_expr(&self) -> bool {
        matches!(self, Self::Column(_))
    }

    /// Get the column index if this is a bare column reference.
    pub const fn as_column(&self) -> Option<usize> {
        match self {
            Self::Column(col) => Some(col.column),
            _ => None,
        }
    }

    pub const fn as_literal(&self) -> Option<&OwnedScalarValue> {
        match self {
            Self::Literal(lit) => Some(&lit.literal),
            _ => None,
        }
    }

    /// Check if this expression is the literal TRUE.
    pub fn is_always_true(&self) -> bool {
        matches!(self.as_literal(), Some(ScalarValue::Boolean(true)))
    }

    /// Rewrite every column reference using `func`.
    ///
    /// Errors if `func` returns None for any referenced column.
    pub fn remap_columns<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(usize) -> Option<usize>,
    {
        match self {
            Self::Column(col) => {
                col.column = func(col.column).ok_or_else(|| {
                    RelmetaError::new(format!("Column #{} cannot be remapped", col.column))
                })?;
                Ok(())
            }
            other => other.for_each_child_mut(&mut |child| child.remap_columns(func)),
        }
    }

    /// Shift every column reference by `offset`, e.g. to move a predicate on
    /// the right input of a join into the join's combined column space.
    pub fn shift_columns(&mut self, offset: isize) -> Result<()> {
        self.remap_columns(&mut |col| col.checked_add_signed(offset))
    }

    /// Replace every column reference `#i` with `replacements[i]`.
    ///
    /// Used to express a predicate on the output of a projection in terms of
    /// the projection's input.
    pub fn substitute_columns(&self, replacements: &[Expression]) -> Result<Expression> {
        match self {
            Self::Column(col) => replacements.get(col.column).cloned().ok_or_else(|| {
                RelmetaError::new(format!(
                    "Column #{} out of range for {} replacements",
                    col.column,
                    replacements.len()
                ))
            }),
            other => {
                let mut expr = other.clone();
                expr.for_each_child_mut(&mut |child| {
                    *child = child.substitute_columns(replacements)?;
                    Ok(())
                })?;
                Ok(expr)
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arith(expr) => write!(f, "{}", expr),
            Self::Column(expr) => write!(f, "{}", expr),
            Self::Comparison(expr) => write!(f, "{}", expr),
            Self::Conjunction(expr) => write!(f, "{}", expr),
            Self::Is(expr) => write!(f, "{}", expr),
            Self::Literal(expr) => write!(f, "{}", expr),
            Self::Negate(expr) => write!(f, "{}", expr),
            Self::ScalarFunction(expr) => write!(f, "{}", expr),
            Self::Selectivity(expr) => write!(f, "{}", expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use relmeta_types::field::Field;

    use super::*;

    fn upper(input: Expression) -> Expression {
        Expression::scalar_function("upper", vec![input], DataType::Utf8)
    }

    #[test]
    fn column_refs_sorted_dedup() {
        let expr = Expression::and(
            Expression::compare(
                ComparisonOperator::Eq,
                upper(Expression::column(3)),
                Expression::literal("FOO"),
            ),
            Expression::compare(
                ComparisonOperator::Lt,
                Expression::column(1),
                Expression::column(3),
            ),
        );

        assert_eq!(&[1, 3], expr.column_refs().as_slice());
    }

    #[test]
    fn substitute_through_projection() {
        // Projection: [#2, upper(#0)]
        let projections = vec![Expression::column(2), upper(Expression::column(0))];
        let pred = Expression::compare(
            ComparisonOperator::Eq,
            Expression::column(1),
            Expression::literal("ZELDA"),
        );

        let got = pred.substitute_columns(&projections).unwrap();
        let expected = Expression::compare(
            ComparisonOperator::Eq,
            upper(Expression::column(0)),
            Expression::literal("ZELDA"),
        );
        assert_eq!(expected, got);

        let out_of_range = Expression::column(5).substitute_columns(&projections);
        assert!(out_of_range.is_err());
    }

    #[test]
    fn shift_and_remap() {
        let mut expr = Expression::compare(
            ComparisonOperator::Eq,
            Expression::column(0),
            Expression::column(1),
        );
        expr.shift_columns(3).unwrap();
        assert_eq!(&[3, 4], expr.column_refs().as_slice());

        expr.shift_columns(-3).unwrap();
        assert_eq!(&[0, 1], expr.column_refs().as_slice());

        assert!(expr.shift_columns(-1).is_err());
    }

    #[test]
    fn and_all_or_all() {
        assert_eq!(None, Expression::and_all([]));
        let a = Expression::column(0);
        assert_eq!(Some(a.clone()), Expression::or_all([a.clone()]));
        assert_eq!(
            "((#0 AND #1) AND #2)",
            Expression::and_all([a, Expression::column(1), Expression::column(2)])
                .unwrap()
                .to_string()
        );
    }

    #[test]
    fn datatype_of_arith() {
        let schema = Schema::new([
            Field::new("a", DataType::Int32, false),
            Field::new("b", DataType::Float64, false),
        ]);
        let expr = Expression::arith(
            arith_expr::ArithOperator::Mul,
            Expression::column(0),
            Expression::column(0),
        );
        assert_eq!(DataType::Int32, expr.datatype(&schema).unwrap());

        let expr = Expression::arith(
            arith_expr::ArithOperator::Add,
            Expression::column(0),
            Expression::column(1),
        );
        assert_eq!(DataType::Float64, expr.datatype(&schema).unwrap());

        assert!(Expression::column(4).datatype(&schema).is_err());
    }

    #[test]
    fn display_predicate() {
        let expr = Expression::or(
            Expression::compare(
                ComparisonOperator::Eq,
                Expression::column(0),
                Expression::literal(7),
            ),
            Expression::is(IsOperator::IsNull, Expression::column(1)),
        );
        assert_eq!("(#0 = 7 OR #1 IS NULL)", expr.to_string());
    }
}
