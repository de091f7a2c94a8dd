use crate::expr::{
    conjunction_expr::{ConjunctionExpr, ConjunctionOperator},
    Expression,
};

/// Recursively split an expression on AND, putting the split expressions in
/// `out`.
///
/// Both sides are split, so left-deep trees produced by `and_all` flatten
/// completely.
pub fn split_conjunction(expr: Expression, out: &mut Vec<Expression>) {
    match expr {
        Expression::Conjunction(ConjunctionExpr {
            left,
            right,
            op: ConjunctionOperator::And,
        }) => {
            split_conjunction(*left, out);
            split_conjunction(*right, out);
        }
        other => out.push(other),
    }
}

/// Split a borrowed expression on AND.
pub fn conjuncts(expr: &Expression) -> Vec<Expression> {
    let mut out = Vec::new();
    split_conjunction(expr.clone(), &mut out);
    out
}

/// Returns the conjuncts of `pred` that do not appear in `existing`, ANDed
/// back together.
///
/// Returns None if every conjunct of `pred` is already present.
pub fn minus_conjuncts(pred: &Expression, existing: &Expression) -> Option<Expression> {
    let existing = conjuncts(existing);
    Expression::and_all(
        conjuncts(pred)
            .into_iter()
            .filter(|conj| !existing.contains(conj)),
    )
}

/// AND two optional predicates together, dropping duplicate conjuncts.
pub fn union_conjuncts(a: Option<&Expression>, b: Option<&Expression>) -> Option<Expression> {
    let mut out: Vec<Expression> = Vec::new();
    for expr in [a, b].into_iter().flatten() {
        for conj in conjuncts(expr) {
            if !out.contains(&conj) {
                out.push(conj);
            }
        }
    }
    Expression::and_all(out)
}

#[cfg(test)]
mod tests {
    use relmeta_types::scalar::ScalarValue;

    use crate::expr::comparison_expr::ComparisonOperator;
    use crate::expr::literal_expr::LiteralExpr;

    use super::*;

    fn eq(col: usize, val: i32) -> Expression {
        Expression::compare(
            ComparisonOperator::Eq,
            Expression::column(col),
            Expression::literal(val),
        )
    }

    #[test]
    fn split_conjunction_none() {
        let expr = Expression::Literal(LiteralExpr {
            literal: ScalarValue::Int32(4),
        });

        let mut out = Vec::new();
        split_conjunction(expr.clone(), &mut out);

        let expected = vec![expr];
        assert_eq!(expected, out);
    }

    #[test]
    fn split_conjunction_single_and() {
        let expr = Expression::and(eq(0, 1), eq(1, 2));

        let mut out = Vec::new();
        split_conjunction(expr, &mut out);

        let expected = vec![eq(0, 1), eq(1, 2)];
        assert_eq!(expected, out);
    }

    #[test]
    fn split_conjunction_left_and_right_nested() {
        let expr = Expression::and(
            Expression::and(eq(0, 1), eq(1, 2)),
            Expression::and(eq(2, 3), eq(3, 4)),
        );

        let mut out = Vec::new();
        split_conjunction(expr, &mut out);

        let expected = vec![eq(0, 1), eq(1, 2), eq(2, 3), eq(3, 4)];
        assert_eq!(expected, out);
    }

    #[test]
    fn split_does_not_descend_into_or() {
        let or = Expression::or(eq(0, 1), Expression::and(eq(1, 2), eq(2, 3)));
        assert_eq!(vec![or.clone()], conjuncts(&or));
    }

    #[test]
    fn minus_drops_existing() {
        let existing = Expression::and(eq(0, 1), eq(1, 2));
        let pred = Expression::and_all([eq(1, 2), eq(2, 3), eq(0, 1)]).unwrap();

        assert_eq!(Some(eq(2, 3)), minus_conjuncts(&pred, &existing));
        assert_eq!(None, minus_conjuncts(&existing, &existing));
    }

    #[test]
    fn union_dedups() {
        let a = Expression::and(eq(0, 1), eq(1, 2));
        let b = Expression::and(eq(1, 2), eq(2, 3));

        let expected = Expression::and_all([eq(0, 1), eq(1, 2), eq(2, 3)]);
        assert_eq!(expected, union_conjuncts(Some(&a), Some(&b)));
        assert_eq!(Some(b.clone()), union_conjuncts(None, Some(&b)));
        assert_eq!(None, union_conjuncts(None, None));
    }
}
