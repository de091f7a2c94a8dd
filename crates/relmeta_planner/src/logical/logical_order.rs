use std::fmt;

use fmtutil::IntoDisplayableSlice;

use crate::expr::Expression;

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expression,
    pub desc: bool,
    pub nulls_first: bool,
}

impl fmt::Display for OrderByExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let asc_text = if self.desc { "DESC" } else { "ASC" };
        let nulls_text = if self.nulls_first {
            "NULLS FIRST"
        } else {
            "NULLS LAST"
        };
        write!(f, "{} {} {}", self.expr, asc_text, nulls_text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalOrder {
    pub exprs: Vec<OrderByExpr>,
}

impl fmt::Display for LogicalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Order({})", self.exprs.display_as_list())
    }
}
