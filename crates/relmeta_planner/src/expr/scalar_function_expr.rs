use std::fmt;

use fmtutil::IntoDisplayableSlice;
use relmeta_types::datatype::DataType;

use super::Expression;

/// A call to a scalar function.
///
/// Functions are opaque here. Any predicate involving a function call is
/// treated as a derived expression and is never sargable.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFunctionExpr {
    pub name: String,
    pub inputs: Vec<Expression>,
    pub return_type: DataType,
}

impl fmt::Display for ScalarFunctionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.inputs.display_as_list())
    }
}
