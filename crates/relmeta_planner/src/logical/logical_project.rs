use std::fmt;

use fmtutil::IntoDisplayableSlice;
use relmeta_error::Result;
use relmeta_types::field::{Field, Schema};

use crate::expr::Expression;

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalProject {
    pub projections: Vec<Expression>,
}

impl LogicalProject {
    /// Output position of each input column that is projected as a bare
    /// reference. First occurrence wins.
    pub fn bare_column_position(&self, input_column: usize) -> Option<usize> {
        self.projections
            .iter()
            .position(|expr| expr.as_column() == Some(input_column))
    }

    /// Compute the output schema given the schema of the input.
    ///
    /// Bare column references keep the input field name, derived expressions
    /// are named by their textual form.
    pub fn output_schema(&self, input: &Schema) -> Result<Schema> {
        let fields = self
            .projections
            .iter()
            .map(|expr| match expr.as_column().and_then(|col| input.field(col)) {
                Some(field) => Ok(field.clone()),
                None => Ok(Field::new(expr.to_string(), expr.datatype(input)?, true)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema::new(fields))
    }
}

impl fmt::Display for LogicalProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Project({})", self.projections.display_as_list())
    }
}
