use std::fmt;

use fmtutil::IntoDisplayableSlice;
use relmeta_error::{OptionExt, Result};
use relmeta_types::datatype::DataType;
use relmeta_types::field::{Field, Schema};

/// An aggregate call over input columns, e.g. `sum(#2)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateExpr {
    pub function: String,
    pub inputs: Vec<usize>,
    pub distinct: bool,
    pub return_type: DataType,
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<_> = self.inputs.iter().map(|col| format!("#{col}")).collect();
        if self.distinct {
            write!(f, "{}(DISTINCT {})", self.function, inputs.display_as_list())
        } else {
            write!(f, "{}({})", self.function, inputs.display_as_list())
        }
    }
}

/// Grouped aggregation.
///
/// The output consists of the group columns, in order, followed by one
/// column per aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalAggregate {
    /// Input columns to group by.
    pub group_columns: Vec<usize>,
    pub aggregates: Vec<AggregateExpr>,
}

impl LogicalAggregate {
    pub fn group_count(&self) -> usize {
        self.group_columns.len()
    }

    /// Check if an output position is one of the group columns.
    pub fn is_group_output(&self, output: usize) -> bool {
        output < self.group_columns.len()
    }

    pub fn output_schema(&self, input: &Schema) -> Result<Schema> {
        let mut fields = self
            .group_columns
            .iter()
            .map(|&col| input.field(col).cloned().required("group column in input"))
            .collect::<Result<Vec<_>>>()?;
        fields.extend(
            self.aggregates
                .iter()
                .map(|agg| Field::new(agg.to_string(), agg.return_type.clone(), true)),
        );
        Ok(Schema::new(fields))
    }
}

impl fmt::Display for LogicalAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<_> = self
            .group_columns
            .iter()
            .map(|col| format!("#{col}"))
            .collect();
        write!(
            f,
            "Aggregate(groups={}, aggregates={})",
            groups.display_with_brackets(),
            self.aggregates.display_with_brackets()
        )
    }
}
