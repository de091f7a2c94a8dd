use std::fmt;
use std::sync::Arc;

use fmtutil::IntoDisplayableSlice;
use relmeta_error::{RelmetaError, Result};
use relmeta_types::field::Schema;

use super::table::TableDescriptor;
use crate::expr::Expression;

/// Scan of a stored table.
///
/// A scan may carry a projection of stored columns and a filter that is
/// pushed into the scan itself. The filter references *stored* ordinals, not
/// output positions, so that it stays valid regardless of the projection.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalScan {
    pub table: Arc<TableDescriptor>,
    /// Stored ordinals to produce, in output order. None produces every
    /// stored column (without the row id).
    pub projection: Option<Vec<usize>>,
    /// Filter applied while scanning.
    pub filter: Option<Expression>,
}

impl LogicalScan {
    pub fn new(table: Arc<TableDescriptor>) -> Self {
        LogicalScan {
            table,
            projection: None,
            filter: None,
        }
    }

    pub fn with_projection(mut self, projection: impl IntoIterator<Item = usize>) -> Result<Self> {
        let projection: Vec<usize> = projection.into_iter().collect();
        let addressable = self.table.addressable_columns();
        if let Some(bad) = projection.iter().find(|&&ord| ord >= addressable) {
            return Err(RelmetaError::new(format!(
                "Projection references column {bad} of table '{}' which has {addressable} addressable columns",
                self.table.name
            )));
        }
        self.projection = Some(projection);
        Ok(self)
    }

    pub fn with_filter(mut self, filter: Expression) -> Result<Self> {
        let addressable = self.table.addressable_columns();
        if let Some(bad) = filter.column_refs().iter().find(|&&ord| ord >= addressable) {
            return Err(RelmetaError::new(format!(
                "Scan filter references column {bad} of table '{}' which has {addressable} addressable columns",
                self.table.name
            )));
        }
        self.filter = Some(filter);
        Ok(self)
    }

    /// Number of columns produced by the scan.
    pub fn output_len(&self) -> usize {
        match &self.projection {
            Some(proj) => proj.len(),
            None => self.table.columns.len(),
        }
    }

    /// Map an output position to the stored ordinal it reads.
    pub fn stored_ordinal(&self, output: usize) -> Option<usize> {
        match &self.projection {
            Some(proj) => proj.get(output).copied(),
            None if output < self.table.columns.len() => Some(output),
            None => None,
        }
    }

    /// Map a stored ordinal to the output position producing it, if any.
    pub fn output_position(&self, stored: usize) -> Option<usize> {
        match &self.projection {
            Some(proj) => proj.iter().position(|&ord| ord == stored),
            None if stored < self.table.columns.len() => Some(stored),
            None => None,
        }
    }

    pub fn output_schema(&self) -> Result<Schema> {
        let fields = (0..self.output_len())
            .map(|pos| {
                self.stored_ordinal(pos)
                    .and_then(|ord| self.table.field(ord))
                    .ok_or_else(|| {
                        RelmetaError::new(format!(
                            "Output column {pos} of scan on '{}' does not exist",
                            self.table.name
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema::new(fields))
    }
}

impl fmt::Display for LogicalScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scan({}", self.table.name)?;
        if let Some(proj) = &self.projection {
            write!(f, ", projection={}", proj.display_with_brackets())?;
        }
        if let Some(filter) = &self.filter {
            write!(f, ", filter={filter}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use relmeta_types::datatype::DataType;
    use relmeta_types::field::Field;

    use super::*;

    fn table() -> Arc<TableDescriptor> {
        Arc::new(
            TableDescriptor::new(
                "T",
                [
                    Field::new("a", DataType::Int32, false),
                    Field::new("b", DataType::Int32, false),
                    Field::new("c", DataType::Utf8, true),
                ],
            )
            .with_row_id(),
        )
    }

    #[test]
    fn projected_ordinals() {
        let scan = LogicalScan::new(table()).with_projection([2, 0, 3]).unwrap();
        assert_eq!(3, scan.output_len());
        assert_eq!(Some(2), scan.stored_ordinal(0));
        assert_eq!(Some(3), scan.stored_ordinal(2));
        assert_eq!(None, scan.stored_ordinal(3));
        assert_eq!(Some(1), scan.output_position(0));
        assert_eq!(None, scan.output_position(1));

        let schema = scan.output_schema().unwrap();
        let names: Vec<_> = schema.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(vec!["c", "a", "ROWID"], names);
    }

    #[test]
    fn unprojected_excludes_row_id() {
        let scan = LogicalScan::new(table());
        assert_eq!(3, scan.output_len());
        assert_eq!(None, scan.stored_ordinal(3));
    }

    #[test]
    fn invalid_projection_and_filter() {
        assert!(LogicalScan::new(table()).with_projection([4]).is_err());
        assert!(LogicalScan::new(table())
            .with_filter(Expression::column(7))
            .is_err());
    }
}
