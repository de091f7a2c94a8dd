use std::fmt;

use fmtutil::IntoDisplayableSlice;
use relmeta_error::{RelmetaError, Result};
use relmeta_types::datatype::DataType;
use relmeta_types::field::{Field, Schema};

/// Name of the surrogate row id pseudo column.
pub const ROW_ID_COLUMN_NAME: &str = "ROWID";

/// Description of a stored table as seen by the planner.
///
/// Built by the catalog layer. Column ordinals used everywhere in the
/// statistics layer are ordinals into `columns`. If the table exposes a row
/// id, it's addressed with the ordinal `columns.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<Field>,
    /// Declared primary key and unique constraints.
    pub unique_keys: Vec<Vec<usize>>,
    /// Whether scans may project the surrogate row id column.
    pub has_row_id: bool,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: impl IntoIterator<Item = Field>) -> Self {
        TableDescriptor {
            name: name.into(),
            columns: columns.into_iter().collect(),
            unique_keys: Vec::new(),
            has_row_id: false,
        }
    }

    /// Declare a unique constraint on the given stored columns.
    pub fn with_unique_key(mut self, key: impl IntoIterator<Item = usize>) -> Result<Self> {
        let mut key: Vec<usize> = key.into_iter().collect();
        key.sort_unstable();
        key.dedup();

        if key.is_empty() {
            return Err(RelmetaError::new(format!(
                "Unique key for table '{}' must reference at least one column",
                self.name
            )));
        }
        if let Some(bad) = key.iter().find(|&&col| col >= self.columns.len()) {
            return Err(RelmetaError::new(format!(
                "Unique key for table '{}' references column {bad}, table has {} columns",
                self.name,
                self.columns.len()
            )));
        }

        self.unique_keys.push(key);
        Ok(self)
    }

    pub fn with_row_id(mut self) -> Self {
        self.has_row_id = true;
        self
    }

    pub fn row_id_ordinal(&self) -> Option<usize> {
        if self.has_row_id {
            Some(self.columns.len())
        } else {
            None
        }
    }

    pub fn is_row_id(&self, ordinal: usize) -> bool {
        self.row_id_ordinal() == Some(ordinal)
    }

    /// Number of addressable columns, including the row id.
    pub fn addressable_columns(&self) -> usize {
        self.columns.len() + usize::from(self.has_row_id)
    }

    /// Get the field for a stored ordinal, including the row id.
    pub fn field(&self, ordinal: usize) -> Option<Field> {
        if self.is_row_id(ordinal) {
            return Some(Field::new(ROW_ID_COLUMN_NAME, DataType::Int64, false));
        }
        self.columns.get(ordinal).cloned()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|f| f.name == name)
    }

    /// Schema of all stored columns plus the row id if present.
    pub fn full_schema(&self) -> Schema {
        Schema::new((0..self.addressable_columns()).filter_map(|ord| self.field(ord)))
    }
}

impl fmt::Display for TableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.columns.iter().map(|c| c.name.as_str()).collect();
        write!(f, "{}{}", self.name, names.display_with_brackets())
    }
}
