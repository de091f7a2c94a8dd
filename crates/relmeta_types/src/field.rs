use serde::{Deserialize, Serialize};

use crate::datatype::DataType;

/// A named field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub datatype: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, datatype: DataType, nullable: bool) -> Self {
        Field {
            name: name.into(),
            datatype,
            nullable,
        }
    }
}

/// Represents the full output schema of an operator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Schema {
            fields: fields.into_iter().collect(),
        }
    }

    pub const fn empty() -> Self {
        Schema { fields: Vec::new() }
    }

    /// Create a new schema by appending all fields of `other` to this one.
    pub fn merge(self, other: Schema) -> Self {
        Schema {
            fields: self.fields.into_iter().chain(other.fields).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    /// Find the position of a field by name.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn datatypes(&self) -> impl Iterator<Item = &DataType> {
        self.fields.iter().map(|f| &f.datatype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_schemas() {
        let left = Schema::new([Field::new("a", DataType::Int32, false)]);
        let right = Schema::new([
            Field::new("b", DataType::Utf8, true),
            Field::new("c", DataType::Date32, true),
        ]);

        let merged = left.merge(right);
        assert_eq!(3, merged.len());
        assert_eq!(Some(2), merged.position_of("c"));
        assert_eq!(
            vec![&DataType::Int32, &DataType::Utf8, &DataType::Date32],
            merged.datatypes().collect::<Vec<_>>()
        );
    }
}
