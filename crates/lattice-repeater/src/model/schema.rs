//! Declarative row schema.
//!
//! The schema lists the columns a row renders. A column is bound to a record
//! field by name; a `multiple` column hosts the multi-row inline add control
//! and needs no field.
//!
//! Schemas are plain data and can be loaded from JSON:
//!
//! ```
//! use lattice_repeater::model::RowSchema;
//!
//! let schema = RowSchema::from_json(r#"[
//!     { "name": "name", "label": "Name" },
//!     { "name": "email" },
//!     { "multiple": true }
//! ]"#).unwrap();
//!
//! assert_eq!(schema.field_names().collect::<Vec<_>>(), vec!["name", "email"]);
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One column of the row schema.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Record field bound to this column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Header text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Column hosting the multi-row inline add control.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multiple: bool,
}

impl ColumnSpec {
    /// A column bound to `name`.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// The multi-row inline add column.
    pub fn multiple() -> Self {
        Self {
            multiple: true,
            ..Self::default()
        }
    }

    /// Builder-style: set the header text.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Validated list of columns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnSpec>", into = "Vec<ColumnSpec>")]
pub struct RowSchema {
    columns: Vec<ColumnSpec>,
}

impl RowSchema {
    /// Validate and wrap `columns`.
    ///
    /// Every column needs a field name unless it is `multiple`, and field
    /// names must be unique.
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self> {
        let mut seen = HashSet::new();
        for (index, column) in columns.iter().enumerate() {
            match column.name.as_deref() {
                Some("") => return Err(Error::invalid_schema(index, "field name is empty")),
                Some(name) if !seen.insert(name) => {
                    return Err(Error::invalid_schema(
                        index,
                        format!("duplicate field name '{name}'"),
                    ));
                }
                Some(_) => {}
                None if column.multiple => {}
                None => return Err(Error::invalid_schema(index, "column has no field name")),
            }
        }
        Ok(Self { columns })
    }

    /// Parse a JSON array of columns.
    pub fn from_json(json: &str) -> Result<Self> {
        let columns: Vec<ColumnSpec> = serde_json::from_str(json)?;
        Self::new(columns)
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Bound field names in column order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|c| c.name.as_deref())
    }

    /// Look up the column bound to `name`.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name.as_deref() == Some(name))
    }

    /// Returns `true` if the schema has a multi-row inline add column.
    pub fn has_multiple(&self) -> bool {
        self.columns.iter().any(|c| c.multiple)
    }
}

impl TryFrom<Vec<ColumnSpec>> for RowSchema {
    type Error = Error;

    fn try_from(columns: Vec<ColumnSpec>) -> Result<Self> {
        Self::new(columns)
    }
}

impl From<RowSchema> for Vec<ColumnSpec> {
    fn from(schema: RowSchema) -> Self {
        schema.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_columns() {
        let schema = RowSchema::new(vec![
            ColumnSpec::field("name").with_label("Name"),
            ColumnSpec::multiple(),
        ])
        .unwrap();
        assert_eq!(schema.len(), 2);
        assert!(schema.has_multiple());
        assert_eq!(schema.column("name").unwrap().label.as_deref(), Some("Name"));
        assert!(schema.column("missing").is_none());
    }

    #[test]
    fn test_rejects_unnamed_column() {
        let err = RowSchema::new(vec![ColumnSpec::field("a"), ColumnSpec::default()]).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema { column: 1, .. }));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let err = RowSchema::new(vec![ColumnSpec::field("a"), ColumnSpec::field("a")]).unwrap_err();
        assert!(err.to_string().contains("duplicate field name 'a'"));
    }

    #[test]
    fn test_from_json() {
        let schema = RowSchema::from_json(r#"[{ "name": "a" }, { "multiple": true }]"#).unwrap();
        assert_eq!(schema.columns()[1], ColumnSpec::multiple());

        assert!(matches!(RowSchema::from_json("{"), Err(Error::Json(_))));
        assert!(matches!(
            RowSchema::from_json(r#"[{ "label": "x" }]"#),
            Err(Error::InvalidSchema { column: 0, .. })
        ));
    }

    #[test]
    fn test_serialize_round_trip() {
        let schema = RowSchema::new(vec![ColumnSpec::field("a")]).unwrap();
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"[{"name":"a"}]"#);
        let parsed: RowSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, schema);
    }
}
