//! Records and the per-row record core.
//!
//! A [`FormCore`] owns the field values of one row together with its edit
//! state: the last committed values, validation errors, and the [`RowMode`]
//! describing where the row is in the inline-edit lifecycle.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::anchor::Anchored;
use super::validation::ValidateConfig;
use crate::error::Error;

/// An opaque row record, usually a JSON object of named fields.
pub type Record = Value;

/// A record paired with its canonical offset.
pub type AnchoredRecord = Anchored<Record>;

/// How rows are presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    /// Rows can be edited.
    #[default]
    Edit,
    /// Rows are shown read-only.
    Preview,
    /// Rows are shown but all input is disabled.
    Disabled,
}

impl RowStatus {
    /// The canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            RowStatus::Edit => "edit",
            RowStatus::Preview => "preview",
            RowStatus::Disabled => "disabled",
        }
    }

    /// Returns `true` if rows accept input.
    pub fn is_editable(self) -> bool {
        self == RowStatus::Edit
    }
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RowStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edit" => Ok(RowStatus::Edit),
            "preview" => Ok(RowStatus::Preview),
            "disabled" | "disable" => Ok(RowStatus::Disabled),
            _ => Err(Error::UnknownStatus(s.to_string())),
        }
    }
}

/// Position of a row in the inline-edit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowMode {
    /// Part of the value, not being edited.
    Committed,
    /// Being edited inline; the committed values are still reported.
    Editing,
    /// Added inline and not saved yet; not part of the value.
    Draft,
    /// Added through multi-row inline add; every field input commits.
    Multiple,
}

impl RowMode {
    /// Returns `true` if the row accepts field input.
    pub fn accepts_input(self) -> bool {
        self != RowMode::Committed
    }
}

/// The record core of a single row.
#[derive(Debug, Clone)]
pub struct FormCore {
    values: Record,
    committed: Record,
    anchor: Option<usize>,
    status: RowStatus,
    mode: RowMode,
    errors: BTreeMap<String, String>,
    rules: Arc<ValidateConfig>,
}

impl FormCore {
    /// Creates a committed, unanchored row core without validation rules.
    pub fn new(values: Record) -> Self {
        Self::with_parts(None, values, RowStatus::default(), Arc::default(), RowMode::Committed)
    }

    pub(crate) fn with_parts(
        anchor: Option<usize>,
        values: Record,
        status: RowStatus,
        rules: Arc<ValidateConfig>,
        mode: RowMode,
    ) -> Self {
        Self {
            committed: values.clone(),
            values,
            anchor,
            status,
            mode,
            errors: BTreeMap::new(),
            rules,
        }
    }

    /// The live field values, including unsaved input.
    pub fn values(&self) -> &Record {
        &self.values
    }

    /// The values as of the last commit.
    pub fn committed(&self) -> &Record {
        &self.committed
    }

    /// Canonical offset of the record this row was built from.
    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    pub(crate) fn set_anchor(&mut self, anchor: Option<usize>) {
        self.anchor = anchor;
    }

    pub fn status(&self) -> RowStatus {
        self.status
    }

    pub fn mode(&self) -> RowMode {
        self.mode
    }

    /// Current validation errors keyed by field.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// The validation error of one field.
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    /// Returns `true` if any field currently has an error.
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Replace the live values.
    ///
    /// Objects are merged field by field into the current values; anything
    /// else replaces them outright.
    pub fn set_values(&mut self, values: Record) {
        match (values, &mut self.values) {
            (Value::Object(incoming), Value::Object(current)) => {
                for (field, value) in incoming {
                    self.errors.remove(&field);
                    current.insert(field, value);
                }
            }
            (other, current) => {
                self.errors.clear();
                *current = other;
            }
        }
    }

    /// Set a single field of the live values, clearing its error.
    pub fn set_field(&mut self, field: &str, value: Value) {
        if !self.values.is_object() {
            self.values = Value::Object(Map::new());
        }
        if let Value::Object(fields) = &mut self.values {
            fields.insert(field.to_string(), value);
        }
        self.errors.remove(field);
    }

    /// Validate every field that has rules. Returns `true` on error.
    pub fn validate(&mut self) -> bool {
        let rules = Arc::clone(&self.rules);
        self.errors.clear();
        for field in rules.fields() {
            self.check_field(&rules, field);
        }
        self.has_error()
    }

    /// Validate only `fields`. Returns `true` if any of them has an error.
    pub fn validate_fields<S: AsRef<str>>(&mut self, fields: &[S]) -> bool {
        let rules = Arc::clone(&self.rules);
        let mut failed = false;
        for field in fields {
            failed |= self.check_field(&rules, field.as_ref());
        }
        failed
    }

    fn check_field(&mut self, rules: &ValidateConfig, field: &str) -> bool {
        let value = self.values.get(field).unwrap_or(&Value::Null);
        match rules.validate_field(field, value) {
            Some(message) => {
                self.errors.insert(field.to_string(), message);
                true
            }
            None => {
                self.errors.remove(field);
                false
            }
        }
    }

    pub(crate) fn begin_edit(&mut self) {
        if self.mode == RowMode::Committed {
            self.mode = RowMode::Editing;
        }
    }

    /// Adopt the live values as committed.
    pub(crate) fn commit(&mut self) {
        self.committed = self.values.clone();
        self.errors.clear();
        self.mode = RowMode::Committed;
    }

    /// Discard unsaved input.
    pub(crate) fn revert(&mut self) {
        self.values = self.committed.clone();
        self.errors.clear();
        self.mode = RowMode::Committed;
    }

    /// Replace both live and committed values from outside the row.
    pub(crate) fn apply_update(&mut self, values: Record) {
        self.set_values(values);
        self.committed = self.values.clone();
    }

    /// The record this row contributes to the collection value, if any.
    pub(crate) fn snapshot(&self) -> Option<AnchoredRecord> {
        let record = match self.mode {
            RowMode::Committed | RowMode::Editing => self.committed.clone(),
            RowMode::Multiple => self.values.clone(),
            RowMode::Draft => return None,
        };
        Some(match self.anchor {
            Some(anchor) => Anchored::new(anchor, record),
            None => Anchored::fresh(record),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::validation::Validator;
    use serde_json::json;

    fn rules() -> Arc<ValidateConfig> {
        Arc::new(ValidateConfig::new().rule("name", Validator::required()))
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("edit".parse::<RowStatus>().unwrap(), RowStatus::Edit);
        assert_eq!("Preview".parse::<RowStatus>().unwrap(), RowStatus::Preview);
        assert_eq!("disable".parse::<RowStatus>().unwrap(), RowStatus::Disabled);
        assert!(matches!(
            "locked".parse::<RowStatus>(),
            Err(Error::UnknownStatus(s)) if s == "locked"
        ));
        assert_eq!(RowStatus::default().to_string(), "edit");
        assert_eq!(serde_json::to_value(RowStatus::Disabled).unwrap(), json!("disabled"));
    }

    #[test]
    fn test_set_values_merges_objects() {
        let mut core = FormCore::new(json!({ "name": "Ada", "age": 36 }));
        core.set_values(json!({ "age": 37 }));
        assert_eq!(core.values(), &json!({ "name": "Ada", "age": 37 }));
        assert_eq!(core.committed(), &json!({ "name": "Ada", "age": 36 }));

        core.set_values(json!("scalar"));
        assert_eq!(core.values(), &json!("scalar"));
    }

    #[test]
    fn test_validate_and_clear_on_input() {
        let mut core = FormCore::with_parts(
            None,
            json!({ "name": "" }),
            RowStatus::Edit,
            rules(),
            RowMode::Committed,
        );
        assert!(core.validate());
        assert_eq!(core.error("name"), Some("This field is required"));

        core.set_field("name", json!("Grace"));
        assert!(core.error("name").is_none());
        assert!(!core.validate());
    }

    #[test]
    fn test_validate_fields_only_checks_named() {
        let rules = Arc::new(
            ValidateConfig::new()
                .rule("name", Validator::required())
                .rule("email", Validator::required()),
        );
        let mut core = FormCore::with_parts(None, json!({}), RowStatus::Edit, rules, RowMode::Committed);
        assert!(core.validate_fields(&["name"]));
        assert!(core.error("email").is_none());
    }

    #[test]
    fn test_set_field_on_non_object() {
        let mut core = FormCore::new(Value::Null);
        core.set_field("name", json!("x"));
        assert_eq!(core.values(), &json!({ "name": "x" }));
    }

    #[test]
    fn test_edit_commit_revert() {
        let mut core = FormCore::with_parts(
            Some(3),
            json!({ "name": "a" }),
            RowStatus::Edit,
            rules(),
            RowMode::Committed,
        );
        core.begin_edit();
        core.set_field("name", json!("b"));
        assert_eq!(core.mode(), RowMode::Editing);
        // Editing rows still report their committed values.
        assert_eq!(core.snapshot(), Some(Anchored::new(3, json!({ "name": "a" }))));

        core.revert();
        assert_eq!(core.values(), &json!({ "name": "a" }));
        assert_eq!(core.mode(), RowMode::Committed);

        core.begin_edit();
        core.set_field("name", json!("c"));
        core.commit();
        assert_eq!(core.snapshot(), Some(Anchored::new(3, json!({ "name": "c" }))));
    }

    #[test]
    fn test_snapshot_by_mode() {
        let draft = FormCore::with_parts(None, json!(1), RowStatus::Edit, rules(), RowMode::Draft);
        assert_eq!(draft.snapshot(), None);

        let mut multiple =
            FormCore::with_parts(None, json!({}), RowStatus::Edit, rules(), RowMode::Multiple);
        multiple.set_field("name", json!("live"));
        assert_eq!(multiple.snapshot(), Some(Anchored::fresh(json!({ "name": "live" }))));
        multiple.commit();
        assert_eq!(multiple.mode(), RowMode::Committed);
    }
}
