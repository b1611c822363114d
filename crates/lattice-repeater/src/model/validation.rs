//! Field validation rules for row editing.
//!
//! A [`ValidateConfig`] maps field names to one or more [`Validator`]s. Every
//! row core of a repeater shares the same configuration.
//!
//! ```
//! use lattice_repeater::model::{ValidateConfig, Validator};
//!
//! let rules = ValidateConfig::new()
//!     .rule("name", Validator::required())
//!     .rule("age", Validator::new(|value| match value.as_u64() {
//!         Some(age) if age < 150 => Ok(()),
//!         _ => Err("age must be a number below 150".to_string()),
//!     }));
//!
//! assert!(rules.validate_field("name", &serde_json::json!("")).is_some());
//! assert!(rules.validate_field("age", &serde_json::json!(42)).is_none());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Type alias for a validation function.
///
/// Returns `Err(message)` when the value is invalid.
pub type ValidateFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// A single validation rule.
#[derive(Clone)]
pub struct Validator {
    check: ValidateFn,
}

impl Validator {
    /// Creates a validator from a closure.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
        }
    }

    /// Rejects `null`, empty strings, empty arrays and empty objects.
    pub fn required() -> Self {
        Self::new(|value| {
            let missing = match value {
                Value::Null => true,
                Value::String(s) => s.trim().is_empty(),
                Value::Array(items) => items.is_empty(),
                Value::Object(fields) => fields.is_empty(),
                Value::Bool(_) | Value::Number(_) => false,
            };
            if missing {
                Err("This field is required".to_string())
            } else {
                Ok(())
            }
        })
    }

    /// Runs the rule against a value.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        (self.check)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator")
    }
}

/// Validation rules keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct ValidateConfig {
    rules: BTreeMap<String, Vec<Validator>>,
}

impl ValidateConfig {
    /// Creates an empty configuration (every value is valid).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule for `field`, builder style.
    pub fn rule(mut self, field: impl Into<String>, validator: Validator) -> Self {
        self.add_rule(field, validator);
        self
    }

    /// Adds a rule for `field`.
    pub fn add_rule(&mut self, field: impl Into<String>, validator: Validator) {
        self.rules.entry(field.into()).or_default().push(validator);
    }

    /// Returns `true` if no rules are configured.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Names of all fields with at least one rule, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Checks `value` against the rules for `field`.
    ///
    /// Returns the first failure message, or `None` if the value is valid or
    /// the field has no rules.
    pub fn validate_field(&self, field: &str, value: &Value) -> Option<String> {
        self.rules
            .get(field)?
            .iter()
            .find_map(|validator| validator.check(value).err())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required() {
        let required = Validator::required();
        assert!(required.check(&Value::Null).is_err());
        assert!(required.check(&json!("  ")).is_err());
        assert!(required.check(&json!([])).is_err());
        assert!(required.check(&json!("x")).is_ok());
        assert!(required.check(&json!(0)).is_ok());
        assert!(required.check(&json!(false)).is_ok());
    }

    #[test]
    fn test_first_failure_wins() {
        let rules = ValidateConfig::new()
            .rule("code", Validator::required())
            .rule("code", Validator::new(|v| {
                if v.as_str().is_some_and(|s| s.len() == 3) {
                    Ok(())
                } else {
                    Err("code must have 3 characters".to_string())
                }
            }));

        assert_eq!(
            rules.validate_field("code", &json!("")).as_deref(),
            Some("This field is required")
        );
        assert_eq!(
            rules.validate_field("code", &json!("ab")).as_deref(),
            Some("code must have 3 characters")
        );
        assert_eq!(rules.validate_field("code", &json!("abc")), None);
    }

    #[test]
    fn test_unknown_field_is_valid() {
        let rules = ValidateConfig::new().rule("name", Validator::required());
        assert_eq!(rules.validate_field("other", &Value::Null), None);
        assert_eq!(rules.fields().collect::<Vec<_>>(), vec!["name"]);
        assert!(ValidateConfig::new().is_empty());
    }
}
