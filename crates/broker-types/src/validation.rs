//! Configuration validation for pluggable implementations.
//!
//! Implementation tables in the broker's TOML configuration are free-form
//! (`toml::Value`); each implementation validates its own table against a
//! small declarative [`Schema`] before it is instantiated, so a typo fails
//! at startup instead of at first use.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// A required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// A field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// A field has the wrong type.
	#[error("Type mismatch for field '{field}': expected {expected}")]
	TypeMismatch { field: String, expected: String },
}

/// Expected type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// An integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
}

/// Custom validator run after type checking; returns a message on failure.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// One field of a configuration schema.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Attaches a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// A validation schema: fields that must be present and fields that may be.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML table against this schema: required fields must be
	/// present, and every declared field that is present must type-check
	/// and pass its custom validator. Undeclared fields are ignored.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		for field in &self.required {
			match config.get(&field.name) {
				Some(value) => Self::check_field(field, value)?,
				None => return Err(ValidationError::MissingField(field.name.clone())),
			}
		}

		for field in &self.optional {
			if let Some(value) = config.get(&field.name) {
				Self::check_field(field, value)?;
			}
		}

		Ok(())
	}

	fn check_field(field: &Field, value: &toml::Value) -> Result<(), ValidationError> {
		match &field.field_type {
			FieldType::String => {
				if !value.is_str() {
					return Err(ValidationError::TypeMismatch {
						field: field.name.clone(),
						expected: "string".to_string(),
					});
				}
			}
			FieldType::Integer { min, max } => {
				let Some(int_value) = value.as_integer() else {
					return Err(ValidationError::TypeMismatch {
						field: field.name.clone(),
						expected: "integer".to_string(),
					});
				};
				if let Some(min) = min {
					if int_value < *min {
						return Err(ValidationError::InvalidValue {
							field: field.name.clone(),
							message: format!("must be >= {}", min),
						});
					}
				}
				if let Some(max) = max {
					if int_value > *max {
						return Err(ValidationError::InvalidValue {
							field: field.name.clone(),
							message: format!("must be <= {}", max),
						});
					}
				}
			}
			FieldType::Boolean => {
				if !value.is_bool() {
					return Err(ValidationError::TypeMismatch {
						field: field.name.clone(),
						expected: "boolean".to_string(),
					});
				}
			}
		}

		if let Some(validator) = &field.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: field.name.clone(),
				message,
			})?;
		}

		Ok(())
	}
}

/// Trait implemented by every pluggable implementation's schema.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table(entries: &[(&str, toml::Value)]) -> toml::Value {
		let mut map = toml::map::Map::new();
		for (key, value) in entries {
			map.insert(key.to_string(), value.clone());
		}
		toml::Value::Table(map)
	}

	#[test]
	fn test_missing_required_field() {
		let schema = Schema::new(vec![Field::new("api_url", FieldType::String)], vec![]);
		let result = schema.validate(&table(&[]));
		assert!(matches!(result, Err(ValidationError::MissingField(f)) if f == "api_url"));
	}

	#[test]
	fn test_type_mismatch() {
		let schema = Schema::new(vec![Field::new("api_url", FieldType::String)], vec![]);
		let result = schema.validate(&table(&[("api_url", toml::Value::Integer(7))]));
		assert!(matches!(result, Err(ValidationError::TypeMismatch { .. })));
	}

	#[test]
	fn test_integer_bounds() {
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);

		assert!(schema
			.validate(&table(&[("timeout_seconds", toml::Value::Integer(30))]))
			.is_ok());
		assert!(schema
			.validate(&table(&[("timeout_seconds", toml::Value::Integer(0))]))
			.is_err());
	}

	#[test]
	fn test_custom_validator() {
		let schema = Schema::new(
			vec![Field::new("api_url", FieldType::String).with_validator(|value| {
				let url = value.as_str().unwrap_or_default();
				if url.starts_with("http") {
					Ok(())
				} else {
					Err("must be an http(s) URL".to_string())
				}
			})],
			vec![],
		);

		assert!(schema
			.validate(&table(&[(
				"api_url",
				toml::Value::String("https://platform.example".to_string())
			)]))
			.is_ok());
		assert!(schema
			.validate(&table(&[(
				"api_url",
				toml::Value::String("ftp://nope".to_string())
			)]))
			.is_err());
	}
}
