//! Configuration validation for implementation factories.
//!
//! Every `create_*` factory checks its TOML table against a [`Schema`] before
//! building anything, so misconfiguration surfaces as a [`ValidationError`].

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// Error that occurs when a required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// Error that occurs when a field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// Error that occurs when field type is incorrect.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
}

/// Type alias for field validator functions.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A field definition with name and type.
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
	/// Creates a new field with the given name and type.
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;

		match &self.validator {
			Some(validator) => validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			}),
			None => Ok(()),
		}
	}
}

/// Schema definition with required and optional fields.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	/// Creates a new schema with required and optional fields.
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

/// Validates that a value matches the expected field type.
fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(ValidationError::TypeMismatch {
					field: field_name.to_string(),
					expected: "string".to_string(),
					actual: value.type_str().to_string(),
				});
			}
		}
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| ValidationError::TypeMismatch {
					field: field_name.to_string(),
					expected: "integer".to_string(),
					actual: value.type_str().to_string(),
				})?;

			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is less than minimum {}", int_val, min_val),
					});
				}
			}

			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is greater than maximum {}", int_val, max_val),
					});
				}
			}
		}
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(ValidationError::TypeMismatch {
					field: field_name.to_string(),
					expected: "boolean".to_string(),
					actual: value.type_str().to_string(),
				});
			}
		}
	}

	Ok(())
}

/// Trait defining a configuration schema that can validate TOML values.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

/// Validator for `0x`-prefixed 32-byte private keys.
pub fn private_key_validator(value: &toml::Value) -> Result<(), String> {
	let key = value.as_str().unwrap_or_default();
	let key_without_prefix = key.strip_prefix("0x").unwrap_or(key);

	if key_without_prefix.len() != 64 {
		return Err("Private key must be 64 hex characters (32 bytes)".to_string());
	}

	if hex::decode(key_without_prefix).is_err() {
		return Err("Private key must be valid hexadecimal".to_string());
	}

	Ok(())
}

/// Validator for HTTP(S) endpoint URLs.
pub fn http_url_validator(value: &toml::Value) -> Result<(), String> {
	let url = value.as_str().unwrap_or_default();
	if url.starts_with("http://") || url.starts_with("https://") {
		Ok(())
	} else {
		Err("RPC URL must start with http:// or https://".to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn delivery_schema() -> Schema {
		Schema::new(
			vec![
				Field::new("rpc_url", FieldType::String).with_validator(http_url_validator),
				Field::new(
					"chain_id",
					FieldType::Integer {
						min: Some(1),
						max: None,
					},
				),
			],
			vec![Field::new(
				"confirmations",
				FieldType::Integer {
					min: Some(0),
					max: Some(64),
				},
			)],
		)
	}

	#[test]
	fn test_valid_table_passes() {
		let config: toml::Value = toml::from_str(
			r#"
rpc_url = "http://localhost:8545"
chain_id = 1337
confirmations = 1
"#,
		)
		.unwrap();

		assert!(delivery_schema().validate(&config).is_ok());
	}

	#[test]
	fn test_missing_and_mistyped_fields() {
		let missing: toml::Value = toml::from_str(r#"rpc_url = "http://localhost:8545""#).unwrap();
		assert!(matches!(
			delivery_schema().validate(&missing),
			Err(ValidationError::MissingField(f)) if f == "chain_id"
		));

		let mistyped: toml::Value = toml::from_str(
			r#"
rpc_url = "http://localhost:8545"
chain_id = "one"
"#,
		)
		.unwrap();
		assert!(matches!(
			delivery_schema().validate(&mistyped),
			Err(ValidationError::TypeMismatch { .. })
		));
	}

	#[test]
	fn test_custom_validators_and_bounds() {
		let bad_url: toml::Value = toml::from_str(
			r#"
rpc_url = "ws://localhost:8545"
chain_id = 1
"#,
		)
		.unwrap();
		assert!(matches!(
			delivery_schema().validate(&bad_url),
			Err(ValidationError::InvalidValue { field, .. }) if field == "rpc_url"
		));

		let out_of_range: toml::Value = toml::from_str(
			r#"
rpc_url = "http://localhost:8545"
chain_id = 1
confirmations = 100
"#,
		)
		.unwrap();
		assert!(delivery_schema().validate(&out_of_range).is_err());

		assert!(private_key_validator(&toml::Value::String("0x12".into())).is_err());
		assert!(private_key_validator(&toml::Value::String(format!("0x{}", "ab".repeat(32)))).is_ok());
	}
}
