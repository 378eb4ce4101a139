//! Configuration for the TCR dashboard.
//!
//! The file is TOML. Implementation tables (`[account]`, `[delivery]`,
//! `[storage]`) are kept as raw `toml::Value`s and handed to the matching
//! `create_*` factory, which validates them against its own schema.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Complete dashboard configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub dashboard: DashboardSettings,
	/// Wallet session settings, see `tcr_account::create_account`.
	pub account: toml::Value,
	/// Chain-call settings, see `tcr_delivery::create_delivery`.
	pub delivery: toml::Value,
	/// Storage backend settings, see `tcr_storage::create_storage`.
	#[serde(default = "default_storage")]
	pub storage: toml::Value,
	#[serde(default)]
	pub engine: EngineSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardSettings {
	pub name: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

/// Sizing of the engine's channels.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
	#[serde(default = "default_intent_queue_size")]
	pub intent_queue_size: usize,
	#[serde(default = "default_event_bus_capacity")]
	pub event_bus_capacity: usize,
}

impl Default for EngineSettings {
	fn default() -> Self {
		Self {
			intent_queue_size: default_intent_queue_size(),
			event_bus_capacity: default_event_bus_capacity(),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_intent_queue_size() -> usize {
	64
}

fn default_event_bus_capacity() -> usize {
	256
}

fn default_storage() -> toml::Value {
	let mut table = toml::map::Map::new();
	table.insert("backend".to_string(), toml::Value::String("file".to_string()));
	toml::Value::Table(table)
}

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "TCR_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<Config, ConfigError> {
		let file_path = self.file_path.as_ref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;

		let content = tokio::fs::read_to_string(file_path).await.map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				ConfigError::FileNotFound(file_path.clone())
			} else {
				ConfigError::IoError(e)
			}
		})?;

		self.load_str(&content)
	}

	/// Parses configuration text, applying substitution, overrides and validation.
	pub fn load_str(&self, content: &str) -> Result<Config, ConfigError> {
		let substituted = substitute_env_vars(content)?;

		let mut config: Config =
			toml::from_str(&substituted).map_err(|e| ConfigError::ParseError(e.to_string()))?;

		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;

		Ok(config)
	}

	fn apply_env_overrides(&self, config: &mut Config) -> Result<(), ConfigError> {
		if let Ok(log_level) = env::var(format!("{}LOG_LEVEL", self.env_prefix)) {
			debug!("Overriding log level from environment");
			config.dashboard.log_level = log_level;
		}

		if let Ok(rpc_url) = env::var(format!("{}RPC_URL", self.env_prefix)) {
			debug!("Overriding RPC URL from environment");
			set_table_field(&mut config.delivery, "delivery", "rpc_url", rpc_url)?;
		}

		if let Ok(key) = env::var(format!("{}PRIVATE_KEY", self.env_prefix)) {
			debug!("Overriding private key from environment");
			set_table_field(&mut config.account, "account", "private_key", key)?;
		}

		Ok(())
	}
}

/// Replaces every `${VAR_NAME}` with the variable's value.
fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;
	let mut result = content.to_string();

	for cap in re.captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

fn set_table_field(
	section: &mut toml::Value,
	section_name: &str,
	field: &str,
	value: String,
) -> Result<(), ConfigError> {
	let table = section.as_table_mut().ok_or_else(|| {
		ConfigError::ValidationError(format!("[{}] must be a table", section_name))
	})?;
	table.insert(field.to_string(), toml::Value::String(value));
	Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
	if config.dashboard.name.trim().is_empty() {
		return Err(ConfigError::ValidationError(
			"dashboard.name must not be empty".to_string(),
		));
	}

	for (name, section) in [
		("account", &config.account),
		("delivery", &config.delivery),
		("storage", &config.storage),
	] {
		if !section.is_table() {
			return Err(ConfigError::ValidationError(format!(
				"[{}] must be a table",
				name
			)));
		}
	}

	if config.engine.intent_queue_size == 0 || config.engine.event_bus_capacity == 0 {
		return Err(ConfigError::ValidationError(
			"engine channel sizes must be greater than zero".to_string(),
		));
	}

	Ok(())
}
