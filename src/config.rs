//! Handler configuration, loaded from a TOML file or built in code.
//! Shaped after the async client's `Options` struct: plain data with a
//! sensible `Default`, deserialised straight off the wire format rather
//! than hand-parsed.

use std::path::Path;

use serde::Deserialize;

use crate::error::BridgeError;
use crate::ids::Role;

#[derive(Clone, Debug, Deserialize)]
pub struct BridgeConfig {
	pub entity_id: u32,
	#[serde(default = "default_entity_version")]
	pub entity_version: u32,
	pub authority_name: String,
	pub role: Role,
	#[serde(default = "default_queue_priority_levels")]
	pub queue_priority_levels: u16,
	/// Used to bound an outbound request's availability wait when the
	/// uMessage itself carries no `ttl_ms`.
	#[serde(default = "default_ttl_ms")]
	pub default_ttl_ms: u32,
}

fn default_entity_version() -> u32 {
	1
}

fn default_queue_priority_levels() -> u16 {
	3
}

fn default_ttl_ms() -> u32 {
	10_000
}

impl BridgeConfig {
	pub fn from_toml_str(contents: &str) -> Result<Self, BridgeError> {
		let config: Self = toml::from_str(contents)?;
		config.validate()?;
		Ok(config)
	}

	pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
		let path = path.as_ref();
		let contents = std::fs::read_to_string(path).map_err(|source| BridgeError::ConfigIo {
			path: path.display().to_string(),
			source,
		})?;
		Self::from_toml_str(&contents)
	}

	fn validate(&self) -> Result<(), BridgeError> {
		if self.queue_priority_levels == 0 {
			return Err(BridgeError::InvalidConfig(
				"queue_priority_levels must be at least 1".into(),
			));
		}
		if self.authority_name.is_empty() {
			return Err(BridgeError::InvalidConfig(
				"authority_name must not be empty".into(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_minimal_config_with_defaults() {
		let config = BridgeConfig::from_toml_str(
			r#"
			entity_id = 4096
			authority_name = "vehicle1"
			role = "client"
			"#,
		)
		.unwrap();

		assert_eq!(config.entity_id, 4096);
		assert_eq!(config.entity_version, 1);
		assert_eq!(config.queue_priority_levels, 3);
		assert_eq!(config.default_ttl_ms, 10_000);
		assert_eq!(config.role, Role::Client);
	}

	#[test]
	fn rejects_zero_priority_levels() {
		let result = BridgeConfig::from_toml_str(
			r#"
			entity_id = 1
			authority_name = "vehicle1"
			role = "server"
			queue_priority_levels = 0
			"#,
		);
		assert!(matches!(result, Err(BridgeError::InvalidConfig(_))));
	}
}
