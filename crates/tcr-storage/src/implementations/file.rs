//! File-based storage backend.
//!
//! Each key maps to one JSON file under the configured directory. Every
//! write goes to its own temporary file in that directory and is renamed
//! into place, so concurrent writers never share a scratch file.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use tcr_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use tokio::fs;
use tracing::debug;

pub struct FileStorage {
	base_path: PathBuf,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self { base_path }
	}

	/// Maps a storage key to a filesystem-safe path.
	fn file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', '\\', ':'], "_");
		self.base_path.join(format!("{}.json", safe_key))
	}
}

pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("backend", FieldType::String),
				Field::new("storage_path", FieldType::String),
			],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		match fs::read(self.file_path(key)).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.file_path(key);
		let dir = self.base_path.clone();

		let written = path.clone();
		tokio::task::spawn_blocking(move || -> std::io::Result<()> {
			std::fs::create_dir_all(&dir)?;
			let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
			temp.write_all(&value)?;
			temp.as_file().sync_all()?;
			temp.persist(&written).map_err(|e| e.error)?;
			Ok(())
		})
		.await
		.map_err(|e| StorageError::Backend(e.to_string()))?
		.map_err(|e| StorageError::Backend(e.to_string()))?;

		debug!(path = %path.display(), "Persisted value");
		Ok(())
	}
}

/// Creates a file backend from a storage table.
///
/// Configuration parameters:
/// - `storage_path`: base directory (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage");

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_file_storage_persists_across_instances() {
		let dir = TempDir::new().unwrap();

		let storage = FileStorage::new(dir.path().to_path_buf());
		assert!(matches!(
			storage.get_bytes("registries:default").await,
			Err(StorageError::NotFound)
		));
		storage
			.set_bytes("registries:default", b"{}".to_vec())
			.await
			.unwrap();

		let reopened = FileStorage::new(dir.path().to_path_buf());
		assert_eq!(
			reopened.get_bytes("registries:default").await.unwrap(),
			b"{}".to_vec()
		);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_writes_to_one_key() {
		let dir = TempDir::new().unwrap();
		let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()));

		let mut writers = Vec::new();
		for i in 0..32u8 {
			let storage = storage.clone();
			writers.push(tokio::spawn(async move {
				storage.set_bytes("registries:book", vec![i; 64]).await
			}));
		}
		for writer in writers {
			writer.await.unwrap().unwrap();
		}

		let stored = storage.get_bytes("registries:book").await.unwrap();
		assert_eq!(stored.len(), 64);
		assert!(stored.iter().all(|b| *b == stored[0]));

		// Only the value file is left behind.
		let entries = std::fs::read_dir(dir.path()).unwrap().count();
		assert_eq!(entries, 1);
	}

	#[test]
	fn test_factory_rejects_non_string_path() {
		let config: toml::Value = toml::from_str("storage_path = 5").unwrap();
		assert!(create_storage(&config).is_err());
	}
}
