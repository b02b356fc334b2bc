//! Durable points ledger backed by a single JSON document

use poise::serenity_prelude::{ChannelId, RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::{
	collections::BTreeMap,
	io,
	path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt as _};

/// Failures of the backing medium
#[derive(Debug, thiserror::Error)]
pub(crate) enum StorageError {
	/// The file could not be read or written
	#[error("ledger file `{}` is not accessible", path.display())]
	Io {
		/// The ledger path
		path: PathBuf,
		/// The underlying io error
		#[source]
		source: io::Error,
	},
	/// The file content is not a valid ledger document
	#[error("ledger file `{}` is corrupt", path.display())]
	Corrupt {
		/// The ledger path
		path: PathBuf,
		/// The decoding error
		#[source]
		source: serde_json::Error,
	},
}

/// Points and tier tracking of a single user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredEntry")]
pub(crate) struct LedgerEntry {
	/// Current point total
	pub(crate) points: u64,
	/// The tier role last attached to the user
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub(crate) tier_role_id: Option<u64>,
}

/// Every shape an entry was ever written with
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
	/// Bare point total, without tier tracking
	Legacy(u64),
	/// Point total with the tracked tier role
	Tracked {
		/// Current point total
		points: u64,
		/// The tier role last attached to the user
		#[serde(default)]
		tier_role_id: Option<u64>,
	},
}

impl From<StoredEntry> for LedgerEntry {
	fn from(entry: StoredEntry) -> Self {
		match entry {
			StoredEntry::Legacy(points) => Self {
				points,
				tier_role_id: None,
			},
			StoredEntry::Tracked {
				points,
				tier_role_id,
			} => Self {
				points,
				tier_role_id,
			},
		}
	}
}

/// The persisted document
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
	/// Channel receiving event records
	#[serde(default)]
	log_channel_id: Option<u64>,
	/// Entries keyed by user id
	#[serde(default)]
	points: BTreeMap<u64, LedgerEntry>,
}

/// In-memory ledger bound to its file
#[derive(Debug)]
pub(crate) struct PointsStore {
	/// Location of the document
	path: PathBuf,
	/// Current state, flushed by [`PointsStore::save`]
	document: LedgerDocument,
}

impl PointsStore {
	/// Load the ledger at `path`, creating an empty one if there is none
	pub(crate) async fn load(path: impl Into<PathBuf> + Send) -> Result<Self, StorageError> {
		let path = path.into();

		let content = match fs::read_to_string(&path).await {
			Ok(content) => content,
			Err(error) if error.kind() == io::ErrorKind::NotFound => {
				tracing::info!(path = %path.display(), "creating an empty ledger");

				let store = Self {
					path,
					document: LedgerDocument::default(),
				};
				store.save().await?;

				return Ok(store);
			}
			Err(source) => return Err(StorageError::Io { path, source }),
		};

		let document = serde_json::from_str(&content)
			.map_err(|source| StorageError::Corrupt { path: path.clone(), source })?;

		Ok(Self { path, document })
	}

	/// Replace the whole persisted document with the in-memory state
	pub(crate) async fn save(&self) -> Result<(), StorageError> {
		let io_error = |source| StorageError::Io {
			path: self.path.clone(),
			source,
		};

		let mut buffer = Vec::new();
		let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
		let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
		self.document
			.serialize(&mut serializer)
			.map_err(|source| StorageError::Corrupt {
				path: self.path.clone(),
				source,
			})?;

		// Write aside then rename over the document
		let temporary = temporary_path(&self.path);
		let mut file = fs::File::create(&temporary).await.map_err(io_error)?;
		file.write_all(&buffer).await.map_err(io_error)?;
		file.sync_all().await.map_err(io_error)?;
		fs::rename(&temporary, &self.path).await.map_err(io_error)?;

		Ok(())
	}

	/// Add `delta` to the user total and return the new total
	pub(crate) fn increment(&mut self, user: UserId, delta: u64) -> u64 {
		let entry = self.document.points.entry(user.get()).or_default();
		entry.points += delta;

		entry.points
	}

	/// Current total of a user, zero if unknown
	pub(crate) fn points(&self, user: UserId) -> u64 {
		self.document
			.points
			.get(&user.get())
			.map_or(0, |entry| entry.points)
	}

	/// The tracked tier role of a user
	pub(crate) fn tier_role(&self, user: UserId) -> Option<RoleId> {
		self.document
			.points
			.get(&user.get())
			.and_then(|entry| entry.tier_role_id)
			.map(RoleId::new)
	}

	/// Track the tier role currently attached to a user
	pub(crate) fn set_tier_role(&mut self, user: UserId, role: Option<RoleId>) {
		self.document.points.entry(user.get()).or_default().tier_role_id = role.map(RoleId::get);
	}

	/// Drop every tracking entry pointing at `role`, returning how many were cleared
	pub(crate) fn forget_tier_role(&mut self, role: RoleId) -> usize {
		let mut cleared = 0;

		for entry in self.document.points.values_mut() {
			if entry.tier_role_id == Some(role.get()) {
				entry.tier_role_id = None;
				cleared += 1;
			}
		}

		cleared
	}

	/// The configured log channel
	pub(crate) fn log_channel(&self) -> Option<ChannelId> {
		self.document.log_channel_id.map(ChannelId::new)
	}

	/// Replace the configured log channel
	pub(crate) fn set_log_channel(&mut self, channel: ChannelId) {
		self.document.log_channel_id = Some(channel.get());
	}
}

/// Sibling file used to replace the document in one rename
fn temporary_path(path: &Path) -> PathBuf {
	let mut name = path.file_name().unwrap_or_default().to_os_string();
	name.push(".tmp");

	path.with_file_name(name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use tokio::sync::Mutex;

	fn user(id: u64) -> UserId {
		UserId::new(id)
	}

	#[tokio::test]
	async fn load_creates_missing_ledger() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("data.json");

		let store = PointsStore::load(&path).await.unwrap();

		assert!(path.exists());
		assert_eq!(store.points(user(1)), 0);
		assert_eq!(store.log_channel(), None);
	}

	#[tokio::test]
	async fn increment_is_additive() {
		let dir = tempfile::tempdir().unwrap();
		let mut store = PointsStore::load(dir.path().join("data.json")).await.unwrap();

		for delta in 1..=5 {
			let before = store.points(user(7));
			let after = store.increment(user(7), delta);

			assert_eq!(after, before + delta);
		}

		assert_eq!(store.points(user(7)), 15);
	}

	#[tokio::test]
	async fn saved_ledger_survives_reload() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("data.json");

		let mut store = PointsStore::load(&path).await.unwrap();
		store.increment(user(111), 2);
		store.set_tier_role(user(111), Some(RoleId::new(555)));
		store.set_log_channel(ChannelId::new(42));
		store.save().await.unwrap();

		let reloaded = PointsStore::load(&path).await.unwrap();
		assert_eq!(reloaded.points(user(111)), 2);
		assert_eq!(reloaded.tier_role(user(111)), Some(RoleId::new(555)));
		assert_eq!(reloaded.log_channel(), Some(ChannelId::new(42)));
	}

	#[tokio::test]
	async fn document_uses_string_keys_and_four_space_indent() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("data.json");

		let mut store = PointsStore::load(&path).await.unwrap();
		store.increment(user(111), 3);
		store.save().await.unwrap();

		let content = std::fs::read_to_string(&path).unwrap();
		assert!(content.contains("\n    \"log_channel_id\": null"));

		let value: serde_json::Value = serde_json::from_str(&content).unwrap();
		assert_eq!(value["points"]["111"]["points"], 3);
		assert!(value["points"]["111"].get("tier_role_id").is_none());
	}

	#[tokio::test]
	async fn legacy_integer_entries_are_accepted() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("data.json");
		std::fs::write(
			&path,
			r#"{ "log_channel_id": 9, "points": { "111": 4, "222": { "points": 1, "tier_role_id": 8 } } }"#,
		)
		.unwrap();

		let store = PointsStore::load(&path).await.unwrap();

		assert_eq!(store.points(user(111)), 4);
		assert_eq!(store.tier_role(user(111)), None);
		assert_eq!(store.points(user(222)), 1);
		assert_eq!(store.tier_role(user(222)), Some(RoleId::new(8)));
		assert_eq!(store.log_channel(), Some(ChannelId::new(9)));

		store.save().await.unwrap();

		let value: serde_json::Value =
			serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
		assert_eq!(value["points"]["111"]["points"], 4);
		assert!(value["points"]["111"].get("tier_role_id").is_none());
		assert_eq!(value["points"]["222"]["tier_role_id"], 8);

		let reloaded = PointsStore::load(&path).await.unwrap();
		assert_eq!(reloaded.points(user(111)), 4);
	}

	#[tokio::test]
	async fn corrupt_ledger_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("data.json");
		std::fs::write(&path, "{ not json").unwrap();

		let error = PointsStore::load(&path).await.unwrap_err();

		assert!(matches!(error, StorageError::Corrupt { .. }));
	}

	#[tokio::test]
	async fn unwritable_ledger_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let store = PointsStore {
			path: dir.path().join("missing").join("data.json"),
			document: LedgerDocument::default(),
		};

		assert!(matches!(store.save().await, Err(StorageError::Io { .. })));
	}

	#[tokio::test]
	async fn forget_tier_role_clears_matching_entries() {
		let dir = tempfile::tempdir().unwrap();
		let mut store = PointsStore::load(dir.path().join("data.json")).await.unwrap();
		store.increment(user(1), 1);
		store.increment(user(2), 1);
		store.increment(user(3), 2);
		store.set_tier_role(user(1), Some(RoleId::new(10)));
		store.set_tier_role(user(2), Some(RoleId::new(10)));
		store.set_tier_role(user(3), Some(RoleId::new(20)));

		assert_eq!(store.forget_tier_role(RoleId::new(10)), 2);
		assert_eq!(store.tier_role(user(1)), None);
		assert_eq!(store.tier_role(user(3)), Some(RoleId::new(20)));
		assert_eq!(store.points(user(1)), 1);
	}

	#[tokio::test]
	async fn concurrent_increments_do_not_lose_updates() {
		let dir = tempfile::tempdir().unwrap();
		let store = Arc::new(Mutex::new(
			PointsStore::load(dir.path().join("data.json")).await.unwrap(),
		));

		let tasks: Vec<_> = (1..=20u64)
			.map(|id| {
				let store = Arc::clone(&store);
				tokio::spawn(async move {
					for delta in 1..=5 {
						let mut store = store.lock().await;
						store.increment(UserId::new(id), delta);
						store.save().await.unwrap();
					}
				})
			})
			.collect();

		for task in tasks {
			task.await.unwrap();
		}

		let store = store.lock().await;
		for id in 1..=20 {
			assert_eq!(store.points(user(id)), 15);
		}

		let reloaded = PointsStore::load(&store.path).await.unwrap();
		assert_eq!(reloaded.points(user(20)), 15);
	}
}
