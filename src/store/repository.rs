//! Load/save of the profile record under its fixed key

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{KeyValueStore, StoreError};
use crate::constants::store::{LEGACY_VISIBILITY_KEY, PROFILE_KEY, SCHEMA_VERSION};
use crate::lists::ListEditor;
use crate::profile::ProfileAggregate;

/// On-disk envelope around the profile
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(default)]
    version: u32,
    #[serde(flatten)]
    profile: ProfileAggregate,
}

/// Rename keys written by older releases. `showProfile` became
/// `visibility`; when both are present `visibility` wins.
fn upgrade_legacy_keys(mut value: Value) -> Value {
    if let Some(fields) = value.as_object_mut()
        && let Some(legacy) = fields.remove(LEGACY_VISIBILITY_KEY)
    {
        if fields.contains_key("visibility") {
            debug!("Dropping legacy showProfile key, visibility is set");
        } else {
            fields.insert("visibility".to_string(), legacy);
        }
    }
    value
}

pub struct ProfileRepository<S> {
    store: S,
    key: String,
    lists: ListEditor,
}

impl<S: KeyValueStore> ProfileRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, PROFILE_KEY)
    }

    pub fn with_key(store: S, key: &str) -> Self {
        Self {
            store,
            key: key.to_string(),
            lists: ListEditor::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Stored profile, or `None` if nothing usable is stored.
    ///
    /// Read failures and corrupt records are logged and treated as absent.
    pub fn load(&self) -> Option<ProfileAggregate> {
        let contents = match self.store.get(&self.key) {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                info!(key = %self.key, "No stored profile");
                return None;
            }
            Err(e) => {
                error!(key = %self.key, error = %e, "Failed to read stored profile, using defaults");
                return None;
            }
        };

        let record = match serde_json::from_str::<Value>(&contents)
            .map(upgrade_legacy_keys)
            .and_then(serde_json::from_value::<StoredRecord>)
        {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Stored profile is corrupt, ignoring it");
                return None;
            }
        };

        if record.version > SCHEMA_VERSION {
            warn!(
                stored = record.version,
                supported = SCHEMA_VERSION,
                "Stored profile written by a newer version, unknown fields are dropped"
            );
        }

        let mut profile = record.profile;
        profile.normalize(&self.lists);
        info!(key = %self.key, "Loaded stored profile");
        Some(profile)
    }

    /// Serialize the whole profile and replace the stored value
    pub fn save(&mut self, profile: &ProfileAggregate) -> Result<(), StoreError> {
        let record = StoredRecord {
            version: SCHEMA_VERSION,
            profile: profile.clone(),
        };
        let json = serde_json::to_string_pretty(&record)?;
        self.store.set(&self.key, &json)?;
        info!(key = %self.key, "Saved profile");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::{CropEngine, CropRegion};
    use crate::avatar::acquire::{acquire, tests::png_blob};
    use crate::profile::{Link, Visibility};
    use crate::store::{FileStore, MemoryStore};
    use tempfile::TempDir;

    fn full_profile() -> ProfileAggregate {
        let source = acquire(&png_blob(50, 40)).unwrap();
        let mut engine = CropEngine::default();
        let id = engine.begin_crop(source);
        engine.update_region(id, CropRegion::full(50, 40)).unwrap();

        ProfileAggregate {
            name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            job_title: "Analyst".to_string(),
            phone: "+441234567890".to_string(),
            email: "ada@example.com".to_string(),
            address: "12 St James's Square, London".to_string(),
            pitch: "First programmer".to_string(),
            visibility: Visibility::Public,
            interests: vec!["math".to_string(), "engines".to_string()],
            potential_interests: vec!["poetry".to_string()],
            links: vec![Link::new("Notes", "https://example.com/notes")],
            avatar: Some(engine.commit(id).unwrap()),
        }
    }

    #[test]
    fn test_empty_store_loads_none() {
        let repo = ProfileRepository::new(MemoryStore::new());
        assert!(repo.load().is_none());
    }

    #[test]
    fn test_round_trip_memory() {
        let mut repo = ProfileRepository::new(MemoryStore::new());
        let profile = full_profile();
        repo.save(&profile).unwrap();
        assert_eq!(repo.load(), Some(profile));
    }

    #[test]
    fn test_round_trip_file_store() {
        let dir = TempDir::new().unwrap();
        let profile = full_profile();
        ProfileRepository::new(FileStore::new(dir.path())).save(&profile).unwrap();

        let reopened = ProfileRepository::new(FileStore::new(dir.path()));
        assert_eq!(reopened.load(), Some(profile));
    }

    #[test]
    fn test_save_replaces_previous_record() {
        let mut repo = ProfileRepository::new(MemoryStore::new());
        repo.save(&full_profile()).unwrap();

        let replacement = ProfileAggregate {
            name: "Grace".to_string(),
            ..Default::default()
        };
        repo.save(&replacement).unwrap();
        assert_eq!(repo.load(), Some(replacement));
    }

    #[test]
    fn test_record_carries_schema_version() {
        let mut repo = ProfileRepository::new(MemoryStore::new());
        repo.save(&ProfileAggregate::default()).unwrap();

        let raw = repo.store().get(PROFILE_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["version"], SCHEMA_VERSION);
        assert_eq!(json["visibility"], "private");
    }

    #[test]
    fn test_corrupt_record_treated_as_absent() {
        let mut store = MemoryStore::new();
        store.set(PROFILE_KEY, "{\"name\": \"Ada\", ").unwrap();
        assert!(ProfileRepository::new(store).load().is_none());
    }

    #[test]
    fn test_unversioned_legacy_record_loads() {
        let mut store = MemoryStore::new();
        store
            .set(
                PROFILE_KEY,
                r#"{"name":"Ada","lastName":"","jobTitle":"","email":"a@b.co","address":"","pitch":"","showProfile":"public"}"#,
            )
            .unwrap();

        let profile = ProfileRepository::new(store).load().unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.visibility, Visibility::Public);
        assert!(profile.interests.is_empty());
    }

    #[test]
    fn test_record_from_first_release_loads() {
        let avatar = full_profile().avatar.unwrap();
        let mut store = MemoryStore::new();
        let written = serde_json::json!({
            "name": "Ada",
            "lastName": "Lovelace",
            "jobTitle": "",
            "phone": "+441234567890",
            "email": "ada@example.com",
            "address": "",
            "pitch": "",
            "interests": ["math"],
            "potentialInterests": [],
            "links": [{ "name": "Notes", "url": "https://example.com" }],
            "showProfile": "public",
            "avatar": avatar.data_uri,
        });
        store.set(PROFILE_KEY, &written.to_string()).unwrap();

        let profile = ProfileRepository::new(store).load().unwrap();
        assert_eq!(profile.visibility, Visibility::Public);
        assert_eq!(profile.interests, vec!["math".to_string()]);
        let loaded = profile.avatar.unwrap();
        assert_eq!(loaded.data_uri, avatar.data_uri);
        assert_eq!((loaded.width, loaded.height), (avatar.width, avatar.height));
    }

    #[test]
    fn test_first_release_record_without_avatar_loads() {
        let mut store = MemoryStore::new();
        store
            .set(PROFILE_KEY, r#"{"name":"Ada","showProfile":"public","avatar":""}"#)
            .unwrap();

        let profile = ProfileRepository::new(store).load().unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.visibility, Visibility::Public);
        assert!(profile.avatar.is_none());
    }

    #[test]
    fn test_visibility_wins_over_legacy_key() {
        let mut store = MemoryStore::new();
        store
            .set(
                PROFILE_KEY,
                r#"{"version":1,"name":"Ada","visibility":"private","showProfile":"public"}"#,
            )
            .unwrap();

        let profile = ProfileRepository::new(store).load().unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.visibility, Visibility::Private);
    }

    #[test]
    fn test_stray_temp_file_not_read_as_record() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".profileData.json.tmp"), "{\"name\": \"Half").unwrap();
        assert!(ProfileRepository::new(FileStore::new(dir.path())).load().is_none());

        let mut repo = ProfileRepository::new(FileStore::new(dir.path()));
        repo.save(&full_profile()).unwrap();
        assert_eq!(repo.load(), Some(full_profile()));
    }

    #[test]
    fn test_write_failure_surfaces_and_keeps_old_value() {
        let mut repo = ProfileRepository::new(MemoryStore::new());
        let original = full_profile();
        repo.save(&original).unwrap();

        repo.store_mut().fail_writes = Some("disk full".to_string());
        let err = repo.save(&ProfileAggregate::default()).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert_eq!(repo.load(), Some(original));
    }
}
