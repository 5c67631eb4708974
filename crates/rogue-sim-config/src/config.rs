// SPDX-License-Identifier: Apache-2.0
//! Config storage port and the service that persists [`RunPrefs`] through
//! it.
//!
//! The service never touches a filesystem or database directly; callers
//! inject a [`ConfigStore`] for whatever backend they have (a directory on
//! disk, an in-memory map for tests), matching the capability-injection
//! style used throughout `rogue-sim-core`.

use serde_json::Error as JsonError;
use thiserror::Error;

use crate::prefs::RunPrefs;

/// Storage key under which the run preferences blob is kept.
const RUN_PREFS_KEY: &str = "run_prefs";

/// Storage key prefix for a pack-specific preference override, keyed by the
/// descriptor pack's directory name (`RunPrefs::last_pack_name`).
const PACK_OVERRIDE_PREFIX: &str = "pack_override::";

/// Storage port for raw config blobs, keyed by logical name.
pub trait ConfigStore {
    /// Loads a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persists a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Errors raised by [`ConfigStore`]/[`ConfigService`] operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in the store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] JsonError),
}

/// Loads and persists [`RunPrefs`] (and per-pack overrides of it) through an
/// injected [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Creates a new service backed by `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consumes the service and returns the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Loads the host application's run preferences. Returns `None` if
    /// missing or if the stored blob fails to deserialize.
    pub fn load_prefs(&self) -> Option<RunPrefs> {
        self.load_value(RUN_PREFS_KEY)
    }

    /// Persists run preferences. Best-effort: failures are logged rather
    /// than propagated, since losing a preferences write should never abort
    /// a run.
    pub fn save_prefs(&self, prefs: &RunPrefs) {
        self.save_value(RUN_PREFS_KEY, prefs);
    }

    /// Loads a preference override scoped to `pack_name`, falling back to
    /// `None` if the pack has never had one saved.
    pub fn load_pack_override(&self, pack_name: &str) -> Option<RunPrefs> {
        self.load_value(&pack_override_key(pack_name))
    }

    /// Persists a preference override scoped to `pack_name`. Best-effort,
    /// same contract as [`Self::save_prefs`].
    pub fn save_pack_override(&self, pack_name: &str, prefs: &RunPrefs) {
        self.save_value(&pack_override_key(pack_name), prefs);
    }

    fn load_value(&self, key: &str) -> Option<RunPrefs> {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => None,
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!("failed to parse config blob {key}: {e}");
                    None
                }
            },
            Err(ConfigError::NotFound) => None,
            Err(e) => {
                log::warn!("failed to load config blob {key}: {e}");
                None
            }
        }
    }

    fn save_value(&self, key: &str, value: &RunPrefs) {
        match serde_json::to_vec_pretty(value) {
            Ok(data) => {
                if let Err(e) = self.store.save_raw(key, &data) {
                    log::warn!("failed to persist config blob {key}: {e}");
                }
            }
            Err(e) => log::warn!("failed to serialize config blob {key}: {e}"),
        }
    }
}

fn pack_override_key(pack_name: &str) -> String {
    format!("{PACK_OVERRIDE_PREFIX}{pack_name}")
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemStore(RefCell<HashMap<String, Vec<u8>>>);

    impl ConfigStore for MemStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.0.borrow().get(key).cloned().ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.0.borrow_mut().insert(key.to_string(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn load_prefs_is_none_before_any_save() {
        let service = ConfigService::new(MemStore::default());
        assert!(service.load_prefs().is_none());
    }

    #[test]
    fn save_then_load_prefs_round_trips() {
        let service = ConfigService::new(MemStore::default());
        let prefs = RunPrefs { last_seed: 99, last_pack_name: Some("core".into()), allow_hot_reload: true };
        service.save_prefs(&prefs);
        assert_eq!(service.load_prefs(), Some(prefs));
    }

    #[test]
    fn pack_overrides_are_stored_independently_of_the_global_prefs() {
        let service = ConfigService::new(MemStore::default());
        let global = RunPrefs { last_seed: 1, last_pack_name: Some("core".into()), allow_hot_reload: false };
        let override_prefs = RunPrefs { last_seed: 2, last_pack_name: Some("core".into()), allow_hot_reload: true };
        service.save_prefs(&global);
        service.save_pack_override("core", &override_prefs);

        assert_eq!(service.load_prefs(), Some(global));
        assert_eq!(service.load_pack_override("core"), Some(override_prefs));
        assert_eq!(service.load_pack_override("other-pack"), None);
    }

    #[test]
    fn malformed_blob_loads_as_none_instead_of_erroring() {
        let store = MemStore::default();
        store.save_raw(RUN_PREFS_KEY, b"not json").expect("save succeeds");
        let service = ConfigService::new(store);
        assert!(service.load_prefs().is_none());
    }
}
