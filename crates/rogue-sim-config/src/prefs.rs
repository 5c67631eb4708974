// SPDX-License-Identifier: Apache-2.0
//! Persisted run preferences: the handful of session-scoped choices a host
//! application wants to remember between launches.

use serde::{Deserialize, Serialize};

/// Preferences a host application persists between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunPrefs {
    /// World-gen seed used on the previous run, offered as a default.
    pub last_seed: u32,
    /// Name of the descriptor pack directory last loaded successfully.
    pub last_pack_name: Option<String>,
    /// Whether the host should watch the active pack directory for changes
    /// and hot-reload it.
    pub allow_hot_reload: bool,
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefs_disable_hot_reload_and_have_no_remembered_pack() {
        let prefs = RunPrefs::default();
        assert_eq!(prefs.last_seed, 0);
        assert_eq!(prefs.last_pack_name, None);
        assert!(!prefs.allow_hot_reload);
    }

    #[test]
    fn round_trips_through_json() {
        let prefs = RunPrefs { last_seed: 7, last_pack_name: Some("default".into()), allow_hot_reload: true };
        let json = serde_json::to_string(&prefs).expect("serializes");
        let back: RunPrefs = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(prefs, back);
    }
}
