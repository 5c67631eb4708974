// SPDX-License-Identifier: Apache-2.0
//! Ambient application services for `rogue-sim`: descriptor pack loading
//! (schema migration, validation, atomic hot-reload) and a small config
//! service for persisting host-application preferences.
//!
//! Kept deliberately thin and framework-agnostic, mirroring the teacher's
//! split between a deterministic engine crate and a surrounding services
//! crate: nothing here touches rendering, input, or networking.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_possible_truncation
)]

/// Config storage port and the `RunPrefs`-specific service built on it.
pub mod config;
/// Descriptor pack loading: schema migration, validation, atomic hot-reload.
pub mod pack;
/// Persisted run preferences.
pub mod prefs;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use pack::{
    BiomeDescriptor, DescriptorPack, FsPackSource, PackLoadError, PackLoader, PackRegistry,
    PackSource, SchemaMigration, CURRENT_SCHEMA_VERSION,
};
pub use prefs::RunPrefs;
