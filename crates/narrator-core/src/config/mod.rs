//! Configuration for the narration synchronizer.
//!
//! Settings are read from `conf/config.toml` when present. The file is split
//! into sections (`[navigation]`, `[mapping]`, `[extraction]`, `[narration]`,
//! `[errors]`, `[logging]`); anything missing or invalid falls back to
//! defaults so a session can always start.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{LogLevel, MAX_DEBOUNCE_MS, MAX_RATE, MIN_RATE, MappingStrategy, SyncConfig};
