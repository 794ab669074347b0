use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::defaults;

pub const MIN_RATE: f32 = 0.1;
pub const MAX_RATE: f32 = 10.0;
pub const MAX_DEBOUNCE_MS: u64 = 5_000;

/// Flattened synchronizer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub debounce_ms: u64,
    pub skip_empty_pages: bool,
    pub mapping_strategy: MappingStrategy,
    pub ocr_enabled: bool,
    pub min_text_chars: usize,
    pub slow_page_ms: u64,
    pub voice: String,
    pub fallback_voice: Option<String>,
    pub rate: f32,
    pub volume: f32,
    pub log_capacity: usize,
    pub max_recovery_attempts: usize,
    pub log_level: LogLevel,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            debounce_ms: defaults::default_debounce_ms(),
            skip_empty_pages: defaults::default_skip_empty_pages(),
            mapping_strategy: MappingStrategy::default(),
            ocr_enabled: defaults::default_ocr_enabled(),
            min_text_chars: defaults::default_min_text_chars(),
            slow_page_ms: defaults::default_slow_page_ms(),
            voice: defaults::default_voice(),
            fallback_voice: None,
            rate: defaults::default_rate(),
            volume: defaults::default_volume(),
            log_capacity: defaults::default_log_capacity(),
            max_recovery_attempts: defaults::default_max_recovery_attempts(),
            log_level: defaults::default_log_level(),
        }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn slow_page_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_page_ms)
    }

    /// Keep values inside the ranges the synchronizer supports.
    pub fn clamped(mut self) -> Self {
        self.debounce_ms = self.debounce_ms.min(MAX_DEBOUNCE_MS);
        self.rate = if self.rate.is_finite() {
            self.rate.clamp(MIN_RATE, MAX_RATE)
        } else {
            defaults::default_rate()
        };
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            defaults::default_volume()
        };
        self.log_capacity = self.log_capacity.max(1);
        self.max_recovery_attempts = self.max_recovery_attempts.max(1);
        if self.voice.trim().is_empty() {
            self.voice = defaults::default_voice();
        }
        self.fallback_voice = self
            .fallback_voice
            .filter(|voice| !voice.trim().is_empty());
        self
    }
}

/// How sentences are distributed over pages.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MappingStrategy {
    /// Fixed contiguous blocks of `ceil(sentences / pages)`.
    #[default]
    Block,
    /// Sentences stay on the page their text was extracted from.
    PerPage,
}

impl std::fmt::Display for MappingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MappingStrategy::Block => "block",
            MappingStrategy::PerPage => "per-page",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
