use super::defaults;
use super::models::{LogLevel, MappingStrategy, SyncConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    navigation: NavigationConfig,
    #[serde(default)]
    mapping: MappingConfig,
    #[serde(default)]
    extraction: ExtractionConfig,
    #[serde(default)]
    narration: NarrationConfig,
    #[serde(default)]
    errors: ErrorsConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for SyncConfig {
    fn from(tables: ConfigTables) -> Self {
        SyncConfig {
            debounce_ms: tables.navigation.debounce_ms,
            skip_empty_pages: tables.navigation.skip_empty_pages,
            mapping_strategy: tables.mapping.strategy,
            ocr_enabled: tables.extraction.ocr_enabled,
            min_text_chars: tables.extraction.min_text_chars,
            slow_page_ms: tables.extraction.slow_page_ms,
            voice: tables.narration.voice,
            fallback_voice: tables.narration.fallback_voice,
            rate: tables.narration.rate,
            volume: tables.narration.volume,
            log_capacity: tables.errors.log_capacity,
            max_recovery_attempts: tables.errors.max_recovery_attempts,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&SyncConfig> for ConfigTables {
    fn from(config: &SyncConfig) -> Self {
        ConfigTables {
            navigation: NavigationConfig {
                debounce_ms: config.debounce_ms,
                skip_empty_pages: config.skip_empty_pages,
            },
            mapping: MappingConfig {
                strategy: config.mapping_strategy,
            },
            extraction: ExtractionConfig {
                ocr_enabled: config.ocr_enabled,
                min_text_chars: config.min_text_chars,
                slow_page_ms: config.slow_page_ms,
            },
            narration: NarrationConfig {
                voice: config.voice.clone(),
                fallback_voice: config.fallback_voice.clone(),
                rate: config.rate,
                volume: config.volume,
            },
            errors: ErrorsConfig {
                log_capacity: config.log_capacity,
                max_recovery_attempts: config.max_recovery_attempts,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct NavigationConfig {
    #[serde(default = "defaults::default_debounce_ms")]
    debounce_ms: u64,
    #[serde(default = "defaults::default_skip_empty_pages")]
    skip_empty_pages: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        NavigationConfig {
            debounce_ms: defaults::default_debounce_ms(),
            skip_empty_pages: defaults::default_skip_empty_pages(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
struct MappingConfig {
    #[serde(default)]
    strategy: MappingStrategy,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ExtractionConfig {
    #[serde(default = "defaults::default_ocr_enabled")]
    ocr_enabled: bool,
    #[serde(default = "defaults::default_min_text_chars")]
    min_text_chars: usize,
    #[serde(default = "defaults::default_slow_page_ms")]
    slow_page_ms: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            ocr_enabled: defaults::default_ocr_enabled(),
            min_text_chars: defaults::default_min_text_chars(),
            slow_page_ms: defaults::default_slow_page_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct NarrationConfig {
    #[serde(default = "defaults::default_voice")]
    voice: String,
    #[serde(default)]
    fallback_voice: Option<String>,
    #[serde(default = "defaults::default_rate")]
    rate: f32,
    #[serde(default = "defaults::default_volume")]
    volume: f32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        NarrationConfig {
            voice: defaults::default_voice(),
            fallback_voice: None,
            rate: defaults::default_rate(),
            volume: defaults::default_volume(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ErrorsConfig {
    #[serde(default = "defaults::default_log_capacity")]
    log_capacity: usize,
    #[serde(default = "defaults::default_max_recovery_attempts")]
    max_recovery_attempts: usize,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        ErrorsConfig {
            log_capacity: defaults::default_log_capacity(),
            max_recovery_attempts: defaults::default_max_recovery_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
