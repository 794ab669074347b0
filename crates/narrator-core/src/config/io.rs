use super::models::SyncConfig;
use super::tables::ConfigTables;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> SyncConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return SyncConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            SyncConfig::default()
        }
    }
}

/// Parse the sectioned TOML layout. Out-of-range values are clamped.
pub fn parse_config(contents: &str) -> Result<SyncConfig, toml::de::Error> {
    let tables: ConfigTables = toml::from_str(contents)?;
    Ok(SyncConfig::from(tables).clamped())
}

pub fn serialize_config(config: &SyncConfig) -> Result<String, toml::ser::Error> {
    toml::to_string(&ConfigTables::from(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogLevel, MappingStrategy};
    use std::time::Duration;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.log_capacity, 100);
        assert!(config.fallback_voice.is_none());
    }

    #[test]
    fn reads_sectioned_tables() {
        let config = parse_config(
            r#"
[navigation]
debounce_ms = 150
skip_empty_pages = false

[mapping]
strategy = "per-page"

[narration]
voice = "en-GB"
fallback_voice = "en-US"
rate = 1.5

[logging]
log_level = "warn"
"#,
        )
        .unwrap();

        assert_eq!(config.debounce_ms, 150);
        assert!(!config.skip_empty_pages);
        assert_eq!(config.mapping_strategy, MappingStrategy::PerPage);
        assert_eq!(config.voice, "en-GB");
        assert_eq!(config.fallback_voice.as_deref(), Some("en-US"));
        assert!((config.rate - 1.5).abs() < f32::EPSILON);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert!(config.ocr_enabled);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let config = parse_config(
            r#"
[narration]
rate = 42.0
volume = -3.0
voice = "  "

[errors]
log_capacity = 0
max_recovery_attempts = 0
"#,
        )
        .unwrap();

        assert!((config.rate - 10.0).abs() < f32::EPSILON);
        assert_eq!(config.volume, 0.0);
        assert_eq!(config.voice, "default");
        assert_eq!(config.log_capacity, 1);
        assert_eq!(config.max_recovery_attempts, 1);
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut config = SyncConfig::default();
        config.mapping_strategy = MappingStrategy::PerPage;
        config.fallback_voice = Some("backup".to_string());
        config.min_text_chars = 40;

        let text = serialize_config(&config).unwrap();
        assert!(text.contains("[navigation]"));
        assert_eq!(parse_config(&text).unwrap(), config);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(parse_config("[navigation\ndebounce_ms = ").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/nonexistent/narrator/config.toml"));
        assert_eq!(config, SyncConfig::default());
    }
}
