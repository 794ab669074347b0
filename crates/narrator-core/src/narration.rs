//! Interfaces of the external collaborators the synchronizer drives.
//!
//! Speech synthesis, PDF text extraction and OCR live outside this crate;
//! implementations plug in through these traits.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::{MAX_RATE, MIN_RATE, SyncConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceSettings {
    pub voice: String,
    pub rate: f32,
    pub volume: f32,
}

impl VoiceSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            voice: config.voice.clone(),
            rate: config.rate,
            volume: config.volume,
        }
    }

    /// Clamp into the supported ranges. Returns the names of the fields that
    /// had to change.
    pub fn clamp_in_place(&mut self) -> Vec<&'static str> {
        let mut adjusted = Vec::new();
        let rate = if self.rate.is_finite() {
            self.rate.clamp(MIN_RATE, MAX_RATE)
        } else {
            1.0
        };
        if rate != self.rate {
            self.rate = rate;
            adjusted.push("rate");
        }
        let volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        if volume != self.volume {
            self.volume = volume;
            adjusted.push("volume");
        }
        adjusted
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Speaks one sentence and returns once narration of it has finished.
pub trait NarrationSource {
    fn speak(&self, sentence: &str, voice: &VoiceSettings) -> Result<()>;
}

/// Provides per-page text for a document.
pub trait TextSource {
    fn page_count(&self) -> Result<usize>;

    /// Text from the document's text layer. Page numbers are 1-based.
    fn extract_text(&self, page_number: usize) -> Result<String>;

    /// Recognized text for a scanned page.
    fn recognize_text(&self, page_number: usize) -> Result<String> {
        anyhow::bail!("OCR is not available for page {page_number}")
    }

    fn page_has_images(&self, _page_number: usize) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_reports_adjusted_fields() {
        let mut voice = VoiceSettings {
            voice: "default".to_string(),
            rate: 25.0,
            volume: 0.5,
        };
        assert_eq!(voice.clamp_in_place(), vec!["rate"]);
        assert_eq!(voice.rate, MAX_RATE);

        voice.volume = f32::NAN;
        assert_eq!(voice.clamp_in_place(), vec!["volume"]);
        assert_eq!(voice.volume, 1.0);
        assert!(voice.clamp_in_place().is_empty());
    }

    #[test]
    fn default_source_has_no_ocr() {
        struct TextOnly;
        impl TextSource for TextOnly {
            fn page_count(&self) -> Result<usize> {
                Ok(1)
            }
            fn extract_text(&self, _page_number: usize) -> Result<String> {
                Ok(String::new())
            }
        }
        assert!(TextOnly.recognize_text(1).is_err());
        assert!(!TextOnly.page_has_images(1));
    }
}
