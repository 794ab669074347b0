//! File-backed collaborators for running narration without a renderer.

use anyhow::{Context, Result, anyhow};
use narrator_core::{NarrationSource, TextSource, VoiceSettings};
use std::fs;
use std::path::Path;
use tracing::info;

const PAGE_BREAK: char = '\x0c';

/// Text dumped by `pdftotext`, one form feed between pages.
pub struct PlainTextSource {
    pages: Vec<String>,
}

impl PlainTextSource {
    pub fn open(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Self::from_text(&contents))
    }

    pub fn from_text(contents: &str) -> Self {
        let body = contents.strip_suffix(PAGE_BREAK).unwrap_or(contents);
        let pages = if body.is_empty() {
            Vec::new()
        } else {
            body.split(PAGE_BREAK).map(str::to_string).collect()
        };
        Self { pages }
    }
}

impl TextSource for PlainTextSource {
    fn page_count(&self) -> Result<usize> {
        Ok(self.pages.len())
    }

    fn extract_text(&self, page_number: usize) -> Result<String> {
        page_number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
            .cloned()
            .ok_or_else(|| anyhow!("page {page_number} is out of range"))
    }
}

/// Writes each sentence to the log instead of an audio device.
pub struct LogNarrator;

impl NarrationSource for LogNarrator {
    fn speak(&self, sentence: &str, voice: &VoiceSettings) -> Result<()> {
        info!(voice = %voice.voice, rate = voice.rate, "{sentence}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_form_feeds() {
        let source = PlainTextSource::from_text("First page.\x0c\x0cThird page.\x0c");
        assert_eq!(source.page_count().unwrap(), 3);
        assert_eq!(source.extract_text(2).unwrap(), "");
        assert_eq!(source.extract_text(3).unwrap(), "Third page.");
        assert!(source.extract_text(0).is_err());
        assert!(source.extract_text(4).is_err());
    }

    #[test]
    fn empty_file_has_no_pages() {
        assert_eq!(PlainTextSource::from_text("").page_count().unwrap(), 0);
    }
}
