//! Page mapping between the linear sentence stream and document pages.
//!
//! The default strategy is intentionally simple: sentences are assigned to
//! pages in fixed contiguous blocks of `ceil(sentences / pages)`, with the last
//! page taking the remainder. It does not look at real layout, which keeps it
//! deterministic and gives O(1) lookups. When per-page text is known,
//! [`PageMap::from_page_sentences`] builds exact mappings instead.
//!
//! Character offsets refer to the narration text formed by joining every
//! sentence with a single space. Character ranges are half-open and sentence
//! ranges inclusive.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use ts_rs::TS;

use crate::text_utils::word_count;

/// How the text of a page was obtained.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    #[default]
    Text,
    Ocr,
    Mixed,
}

/// Best-effort per-page metadata reported by the text source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageSource {
    pub has_images: bool,
    pub extraction_method: ExtractionMethod,
}

#[derive(Debug, Clone, Serialize, PartialEq, TS)]
pub struct PageMapping {
    /// 1-based.
    pub page_number: usize,
    pub start_char_index: usize,
    /// Exclusive.
    pub end_char_index: usize,
    pub start_sentence_index: usize,
    /// Inclusive; `None` when no sentence falls on the page.
    pub end_sentence_index: Option<usize>,
    pub word_count: usize,
    pub text_content: String,
    pub is_empty: bool,
    pub has_images: bool,
    pub extraction_method: ExtractionMethod,
}

impl PageMapping {
    pub fn sentence_count(&self) -> usize {
        self.sentence_range().len()
    }

    /// Half-open form of the sentence range; empty when the page has none.
    pub fn sentence_range(&self) -> Range<usize> {
        let end = self
            .end_sentence_index
            .map_or(self.start_sentence_index, |last| last + 1);
        self.start_sentence_index..end
    }

    pub fn contains_sentence(&self, sentence_idx: usize) -> bool {
        self.end_sentence_index
            .is_some_and(|last| (self.start_sentence_index..=last).contains(&sentence_idx))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageMapError {
    #[error("document must have at least one page")]
    NoPages,
    #[error("expected metadata for {expected} pages, got {actual}")]
    SourceCountMismatch { expected: usize, actual: usize },
}

/// Immutable page index for one loaded document.
#[derive(Debug, Clone, Default)]
pub struct PageMap {
    pages: Vec<PageMapping>,
    sentences: Vec<String>,
    sentence_pages: Vec<usize>,
    sentence_char_offsets: Vec<usize>,
}

impl PageMap {
    /// Partition `sentences` across `total_pages` in fixed-size blocks.
    pub fn build(
        sentences: Vec<String>,
        total_pages: usize,
        sources: Option<&[PageSource]>,
    ) -> Result<Self, PageMapError> {
        if total_pages == 0 {
            return Err(PageMapError::NoPages);
        }
        check_sources(total_pages, sources)?;

        let block = sentences.len().div_ceil(total_pages);
        let ranges: Vec<(usize, usize)> = (0..total_pages)
            .map(|page_idx| {
                let start = (page_idx * block).min(sentences.len());
                let end = if page_idx + 1 == total_pages {
                    sentences.len()
                } else {
                    (start + block).min(sentences.len())
                };
                (start, end)
            })
            .collect();

        let map = Self::assemble(sentences, &ranges, sources);
        info!(
            pages = total_pages,
            sentences = map.total_sentences(),
            sentences_per_page = block,
            empty_pages = map.pages.iter().filter(|page| page.is_empty).count(),
            "Built block page map"
        );
        Ok(map)
    }

    /// Build exact mappings from sentences already grouped by page.
    pub fn from_page_sentences(
        per_page: Vec<Vec<String>>,
        sources: Option<&[PageSource]>,
    ) -> Result<Self, PageMapError> {
        if per_page.is_empty() {
            return Err(PageMapError::NoPages);
        }
        check_sources(per_page.len(), sources)?;

        let mut ranges = Vec::with_capacity(per_page.len());
        let mut sentences = Vec::new();
        for page_sentences in per_page {
            let start = sentences.len();
            sentences.extend(page_sentences);
            ranges.push((start, sentences.len()));
        }

        let map = Self::assemble(sentences, &ranges, sources);
        info!(
            pages = map.total_pages(),
            sentences = map.total_sentences(),
            empty_pages = map.pages.iter().filter(|page| page.is_empty).count(),
            "Built per-page map"
        );
        Ok(map)
    }

    fn assemble(
        sentences: Vec<String>,
        ranges: &[(usize, usize)],
        sources: Option<&[PageSource]>,
    ) -> Self {
        let mut sentence_char_offsets = Vec::with_capacity(sentences.len());
        let mut offset = 0usize;
        for sentence in &sentences {
            sentence_char_offsets.push(offset);
            offset += sentence.chars().count() + 1;
        }
        let narration_len = offset.saturating_sub(1);

        let mut sentence_pages = vec![0usize; sentences.len()];
        let mut pages = Vec::with_capacity(ranges.len());
        for (page_idx, &(start, end)) in ranges.iter().enumerate() {
            let page_number = page_idx + 1;
            for slot in &mut sentence_pages[start..end] {
                *slot = page_number;
            }

            let text_content = sentences[start..end].join(" ");
            let start_char_index = sentence_char_offsets
                .get(start)
                .copied()
                .unwrap_or(narration_len);
            let end_char_index = start_char_index + text_content.chars().count();
            let source = sources
                .and_then(|sources| sources.get(page_idx))
                .copied()
                .unwrap_or_default();

            debug!(
                page = page_number,
                start_sentence = start,
                end_sentence = end,
                "Mapped page"
            );
            pages.push(PageMapping {
                page_number,
                start_char_index,
                end_char_index,
                start_sentence_index: start,
                end_sentence_index: (end > start).then(|| end - 1),
                word_count: word_count(&text_content),
                is_empty: text_content.trim().is_empty(),
                text_content,
                has_images: source.has_images,
                extraction_method: source.extraction_method,
            });
        }

        Self {
            pages,
            sentences,
            sentence_pages,
            sentence_char_offsets,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn total_sentences(&self) -> usize {
        self.sentences.len()
    }

    pub fn pages(&self) -> &[PageMapping] {
        &self.pages
    }

    pub fn sentence(&self, sentence_idx: usize) -> Option<&str> {
        self.sentences.get(sentence_idx).map(String::as_str)
    }

    /// Look up a page by its 1-based number.
    pub fn page(&self, page_number: usize) -> Option<&PageMapping> {
        page_number
            .checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
    }

    /// 1-based number of the page that owns `sentence_idx`.
    pub fn page_for_sentence(&self, sentence_idx: usize) -> Option<usize> {
        self.sentence_pages.get(sentence_idx).copied()
    }

    pub fn char_offset_of(&self, sentence_idx: usize) -> Option<usize> {
        self.sentence_char_offsets.get(sentence_idx).copied()
    }

    /// First non-empty page strictly after `page_number`.
    pub fn next_non_empty_after(&self, page_number: usize) -> Option<&PageMapping> {
        self.pages
            .iter()
            .skip(page_number)
            .find(|page| !page.is_empty)
    }

    pub fn first_non_empty(&self) -> Option<&PageMapping> {
        self.next_non_empty_after(0)
    }
}

fn check_sources(total_pages: usize, sources: Option<&[PageSource]>) -> Result<(), PageMapError> {
    match sources {
        Some(sources) if sources.len() != total_pages => Err(PageMapError::SourceCountMismatch {
            expected: total_pages,
            actual: sources.len(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_sentences(count: usize) -> Vec<String> {
        (0..count).map(|idx| format!("Sentence number {idx}.")).collect()
    }

    #[test]
    fn ninety_five_sentences_over_ten_pages() {
        let map = PageMap::build(numbered_sentences(95), 10, None).unwrap();

        assert_eq!(map.total_pages(), 10);
        let first = map.page(1).unwrap();
        assert_eq!((first.start_sentence_index, first.end_sentence_index), (0, Some(9)));
        let ninth = map.page(9).unwrap();
        assert_eq!((ninth.start_sentence_index, ninth.end_sentence_index), (80, Some(89)));
        let last = map.page(10).unwrap();
        assert_eq!((last.start_sentence_index, last.end_sentence_index), (90, Some(94)));
        assert_eq!(last.sentence_count(), 5);
        assert!(!last.is_empty);
    }

    #[test]
    fn every_sentence_belongs_to_exactly_one_page() {
        for (sentences, pages) in [(1, 1), (7, 3), (21, 10), (95, 10), (3, 8), (100, 7)] {
            let map = PageMap::build(numbered_sentences(sentences), pages, None).unwrap();
            assert_eq!(map.total_pages(), pages);
            for sentence_idx in 0..sentences {
                let owners = map
                    .pages()
                    .iter()
                    .filter(|page| page.contains_sentence(sentence_idx))
                    .count();
                assert_eq!(owners, 1, "sentence {sentence_idx} of {sentences}/{pages}");
                let page_number = map.page_for_sentence(sentence_idx).unwrap();
                assert!(map.page(page_number).unwrap().contains_sentence(sentence_idx));
            }
        }
    }

    #[test]
    fn sentence_ranges_are_contiguous() {
        let map = PageMap::build(numbered_sentences(21), 10, None).unwrap();
        assert_eq!(map.page(1).unwrap().start_sentence_index, 0);
        for pair in map.pages().windows(2) {
            if let (Some(last), false) = (pair[0].end_sentence_index, pair[1].is_empty) {
                assert_eq!(last + 1, pair[1].start_sentence_index);
            }
            assert_eq!(pair[0].sentence_range().end, pair[1].start_sentence_index);
            assert!(pair[0].end_char_index <= pair[1].start_char_index);
        }
        let seventh = map.page(7).unwrap();
        assert_eq!(seventh.end_sentence_index, Some(20));
        assert_eq!(map.page(8).unwrap().end_sentence_index, None);
    }

    #[test]
    fn pages_past_the_last_sentence_are_empty() {
        let map = PageMap::build(numbered_sentences(21), 10, None).unwrap();
        let empty: Vec<usize> = map
            .pages()
            .iter()
            .filter(|page| page.is_empty)
            .map(|page| page.page_number)
            .collect();
        assert_eq!(empty, vec![8, 9, 10]);
        assert_eq!(map.page(8).unwrap().word_count, 0);
    }

    #[test]
    fn no_sentences_still_maps_every_page() {
        let map = PageMap::build(Vec::new(), 4, None).unwrap();
        assert_eq!(map.total_pages(), 4);
        assert!(map.pages().iter().all(|page| page.is_empty));
        assert!(map.first_non_empty().is_none());
    }

    #[test]
    fn zero_pages_is_rejected() {
        assert_eq!(
            PageMap::build(numbered_sentences(3), 0, None).unwrap_err(),
            PageMapError::NoPages
        );
    }

    #[test]
    fn mismatched_sources_are_rejected() {
        let sources = [PageSource::default(); 2];
        assert_eq!(
            PageMap::build(numbered_sentences(3), 3, Some(&sources)).unwrap_err(),
            PageMapError::SourceCountMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn char_ranges_follow_joined_narration_text() {
        let sentences = vec![
            "Alpha beta.".to_string(),
            "Gamma delta.".to_string(),
            "Epsilon zeta.".to_string(),
        ];
        let map = PageMap::build(sentences, 2, None).unwrap();
        let first = map.page(1).unwrap();
        assert_eq!(first.text_content, "Alpha beta. Gamma delta.");
        assert_eq!((first.start_char_index, first.end_char_index), (0, 24));
        let second = map.page(2).unwrap();
        assert_eq!((second.start_char_index, second.end_char_index), (25, 38));
        assert_eq!(map.char_offset_of(2), Some(25));
        assert_eq!(first.word_count, 4);
    }

    #[test]
    fn per_page_sentences_keep_interior_empty_pages() {
        let per_page = vec![
            vec!["Page one text.".to_string()],
            vec!["Page two text.".to_string(), "More on two.".to_string()],
            Vec::new(),
            vec!["Page four text.".to_string()],
        ];
        let sources = [
            PageSource::default(),
            PageSource::default(),
            PageSource {
                has_images: true,
                extraction_method: ExtractionMethod::Ocr,
            },
            PageSource::default(),
        ];
        let map = PageMap::from_page_sentences(per_page, Some(&sources)).unwrap();

        let third = map.page(3).unwrap();
        assert!(third.is_empty);
        assert!(third.has_images);
        assert_eq!(third.extraction_method, ExtractionMethod::Ocr);
        assert_eq!(third.start_sentence_index, 3);
        assert_eq!(third.end_sentence_index, None);
        assert_eq!(third.sentence_count(), 0);
        assert!(!third.contains_sentence(3));
        assert_eq!(map.next_non_empty_after(3).unwrap().page_number, 4);
        assert_eq!(map.page_for_sentence(3), Some(4));
    }

    #[test]
    fn page_lookup_is_one_based() {
        let map = PageMap::build(numbered_sentences(4), 2, None).unwrap();
        assert!(map.page(0).is_none());
        assert!(map.page(3).is_none());
        assert_eq!(map.page(2).unwrap().page_number, 2);
    }
}
