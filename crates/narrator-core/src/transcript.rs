//! Read-along transcript of a loaded document.

use serde::Serialize;

use crate::pagination::{ExtractionMethod, PageMap};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Transcript {
    pub total_pages: usize,
    pub total_sentences: usize,
    pub pages: Vec<TranscriptPage>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TranscriptPage {
    pub page_number: usize,
    pub extraction_method: ExtractionMethod,
    pub is_empty: bool,
    pub word_count: usize,
    pub sentences: Vec<TranscriptSentence>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TranscriptSentence {
    pub index: usize,
    pub char_index: usize,
    pub text: String,
}

impl Transcript {
    pub fn from_page_map(map: &PageMap) -> Self {
        let pages = map
            .pages()
            .iter()
            .map(|page| TranscriptPage {
                page_number: page.page_number,
                extraction_method: page.extraction_method,
                is_empty: page.is_empty,
                word_count: page.word_count,
                sentences: page
                    .sentence_range()
                    .filter_map(|index| {
                        Some(TranscriptSentence {
                            index,
                            char_index: map.char_offset_of(index)?,
                            text: map.sentence(index)?.to_string(),
                        })
                    })
                    .collect(),
            })
            .collect();
        Self {
            total_pages: map.total_pages(),
            total_sentences: map.total_sentences(),
            pages,
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_sentences_under_their_pages() {
        let map = PageMap::build(
            vec![
                "First sentence here.".to_string(),
                "Second sentence here.".to_string(),
                "Third sentence here.".to_string(),
            ],
            2,
            None,
        )
        .unwrap();

        let transcript = Transcript::from_page_map(&map);

        assert_eq!(transcript.total_sentences, 3);
        assert_eq!(transcript.pages[0].sentences.len(), 2);
        assert_eq!(transcript.pages[1].sentences[0].index, 2);
        assert_eq!(transcript.pages[1].sentences[0].char_index, 43);
        let json = transcript.to_json_pretty().unwrap();
        assert!(json.contains("\"extraction_method\": \"text\""));
    }
}
