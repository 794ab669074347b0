//! Playback position tracking over a [`PageMap`].
//!
//! The tracker never emits notifications itself; mutating calls hand back the
//! new [`PlaybackState`] so the owner can publish it in order.

use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

use crate::pagination::{PageMap, PageMapping};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, TS)]
pub struct PlaybackState {
    /// 1-based.
    pub current_page: usize,
    pub current_sentence_index: usize,
    pub current_char_index: usize,
    pub total_pages: usize,
    pub total_sentences: usize,
    pub is_playing: bool,
    /// Progress through the sentences of `current_page`, in `[0, 1]`.
    pub playback_position: f64,
}

impl PlaybackState {
    /// Cursor on the first readable page, or page 1 of a blank document.
    fn initial(map: &PageMap) -> Self {
        let (current_page, current_sentence_index, current_char_index) = map
            .first_non_empty()
            .map_or((1, 0, 0), |page| {
                (page.page_number, page.start_sentence_index, page.start_char_index)
            });
        Self {
            current_page,
            current_sentence_index,
            current_char_index,
            total_pages: map.total_pages(),
            total_sentences: map.total_sentences(),
            is_playing: false,
            playback_position: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaybackTracker {
    map: PageMap,
    state: PlaybackState,
}

impl PlaybackTracker {
    pub fn new(map: PageMap) -> Self {
        let state = PlaybackState::initial(&map);
        Self { map, state }
    }

    pub fn page_map(&self) -> &PageMap {
        &self.map
    }

    /// Copy of the current state; mutating it has no effect on the tracker.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Move to `sentence_idx`. Out-of-range indices are ignored, which is what
    /// the narration loop relies on when it runs past the final sentence.
    pub fn advance_to(&mut self, sentence_idx: usize) -> Option<PlaybackState> {
        if sentence_idx >= self.map.total_sentences() {
            debug!(
                sentence_idx,
                total = self.map.total_sentences(),
                "Ignoring advance past document bounds"
            );
            return None;
        }
        let page = self
            .map
            .page_for_sentence(sentence_idx)
            .and_then(|page_number| self.map.page(page_number))?;

        self.state.current_page = page.page_number;
        self.state.current_sentence_index = sentence_idx;
        self.state.current_char_index = self
            .map
            .char_offset_of(sentence_idx)
            .unwrap_or(page.start_char_index);
        self.state.playback_position = position_in_page(page, sentence_idx);
        debug!(
            sentence_idx,
            page = page.page_number,
            position = self.state.playback_position,
            "Advanced playback"
        );
        Some(self.state)
    }

    /// Place the cursor at the start of `page_number`. The caller has already
    /// validated the page.
    pub fn jump_to_page(&mut self, page_number: usize, start_playback: bool) -> Option<PlaybackState> {
        let page = self.map.page(page_number)?;
        self.state.current_page = page.page_number;
        self.state.current_sentence_index = page.start_sentence_index;
        self.state.current_char_index = page.start_char_index;
        self.state.playback_position = 0.0;
        if start_playback {
            self.state.is_playing = true;
        }
        Some(self.state)
    }

    pub fn set_playing(&mut self, playing: bool) -> PlaybackState {
        self.state.is_playing = playing;
        self.state
    }

    /// The mapping of the current page.
    pub fn current_page(&self) -> Option<&PageMapping> {
        self.map.page(self.state.current_page)
    }

    /// Whether the cursor sits inside its page's sentence range. Empty pages
    /// carry no sentences and are always considered in sync.
    pub fn is_in_sync(&self) -> bool {
        match self.current_page() {
            Some(page) if page.is_empty => true,
            Some(page) => page.contains_sentence(self.state.current_sentence_index),
            None => false,
        }
    }
}

fn position_in_page(page: &PageMapping, sentence_idx: usize) -> f64 {
    let offset = sentence_idx.saturating_sub(page.start_sentence_index) as f64;
    let in_page = page.sentence_count().max(1) as f64;
    (offset / in_page).clamp(0.0, 1.0)
}
