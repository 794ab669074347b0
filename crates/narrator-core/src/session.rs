//! The per-document synchronizer.
//!
//! A [`SyncSession`] is constructed explicitly by whoever owns the open
//! document and shared by cloning. It owns the page map, the playback tracker,
//! the navigation controller and the error handler, and publishes every state
//! change through its [`EventBus`].
//!
//! Events are emitted while the session state is locked so listeners observe
//! them in completion order. Listeners must not call back into the session
//! from inside the callback.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info};

use crate::cancellation::CancellationToken;
use crate::config::{MappingStrategy, SyncConfig};
use crate::errors::{ErrorDetails, ErrorHandler, ErrorType};
use crate::events::{EventBus, ListenerId, SyncEvent};
use crate::narration::{NarrationSource, TextSource, VoiceSettings};
use crate::navigation::{NavigationController, NavigationError, Resolution};
use crate::pagination::{ExtractionMethod, PageMap, PageMapping, PageSource};
use crate::playback::{PlaybackState, PlaybackTracker};
use crate::text_utils::{clean_extracted_text, split_sentences};
use crate::transcript::Transcript;

/// Retries of one sentence after a recovered synthesis failure.
const MAX_SENTENCE_RETRIES: usize = 1;

/// Detail key carrying how much text layer an OCR failure can fall back on.
const TEXT_LAYER_CHARS: &str = "text_layer_chars";

#[derive(Clone)]
pub struct SyncSession {
    inner: Arc<Shared>,
}

struct Shared {
    config: SyncConfig,
    state: Mutex<SessionState>,
    navigation: NavigationController,
    errors: ErrorHandler,
    events: EventBus,
    cancel: CancellationToken,
}

struct SessionState {
    tracker: Option<PlaybackTracker>,
    voice: VoiceSettings,
    ocr_fallback: bool,
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("state", &self.state())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_state(&self, state: PlaybackState) {
        self.events.emit(&SyncEvent::StateChanged { state });
    }
}

impl SyncSession {
    pub fn new(config: SyncConfig) -> Self {
        let config = config.clamped();
        let events = EventBus::new();
        let inner = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let errors = ErrorHandler::new(
                config.log_capacity,
                config.max_recovery_attempts,
                events.clone(),
            );
            register_recovery_actions(&errors, weak);
            Shared {
                navigation: NavigationController::from_config(&config),
                state: Mutex::new(SessionState {
                    tracker: None,
                    voice: VoiceSettings::from_config(&config),
                    ocr_fallback: false,
                }),
                errors,
                events,
                cancel: CancellationToken::new(),
                config,
            }
        });
        Self { inner }
    }

    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(listener)
    }

    pub fn errors(&self) -> &ErrorHandler {
        &self.inner.errors
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    fn ensure_live(&self, stage: &'static str) -> Result<()> {
        if self.is_destroyed() {
            anyhow::bail!("session torn down at stage={stage}");
        }
        Ok(())
    }

    /// Current playback state, or `None` before a document is loaded.
    pub fn state(&self) -> Option<PlaybackState> {
        self.inner.lock().tracker.as_ref().map(PlaybackTracker::state)
    }

    pub fn page(&self, page_number: usize) -> Option<PageMapping> {
        self.inner
            .lock()
            .tracker
            .as_ref()
            .and_then(|tracker| tracker.page_map().page(page_number).cloned())
    }

    pub fn transcript(&self) -> Option<Transcript> {
        self.inner
            .lock()
            .tracker
            .as_ref()
            .map(|tracker| Transcript::from_page_map(tracker.page_map()))
    }

    /// Index a document whose sentences are known as one stream.
    pub fn load_sentences(
        &self,
        sentences: Vec<String>,
        total_pages: usize,
        sources: Option<&[PageSource]>,
    ) -> Result<PlaybackState> {
        let map = PageMap::build(sentences, total_pages, sources).context("Building page map")?;
        self.install(map)
    }

    /// Index a document whose sentences are already grouped by page.
    pub fn load_page_sentences(
        &self,
        per_page: Vec<Vec<String>>,
        sources: Option<&[PageSource]>,
    ) -> Result<PlaybackState> {
        let map = PageMap::from_page_sentences(per_page, sources).context("Building page map")?;
        self.install(map)
    }

    /// Run the extraction flow against `source` and index the result.
    pub fn load_document(&self, source: &dyn TextSource) -> Result<PlaybackState> {
        self.ensure_live("load_document")?;
        let errors = &self.inner.errors;

        let total_pages = match source.page_count() {
            Ok(0) => {
                let err = anyhow!("document has no pages");
                errors.handle(ErrorType::PdfLoadError, &err, Some("page_count"), ErrorDetails::new());
                return Err(err);
            }
            Ok(count) => count,
            Err(err) => {
                errors.handle(
                    ErrorType::PdfLoadError,
                    format!("{err:#}"),
                    Some("page_count"),
                    ErrorDetails::new(),
                );
                return Err(err.context("Opening document"));
            }
        };
        info!(pages = total_pages, "Extracting document text");
        self.inner.lock().ocr_fallback = false;

        let mut per_page = Vec::with_capacity(total_pages);
        let mut sources = Vec::with_capacity(total_pages);
        for page_number in 1..=total_pages {
            self.ensure_live("extract_page")?;
            let started = Instant::now();
            let (text, extraction_method) = self.extract_page(source, page_number);
            let elapsed = started.elapsed();
            if elapsed > self.inner.config.slow_page_threshold() {
                errors.handle(
                    ErrorType::PerformanceError,
                    format!("page {page_number} took {} ms to extract", elapsed.as_millis()),
                    Some("load_document"),
                    page_details(page_number),
                );
            }
            let sentences = split_sentences(&clean_extracted_text(&text));
            debug!(
                page = page_number,
                sentences = sentences.len(),
                method = ?extraction_method,
                "Extracted page"
            );
            per_page.push(sentences);
            sources.push(PageSource {
                has_images: source.page_has_images(page_number),
                extraction_method,
            });
        }

        let sentence_count: usize = per_page.iter().map(Vec::len).sum();
        if sentence_count == 0 {
            let err = anyhow!("no readable text found in {total_pages} pages");
            // Per-page fallbacks have already run; the load itself cannot recover.
            errors.report(
                ErrorType::TextExtractionError,
                &err,
                Some("load_document"),
                ErrorDetails::new(),
                false,
            );
            return Err(err);
        }

        let map = match self.inner.config.mapping_strategy {
            MappingStrategy::Block => PageMap::build(
                per_page.into_iter().flatten().collect(),
                total_pages,
                Some(&sources),
            ),
            MappingStrategy::PerPage => PageMap::from_page_sentences(per_page, Some(&sources)),
        }
        .context("Building page map")?;
        self.install(map)
    }

    fn extract_page(&self, source: &dyn TextSource, page_number: usize) -> (String, ExtractionMethod) {
        let config = &self.inner.config;
        let errors = &self.inner.errors;
        let context = format!("page {page_number}");

        let text_layer = match source.extract_text(page_number) {
            Ok(text) => Some(text),
            Err(err) => {
                let recovered = errors.handle(
                    ErrorType::TextExtractionError,
                    format!("{err:#}"),
                    Some(&context),
                    page_details(page_number),
                );
                if !recovered {
                    return (String::new(), ExtractionMethod::Text);
                }
                None
            }
        };

        let sparse = text_layer
            .as_deref()
            .is_none_or(|text| text.trim().chars().count() < config.min_text_chars);
        let ocr_permitted = match text_layer {
            Some(_) => config.ocr_enabled,
            None => self.inner.lock().ocr_fallback,
        };
        if !sparse || !ocr_permitted {
            return (text_layer.unwrap_or_default(), ExtractionMethod::Text);
        }

        match source.recognize_text(page_number) {
            Ok(recognized) => match text_layer {
                Some(text) if !text.trim().is_empty() => {
                    (format!("{text}\n{recognized}"), ExtractionMethod::Mixed)
                }
                _ => (recognized, ExtractionMethod::Ocr),
            },
            Err(err) => {
                let layer_chars = text_layer
                    .as_deref()
                    .map_or(0, |text| text.trim().chars().count());
                let mut details = page_details(page_number);
                details.insert(TEXT_LAYER_CHARS.to_string(), layer_chars.to_string());
                errors.handle(ErrorType::OcrError, format!("{err:#}"), Some(&context), details);
                (text_layer.unwrap_or_default(), ExtractionMethod::Text)
            }
        }
    }

    fn install(&self, map: PageMap) -> Result<PlaybackState> {
        self.ensure_live("install_page_map")?;
        self.inner.navigation.invalidate();
        let mut guard = self.inner.lock();
        let tracker = PlaybackTracker::new(map);
        let state = tracker.state();
        guard.tracker = Some(tracker);
        info!(
            pages = state.total_pages,
            sentences = state.total_sentences,
            "Document indexed for narration"
        );
        self.inner.emit_state(state);
        Ok(state)
    }

    /// Move playback to `sentence_idx`; indices past the document are ignored.
    pub fn advance_to(&self, sentence_idx: usize) {
        let mut guard = self.inner.lock();
        let Some(tracker) = guard.tracker.as_mut() else {
            return;
        };
        if let Some(state) = tracker.advance_to(sentence_idx) {
            self.inner.emit_state(state);
        }
    }

    pub fn set_playing(&self, playing: bool) {
        let mut guard = self.inner.lock();
        let Some(tracker) = guard.tracker.as_mut() else {
            return;
        };
        if tracker.state().is_playing == playing {
            return;
        }
        let state = tracker.set_playing(playing);
        info!(playing, page = state.current_page, "Playback toggled");
        self.inner.emit_state(state);
    }

    /// Jump to a sentence chosen by the user. Supersedes any pending page
    /// navigation.
    pub fn seek_to_sentence(&self, sentence_idx: usize) -> bool {
        let mut guard = self.inner.lock();
        let Some(tracker) = guard.tracker.as_mut() else {
            return false;
        };
        match tracker.advance_to(sentence_idx) {
            Some(state) => {
                self.inner.navigation.invalidate();
                self.inner.emit_state(state);
                true
            }
            None => false,
        }
    }

    pub fn next_sentence(&self) -> bool {
        match self.state() {
            Some(state) => self.seek_to_sentence(state.current_sentence_index + 1),
            None => false,
        }
    }

    pub fn previous_sentence(&self) -> bool {
        match self
            .state()
            .and_then(|state| state.current_sentence_index.checked_sub(1))
        {
            Some(target) => self.seek_to_sentence(target),
            None => false,
        }
    }

    /// Navigate to `page_number` after the debounce window. Returns `true`
    /// when the page (or the readable page it redirected to) is now current.
    pub async fn navigate_to_page(&self, page_number: usize, start_playback: bool) -> bool {
        if self.is_destroyed() {
            debug!(page = page_number, "Ignoring navigation on destroyed session");
            return false;
        }

        let validation = {
            let guard = self.inner.lock();
            match guard.tracker.as_ref() {
                Some(tracker) => self.inner.navigation.validate(tracker.page_map(), page_number),
                None => Err(NavigationError::NoDocument),
            }
        };
        if let Err(err) = validation {
            self.report_navigation_failure(page_number, &err);
            return false;
        }

        let generation = self.inner.navigation.begin();
        if !self
            .inner
            .navigation
            .settle(generation, &self.inner.cancel)
            .await
        {
            return false;
        }

        match self.apply_navigation(generation, page_number, start_playback) {
            Ok(Some(resolution)) => {
                match resolution.redirected_from {
                    Some(requested) => info!(
                        requested,
                        page = resolution.page,
                        "Skipped empty page during navigation"
                    ),
                    None => info!(page = resolution.page, "Navigated to page"),
                }
                true
            }
            Ok(None) => false,
            Err(err) => {
                self.report_navigation_failure(page_number, &err);
                false
            }
        }
    }

    fn apply_navigation(
        &self,
        generation: u64,
        page_number: usize,
        start_playback: bool,
    ) -> Result<Option<Resolution>, NavigationError> {
        let mut guard = self.inner.lock();
        if !self.inner.navigation.is_current(generation) || self.is_destroyed() {
            return Ok(None);
        }
        let tracker = guard.tracker.as_mut().ok_or(NavigationError::NoDocument)?;
        let resolution = self.inner.navigation.resolve(tracker.page_map(), page_number)?;
        let state = tracker
            .jump_to_page(resolution.page, start_playback)
            .ok_or(NavigationError::InvalidPage {
                requested: resolution.page,
                total_pages: tracker.page_map().total_pages(),
            })?;
        if let Some(requested_page) = resolution.redirected_from {
            self.inner.events.emit(&SyncEvent::Redirected {
                requested_page,
                resolved_page: resolution.page,
            });
        }
        self.inner.emit_state(state);
        Ok(Some(resolution))
    }

    pub async fn next_page(&self, start_playback: bool) -> bool {
        let target = self.state().map(|state| state.current_page + 1).unwrap_or(0);
        self.navigate_to_page(target, start_playback).await
    }

    pub async fn previous_page(&self, start_playback: bool) -> bool {
        let target = self
            .state()
            .map(|state| state.current_page.saturating_sub(1))
            .unwrap_or(0);
        self.navigate_to_page(target, start_playback).await
    }

    fn report_navigation_failure(&self, page_number: usize, err: &NavigationError) {
        let mut details = ErrorDetails::new();
        details.insert("requested_page".to_string(), page_number.to_string());
        self.inner.errors.handle(
            ErrorType::PageNavigationError,
            err,
            Some("navigate_to_page"),
            details,
        );
    }

    pub fn voice_settings(&self) -> VoiceSettings {
        self.inner.lock().voice.clone()
    }

    /// Replace the narration voice. Out-of-range rate or volume is clamped
    /// before it is stored and reported as a recovered validation error.
    pub fn set_voice_settings(&self, mut voice: VoiceSettings) -> bool {
        let adjusted = voice.clamp_in_place();
        self.inner.lock().voice = voice;
        if adjusted.is_empty() {
            return true;
        }
        let mut details = ErrorDetails::new();
        details.insert("fields".to_string(), adjusted.join(","));
        self.inner.errors.report(
            ErrorType::ValidationError,
            format!("voice settings out of range: {}", adjusted.join(", ")),
            Some("set_voice_settings"),
            details,
            true,
        )
    }

    /// Check that the cursor still lies inside its page; report and repair
    /// the drift otherwise.
    pub fn verify_sync(&self) -> bool {
        let drift = {
            let guard = self.inner.lock();
            match guard.tracker.as_ref() {
                Some(tracker) if !tracker.is_in_sync() => Some(tracker.state()),
                _ => None,
            }
        };
        let Some(state) = drift else {
            return true;
        };
        let mut details = ErrorDetails::new();
        details.insert("page".to_string(), state.current_page.to_string());
        details.insert("sentence".to_string(), state.current_sentence_index.to_string());
        self.inner.errors.handle(
            ErrorType::SynchronizationError,
            format!(
                "sentence {} is not on page {}",
                state.current_sentence_index, state.current_page
            ),
            Some("verify_sync"),
            details,
        )
    }

    /// Entry point for collaborators (renderer, speech engine, network
    /// fetchers) to report failures through the common channel.
    pub fn report_error(
        &self,
        error_type: ErrorType,
        error: impl std::fmt::Display,
        context: Option<&str>,
    ) -> bool {
        self.inner
            .errors
            .handle(error_type, error, context, ErrorDetails::new())
    }

    /// Speak sentences from the current position while playback is on.
    /// Stops after `max_sentences`, at the end of the document, or on an
    /// unrecovered synthesis failure. Returns how many sentences were spoken.
    pub fn narrate(&self, narrator: &dyn NarrationSource, max_sentences: usize) -> usize {
        let mut spoken = 0;
        while spoken < max_sentences && !self.is_destroyed() {
            let next = {
                let guard = self.inner.lock();
                guard.tracker.as_ref().and_then(|tracker| {
                    let state = tracker.state();
                    if !state.is_playing {
                        return None;
                    }
                    tracker
                        .page_map()
                        .sentence(state.current_sentence_index)
                        .map(|sentence| (state.current_sentence_index, sentence.to_string()))
                })
            };
            let Some((sentence_idx, sentence)) = next else {
                break;
            };
            self.align_view_with(sentence_idx);

            if !self.speak_with_recovery(narrator, sentence_idx, &sentence) {
                self.set_playing(false);
                break;
            }
            spoken += 1;

            let mut guard = self.inner.lock();
            let Some(tracker) = guard.tracker.as_mut() else {
                break;
            };
            if tracker.state().current_sentence_index != sentence_idx {
                // Moved by navigation while speaking; continue from there.
                continue;
            }
            match tracker.advance_to(sentence_idx + 1) {
                Some(state) => self.inner.emit_state(state),
                None => {
                    let state = tracker.set_playing(false);
                    info!(sentences = state.total_sentences, "Reached end of document");
                    self.inner.emit_state(state);
                    break;
                }
            }
        }
        spoken
    }

    /// Bring the page view onto the page that owns `sentence_idx` before it
    /// is spoken. The cursor can sit on an empty page after a jump.
    fn align_view_with(&self, sentence_idx: usize) {
        let mut guard = self.inner.lock();
        let Some(tracker) = guard.tracker.as_mut() else {
            return;
        };
        let owner = tracker.page_map().page_for_sentence(sentence_idx);
        if owner == Some(tracker.state().current_page) {
            return;
        }
        if let Some(state) = tracker.advance_to(sentence_idx) {
            debug!(sentence_idx, page = state.current_page, "Moved view to narrated page");
            self.inner.emit_state(state);
        }
    }

    /// Speak one sentence, retrying after each recovered synthesis failure up
    /// to `MAX_SENTENCE_RETRIES` times. The last failure is reported as
    /// unrecovered without running recovery again.
    fn speak_with_recovery(
        &self,
        narrator: &dyn NarrationSource,
        sentence_idx: usize,
        sentence: &str,
    ) -> bool {
        let context = format!("sentence {sentence_idx}");
        let mut retries = 0;
        loop {
            let voice = self.voice_settings();
            let err = match narrator.speak(sentence, &voice) {
                Ok(()) => return true,
                Err(err) => err,
            };
            let mut details = ErrorDetails::new();
            details.insert("voice".to_string(), voice.voice.clone());
            details.insert("rate".to_string(), voice.rate.to_string());
            details.insert("attempt".to_string(), (retries + 1).to_string());
            let message = format!("{err:#}");

            if retries == MAX_SENTENCE_RETRIES {
                self.inner.errors.report(
                    ErrorType::AudioSynthesisError,
                    message,
                    Some(&context),
                    details,
                    false,
                );
                return false;
            }
            if !self.inner.errors.handle(
                ErrorType::AudioSynthesisError,
                message,
                Some(&context),
                details,
            ) {
                return false;
            }
            retries += 1;
            debug!(sentence_idx, retries, "Retrying sentence");
        }
    }

    /// Tear the session down. Pending navigations resolve to `false` without
    /// touching state and later calls become no-ops.
    pub fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }
        self.inner.cancel.cancel();
        self.inner.navigation.invalidate();
        let mut guard = self.inner.lock();
        guard.tracker = None;
        info!("Narration session destroyed");
    }
}

fn page_details(page_number: usize) -> ErrorDetails {
    let mut details = ErrorDetails::new();
    details.insert("page".to_string(), page_number.to_string());
    details
}

fn register_recovery_actions(errors: &ErrorHandler, weak: &Weak<Shared>) {
    let session = weak.clone();
    errors.register_action(
        ErrorType::TextExtractionError,
        "enable_ocr_fallback",
        Box::new(move |_| {
            let shared = upgrade(&session)?;
            if !shared.config.ocr_enabled {
                anyhow::bail!("OCR is disabled");
            }
            shared.lock().ocr_fallback = true;
            Ok(())
        }),
    );

    errors.register_action(
        ErrorType::OcrError,
        "keep_text_layer",
        Box::new(|info| {
            let layer_chars: usize = info
                .details
                .get(TEXT_LAYER_CHARS)
                .and_then(|chars| chars.parse().ok())
                .unwrap_or(0);
            if layer_chars == 0 {
                anyhow::bail!("no text layer to fall back on");
            }
            Ok(())
        }),
    );

    let session = weak.clone();
    errors.register_action(
        ErrorType::AudioSynthesisError,
        "switch_to_fallback_voice",
        Box::new(move |_| {
            let shared = upgrade(&session)?;
            let fallback = shared
                .config
                .fallback_voice
                .clone()
                .ok_or_else(|| anyhow!("no fallback voice configured"))?;
            let mut guard = shared.lock();
            if guard.voice.voice == fallback {
                anyhow::bail!("already using fallback voice {fallback}");
            }
            info!(from = %guard.voice.voice, to = %fallback, "Switching narration voice");
            guard.voice.voice = fallback;
            Ok(())
        }),
    );

    let session = weak.clone();
    errors.register_action(
        ErrorType::AudioSynthesisError,
        "reset_speech_rate",
        Box::new(move |_| {
            let shared = upgrade(&session)?;
            let mut guard = shared.lock();
            if (guard.voice.rate - 1.0).abs() <= f32::EPSILON {
                anyhow::bail!("speech rate already at default");
            }
            guard.voice.rate = 1.0;
            Ok(())
        }),
    );

    let session = weak.clone();
    errors.register_action(
        ErrorType::SynchronizationError,
        "resync_to_page_start",
        Box::new(move |_| {
            let shared = upgrade(&session)?;
            let mut guard = shared.lock();
            let tracker = guard
                .tracker
                .as_mut()
                .ok_or_else(|| anyhow!("no document loaded"))?;
            let state = tracker.state();
            let resynced = tracker
                .jump_to_page(state.current_page, state.is_playing)
                .ok_or_else(|| anyhow!("page {} is not mapped", state.current_page))?;
            shared.emit_state(resynced);
            Ok(())
        }),
    );

    let session = weak.clone();
    errors.register_action(
        ErrorType::PerformanceError,
        "cancel_pending_navigation",
        Box::new(move |_| {
            upgrade(&session)?.navigation.invalidate();
            Ok(())
        }),
    );

}

fn upgrade(session: &Weak<Shared>) -> Result<Arc<Shared>> {
    session
        .upgrade()
        .ok_or_else(|| anyhow!("session already dropped"))
}
