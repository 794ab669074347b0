//! Keeps a rendered PDF page and spoken narration in step.
//!
//! A [`SyncSession`] indexes a document's sentences against its pages, tracks
//! the narration cursor, debounces page navigation and routes failures
//! through a classified error handler.

pub mod bindings;
pub mod cancellation;
pub mod config;
pub mod errors;
pub mod events;
pub mod narration;
pub mod navigation;
pub mod pagination;
pub mod playback;
pub mod session;
pub mod text_utils;
pub mod transcript;

pub use config::{SyncConfig, load_config};
pub use errors::{ErrorHandler, ErrorInfo, ErrorSeverity, ErrorType};
pub use events::{EventBus, SyncEvent};
pub use narration::{NarrationSource, TextSource, VoiceSettings};
pub use pagination::{ExtractionMethod, PageMap, PageMapping, PageSource};
pub use playback::{PlaybackState, PlaybackTracker};
pub use session::SyncSession;
pub use transcript::Transcript;
