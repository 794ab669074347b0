pub(crate) fn default_debounce_ms() -> u64 {
    300
}

pub(crate) fn default_skip_empty_pages() -> bool {
    true
}

pub(crate) fn default_ocr_enabled() -> bool {
    true
}

pub(crate) fn default_min_text_chars() -> usize {
    16
}

pub(crate) fn default_slow_page_ms() -> u64 {
    2000
}

pub(crate) fn default_voice() -> String {
    "default".to_string()
}

pub(crate) fn default_rate() -> f32 {
    1.0
}

pub(crate) fn default_volume() -> f32 {
    1.0
}

pub(crate) fn default_log_capacity() -> usize {
    100
}

pub(crate) fn default_max_recovery_attempts() -> usize {
    3
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}
