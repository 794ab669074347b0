use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use super::{ErrorInfo, ErrorSeverity, ErrorType};

pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Bounded history of handled errors; the oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    capacity: usize,
    entries: VecDeque<ErrorInfo>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ErrorStats {
    pub total: usize,
    pub by_type: BTreeMap<ErrorType, usize>,
    pub by_severity: BTreeMap<ErrorSeverity, usize>,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl ErrorLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, info: ErrorInfo) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(info);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> impl Iterator<Item = &ErrorInfo> {
        self.entries.iter()
    }

    /// The newest `count` entries, oldest first.
    pub fn recent(&self, count: usize) -> Vec<ErrorInfo> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn stats(&self) -> ErrorStats {
        let mut stats = ErrorStats {
            total: self.entries.len(),
            ..ErrorStats::default()
        };
        for entry in &self.entries {
            *stats.by_type.entry(entry.error_type).or_default() += 1;
            *stats.by_severity.entry(entry.severity).or_default() += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorDetails;

    fn entry(error_type: ErrorType, message: String) -> ErrorInfo {
        ErrorInfo::new(error_type, message, None, ErrorDetails::new())
    }

    #[test]
    fn keeps_the_most_recent_hundred() {
        let mut log = ErrorLog::default();
        for idx in 0..101 {
            log.push(entry(ErrorType::NetworkError, format!("error {idx}")));
        }
        assert_eq!(log.len(), 100);
        assert_eq!(log.entries().next().unwrap().message, "error 1");
        assert_eq!(log.entries().last().unwrap().message, "error 100");
    }

    #[test]
    fn recent_returns_newest_in_order() {
        let mut log = ErrorLog::with_capacity(5);
        for idx in 0..4 {
            log.push(entry(ErrorType::OcrError, format!("error {idx}")));
        }
        let recent: Vec<String> = log.recent(2).into_iter().map(|info| info.message).collect();
        assert_eq!(recent, vec!["error 2", "error 3"]);
        assert_eq!(log.recent(10).len(), 4);
    }

    #[test]
    fn stats_count_by_type_and_severity() {
        let mut log = ErrorLog::default();
        log.push(entry(ErrorType::OcrError, "a".into()));
        log.push(entry(ErrorType::OcrError, "b".into()));
        log.push(entry(ErrorType::PdfLoadError, "c".into()));
        log.push(entry(ErrorType::PageNavigationError, "d".into()));

        let stats = log.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_type[&ErrorType::OcrError], 2);
        assert_eq!(stats.by_type[&ErrorType::PdfLoadError], 1);
        assert_eq!(stats.by_severity[&ErrorSeverity::Medium], 3);
        assert_eq!(stats.by_severity[&ErrorSeverity::Critical], 1);
        assert!(!stats.by_severity.contains_key(&ErrorSeverity::Low));
    }

    #[test]
    fn zero_capacity_still_keeps_latest_entry() {
        let mut log = ErrorLog::with_capacity(0);
        log.push(entry(ErrorType::NetworkError, "first".into()));
        log.push(entry(ErrorType::NetworkError, "second".into()));
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.recent(1)[0].message, "second");
    }
}
