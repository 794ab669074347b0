//! Text splitting helpers for narration alignment.
//!
//! Indices into the output of [`split_sentences`] are the canonical sentence
//! indices used by the page map, the playback tracker and navigation.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static RE_LINE_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\p{L})-[ \t]*\r?\n\s*(\p{Ll})").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Tidy raw text coming out of a PDF text layer or OCR pass.
///
/// NFKC folds the ligatures PDF producers like to emit (`ﬁ`, `ﬂ`), words
/// hyphenated across line breaks are rejoined, and whitespace runs collapse
/// to a single space.
pub fn clean_extracted_text(text: &str) -> String {
    let composed: String = text.nfkc().collect();
    let joined = RE_LINE_HYPHEN.replace_all(&composed, "$1$2");
    RE_WHITESPACE.replace_all(&joined, " ").trim().to_string()
}

/// Lightweight sentence splitter based on terminal punctuation.
///
/// A sentence ends at `.`, `!` or `?` (plus any trailing punctuation or
/// closing quotes) when the next character is whitespace or an uppercase
/// letter. Candidates that carry no letters or only a single word are dropped
/// as extraction noise.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    let mut idx = 0;
    while idx < chars.len() {
        let ch = chars[idx];
        current.push(ch);
        if is_terminal(ch) {
            while let Some(&next) = chars.get(idx + 1) {
                if is_terminal(next) || is_closing(next) {
                    current.push(next);
                    idx += 1;
                } else {
                    break;
                }
            }
            if let Some(&next) = chars.get(idx + 1) {
                if next.is_whitespace() || next.is_uppercase() {
                    push_candidate(&mut sentences, std::mem::take(&mut current));
                }
            }
        }
        idx += 1;
    }
    push_candidate(&mut sentences, current);

    sentences
}

/// Whether a trimmed fragment counts as a narration unit.
pub fn is_narratable(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    !trimmed.is_empty()
        && trimmed.chars().any(char::is_alphabetic)
        && trimmed.split_whitespace().nth(1).is_some()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn push_candidate(sentences: &mut Vec<String>, candidate: String) {
    if is_narratable(&candidate) {
        sentences.push(candidate.trim().to_string());
    }
}

fn is_terminal(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

fn is_closing(ch: char) -> bool {
    matches!(ch, '"' | '\'' | ')' | ']' | '”' | '’' | '»')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_punctuation_followed_by_whitespace() {
        let sentences = split_sentences("The cat sat down. It was tired! Was it hungry? Maybe so.");
        assert_eq!(
            sentences,
            vec![
                "The cat sat down.",
                "It was tired!",
                "Was it hungry?",
                "Maybe so."
            ]
        );
    }

    #[test]
    fn splits_when_spacing_after_punctuation_is_missing() {
        let sentences = split_sentences("First line ends here.Second line starts here.");
        assert_eq!(
            sentences,
            vec!["First line ends here.", "Second line starts here."]
        );
    }

    #[test]
    fn keeps_decimal_numbers_inside_one_sentence() {
        let sentences = split_sentences("Pi is roughly 3.14 in value. That is enough.");
        assert_eq!(sentences, vec!["Pi is roughly 3.14 in value.", "That is enough."]);
    }

    #[test]
    fn trailing_quotes_stay_with_their_sentence() {
        let sentences = split_sentences("She said \"stop right there.\" Then she left the room.");
        assert_eq!(
            sentences,
            vec!["She said \"stop right there.\"", "Then she left the room."]
        );
    }

    #[test]
    fn drops_noise_fragments() {
        let sentences = split_sentences("12. 34! Chapter. --- ... Real words appear here.");
        assert_eq!(sentences, vec!["Real words appear here."]);
    }

    #[test]
    fn empty_and_noise_only_input_yield_no_sentences() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n\t ").is_empty());
        assert!(split_sentences("1. 2. 3. ***").is_empty());
    }

    #[test]
    fn unterminated_tail_is_kept() {
        let sentences = split_sentences("One full sentence. And a trailing clause");
        assert_eq!(sentences, vec!["One full sentence.", "And a trailing clause"]);
    }

    #[test]
    fn clean_folds_ligatures_and_rejoins_hyphenation() {
        let cleaned = clean_extracted_text("The ﬁrst exam-\nple   spans\n\nlines.");
        assert_eq!(cleaned, "The first example spans lines.");
    }

    #[test]
    fn narratable_requires_letters_and_two_words() {
        assert!(is_narratable("Two words."));
        assert!(!is_narratable("Word."));
        assert!(!is_narratable("42 17."));
        assert!(!is_narratable("   "));
    }
}
